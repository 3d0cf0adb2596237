use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("focusboard"),
            )
        } else {
            ProjectDirs::from("", "", "focusboard")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    /// Leaderboard database used by `serve` and the local subcommands
    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("leaderboard.db"))
    }

    /// Log file for the terminal client, which cannot log to its own screen
    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("client.log"))
    }
}
