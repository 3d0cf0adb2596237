use std::{
    fs::{self, OpenOptions},
    io::{self, stdin, Write},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use focusboard::{
    app::App,
    app_dirs::AppDirs,
    client::{HttpLeaderboardClient, LeaderboardClient, LocalClient},
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    controller::TimerController,
    export::write_csv,
    leaderboard::{LeaderboardStore, UnknownParticipantPolicy},
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    server,
    store::{MemoryStore, SqliteStore, Standing},
    util::format_clock,
};

const TICK_RATE_MS: u64 = 100;

/// focus-time tracker with a shared leaderboard
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "Track how long each participant of a fixed roster stays focused, and rank everyone on a shared cumulative leaderboard."
)]
pub struct Cli {
    /// path to a JSON config file (defaults to the platform config dir)
    #[clap(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// serve the leaderboard over HTTP
    Serve {
        /// address to listen on
        #[clap(short = 'b', long)]
        bind: Option<String>,

        /// database file (defaults to the state dir)
        #[clap(long)]
        db: Option<PathBuf>,

        /// keep totals in memory only; they are lost on exit
        #[clap(long, conflicts_with = "db")]
        memory: bool,

        /// what to do with commits for names that are not on the board
        #[clap(long, value_enum)]
        unknown: Option<UnknownParticipantPolicy>,
    },

    /// run the terminal timer
    Run {
        /// leaderboard server url
        #[clap(short = 's', long)]
        server: Option<String>,

        /// use a local database directly instead of a server
        #[clap(long, conflicts_with = "server")]
        local: bool,

        /// database file for --local
        #[clap(long, requires = "local")]
        db: Option<PathBuf>,
    },

    /// print the leaderboard
    Show {
        #[clap(flatten)]
        source: Source,
    },

    /// write the leaderboard as CSV
    Export {
        #[clap(flatten)]
        source: Source,

        /// output file (defaults to stdout)
        #[clap(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// zero every total in a local database
    Reset {
        /// database file (defaults to the state dir)
        #[clap(long)]
        db: Option<PathBuf>,

        /// confirm the reset
        #[clap(long)]
        yes: bool,
    },
}

/// Where a read-only command gets its snapshot from
#[derive(clap::Args, Debug)]
struct Source {
    /// read from a running server instead of a local database
    #[clap(short = 's', long, conflicts_with = "db")]
    server: Option<String>,

    /// database file (defaults to the state dir)
    #[clap(long)]
    db: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };

    match cli.command {
        Command::Serve {
            bind,
            db,
            memory,
            unknown,
        } => {
            init_stderr_logging("info");
            let mut cfg = config_store.load();
            if let Some(bind) = bind {
                cfg.bind = bind;
            }
            if let Some(unknown) = unknown {
                cfg.unknown_participants = unknown;
            }
            serve(&cfg, db, memory)
        }
        Command::Run { server, local, db } => {
            if !stdin().is_tty() {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
            }
            init_file_logging();

            let mut cfg = config_store.load();
            if local {
                let board = open_board(&cfg, db)?;
                run_client(LocalClient::new(Arc::new(board)), &cfg)
            } else {
                if let Some(server) = server {
                    cfg.server_url = server;
                }
                let client = HttpLeaderboardClient::new(&cfg.server_url, cfg.request_timeout())?;
                run_client(client, &cfg)
            }
        }
        Command::Show { source } => {
            init_stderr_logging("warn");
            let standings = load_standings(&config_store.load(), source)?;
            print_standings(&standings, io::stdout().lock())?;
            Ok(())
        }
        Command::Export { source, output } => {
            init_stderr_logging("warn");
            let standings = load_standings(&config_store.load(), source)?;
            match output {
                Some(path) => {
                    let file = fs::File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_csv(&standings, file)?;
                }
                None => write_csv(&standings, io::stdout().lock())?,
            }
            Ok(())
        }
        Command::Reset { db, yes } => {
            init_stderr_logging("warn");
            if !yes {
                bail!("refusing to reset without --yes");
            }
            open_board(&config_store.load(), db)?.reset()?;
            println!("all totals reset");
            Ok(())
        }
    }
}

fn init_stderr_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// The terminal is in raw mode while the client runs, so logs go to a file
fn init_file_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn db_path(db: Option<PathBuf>) -> PathBuf {
    db.or_else(AppDirs::db_path)
        .unwrap_or_else(|| PathBuf::from("focusboard.db"))
}

fn open_board(cfg: &Config, db: Option<PathBuf>) -> Result<LeaderboardStore> {
    let path = db_path(db);
    let store =
        SqliteStore::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let board = LeaderboardStore::new(store, cfg.unknown_participants);
    board.seed(cfg.roster.as_slice())?;
    Ok(board)
}

fn serve(cfg: &Config, db: Option<PathBuf>, memory: bool) -> Result<()> {
    let board = if memory {
        let board = LeaderboardStore::new(MemoryStore::new(), cfg.unknown_participants);
        board.seed(cfg.roster.as_slice())?;
        info!("keeping totals in memory");
        board
    } else {
        open_board(cfg, db)?
    };
    let board = Arc::new(board);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&cfg.bind)
            .await
            .with_context(|| format!("binding {}", cfg.bind))?;
        server::serve(listener, board).await?;
        Ok(())
    })
}

fn load_standings(cfg: &Config, source: Source) -> Result<Vec<Standing>> {
    match source.server {
        Some(url) => {
            let client = HttpLeaderboardClient::new(&url, cfg.request_timeout())?;
            Ok(client.fetch()?)
        }
        None => Ok(open_board(cfg, source.db)?.snapshot()?),
    }
}

fn print_standings<W: Write>(standings: &[Standing], mut out: W) -> io::Result<()> {
    let width = standings
        .iter()
        .map(|s| s.name.chars().count())
        .max()
        .unwrap_or(0);
    for (idx, standing) in standings.iter().enumerate() {
        writeln!(
            out,
            "{:>2}. {:<width$}  {}",
            idx + 1,
            standing.name,
            format_clock(standing.total),
        )?;
    }
    Ok(())
}

fn run_client<C: LeaderboardClient>(client: C, cfg: &Config) -> Result<()> {
    let controller = TimerController::new(
        client,
        SystemClock,
        cfg.roster.clone(),
        cfg.controller_settings(),
    );
    let mut app = App::new(controller);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, C: LeaderboardClient>(
    terminal: &mut Terminal<B>,
    app: &mut App<C, SystemClock>,
) -> Result<()> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    app.run(&runner, |app| {
        terminal
            .draw(|f| f.render_widget(app, f.area()))
            .map(|_| ())
    })?;
    Ok(())
}
