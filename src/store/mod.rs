mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ceiling for any total or single commit; SQLite stores totals as signed 64-bit
pub const MAX_TOTAL: u64 = i64::MAX as u64;

/// One row of the leaderboard: a participant and their cumulative seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub name: String,
    pub total: u64,
}

impl Standing {
    pub fn new(name: impl Into<String>, total: u64) -> Self {
        Self {
            name: name.into(),
            total,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Key-value storage of cumulative totals keyed by participant name.
///
/// Implementations own the consistency guarantees: `atomic_increment` must not
/// lose updates when called concurrently for the same name, and `list_all`
/// must read a point-in-time copy.
pub trait TotalsStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<u64>, StoreError>;

    /// Add `delta` to `name`'s total, creating the participant when absent.
    /// Totals saturate at [`MAX_TOTAL`]. Returns the new total.
    fn atomic_increment(&self, name: &str, delta: u64) -> Result<u64, StoreError>;

    /// Every participant in creation order.
    fn list_all(&self) -> Result<Vec<Standing>, StoreError>;

    /// Create `name` with a zero total unless it already exists.
    fn ensure(&self, name: &str) -> Result<(), StoreError>;

    /// Zero every total, keeping participants and their creation order.
    fn reset_all(&self) -> Result<(), StoreError>;
}
