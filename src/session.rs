use std::time::Instant;

/// One running start-to-stop interval for a participant. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub started_at: Instant,
}

impl Session {
    pub fn new(name: impl Into<String>, started_at: Instant) -> Self {
        Self {
            name: name.into(),
            started_at,
        }
    }

    /// Whole seconds since start. A `now` earlier than the start counts as 0.
    pub fn elapsed_secs(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.started_at).as_millis() as u64 / 1000
    }
}
