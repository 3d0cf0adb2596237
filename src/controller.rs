use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::LeaderboardClient;
use crate::clock::Clock;
use crate::schedule::Periodic;
use crate::session::Session;
use crate::store::Standing;

pub const DEFAULT_DISPLAY_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("{0} is not on the roster")]
    UnknownParticipant(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    pub display_interval: Duration,
    pub poll_interval: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            display_interval: DEFAULT_DISPLAY_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What `start` ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Started,
    /// The name was already running; `start` toggled it off
    Stopped(StopOutcome),
}

/// Result of ending a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopOutcome {
    pub name: String,
    pub seconds: u64,
    pub committed: bool,
}

/// Client-side session timer.
///
/// Owns at most one running session, the elapsed display and a cached copy of
/// the last leaderboard snapshot. Every session produces exactly one commit,
/// whichever stop trigger gets there first.
pub struct TimerController<C: LeaderboardClient, K: Clock> {
    client: C,
    clock: K,
    roster: Vec<String>,
    session: Option<Session>,
    elapsed_secs: u64,
    visible: bool,
    standings: Vec<Standing>,
    display_tick: Periodic,
    poll: Periodic,
    mounted: bool,
}

impl<C: LeaderboardClient, K: Clock> TimerController<C, K> {
    pub fn new(client: C, clock: K, roster: Vec<String>, settings: ControllerSettings) -> Self {
        Self {
            client,
            clock,
            roster,
            session: None,
            elapsed_secs: 0,
            visible: true,
            standings: Vec::new(),
            display_tick: Periodic::new(settings.display_interval),
            poll: Periodic::new(settings.poll_interval),
            mounted: false,
        }
    }

    /// Begin polling and load the board once. Safe to call repeatedly.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.poll.arm(self.clock.now());
        self.refresh();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Start `name`, or stop it if it is the one already running.
    /// A different running session is stopped (and committed) first.
    pub fn start(&mut self, name: &str) -> Result<Transition, ControllerError> {
        if !self.roster.iter().any(|n| n == name) {
            return Err(ControllerError::UnknownParticipant(name.to_string()));
        }

        if let Some(outcome) = self.stop(name) {
            return Ok(Transition::Stopped(outcome));
        }
        self.stop_active();

        let now = self.clock.now();
        self.session = Some(Session::new(name, now));
        self.elapsed_secs = 0;
        self.display_tick.disarm();
        self.display_tick.arm(now);
        debug!(participant = name, "session started");
        Ok(Transition::Started)
    }

    /// Stop `name` if it is the running session
    pub fn stop(&mut self, name: &str) -> Option<StopOutcome> {
        if self.running() == Some(name) {
            self.stop_active()
        } else {
            None
        }
    }

    /// Stop whatever is running. No-op without a session.
    pub fn stop_active(&mut self) -> Option<StopOutcome> {
        let (name, seconds) = self.end_session()?;

        let committed = match self.client.commit(&name, seconds) {
            Ok(standings) => {
                info!(participant = %name, seconds, "session committed");
                self.standings = standings;
                true
            }
            Err(err) => {
                warn!(participant = %name, seconds, error = %err, "session commit lost");
                false
            }
        };

        self.refresh();
        Some(StopOutcome {
            name,
            seconds,
            committed,
        })
    }

    /// Replace the cached board; a failure keeps the stale copy
    pub fn refresh(&mut self) {
        match self.client.fetch() {
            Ok(standings) => self.standings = standings,
            Err(err) => debug!(error = %err, "leaderboard poll failed"),
        }
    }

    /// Advance both periodic timers against the clock
    pub fn tick(&mut self) {
        let now = self.clock.now();

        if self.display_tick.fire(now) && self.visible {
            if let Some(session) = &self.session {
                self.elapsed_secs = session.elapsed_secs(now);
            }
        }

        if self.poll.fire(now) {
            self.refresh();
        }
    }

    /// Losing visibility ends the session right away. Regaining it does not
    /// resume anything.
    pub fn set_visible(&mut self, visible: bool) -> Option<StopOutcome> {
        self.visible = visible;
        if visible {
            None
        } else {
            self.stop_active()
        }
    }

    /// Cancel both timers and hand any running session to a best-effort
    /// dispatch without waiting for it.
    pub fn teardown(&mut self) {
        if let Some((name, seconds)) = self.end_session() {
            info!(participant = %name, seconds, "dispatching session on teardown");
            self.client.dispatch(&name, seconds);
        }
        self.poll.disarm();
        self.display_tick.disarm();
        self.mounted = false;
    }

    /// Clears local session state before any network call, so a failed commit
    /// never leaves a stopped-but-running session behind.
    fn end_session(&mut self) -> Option<(String, u64)> {
        let session = self.session.take()?;
        let seconds = session.elapsed_secs(self.clock.now());
        self.elapsed_secs = 0;
        self.display_tick.disarm();
        Some((session.name, seconds))
    }

    pub fn running(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.name.as_str())
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_armed()
    }

    pub fn is_ticking(&self) -> bool {
        self.display_tick.is_armed()
    }
}
