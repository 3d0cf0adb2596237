use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::client::LeaderboardClient;
use crate::clock::Clock;
use crate::controller::{StopOutcome, TimerController, Transition};
use crate::runtime::{FocusEvent, FocusEventSource, Runner, Ticker};
use crate::util::format_clock;

/// Whether the event loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal client state: the controller plus list selection and a status line
pub struct App<C: LeaderboardClient, K: Clock> {
    pub controller: TimerController<C, K>,
    pub selected: usize,
    pub status: Option<String>,
}

impl<C: LeaderboardClient, K: Clock> App<C, K> {
    pub fn new(mut controller: TimerController<C, K>) -> Self {
        controller.mount();
        Self {
            controller,
            selected: 0,
            status: None,
        }
    }

    /// Draw, then handle the next event from `runner`, until the user quits.
    ///
    /// The controller is torn down on every way out, a failed draw included.
    pub fn run<E, T, D, Err>(&mut self, runner: &Runner<E, T>, mut draw: D) -> Result<(), Err>
    where
        E: FocusEventSource,
        T: Ticker,
        D: FnMut(&Self) -> Result<(), Err>,
    {
        let result = loop {
            if let Err(err) = draw(self) {
                break Err(err);
            }
            if self.handle(runner.step()) == Flow::Quit {
                break Ok(());
            }
        };
        self.controller.teardown();
        result
    }

    pub fn handle(&mut self, event: FocusEvent) -> Flow {
        match event {
            FocusEvent::Tick => self.controller.tick(),
            FocusEvent::Resize => {}
            FocusEvent::FocusLost => {
                if let Some(outcome) = self.controller.set_visible(false) {
                    self.report(&outcome);
                }
            }
            FocusEvent::FocusGained => {
                self.controller.set_visible(true);
            }
            FocusEvent::Key(key) => return self.on_key(key),
        }
        Flow::Continue
    }

    fn on_key(&mut self, key: KeyEvent) -> Flow {
        let roster_len = self.controller.roster().len();

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return self.quit(),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return self.quit();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < roster_len {
                    self.selected += 1;
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.toggle(self.selected),
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                if idx < roster_len {
                    self.selected = idx;
                    self.toggle(idx);
                }
            }
            KeyCode::Char('s') => {
                if let Some(outcome) = self.controller.stop_active() {
                    self.report(&outcome);
                }
            }
            KeyCode::Char('r') => self.controller.refresh(),
            _ => {}
        }
        Flow::Continue
    }

    fn toggle(&mut self, idx: usize) {
        let Some(name) = self.controller.roster().get(idx).cloned() else {
            return;
        };

        match self.controller.start(&name) {
            Ok(Transition::Started) => self.status = Some(format!("{name} is focusing")),
            Ok(Transition::Stopped(outcome)) => self.report(&outcome),
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn report(&mut self, outcome: &StopOutcome) {
        let spent = format_clock(outcome.seconds);
        self.status = Some(if outcome.committed {
            format!("{}: +{spent} saved", outcome.name)
        } else {
            format!("{}: {spent} lost, leaderboard unreachable", outcome.name)
        });
    }

    fn quit(&mut self) -> Flow {
        self.controller.teardown();
        Flow::Quit
    }
}
