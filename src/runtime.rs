use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Everything the terminal client reacts to.
///
/// Terminal focus changes stand in for visibility: `FocusLost` means the
/// user stepped away.
#[derive(Clone, Debug)]
pub enum FocusEvent {
    Key(KeyEvent),
    Resize,
    FocusGained,
    FocusLost,
    Tick,
}

/// Where the runner pulls key presses and focus changes from
pub trait FocusEventSource: Send + 'static {
    /// Next event, or `Err(Timeout)` when nothing arrives within `timeout`.
    fn recv_timeout(&self, timeout: Duration) -> Result<FocusEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread; only key presses are kept
pub struct CrosstermEventSource {
    rx: Receiver<FocusEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => FocusEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => FocusEvent::Resize,
                Ok(CtEvent::FocusGained) => FocusEvent::FocusGained,
                Ok(CtEvent::FocusLost) => FocusEvent::FocusLost,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FocusEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How long the runner waits for input before emitting a `Tick`
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Tick at a constant rate; the terminal client polls its timers on it
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed events, for driving the client headlessly
pub struct TestEventSource {
    rx: Receiver<FocusEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<FocusEvent>) -> Self {
        Self { rx }
    }
}

impl FocusEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FocusEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Turns terminal input and idle time into a stream of `FocusEvent`s
pub struct Runner<E: FocusEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: FocusEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next input event, or `Tick` once the interval passes quietly
    pub fn step(&self) -> FocusEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => FocusEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            FocusEvent::Tick => {}
            other => panic!("expected Tick on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_focus_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(FocusEvent::FocusLost).unwrap();
        tx.send(FocusEvent::FocusGained).unwrap();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        assert!(matches!(runner.step(), FocusEvent::FocusLost));
        assert!(matches!(runner.step(), FocusEvent::FocusGained));
    }

    #[test]
    fn disconnected_source_keeps_ticking() {
        let (tx, rx) = mpsc::channel::<FocusEvent>();
        drop(tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_millis(1)),
        );
        assert!(matches!(runner.step(), FocusEvent::Tick));
    }
}
