use std::time::{Duration, Instant};

/// A periodic timer polled from the cooperative tick loop.
///
/// Arming an armed timer keeps its current deadline, so repeated mounts never
/// stack a second schedule. Disarming is the cancellation.
#[derive(Debug, Clone)]
pub struct Periodic {
    period: Duration,
    next_due: Option<Instant>,
}

impl Periodic {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// First deadline is one period after `now`
    pub fn arm(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.period);
        }
    }

    pub fn disarm(&mut self) {
        self.next_due = None;
    }

    /// True when the deadline has passed. Missed periods collapse into one
    /// firing; the next deadline is a full period after `now`.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unarmed_never_fires() {
        let mut timer = Periodic::new(Duration::from_millis(500));
        let now = Instant::now();
        assert!(!timer.fire(now + Duration::from_secs(10)));
    }

    #[test]
    fn fires_once_per_deadline() {
        let mut timer = Periodic::new(Duration::from_secs(5));
        let start = Instant::now();
        timer.arm(start);

        assert!(!timer.fire(start + Duration::from_secs(4)));
        assert!(timer.fire(start + Duration::from_secs(5)));
        assert!(!timer.fire(start + Duration::from_secs(6)));
        assert!(timer.fire(start + Duration::from_secs(10)));
    }

    #[test]
    fn missed_periods_collapse() {
        let mut timer = Periodic::new(Duration::from_secs(1));
        let start = Instant::now();
        timer.arm(start);

        assert!(timer.fire(start + Duration::from_secs(30)));
        assert!(!timer.fire(start + Duration::from_millis(30_500)));
    }

    #[test]
    fn rearming_keeps_schedule() {
        let mut timer = Periodic::new(Duration::from_secs(5));
        let start = Instant::now();
        timer.arm(start);
        timer.arm(start + Duration::from_secs(3));

        assert!(timer.fire(start + Duration::from_secs(5)));
    }

    #[test]
    fn disarm_cancels() {
        let mut timer = Periodic::new(Duration::from_secs(1));
        let start = Instant::now();
        timer.arm(start);
        timer.disarm();
        timer.disarm();

        assert!(!timer.is_armed());
        assert!(!timer.fire(start + Duration::from_secs(2)));
    }
}
