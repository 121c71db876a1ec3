//! Cancellable fixed-interval trigger.

/// Fires at a fixed interval once armed, until cancelled.
///
/// The owner polls it with the current time; a late poll fires once and
/// realigns instead of firing a burst for every missed interval.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: f64,
    next_due: Option<f64>,
}

impl Ticker {
    /// Creates a cancelled ticker.
    ///
    /// # Arguments
    ///
    /// * `interval` - Seconds between firings
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Starts firing, first one interval after `now`.
    pub fn arm(&mut self, now: f64) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Returns true if the ticker is due at `now`, scheduling the next firing.
    pub fn fire(&mut self, now: f64) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }

    /// Seconds until the next firing, or None when cancelled.
    pub fn time_until_due(&self, now: f64) -> Option<f64> {
        self.next_due.map(|due| (due - now).max(0.0))
    }
}
