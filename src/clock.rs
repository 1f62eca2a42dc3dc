use chrono::{DateTime, Utc};

pub type Timestamp = DateTime<Utc>;

/// Time source consulted by the controller when it needs "now" outside of a tick.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Converts real elapsed time into simulated age units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgeScale {
    pub seconds_per_unit: f64,
}

impl AgeScale {
    pub fn new(seconds_per_unit: f64) -> Self {
        Self { seconds_per_unit }
    }

    /// Age in units between `birth` and `now`; never negative, even if the clock stepped back.
    pub fn age_between(&self, birth: Timestamp, now: Timestamp) -> f64 {
        let elapsed = now.signed_duration_since(birth);
        let secs = elapsed.num_milliseconds() as f64 / 1000.0;
        (secs / self.seconds_per_unit).max(0.0)
    }
}

impl Default for AgeScale {
    fn default() -> Self {
        // one real minute is one simulated day
        Self {
            seconds_per_unit: 60.0,
        }
    }
}

/// Seconds from `earlier` to `later`, zero if the clock went backwards.
pub fn seconds_between(earlier: Timestamp, later: Timestamp) -> f32 {
    let ms = later.signed_duration_since(earlier).num_milliseconds();
    (ms.max(0) as f32) / 1000.0
}
