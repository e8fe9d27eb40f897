//! Injectable wall clock.

use crate::dates;
use crate::sessions::WeekTime;

/// Source of "now" for the session matcher and the form's default date.
pub trait Clock: Send + Sync {
    fn week_time(&self) -> WeekTime;
    /// Today's calendar day as `YYYY-MM-DD`.
    fn today(&self) -> String;
}

/// The machine's local clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn week_time(&self) -> WeekTime {
        WeekTime::now_local()
    }

    fn today(&self) -> String {
        dates::today_iso()
    }
}

/// A clock stuck at one instant.
#[derive(Clone, Debug)]
pub struct FixedClock {
    pub now: WeekTime,
    pub today: String,
}

impl FixedClock {
    pub fn new(now: WeekTime, today: impl Into<String>) -> Self {
        Self {
            now,
            today: today.into(),
        }
    }
}

impl Clock for FixedClock {
    fn week_time(&self) -> WeekTime {
        self.now
    }

    fn today(&self) -> String {
        self.today.clone()
    }
}
