//! Wall-clock access.
//!
//! "Today" for the theme is the local calendar date. Services read time
//! through [`Clock`] so tests can move across midnight without waiting.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta};

/// Source of the local wall-clock time.
pub trait Clock: Send + Sync {
    /// Current local date and time.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The system's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Time left until the next local midnight.
///
/// Exactly at midnight this is a full day, so a timer armed at the boundary
/// waits for the following one.
#[must_use]
pub fn until_next_midnight(now: NaiveDateTime) -> Duration {
    let next = now
        .date()
        .succ_opt()
        .and_then(|tomorrow| tomorrow.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MAX);
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_until_next_midnight() {
        assert_eq!(until_next_midnight(at(23, 59, 0)), Duration::from_secs(60));
        assert_eq!(until_next_midnight(at(12, 0, 0)), Duration::from_secs(12 * 3600));
        assert_eq!(until_next_midnight(at(0, 0, 0)), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_manual_clock_crosses_midnight() {
        let clock = ManualClock::new(at(23, 59, 30));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 16).unwrap());

        clock.advance(TimeDelta::seconds(45));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 17).unwrap());

        clock.set(at(8, 0, 0));
        assert_eq!(clock.now(), at(8, 0, 0));
    }
}
