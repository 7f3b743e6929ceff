//! Note creation timestamps.
//!
//! Notes carry their creation time as display text, `HH:MM - D/M/YYYY`,
//! in local time. The clock is injected so tests can pin it.

use chrono::{Local, NaiveDateTime};

/// Source of the current local time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The system clock in the local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Format a time the way notes display it: zero-padded hours and minutes,
/// then day, 1-based month and year without padding.
pub fn format_timestamp(dt: NaiveDateTime) -> String {
    dt.format("%H:%M - %-d/%-m/%Y").to_string()
}
