//! Recurring daily rate-limit windows.
//!
//! A window is two local wall-clock times, "HH:MM-HH:MM", anchored to the
//! current day when parsed. A window whose end precedes its start spans
//! midnight ("22:00-06:00"). Windows renew themselves: once an evaluation
//! sees that `now` has moved a full day past the stored start, both bounds
//! roll forward so a multi-day upload keeps throttling in the same daily
//! interval without outside help.

use crate::error::{Error, Result};
use chrono::{Duration, Local, NaiveDateTime, NaiveTime};

/// Time layout accepted for window bounds.
const TIME_FORMAT: &str = "%H:%M";

/// A recurring daily local-time interval during which throttling applies.
///
/// Evaluation is half-open: the window is active when `start <= now < end`.
/// Bounds are naive local datetimes; the schedule is a wall-clock contract,
/// so evaluation is a plain wall-clock comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl RateWindow {
    /// Parse a "HH:MM-HH:MM" window, anchored to today in local time.
    ///
    /// The empty "no schedule" sentinel is a caller-level contract (see
    /// `UploadConfig::window`), not an input this function accepts.
    pub fn parse(spec: &str) -> Result<Self> {
        Self::parse_at(spec, Local::now().naive_local())
    }

    /// Parse a window anchored to the day of `now`.
    ///
    /// Split out from [`RateWindow::parse`] so callers and tests can pin
    /// the anchor instant.
    pub fn parse_at(spec: &str, now: NaiveDateTime) -> Result<Self> {
        let mut parts = spec.split('-');
        let (Some(start_part), Some(end_part), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::malformed_window(
                spec,
                "expected two times separated by a hyphen",
            ));
        };

        let start_time = parse_time(spec, start_part)?;
        let end_time = parse_time(spec, end_part)?;

        let today = now.date();
        let start = today.and_time(start_time);
        let mut end = today.and_time(end_time);

        // "22:00-06:00" spans midnight.
        if end < start {
            end += Duration::days(1);
        }

        Ok(Self { start, end })
    }

    /// Whether the window is active at the current local wall-clock time.
    pub fn is_active_now(&mut self) -> bool {
        self.is_active_at(Local::now().naive_local())
    }

    /// Whether the window is active at `now`.
    ///
    /// Rolls the window forward first: once `now` is a full day or more
    /// past the stored start, both bounds advance so the same wall-clock
    /// interval applies to the current day.
    pub fn is_active_at(&mut self, now: NaiveDateTime) -> bool {
        while now - self.start >= Duration::hours(24) {
            self.start += Duration::days(1);
            self.end += Duration::days(1);
        }
        self.start <= now && now < self.end
    }

    /// Window start.
    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Window end; never before `start`, possibly on the next calendar day.
    #[must_use]
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }
}

fn parse_time(spec: &str, part: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(part.trim(), TIME_FORMAT)
        .map_err(|e| Error::malformed_window(spec, format!("bad time '{part}': {e}")))
}
