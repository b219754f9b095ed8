//! Wall-clock alignment helpers
//!
//! Targets are computed in naive local time and resolved to instants just
//! before sleeping. A target that does not exist in local time (DST spring
//! gap) resolves to `None`; callers degrade to a nominal sleep instead of
//! skipping the occurrence.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use stride_domain::constants::{END_OF_DAY_HOUR, END_OF_DAY_MINUTE, FLUSH_INTERVAL_MINUTES};

/// Next half-hour boundary strictly after `now` (:00 or :30, seconds zeroed)
pub fn next_half_hour(now: NaiveDateTime) -> NaiveDateTime {
    let truncated = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
    let past = now.minute() % FLUSH_INTERVAL_MINUTES;
    truncated + chrono::Duration::minutes(i64::from(FLUSH_INTERVAL_MINUTES - past))
}

/// Next 23:59:00, today if still ahead, otherwise tomorrow
pub fn next_end_of_day(now: NaiveDateTime) -> NaiveDateTime {
    let tod = NaiveTime::from_hms_opt(END_OF_DAY_HOUR, END_OF_DAY_MINUTE, 0)
        .unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(tod);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Next occurrence of `tod`, today if strictly in the future, else tomorrow
pub fn next_time_of_day(now: NaiveDateTime, tod: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(tod);
    if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Duration from the current instant until `target` local wall-clock time.
///
/// Returns `None` when `target` has no local representation or already
/// passed by the time it is resolved.
pub fn sleep_duration_until(target: NaiveDateTime) -> Option<Duration> {
    let instant = Local.from_local_datetime(&target).earliest()?;
    (instant - Local::now()).to_std().ok()
}
