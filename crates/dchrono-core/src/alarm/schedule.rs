//! Schedule engine.
//!
//! Pure calendar arithmetic over an alarm's time of day and repeat days.
//! Nothing here reads the clock or touches storage; callers pass the
//! reference instant in.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::{AlarmTime, RepeatDays};

/// Snooze length used when the configuration does not override it.
pub const DEFAULT_SNOOZE_MINUTES: u32 = 5;

/// Days scanned past the reference date. Together with the reference date
/// itself this bounds the search to 8 candidates.
const SCAN_DAYS: u64 = 7;

/// Next instant strictly after `reference` at which an alarm with the given
/// `time` and `repeat_days` should fire.
///
/// With an empty repeat set this is today's `time` if it is still ahead,
/// otherwise tomorrow's. With repeat days, the first day from the reference
/// date onward whose weekday is in the set and whose `time` is still ahead.
///
/// Arithmetic happens on wall-clock components in `reference`'s time zone.
pub fn compute_next_fire<Tz: TimeZone>(
    time: AlarmTime,
    repeat_days: RepeatDays,
    reference: &DateTime<Tz>,
) -> DateTime<Tz> {
    let tz = reference.timezone();
    let start = reference.date_naive();
    let wall = time.to_naive_time();

    (0..=SCAN_DAYS)
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .filter(|date| repeat_days.is_empty() || repeat_days.contains(date.weekday()))
        .map(|date| resolve_local(&tz, date.and_time(wall)))
        .find(|candidate| candidate > reference)
        .unwrap_or_else(|| {
            // Only reachable at the very end of chrono's date range.
            let last = start
                .checked_add_days(Days::new(SCAN_DAYS))
                .unwrap_or(NaiveDate::MAX);
            resolve_local(&tz, last.and_time(wall))
        })
}

/// Whether an alarm waiting for `next_fire_at` should be ringing at `now`.
pub fn is_due(next_fire_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= next_fire_at
}

/// Deadline for an alarm snoozed at `now`.
pub fn compute_snooze_until(now: DateTime<Utc>, snooze_minutes: u32) -> DateTime<Utc> {
    now + Duration::minutes(i64::from(snooze_minutes))
}

/// Map a wall-clock datetime onto an instant in `tz`.
///
/// Ambiguous times (clocks turned back) take the earlier instant. Times that
/// fall into a gap (clocks turned forward) move to the first existing minute
/// after the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    if let Some(instant) = tz.from_local_datetime(&naive).earliest() {
        return instant;
    }
    let mut candidate = naive;
    for _ in 0..24 * 60 {
        candidate += Duration::minutes(1);
        if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
            return instant;
        }
    }
    tz.from_utc_datetime(&naive)
}
