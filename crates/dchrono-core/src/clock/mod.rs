//! Clock sources.
//!
//! A [`Clock`] tells the lifecycle controller what time it is and arms or
//! disarms per-alarm wakes. Wakes travel back to the controller as [`Wake`]
//! messages; they may arrive late but never before the armed instant.

mod manual;
mod runtime;
mod system;

use chrono::{DateTime, TimeZone, Utc};

use crate::alarm::AlarmId;

pub use manual::ManualClock;
pub use runtime::TokioClock;
pub use system::SystemClock;

/// A wake delivered by a clock for a previously armed alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake {
    pub id: AlarmId,
    pub fired_at: DateTime<Utc>,
}

/// Wall-clock time plus a per-alarm wake primitive.
pub trait Clock {
    /// Zone whose wall clock alarm times are interpreted in.
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;

    /// Arm a wake for `id` at `at`, replacing any wake already armed for it.
    fn arm_wake(&mut self, id: AlarmId, at: DateTime<Utc>);

    /// Cancel the wake armed for `id`, if any.
    fn disarm_wake(&mut self, id: AlarmId);

    /// Cancel every armed wake.
    fn disarm_all(&mut self);

    fn now_utc(&self) -> DateTime<Utc> {
        self.now().with_timezone(&Utc)
    }
}
