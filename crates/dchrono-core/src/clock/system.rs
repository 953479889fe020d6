use chrono::{DateTime, Local, Utc};
use tracing::debug;

use super::Clock;
use crate::alarm::AlarmId;

/// Host local time with no wake delivery.
///
/// For short-lived processes (one-shot CLI commands) that only mutate the
/// store. The long-running daemon picks the changes up on its next resync.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn arm_wake(&mut self, id: AlarmId, at: DateTime<Utc>) {
        debug!(%id, %at, "wake recorded, delivery left to the daemon");
    }

    fn disarm_wake(&mut self, id: AlarmId) {
        debug!(%id, "wake disarm left to the daemon");
    }

    fn disarm_all(&mut self) {}
}
