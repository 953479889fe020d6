use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::{Clock, Wake};
use crate::alarm::AlarmId;

/// Upper bound on a single sleep. Tokio timers follow the monotonic clock,
/// which can stall while the host is suspended, so the wall clock is
/// re-checked at least this often.
const MAX_SLEEP: StdDuration = StdDuration::from_secs(60);

/// Host clock that delivers wakes through a tokio channel.
///
/// Every armed alarm gets its own timer task; disarming aborts the task.
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct TokioClock {
    tx: mpsc::UnboundedSender<Wake>,
    timers: HashMap<AlarmId, JoinHandle<()>>,
}

impl TokioClock {
    /// Create the clock together with the receiving end of its wake channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Wake>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let clock = Self {
            tx,
            timers: HashMap::new(),
        };
        (clock, rx)
    }

    pub fn armed_count(&self) -> usize {
        self.timers.values().filter(|h| !h.is_finished()).count()
    }
}

impl Clock for TokioClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn arm_wake(&mut self, id: AlarmId, at: DateTime<Utc>) {
        self.disarm_wake(id);
        self.timers.retain(|_, handle| !handle.is_finished());

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            loop {
                let now = Utc::now();
                if now >= at {
                    trace!(%id, %at, fired_at = %now, "wake fired");
                    // Receiver gone means the daemon is shutting down.
                    let _ = tx.send(Wake { id, fired_at: now });
                    return;
                }
                let wait = (at - now).to_std().unwrap_or_default().min(MAX_SLEEP);
                tokio::time::sleep(wait).await;
            }
        });
        debug!(%id, %at, "wake armed");
        self.timers.insert(id, handle);
    }

    fn disarm_wake(&mut self, id: AlarmId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
            debug!(%id, "wake disarmed");
        }
    }

    fn disarm_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl Drop for TokioClock {
    fn drop(&mut self) {
        self.disarm_all();
    }
}
