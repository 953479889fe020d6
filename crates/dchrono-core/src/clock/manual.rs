use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{Clock, Wake};
use crate::alarm::AlarmId;

/// Deterministic clock for tests and simulations.
///
/// Time only moves when told to. Moving it returns the wakes that became
/// due, in firing order, and removes them from the armed set.
#[derive(Debug, Clone)]
pub struct ManualClock<Tz: TimeZone = Utc> {
    now: DateTime<Tz>,
    armed: HashMap<AlarmId, DateTime<Utc>>,
}

impl<Tz: TimeZone> ManualClock<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now,
            armed: HashMap::new(),
        }
    }

    /// Move the clock to `now` (forwards or backwards) and collect due wakes.
    pub fn set(&mut self, now: DateTime<Tz>) -> Vec<Wake> {
        self.now = now;
        self.take_due()
    }

    pub fn advance(&mut self, by: Duration) -> Vec<Wake> {
        let next = self.now.clone() + by;
        self.set(next)
    }

    /// Jump straight to the earliest armed wake, if any.
    pub fn advance_to_next_wake(&mut self) -> Vec<Wake> {
        match self.armed.values().min().copied() {
            Some(at) => {
                let tz = self.now.timezone();
                self.set(at.with_timezone(&tz))
            }
            None => Vec::new(),
        }
    }

    pub fn armed_at(&self, id: AlarmId) -> Option<DateTime<Utc>> {
        self.armed.get(&id).copied()
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    fn take_due(&mut self) -> Vec<Wake> {
        let now = self.now.with_timezone(&Utc);
        let mut due: Vec<(DateTime<Utc>, AlarmId)> = self
            .armed
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort();
        due.into_iter()
            .map(|(_, id)| {
                self.armed.remove(&id);
                Wake { id, fired_at: now }
            })
            .collect()
    }
}

impl<Tz: TimeZone> Clock for ManualClock<Tz> {
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.now.clone()
    }

    fn arm_wake(&mut self, id: AlarmId, at: DateTime<Utc>) {
        self.armed.insert(id, at);
    }

    fn disarm_wake(&mut self, id: AlarmId) {
        self.armed.remove(&id);
    }

    fn disarm_all(&mut self) {
        self.armed.clear();
    }
}
