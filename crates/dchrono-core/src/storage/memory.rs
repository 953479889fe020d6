use std::collections::HashMap;

use super::AlarmStore;
use crate::alarm::{Alarm, AlarmId};
use crate::error::StoreError;

/// In-process alarm store. Nothing survives the process.
///
/// Write failures can be injected to exercise the controller's retry path.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    alarms: HashMap<AlarmId, Alarm>,
    failing_puts: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to `put` fail with [`StoreError::Locked`].
    pub fn fail_next_puts(&mut self, n: usize) {
        self.failing_puts = n;
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

impl AlarmStore for MemoryStore {
    fn get(&self, id: AlarmId) -> Result<Option<Alarm>, StoreError> {
        Ok(self.alarms.get(&id).cloned())
    }

    fn put(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        if self.failing_puts > 0 {
            self.failing_puts -= 1;
            return Err(StoreError::Locked);
        }
        self.alarms.insert(alarm.id(), alarm.clone());
        Ok(())
    }

    fn delete(&mut self, id: AlarmId) -> Result<bool, StoreError> {
        Ok(self.alarms.remove(&id).is_some())
    }

    fn list(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.alarms.values().cloned().collect())
    }
}
