//! Notification surface seam.
//!
//! The ringing screen lives outside this crate. The controller calls
//! [`NotificationSurface::show`] when an alarm starts ringing and
//! [`NotificationSurface::dismiss`] once it is snoozed, closed or deleted.
//! The surface offers exactly two user actions, "snooze" and "close", and
//! reports them back by calling the matching controller operation.

use crate::alarm::{Alarm, AlarmId};

pub trait NotificationSurface {
    /// Display the ringing UI for `alarm` (name and description).
    fn show(&mut self, alarm: &Alarm);

    /// Take down the ringing UI for `id`, if it is up.
    fn dismiss(&mut self, _id: AlarmId) {}
}

/// What a [`RecordingSurface`] saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Shown {
        id: AlarmId,
        name: String,
        description: String,
    },
    Dismissed(AlarmId),
}

/// Surface that records calls instead of drawing anything.
#[derive(Debug, Default, Clone)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Ids currently shown and not yet dismissed.
    pub fn showing(&self) -> Vec<AlarmId> {
        let mut showing: Vec<AlarmId> = Vec::new();
        for call in &self.calls {
            match call {
                SurfaceCall::Shown { id, .. } => {
                    if !showing.contains(id) {
                        showing.push(*id);
                    }
                }
                SurfaceCall::Dismissed(id) => showing.retain(|s| s != id),
            }
        }
        showing
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl NotificationSurface for RecordingSurface {
    fn show(&mut self, alarm: &Alarm) {
        self.calls.push(SurfaceCall::Shown {
            id: alarm.id(),
            name: alarm.name().to_string(),
            description: alarm.description().to_string(),
        });
    }

    fn dismiss(&mut self, id: AlarmId) {
        self.calls.push(SurfaceCall::Dismissed(id));
    }
}
