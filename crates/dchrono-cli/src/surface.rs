//! Terminal notification surface.

use std::collections::HashMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use dchrono_core::{Alarm, AlarmId, AlarmTime, NotificationSurface};
use tracing::debug;

/// Prints ringing alarms to stdout.
///
/// A resync shows ringing alarms again; those are only printed once per
/// ringing episode, keyed by the alarm's `updated_at`.
pub struct ConsoleSurface {
    time_format: String,
    shown: HashMap<AlarmId, DateTime<Utc>>,
}

impl ConsoleSurface {
    pub fn new(time_format: &str) -> Self {
        Self {
            time_format: time_format.to_string(),
            shown: HashMap::new(),
        }
    }
}

impl NotificationSurface for ConsoleSurface {
    fn show(&mut self, alarm: &Alarm) {
        if self.shown.get(&alarm.id()) == Some(&alarm.updated_at()) {
            return;
        }
        self.shown.insert(alarm.id(), alarm.updated_at());

        println!(
            "RINGING  {}  {}",
            format_time(alarm.time(), &self.time_format),
            alarm.name()
        );
        if !alarm.description().is_empty() {
            println!("         {}", alarm.description());
        }
        println!(
            "         dchrono alarm snooze {id}  |  dchrono alarm close {id}",
            id = alarm.id()
        );
    }

    fn dismiss(&mut self, id: AlarmId) {
        if self.shown.remove(&id).is_some() {
            debug!(%id, "ringing notice dismissed");
        }
    }
}

/// Render `time` with a chrono format string, falling back to `HH:MM` when
/// the format is invalid.
pub fn format_time(time: AlarmTime, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", time.to_naive_time().format(format)).is_err() {
        return time.to_string();
    }
    out
}
