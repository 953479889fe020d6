//! Alarm lifecycle controller.
//!
//! The controller is the only place alarm state changes. Every operation
//! loads the alarm from the store, checks the transition is legal, writes
//! the new record back and then adjusts the clock and notification surface.
//!
//! ## State Transitions
//!
//! ```text
//! SCHEDULED -wake-> RINGING -snooze-> SNOOZED -wake-> RINGING
//! RINGING | SNOOZED -close-> SCHEDULED (repeating) | deleted (once)
//! SCHEDULED <-disable/enable-> DISABLED
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::alarm::{
    compute_next_fire, compute_snooze_until, is_due, validate_name, Alarm, AlarmId, AlarmPatch,
    AlarmState, AlarmTime, NewAlarm, RepeatDays, DEFAULT_SNOOZE_MINUTES,
};
use crate::clock::Clock;
use crate::error::{CoreError, Result, StoreError};
use crate::notify::NotificationSurface;
use crate::storage::{AlarmStore, Config};

/// Outcome of a [`AlarmController::sync`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Alarms with a wake armed in the future.
    pub armed: usize,
    /// Alarms whose wake was missed and which were rung during the pass.
    pub fired: usize,
    /// Alarms that were already ringing and were shown again.
    pub ringing: usize,
    /// Stored records that could not be decoded.
    pub skipped: usize,
}

pub struct AlarmController<S, C, N> {
    store: S,
    clock: C,
    surface: N,
    snooze_minutes: u32,
    /// RINGING records the store refused. They shadow the stored record
    /// until a later write succeeds.
    unsaved: HashMap<AlarmId, Alarm>,
}

impl<S, C, N> AlarmController<S, C, N>
where
    S: AlarmStore,
    C: Clock,
    N: NotificationSurface,
{
    pub fn new(store: S, clock: C, surface: N) -> Self {
        Self {
            store,
            clock,
            surface,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            unsaved: HashMap::new(),
        }
    }

    /// Build a controller using the alarm settings from `config`.
    pub fn from_config(store: S, clock: C, surface: N, config: &Config) -> Self {
        Self::new(store, clock, surface).with_snooze_minutes(config.alarm.snooze_minutes)
    }

    /// Snooze length in minutes. Zero is raised to one.
    pub fn with_snooze_minutes(mut self, minutes: u32) -> Self {
        self.snooze_minutes = minutes.max(1);
        self
    }

    pub fn snooze_minutes(&self) -> u32 {
        self.snooze_minutes
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn surface(&self) -> &N {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut N {
        &mut self.surface
    }

    /// Validate `input`, persist it as a SCHEDULED alarm and arm its wake.
    ///
    /// Leading and trailing whitespace is trimmed from the name and the
    /// description before they are stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for an empty name or malformed time,
    /// in which case nothing is written.
    pub fn create(&mut self, input: NewAlarm) -> Result<Alarm> {
        let name = validate_name(&input.name)?;
        let time: AlarmTime = input.time.parse()?;

        let now = self.clock.now_utc();
        let next_fire_at = self.next_fire(time, input.repeat_days);
        let alarm = Alarm {
            id: AlarmId::new(),
            name,
            description: input.description.trim().to_string(),
            time,
            repeat_days: input.repeat_days,
            state: AlarmState::Scheduled,
            next_fire_at,
            created_at: now,
            updated_at: now,
        };

        self.store.put(&alarm)?;
        self.arm(&alarm);
        info!(id = %alarm.id, name = %alarm.name, next_fire_at = %alarm.next_fire_at, "alarm created");
        Ok(alarm)
    }

    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no alarm has this id.
    pub fn get(&self, id: AlarmId) -> Result<Alarm> {
        if let Some(alarm) = self.unsaved.get(&id) {
            return Ok(alarm.clone());
        }
        self.store.get(id)?.ok_or(CoreError::NotFound(id))
    }

    /// Ids of ringing alarms whose state has not reached the store yet.
    pub fn unsaved(&self) -> Vec<AlarmId> {
        let mut ids: Vec<AlarmId> = self.unsaved.keys().copied().collect();
        ids.sort();
        ids
    }

    /// All alarms ordered by time of day, ties broken by id.
    ///
    /// Unreadable records are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn list(&self) -> Result<Vec<Alarm>> {
        Ok(self.scan()?.0)
    }

    /// Edit a SCHEDULED or DISABLED alarm.
    ///
    /// All patch fields are validated before anything changes. A SCHEDULED
    /// alarm is re-armed at its recomputed fire time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for bad input and
    /// [`CoreError::InvalidState`] while the alarm is ringing or snoozed.
    pub fn update(&mut self, id: AlarmId, patch: AlarmPatch) -> Result<Alarm> {
        let mut alarm = self.get(id)?;
        if !matches!(alarm.state, AlarmState::Scheduled | AlarmState::Disabled) {
            return Err(invalid_state(&alarm, "update"));
        }

        let name = patch.name.as_deref().map(validate_name).transpose()?;
        let time = patch
            .time
            .as_deref()
            .map(str::parse::<AlarmTime>)
            .transpose()?;

        if let Some(name) = name {
            alarm.name = name;
        }
        if let Some(description) = patch.description {
            alarm.description = description.trim().to_string();
        }
        let reschedule = time.is_some() || patch.repeat_days.is_some();
        if let Some(time) = time {
            alarm.time = time;
        }
        if let Some(days) = patch.repeat_days {
            alarm.repeat_days = days;
        }
        if reschedule {
            alarm.next_fire_at = self.next_fire(alarm.time, alarm.repeat_days);
        }
        alarm.updated_at = self.clock.now_utc();

        self.store.put(&alarm)?;
        if reschedule && alarm.state == AlarmState::Scheduled {
            self.arm(&alarm);
        }
        info!(id = %id, "alarm updated");
        Ok(alarm)
    }

    /// Remove an alarm, cancel its wake and take down its ringing UI.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no alarm has this id.
    pub fn delete(&mut self, id: AlarmId) -> Result<()> {
        let alarm = self.get(id)?;
        let stored = self.store.delete(id)?;
        if self.unsaved.remove(&id).is_none() && !stored {
            return Err(CoreError::NotFound(id));
        }
        self.clock.disarm_wake(id);
        if alarm.state == AlarmState::Ringing {
            self.surface.dismiss(id);
        }
        info!(id = %id, "alarm deleted");
        Ok(())
    }

    /// Handle a wake delivered by the clock.
    ///
    /// The wake is accepted for a SCHEDULED alarm whose fire time has been
    /// reached, or a SNOOZED alarm whose snooze has run out. The alarm then
    /// rings and the surface is shown.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] and [`CoreError::InvalidState`] mean the wake
    /// is stale (see [`CoreError::is_stale_wake`]). A store error means the
    /// RINGING state could not be persisted even after one retry; the surface
    /// has been shown anyway and the controller keeps treating the alarm as
    /// RINGING, so it can still be snoozed or closed.
    pub fn on_wake(&mut self, id: AlarmId, fired_at: DateTime<Utc>) -> Result<Alarm> {
        let mut alarm = self.get(id)?;
        let accepted = match alarm.state {
            AlarmState::Scheduled => is_due(alarm.next_fire_at, fired_at),
            AlarmState::Snoozed { until } => is_due(until, fired_at),
            AlarmState::Ringing | AlarmState::Disabled => false,
        };
        if !accepted {
            return Err(invalid_state(&alarm, "wake"));
        }

        alarm.state = AlarmState::Ringing;
        alarm.updated_at = self.clock.now_utc();
        self.clock.disarm_wake(id);

        let persisted = self.put_with_retry(&alarm);
        self.surface.show(&alarm);
        if let Err(e) = persisted {
            self.unsaved.insert(id, alarm);
            return Err(e.into());
        }
        self.unsaved.remove(&id);

        info!(id = %id, name = %alarm.name, "alarm ringing");
        Ok(alarm)
    }

    /// Silence a ringing alarm for the configured snooze length.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the alarm is RINGING.
    pub fn snooze(&mut self, id: AlarmId) -> Result<Alarm> {
        let mut alarm = self.get(id)?;
        if alarm.state != AlarmState::Ringing {
            return Err(invalid_state(&alarm, "snooze"));
        }

        let now = self.clock.now_utc();
        let until = compute_snooze_until(now, self.snooze_minutes);
        alarm.state = AlarmState::Snoozed { until };
        alarm.updated_at = now;

        self.store.put(&alarm)?;
        self.unsaved.remove(&id);
        self.clock.arm_wake(id, until);
        self.surface.dismiss(id);
        info!(id = %id, until = %until, "alarm snoozed");
        Ok(alarm)
    }

    /// Stop a ringing or snoozed alarm.
    ///
    /// A one-shot alarm is deleted and `None` returned. A repeating alarm
    /// goes back to SCHEDULED at its next occurrence after now.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the alarm is RINGING or
    /// SNOOZED.
    pub fn close(&mut self, id: AlarmId) -> Result<Option<Alarm>> {
        let mut alarm = self.get(id)?;
        if !matches!(alarm.state, AlarmState::Ringing | AlarmState::Snoozed { .. }) {
            return Err(invalid_state(&alarm, "close"));
        }

        self.clock.disarm_wake(id);

        if alarm.is_once() {
            self.store.delete(id)?;
            self.unsaved.remove(&id);
            self.surface.dismiss(id);
            info!(id = %id, "one-shot alarm closed and removed");
            return Ok(None);
        }

        alarm.state = AlarmState::Scheduled;
        alarm.next_fire_at = self.next_fire(alarm.time, alarm.repeat_days);
        alarm.updated_at = self.clock.now_utc();

        self.store.put(&alarm)?;
        self.unsaved.remove(&id);
        self.arm(&alarm);
        self.surface.dismiss(id);
        info!(id = %id, next_fire_at = %alarm.next_fire_at, "alarm closed");
        Ok(Some(alarm))
    }

    /// Pause a SCHEDULED alarm.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the alarm is SCHEDULED.
    pub fn disable(&mut self, id: AlarmId) -> Result<Alarm> {
        let mut alarm = self.get(id)?;
        if alarm.state != AlarmState::Scheduled {
            return Err(invalid_state(&alarm, "disable"));
        }

        alarm.state = AlarmState::Disabled;
        alarm.updated_at = self.clock.now_utc();
        self.store.put(&alarm)?;
        self.clock.disarm_wake(id);
        info!(id = %id, "alarm disabled");
        Ok(alarm)
    }

    /// Resume a DISABLED alarm at its next occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidState`] unless the alarm is DISABLED.
    pub fn enable(&mut self, id: AlarmId) -> Result<Alarm> {
        let mut alarm = self.get(id)?;
        if alarm.state != AlarmState::Disabled {
            return Err(invalid_state(&alarm, "enable"));
        }

        alarm.state = AlarmState::Scheduled;
        alarm.next_fire_at = self.next_fire(alarm.time, alarm.repeat_days);
        alarm.updated_at = self.clock.now_utc();
        self.store.put(&alarm)?;
        self.arm(&alarm);
        info!(id = %id, next_fire_at = %alarm.next_fire_at, "alarm enabled");
        Ok(alarm)
    }

    /// Rebuild the armed wake set from the store.
    ///
    /// Run on startup and whenever the store may have been changed by
    /// another process. Wakes missed while nothing was running fire now.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be listed. Unreadable records
    /// and failures while ringing an individual missed alarm are logged and
    /// skipped.
    pub fn sync(&mut self) -> Result<SyncReport> {
        self.clock.disarm_all();
        self.flush_unsaved();
        let now = self.clock.now_utc();
        let (alarms, skipped) = self.scan()?;
        let mut report = SyncReport {
            skipped,
            ..SyncReport::default()
        };

        for alarm in alarms {
            if alarm.state == AlarmState::Ringing {
                self.surface.show(&alarm);
                report.ringing += 1;
                continue;
            }
            let Some(at) = alarm.pending_wake() else {
                continue;
            };
            if !is_due(at, now) {
                self.clock.arm_wake(alarm.id, at);
                report.armed += 1;
                continue;
            }

            warn!(id = %alarm.id, missed_at = %at, "missed wake, ringing now");
            match self.on_wake(alarm.id, now) {
                Ok(_) => report.fired += 1,
                Err(e) if e.is_stale_wake() => {
                    debug!(id = %alarm.id, "alarm changed during sync: {e}");
                }
                Err(e) => {
                    error!(id = %alarm.id, "failed to ring missed alarm: {e}");
                    report.fired += 1;
                }
            }
        }

        debug!(?report, "sync complete");
        Ok(report)
    }

    /// Decodable alarms with unsaved records overlaid, sorted, plus the
    /// number of records skipped.
    fn scan(&self) -> Result<(Vec<Alarm>, usize)> {
        let scan = self.store.scan()?;
        for e in &scan.corrupt {
            warn!("skipping unreadable alarm: {e}");
        }

        let mut alarms: Vec<Alarm> = scan
            .alarms
            .into_iter()
            .map(|a| self.unsaved.get(&a.id).cloned().unwrap_or(a))
            .collect();
        alarms.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.id.cmp(&b.id)));
        Ok((alarms, scan.corrupt.len()))
    }

    /// Retry writes the store refused earlier.
    fn flush_unsaved(&mut self) {
        let ids: Vec<AlarmId> = self.unsaved.keys().copied().collect();
        for id in ids {
            let Some(alarm) = self.unsaved.get(&id) else {
                continue;
            };
            match self.store.put(alarm) {
                Ok(()) => {
                    info!(%id, "ringing state saved");
                    self.unsaved.remove(&id);
                }
                Err(e) => warn!(%id, "ringing state still not saved: {e}"),
            }
        }
    }

    fn next_fire(&self, time: AlarmTime, days: RepeatDays) -> DateTime<Utc> {
        compute_next_fire(time, days, &self.clock.now()).with_timezone(&Utc)
    }

    fn arm(&mut self, alarm: &Alarm) {
        if let Some(at) = alarm.pending_wake() {
            self.clock.arm_wake(alarm.id, at);
        }
    }

    fn put_with_retry(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        match self.store.put(alarm) {
            Ok(()) => Ok(()),
            Err(first) => {
                warn!(id = %alarm.id, "store write failed, retrying: {first}");
                self.store.put(alarm).map_err(|e| {
                    error!(id = %alarm.id, "store write failed twice: {e}");
                    e
                })
            }
        }
    }
}

fn invalid_state(alarm: &Alarm, operation: &'static str) -> CoreError {
    CoreError::InvalidState {
        id: alarm.id,
        operation,
        state: alarm.state.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ValidationError;
    use crate::notify::{RecordingSurface, SurfaceCall};
    use crate::storage::MemoryStore;
    use chrono::Duration;

    type TestController = AlarmController<MemoryStore, ManualClock, RecordingSurface>;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    // 2024-06-12 is a Wednesday.
    fn controller() -> TestController {
        AlarmController::new(
            MemoryStore::new(),
            ManualClock::new(at("2024-06-12T09:00:00Z")),
            RecordingSurface::new(),
        )
    }

    fn ring(ctl: &mut TestController) -> Vec<Alarm> {
        let wakes = ctl.clock_mut().advance_to_next_wake();
        wakes
            .into_iter()
            .map(|w| ctl.on_wake(w.id, w.fired_at).unwrap())
            .collect()
    }

    #[test]
    fn create_arms_next_occurrence() {
        let mut ctl = controller();
        let alarm = ctl
            .create(NewAlarm::new("  Wake up ", "10:00").description(" coffee first\n"))
            .unwrap();
        assert_eq!(alarm.name(), "Wake up");
        assert_eq!(alarm.description(), "coffee first");
        assert_eq!(alarm.state(), AlarmState::Scheduled);
        assert_eq!(alarm.next_fire_at(), at("2024-06-12T10:00:00Z"));
        assert_eq!(ctl.clock().armed_at(alarm.id()), Some(alarm.next_fire_at()));
        assert_eq!(ctl.get(alarm.id()).unwrap(), alarm);
    }

    #[test]
    fn create_rejects_bad_input_without_writing() {
        let mut ctl = controller();
        assert!(matches!(
            ctl.create(NewAlarm::new("   ", "10:00")),
            Err(CoreError::Validation(ValidationError::EmptyName))
        ));
        assert!(matches!(
            ctl.create(NewAlarm::new("Run", "25:00")),
            Err(CoreError::Validation(ValidationError::MalformedTime(_)))
        ));
        assert!(ctl.store().is_empty());
        assert_eq!(ctl.clock().armed_count(), 0);
    }

    #[test]
    fn wake_rings_and_shows_surface() {
        let mut ctl = controller();
        let alarm = ctl
            .create(NewAlarm::new("Tea", "09:30").description("green"))
            .unwrap();
        let rung = ring(&mut ctl);
        assert_eq!(rung.len(), 1);
        assert_eq!(ctl.get(alarm.id()).unwrap().state(), AlarmState::Ringing);
        assert_eq!(
            ctl.surface().calls(),
            &[SurfaceCall::Shown {
                id: alarm.id(),
                name: "Tea".into(),
                description: "green".into(),
            }]
        );
    }

    #[test]
    fn early_or_repeated_wake_is_stale() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();

        let early = ctl.on_wake(alarm.id(), at("2024-06-12T09:29:00Z"));
        assert!(early.unwrap_err().is_stale_wake());

        ctl.on_wake(alarm.id(), at("2024-06-12T09:30:00Z")).unwrap();
        let again = ctl.on_wake(alarm.id(), at("2024-06-12T09:31:00Z"));
        assert!(matches!(again, Err(CoreError::InvalidState { operation: "wake", .. })));
        assert_eq!(ctl.surface().calls().len(), 1);

        let missing = ctl.on_wake(AlarmId::new(), at("2024-06-12T09:31:00Z"));
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn snooze_then_wake_rings_again() {
        let mut ctl = controller().with_snooze_minutes(10);
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ring(&mut ctl);

        let snoozed = ctl.snooze(alarm.id()).unwrap();
        assert_eq!(snoozed.snooze_until(), Some(at("2024-06-12T09:40:00Z")));
        assert!(ctl.surface().showing().is_empty());

        let rung = ring(&mut ctl);
        assert_eq!(rung[0].state(), AlarmState::Ringing);
        assert_eq!(ctl.clock().now(), at("2024-06-12T09:40:00Z"));
        assert_eq!(ctl.surface().showing(), vec![alarm.id()]);
    }

    #[test]
    fn close_repeating_alarm_reschedules() {
        let mut ctl = controller();
        let days: RepeatDays = "wed,fri".parse().unwrap();
        let alarm = ctl
            .create(NewAlarm::new("Gym", "09:30").repeat_on(days))
            .unwrap();
        ring(&mut ctl);

        let closed = ctl.close(alarm.id()).unwrap().unwrap();
        assert_eq!(closed.state(), AlarmState::Scheduled);
        assert_eq!(closed.next_fire_at(), at("2024-06-14T09:30:00Z"));
        assert_eq!(ctl.clock().armed_at(alarm.id()), Some(closed.next_fire_at()));
        assert!(ctl.surface().showing().is_empty());
    }

    #[test]
    fn close_snoozed_once_alarm_deletes_it() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ring(&mut ctl);
        ctl.snooze(alarm.id()).unwrap();

        assert!(ctl.close(alarm.id()).unwrap().is_none());
        assert!(matches!(ctl.get(alarm.id()), Err(CoreError::NotFound(_))));
        assert_eq!(ctl.clock().armed_count(), 0);
    }

    #[test]
    fn close_requires_ringing_or_snoozed() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        assert!(matches!(
            ctl.close(alarm.id()),
            Err(CoreError::InvalidState { operation: "close", state: "SCHEDULED", .. })
        ));
    }

    #[test]
    fn ringing_transition_retries_once() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ctl.store_mut().fail_next_puts(1);

        let rung = ring(&mut ctl);
        assert_eq!(rung[0].state(), AlarmState::Ringing);
        assert_eq!(ctl.get(alarm.id()).unwrap().state(), AlarmState::Ringing);
    }

    fn ring_with_failing_store(ctl: &mut TestController) -> Alarm {
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ctl.store_mut().fail_next_puts(2);

        let wake = ctl.clock_mut().advance_to_next_wake().remove(0);
        let result = ctl.on_wake(wake.id, wake.fired_at);
        assert!(matches!(result, Err(CoreError::Store(StoreError::Locked))));
        alarm
    }

    #[test]
    fn unsaved_ringing_alarm_stays_ringing() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);

        assert_eq!(ctl.surface().showing(), vec![alarm.id()]);
        assert_eq!(ctl.get(alarm.id()).unwrap().state(), AlarmState::Ringing);
        assert_eq!(ctl.list().unwrap()[0].state(), AlarmState::Ringing);
        assert_eq!(ctl.unsaved(), vec![alarm.id()]);
        let stored = ctl.store().get(alarm.id()).unwrap().unwrap();
        assert_eq!(stored.state(), AlarmState::Scheduled);

        // A second wake must not ring it again.
        let again = ctl.on_wake(alarm.id(), at("2024-06-12T09:31:00Z"));
        assert!(again.unwrap_err().is_stale_wake());
    }

    #[test]
    fn unsaved_ringing_alarm_can_be_snoozed() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);

        let snoozed = ctl.snooze(alarm.id()).unwrap();
        assert!(matches!(snoozed.state(), AlarmState::Snoozed { .. }));
        assert!(ctl.unsaved().is_empty());
        let stored = ctl.store().get(alarm.id()).unwrap().unwrap();
        assert_eq!(stored.state(), snoozed.state());
        assert!(ctl.surface().showing().is_empty());
    }

    #[test]
    fn unsaved_ringing_alarm_can_be_closed() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);

        assert!(ctl.close(alarm.id()).unwrap().is_none());
        assert!(ctl.unsaved().is_empty());
        assert!(matches!(ctl.get(alarm.id()), Err(CoreError::NotFound(_))));
        assert!(ctl.store().is_empty());
        assert_eq!(ctl.clock().armed_count(), 0);
    }

    #[test]
    fn unsaved_ringing_alarm_can_be_deleted() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);

        ctl.delete(alarm.id()).unwrap();
        assert!(ctl.unsaved().is_empty());
        assert!(ctl.surface().showing().is_empty());
        assert!(matches!(ctl.get(alarm.id()), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn sync_saves_unsaved_ringing_state() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);

        let report = ctl.sync().unwrap();
        assert_eq!(report.ringing, 1);
        assert_eq!(report.fired, 0);
        assert!(ctl.unsaved().is_empty());
        let stored = ctl.store().get(alarm.id()).unwrap().unwrap();
        assert_eq!(stored.state(), AlarmState::Ringing);
    }

    #[test]
    fn sync_keeps_ringing_while_store_still_fails() {
        let mut ctl = controller();
        let alarm = ring_with_failing_store(&mut ctl);
        ctl.store_mut().fail_next_puts(1);

        let report = ctl.sync().unwrap();
        // Still ringing from memory; the stale SCHEDULED row is not re-fired.
        assert_eq!(report.ringing, 1);
        assert_eq!(report.fired, 0);
        assert_eq!(ctl.unsaved(), vec![alarm.id()]);
    }

    #[test]
    fn disable_and_enable() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();

        let disabled = ctl.disable(alarm.id()).unwrap();
        assert_eq!(disabled.state(), AlarmState::Disabled);
        assert_eq!(ctl.clock().armed_count(), 0);
        assert!(ctl.advance_and_ring(Duration::hours(2)).is_empty());

        let enabled = ctl.enable(alarm.id()).unwrap();
        assert_eq!(enabled.state(), AlarmState::Scheduled);
        assert_eq!(enabled.next_fire_at(), at("2024-06-13T09:30:00Z"));
        assert!(matches!(
            ctl.enable(alarm.id()),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn disable_rejected_while_ringing() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ring(&mut ctl);
        assert!(matches!(
            ctl.disable(alarm.id()),
            Err(CoreError::InvalidState { state: "RINGING", .. })
        ));
    }

    #[test]
    fn update_reschedules_and_validates() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();

        let patch = AlarmPatch {
            time: Some("08:00".into()),
            ..AlarmPatch::default()
        };
        let updated = ctl.update(alarm.id(), patch).unwrap();
        assert_eq!(updated.next_fire_at(), at("2024-06-13T08:00:00Z"));
        assert_eq!(ctl.clock().armed_at(alarm.id()), Some(updated.next_fire_at()));

        let bad = AlarmPatch {
            name: Some("Coffee".into()),
            time: Some("8".into()),
            ..AlarmPatch::default()
        };
        assert!(ctl.update(alarm.id(), bad).is_err());
        assert_eq!(ctl.get(alarm.id()).unwrap().name(), "Tea");
    }

    #[test]
    fn delete_disarms_and_dismisses() {
        let mut ctl = controller();
        let alarm = ctl.create(NewAlarm::new("Tea", "09:30")).unwrap();
        ring(&mut ctl);

        ctl.delete(alarm.id()).unwrap();
        assert!(ctl.surface().showing().is_empty());
        assert!(matches!(ctl.delete(alarm.id()), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn sync_fires_missed_and_arms_future() {
        let mut ctl = controller();
        let missed = ctl.create(NewAlarm::new("Missed", "09:30")).unwrap();
        let future = ctl.create(NewAlarm::new("Later", "18:00")).unwrap();

        // Time passes with nothing listening for wakes.
        ctl.clock_mut().disarm_all();
        ctl.clock_mut().set(at("2024-06-12T10:00:00Z"));

        let report = ctl.sync().unwrap();
        assert_eq!(
            report,
            SyncReport {
                armed: 1,
                fired: 1,
                ringing: 0,
                skipped: 0,
            }
        );
        assert_eq!(ctl.get(missed.id()).unwrap().state(), AlarmState::Ringing);
        assert_eq!(ctl.clock().armed_at(future.id()), Some(future.next_fire_at()));

        let again = ctl.sync().unwrap();
        assert_eq!(again.ringing, 1);
        assert_eq!(again.fired, 0);
    }

    #[test]
    fn list_sorted_by_time() {
        let mut ctl = controller();
        ctl.create(NewAlarm::new("B", "18:00")).unwrap();
        ctl.create(NewAlarm::new("A", "06:00")).unwrap();
        let names: Vec<_> = ctl
            .list()
            .unwrap()
            .iter()
            .map(|a| a.name().to_string())
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    impl TestController {
        fn advance_and_ring(&mut self, by: Duration) -> Vec<Alarm> {
            let wakes = self.clock_mut().advance(by);
            wakes
                .into_iter()
                .map(|w| self.on_wake(w.id, w.fired_at).unwrap())
                .collect()
        }
    }
}
