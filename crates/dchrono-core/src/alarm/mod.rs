//! Alarm data model.
//!
//! An [`Alarm`] is the only persisted entity. Its lifecycle state is a tagged
//! enum so the snooze deadline can only exist while the alarm is snoozed.

pub mod schedule;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

pub use schedule::{compute_next_fire, compute_snooze_until, is_due, DEFAULT_SNOOZE_MINUTES};

/// Opaque, immutable alarm identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(Uuid);

impl Default for AlarmId {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AlarmId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Local wall-clock time of day, minute precision.
///
/// Textual form is `HH:MM`, which is also how it serializes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AlarmTime {
    hour: u8,
    minute: u8,
}

impl AlarmTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::MalformedTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // Range is checked on construction.
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for AlarmTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(malformed)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(malformed());
        }
        let hour = h.parse::<u8>().map_err(|_| malformed())?;
        let minute = m.parse::<u8>().map_err(|_| malformed())?;
        Self::new(hour, minute).map_err(|_| malformed())
    }
}

impl TryFrom<String> for AlarmTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AlarmTime> for String {
    fn from(time: AlarmTime) -> Self {
        time.to_string()
    }
}

/// Set of weekdays an alarm repeats on. Empty means "Once".
///
/// Stored as a bitmask with Monday in bit 0; serialized as a list of
/// weekday names in Monday-first order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Weekday>", into = "Vec<Weekday>")]
pub struct RepeatDays(u8);

const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

impl RepeatDays {
    /// The empty set: fire once.
    pub const fn once() -> Self {
        Self(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & bit(day) != 0
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= bit(day);
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Weekdays in the set, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        ALL_WEEKDAYS.into_iter().filter(|d| self.contains(*d))
    }

    /// Display label for list views: `Once` or `Mon, Wed`.
    pub fn label(&self) -> String {
        if self.is_empty() {
            return "Once".to_string();
        }
        self.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn bits(&self) -> u8 {
        self.0
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        Self(bits & 0b0111_1111)
    }
}

fn bit(day: Weekday) -> u8 {
    1 << day.num_days_from_monday()
}

impl FromIterator<Weekday> for RepeatDays {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        let mut days = Self::once();
        for day in iter {
            days.insert(day);
        }
        days
    }
}

impl From<Vec<Weekday>> for RepeatDays {
    fn from(days: Vec<Weekday>) -> Self {
        days.into_iter().collect()
    }
}

impl From<RepeatDays> for Vec<Weekday> {
    fn from(days: RepeatDays) -> Self {
        days.iter().collect()
    }
}

/// Parses a comma-separated weekday list such as `mon,wed,fri`.
/// An empty string or `once` yields the empty set.
impl FromStr for RepeatDays {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("once") {
            return Ok(Self::once());
        }
        s.split(',')
            .map(|part| {
                part.trim()
                    .parse::<Weekday>()
                    .map_err(|_| ValidationError::InvalidValue {
                        field: "repeat_days".into(),
                        message: format!("unknown weekday '{}'", part.trim()),
                    })
            })
            .collect()
    }
}

impl fmt::Display for RepeatDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Lifecycle state of an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmState {
    Scheduled,
    Ringing,
    Snoozed { until: DateTime<Utc> },
    /// Paused by the user; not armed.
    Disabled,
}

impl AlarmState {
    pub fn name(&self) -> &'static str {
        match self {
            AlarmState::Scheduled => "SCHEDULED",
            AlarmState::Ringing => "RINGING",
            AlarmState::Snoozed { .. } => "SNOOZED",
            AlarmState::Disabled => "DISABLED",
        }
    }

    pub fn snooze_until(&self) -> Option<DateTime<Utc>> {
        match self {
            AlarmState::Snoozed { until } => Some(*until),
            _ => None,
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A persisted alarm record.
///
/// Fields are read-only outside the crate; state changes go through
/// [`crate::AlarmController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub(crate) id: AlarmId,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: String,
    pub(crate) time: AlarmTime,
    #[serde(default)]
    pub(crate) repeat_days: RepeatDays,
    pub(crate) state: AlarmState,
    pub(crate) next_fire_at: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Alarm {
    pub fn id(&self) -> AlarmId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn time(&self) -> AlarmTime {
        self.time
    }

    pub fn repeat_days(&self) -> RepeatDays {
        self.repeat_days
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn snooze_until(&self) -> Option<DateTime<Utc>> {
        self.state.snooze_until()
    }

    pub fn next_fire_at(&self) -> DateTime<Utc> {
        self.next_fire_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_once(&self) -> bool {
        self.repeat_days.is_empty()
    }

    /// The instant this alarm is waiting for, if it is armed at all.
    pub fn pending_wake(&self) -> Option<DateTime<Utc>> {
        match self.state {
            AlarmState::Scheduled => Some(self.next_fire_at),
            AlarmState::Snoozed { until } => Some(until),
            AlarmState::Ringing | AlarmState::Disabled => None,
        }
    }
}

/// User input for a new alarm, as submitted by a "save" action.
#[derive(Debug, Clone, Default)]
pub struct NewAlarm {
    pub name: String,
    pub description: String,
    /// `HH:MM`
    pub time: String,
    pub repeat_days: RepeatDays,
}

impl NewAlarm {
    pub fn new(name: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: time.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn repeat_on(mut self, days: RepeatDays) -> Self {
        self.repeat_days = days;
        self
    }
}

/// Partial edit of an existing alarm. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct AlarmPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub time: Option<String>,
    pub repeat_days: Option<RepeatDays>,
}

impl AlarmPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.time.is_none()
            && self.repeat_days.is_none()
    }
}

pub(crate) fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed.to_string())
}
