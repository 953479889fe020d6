//! SQLite-based alarm storage.
//!
//! One row per alarm, keyed by id. Writes are single-statement upserts, so
//! each `put` is atomic for its key even with several processes sharing the
//! file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{data_dir, migrations, AlarmStore, Scan};
use crate::alarm::{Alarm, AlarmId, AlarmState, AlarmTime, RepeatDays};
use crate::error::StoreError;

const DB_FILE: &str = "dchrono.db";
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_COLUMNS: &str = "SELECT id, name, description, hour, minute, repeat_days, state,
        snooze_until, next_fire_at, created_at, updated_at FROM alarms";

// === Helper Functions ===

/// Format alarm state for database storage
fn format_state(state: &AlarmState) -> &'static str {
    state.name()
}

/// Parse alarm state from its database columns
fn parse_state(
    state_str: &str,
    snooze_until: Option<DateTime<Utc>>,
) -> Result<AlarmState, String> {
    match (state_str, snooze_until) {
        ("SCHEDULED", _) => Ok(AlarmState::Scheduled),
        ("RINGING", _) => Ok(AlarmState::Ringing),
        ("SNOOZED", Some(until)) => Ok(AlarmState::Snoozed { until }),
        ("SNOOZED", None) => Err("SNOOZED row without snooze_until".into()),
        ("DISABLED", _) => Ok(AlarmState::Disabled),
        (other, _) => Err(format!("unknown state '{other}'")),
    }
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{value}': {e}"))
}

/// Raw column values of one `alarms` row.
struct AlarmRow {
    id: String,
    name: String,
    description: String,
    hour: i64,
    minute: i64,
    repeat_days: i64,
    state: String,
    snooze_until: Option<String>,
    next_fire_at: String,
    created_at: String,
    updated_at: String,
}

impl AlarmRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            hour: row.get(3)?,
            minute: row.get(4)?,
            repeat_days: row.get(5)?,
            state: row.get(6)?,
            snooze_until: row.get(7)?,
            next_fire_at: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_alarm(self) -> Result<Alarm, StoreError> {
        let corrupt = |message: String| StoreError::Corrupt {
            id: self.id.clone(),
            message,
        };

        let id: AlarmId = self.id.parse().map_err(|e| corrupt(format!("bad id: {e}")))?;
        let hour = u8::try_from(self.hour).map_err(|_| corrupt("hour out of range".into()))?;
        let minute =
            u8::try_from(self.minute).map_err(|_| corrupt("minute out of range".into()))?;
        let time = AlarmTime::new(hour, minute).map_err(|e| corrupt(e.to_string()))?;
        let repeat_days = u8::try_from(self.repeat_days)
            .map(RepeatDays::from_bits)
            .map_err(|_| corrupt("repeat_days out of range".into()))?;
        let snooze_until = self
            .snooze_until
            .as_deref()
            .map(parse_instant)
            .transpose()
            .map_err(corrupt)?;
        let state = parse_state(&self.state, snooze_until).map_err(corrupt)?;

        Ok(Alarm {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            time,
            repeat_days,
            state,
            next_fire_at: parse_instant(&self.next_fire_at).map_err(corrupt)?,
            created_at: parse_instant(&self.created_at).map_err(corrupt)?,
            updated_at: parse_instant(&self.updated_at).map_err(corrupt)?,
        })
    }
}

/// SQLite alarm store.
///
/// Survives process restarts; the default location is
/// `<data_dir>/dchrono.db`.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database in the data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let dir = data_dir().map_err(|e| StoreError::DataDir(e.to_string()))?;
        Self::open_at(dir.join(DB_FILE))
    }

    /// Open (or create) the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let conn = Connection::open(&path).map_err(|source| StoreError::OpenFailed {
            path: path.clone(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }
}

impl AlarmStore for SqliteStore {
    fn get(&self, id: AlarmId) -> Result<Option<Alarm>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
        let row = stmt
            .query_row(params![id.to_string()], AlarmRow::from_row)
            .optional()?;
        row.map(AlarmRow::into_alarm).transpose()
    }

    fn put(&mut self, alarm: &Alarm) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO alarms (id, name, description, hour, minute, repeat_days, state,
                                 snooze_until, next_fire_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                hour = excluded.hour,
                minute = excluded.minute,
                repeat_days = excluded.repeat_days,
                state = excluded.state,
                snooze_until = excluded.snooze_until,
                next_fire_at = excluded.next_fire_at,
                updated_at = excluded.updated_at",
            params![
                alarm.id.to_string(),
                alarm.name,
                alarm.description,
                alarm.time.hour(),
                alarm.time.minute(),
                alarm.repeat_days.bits(),
                format_state(&alarm.state),
                alarm.state.snooze_until().map(|t| t.to_rfc3339()),
                alarm.next_fire_at.to_rfc3339(),
                alarm.created_at.to_rfc3339(),
                alarm.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete(&mut self, id: AlarmId) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM alarms WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn list(&self) -> Result<Vec<Alarm>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY hour, minute, id"))?;
        let rows = stmt.query_map([], AlarmRow::from_row)?;

        let mut alarms = Vec::new();
        for row in rows {
            alarms.push(row?.into_alarm()?);
        }
        Ok(alarms)
    }

    fn scan(&self) -> Result<Scan, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY hour, minute, id"))?;
        let rows = stmt.query_map([], AlarmRow::from_row)?;

        let mut scan = Scan::default();
        for row in rows {
            let decoded = match row {
                Ok(row) => row.into_alarm(),
                // Column holds a value of the wrong type.
                Err(e @ (rusqlite::Error::InvalidColumnType(..)
                | rusqlite::Error::FromSqlConversionFailure(..))) => Err(StoreError::Corrupt {
                    id: "?".into(),
                    message: e.to_string(),
                }),
                Err(e) => return Err(e.into()),
            };
            match decoded {
                Ok(alarm) => scan.alarms.push(alarm),
                Err(e) => scan.corrupt.push(e),
            }
        }
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(state: AlarmState) -> Alarm {
        let now = DateTime::parse_from_rfc3339("2024-06-12T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Alarm {
            id: AlarmId::new(),
            name: "Stand-up".into(),
            description: "daily sync".into(),
            time: "09:30".parse().unwrap(),
            repeat_days: "mon,tue,wed,thu,fri".parse().unwrap(),
            state,
            next_fire_at: now + Duration::minutes(30),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn put_then_get() {
        let mut store = SqliteStore::open_memory().unwrap();
        let alarm = sample(AlarmState::Scheduled);
        store.put(&alarm).unwrap();
        assert_eq!(store.get(alarm.id).unwrap(), Some(alarm));
    }

    #[test]
    fn snoozed_state_keeps_deadline() {
        let mut store = SqliteStore::open_memory().unwrap();
        let until = Utc::now();
        let alarm = sample(AlarmState::Snoozed { until });
        store.put(&alarm).unwrap();
        let loaded = store.get(alarm.id).unwrap().unwrap();
        // rfc3339 keeps sub-second precision
        assert_eq!(loaded.snooze_until(), Some(until));
    }

    #[test]
    fn put_overwrites_existing_row() {
        let mut store = SqliteStore::open_memory().unwrap();
        let mut alarm = sample(AlarmState::Scheduled);
        store.put(&alarm).unwrap();
        alarm.state = AlarmState::Ringing;
        alarm.name = "Renamed".into();
        store.put(&alarm).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].state, AlarmState::Ringing);
        assert_eq!(all[0].name, "Renamed");
    }

    #[test]
    fn delete_reports_existence() {
        let mut store = SqliteStore::open_memory().unwrap();
        let alarm = sample(AlarmState::Scheduled);
        store.put(&alarm).unwrap();
        assert!(store.delete(alarm.id).unwrap());
        assert!(!store.delete(alarm.id).unwrap());
        assert!(store.get(alarm.id).unwrap().is_none());
    }

    #[test]
    fn list_orders_by_time() {
        let mut store = SqliteStore::open_memory().unwrap();
        let mut late = sample(AlarmState::Scheduled);
        late.time = "18:00".parse().unwrap();
        let mut early = sample(AlarmState::Scheduled);
        early.time = "06:15".parse().unwrap();
        store.put(&late).unwrap();
        store.put(&early).unwrap();

        let times: Vec<_> = store.list().unwrap().into_iter().map(|a| a.time).collect();
        assert_eq!(times, vec![early.time, late.time]);
    }

    #[test]
    fn corrupt_row_is_reported() {
        let store = SqliteStore::open_memory().unwrap();
        let id = AlarmId::new();
        store
            .conn()
            .execute(
                "INSERT INTO alarms (id, name, hour, minute, state, next_fire_at, created_at, updated_at)
                 VALUES (?1, 'x', 7, 0, 'SNOOZED', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z')",
                params![id.to_string()],
            )
            .unwrap();
        assert!(matches!(store.get(id), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn scan_skips_corrupt_rows() {
        let mut store = SqliteStore::open_memory().unwrap();
        let good = sample(AlarmState::Scheduled);
        store.put(&good).unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO alarms (id, name, hour, minute, state, next_fire_at, created_at, updated_at)
                 VALUES (?1, 'x', 7, 0, 'SNOOZED', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z')",
                params![AlarmId::new().to_string()],
            )
            .unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO alarms (id, name, hour, minute, state, next_fire_at, created_at, updated_at)
                 VALUES (?1, 'y', 'seven', 0, 'SCHEDULED', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z', '2024-06-12T09:00:00Z')",
                params![AlarmId::new().to_string()],
            )
            .unwrap();

        assert!(store.list().is_err());
        let scan = store.scan().unwrap();
        assert_eq!(scan.alarms, vec![good]);
        assert_eq!(scan.corrupt.len(), 2);
    }
}
