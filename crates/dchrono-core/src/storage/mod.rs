//! Alarm persistence and configuration storage.

mod config;
pub mod database;
mod memory;
pub mod migrations;

pub use config::{AlarmConfig, Config, LogConfig, Theme, UiConfig};
pub use database::SqliteStore;
pub use memory::MemoryStore;

use std::path::PathBuf;

use crate::alarm::{Alarm, AlarmId};
use crate::error::StoreError;

/// Durable mapping of alarms keyed by id.
///
/// `put` is an upsert and must be atomic per key. The persistence format is
/// up to the implementation.
pub trait AlarmStore {
    fn get(&self, id: AlarmId) -> Result<Option<Alarm>, StoreError>;

    fn put(&mut self, alarm: &Alarm) -> Result<(), StoreError>;

    /// Remove the alarm. Returns whether it existed.
    fn delete(&mut self, id: AlarmId) -> Result<bool, StoreError>;

    fn list(&self) -> Result<Vec<Alarm>, StoreError>;

    /// Like [`list`](AlarmStore::list), but records that cannot be decoded
    /// are reported next to the good ones instead of failing the call.
    fn scan(&self) -> Result<Scan, StoreError> {
        Ok(Scan {
            alarms: self.list()?,
            corrupt: Vec::new(),
        })
    }
}

/// Output of [`AlarmStore::scan`].
#[derive(Debug, Default)]
pub struct Scan {
    pub alarms: Vec<Alarm>,
    pub corrupt: Vec<StoreError>,
}

/// Returns the dChrono data directory, creating it if needed.
///
/// `DCHRONO_DATA_DIR` wins when set. Otherwise `~/.config/dchrono`, or
/// `~/.config/dchrono-dev` with `DCHRONO_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("DCHRONO_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("DCHRONO_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("dchrono-dev")
            } else {
                base_dir.join("dchrono")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
