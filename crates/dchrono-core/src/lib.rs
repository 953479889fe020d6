//! # dChrono Core Library
//!
//! Alarm scheduling and lifecycle engine for the dChrono alarm clock. The
//! `dchrono` CLI and its `run` daemon are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Schedule Engine**: pure functions computing the next fire instant,
//!   due-ness and snooze deadlines
//! - **Lifecycle Controller**: the only component that changes alarm state;
//!   drives the store, the clock and the notification surface
//! - **Storage**: in-memory and SQLite alarm stores, TOML configuration
//! - **Clock**: wall-clock time plus per-alarm wakes (manual, system, tokio)
//!
//! ## Key Components
//!
//! - [`AlarmController`]: alarm state machine
//! - [`AlarmStore`]: persistence seam, see [`SqliteStore`]
//! - [`Clock`]: time source and wake primitive
//! - [`Config`]: application configuration management

pub mod alarm;
pub mod clock;
pub mod controller;
pub mod error;
pub mod notify;
pub mod storage;

pub use alarm::{Alarm, AlarmId, AlarmPatch, AlarmState, AlarmTime, NewAlarm, RepeatDays};
pub use clock::{Clock, ManualClock, SystemClock, TokioClock, Wake};
pub use controller::{AlarmController, SyncReport};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use notify::{NotificationSurface, RecordingSurface, SurfaceCall};
pub use storage::{AlarmStore, Config, MemoryStore, Scan, SqliteStore};
