//! Foreground alarm daemon.
//!
//! Owns the controller inside a single task and handles one event at a
//! time: clock wakes, periodic resyncs from the database and ctrl-c.

use std::time::Duration;

use dchrono_core::{AlarmController, Config, SqliteStore, TokioClock, Wake};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use super::CommandResult;
use crate::surface::ConsoleSurface;

type Controller = AlarmController<SqliteStore, TokioClock, ConsoleSurface>;

pub fn run(config: Config) -> CommandResult {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(daemon(config))
}

async fn daemon(config: Config) -> CommandResult {
    let store = SqliteStore::open()?;
    let (clock, mut wakes) = TokioClock::new();
    let surface = ConsoleSurface::new(&config.ui.time_format);
    let mut ctl = AlarmController::from_config(store, clock, surface, &config);

    let report = ctl.sync()?;
    info!(
        armed = report.armed,
        fired = report.fired,
        ringing = report.ringing,
        skipped = report.skipped,
        "daemon started"
    );

    let period = Duration::from_secs(config.alarm.resync_interval_secs.max(1));
    let mut resync = tokio::time::interval(period);
    resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; startup already synced.
    resync.tick().await;

    loop {
        tokio::select! {
            Some(wake) = wakes.recv() => handle_wake(&mut ctl, wake),
            _ = resync.tick() => {
                if let Err(e) = ctl.sync() {
                    warn!("resync failed: {e}");
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("shutting down");
                break;
            }
        }
    }
    Ok(())
}

fn handle_wake(ctl: &mut Controller, wake: Wake) {
    match ctl.on_wake(wake.id, wake.fired_at) {
        Ok(alarm) => info!(id = %alarm.id(), "alarm rang"),
        Err(e) if e.is_stale_wake() => warn!(id = %wake.id, "ignoring stale wake: {e}"),
        Err(e) => error!(id = %wake.id, "wake handling failed: {e}"),
    }
}
