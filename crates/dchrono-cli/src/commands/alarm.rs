use clap::Subcommand;
use dchrono_core::{
    Alarm, AlarmController, AlarmId, AlarmPatch, Config, NewAlarm, RepeatDays, SqliteStore,
    SystemClock,
};

use super::CommandResult;
use crate::surface::{format_time, ConsoleSurface};

type Controller = AlarmController<SqliteStore, SystemClock, ConsoleSurface>;

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create a new alarm
    Add {
        /// Alarm name
        name: String,
        /// Time of day, HH:MM (defaults to alarm.default_time)
        time: Option<String>,
        /// Optional description shown while ringing
        #[arg(long, default_value = "")]
        description: String,
        /// Repeat days, e.g. "mon,wed,fri" (omit for a one-shot alarm)
        #[arg(long)]
        days: Option<String>,
    },
    /// List alarms ordered by time
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one alarm as JSON
    Show {
        /// Alarm ID
        id: String,
    },
    /// Edit a scheduled or disabled alarm
    Edit {
        /// Alarm ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New time of day, HH:MM
        #[arg(long)]
        time: Option<String>,
        /// New repeat days, e.g. "sat,sun"
        #[arg(long, conflicts_with = "once")]
        days: Option<String>,
        /// Make the alarm one-shot
        #[arg(long)]
        once: bool,
    },
    /// Delete an alarm
    Delete {
        /// Alarm ID
        id: String,
    },
    /// Re-enable a disabled alarm
    Enable {
        /// Alarm ID
        id: String,
    },
    /// Disable a scheduled alarm
    Disable {
        /// Alarm ID
        id: String,
    },
    /// Snooze a ringing alarm
    Snooze {
        /// Alarm ID
        id: String,
    },
    /// Stop a ringing or snoozed alarm
    Close {
        /// Alarm ID
        id: String,
    },
}

fn open(config: &Config) -> Result<Controller, Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let surface = ConsoleSurface::new(&config.ui.time_format);
    Ok(AlarmController::from_config(store, SystemClock, surface, config))
}

fn parse_id(id: &str) -> Result<AlarmId, Box<dyn std::error::Error>> {
    id.parse()
        .map_err(|e| format!("invalid alarm id '{id}': {e}").into())
}

fn print_alarm(alarm: &Alarm) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(alarm)?);
    Ok(())
}

pub fn run(action: AlarmAction, config: &Config) -> CommandResult {
    let mut ctl = open(config)?;

    match action {
        AlarmAction::Add {
            name,
            time,
            description,
            days,
        } => {
            let time = time.unwrap_or_else(|| config.alarm.default_time.clone());
            let repeat_days: RepeatDays = days.as_deref().unwrap_or("").parse()?;
            let alarm = ctl.create(
                NewAlarm::new(name, time)
                    .description(description)
                    .repeat_on(repeat_days),
            )?;
            print_alarm(&alarm)?;
        }
        AlarmAction::List { json } => {
            let alarms = ctl.list()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alarms)?);
            } else if alarms.is_empty() {
                println!("No alarms.");
            } else {
                for alarm in &alarms {
                    println!(
                        "{}  {:>8}  {:<10}  {:<24}  {}",
                        alarm.id(),
                        format_time(alarm.time(), &config.ui.time_format),
                        alarm.state().name(),
                        alarm.repeat_days().label(),
                        alarm.name()
                    );
                }
            }
        }
        AlarmAction::Show { id } => {
            let alarm = ctl.get(parse_id(&id)?)?;
            print_alarm(&alarm)?;
        }
        AlarmAction::Edit {
            id,
            name,
            description,
            time,
            days,
            once,
        } => {
            let repeat_days = match (days, once) {
                (_, true) => Some(RepeatDays::once()),
                (Some(days), false) => Some(days.parse()?),
                (None, false) => None,
            };
            let patch = AlarmPatch {
                name,
                description,
                time,
                repeat_days,
            };
            if patch.is_empty() {
                return Err("nothing to change; pass --name, --description, --time, --days or --once"
                    .into());
            }
            let alarm = ctl.update(parse_id(&id)?, patch)?;
            print_alarm(&alarm)?;
        }
        AlarmAction::Delete { id } => {
            let id = parse_id(&id)?;
            ctl.delete(id)?;
            println!("Alarm deleted: {id}");
        }
        AlarmAction::Enable { id } => {
            let alarm = ctl.enable(parse_id(&id)?)?;
            print_alarm(&alarm)?;
        }
        AlarmAction::Disable { id } => {
            let alarm = ctl.disable(parse_id(&id)?)?;
            print_alarm(&alarm)?;
        }
        AlarmAction::Snooze { id } => {
            let alarm = ctl.snooze(parse_id(&id)?)?;
            print_alarm(&alarm)?;
        }
        AlarmAction::Close { id } => {
            let id = parse_id(&id)?;
            match ctl.close(id)? {
                Some(alarm) => print_alarm(&alarm)?,
                None => println!("Alarm closed and removed: {id}"),
            }
        }
    }
    Ok(())
}
