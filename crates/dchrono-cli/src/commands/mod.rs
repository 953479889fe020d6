pub mod alarm;
pub mod config;
pub mod run;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;
