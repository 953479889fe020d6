use clap::{Parser, Subcommand};
use dchrono_core::Config;

mod commands;
mod logging;
mod surface;

#[derive(Parser)]
#[command(name = "dchrono", version, about = "dChrono alarm clock CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Alarm management
    Alarm {
        #[command(subcommand)]
        action: commands::alarm::AlarmAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the alarm daemon in the foreground
    Run,
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init(&config.log.level);

    let result = match cli.command {
        Commands::Alarm { action } => commands::alarm::run(action, &config),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run => commands::run::run(config),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
