use clap::Parser as _;
use rct_power_sensors::commands;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _};

#[derive(clap::Parser)]
#[clap(version, about, author)]
enum Commands {
    Registers(commands::registers::Args),
    Sensors(commands::sensors::Args),
    State(commands::state::Args),
    Plan(commands::plan::Args),
}

fn end<E: std::error::Error>(r: Result<(), E>) {
    std::process::exit(match r {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            let mut cause = e.source();
            while let Some(e) = cause {
                eprintln!("  because: {e}");
                cause = e.source();
            }
            1
        }
    });
}

fn main() {
    let filter_description =
        std::env::var("RCT_POWER_SENSORS_LOG").unwrap_or_else(|_| "warn".to_string());
    let filter = match filter_description.parse::<tracing_subscriber::filter::targets::Targets>() {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("error: RCT_POWER_SENSORS_LOG is not a valid filter: {e}");
            std::process::exit(1);
        }
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    match Commands::parse() {
        Commands::Registers(args) => end(commands::registers::run(args)),
        Commands::Sensors(args) => end(commands::sensors::run(args)),
        Commands::State(args) => end(commands::state::run(args)),
        Commands::Plan(args) => end(commands::plan::run(args)),
    }
}
