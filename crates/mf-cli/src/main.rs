//! Headless host for Mapforge worlds.

mod commands;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(
    name = "mf",
    about = "Mapforge: drive a map world's simulation core without an engine",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a demo map and drive it with simulated render frames
    Simulate(SimulateArgs),

    /// Print the default scheduler configuration as JSON
    Config,
}

/// Logs go to stderr. `RUST_LOG` wins over the verbosity flag.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Simulate(args) if args.verbose);
    init_logging(verbose);

    let result = match cli.command {
        Commands::Simulate(args) => commands::simulate::run(&args),
        Commands::Config => commands::config::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
