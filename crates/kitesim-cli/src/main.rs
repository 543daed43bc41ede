//! kitesim CLI: simulation, benchmarking, and debugging.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "kitesim")]
#[command(version, about = "kitesim: tethered kite physics core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a config file.
    Simulate {
        /// Path to simulation input (TOML or JSON).
        #[arg(short, long, default_value = "simulation.toml")]
        config: String,

        /// Write the final state snapshot here.
        #[arg(short, long)]
        snapshot: Option<String>,

        /// Stream telemetry events as JSON lines to this file.
        #[arg(short, long)]
        events: Option<String>,
    },

    /// Run benchmark suite.
    Benchmark {
        /// Which scenario to run (hanging_settle, symmetric_pull, left_pull,
        /// ground_rest, gust_recovery, all).
        #[arg(short, long, default_value = "all")]
        scenario: String,

        /// Output CSV file path.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Inspect a state snapshot file.
    Inspect {
        /// Path to snapshot file.
        path: String,
    },

    /// Validate a simulation input.
    Validate {
        /// Path to config file (TOML or JSON).
        path: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            config,
            snapshot,
            events,
        } => commands::simulate(&config, snapshot.as_deref(), events.as_deref()),
        Commands::Benchmark { scenario, output } => {
            commands::benchmark(&scenario, output.as_deref())
        }
        Commands::Inspect { path } => commands::inspect(&path),
        Commands::Validate { path } => commands::validate(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
