mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "vesta", about = "Calibration master frame builder")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine local frames into a master
    Stack(commands::stack::StackArgs),
    /// Run a full calibration job against a storage directory
    Run(commands::run::RunArgs),
    /// Score an existing master frame
    Score(commands::score::ScoreArgs),
    /// Print or save a default settings file
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Stack(args) => commands::stack::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Score(args) => commands::score::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
