mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::amortize::AmortizeArgs;
use commands::build::BuildArgs;
use commands::kpis::KpisArgs;
use commands::region::RegionArgs;

/// Credit risk gold-layer build and analytics
#[derive(Parser)]
#[command(
    name = "crisk",
    version,
    about = "Credit risk gold-layer build and analytics",
    long_about = "Builds the gold layer of a lending data lake from transformed silver \
                  data: customer and loan dimensions, an amortized loan performance \
                  fact table, and portfolio, regional and customer KPI snapshots. \
                  All amounts use decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the silver -> gold build against a local table store
    Build(BuildArgs),
    /// Split repayments into interest and principal
    Amortize(AmortizeArgs),
    /// Calculate portfolio, regional and customer KPIs
    Kpis(KpisArgs),
    /// Derive the region used for regional KPIs from an address
    Region(RegionArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("CRISK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Build(args) => commands::build::run_build(args),
        Commands::Amortize(args) => commands::amortize::run_amortize(args),
        Commands::Kpis(args) => commands::kpis::run_kpis(args),
        Commands::Region(args) => commands::region::run_region(args),
        Commands::Version => {
            println!("crisk {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
