//! Command-line driver: pick a strategy, run a dinner, print the statistics.
//!
//! ```text
//! dining                 # butler (gated), the default
//! dining ordering        # resource hierarchy
//! dining trylock --seed 7 --json
//! ```

use clap::Parser;
use dining::{Strategy, Table, TableConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dining", version, about = "Run a dining philosophers dinner")]
struct Args {
    /// Strategy: butler, ordering, or trylock (aliases accepted). Unrecognised
    /// names fall back to butler.
    strategy: Option<String>,

    /// TOML config file; the positional strategy overrides its `strategy`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seed for the delay generators.
    #[arg(long)]
    seed: Option<u64>,

    /// Cancel the dinner after this many milliseconds.
    #[arg(long, value_name = "MS")]
    deadline_ms: Option<u64>,

    /// Print the report as JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            error!(%err, "dinner failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => TableConfig::load(path)?,
        None => TableConfig::default(),
    };

    if let Some(name) = args.strategy.as_deref() {
        let strategy = Strategy::parse_lenient(Some(name));
        if name.parse::<Strategy>().is_err() {
            warn!(name, fallback = %strategy, "unknown strategy");
        }
        config = config.with_strategy(strategy);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if let Some(ms) = args.deadline_ms {
        config = config.with_deadline(Duration::from_millis(ms));
    }

    info!(strategy = %config.strategy, "strategy chosen");
    let report = Table::new(config)?.run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(report.is_complete())
}
