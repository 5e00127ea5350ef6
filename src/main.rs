use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use sigecs::{logging, stress, Coordinator, StressConfig, TracingLogger};

#[derive(Debug, Parser)]
#[command(author, version, about = "Deterministic ECS churn runner")]
struct Cli {
    /// Path to a YAML stress config (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override tick count
    #[arg(long)]
    ticks: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => StressConfig::from_yaml(path)?,
        None => StressConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(ticks) = cli.ticks {
        config.ticks = ticks;
    }

    logging::init_tracing(&config.logging.level);
    let mut coordinator = Coordinator::with_logger(Arc::new(TracingLogger));
    let report = stress::run(&config, &mut coordinator)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Ran {} ticks (seed {}): {} spawned, {} despawned, {} live, {} moving. Invariant failures: {}",
            report.ticks,
            config.seed,
            report.spawned,
            report.despawned,
            report.live,
            report.movement_members,
            report.invariant_failures
        );
    }
    Ok(())
}
