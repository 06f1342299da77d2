//! Run the agent headlessly on a map file and print the outcome.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use wumpus_agent::{AgentConfig, RunStatus, Simulation};

#[derive(Parser)]
#[command(name = "wumpus-run")]
#[command(about = "Run the Wumpus World agent on a cave map", version)]
struct Cli {
    /// Map file: grid size on the first line, then dot-separated rows
    map: PathBuf,

    /// TOML agent configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the action transcript
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the configured step limit
    #[arg(long)]
    max_steps: Option<usize>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AgentConfig::default(),
    };
    if let Some(max_steps) = cli.max_steps {
        config.max_steps = max_steps;
    }

    let mut sim = Simulation::from_map_file(&cli.map, config)
        .with_context(|| format!("setting up run on {}", cli.map.display()))?;
    let status = sim.run_to_end();

    if let Some(path) = &cli.output {
        sim.write_transcript(path)
            .with_context(|| format!("writing transcript to {}", path.display()))?;
        tracing::info!(path = %path.display(), "transcript written");
    }

    let report = sim.report();
    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", sim.transcript());
        println!(
            "{}: score {}, health {}, gold {}, {} steps",
            status, report.score, report.health, report.gold_collected, report.steps
        );
    }

    if status == RunStatus::Killed {
        tracing::warn!(run = %report.run_id, "agent did not survive");
    }
    Ok(())
}
