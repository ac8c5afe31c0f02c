#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter for the Halite Fleet decision engine.

mod config;
mod episode;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use halite_fleet_agent::{Agent, TurnSummary};
use halite_fleet_core::{BoardSnapshot, PlayerActions};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{config::Settings, episode::run_episode};

#[derive(Parser, Debug)]
#[command(name = "halite-fleet")]
#[command(about = "Halite fleet agent: self-play simulation and single-turn decisions")]
struct Cli {
    /// TOML file with optional `[tuning]` and `[rules]` tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Simulate a self-play episode and print the final scores
    Run {
        #[arg(long, default_value_t = 2)]
        players: u32,
        /// Overrides the board size of the configuration
        #[arg(long)]
        size: Option<u32>,
        /// Overrides the episode length of the configuration
        #[arg(long)]
        steps: Option<u32>,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Decide the actions for a JSON board snapshot
    Decide {
        /// Path to the snapshot file
        snapshot: PathBuf,
    },
}

#[derive(Serialize)]
struct DecisionOutput<'a> {
    actions: &'a PlayerActions,
    summary: &'a TurnSummary,
}

/// Entry point for the Halite Fleet command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            players,
            size,
            steps,
            seed,
        } => {
            if let Some(size) = size {
                settings.rules.size = size;
            }
            if let Some(steps) = steps {
                settings.rules.episode_steps = steps;
            }

            let report = run_episode(&settings, players, seed);
            println!("turns: {}", report.turns);
            println!("rejected commands: {}", report.rejections);
            for (player, halite) in &report.scores {
                println!("player {}: {halite:.2}", player.get());
            }
        }
        Commands::Decide { snapshot } => {
            let contents = fs::read_to_string(&snapshot)
                .with_context(|| format!("failed to read snapshot at {}", snapshot.display()))?;
            let board: BoardSnapshot = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse snapshot at {}", snapshot.display()))?;

            let decision = Agent::new(settings.tuning)
                .decide(&board.into_canonical())
                .context("agent could not decide the turn")?;
            let output = DecisionOutput {
                actions: &decision.actions,
                summary: &decision.summary,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("failed to encode decision")?
            );
        }
    }

    Ok(())
}
