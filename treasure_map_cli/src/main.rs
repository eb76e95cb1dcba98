use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use treasure_map_core::{Adventurer, CommandPolicy, Scenario, SimConfig, SimReport, Simulation};

mod viewer;

#[derive(Parser, Debug)]
#[command(version, about = "Play adventurers' commands on a treasure map", long_about = None)]
struct Args {
    /// Scenario file to load
    #[arg(short, long, value_name = "INPUT_FILE", default_value = "resource/input/input.txt")]
    input: PathBuf,

    /// Where to write the final state
    #[arg(short, long, value_name = "OUTPUT_FILE", default_value = "resource/output/output.txt")]
    output: PathBuf,

    /// Reject unknown command letters instead of skipping them
    #[arg(long)]
    strict: bool,

    /// Print the final adventurers and run totals as JSON on stdout
    #[arg(long)]
    summary: bool,

    /// Replay the run round by round in the terminal before writing the output
    #[arg(short, long)]
    watch: bool,

    /// Delay between rounds in watch mode
    #[arg(long, value_name = "MS", default_value_t = 250)]
    tick_ms: u64,
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        let policy = if self.strict {
            CommandPolicy::Strict
        } else {
            CommandPolicy::Lenient
        };
        SimConfig::default().with_command_policy(policy)
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    report: SimReport,
    adventurers: &'a [Adventurer],
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load, simulate, write. Nothing is written if an earlier step fails.
fn run(args: &Args) -> Result<()> {
    let scenario = Scenario::load(&args.input)?;
    info!(
        input = %args.input.display(),
        adventurers = scenario.adventurers.len(),
        "scenario loaded"
    );

    let mut simulation = Simulation::new(scenario, &args.sim_config())
        .with_context(|| format!("cannot simulate {}", args.input.display()))?;

    if args.watch {
        viewer::watch(&mut simulation, Duration::from_millis(args.tick_ms))?;
    }
    let report = simulation.run();
    info!(
        rounds = report.rounds,
        moves = report.moves,
        blocked = report.blocked,
        collected = report.collected,
        "simulation finished"
    );

    let scenario = simulation.into_scenario();
    scenario.save(&args.output)?;
    info!(output = %args.output.display(), "final state written");

    if args.summary {
        let summary = Summary {
            report,
            adventurers: &scenario.adventurers,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
