mod logging;
mod scenario;
mod scripts;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use kinematics::constants::DEFAULT_FIXED_DT_S;

use crate::scenario::{Sandbox, Scenario};

/// Headless kinematic character sandbox
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario JSON file; the built-in scene is used when omitted
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Number of fixed steps to simulate
    #[arg(short, long, default_value_t = 300)]
    ticks: u64,

    /// Fixed step length in seconds
    #[arg(long, default_value_t = DEFAULT_FIXED_DT_S)]
    dt: f32,

    /// Print the scenario as JSON and exit
    #[arg(long)]
    dump_scenario: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    if !(args.dt.is_finite() && args.dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {}", args.dt);
    }

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin(),
    };

    if args.dump_scenario {
        println!("{}", serde_json::to_string_pretty(&scenario)?);
        return Ok(());
    }

    let mut sandbox = Sandbox::build(scenario)?;
    let report = sandbox.run(args.ticks, args.dt);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
