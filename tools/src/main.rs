//! sim-runner: headless runner for the methylation simulator.
//!
//! Usage:
//!   sim-runner --mode trajectory --seed 12345 --steps 10000
//!   sim-runner --mode switch --config run.json --runs 50
//!   sim-runner --mode long-run --steps 1000000 --checkpoint 1000 --json

use anyhow::{bail, Result};
use methylation_core::{
    batch::run_switch_batch,
    config::SimConfig,
    engine::{run_long, run_simulation, run_until_switch, LongRunSummary, RunResult},
    rng::{RngBank, RunRng},
    types::Step,
};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Trajectory,
    Switch,
    LongRun,
}

impl Mode {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "trajectory" => Ok(Self::Trajectory),
            "switch" => Ok(Self::Switch),
            "long-run" => Ok(Self::LongRun),
            other => bail!("unknown mode '{other}' (expected trajectory | switch | long-run)"),
        }
    }
}

#[derive(serde::Serialize)]
struct SwitchReport {
    seed: u64,
    runs: u64,
    samples: Vec<f64>,
    timeouts: u64,
    stalled: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mode = Mode::parse(find_arg(&args, "--mode").unwrap_or("trajectory"))?;
    let json = args.iter().any(|a| a == "--json");

    let mut config = match find_arg(&args, "--config") {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default_test(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    config.max_steps = parse_arg(&args, "--steps", config.max_steps);
    config.batch_size = parse_arg(&args, "--runs", config.batch_size);
    config.checkpoint_interval = parse_arg(&args, "--checkpoint", config.checkpoint_interval);
    config.validate()?;
    log::debug!("resolved config: {config:?}");

    if !json {
        println!("Methylation sim-runner");
        println!("  mode:        {mode:?}");
        println!("  seed:        {}", config.seed);
        println!("  population:  {}", config.population);
        println!("  max steps:   {}", config.max_steps);
        println!("  rate law:    {:?}", config.rate_law);
        println!();
    }

    let table = config.table();
    let setup = config.setup(&table);

    match mode {
        Mode::Trajectory => {
            let result = run_simulation(&setup, RunRng::new(config.seed, 0))?;
            if json {
                println!("{}", serde_json::to_string(&result)?);
            } else {
                print_trajectory_summary(&result);
            }
        }
        Mode::Switch => {
            let target = config.switch_target()?;
            let bank = RngBank::new(config.seed);
            if config.batch_size <= 1 {
                let outcome = run_until_switch(&setup, &target, bank.for_run(0))?;
                if json {
                    println!("{}", serde_json::to_string(&outcome)?);
                } else {
                    println!("=== SWITCH ===");
                    println!("  outcome:        {outcome:?}");
                    println!("  switching time: {}", outcome.sentinel_time());
                }
            } else {
                let tally = run_switch_batch(&setup, &target, &bank, config.batch_size)?;
                let report = SwitchReport {
                    seed: config.seed,
                    runs: config.batch_size,
                    samples: tally.samples,
                    timeouts: tally.timeouts,
                    stalled: tally.stalled,
                };
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                } else {
                    print_switch_summary(&report);
                }
            }
        }
        Mode::LongRun => {
            let summary = run_long(
                &setup,
                &config.classifier,
                config.checkpoint_interval,
                RunRng::new(config.seed, 0),
            )?;
            if json {
                println!("{}", serde_json::to_string(&summary)?);
            } else {
                print_long_run_summary(&summary, config.checkpoint_interval);
            }
        }
    }

    Ok(())
}

fn print_trajectory_summary(result: &RunResult) {
    println!("=== TRAJECTORY ===");
    println!("  status:        {:?}", result.status);
    println!("  steps:         {}", result.steps());
    println!("  final time:    {:.4}", result.time.last().copied().unwrap_or(0.0));
    if let Some(last) = result.final_snapshot() {
        println!("  methylated:    {}", last.methylated);
        println!("  unmethylated:  {}", last.unmethylated);
        println!(
            "  hemimethylated:{}",
            result.population - last.methylated - last.unmethylated
        );
    }
    println!();
    println!("=== EVENTS FIRED ===");
    for (kind, count) in &result.event_counts {
        println!("  {:<26} {count}", kind.name());
    }
}

fn print_switch_summary(report: &SwitchReport) {
    println!("=== SWITCHING BATCH ===");
    println!("  runs:      {}", report.runs);
    println!("  switched:  {}", report.samples.len());
    println!("  timed out: {}", report.timeouts);
    println!("  stalled:   {}", report.stalled);
    if !report.samples.is_empty() {
        let mean = report.samples.iter().sum::<f64>() / report.samples.len() as f64;
        println!("  mean time: {mean:.4}");
    }
}

fn print_long_run_summary(summary: &LongRunSummary, interval: Step) {
    println!("=== LONG RUN ===");
    println!("  status:      {:?}", summary.status);
    println!("  steps:       {}", summary.steps);
    println!("  total time:  {:.4}", summary.elapsed);
    match &summary.proportions {
        Some(p) => {
            println!("  methylated:  {:.4}", p.high);
            println!("  unmethylated:{:.4}", p.low);
            println!("  mostly low:  {:.4}", p.mostly_low);
            println!("  mixed:       {:.4}", p.mixed);
            println!("  sum:         {:.6}", p.sum());
        }
        None => println!("  (no time elapsed)"),
    }
    println!("  checkpoints: {} (every {interval} steps)", summary.checkpoints.len());
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
