//! Repeated switching-time runs under one parameter set.
//!
//! Runs execute one after another, each on its own stream from the
//! RngBank, so the tally is identical whatever order a caller might
//! later choose to run them in.

use serde::{Deserialize, Serialize};

use crate::{
    classify::SwitchTarget,
    engine::{run_until_switch, RunSetup, SwitchOutcome},
    error::SimResult,
    rng::RngBank,
    types::{SimTime, TIMEOUT_SENTINEL},
};

/// Valid switching times plus counts of the runs that produced none.
/// Only `samples` may be handed to a distribution fit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchTally {
    pub samples: Vec<SimTime>,
    pub timeouts: u64,
    pub stalled: u64,
}

impl BatchTally {
    pub fn record(&mut self, outcome: &SwitchOutcome) {
        match *outcome {
            SwitchOutcome::Switched { time, .. } => self.samples.push(time),
            SwitchOutcome::TimedOut { .. } => self.timeouts += 1,
            SwitchOutcome::Stalled { .. } => self.stalled += 1,
        }
    }

    /// Rebuild a tally from sentinel-encoded times as produced by
    /// `SwitchOutcome::sentinel_time`. Stalls and timeouts share the
    /// sentinel, so both land in `timeouts`.
    pub fn from_sentinel_times(times: &[SimTime]) -> Self {
        let mut tally = Self::default();
        for &t in times {
            if t == TIMEOUT_SENTINEL {
                tally.timeouts += 1;
            } else {
                tally.samples.push(t);
            }
        }
        tally
    }

    pub fn total_runs(&self) -> u64 {
        self.samples.len() as u64 + self.timeouts + self.stalled
    }
}

/// Run `runs` independent switching-time runs; run i uses `bank.for_run(i)`.
pub fn run_switch_batch(
    setup: &RunSetup<'_>,
    target: &SwitchTarget,
    bank: &RngBank,
    runs: u64,
) -> SimResult<BatchTally> {
    let mut tally = BatchTally::default();
    for i in 0..runs {
        let outcome = run_until_switch(setup, target, bank.for_run(i))?;
        tally.record(&outcome);
    }
    if tally.timeouts + tally.stalled > 0 {
        log::warn!(
            "batch (seed={}): {} of {} runs produced no switching time ({} timed out, {} stalled)",
            bank.master_seed(),
            tally.timeouts + tally.stalled,
            runs,
            tally.timeouts,
            tally.stalled
        );
    }
    Ok(tally)
}
