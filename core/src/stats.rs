//! Long-run time-in-state accumulation.
//!
//! Keeps running totals instead of history, so memory stays flat no
//! matter how many steps a run takes. A decimated checkpoint series is
//! kept for plotting.

use serde::{Deserialize, Serialize};

use crate::{
    classify::MacroState,
    types::{SimTime, Step},
};

/// Cumulative time spent in each band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandTimes {
    pub high: SimTime,
    pub low: SimTime,
    pub mostly_low: SimTime,
    pub mixed: SimTime,
}

impl BandTimes {
    pub fn total(&self) -> SimTime {
        self.high + self.low + self.mostly_low + self.mixed
    }

    fn add(&mut self, state: MacroState, dt: SimTime) {
        match state {
            MacroState::High => self.high += dt,
            MacroState::Low => self.low += dt,
            MacroState::MostlyLow => self.mostly_low += dt,
            MacroState::Mixed => self.mixed += dt,
        }
    }
}

/// Each band's share of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandProportions {
    pub high: f64,
    pub low: f64,
    pub mostly_low: f64,
    pub mixed: f64,
}

impl BandProportions {
    pub fn sum(&self) -> f64 {
        self.high + self.low + self.mostly_low + self.mixed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step: Step,
    pub time: SimTime,
    pub proportions: BandProportions,
}

#[derive(Debug, Clone)]
pub struct RunStatisticsAccumulator {
    interval: Step,
    times: BandTimes,
    elapsed: SimTime,
    steps: Step,
    checkpoints: Vec<Checkpoint>,
}

impl RunStatisticsAccumulator {
    /// `interval` is the checkpoint spacing in steps; 0 disables checkpoints.
    pub fn new(interval: Step) -> Self {
        Self {
            interval,
            times: BandTimes::default(),
            elapsed: 0.0,
            steps: 0,
            checkpoints: Vec::new(),
        }
    }

    /// Credit `dt` to the band the system occupied during the interval,
    /// i.e. the band of the pre-transition state.
    pub fn record(&mut self, state: MacroState, dt: SimTime) {
        self.times.add(state, dt);
        self.elapsed += dt;
        self.steps += 1;

        if self.interval > 0 && self.steps % self.interval == 0 {
            if let Some(proportions) = self.proportions() {
                self.checkpoints.push(Checkpoint {
                    step: self.steps,
                    time: self.elapsed,
                    proportions,
                });
            }
        }
    }

    /// None until some time has elapsed.
    pub fn proportions(&self) -> Option<BandProportions> {
        if self.elapsed <= 0.0 {
            return None;
        }
        Some(BandProportions {
            high: self.times.high / self.elapsed,
            low: self.times.low / self.elapsed,
            mostly_low: self.times.mostly_low / self.elapsed,
            mixed: self.times.mixed / self.elapsed,
        })
    }

    pub fn times(&self) -> &BandTimes {
        &self.times
    }

    pub fn elapsed(&self) -> SimTime {
        self.elapsed
    }

    pub fn steps(&self) -> Step {
        self.steps
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn into_checkpoints(self) -> Vec<Checkpoint> {
        self.checkpoints
    }
}
