//! Model state: one population of sites tracked step by step.
//!
//! Hemimethylated sites are never stored. They are whatever remains of
//! the population after methylated and unmethylated are counted, and
//! every read of them re-checks that the remainder is non-negative.

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    types::{SimTime, SiteCount, Step},
};

/// The counts at a single step. Transitions produce a whole Snapshot,
/// so no tracked series can be left unwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub methylated: SiteCount,
    pub unmethylated: SiteCount,
}

impl Snapshot {
    pub fn new(methylated: SiteCount, unmethylated: SiteCount) -> Self {
        Self { methylated, unmethylated }
    }

    /// Checked remainder. Fails instead of wrapping when the two tracked
    /// counts already exceed the population.
    pub fn hemimethylated(&self, population: SiteCount, step: Step) -> SimResult<SiteCount> {
        self.methylated
            .checked_add(self.unmethylated)
            .and_then(|tracked| population.checked_sub(tracked))
            .ok_or(SimError::InvariantViolation {
                step,
                methylated: self.methylated,
                unmethylated: self.unmethylated,
                population,
            })
    }

    pub fn methylated_fraction(&self, population: SiteCount) -> f64 {
        self.methylated as f64 / population as f64
    }

    pub fn unmethylated_fraction(&self, population: SiteCount) -> f64 {
        self.unmethylated as f64 / population as f64
    }
}

/// How the population is split at step 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialSplit {
    /// Half methylated, half unmethylated. An odd site starts hemimethylated.
    Even,
    Explicit {
        methylated: SiteCount,
        unmethylated: SiteCount,
    },
}

impl InitialSplit {
    pub fn snapshot(&self, population: SiteCount) -> Snapshot {
        match *self {
            Self::Even => Snapshot::new(population / 2, population / 2),
            Self::Explicit { methylated, unmethylated } => Snapshot::new(methylated, unmethylated),
        }
    }
}

/// Upper bound on the up-front reservation. Longer runs grow the
/// buffers on demand, so a time-bounded run with a huge step budget
/// does not allocate for steps it will never reach.
pub const MAX_RESERVED_STEPS: usize = 1 << 16;

/// Full history of one run. Buffers are reserved up front for the
/// step budget (capped at `MAX_RESERVED_STEPS`) and only ever appended to.
#[derive(Debug, Clone)]
pub struct ModelState {
    population: SiteCount,
    step: Step,
    methylated: Vec<SiteCount>,
    unmethylated: Vec<SiteCount>,
    time: Vec<SimTime>,
}

impl ModelState {
    /// Step 0 holds the initial condition; the first event writes step 1.
    pub fn new(population: SiteCount, split: InitialSplit, capacity: usize) -> SimResult<Self> {
        if population == 0 {
            return Err(SimError::config("population must be at least 1"));
        }
        let initial = split.snapshot(population);
        initial.hemimethylated(population, 0)?;

        let capacity = capacity.clamp(1, MAX_RESERVED_STEPS);
        let mut methylated = Vec::with_capacity(capacity);
        let mut unmethylated = Vec::with_capacity(capacity);
        let mut time = Vec::with_capacity(capacity);
        methylated.push(initial.methylated);
        unmethylated.push(initial.unmethylated);
        time.push(0.0);

        Ok(Self {
            population,
            step: 1,
            methylated,
            unmethylated,
            time,
        })
    }

    pub fn population(&self) -> SiteCount {
        self.population
    }

    /// Index of the step the next event will write.
    pub fn step(&self) -> Step {
        self.step
    }

    /// The pre-transition state, i.e. the entry at `step - 1`.
    pub fn current(&self) -> Snapshot {
        let i = (self.step - 1) as usize;
        Snapshot::new(self.methylated[i], self.unmethylated[i])
    }

    pub fn elapsed(&self) -> SimTime {
        self.time[(self.step - 1) as usize]
    }

    /// Write the entry at `step` and move on. `time` must not precede the
    /// current elapsed time and the snapshot must fit in the population.
    pub fn push(&mut self, next: Snapshot, time: SimTime) -> SimResult<()> {
        next.hemimethylated(self.population, self.step)?;
        if time < self.elapsed() {
            return Err(SimError::config(format!(
                "time went backwards at step {}: {} < {}",
                self.step,
                time,
                self.elapsed()
            )));
        }
        self.methylated.push(next.methylated);
        self.unmethylated.push(next.unmethylated);
        self.time.push(time);
        self.step += 1;
        Ok(())
    }

    pub fn methylated(&self) -> &[SiteCount] {
        &self.methylated
    }

    pub fn unmethylated(&self) -> &[SiteCount] {
        &self.unmethylated
    }

    pub fn time(&self) -> &[SimTime] {
        &self.time
    }
}
