//! The Gillespie engine: the heart of the simulator.
//!
//! ONE STEP (fixed order, never reordered):
//!   1. Evaluate every event's propensity on the state at step-1.
//!   2. Draw the waiting time from Exp(total propensity).
//!   3. Draw one uniform and select an event by cumulative share.
//!   4. Apply that event's transition to produce the state at step.
//!
//! RULES:
//!   - A run is strictly sequential; step i reads only step i-1.
//!   - Each run owns its RunRng. Parameters and tables are shared read-only.
//!   - Two RNG draws per step, exponential first, then uniform (plus any
//!     draws a transition makes). Changing this order changes every run.

use serde::{Deserialize, Serialize};

use crate::{
    classify::{Classifier, SwitchTarget},
    error::{SimError, SimResult},
    event::{EventKind, EventTable},
    params::ParameterSet,
    propensity,
    rng::RunRng,
    sampler, selector,
    state::{InitialSplit, ModelState, Snapshot},
    stats::{BandProportions, BandTimes, Checkpoint, RunStatisticsAccumulator},
    stepper,
    types::{SimTime, SiteCount, Step, TIMEOUT_SENTINEL},
};

/// How a run ended. A run is running for exactly as long as its loop
/// body executes, so only terminal states are ever returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    TerminatedByStepBudget,
    TerminatedByTimeBudget,
    TerminatedByAbsorption,
    TerminatedByDegenerateState,
}

/// Bounds on a run. `max_steps` is the length of the tracked series,
/// step-0 anchor included, so at most `max_steps - 1` events fire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunBudget {
    pub max_steps: Step,
    #[serde(default)]
    pub max_time: Option<SimTime>,
}

impl RunBudget {
    pub fn steps(max_steps: Step) -> Self {
        Self { max_steps, max_time: None }
    }

    pub fn with_time(mut self, max_time: SimTime) -> Self {
        self.max_time = Some(max_time);
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.max_steps < 1 {
            return Err(SimError::config("max_steps must be at least 1"));
        }
        if let Some(t) = self.max_time {
            if !(t > 0.0) || !t.is_finite() {
                return Err(SimError::config(format!("max_time must be positive, got {t}")));
            }
        }
        Ok(())
    }

    fn time_exhausted(&self, now: SimTime) -> bool {
        self.max_time.is_some_and(|limit| now >= limit)
    }
}

/// Everything a run reads but never writes.
#[derive(Debug, Clone, Copy)]
pub struct RunSetup<'a> {
    pub population: SiteCount,
    pub split: InitialSplit,
    pub budget: RunBudget,
    pub params: &'a ParameterSet,
    pub table: &'a EventTable,
}

/// What one step produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub kind: EventKind,
    pub next: Snapshot,
    pub wait: SimTime,
}

/// Drives single steps for one run.
pub struct GillespieEngine<'a> {
    population: SiteCount,
    params: &'a ParameterSet,
    table: &'a EventTable,
    rng: RunRng,
}

impl<'a> GillespieEngine<'a> {
    /// Validates the table against the parameters before any step runs.
    pub fn new(
        population: SiteCount,
        params: &'a ParameterSet,
        table: &'a EventTable,
        rng: RunRng,
    ) -> SimResult<Self> {
        if population == 0 {
            return Err(SimError::config("population must be at least 1"));
        }
        table.validate(params)?;
        Ok(Self {
            population,
            params,
            table,
            rng,
        })
    }

    pub fn population(&self) -> SiteCount {
        self.population
    }

    /// Advance from `current` (the state at `step - 1`, reached at `now`).
    pub fn step(&mut self, current: &Snapshot, step: Step, now: SimTime) -> SimResult<StepOutcome> {
        let propensities =
            propensity::evaluate(current, self.population, step, self.params, self.table)?;
        let wait = sampler::sample_wait_time(propensities.total(), &mut self.rng, step, now)?;

        let uniform = self.rng.next_f64();
        let selection = selector::select(&propensities, uniform, step, now)?;
        if selection.clamped {
            log::warn!(
                "step={step} selection walk exhausted at u={uniform}; clamped to '{}'",
                selection.kind.name()
            );
        }

        let next = stepper::apply(
            current,
            self.population,
            step,
            selection.kind,
            self.table,
            &mut self.rng,
        )?;

        Ok(StepOutcome {
            kind: selection.kind,
            next,
            wait,
        })
    }
}

// ── Trajectory mode ──────────────────────────────────────────────

/// Full history of a fixed-budget run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub status: RunStatus,
    pub population: SiteCount,
    pub time: Vec<SimTime>,
    pub methylated: Vec<SiteCount>,
    pub unmethylated: Vec<SiteCount>,
    /// How often each event fired, in table order.
    pub event_counts: Vec<(EventKind, u64)>,
}

impl RunResult {
    pub fn steps(&self) -> usize {
        self.time.len()
    }

    pub fn final_snapshot(&self) -> Option<Snapshot> {
        Some(Snapshot::new(*self.methylated.last()?, *self.unmethylated.last()?))
    }
}

/// Run until the step or time budget is spent, keeping the full series.
/// A degenerate state is an error here: fixed-budget runs expect the
/// dynamics to keep going.
pub fn run_simulation(setup: &RunSetup<'_>, rng: RunRng) -> SimResult<RunResult> {
    setup.budget.validate()?;
    let mut engine = GillespieEngine::new(setup.population, setup.params, setup.table, rng)?;
    let capacity = usize::try_from(setup.budget.max_steps).unwrap_or(usize::MAX);
    let mut state = ModelState::new(setup.population, setup.split, capacity)?;
    let mut event_counts: Vec<(EventKind, u64)> = setup.table.kinds().map(|k| (k, 0)).collect();

    log::info!(
        "trajectory run: population={} max_steps={} max_time={:?}",
        setup.population,
        setup.budget.max_steps,
        setup.budget.max_time
    );

    let status = loop {
        if state.step() >= setup.budget.max_steps {
            break RunStatus::TerminatedByStepBudget;
        }
        if setup.budget.time_exhausted(state.elapsed()) {
            break RunStatus::TerminatedByTimeBudget;
        }

        let outcome = engine.step(&state.current(), state.step(), state.elapsed())?;
        state.push(outcome.next, state.elapsed() + outcome.wait)?;
        if let Some(entry) = event_counts.iter_mut().find(|(k, _)| *k == outcome.kind) {
            entry.1 += 1;
        }
    };

    log::info!(
        "trajectory run finished: {:?} after {} steps, t={:.4}",
        status,
        state.step(),
        state.elapsed()
    );

    Ok(RunResult {
        status,
        population: setup.population,
        time: state.time().to_vec(),
        methylated: state.methylated().to_vec(),
        unmethylated: state.unmethylated().to_vec(),
        event_counts,
    })
}

// ── Switching-time mode ──────────────────────────────────────────

/// Which bound ended a run that never switched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetLimit {
    Steps,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SwitchOutcome {
    Switched { time: SimTime, step: Step },
    /// Budget spent without switching. Never a valid sample.
    TimedOut { time: SimTime, step: Step, limit: BudgetLimit },
    /// No event could fire any more; the run can never switch.
    Stalled { time: SimTime, step: Step },
}

impl SwitchOutcome {
    /// Elapsed time if switched, otherwise the timeout sentinel.
    pub fn sentinel_time(&self) -> SimTime {
        match *self {
            Self::Switched { time, .. } => time,
            Self::TimedOut { .. } | Self::Stalled { .. } => TIMEOUT_SENTINEL,
        }
    }

    pub fn switching_time(&self) -> Option<SimTime> {
        match *self {
            Self::Switched { time, .. } => Some(time),
            _ => None,
        }
    }

    pub fn status(&self) -> RunStatus {
        match self {
            Self::Switched { .. } => RunStatus::TerminatedByAbsorption,
            Self::TimedOut { limit: BudgetLimit::Steps, .. } => RunStatus::TerminatedByStepBudget,
            Self::TimedOut { limit: BudgetLimit::Time, .. } => RunStatus::TerminatedByTimeBudget,
            Self::Stalled { .. } => RunStatus::TerminatedByDegenerateState,
        }
    }
}

/// Run until the population first reaches `target`, without keeping history.
pub fn run_until_switch(
    setup: &RunSetup<'_>,
    target: &SwitchTarget,
    rng: RunRng,
) -> SimResult<SwitchOutcome> {
    setup.budget.validate()?;
    let mut engine = GillespieEngine::new(setup.population, setup.params, setup.table, rng)?;
    let mut current = setup.split.snapshot(setup.population);
    current.hemimethylated(setup.population, 0)?;
    let mut now: SimTime = 0.0;
    let mut step: Step = 1;

    let limit = loop {
        if step >= setup.budget.max_steps {
            break BudgetLimit::Steps;
        }
        if setup.budget.time_exhausted(now) {
            break BudgetLimit::Time;
        }

        let outcome = match engine.step(&current, step, now) {
            Ok(outcome) => outcome,
            Err(SimError::DegenerateState { .. }) => {
                log::info!("switching run stalled at step {step} (t={now:.4})");
                return Ok(SwitchOutcome::Stalled { time: now, step });
            }
            Err(e) => return Err(e),
        };
        current = outcome.next;
        now += outcome.wait;

        if target.reached(&current, setup.population) {
            log::debug!(
                "switched towards {:?} at step {step}, t={now:.4}",
                target.direction
            );
            return Ok(SwitchOutcome::Switched { time: now, step });
        }
        step += 1;
    };

    log::debug!("switching run hit its {limit:?} budget at step {step} (t={now:.4})");
    Ok(SwitchOutcome::TimedOut { time: now, step, limit })
}

// ── Long-run mode ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRunSummary {
    pub status: RunStatus,
    pub steps: Step,
    pub elapsed: SimTime,
    pub final_state: Snapshot,
    pub times: BandTimes,
    pub proportions: Option<BandProportions>,
    pub checkpoints: Vec<Checkpoint>,
}

/// Run for the whole budget, accumulating time per macro-state band
/// instead of storing the trajectory. `checkpoint_interval` thins the
/// reported proportion series (0 disables it).
pub fn run_long(
    setup: &RunSetup<'_>,
    classifier: &Classifier,
    checkpoint_interval: Step,
    rng: RunRng,
) -> SimResult<LongRunSummary> {
    setup.budget.validate()?;
    classifier.validate()?;
    let mut engine = GillespieEngine::new(setup.population, setup.params, setup.table, rng)?;
    let mut accumulator = RunStatisticsAccumulator::new(checkpoint_interval);
    let mut current = setup.split.snapshot(setup.population);
    current.hemimethylated(setup.population, 0)?;
    let mut now: SimTime = 0.0;
    let mut step: Step = 1;

    let status = loop {
        if step >= setup.budget.max_steps {
            break RunStatus::TerminatedByStepBudget;
        }
        if setup.budget.time_exhausted(now) {
            break RunStatus::TerminatedByTimeBudget;
        }

        let band = classifier.classify(&current, setup.population);
        let outcome = engine.step(&current, step, now)?;
        accumulator.record(band, outcome.wait);
        current = outcome.next;
        now += outcome.wait;
        step += 1;
    };

    let proportions = accumulator.proportions();
    if let Some(p) = &proportions {
        log::info!(
            "long run: {step} steps, t={now:.2}, high={:.3} low={:.3} mostly_low={:.3} mixed={:.3}",
            p.high,
            p.low,
            p.mostly_low,
            p.mixed
        );
    }

    Ok(LongRunSummary {
        status,
        steps: step,
        elapsed: now,
        final_state: current,
        times: *accumulator.times(),
        proportions,
        checkpoints: accumulator.into_checkpoints(),
    })
}
