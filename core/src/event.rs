//! The event table: which events exist, how fast each fires, and what
//! each does to the state.
//!
//! RULE: Rate functions and transition functions are pure functions of
//! their explicit inputs. Neither may read anything but the pre-transition
//! snapshot, the population, the parameter set, and (transitions only)
//! the run's RNG.
//!
//! The table's order is the selection order. It is fixed when the table
//! is built and never derived from a hash map.

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    params::{ParamKey, ParameterSet},
    rng::RunRng,
    state::Snapshot,
    types::{SiteCount, Step},
};

/// Every event the model knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    MaintenanceMethylation,
    DeNovoMethylation,
    MaintenanceDemethylation,
    Demethylation,
    Birth,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::MaintenanceMethylation,
        Self::DeNovoMethylation,
        Self::MaintenanceDemethylation,
        Self::Demethylation,
        Self::Birth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::MaintenanceMethylation => "maintenance methylation",
            Self::DeNovoMethylation => "de novo methylation",
            Self::MaintenanceDemethylation => "maintenance demethylation",
            Self::Demethylation => "demethylation",
            Self::Birth => "birth",
        }
    }
}

/// Which family of rate formulas a table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLaw {
    /// Each event proportional to its source pool only.
    Basic,
    /// Source pool times a linear recruitment term in the other pools.
    #[default]
    Collaborative,
}

/// Everything a rate function may look at.
#[derive(Debug, Clone, Copy)]
pub struct RateInputs {
    pub methylated: f64,
    pub unmethylated: f64,
    pub hemimethylated: f64,
}

impl RateInputs {
    pub fn from_snapshot(snapshot: &Snapshot, population: SiteCount, step: Step) -> SimResult<Self> {
        let hemimethylated = snapshot.hemimethylated(population, step)?;
        Ok(Self {
            methylated: snapshot.methylated as f64,
            unmethylated: snapshot.unmethylated as f64,
            hemimethylated: hemimethylated as f64,
        })
    }
}

pub type RateFn = fn(&RateInputs, &ParameterSet) -> SimResult<f64>;

/// Maps the pre-transition snapshot to the next one.
pub type TransitionFn = fn(&Snapshot, SiteCount, Step, &mut RunRng) -> SimResult<Snapshot>;

// ── Rate laws: basic ─────────────────────────────────────────────

pub fn maintenance_rate(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::MaintenanceMethylation.name();
    Ok(p.require(ParamKey::RHm, name)? * x.hemimethylated)
}

// NOTE: reads r_uh like the collaborative form; older model code used
// r_hm here. Pending review by the modelling side.
pub fn denovo_rate(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::DeNovoMethylation.name();
    Ok(p.require(ParamKey::RUh, name)? * x.unmethylated)
}

pub fn demaintenance_rate(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::MaintenanceDemethylation.name();
    Ok(p.require(ParamKey::RHu, name)? * x.hemimethylated)
}

pub fn demethylation_rate(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::Demethylation.name();
    Ok(p.require(ParamKey::RMh, name)? * x.methylated)
}

pub fn birth_rate(_x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    p.require(ParamKey::BirthRate, EventKind::Birth.name())
}

// ── Rate laws: collaborative ─────────────────────────────────────

pub fn maintenance_rate_collaborative(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::MaintenanceMethylation.name();
    let recruit = p.require(ParamKey::RHm, name)?
        + p.require(ParamKey::RHmH, name)? * x.hemimethylated
        + p.require(ParamKey::RHmM, name)? * x.methylated;
    Ok(x.hemimethylated * recruit)
}

pub fn denovo_rate_collaborative(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::DeNovoMethylation.name();
    let recruit = p.require(ParamKey::RUh, name)?
        + p.require(ParamKey::RUhH, name)? * x.hemimethylated
        + p.require(ParamKey::RUhM, name)? * x.methylated;
    Ok(x.unmethylated * recruit)
}

pub fn demaintenance_rate_collaborative(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::MaintenanceDemethylation.name();
    let recruit = p.require(ParamKey::RHu, name)?
        + p.require(ParamKey::RHuH, name)? * x.hemimethylated
        + p.require(ParamKey::RHuU, name)? * x.unmethylated;
    Ok(x.hemimethylated * recruit)
}

pub fn demethylation_rate_collaborative(x: &RateInputs, p: &ParameterSet) -> SimResult<f64> {
    let name = EventKind::Demethylation.name();
    let recruit = p.require(ParamKey::RMh, name)?
        + p.require(ParamKey::RMhH, name)? * x.hemimethylated
        + p.require(ParamKey::RMhU, name)? * x.unmethylated;
    Ok(x.methylated * recruit)
}

// ── Transitions ──────────────────────────────────────────────────

fn underflow(prev: &Snapshot, population: SiteCount, step: Step) -> SimError {
    SimError::InvariantViolation {
        step,
        methylated: prev.methylated,
        unmethylated: prev.unmethylated,
        population,
    }
}

/// Hemimethylated → methylated.
pub fn maintenance_event(
    prev: &Snapshot,
    population: SiteCount,
    step: Step,
    _rng: &mut RunRng,
) -> SimResult<Snapshot> {
    if prev.hemimethylated(population, step)? == 0 {
        return Err(underflow(prev, population, step));
    }
    Ok(Snapshot::new(prev.methylated + 1, prev.unmethylated))
}

/// Unmethylated → hemimethylated.
pub fn denovo_event(
    prev: &Snapshot,
    population: SiteCount,
    step: Step,
    _rng: &mut RunRng,
) -> SimResult<Snapshot> {
    let unmethylated = prev
        .unmethylated
        .checked_sub(1)
        .ok_or_else(|| underflow(prev, population, step))?;
    Ok(Snapshot::new(prev.methylated, unmethylated))
}

/// Hemimethylated → unmethylated.
pub fn demaintenance_event(
    prev: &Snapshot,
    population: SiteCount,
    step: Step,
    _rng: &mut RunRng,
) -> SimResult<Snapshot> {
    if prev.hemimethylated(population, step)? == 0 {
        return Err(underflow(prev, population, step));
    }
    Ok(Snapshot::new(prev.methylated, prev.unmethylated + 1))
}

/// Methylated → hemimethylated.
pub fn demethylation_event(
    prev: &Snapshot,
    population: SiteCount,
    step: Step,
    _rng: &mut RunRng,
) -> SimResult<Snapshot> {
    let methylated = prev
        .methylated
        .checked_sub(1)
        .ok_or_else(|| underflow(prev, population, step))?;
    Ok(Snapshot::new(methylated, prev.unmethylated))
}

/// Replication dilutes marks: every methylated site becomes
/// hemimethylated, and each previously hemimethylated site loses its
/// remaining mark with probability 1/2.
// NOTE: the Binomial(h, 0.5) dilution model is pending review by the
// modelling side; keep it isolated here so it can be swapped.
pub fn birth_event(
    prev: &Snapshot,
    population: SiteCount,
    step: Step,
    rng: &mut RunRng,
) -> SimResult<Snapshot> {
    let hemimethylated = prev.hemimethylated(population, step)?;
    let newly_unmethylated = rng.binomial(hemimethylated, 0.5)?;
    Ok(Snapshot::new(0, prev.unmethylated + newly_unmethylated))
}

// ── Table ────────────────────────────────────────────────────────

/// One row of the table.
#[derive(Clone, Copy)]
pub struct EventSpec {
    pub kind: EventKind,
    pub rate: RateFn,
    pub transition: TransitionFn,
}

impl std::fmt::Debug for EventSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSpec").field("kind", &self.kind).finish()
    }
}

/// Ordered, consistency-checked event table. Immutable after construction,
/// so it can be shared by reference across independent runs.
#[derive(Debug, Clone)]
pub struct EventTable {
    specs: Vec<EventSpec>,
    law: Option<RateLaw>,
}

impl EventTable {
    /// Default selection order.
    pub const DEFAULT_ORDER: [EventKind; 5] = [
        EventKind::MaintenanceMethylation,
        EventKind::DeNovoMethylation,
        EventKind::Birth,
        EventKind::MaintenanceDemethylation,
        EventKind::Demethylation,
    ];

    pub fn for_law(law: RateLaw) -> Self {
        let rates: Vec<(EventKind, RateFn)> = Self::DEFAULT_ORDER
            .iter()
            .map(|&kind| (kind, default_rate(kind, law)))
            .collect();
        let transitions: Vec<(EventKind, TransitionFn)> = Self::DEFAULT_ORDER
            .iter()
            .map(|&kind| (kind, default_transition(kind)))
            .collect();
        let specs = zip_parts(&rates, &transitions);
        Self { specs, law: Some(law) }
    }

    pub fn collaborative() -> Self {
        Self::for_law(RateLaw::Collaborative)
    }

    pub fn basic() -> Self {
        Self::for_law(RateLaw::Basic)
    }

    /// Join a rate table and a transition table. Both must name exactly
    /// the same events, each once. Selection follows the rate table's order.
    pub fn from_parts(
        rates: Vec<(EventKind, RateFn)>,
        transitions: Vec<(EventKind, TransitionFn)>,
    ) -> SimResult<Self> {
        if rates.is_empty() {
            return Err(SimError::config("event table is empty"));
        }
        ensure_unique(rates.iter().map(|(k, _)| *k), "rate")?;
        ensure_unique(transitions.iter().map(|(k, _)| *k), "transition")?;

        for (kind, _) in &rates {
            if !transitions.iter().any(|(k, _)| k == kind) {
                return Err(SimError::config(format!(
                    "event '{}' has a rate but no transition",
                    kind.name()
                )));
            }
        }
        for (kind, _) in &transitions {
            if !rates.iter().any(|(k, _)| k == kind) {
                return Err(SimError::config(format!(
                    "event '{}' has a transition but no rate",
                    kind.name()
                )));
            }
        }

        Ok(Self {
            specs: zip_parts(&rates, &transitions),
            law: None,
        })
    }

    /// Check that every coefficient the table's rate laws read is present.
    /// Called once before a run so the hot loop never meets a missing key.
    pub fn validate(&self, params: &ParameterSet) -> SimResult<()> {
        let probe = RateInputs {
            methylated: 1.0,
            unmethylated: 1.0,
            hemimethylated: 1.0,
        };
        for spec in &self.specs {
            (spec.rate)(&probe, params)?;
        }
        Ok(())
    }

    /// The law this table was built from, if it came from a preset.
    pub fn law(&self) -> Option<RateLaw> {
        self.law
    }

    pub fn specs(&self) -> &[EventSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.specs.iter().map(|s| s.kind)
    }

    pub fn get(&self, kind: EventKind) -> Option<&EventSpec> {
        self.specs.iter().find(|s| s.kind == kind)
    }
}

fn default_rate(kind: EventKind, law: RateLaw) -> RateFn {
    match (law, kind) {
        (RateLaw::Basic, EventKind::MaintenanceMethylation) => maintenance_rate,
        (RateLaw::Basic, EventKind::DeNovoMethylation) => denovo_rate,
        (RateLaw::Basic, EventKind::MaintenanceDemethylation) => demaintenance_rate,
        (RateLaw::Basic, EventKind::Demethylation) => demethylation_rate,
        (RateLaw::Collaborative, EventKind::MaintenanceMethylation) => {
            maintenance_rate_collaborative
        }
        (RateLaw::Collaborative, EventKind::DeNovoMethylation) => denovo_rate_collaborative,
        (RateLaw::Collaborative, EventKind::MaintenanceDemethylation) => {
            demaintenance_rate_collaborative
        }
        (RateLaw::Collaborative, EventKind::Demethylation) => demethylation_rate_collaborative,
        (_, EventKind::Birth) => birth_rate,
    }
}

fn default_transition(kind: EventKind) -> TransitionFn {
    match kind {
        EventKind::MaintenanceMethylation => maintenance_event,
        EventKind::DeNovoMethylation => denovo_event,
        EventKind::MaintenanceDemethylation => demaintenance_event,
        EventKind::Demethylation => demethylation_event,
        EventKind::Birth => birth_event,
    }
}

fn ensure_unique(kinds: impl Iterator<Item = EventKind>, which: &str) -> SimResult<()> {
    let mut seen: Vec<EventKind> = Vec::new();
    for kind in kinds {
        if seen.contains(&kind) {
            return Err(SimError::config(format!(
                "event '{}' appears twice in the {which} table",
                kind.name()
            )));
        }
        seen.push(kind);
    }
    Ok(())
}

/// Callers have already checked that both sides name the same events.
fn zip_parts(
    rates: &[(EventKind, RateFn)],
    transitions: &[(EventKind, TransitionFn)],
) -> Vec<EventSpec> {
    rates
        .iter()
        .filter_map(|&(kind, rate)| {
            transitions
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|&(_, transition)| EventSpec { kind, rate, transition })
        })
        .collect()
}
