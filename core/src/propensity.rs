//! Per-step propensity evaluation.

use crate::{
    error::{SimError, SimResult},
    event::{EventKind, EventTable, RateInputs},
    params::ParameterSet,
    state::Snapshot,
    types::{SiteCount, Step},
};

/// One propensity per event, in table order, plus their sum.
#[derive(Debug, Clone, PartialEq)]
pub struct Propensities {
    entries: Vec<(EventKind, f64)>,
    total: f64,
}

impl Propensities {
    /// Wrap caller-supplied values. Fails on any negative or NaN entry.
    pub fn from_entries(entries: Vec<(EventKind, f64)>, step: Step) -> SimResult<Self> {
        let mut total = 0.0;
        for &(kind, value) in &entries {
            // `!(x >= 0)` also catches NaN.
            if !(value >= 0.0) {
                return Err(SimError::NegativePropensity {
                    event: kind.name(),
                    step,
                    value,
                });
            }
            total += value;
        }
        Ok(Self { entries, total })
    }

    pub fn entries(&self) -> &[(EventKind, f64)] {
        &self.entries
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn get(&self, kind: EventKind) -> Option<f64> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, v)| *v)
    }

    /// Share of the total for each event, in table order.
    /// Empty when the total is zero.
    pub fn relative(&self) -> Vec<(EventKind, f64)> {
        if self.total <= 0.0 {
            return Vec::new();
        }
        self.entries
            .iter()
            .map(|&(kind, value)| (kind, value / self.total))
            .collect()
    }
}

/// Evaluate every rate in `table` against the pre-transition snapshot.
pub fn evaluate(
    current: &Snapshot,
    population: SiteCount,
    step: Step,
    params: &ParameterSet,
    table: &EventTable,
) -> SimResult<Propensities> {
    let inputs = RateInputs::from_snapshot(current, population, step)?;
    let mut entries = Vec::with_capacity(table.len());
    for spec in table.specs() {
        entries.push((spec.kind, (spec.rate)(&inputs, params)?));
    }
    Propensities::from_entries(entries, step)
}
