//! Applies a selected event to the state.

use crate::{
    error::{SimError, SimResult},
    event::{EventKind, EventTable},
    rng::RunRng,
    state::Snapshot,
    types::{SiteCount, Step},
};

/// Run `kind`'s transition on the pre-transition snapshot and check the
/// result still fits in the population.
pub fn apply(
    current: &Snapshot,
    population: SiteCount,
    step: Step,
    kind: EventKind,
    table: &EventTable,
    rng: &mut RunRng,
) -> SimResult<Snapshot> {
    let spec = table.get(kind).ok_or_else(|| {
        SimError::config(format!("event '{}' is not in the active table", kind.name()))
    })?;
    let next = (spec.transition)(current, population, step, rng)?;
    next.hemimethylated(population, step)?;
    Ok(next)
}
