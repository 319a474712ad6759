//! Event selection by cumulative propensity share.

use crate::{
    error::{SimError, SimResult},
    event::EventKind,
    propensity::Propensities,
    types::{SimTime, Step},
};

/// Result of one selection walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub kind: EventKind,
    /// True when rounding left `uniform` past the final cumulative share
    /// and the last eligible event was taken instead.
    pub clamped: bool,
}

/// Pick one event for a uniform draw in [0, 1).
///
/// Walks the events in table order and returns the first whose
/// cumulative share exceeds `uniform`. Zero-propensity events occupy an
/// empty interval and are never chosen. If floating-point rounding leaves
/// the draw past the last boundary, the last event with a positive
/// propensity is chosen.
pub fn select(
    propensities: &Propensities,
    uniform: f64,
    step: Step,
    now: SimTime,
) -> SimResult<Selection> {
    let total = propensities.total();
    if !(total > 0.0) {
        return Err(SimError::DegenerateState { step, time: now });
    }

    let mut sum_so_far = 0.0;
    for &(kind, value) in propensities.entries() {
        let share = value / total;
        if share > 0.0 && uniform < sum_so_far + share {
            return Ok(Selection { kind, clamped: false });
        }
        sum_so_far += share;
    }

    propensities
        .entries()
        .iter()
        .rev()
        .find(|(_, value)| *value > 0.0)
        .map(|&(kind, _)| Selection { kind, clamped: true })
        .ok_or(SimError::DegenerateState { step, time: now })
}
