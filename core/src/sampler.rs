//! Time to next event.

use crate::{
    error::{SimError, SimResult},
    rng::RunRng,
    types::{SimTime, Step},
};

/// Draw the waiting time before the next event: exponential with
/// rate `total_propensity`, i.e. mean `1 / total_propensity`.
///
/// A zero (or non-finite) total means no event can ever fire again;
/// that is reported as `DegenerateState` rather than an infinite wait.
pub fn sample_wait_time(
    total_propensity: f64,
    rng: &mut RunRng,
    step: Step,
    now: SimTime,
) -> SimResult<SimTime> {
    if !(total_propensity > 0.0) || !total_propensity.is_finite() {
        return Err(SimError::DegenerateState { step, time: now });
    }
    rng.exponential(total_propensity)
}
