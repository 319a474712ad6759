use crate::types::{SiteCount, SimTime, Step};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Unknown parameter '{key}'")]
    UnknownParameter { key: String },

    #[error("Parameter '{key}' required by event '{event}' is missing")]
    MissingParameter { key: &'static str, event: &'static str },

    #[error("Event '{event}' produced negative propensity {value} at step {step}")]
    NegativePropensity {
        event: &'static str,
        step: Step,
        value: f64,
    },

    #[error("Degenerate state: total propensity is zero at step {step} (t={time})")]
    DegenerateState { step: Step, time: SimTime },

    #[error(
        "State invariant violated at step {step}: methylated {methylated}, \
         unmethylated {unmethylated}, population {population}"
    )]
    InvariantViolation {
        step: Step,
        methylated: SiteCount,
        unmethylated: SiteCount,
        population: SiteCount,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SimError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration { reason: reason.into() }
    }
}

pub type SimResult<T> = Result<T, SimError>;
