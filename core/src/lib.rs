//! Stochastic simulation of DNA methylation dynamics.
//!
//! A population of CpG sites is split into methylated, unmethylated and
//! hemimethylated pools. Events (maintenance and de novo methylation,
//! demethylation, demaintenance, birth/dilution) fire one at a time with
//! state-dependent propensities, using Gillespie's direct method.

pub mod batch;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod params;
pub mod propensity;
pub mod rng;
pub mod sampler;
pub mod selector;
pub mod state;
pub mod stats;
pub mod stepper;
pub mod types;
