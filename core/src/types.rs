//! Shared primitive types used across the entire simulation.

/// Index into the tracked series. Step 0 is the initial condition.
pub type Step = u64;

/// A count of CpG sites in one methylation category.
pub type SiteCount = u64;

/// Elapsed simulation time (arbitrary units, matching the rate units).
pub type SimTime = f64;

/// Returned by switching-time runs that never switched.
/// Batch callers must filter it before fitting a distribution.
pub const TIMEOUT_SENTINEL: SimTime = -1.0;
