//! Simulation state and refresh
//!
//! - [`state`]: per-resource locked state and stale-write rejection
//! - [`refresh`]: cancellable re-simulation and commit

pub mod refresh;
pub mod state;

pub use refresh::{RefreshOutcome, SimulationRefresher};
pub use state::{
    InterceptorState, SimulationResults, SimulationResultsStore, SimulationStatus, TabState, UpdateOutcome,
};
