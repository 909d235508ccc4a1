//! Event decoding and enrichment
//!
//! Raw logs flow through two stages:
//! - [`classifier`]: `topic0` dispatch into typed token and ENS events
//! - [`enricher`]: address book lookup and the token standard guard

pub mod classifier;
pub mod ens;
pub mod enricher;
pub mod types;

pub use classifier::{classify_log, classify_logs};
pub use ens::{EnsContext, EnsEvent, EnsLabel, EnsName};
pub use enricher::{enrich_event, enrich_events, enrich_transaction};
pub use types::*;
