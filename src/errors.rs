//! Error types for the simulation visualizer and access gate
//!
//! This module defines the error taxonomy of the crate:
//! - Malformed event logs (fatal to a single log, the caller may skip it)
//! - Missing address metadata (always fatal, signals an upstream ordering bug)
//! - Pending request table failures (duplicate, unknown, timed out)
//! - Failures reported by external collaborators (connectivity or otherwise)
//!
//! Shapes the swap identifier does not support and stale simulation writes are
//! ordinary outcomes and are not represented here.

use alloy::primitives::Address;
use thiserror::Error;

/// Top-level error type
#[derive(Debug, Error)]
pub enum InterceptorError {
    /// A raw log did not match the shape its selector mandates
    #[error("Malformed event: {0}")]
    Classify(#[from] ClassifyError),

    /// Metadata was not resolved before enrichment or summarization
    #[error("Missing metadata: {0}")]
    Metadata(#[from] MetadataError),

    /// Pending request bookkeeping failed
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// An external collaborator failed
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
}

/// Malformed event log errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// Fewer topics than the event signature requires
    #[error("{event} requires {expected} topics, found {found}")]
    MissingTopics {
        event: &'static str,
        expected: usize,
        found: usize,
    },

    /// Data section shorter than the event signature requires
    #[error("{event} requires {expected} bytes of data, found {found}")]
    MissingData {
        event: &'static str,
        expected: usize,
        found: usize,
    },

    /// `TransferBatch` with `ids` and `values` of different lengths
    #[error("TransferBatch has {ids} ids but {values} values")]
    BatchLengthMismatch { ids: usize, values: usize },

    /// ABI decoding of the data section failed
    #[error("Failed to decode {event}: {reason}")]
    Decode { event: &'static str, reason: String },
}

/// Missing metadata errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    /// No address book entry for an address referenced by an event or summary
    #[error("no address book entry for {0}")]
    MissingAddress(Address),
}

/// Pending request table errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    /// A request of the same kind is already waiting for the user
    #[error("a {kind} request is already pending")]
    AlreadyPending { kind: String },

    /// No pending request with that id
    #[error("unknown request {0}")]
    UnknownRequest(u64),

    /// The user did not answer in time
    #[error("request {0} timed out")]
    TimedOut(u64),

    /// The request was dropped without an answer
    #[error("request {0} was dropped before it was resolved")]
    Dropped(u64),
}

/// Errors reported by external collaborators
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport level failure, retried on the next trigger
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// The node answered with a JSON-RPC error
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Any other collaborator failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// Whether the failure is transient network trouble
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ClientError::Connectivity(_))
    }
}

impl InterceptorError {
    /// Whether the failure is transient network trouble
    pub fn is_connectivity(&self) -> bool {
        matches!(self, InterceptorError::Client(client) if client.is_connectivity())
    }
}
