//! Core types for transaction simulation and visualization
//!
//! This module defines the data structures shared by every stage of the pipeline:
//! - Native token configuration per chain
//! - Transactions as requested by websites
//! - Simulated transactions (logs, call traces, gas, post-execution balances)
//! - Simulation state snapshots produced by the external simulator
//! - Price estimates and named token ids supplied by external collaborators

pub use alloy::primitives::{Address, Bytes, Log, B256, I256, U256};
use serde::{Deserialize, Serialize};

use crate::utils::{error_utils::parse_custom_error, trace_utils};

/// Native currency is tracked as a synthetic token living at the zero address
pub const NATIVE_TOKEN_ADDRESS: Address = Address::ZERO;

/// Gas consumed by a plain value transfer without calldata
pub const ETHER_TRANSFER_GAS: u64 = 21_000;

/// Native token configuration including symbol and decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token symbol (e.g., "ETH", "MATIC")
    pub symbol: String,
    /// Number of decimal places
    pub decimals: u8,
}

/// Website that originated a request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    /// Origin of the page, e.g. `https://app.uniswap.org`
    pub website_origin: String,
    /// Favicon url if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Page title if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Website {
    /// Creates a website record carrying only its origin
    pub fn from_origin(origin: impl Into<String>) -> Self {
        Self { website_origin: origin.into(), icon: None, title: None }
    }
}

/// Transaction as requested by a website, before simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptorTransaction {
    /// Transaction sender
    pub from: Address,
    /// Transaction target, `None` for contract creation
    pub to: Option<Address>,
    /// Native token value to send
    pub value: U256,
    /// Transaction input data
    pub input: Bytes,
    /// Sender nonce
    pub nonce: u64,
    /// Chain the transaction is meant for
    pub chain_id: u64,
    /// Gas limit requested
    pub gas_limit: u64,
}

impl InterceptorTransaction {
    /// Returns the 4-byte function selector if the input carries one
    pub fn selector(&self) -> Option<[u8; 4]> {
        let bytes = self.input.get(..4)?;
        let mut selector = [0u8; 4];
        selector.copy_from_slice(bytes);
        Some(selector)
    }
}

/// Kind of frame in a call trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2,
}

impl CallKind {
    /// Whether a frame of this kind moves its `value` from caller to callee
    pub fn transfers_value(&self) -> bool {
        matches!(self, CallKind::Call | CallKind::CallCode | CallKind::Create | CallKind::Create2)
    }
}

/// Outcome of a single call frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    /// Call completed successfully
    Success,
    /// Call reverted with reason
    Revert(String),
    /// Call halted due to error
    Halt(String),
    /// Fatal error occurred
    FatalError,
}

impl CallStatus {
    /// Whether the frame finished without reverting or halting
    pub fn is_success(&self) -> bool {
        matches!(self, CallStatus::Success)
    }
}

/// One frame of the simulator's call tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTrace {
    /// Caller address
    pub from: Address,
    /// Target address (created address for creations)
    pub to: Address,
    /// Native token value
    pub value: U256,
    /// Call input data
    pub input: Bytes,
    /// Frame kind
    pub kind: CallKind,
    /// Gas used by this call
    pub gas_used: u64,
    /// Call output data
    pub output: Bytes,
    /// Call execution status
    pub status: CallStatus,
    /// Set on the deepest failing frame
    pub error_origin: bool,
    /// Child frames in execution order
    pub subtraces: Vec<CallTrace>,
    /// Child indices leading from the root to this frame
    pub trace_address: Vec<usize>,
}

/// Native value moved by a call frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTransfer {
    /// Sender address
    pub from: Address,
    /// Recipient address
    pub to: Address,
    /// Amount in wei
    pub value: U256,
}

/// Why a simulated transaction failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Errors before execution starts
    PreExecution(String),
    /// Transaction reverted, raw revert data attached
    Revert(Bytes),
    /// Execution halted due to error
    Halt(String),
}

/// Overall execution status of a simulated transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Transaction executed successfully
    Success,
    /// Transaction execution failed
    Failed(FailureKind),
}

/// Post-execution balance of an owner for a token (or one token id of a token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub owner: Address,
    /// Token contract, `NATIVE_TOKEN_ADDRESS` for the native currency
    pub token: Address,
    /// Set for ERC1155 balances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<U256>,
    pub balance: U256,
}

/// Transaction after it has been run against the forked chain state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedTransaction {
    /// The transaction as requested
    pub transaction: InterceptorTransaction,
    /// Website that requested it
    pub website: Website,
    /// Gas consumed by the execution
    pub gas_spent: u64,
    /// Effective gas price paid per unit of gas
    pub realized_gas_price: U256,
    /// Final execution status
    pub status: ExecutionStatus,
    /// Emitted event logs in execution order
    pub logs: Vec<Log>,
    /// Root frame of the call tree if the simulator traced calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_trace: Option<CallTrace>,
    /// Balances after execution, used to reconstruct before/after pairs
    #[serde(default)]
    pub token_balances_after: Vec<TokenBalance>,
}

/// Summary of the execution outcome for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Transaction succeeded completely without any errors
    Success,
    /// Transaction succeeded overall but contains internal errors
    PartialSuccess,
    /// Transaction failed
    Failed {
        /// Main error message of the transaction
        error: String,
        /// Original error source message if available
        origin_error: Option<String>,
    },
}

impl SimulatedTransaction {
    /// Whether the simulator reports a successful execution
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExecutionStatus::Success)
    }

    /// Total fee paid by the sender in wei
    pub fn gas_fee(&self) -> U256 {
        U256::from(self.gas_spent).saturating_mul(self.realized_gas_price)
    }

    /// Human readable failure reason, `None` on success
    pub fn get_error_message(&self) -> Option<String> {
        match &self.status {
            ExecutionStatus::Success => None,
            ExecutionStatus::Failed(kind) => Some(match kind {
                FailureKind::PreExecution(reason) => format!("Pre-execution error: {reason}"),
                FailureKind::Revert(output) => match parse_custom_error(output) {
                    Some(reason) => format!("Reverted: {reason}"),
                    None => format!("Reverted: {output}"),
                },
                FailureKind::Halt(reason) => format!("Halted: {reason}"),
            }),
        }
    }

    /// Native value movements recorded in the call trace
    ///
    /// Falls back to the top-level `value` when no trace is attached.
    pub fn native_transfers(&self) -> Vec<NativeTransfer> {
        match &self.call_trace {
            Some(trace) => trace_utils::collect_native_transfers(trace),
            None => match self.transaction.to {
                Some(to) if !self.transaction.value.is_zero() && self.is_success() => {
                    vec![NativeTransfer { from: self.transaction.from, to, value: self.transaction.value }]
                }
                _ => Vec::new(),
            },
        }
    }

    /// Display status, distinguishing reverted inner calls from clean runs
    pub fn execution_status(&self) -> TransactionStatus {
        match &self.status {
            ExecutionStatus::Failed(_) => {
                let error = self.get_error_message().unwrap_or_default();
                let origin_error = self
                    .call_trace
                    .as_ref()
                    .and_then(trace_utils::find_error_trace)
                    .map(|trace| match &trace.status {
                        CallStatus::Revert(reason) | CallStatus::Halt(reason) => reason.clone(),
                        status => format!("{status:?}"),
                    });
                TransactionStatus::Failed { error, origin_error }
            }
            ExecutionStatus::Success => {
                let has_internal_errors = self
                    .call_trace
                    .as_ref()
                    .is_some_and(trace_utils::has_internal_errors);
                if has_internal_errors {
                    TransactionStatus::PartialSuccess
                } else {
                    TransactionStatus::Success
                }
            }
        }
    }
}

/// Simulation snapshot produced by the external simulator
///
/// Entries are `None` for transactions that could not be simulated at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationState {
    /// Block the simulation was forked from
    pub block_number: u64,
    /// Timestamp of that block
    pub block_timestamp: u64,
    /// Chain of the simulation
    pub chain_id: u64,
    /// Simulated transactions in submission order
    pub simulated_transactions: Vec<Option<SimulatedTransaction>>,
}

/// Price of a token expressed in a quote token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPriceEstimate {
    pub token: Address,
    pub quote_token: Address,
    /// Amount of quote token (in its smallest unit) for one whole token
    pub price: U256,
}

/// Human readable name for a specific NFT id (e.g. an ENS name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedTokenId {
    pub token_address: Address,
    pub token_id: U256,
    pub name: String,
}

/// Get default native token configuration for known chains
pub fn get_default_native_token(chain_id: u64) -> TokenConfig {
    match chain_id {
        1 => TokenConfig { symbol: "ETH".into(), decimals: 18 },
        5 => TokenConfig { symbol: "GOERLI_ETH".into(), decimals: 18 },
        10 => TokenConfig { symbol: "OPT_ETH".into(), decimals: 18 },
        56 => TokenConfig { symbol: "BNB".into(), decimals: 18 },
        137 => TokenConfig { symbol: "MATIC".into(), decimals: 18 },
        11155111 => TokenConfig { symbol: "SEPOLIA_ETH".into(), decimals: 18 },
        42161 => TokenConfig { symbol: "ARB_ETH".into(), decimals: 18 },
        // Default to ETH configuration for unknown chains
        _ => TokenConfig { symbol: "ETH".into(), decimals: 18 },
    }
}
