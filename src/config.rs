//! Interceptor configuration
//!
//! Provides:
//! - Native token resolution per chain
//! - Swap route search bounds
//! - Access request timeout
//! - The faucet amount of the built-in "make me rich" transaction

use std::{collections::HashMap, time::Duration};

use alloy::primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    address_book::AddressBookEntry,
    swap::RouteLimits,
    types::{get_default_native_token, TokenConfig},
};

/// Sender of the built-in "make me rich" faucet transaction
pub const MAKE_YOU_RICH_SENDER: Address = address!("7e5f4552091a69125d5dfcb7b8c2659029395bdf");

/// Website origin the interceptor uses for transactions it creates itself
pub const INTERCEPTOR_ORIGIN: &str = "The Interceptor";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterceptorConfig {
    /// Chain the simulation stack is connected to
    pub chain_id: u64,
    /// Native token overrides per chain
    pub chain_configs: HashMap<u64, TokenConfig>,
    /// Transactions with more token flows are never routed
    pub max_route_events: usize,
    /// Longest swap route considered, in token flows
    pub max_route_hops: usize,
    /// How long an access request waits for the user
    pub access_request_timeout_ms: u64,
    /// Value of the "make me rich" faucet transaction, in wei
    pub make_you_rich_amount: U256,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            chain_configs: HashMap::new(),
            max_route_events: 10,
            max_route_hops: 10,
            access_request_timeout_ms: 300_000,
            make_you_rich_amount: U256::from(200_000u64) * U256::from(10u64).pow(U256::from(18u64)),
        }
    }
}

impl InterceptorConfig {
    /// Parses a JSON configuration, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Native token of the configured chain
    pub fn native_token(&self) -> TokenConfig {
        self.chain_configs
            .get(&self.chain_id)
            .cloned()
            .unwrap_or_else(|| get_default_native_token(self.chain_id))
    }

    /// Address book entry of the configured chain's native token
    pub fn native_token_entry(&self) -> AddressBookEntry {
        AddressBookEntry::native_token(&self.native_token())
    }

    pub fn route_limits(&self) -> RouteLimits {
        RouteLimits { max_events: self.max_route_events, max_hops: self.max_route_hops }
    }

    pub fn access_request_timeout(&self) -> Duration {
        Duration::from_millis(self.access_request_timeout_ms)
    }
}
