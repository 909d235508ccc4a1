//! Seams to external collaborators
//!
//! The core never talks to the network, the browser or the user directly. It goes
//! through these traits:
//! - `EthereumClientService`: chain state and transaction simulation
//! - `AddressMetadataProvider`: address book, prices and NFT names
//! - `WebsiteNotifier`: messages to a connected website's script
//! - `ExtensionIcon`: the extension's visible connection indicator
//! - `AccessRequestPrompt`: the interactive access request dialog

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
    access::{connections::SocketId, AccessStatus, WebsiteNotification},
    address_book::AddressMetadata,
    errors::ClientError,
    types::{InterceptorTransaction, NamedTokenId, SimulationState, TokenPriceEstimate, Website},
};

/// Read-only access to current and simulated chain state
#[async_trait]
pub trait EthereumClientService: Send + Sync {
    /// Latest block number of the connected chain
    async fn block_number(&self) -> Result<u64, ClientError>;

    /// Chain id of the connected chain
    async fn chain_id(&self) -> Result<u64, ClientError>;

    /// Simulates `transactions` in order on top of the latest block
    async fn simulate(&self, transactions: &[(InterceptorTransaction, Website)]) -> Result<SimulationState, ClientError>;
}

/// Resolves metadata for addresses before visualization
#[async_trait]
pub trait AddressMetadataProvider: Send + Sync {
    /// Entries for every address in `addresses`, misses are errors of the caller
    async fn resolve_addresses(&self, addresses: &[Address]) -> Result<AddressMetadata, ClientError>;

    /// Price estimates for `tokens`, tokens without a price are left out
    async fn price_estimates(&self, _tokens: &[Address]) -> Result<Vec<TokenPriceEstimate>, ClientError> {
        Ok(Vec::new())
    }

    /// Names of specific NFT ids, e.g. ENS names of ENS tokens
    async fn named_token_ids(&self, _tokens: &[Address]) -> Result<Vec<NamedTokenId>, ClientError> {
        Ok(Vec::new())
    }
}

/// Delivers notifications to a website's injected script
#[async_trait]
pub trait WebsiteNotifier: Send + Sync {
    async fn notify(&self, socket: SocketId, notification: WebsiteNotification) -> Result<(), ClientError>;
}

/// The extension icon shown for a tab
#[async_trait]
pub trait ExtensionIcon: Send + Sync {
    async fn update(&self, tab_id: u64, status: AccessStatus);
}

/// Asks the user whether a website may connect
///
/// Only opens the dialog, the answer comes back through the pending request
/// table under `request_id`.
#[async_trait]
pub trait AccessRequestPrompt: Send + Sync {
    async fn prompt(&self, request_id: u64, website: &Website, address: Option<Address>) -> Result<(), ClientError>;
}
