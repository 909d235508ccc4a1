//! Address book metadata
//!
//! Every address that appears in an event or a summary is shown to the user through
//! an [`AddressBookEntry`]. Entries are resolved by an external collaborator before
//! the pipeline runs; the pipeline only looks them up and treats a miss as a bug.

use std::collections::HashMap;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    errors::MetadataError,
    types::{TokenConfig, NATIVE_TOKEN_ADDRESS},
};

/// Token standards understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TokenStandard {
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "ERC1155")]
    Erc1155,
}

/// What an address is, as far as the address book knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntryKind {
    #[serde(rename = "ERC20")]
    Erc20 { symbol: String, decimals: u8 },
    #[serde(rename = "ERC721")]
    Erc721 { symbol: String },
    #[serde(rename = "ERC1155")]
    Erc1155 {
        #[serde(default)]
        symbol: Option<String>,
    },
    #[serde(rename = "contact")]
    Contact,
    #[serde(rename = "contract")]
    Contract,
    /// One of the user's own addresses
    #[serde(rename = "activeAddress", rename_all = "camelCase")]
    ActiveAddress { ask_for_address_access: bool },
}

/// Metadata for a single address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressBookEntry {
    pub address: Address,
    pub name: String,
    #[serde(flatten)]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
}

impl AddressBookEntry {
    pub fn new(address: Address, name: impl Into<String>, kind: EntryKind) -> Self {
        Self { address, name: name.into(), kind, logo_uri: None }
    }

    /// Synthetic entry for the chain's native currency
    pub fn native_token(config: &TokenConfig) -> Self {
        Self::new(
            NATIVE_TOKEN_ADDRESS,
            config.symbol.clone(),
            EntryKind::Erc20 { symbol: config.symbol.clone(), decimals: config.decimals },
        )
    }

    /// The token standard of this address, if it is a token contract
    pub fn token_standard(&self) -> Option<TokenStandard> {
        match self.kind {
            EntryKind::Erc20 { .. } => Some(TokenStandard::Erc20),
            EntryKind::Erc721 { .. } => Some(TokenStandard::Erc721),
            EntryKind::Erc1155 { .. } => Some(TokenStandard::Erc1155),
            EntryKind::Contact | EntryKind::Contract | EntryKind::ActiveAddress { .. } => None,
        }
    }

    /// Symbol for display, falling back to the entry name
    pub fn symbol(&self) -> &str {
        match &self.kind {
            EntryKind::Erc20 { symbol, .. } | EntryKind::Erc721 { symbol } => symbol,
            EntryKind::Erc1155 { symbol: Some(symbol) } => symbol,
            _ => &self.name,
        }
    }

    pub fn is_token(&self) -> bool {
        self.token_standard().is_some()
    }
}

/// Lookup table from address to its resolved metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressMetadata(HashMap<Address, AddressBookEntry>);

impl AddressMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry
    pub fn insert(&mut self, entry: AddressBookEntry) {
        self.0.insert(entry.address, entry);
    }

    /// Looks up an address, a miss is a [`MetadataError::MissingAddress`]
    pub fn get(&self, address: Address) -> Result<&AddressBookEntry, MetadataError> {
        self.0.get(&address).ok_or(MetadataError::MissingAddress(address))
    }

    /// Looks up an address without treating a miss as an error
    pub fn find(&self, address: Address) -> Option<&AddressBookEntry> {
        self.0.get(&address)
    }

    pub fn contains(&self, address: Address) -> bool {
        self.0.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AddressBookEntry> {
        self.0.values()
    }
}

impl FromIterator<AddressBookEntry> for AddressMetadata {
    fn from_iter<T: IntoIterator<Item = AddressBookEntry>>(iter: T) -> Self {
        Self(iter.into_iter().map(|entry| (entry.address, entry)).collect())
    }
}

impl Extend<AddressBookEntry> for AddressMetadata {
    fn extend<T: IntoIterator<Item = AddressBookEntry>>(&mut self, iter: T) {
        for entry in iter {
            self.insert(entry);
        }
    }
}
