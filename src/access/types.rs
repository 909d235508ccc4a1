//! Website access table
//!
//! Persisted per website origin. An origin without an entry is "not found", which
//! is distinct from an entry with `access: false`.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    address_book::{AddressBookEntry, EntryKind},
    types::Website,
};

/// Network request blocking applied while the interceptor is disabled for a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeclarativeNetRequestBlockMode {
    #[serde(rename = "block-all")]
    BlockAll,
    #[default]
    #[serde(rename = "disabled")]
    Disabled,
}

/// Access decision for one address on one website
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressAccess {
    pub address: Address,
    pub access: bool,
}

/// Access table entry of one website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteAccess {
    pub website: Website,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<bool>,
    /// Unique by address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_access: Option<Vec<AddressAccess>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interceptor_disabled: Option<bool>,
    #[serde(default)]
    pub declarative_net_request_block_mode: DeclarativeNetRequestBlockMode,
}

impl WebsiteAccess {
    pub fn new(website: Website) -> Self {
        Self {
            website,
            access: None,
            address_access: None,
            interceptor_disabled: None,
            declarative_net_request_block_mode: DeclarativeNetRequestBlockMode::default(),
        }
    }

    pub fn is_interceptor_disabled(&self) -> bool {
        self.interceptor_disabled.unwrap_or(false)
    }

    /// Explicit decision for `address`, if one was recorded
    pub fn address_access(&self, address: Address) -> Option<bool> {
        self.address_access
            .as_ref()?
            .iter()
            .find(|entry| entry.address == address)
            .map(|entry| entry.access)
    }
}

/// The whole access table, in the order it is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebsiteAccessArray(pub Vec<WebsiteAccess>);

impl WebsiteAccessArray {
    pub fn find(&self, origin: &str) -> Option<&WebsiteAccess> {
        self.0.iter().find(|entry| entry.website.website_origin == origin)
    }

    fn entry_mut(&mut self, website: &Website) -> &mut WebsiteAccess {
        let index = match self.0.iter().position(|entry| entry.website.website_origin == website.website_origin) {
            Some(index) => index,
            None => {
                self.0.push(WebsiteAccess::new(website.clone()));
                self.0.len() - 1
            }
        };
        &mut self.0[index]
    }

    /// Grants or denies a whole website
    pub fn set_website_access(&mut self, website: &Website, access: bool) {
        self.entry_mut(website).access = Some(access);
    }

    /// Records the decision for one address, replacing any earlier one
    ///
    /// Granting an address also grants the website itself.
    pub fn set_address_access(&mut self, website: &Website, address: Address, access: bool) {
        let entry = self.entry_mut(website);
        if access {
            entry.access = Some(true);
        }
        let addresses = entry.address_access.get_or_insert_with(Vec::new);
        match addresses.iter_mut().find(|existing| existing.address == address) {
            Some(existing) => existing.access = access,
            None => addresses.push(AddressAccess { address, access }),
        }
    }

    pub fn set_interceptor_disabled(&mut self, website: &Website, disabled: bool) {
        let entry = self.entry_mut(website);
        entry.interceptor_disabled = Some(disabled);
        entry.declarative_net_request_block_mode =
            if disabled { DeclarativeNetRequestBlockMode::BlockAll } else { DeclarativeNetRequestBlockMode::Disabled };
    }

    /// Forgets a website, returning whether it had an entry
    pub fn remove_website(&mut self, origin: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|entry| entry.website.website_origin != origin);
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &WebsiteAccess> {
        self.0.iter()
    }
}

/// Settings the access gate reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessSettings {
    /// Address websites currently see
    pub active_address: Option<Address>,
    pub active_chain_id: u64,
    /// Transactions are simulated instead of forwarded to the signer
    pub simulation_mode: bool,
    /// The active address follows whatever the signer exposes
    pub use_signers_address_as_active_address: bool,
    pub website_access: WebsiteAccessArray,
    /// The user's own addresses, as [`EntryKind::ActiveAddress`] entries
    pub active_addresses: Vec<AddressBookEntry>,
}

impl AccessSettings {
    /// Whether `address` is one of the user's addresses that websites may see without
    /// an individual grant
    pub fn skips_address_access(&self, address: Address) -> bool {
        self.active_addresses.iter().any(|entry| {
            entry.address == address && matches!(entry.kind, EntryKind::ActiveAddress { ask_for_address_access: false })
        })
    }

    /// Whether the signer has to be kept in sync with what websites see
    pub fn mirrors_signer(&self) -> bool {
        !self.simulation_mode || self.use_signers_address_as_active_address
    }
}

/// Outcome of an access check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessStatus {
    HasAccess,
    NoAccess,
    AskAccess,
    InterceptorDisabled,
}

/// Raw result of consulting the access table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessLookup {
    HasAccess,
    NoAccess,
    InterceptorDisabled,
    /// No decision recorded, the user has not been asked yet
    NotFound,
}

impl AccessLookup {
    /// Resolves "not found", failing closed unless the caller wants to prompt
    pub fn resolve(self, ask_access_if_unknown: bool) -> AccessStatus {
        match self {
            AccessLookup::HasAccess => AccessStatus::HasAccess,
            AccessLookup::NoAccess => AccessStatus::NoAccess,
            AccessLookup::InterceptorDisabled => AccessStatus::InterceptorDisabled,
            AccessLookup::NotFound if ask_access_if_unknown => AccessStatus::AskAccess,
            AccessLookup::NotFound => AccessStatus::NoAccess,
        }
    }
}
