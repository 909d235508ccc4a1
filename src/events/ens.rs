//! ENS events
//!
//! Covers the registry, public resolver, base registrar, registrar controller,
//! name wrapper and reverse registrar events. Names only appear on chain as
//! hashes, so every node and label carries its hash plus the reversed name when
//! the [`EnsContext`] knows it.

use std::collections::HashMap;

use alloy::{
    primitives::{Address, Bytes, Log, B256, U256},
    sol,
    sol_types::SolEvent,
};
use serde::{Deserialize, Serialize};

use super::{
    classifier::{decode, require_topics, topic_address},
    types::{EventArgument, HasAddress},
};
use crate::{
    errors::ClassifyError,
    utils::ens_utils::{labelhash, namehash},
};

mod registry {
    alloy::sol! {
        event NewOwner(bytes32 indexed node, bytes32 indexed label, address owner);
        event Transfer(bytes32 indexed node, address owner);
        event NewResolver(bytes32 indexed node, address resolver);
        event NewTTL(bytes32 indexed node, uint64 ttl);
    }
}

mod resolver {
    alloy::sol! {
        event AddrChanged(bytes32 indexed node, address a);
        event AddressChanged(bytes32 indexed node, uint256 coinType, bytes newAddress);
        event NameChanged(bytes32 indexed node, string name);
        event TextChanged(bytes32 indexed node, string indexed indexedKey, string key, string value);
        event ContenthashChanged(bytes32 indexed node, bytes hash);
    }
}

mod legacy_resolver {
    alloy::sol! {
        event TextChanged(bytes32 indexed node, string indexed indexedKey, string key);
    }
}

mod base_registrar {
    alloy::sol! {
        event NameRegistered(uint256 indexed id, address indexed owner, uint256 expires);
        event NameRenewed(uint256 indexed id, uint256 expires);
    }
}

mod controller {
    alloy::sol! {
        event NameRegistered(string name, bytes32 indexed label, address indexed owner, uint256 baseCost, uint256 premium, uint256 expires);
        event NameRenewed(string name, bytes32 indexed label, uint256 cost, uint256 expires);
    }
}

mod name_wrapper {
    alloy::sol! {
        event NameWrapped(bytes32 indexed node, bytes name, address owner, uint32 fuses, uint64 expiry);
        event NameUnwrapped(bytes32 indexed node, address owner);
        event FusesSet(bytes32 indexed node, uint32 fuses);
        event ExpiryExtended(bytes32 indexed node, uint64 expiry);
    }
}

sol! {
    event ReverseClaimed(address indexed addr, bytes32 indexed node);
}

/// A namehash and the name it reverses to, if known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsName {
    pub hash: B256,
    pub name: Option<String>,
}

impl EnsName {
    pub fn unresolved(hash: B256) -> Self {
        Self { hash, name: None }
    }
}

/// A labelhash and the label it reverses to, if known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsLabel {
    pub hash: B256,
    pub label: Option<String>,
}

impl EnsLabel {
    pub fn unresolved(hash: B256) -> Self {
        Self { hash, label: None }
    }
}

/// ENS record changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "subType", rename_all = "camelCase")]
pub enum EnsEvent<A> {
    NewOwner { node: EnsName, label: EnsLabel, owner: A },
    Transfer { node: EnsName, owner: A },
    NewResolver { node: EnsName, resolver: A },
    NewTtl { node: EnsName, ttl: u64 },
    AddrChanged { node: EnsName, address: A },
    AddressChanged { node: EnsName, coin_type: U256, new_address: Bytes },
    NameChanged { node: EnsName, name: String },
    TextChanged { node: EnsName, key: String, value: Option<String> },
    ContenthashChanged { node: EnsName, hash: Bytes },
    /// Registration through the base registrar (`cost` unknown) or the controller
    NameRegistered { label: EnsLabel, owner: A, expires: U256, cost: Option<U256> },
    NameRenewed { label: EnsLabel, expires: U256, cost: Option<U256> },
    NameWrapped { node: EnsName, name: Option<String>, owner: A, fuses: u32, expiry: u64 },
    NameUnwrapped { node: EnsName, owner: A },
    FusesSet { node: EnsName, fuses: u32 },
    ExpiryExtended { node: EnsName, expiry: u64 },
    ReverseClaimed { address: A, node: EnsName },
}

impl<A> EnsEvent<A> {
    /// Converts every address field, failing on the first error
    pub fn try_map<B, E>(self, mut f: impl FnMut(A) -> Result<B, E>) -> Result<EnsEvent<B>, E> {
        Ok(match self {
            EnsEvent::NewOwner { node, label, owner } => EnsEvent::NewOwner { node, label, owner: f(owner)? },
            EnsEvent::Transfer { node, owner } => EnsEvent::Transfer { node, owner: f(owner)? },
            EnsEvent::NewResolver { node, resolver } => EnsEvent::NewResolver { node, resolver: f(resolver)? },
            EnsEvent::NewTtl { node, ttl } => EnsEvent::NewTtl { node, ttl },
            EnsEvent::AddrChanged { node, address } => EnsEvent::AddrChanged { node, address: f(address)? },
            EnsEvent::AddressChanged { node, coin_type, new_address } => {
                EnsEvent::AddressChanged { node, coin_type, new_address }
            }
            EnsEvent::NameChanged { node, name } => EnsEvent::NameChanged { node, name },
            EnsEvent::TextChanged { node, key, value } => EnsEvent::TextChanged { node, key, value },
            EnsEvent::ContenthashChanged { node, hash } => EnsEvent::ContenthashChanged { node, hash },
            EnsEvent::NameRegistered { label, owner, expires, cost } => {
                EnsEvent::NameRegistered { label, owner: f(owner)?, expires, cost }
            }
            EnsEvent::NameRenewed { label, expires, cost } => EnsEvent::NameRenewed { label, expires, cost },
            EnsEvent::NameWrapped { node, name, owner, fuses, expiry } => {
                EnsEvent::NameWrapped { node, name, owner: f(owner)?, fuses, expiry }
            }
            EnsEvent::NameUnwrapped { node, owner } => EnsEvent::NameUnwrapped { node, owner: f(owner)? },
            EnsEvent::FusesSet { node, fuses } => EnsEvent::FusesSet { node, fuses },
            EnsEvent::ExpiryExtended { node, expiry } => EnsEvent::ExpiryExtended { node, expiry },
            EnsEvent::ReverseClaimed { address, node } => EnsEvent::ReverseClaimed { address: f(address)?, node },
        })
    }

    /// Fills in every name and label the context can reverse
    pub fn resolve_names(&mut self, context: &EnsContext) {
        match self {
            EnsEvent::NewOwner { node, label, .. } => {
                context.resolve_name(node);
                context.resolve_label(label);
            }
            EnsEvent::NameRegistered { label, .. } | EnsEvent::NameRenewed { label, .. } => {
                context.resolve_label(label)
            }
            EnsEvent::Transfer { node, .. }
            | EnsEvent::NewResolver { node, .. }
            | EnsEvent::NewTtl { node, .. }
            | EnsEvent::AddrChanged { node, .. }
            | EnsEvent::AddressChanged { node, .. }
            | EnsEvent::NameChanged { node, .. }
            | EnsEvent::TextChanged { node, .. }
            | EnsEvent::ContenthashChanged { node, .. }
            | EnsEvent::NameWrapped { node, .. }
            | EnsEvent::NameUnwrapped { node, .. }
            | EnsEvent::FusesSet { node, .. }
            | EnsEvent::ExpiryExtended { node, .. }
            | EnsEvent::ReverseClaimed { node, .. } => context.resolve_name(node),
        }
    }
}

impl<A: HasAddress> EnsEvent<A> {
    /// Event name as emitted on chain
    pub fn event_name(&self) -> &'static str {
        match self {
            EnsEvent::NewOwner { .. } => "NewOwner",
            EnsEvent::Transfer { .. } => "Transfer",
            EnsEvent::NewResolver { .. } => "NewResolver",
            EnsEvent::NewTtl { .. } => "NewTTL",
            EnsEvent::AddrChanged { .. } => "AddrChanged",
            EnsEvent::AddressChanged { .. } => "AddressChanged",
            EnsEvent::NameChanged { .. } => "NameChanged",
            EnsEvent::TextChanged { .. } => "TextChanged",
            EnsEvent::ContenthashChanged { .. } => "ContenthashChanged",
            EnsEvent::NameRegistered { .. } => "NameRegistered",
            EnsEvent::NameRenewed { .. } => "NameRenewed",
            EnsEvent::NameWrapped { .. } => "NameWrapped",
            EnsEvent::NameUnwrapped { .. } => "NameUnwrapped",
            EnsEvent::FusesSet { .. } => "FusesSet",
            EnsEvent::ExpiryExtended { .. } => "ExpiryExtended",
            EnsEvent::ReverseClaimed { .. } => "ReverseClaimed",
        }
    }

    /// Addresses referenced by the event
    pub fn addresses(&self) -> Vec<Address> {
        match self {
            EnsEvent::NewOwner { owner, .. }
            | EnsEvent::Transfer { owner, .. }
            | EnsEvent::NameRegistered { owner, .. }
            | EnsEvent::NameWrapped { owner, .. }
            | EnsEvent::NameUnwrapped { owner, .. } => vec![owner.address()],
            EnsEvent::NewResolver { resolver, .. } => vec![resolver.address()],
            EnsEvent::AddrChanged { address, .. } | EnsEvent::ReverseClaimed { address, .. } => {
                vec![address.address()]
            }
            _ => Vec::new(),
        }
    }

    /// Named arguments for display
    pub fn arguments(&self) -> Vec<EventArgument> {
        fn node_argument(node: &EnsName) -> EventArgument {
            EventArgument::new("node", node.name.clone().unwrap_or_else(|| node.hash.to_string()))
        }
        fn label_argument(label: &EnsLabel) -> EventArgument {
            EventArgument::new("label", label.label.clone().unwrap_or_else(|| label.hash.to_string()))
        }
        match self {
            EnsEvent::NewOwner { node, label, owner } => {
                vec![node_argument(node), label_argument(label), EventArgument::new("owner", owner.address())]
            }
            EnsEvent::Transfer { node, owner } | EnsEvent::NameUnwrapped { node, owner } => {
                vec![node_argument(node), EventArgument::new("owner", owner.address())]
            }
            EnsEvent::NewResolver { node, resolver } => {
                vec![node_argument(node), EventArgument::new("resolver", resolver.address())]
            }
            EnsEvent::NewTtl { node, ttl } => vec![node_argument(node), EventArgument::new("ttl", ttl)],
            EnsEvent::AddrChanged { node, address } => {
                vec![node_argument(node), EventArgument::new("address", address.address())]
            }
            EnsEvent::AddressChanged { node, coin_type, new_address } => vec![
                node_argument(node),
                EventArgument::new("coinType", coin_type),
                EventArgument::new("newAddress", new_address),
            ],
            EnsEvent::NameChanged { node, name } => vec![node_argument(node), EventArgument::new("name", name)],
            EnsEvent::TextChanged { node, key, value } => {
                let mut arguments = vec![node_argument(node), EventArgument::new("key", key)];
                if let Some(value) = value {
                    arguments.push(EventArgument::new("value", value));
                }
                arguments
            }
            EnsEvent::ContenthashChanged { node, hash } => {
                vec![node_argument(node), EventArgument::new("hash", hash)]
            }
            EnsEvent::NameRegistered { label, owner, expires, cost } => {
                let mut arguments = vec![
                    label_argument(label),
                    EventArgument::new("owner", owner.address()),
                    EventArgument::new("expires", expires),
                ];
                if let Some(cost) = cost {
                    arguments.push(EventArgument::new("cost", cost));
                }
                arguments
            }
            EnsEvent::NameRenewed { label, expires, cost } => {
                let mut arguments = vec![label_argument(label), EventArgument::new("expires", expires)];
                if let Some(cost) = cost {
                    arguments.push(EventArgument::new("cost", cost));
                }
                arguments
            }
            EnsEvent::NameWrapped { node, name, owner, fuses, expiry } => vec![
                node_argument(node),
                EventArgument::new("name", name.clone().unwrap_or_default()),
                EventArgument::new("owner", owner.address()),
                EventArgument::new("fuses", fuses),
                EventArgument::new("expiry", expiry),
            ],
            EnsEvent::FusesSet { node, fuses } => vec![node_argument(node), EventArgument::new("fuses", fuses)],
            EnsEvent::ExpiryExtended { node, expiry } => {
                vec![node_argument(node), EventArgument::new("expiry", expiry)]
            }
            EnsEvent::ReverseClaimed { address, node } => {
                vec![EventArgument::new("address", address.address()), node_argument(node)]
            }
        }
    }
}

/// Hash reversal tables for ENS names and labels
///
/// Reversal is inherently incomplete: anything missing stays a bare hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsContext {
    name_hashes: HashMap<B256, String>,
    label_hashes: HashMap<B256, String>,
}

impl EnsContext {
    pub fn new(name_hashes: HashMap<B256, String>, label_hashes: HashMap<B256, String>) -> Self {
        Self { name_hashes, label_hashes }
    }

    /// Builds the tables from names the caller already knows, e.g. `vitalik.eth`
    ///
    /// Every suffix of each name is registered as well as every label.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut context = Self::default();
        for name in names {
            context.add_name(name);
        }
        context
    }

    /// Registers a name, its parent names and its labels
    pub fn add_name(&mut self, name: &str) {
        let mut suffix = name;
        loop {
            self.name_hashes.insert(namehash(suffix), suffix.to_string());
            match suffix.split_once('.') {
                Some((label, rest)) => {
                    self.label_hashes.insert(labelhash(label), label.to_string());
                    suffix = rest;
                }
                None => {
                    self.label_hashes.insert(labelhash(suffix), suffix.to_string());
                    break;
                }
            }
        }
    }

    pub fn name(&self, hash: &B256) -> Option<&str> {
        self.name_hashes.get(hash).map(String::as_str)
    }

    pub fn label(&self, hash: &B256) -> Option<&str> {
        self.label_hashes.get(hash).map(String::as_str)
    }

    fn resolve_name(&self, node: &mut EnsName) {
        if node.name.is_none() {
            node.name = self.name(&node.hash).map(str::to_string);
        }
    }

    fn resolve_label(&self, label: &mut EnsLabel) {
        if label.label.is_none() {
            label.label = self.label(&label.hash).map(str::to_string);
        }
    }
}

/// Decodes a DNS wire-format name (`\x07vitalik\x03eth\x00`) into dotted form
pub fn decode_dns_name(encoded: &[u8]) -> Option<String> {
    let mut labels = Vec::new();
    let mut cursor = 0;
    loop {
        let length = *encoded.get(cursor)? as usize;
        if length == 0 {
            break;
        }
        let label = encoded.get(cursor + 1..cursor + 1 + length)?;
        labels.push(std::str::from_utf8(label).ok()?.to_string());
        cursor += 1 + length;
    }
    Some(labels.join("."))
}

pub(crate) type EnsHandler = fn(&Log) -> Result<EnsEvent<Address>, ClassifyError>;

/// Signature hash to decoder for every supported ENS event
pub(crate) fn ens_handlers() -> Vec<(B256, EnsHandler)> {
    let mut handlers: Vec<(B256, EnsHandler)> = Vec::new();
    handlers.push((registry::NewOwner::SIGNATURE_HASH, |log| {
        let event: registry::NewOwner = decode(log, "NewOwner")?;
        Ok(EnsEvent::NewOwner {
            node: EnsName::unresolved(event.node),
            label: EnsLabel::unresolved(event.label),
            owner: event.owner,
        })
    }));
    handlers.push((registry::Transfer::SIGNATURE_HASH, |log| {
        let event: registry::Transfer = decode(log, "Transfer")?;
        Ok(EnsEvent::Transfer { node: EnsName::unresolved(event.node), owner: event.owner })
    }));
    handlers.push((registry::NewResolver::SIGNATURE_HASH, |log| {
        let event: registry::NewResolver = decode(log, "NewResolver")?;
        Ok(EnsEvent::NewResolver { node: EnsName::unresolved(event.node), resolver: event.resolver })
    }));
    handlers.push((registry::NewTTL::SIGNATURE_HASH, |log| {
        let event: registry::NewTTL = decode(log, "NewTTL")?;
        Ok(EnsEvent::NewTtl { node: EnsName::unresolved(event.node), ttl: event.ttl })
    }));
    handlers.push((resolver::AddrChanged::SIGNATURE_HASH, |log| {
        let event: resolver::AddrChanged = decode(log, "AddrChanged")?;
        Ok(EnsEvent::AddrChanged { node: EnsName::unresolved(event.node), address: event.a })
    }));
    handlers.push((resolver::AddressChanged::SIGNATURE_HASH, |log| {
        let event: resolver::AddressChanged = decode(log, "AddressChanged")?;
        Ok(EnsEvent::AddressChanged {
            node: EnsName::unresolved(event.node),
            coin_type: event.coinType,
            new_address: event.newAddress,
        })
    }));
    handlers.push((resolver::NameChanged::SIGNATURE_HASH, |log| {
        let event: resolver::NameChanged = decode(log, "NameChanged")?;
        Ok(EnsEvent::NameChanged { node: EnsName::unresolved(event.node), name: event.name })
    }));
    handlers.push((resolver::TextChanged::SIGNATURE_HASH, |log| {
        let event: resolver::TextChanged = decode(log, "TextChanged")?;
        Ok(EnsEvent::TextChanged { node: EnsName::unresolved(event.node), key: event.key, value: Some(event.value) })
    }));
    handlers.push((legacy_resolver::TextChanged::SIGNATURE_HASH, |log| {
        let event: legacy_resolver::TextChanged = decode(log, "TextChanged")?;
        Ok(EnsEvent::TextChanged { node: EnsName::unresolved(event.node), key: event.key, value: None })
    }));
    handlers.push((resolver::ContenthashChanged::SIGNATURE_HASH, |log| {
        let event: resolver::ContenthashChanged = decode(log, "ContenthashChanged")?;
        Ok(EnsEvent::ContenthashChanged { node: EnsName::unresolved(event.node), hash: event.hash })
    }));
    handlers.push((base_registrar::NameRegistered::SIGNATURE_HASH, |log| {
        let event: base_registrar::NameRegistered = decode(log, "NameRegistered")?;
        Ok(EnsEvent::NameRegistered {
            label: EnsLabel::unresolved(B256::from(event.id)),
            owner: event.owner,
            expires: event.expires,
            cost: None,
        })
    }));
    handlers.push((base_registrar::NameRenewed::SIGNATURE_HASH, |log| {
        let event: base_registrar::NameRenewed = decode(log, "NameRenewed")?;
        Ok(EnsEvent::NameRenewed {
            label: EnsLabel::unresolved(B256::from(event.id)),
            expires: event.expires,
            cost: None,
        })
    }));
    handlers.push((controller::NameRegistered::SIGNATURE_HASH, |log| {
        let event: controller::NameRegistered = decode(log, "NameRegistered")?;
        Ok(EnsEvent::NameRegistered {
            label: EnsLabel { hash: event.label, label: Some(event.name) },
            owner: event.owner,
            expires: event.expires,
            cost: Some(event.baseCost.saturating_add(event.premium)),
        })
    }));
    handlers.push((controller::NameRenewed::SIGNATURE_HASH, |log| {
        let event: controller::NameRenewed = decode(log, "NameRenewed")?;
        Ok(EnsEvent::NameRenewed {
            label: EnsLabel { hash: event.label, label: Some(event.name) },
            expires: event.expires,
            cost: Some(event.cost),
        })
    }));
    handlers.push((name_wrapper::NameWrapped::SIGNATURE_HASH, |log| {
        let event: name_wrapper::NameWrapped = decode(log, "NameWrapped")?;
        Ok(EnsEvent::NameWrapped {
            node: EnsName::unresolved(event.node),
            name: decode_dns_name(&event.name),
            owner: event.owner,
            fuses: event.fuses,
            expiry: event.expiry,
        })
    }));
    handlers.push((name_wrapper::NameUnwrapped::SIGNATURE_HASH, |log| {
        let event: name_wrapper::NameUnwrapped = decode(log, "NameUnwrapped")?;
        Ok(EnsEvent::NameUnwrapped { node: EnsName::unresolved(event.node), owner: event.owner })
    }));
    handlers.push((name_wrapper::FusesSet::SIGNATURE_HASH, |log| {
        let event: name_wrapper::FusesSet = decode(log, "FusesSet")?;
        Ok(EnsEvent::FusesSet { node: EnsName::unresolved(event.node), fuses: event.fuses })
    }));
    handlers.push((name_wrapper::ExpiryExtended::SIGNATURE_HASH, |log| {
        let event: name_wrapper::ExpiryExtended = decode(log, "ExpiryExtended")?;
        Ok(EnsEvent::ExpiryExtended { node: EnsName::unresolved(event.node), expiry: event.expiry })
    }));
    handlers.push((ReverseClaimed::SIGNATURE_HASH, |log| {
        require_topics(log, "ReverseClaimed", 3)?;
        let topics = log.topics();
        Ok(EnsEvent::ReverseClaimed { address: topic_address(&topics[1]), node: EnsName::unresolved(topics[2]) })
    }));
    handlers
}
