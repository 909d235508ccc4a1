//! Swap identification
//!
//! A transaction is a swap when its sender gives away exactly one asset and gets
//! exactly one different asset back, without approving anything on the way.
//! Anything more complex is not a swap, which is an ordinary outcome rather than
//! an error.

pub mod routes;

use std::collections::HashMap;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    address_book::AddressBookEntry,
    events::{EnrichedTransaction, TokenEvent},
    types::TokenBalance,
};

pub use routes::{identify_routes, RouteEvent, RouteLimits};

/// Balance of the sender around the transaction
///
/// Only the balance after execution is observed, the other side is inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeforeAfterBalance {
    pub before: U256,
    pub after: U256,
}

/// One side of a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SwapAsset {
    /// The chain's native currency
    Native {
        token: AddressBookEntry,
        amount: U256,
        before_after_balance: Option<BeforeAfterBalance>,
    },
    #[serde(rename = "ERC20")]
    Erc20 {
        token: AddressBookEntry,
        amount: U256,
        before_after_balance: Option<BeforeAfterBalance>,
    },
    #[serde(rename = "ERC721")]
    Erc721 {
        token: AddressBookEntry,
        token_id: U256,
        before_after_balance: Option<BeforeAfterBalance>,
    },
    #[serde(rename = "ERC1155")]
    Erc1155 {
        token: AddressBookEntry,
        token_id: U256,
        amount: U256,
        before_after_balance: Option<BeforeAfterBalance>,
    },
}

impl SwapAsset {
    pub fn token(&self) -> &AddressBookEntry {
        match self {
            SwapAsset::Native { token, .. }
            | SwapAsset::Erc20 { token, .. }
            | SwapAsset::Erc721 { token, .. }
            | SwapAsset::Erc1155 { token, .. } => token,
        }
    }

    pub fn before_after_balance(&self) -> Option<BeforeAfterBalance> {
        match self {
            SwapAsset::Native { before_after_balance, .. }
            | SwapAsset::Erc20 { before_after_balance, .. }
            | SwapAsset::Erc721 { before_after_balance, .. }
            | SwapAsset::Erc1155 { before_after_balance, .. } => *before_after_balance,
        }
    }
}

/// A clean one-for-one swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedSwap {
    pub sender: AddressBookEntry,
    pub send_asset: SwapAsset,
    pub receive_asset: SwapAsset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AssetKind {
    Native,
    Erc20,
    Erc721,
    Erc1155,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AssetKey {
    kind: AssetKind,
    token: Address,
    token_id: Option<U256>,
}

#[derive(Debug, Clone)]
struct AggregatedAsset {
    token: AddressBookEntry,
    amount: U256,
}

fn asset_key(event: &TokenEvent<AddressBookEntry>) -> Option<(AssetKey, U256)> {
    let token = event.token_address();
    match event {
        TokenEvent::Erc20(event) => Some((AssetKey { kind: AssetKind::Erc20, token, token_id: None }, event.amount)),
        TokenEvent::Erc721(event) => Some((
            AssetKey { kind: AssetKind::Erc721, token, token_id: Some(event.token_id) },
            U256::from(1),
        )),
        TokenEvent::Erc1155(event) => Some((
            AssetKey { kind: AssetKind::Erc1155, token, token_id: Some(event.token_id) },
            event.amount,
        )),
        TokenEvent::NftAllApproval(_) => None,
    }
}

fn aggregate(assets: &mut HashMap<AssetKey, AggregatedAsset>, key: AssetKey, token: &AddressBookEntry, amount: U256) {
    assets
        .entry(key)
        .and_modify(|asset| asset.amount = asset.amount.saturating_add(amount))
        .or_insert_with(|| AggregatedAsset { token: token.clone(), amount });
}

fn single(assets: HashMap<AssetKey, AggregatedAsset>) -> Option<(AssetKey, AggregatedAsset)> {
    if assets.len() != 1 {
        return None;
    }
    assets.into_iter().next()
}

fn balance_after(balances: &[TokenBalance], owner: Address, key: &AssetKey) -> Option<U256> {
    // ERC721 snapshots hold the owner's token count, not a per id balance
    let token_id = if key.kind == AssetKind::Erc1155 { key.token_id } else { None };
    balances
        .iter()
        .find(|balance| balance.owner == owner && balance.token == key.token && balance.token_id == token_id)
        .map(|balance| balance.balance)
}

fn to_swap_asset(key: AssetKey, asset: AggregatedAsset, before_after_balance: Option<BeforeAfterBalance>) -> SwapAsset {
    let AggregatedAsset { token, amount } = asset;
    match (key.kind, key.token_id) {
        (AssetKind::Native, _) => SwapAsset::Native { token, amount, before_after_balance },
        (AssetKind::Erc20, _) => SwapAsset::Erc20 { token, amount, before_after_balance },
        (AssetKind::Erc721, token_id) => {
            SwapAsset::Erc721 { token, token_id: token_id.unwrap_or_default(), before_after_balance }
        }
        (AssetKind::Erc1155, token_id) => {
            SwapAsset::Erc1155 { token, token_id: token_id.unwrap_or_default(), amount, before_after_balance }
        }
    }
}

/// Decides whether a transaction is a one-for-one swap for its sender
///
/// Returns `None` when:
/// - the sender emitted any approval in the transaction
/// - the sender sent or received nothing
/// - the sender sent or received more than one distinct asset
/// - the asset sent is the asset received
pub fn identify_swap(transaction: &EnrichedTransaction) -> Option<IdentifiedSwap> {
    let sender = transaction.sender_address();

    if transaction.token_events().any(|event| event.is_approval() && event.from_address() == sender) {
        return None;
    }

    let mut sent = HashMap::new();
    let mut received = HashMap::new();
    for event in transaction.token_events().filter(|event| !event.is_approval()) {
        let Some((key, amount)) = asset_key(event) else { continue };
        if event.from_address() == sender {
            aggregate(&mut sent, key, event.token(), amount);
        }
        if event.to_address() == sender {
            aggregate(&mut received, key, event.token(), amount);
        }
    }
    for transfer in &transaction.native_transfers {
        let key = AssetKey { kind: AssetKind::Native, token: transaction.native_token.address, token_id: None };
        if transfer.from.address == sender {
            aggregate(&mut sent, key, &transaction.native_token, transfer.amount);
        }
        if transfer.to.address == sender {
            aggregate(&mut received, key, &transaction.native_token, transfer.amount);
        }
    }

    let (send_key, send_asset) = single(sent)?;
    let (receive_key, receive_asset) = single(received)?;
    if send_key == receive_key {
        return None;
    }

    let balances = &transaction.simulated.token_balances_after;
    let gas_fee = transaction.simulated.gas_fee();

    let send_balance = balance_after(balances, sender, &send_key).map(|after| {
        let mut spent = send_asset.amount;
        if send_key.kind == AssetKind::Native {
            spent = spent.saturating_add(gas_fee);
        }
        BeforeAfterBalance { before: after.saturating_add(spent), after }
    });

    let receive_balance = balance_after(balances, sender, &receive_key).and_then(|after| {
        let paid = if receive_key.kind == AssetKind::Native { gas_fee } else { U256::ZERO };
        let before = after.saturating_add(paid).checked_sub(receive_asset.amount)?;
        Some(BeforeAfterBalance { before, after })
    });

    Some(IdentifiedSwap {
        sender: transaction.sender.clone(),
        send_asset: to_swap_asset(send_key, send_asset, send_balance),
        receive_asset: to_swap_asset(receive_key, receive_asset, receive_balance),
    })
}
