//! Summary output types
//!
//! A [`SummaryOutcome`] lists the net effect of a batch of transactions on one
//! address, with metadata attached to every token and counterparty.

use alloy::primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{address_book::AddressBookEntry, types::TokenPriceEstimate};

/// Net effects on a single address, keyed by raw address
///
/// Only non-identity leaves are ever stored: a zero delta, or an ERC721 id that was
/// both sent and received, is removed instead of kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSummary {
    /// token -> signed balance change
    pub erc20_balances: BTreeMap<Address, I256>,
    /// token -> spender -> allowance
    pub erc20_approvals: BTreeMap<Address, BTreeMap<Address, U256>>,
    /// token -> id -> `true` if received, `false` if sent
    pub erc721_balances: BTreeMap<Address, BTreeMap<U256, bool>>,
    /// token -> id -> approved address
    pub erc721_approvals: BTreeMap<Address, BTreeMap<U256, Address>>,
    /// token -> id -> signed balance change
    pub erc1155_balances: BTreeMap<Address, BTreeMap<U256, I256>>,
    /// token -> operator, `None` when the approval was revoked
    pub operator_approvals: BTreeMap<Address, Option<Address>>,
}

impl AddressSummary {
    pub fn is_empty(&self) -> bool {
        self.erc20_balances.is_empty()
            && self.erc20_approvals.is_empty()
            && self.erc721_balances.is_empty()
            && self.erc721_approvals.is_empty()
            && self.erc1155_balances.is_empty()
            && self.operator_approvals.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20BalanceChange {
    pub token: AddressBookEntry,
    pub change: I256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_price_estimate: Option<TokenPriceEstimate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Allowance {
    pub spender: AddressBookEntry,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20ApprovalChange {
    pub token: AddressBookEntry,
    pub approvals: Vec<Erc20Allowance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721BalanceChange {
    pub token: AddressBookEntry,
    pub token_id: U256,
    pub received: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721ApprovalChange {
    pub token: AddressBookEntry,
    pub token_id: U256,
    pub approved: AddressBookEntry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc1155BalanceChange {
    pub token: AddressBookEntry,
    pub token_id: U256,
    pub change: I256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorApprovalChange {
    pub token: AddressBookEntry,
    /// `None` when every operator approval was revoked
    pub operator: Option<AddressBookEntry>,
}

/// Net effect of a batch on one address, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutcome {
    pub summary_for: AddressBookEntry,
    pub erc20_token_balance_changes: Vec<Erc20BalanceChange>,
    pub erc20_token_approval_changes: Vec<Erc20ApprovalChange>,
    pub erc721_token_balance_changes: Vec<Erc721BalanceChange>,
    pub erc721_token_id_approval_changes: Vec<Erc721ApprovalChange>,
    pub erc1155_token_balance_changes: Vec<Erc1155BalanceChange>,
    pub erc721_or_1155_operator_approvals: Vec<OperatorApprovalChange>,
}
