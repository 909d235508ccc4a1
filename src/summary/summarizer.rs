//! Balance and approval summarizer
//!
//! [`LogSummarizer`] folds the token events, native transfers and gas fees of an
//! ordered batch of transactions into net per-address effects. It is built fresh
//! for every summarization and never shared.

use std::collections::{btree_map::Entry, BTreeMap};

use alloy::primitives::{Address, I256, U256};
use tracing::trace;

use super::types::{
    AddressSummary, Erc1155BalanceChange, Erc20Allowance, Erc20ApprovalChange, Erc20BalanceChange,
    Erc721ApprovalChange, Erc721BalanceChange, OperatorApprovalChange, SummaryOutcome,
};
use crate::{
    address_book::{AddressBookEntry, AddressMetadata},
    errors::MetadataError,
    events::{EnrichedTransaction, HasAddress, TokenEvent},
    types::{NamedTokenId, TokenPriceEstimate, NATIVE_TOKEN_ADDRESS},
    utils::amount_utils::{credit, debit},
};

/// Accumulates net balance and approval changes per address
#[derive(Debug, Clone, Default)]
pub struct LogSummarizer {
    summaries: BTreeMap<Address, AddressSummary>,
}

impl LogSummarizer {
    /// Folds every transaction in order
    ///
    /// `None` entries stand for transactions that could not be simulated and are
    /// skipped.
    pub fn new(transactions: &[Option<EnrichedTransaction>]) -> Self {
        let mut summarizer = Self::default();
        for transaction in transactions.iter().flatten() {
            summarizer.process_transaction(transaction);
        }
        summarizer.summaries.retain(|_, summary| !summary.is_empty());
        summarizer
    }

    fn process_transaction(&mut self, transaction: &EnrichedTransaction) {
        for event in transaction.token_events() {
            self.process_token_event(event);
        }

        for transfer in &transaction.native_transfers {
            self.transfer_fungible(NATIVE_TOKEN_ADDRESS, transfer.from.address, transfer.to.address, transfer.amount);
        }

        let gas_fee = transaction.simulated.gas_fee();
        if !gas_fee.is_zero() {
            trace!(sender = %transaction.sender.address, %gas_fee, "debiting gas fee");
            self.adjust_erc20(transaction.sender.address, NATIVE_TOKEN_ADDRESS, |delta| debit(delta, gas_fee));
        }
    }

    fn process_token_event<A: HasAddress>(&mut self, event: &TokenEvent<A>) {
        let token = event.token_address();
        let from = event.from_address();
        let to = event.to_address();

        match event {
            TokenEvent::Erc20(event) if event.is_approval => {
                self.summary(from).erc20_approvals.entry(token).or_default().insert(to, event.amount);
            }
            TokenEvent::Erc20(event) => self.transfer_fungible(token, from, to, event.amount),
            TokenEvent::Erc721(event) if event.is_approval => {
                self.summary(from).erc721_approvals.entry(token).or_default().insert(event.token_id, to);
            }
            TokenEvent::Erc721(event) => {
                self.toggle_erc721(from, token, event.token_id, false);
                self.toggle_erc721(to, token, event.token_id, true);
                self.clear_erc721_approval(from, token, event.token_id);
            }
            TokenEvent::Erc1155(event) => {
                self.adjust_erc1155(from, token, event.token_id, |delta| debit(delta, event.amount));
                self.adjust_erc1155(to, token, event.token_id, |delta| credit(delta, event.amount));
            }
            TokenEvent::NftAllApproval(event) => {
                let operator = event.all_approval_added.then_some(to);
                self.summary(from).operator_approvals.insert(token, operator);
            }
        }
    }

    fn summary(&mut self, address: Address) -> &mut AddressSummary {
        self.summaries.entry(address).or_default()
    }

    fn transfer_fungible(&mut self, token: Address, from: Address, to: Address, amount: U256) {
        self.adjust_erc20(from, token, |delta| debit(delta, amount));
        self.adjust_erc20(to, token, |delta| credit(delta, amount));
    }

    fn adjust_erc20(&mut self, address: Address, token: Address, change: impl FnOnce(I256) -> I256) {
        let balances = &mut self.summary(address).erc20_balances;
        let updated = change(balances.get(&token).copied().unwrap_or(I256::ZERO));
        if updated.is_zero() {
            balances.remove(&token);
        } else {
            balances.insert(token, updated);
        }
    }

    fn adjust_erc1155(&mut self, address: Address, token: Address, token_id: U256, change: impl FnOnce(I256) -> I256) {
        let balances = &mut self.summary(address).erc1155_balances;
        let ids = balances.entry(token).or_default();
        let updated = change(ids.get(&token_id).copied().unwrap_or(I256::ZERO));
        if updated.is_zero() {
            ids.remove(&token_id);
        } else {
            ids.insert(token_id, updated);
        }
        if ids.is_empty() {
            balances.remove(&token);
        }
    }

    /// Records a send (`received == false`) or a receive of an id
    ///
    /// An opposite entry already present for the same id cancels out.
    fn toggle_erc721(&mut self, address: Address, token: Address, token_id: U256, received: bool) {
        let balances = &mut self.summary(address).erc721_balances;
        let ids = balances.entry(token).or_default();
        match ids.entry(token_id) {
            Entry::Occupied(entry) if *entry.get() != received => {
                entry.remove();
            }
            Entry::Occupied(mut entry) => {
                entry.insert(received);
            }
            Entry::Vacant(entry) => {
                entry.insert(received);
            }
        }
        if ids.is_empty() {
            balances.remove(&token);
        }
    }

    fn clear_erc721_approval(&mut self, owner: Address, token: Address, token_id: U256) {
        let approvals = &mut self.summary(owner).erc721_approvals;
        if let Some(ids) = approvals.get_mut(&token) {
            ids.remove(&token_id);
            if ids.is_empty() {
                approvals.remove(&token);
            }
        }
    }

    /// Raw accumulated effects for an address, `None` if it has no net effect
    pub fn address_summary(&self, address: Address) -> Option<&AddressSummary> {
        self.summaries.get(&address)
    }

    /// Addresses with a non-empty summary, in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.summaries.keys().copied()
    }

    /// Summaries of every affected address, ordered by address
    ///
    /// # Errors
    /// Fails with [`MetadataError::MissingAddress`] if any address or token appearing
    /// in a summary has no entry in `metadata`.
    pub fn get_summary(
        &self,
        metadata: &AddressMetadata,
        price_estimates: &[TokenPriceEstimate],
        named_token_ids: &[NamedTokenId],
    ) -> Result<Vec<SummaryOutcome>, MetadataError> {
        self.summaries
            .iter()
            .map(|(address, summary)| build_outcome(*address, summary, metadata, price_estimates, named_token_ids))
            .collect()
    }

    /// Summary of a single address, `None` if the batch had no net effect on it
    pub fn get_summary_for_addr(
        &self,
        address: Address,
        metadata: &AddressMetadata,
        price_estimates: &[TokenPriceEstimate],
        named_token_ids: &[NamedTokenId],
    ) -> Result<Option<SummaryOutcome>, MetadataError> {
        self.summaries
            .get(&address)
            .map(|summary| build_outcome(address, summary, metadata, price_estimates, named_token_ids))
            .transpose()
    }
}

fn token_id_name(named_token_ids: &[NamedTokenId], token: Address, token_id: U256) -> Option<String> {
    named_token_ids
        .iter()
        .find(|named| named.token_address == token && named.token_id == token_id)
        .map(|named| named.name.clone())
}

fn build_outcome(
    address: Address,
    summary: &AddressSummary,
    metadata: &AddressMetadata,
    price_estimates: &[TokenPriceEstimate],
    named_token_ids: &[NamedTokenId],
) -> Result<SummaryOutcome, MetadataError> {
    let entry = |address: Address| -> Result<AddressBookEntry, MetadataError> { metadata.get(address).cloned() };

    let erc20_token_balance_changes = summary
        .erc20_balances
        .iter()
        .map(|(token, change)| {
            Ok(Erc20BalanceChange {
                token: entry(*token)?,
                change: *change,
                token_price_estimate: price_estimates.iter().find(|estimate| estimate.token == *token).cloned(),
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    let erc20_token_approval_changes = summary
        .erc20_approvals
        .iter()
        .map(|(token, spenders)| {
            let approvals = spenders
                .iter()
                .map(|(spender, amount)| Ok(Erc20Allowance { spender: entry(*spender)?, amount: *amount }))
                .collect::<Result<Vec<_>, MetadataError>>()?;
            Ok(Erc20ApprovalChange { token: entry(*token)?, approvals })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    let mut erc721_token_balance_changes = Vec::new();
    for (token, ids) in &summary.erc721_balances {
        let token_entry = entry(*token)?;
        for (token_id, received) in ids {
            erc721_token_balance_changes.push(Erc721BalanceChange {
                token: token_entry.clone(),
                token_id: *token_id,
                received: *received,
                token_id_name: token_id_name(named_token_ids, *token, *token_id),
            });
        }
    }

    let mut erc721_token_id_approval_changes = Vec::new();
    for (token, ids) in &summary.erc721_approvals {
        let token_entry = entry(*token)?;
        for (token_id, approved) in ids {
            erc721_token_id_approval_changes.push(Erc721ApprovalChange {
                token: token_entry.clone(),
                token_id: *token_id,
                approved: entry(*approved)?,
                token_id_name: token_id_name(named_token_ids, *token, *token_id),
            });
        }
    }

    let mut erc1155_token_balance_changes = Vec::new();
    for (token, ids) in &summary.erc1155_balances {
        let token_entry = entry(*token)?;
        for (token_id, change) in ids {
            erc1155_token_balance_changes.push(Erc1155BalanceChange {
                token: token_entry.clone(),
                token_id: *token_id,
                change: *change,
                token_id_name: token_id_name(named_token_ids, *token, *token_id),
            });
        }
    }

    let erc721_or_1155_operator_approvals = summary
        .operator_approvals
        .iter()
        .map(|(token, operator)| {
            Ok(OperatorApprovalChange { token: entry(*token)?, operator: operator.map(entry).transpose()? })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    Ok(SummaryOutcome {
        summary_for: entry(address)?,
        erc20_token_balance_changes,
        erc20_token_approval_changes,
        erc721_token_balance_changes,
        erc721_token_id_approval_changes,
        erc1155_token_balance_changes,
        erc721_or_1155_operator_approvals,
    })
}
