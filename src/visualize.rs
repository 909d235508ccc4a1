//! Simulation visualization
//!
//! Runs every simulated transaction of a [`SimulationState`] through the event
//! pipeline and assembles what the user interface renders: enriched events,
//! per-address balance summaries, the transaction's category, swap route and
//! quarantine flags, plus one summary over the whole batch.

use std::collections::BTreeSet;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    address_book::AddressMetadata,
    config::InterceptorConfig,
    errors::MetadataError,
    events::{
        classifier::is_withdrawal, classify_logs, enrich_transaction, ClassifiedKind, EnrichedEvent,
        EnrichedTransaction, EnsContext, TokenEvent,
    },
    summary::{LogSummarizer, SummaryOutcome},
    swap::{identify_routes, RouteEvent},
    transaction::{identify_transaction, TransactionIdentification},
    types::{NamedTokenId, SimulationState, TokenPriceEstimate, TransactionStatus, NATIVE_TOKEN_ADDRESS},
};

/// Why a transaction is flagged as dangerous
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum QuarantineReason {
    /// Tokens are sent to a token contract, where they are usually lost
    TokenSentToTokenContract { token: Address },
    /// Native currency is sent to a token contract that does not handle it
    EtherSentToTokenContract,
}

/// Everything shown to the user about one simulated transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedAndVisualizedTransaction {
    pub transaction: EnrichedTransaction,
    pub status: TransactionStatus,
    /// Net effects of this transaction alone, per affected address
    pub summary: Vec<SummaryOutcome>,
    pub identification: TransactionIdentification,
    /// Execution ordered events of an identified swap, when a route was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_route: Option<Vec<RouteEvent>>,
    pub quarantine_reasons: Vec<QuarantineReason>,
}

impl SimulatedAndVisualizedTransaction {
    pub fn is_quarantined(&self) -> bool {
        !self.quarantine_reasons.is_empty()
    }
}

/// Visualization of a whole simulation stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizedSimulation {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub chain_id: u64,
    /// `None` where the simulator produced no result
    pub transactions: Vec<Option<SimulatedAndVisualizedTransaction>>,
    /// Net effects of the whole stack, per affected address
    pub batch_summary: Vec<SummaryOutcome>,
}

/// Externally resolved data the visualization reads from
#[derive(Debug, Clone, Default)]
pub struct VisualizationInputs {
    pub metadata: AddressMetadata,
    pub ens_context: EnsContext,
    pub price_estimates: Vec<TokenPriceEstimate>,
    pub named_token_ids: Vec<NamedTokenId>,
}

/// Addresses the metadata provider must resolve before [`visualize_simulation`]
///
/// Covers senders and recipients, native value movements, log emitters and every
/// address a recognised event references. The native token address is left out,
/// its entry comes from the configuration.
pub fn referenced_addresses(state: &SimulationState) -> Vec<Address> {
    let mut addresses = BTreeSet::new();
    for simulated in state.simulated_transactions.iter().flatten() {
        addresses.insert(simulated.transaction.from);
        addresses.extend(simulated.transaction.to);
        for transfer in simulated.native_transfers() {
            addresses.insert(transfer.from);
            addresses.insert(transfer.to);
        }
        for event in classify_logs(&simulated.logs) {
            addresses.insert(event.raw.emitter());
            match &event.kind {
                ClassifiedKind::NonParsed => {}
                ClassifiedKind::Token(token_event) => {
                    addresses.insert(token_event.token_address());
                    addresses.insert(token_event.from_address());
                    addresses.insert(token_event.to_address());
                    if let TokenEvent::Erc1155(transfer) = token_event {
                        addresses.insert(transfer.operator);
                    }
                }
                ClassifiedKind::Ens(ens_event) => addresses.extend(ens_event.addresses()),
            }
        }
    }
    addresses.remove(&NATIVE_TOKEN_ADDRESS);
    addresses.into_iter().collect()
}

/// Flags transfers that most likely lose funds
///
/// Wrapped-native withdrawals legitimately transfer to the token contract and burns
/// to the zero address are intended, neither is flagged.
pub fn quarantine_reasons(transaction: &EnrichedTransaction) -> Vec<QuarantineReason> {
    let mut reasons = Vec::new();
    for event in &transaction.events {
        let EnrichedEvent::TokenEvent { raw, event } = event else {
            continue;
        };
        let burned = event.to_address() == NATIVE_TOKEN_ADDRESS;
        if event.is_approval() || burned || is_withdrawal(&raw.log) || !event.to().is_token() {
            continue;
        }
        let reason = QuarantineReason::TokenSentToTokenContract { token: event.to_address() };
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }

    let simulated = &transaction.simulated.transaction;
    if let Some(to) = simulated.to {
        let emitted_token_events = transaction.token_events().any(|event| event.token_address() == to);
        let recipient_is_token = transaction
            .native_transfers
            .iter()
            .find(|transfer| transfer.to.address == to)
            .is_some_and(|transfer| transfer.to.is_token());
        if !simulated.value.is_zero() && recipient_is_token && !emitted_token_events {
            reasons.push(QuarantineReason::EtherSentToTokenContract);
        }
    }
    reasons
}

/// Builds the visualization of `state`
///
/// `inputs.metadata` must cover [`referenced_addresses`]. The native token entry is
/// added from `config` when the provider did not supply one.
///
/// # Errors
/// [`MetadataError::MissingAddress`] when an address was not resolved.
pub fn visualize_simulation(
    state: SimulationState,
    mut inputs: VisualizationInputs,
    config: &InterceptorConfig,
) -> Result<VisualizedSimulation, MetadataError> {
    if !inputs.metadata.contains(NATIVE_TOKEN_ADDRESS) {
        inputs.metadata.insert(config.native_token_entry());
    }
    let VisualizationInputs { metadata, ens_context, price_estimates, named_token_ids } = inputs;

    let enriched = state
        .simulated_transactions
        .into_iter()
        .map(|simulated| simulated.map(|simulated| enrich_transaction(simulated, &metadata, &ens_context)).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    let batch_summary = LogSummarizer::new(&enriched).get_summary(&metadata, &price_estimates, &named_token_ids)?;

    let transactions = enriched
        .into_iter()
        .map(|transaction| {
            transaction
                .map(|transaction| {
                    visualize_transaction(transaction, &metadata, &price_estimates, &named_token_ids, config)
                })
                .transpose()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(VisualizedSimulation {
        block_number: state.block_number,
        block_timestamp: state.block_timestamp,
        chain_id: state.chain_id,
        transactions,
        batch_summary,
    })
}

fn visualize_transaction(
    transaction: EnrichedTransaction,
    metadata: &AddressMetadata,
    price_estimates: &[TokenPriceEstimate],
    named_token_ids: &[NamedTokenId],
    config: &InterceptorConfig,
) -> Result<SimulatedAndVisualizedTransaction, MetadataError> {
    let summary =
        LogSummarizer::new(&[Some(transaction.clone())]).get_summary(metadata, price_estimates, named_token_ids)?;
    let identification = identify_transaction(&transaction, config);
    let swap_route = identification
        .identified_swap
        .as_ref()
        .and_then(|swap| identify_routes(&transaction, swap, &config.route_limits()));
    Ok(SimulatedAndVisualizedTransaction {
        status: transaction.simulated.execution_status(),
        quarantine_reasons: quarantine_reasons(&transaction),
        summary,
        identification,
        swap_route,
        transaction,
    })
}
