//! Event enricher
//!
//! Attaches address book metadata to classified events. Metadata must already be
//! resolved for every address an event references, a miss is a
//! [`MetadataError`]. ENS hashes are reversed on a best effort basis.
//!
//! A token event is only trusted when the emitting contract is known to implement a
//! matching standard. Otherwise it is downgraded to [`EnrichedEvent::Parsed`], so an
//! NFT contract cannot pass off a forged ERC20 `Transfer` (and a plain contract
//! cannot pass off any token event).

use alloy::primitives::Address;
use tracing::debug;

use super::{
    classifier::classify_logs,
    ens::EnsContext,
    types::{
        ClassifiedEvent, ClassifiedKind, EnrichedEvent, EnrichedTransaction, NativeTransferEvent, TokenEvent,
    },
};
use crate::{
    address_book::{AddressBookEntry, AddressMetadata},
    errors::MetadataError,
    types::{SimulatedTransaction, NATIVE_TOKEN_ADDRESS},
};

/// Enriches a single classified event
pub fn enrich_event(
    event: ClassifiedEvent,
    metadata: &AddressMetadata,
    ens_context: &EnsContext,
) -> Result<EnrichedEvent, MetadataError> {
    let raw = event.raw;
    match event.kind {
        ClassifiedKind::NonParsed => Ok(EnrichedEvent::NonParsed { raw }),
        ClassifiedKind::Token(token_event) => {
            let contract = metadata.get(raw.emitter())?;
            let standard_matches = contract
                .token_standard()
                .is_some_and(|standard| token_event.accepted_standards().contains(&standard));
            if !standard_matches {
                debug!(
                    emitter = %raw.emitter(),
                    event = token_event.event_name(),
                    standard = ?contract.token_standard(),
                    "token event does not match the emitter's standard, downgrading"
                );
                return Ok(EnrichedEvent::Parsed {
                    contract: contract.clone(),
                    name: token_event.event_name().to_string(),
                    arguments: token_event.arguments(),
                    raw,
                });
            }
            let event = enrich_token_event(token_event, metadata)?;
            Ok(EnrichedEvent::TokenEvent { raw, event })
        }
        ClassifiedKind::Ens(mut ens_event) => {
            ens_event.resolve_names(ens_context);
            let event = ens_event.try_map(|address| metadata.get(address).cloned())?;
            Ok(EnrichedEvent::Ens { raw, event })
        }
    }
}

/// Replaces every address of a token event with its address book entry
pub fn enrich_token_event(
    event: TokenEvent<Address>,
    metadata: &AddressMetadata,
) -> Result<TokenEvent<AddressBookEntry>, MetadataError> {
    event.try_map(|address| metadata.get(address).cloned())
}

/// Enriches all events of a transaction, in order
pub fn enrich_events(
    events: Vec<ClassifiedEvent>,
    metadata: &AddressMetadata,
    ens_context: &EnsContext,
) -> Result<Vec<EnrichedEvent>, MetadataError> {
    events.into_iter().map(|event| enrich_event(event, metadata, ens_context)).collect()
}

/// Classifies and enriches everything a simulated transaction produced
///
/// `metadata` must hold an entry for the native currency at
/// [`NATIVE_TOKEN_ADDRESS`] next to every address the logs and the call trace
/// reference.
pub fn enrich_transaction(
    simulated: SimulatedTransaction,
    metadata: &AddressMetadata,
    ens_context: &EnsContext,
) -> Result<EnrichedTransaction, MetadataError> {
    let events = enrich_events(classify_logs(&simulated.logs), metadata, ens_context)?;
    let native_transfers = simulated
        .native_transfers()
        .into_iter()
        .map(|transfer| {
            Ok(NativeTransferEvent {
                from: metadata.get(transfer.from)?.clone(),
                to: metadata.get(transfer.to)?.clone(),
                amount: transfer.value,
            })
        })
        .collect::<Result<Vec<_>, MetadataError>>()?;

    Ok(EnrichedTransaction {
        sender: metadata.get(simulated.transaction.from)?.clone(),
        native_token: metadata.get(NATIVE_TOKEN_ADDRESS)?.clone(),
        events,
        native_transfers,
        simulated,
    })
}
