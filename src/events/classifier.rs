//! Log classifier
//!
//! Maps raw EVM logs to typed token and ENS events, dispatched on `topic0`.
//!
//! `Transfer` and `Approval` share their signature between ERC20 and ERC721, the
//! two are told apart purely by topic count: a fourth topic carries the ERC721
//! token id, otherwise the amount sits in the data section. WETH style `Deposit`
//! and `Withdrawal` are normalized into ERC20 transfers from and to the token
//! contract itself.

use std::collections::HashMap;

use alloy::{
    primitives::{keccak256, Address, Log, B256, U256},
    sol,
    sol_types::{SolEvent, TopicList},
};
use once_cell::sync::Lazy;
use tracing::warn;

use super::{
    ens::{ens_handlers, EnsHandler},
    types::{
        ClassifiedEvent, ClassifiedKind, Erc1155Event, Erc20Event, Erc721Event, NftAllApprovalEvent,
        RawEvent, TokenEvent,
    },
};
use crate::errors::ClassifyError;

// Token events decoded through their ABI
//
// `Transfer` and `Approval` are parsed by hand since their topic layout depends on
// the token standard.
sol! {
    event ApprovalForAll(address indexed owner, address indexed operator, bool approved);
    event Deposit(address indexed dst, uint256 wad);
    event Withdrawal(address indexed src, uint256 wad);
    event TransferSingle(address indexed operator, address indexed from, address indexed to, uint256 id, uint256 value);
    event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values);
}

/// keccak256("Transfer(address,address,uint256)")
pub static TRANSFER_EVENT_SIGNATURE: Lazy<B256> = Lazy::new(|| keccak256(b"Transfer(address,address,uint256)"));

/// keccak256("Approval(address,address,uint256)")
pub static APPROVAL_EVENT_SIGNATURE: Lazy<B256> = Lazy::new(|| keccak256(b"Approval(address,address,uint256)"));

type TokenHandler = fn(&Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError>;

#[derive(Clone, Copy)]
enum LogHandler {
    Token(TokenHandler),
    Ens(EnsHandler),
}

static LOG_HANDLERS: Lazy<HashMap<B256, LogHandler>> = Lazy::new(|| {
    let mut handlers: HashMap<B256, LogHandler> = HashMap::new();
    handlers.insert(*TRANSFER_EVENT_SIGNATURE, LogHandler::Token(|log| handle_transfer_or_approval(log, false)));
    handlers.insert(*APPROVAL_EVENT_SIGNATURE, LogHandler::Token(|log| handle_transfer_or_approval(log, true)));
    handlers.insert(ApprovalForAll::SIGNATURE_HASH, LogHandler::Token(handle_approval_for_all));
    handlers.insert(Deposit::SIGNATURE_HASH, LogHandler::Token(handle_deposit));
    handlers.insert(Withdrawal::SIGNATURE_HASH, LogHandler::Token(handle_withdrawal));
    handlers.insert(TransferSingle::SIGNATURE_HASH, LogHandler::Token(handle_transfer_single));
    handlers.insert(TransferBatch::SIGNATURE_HASH, LogHandler::Token(handle_transfer_batch));
    for (signature, handler) in ens_handlers() {
        handlers.insert(signature, LogHandler::Ens(handler));
    }
    handlers
});

/// Fails with [`ClassifyError::MissingTopics`] unless the log has at least `expected` topics
pub(crate) fn require_topics(log: &Log, event: &'static str, expected: usize) -> Result<(), ClassifyError> {
    let found = log.topics().len();
    if found < expected {
        return Err(ClassifyError::MissingTopics { event, expected, found });
    }
    Ok(())
}

fn require_data(log: &Log, event: &'static str, expected: usize) -> Result<(), ClassifyError> {
    let found = log.data.data.len();
    if found < expected {
        return Err(ClassifyError::MissingData { event, expected, found });
    }
    Ok(())
}

/// Reads an indexed address, stored right-aligned in a 32 byte topic
pub(crate) fn topic_address(topic: &B256) -> Address {
    Address::from_word(*topic)
}

/// Decodes a log through its ABI after checking the topic count
pub(crate) fn decode<E: SolEvent>(log: &Log, event: &'static str) -> Result<E, ClassifyError> {
    require_topics(log, event, <E::TopicList as TopicList>::COUNT)?;
    E::decode_log_data(&log.data).map_err(|err| ClassifyError::Decode { event, reason: err.to_string() })
}

fn handle_transfer_or_approval(log: &Log, is_approval: bool) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event = if is_approval { "Approval" } else { "Transfer" };
    require_topics(log, event, 3)?;
    let topics = log.topics();
    let token = log.address;
    let from = topic_address(&topics[1]);
    let to = topic_address(&topics[2]);

    if let Some(token_id) = topics.get(3) {
        return Ok(vec![TokenEvent::Erc721(Erc721Event {
            token,
            from,
            to,
            token_id: U256::from_be_bytes(token_id.0),
            is_approval,
        })]);
    }

    require_data(log, event, 32)?;
    let amount = U256::from_be_slice(&log.data.data[..32]);
    Ok(vec![TokenEvent::Erc20(Erc20Event { token, from, to, amount, is_approval })])
}

fn handle_approval_for_all(log: &Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event: ApprovalForAll = decode(log, "ApprovalForAll")?;
    Ok(vec![TokenEvent::NftAllApproval(NftAllApprovalEvent {
        token: log.address,
        from: event.owner,
        to: event.operator,
        all_approval_added: event.approved,
    })])
}

fn handle_deposit(log: &Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event: Deposit = decode(log, "Deposit")?;
    Ok(vec![TokenEvent::Erc20(Erc20Event {
        token: log.address,
        from: log.address,
        to: event.dst,
        amount: event.wad,
        is_approval: false,
    })])
}

fn handle_withdrawal(log: &Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event: Withdrawal = decode(log, "Withdrawal")?;
    Ok(vec![TokenEvent::Erc20(Erc20Event {
        token: log.address,
        from: event.src,
        to: log.address,
        amount: event.wad,
        is_approval: false,
    })])
}

fn handle_transfer_single(log: &Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event: TransferSingle = decode(log, "TransferSingle")?;
    Ok(vec![TokenEvent::Erc1155(Erc1155Event {
        token: log.address,
        operator: event.operator,
        from: event.from,
        to: event.to,
        token_id: event.id,
        amount: event.value,
    })])
}

fn handle_transfer_batch(log: &Log) -> Result<Vec<TokenEvent<Address>>, ClassifyError> {
    let event: TransferBatch = decode(log, "TransferBatch")?;
    if event.ids.len() != event.values.len() {
        return Err(ClassifyError::BatchLengthMismatch { ids: event.ids.len(), values: event.values.len() });
    }
    Ok(event
        .ids
        .iter()
        .zip(event.values.iter())
        .map(|(id, value)| {
            TokenEvent::Erc1155(Erc1155Event {
                token: log.address,
                operator: event.operator,
                from: event.from,
                to: event.to,
                token_id: *id,
                amount: *value,
            })
        })
        .collect())
}

/// Classifies a single log
///
/// Logs with an unknown (or missing) `topic0` come back as one
/// [`ClassifiedKind::NonParsed`] event. A `TransferBatch` fans out into one event
/// per `(id, value)` pair, all pointing back to the same raw log.
///
/// # Errors
/// Returns a [`ClassifyError`] when the log does not have the shape its signature
/// mandates. Nothing is guessed in that case.
pub fn classify_log(log: &Log, log_index: usize) -> Result<Vec<ClassifiedEvent>, ClassifyError> {
    let raw = RawEvent { log_index, log: log.clone() };
    let handler = log.topics().first().and_then(|topic0| LOG_HANDLERS.get(topic0)).copied();

    let kinds = match handler {
        None => vec![ClassifiedKind::NonParsed],
        Some(LogHandler::Token(handler)) => handler(log)?.into_iter().map(ClassifiedKind::Token).collect(),
        Some(LogHandler::Ens(handler)) => vec![ClassifiedKind::Ens(handler(log)?)],
    };

    Ok(kinds.into_iter().map(|kind| ClassifiedEvent { raw: raw.clone(), kind }).collect())
}

/// Whether `log` is a wrapped-native `Withdrawal`, whose normalized transfer goes
/// to the token contract itself
pub fn is_withdrawal(log: &Log) -> bool {
    log.topics().first() == Some(&Withdrawal::SIGNATURE_HASH)
}

/// Classifies every log of a transaction, skipping malformed ones
///
/// A malformed log is logged and kept as [`ClassifiedKind::NonParsed`] so that the
/// rest of the transaction can still be summarized.
pub fn classify_logs(logs: &[Log]) -> Vec<ClassifiedEvent> {
    logs.iter()
        .enumerate()
        .flat_map(|(log_index, log)| match classify_log(log, log_index) {
            Ok(events) => events,
            Err(err) => {
                warn!(log_index, emitter = %log.address, error = %err, "skipping malformed log");
                vec![ClassifiedEvent {
                    raw: RawEvent { log_index, log: log.clone() },
                    kind: ClassifiedKind::NonParsed,
                }]
            }
        })
        .collect()
}
