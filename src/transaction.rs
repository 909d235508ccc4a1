//! Transaction classification
//!
//! Every transaction lands in exactly one category, decided by a cascade of cheap
//! structural checks where the first match wins:
//! 1. the built-in "make me rich" faucet transaction
//! 2. plain ether transfer
//! 3. swap
//! 4. simple token transfer
//! 5. contract deployment
//! 6. simple token approval
//! 7. contract call, labelled from the function selector when known

use serde::{Deserialize, Serialize};

use crate::{
    address_book::{AddressBookEntry, TokenStandard},
    config::{InterceptorConfig, INTERCEPTOR_ORIGIN, MAKE_YOU_RICH_SENDER},
    events::{EnrichedTransaction, TokenEvent},
    swap::{identify_swap, IdentifiedSwap},
    types::ETHER_TRANSFER_GAS,
    utils::fourbyte::function_label,
};

/// Category of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    MakeYouRichTransaction,
    EtherTransfer,
    Swap,
    SimpleTokenTransfer,
    ContractDeployment,
    SimpleTokenApproval,
    ContractFallbackMethod,
    ArbitraryContractExecution,
}

/// Classification with the phrasing shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionIdentification {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub title: String,
    pub signing_action: String,
    pub simulation_action: String,
    pub reject_action: String,
    /// Set for [`TransactionType::Swap`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identified_swap: Option<IdentifiedSwap>,
    /// Set for simple token transfers and approvals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_event: Option<TokenEvent<AddressBookEntry>>,
}

impl TransactionIdentification {
    fn new(
        kind: TransactionType,
        title: impl Into<String>,
        signing: impl Into<String>,
        simulation: impl Into<String>,
        reject: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            signing_action: signing.into(),
            simulation_action: simulation.into(),
            reject_action: reject.into(),
            identified_swap: None,
            token_event: None,
        }
    }

    fn with_token_event(mut self, event: &TokenEvent<AddressBookEntry>) -> Self {
        self.token_event = Some(event.clone());
        self
    }
}

fn is_make_you_rich(transaction: &EnrichedTransaction, config: &InterceptorConfig) -> bool {
    let simulated = &transaction.simulated;
    simulated.transaction.from == MAKE_YOU_RICH_SENDER
        && simulated.transaction.value == config.make_you_rich_amount
        && simulated.transaction.input.is_empty()
        && simulated.website.website_origin == INTERCEPTOR_ORIGIN
}

fn is_ether_transfer(transaction: &EnrichedTransaction) -> bool {
    let simulated = &transaction.simulated;
    simulated.transaction.input.is_empty()
        && transaction.token_event_count() == 0
        && simulated.transaction.to.is_some()
        && simulated.gas_spent == ETHER_TRANSFER_GAS
}

/// The only token event of a transaction with no value, if there is exactly one
fn single_token_event(transaction: &EnrichedTransaction) -> Option<&TokenEvent<AddressBookEntry>> {
    if !transaction.simulated.transaction.value.is_zero() {
        return None;
    }
    let mut events = transaction.token_events();
    let event = events.next()?;
    events.next().is_none().then_some(event)
}

fn simple_token_transfer(transaction: &EnrichedTransaction) -> Option<&TokenEvent<AddressBookEntry>> {
    let event = single_token_event(transaction)?;
    let sender = transaction.sender_address();
    (!event.is_approval() && event.from_address() == sender && event.to_address() != sender).then_some(event)
}

fn simple_token_approval(transaction: &EnrichedTransaction) -> Option<&TokenEvent<AddressBookEntry>> {
    let event = single_token_event(transaction)?;
    let sender = transaction.sender_address();
    (event.is_approval() && event.from_address() == sender && event.to_address() != sender).then_some(event)
}

fn token_id_suffix(event: &TokenEvent<AddressBookEntry>) -> String {
    event.token_id().map(|id| format!(" #{id}")).unwrap_or_default()
}

fn describe_transfer(event: &TokenEvent<AddressBookEntry>) -> TransactionIdentification {
    let symbol = event.token().symbol();
    let asset = format!("{symbol}{}", token_id_suffix(event));
    TransactionIdentification::new(
        TransactionType::SimpleTokenTransfer,
        format!("{asset} Transfer"),
        format!("Transfer {asset}"),
        format!("Simulate {asset} Transfer"),
        format!("Reject {asset} Transfer"),
    )
    .with_token_event(event)
}

fn describe_approval(event: &TokenEvent<AddressBookEntry>) -> TransactionIdentification {
    let symbol = event.token().symbol();
    let (title, signing, simulation, reject) = match event {
        TokenEvent::Erc20(_) => (
            format!("{symbol} Approval"),
            format!("Allow {symbol} Spending"),
            format!("Simulate {symbol} Approval"),
            format!("Reject {symbol} Approval"),
        ),
        TokenEvent::Erc721(approval) => (
            format!("{symbol} #{} Approval", approval.token_id),
            format!("Allow {symbol} #{} Transfer", approval.token_id),
            format!("Simulate {symbol} #{} Approval", approval.token_id),
            format!("Reject {symbol} #{} Approval", approval.token_id),
        ),
        TokenEvent::Erc1155(_) | TokenEvent::NftAllApproval(_) => {
            let scope = match event.token().token_standard() {
                Some(TokenStandard::Erc1155) => "Operator",
                _ => "All",
            };
            let added = !matches!(event, TokenEvent::NftAllApproval(approval) if !approval.all_approval_added);
            if added {
                (
                    format!("{symbol} {scope} Approval"),
                    format!("Allow {scope} {symbol} Transfers"),
                    format!("Simulate {symbol} {scope} Approval"),
                    format!("Reject {symbol} {scope} Approval"),
                )
            } else {
                (
                    format!("Remove {symbol} {scope} Approval"),
                    format!("Remove {scope} {symbol} Approvals"),
                    format!("Simulate Removing {symbol} {scope} Approval"),
                    format!("Reject Removing {symbol} {scope} Approval"),
                )
            }
        }
    };
    TransactionIdentification::new(TransactionType::SimpleTokenApproval, title, signing, simulation, reject)
        .with_token_event(event)
}

fn describe_contract_call(transaction: &EnrichedTransaction) -> TransactionIdentification {
    let Some(selector) = transaction.simulated.transaction.selector() else {
        return TransactionIdentification::new(
            TransactionType::ContractFallbackMethod,
            "Contract Fallback Method",
            "Execute Contract Fallback Method",
            "Simulate Contract Fallback Method",
            "Reject Contract Fallback Method",
        );
    };
    match function_label(selector) {
        Some(label) => TransactionIdentification::new(
            TransactionType::ArbitraryContractExecution,
            label,
            format!("Sign {label}"),
            format!("Simulate {label}"),
            format!("Reject {label}"),
        ),
        None => TransactionIdentification::new(
            TransactionType::ArbitraryContractExecution,
            "Arbitrary Contract Execution",
            "Execute Contract",
            "Simulate Contract Execution",
            "Reject Contract Execution",
        ),
    }
}

/// Classifies a transaction
///
/// Total: every transaction gets exactly one category, the first rule that
/// matches in the order listed in the module docs.
pub fn identify_transaction(transaction: &EnrichedTransaction, config: &InterceptorConfig) -> TransactionIdentification {
    if is_make_you_rich(transaction, config) {
        return TransactionIdentification::new(
            TransactionType::MakeYouRichTransaction,
            "Simply making you rich",
            "Yes please",
            "Simulate making me rich",
            "Hell no",
        );
    }

    if is_ether_transfer(transaction) {
        let symbol = transaction.native_token.symbol();
        return TransactionIdentification::new(
            TransactionType::EtherTransfer,
            format!("{symbol} Transfer"),
            format!("Transfer {symbol}"),
            format!("Simulate {symbol} Transfer"),
            format!("Reject {symbol} Transfer"),
        );
    }

    if let Some(swap) = identify_swap(transaction) {
        let mut identification =
            TransactionIdentification::new(TransactionType::Swap, "Swap", "Swap", "Simulate Swap", "Reject Swap");
        identification.identified_swap = Some(swap);
        return identification;
    }

    if let Some(event) = simple_token_transfer(transaction) {
        return describe_transfer(event);
    }

    if transaction.simulated.transaction.to.is_none() {
        return TransactionIdentification::new(
            TransactionType::ContractDeployment,
            "Contract Deployment",
            "Deploy Contract",
            "Simulate Contract Deployment",
            "Reject Contract Deployment",
        );
    }

    if let Some(event) = simple_token_approval(transaction) {
        return describe_approval(event);
    }

    describe_contract_call(transaction)
}
