//! Event types shared by the classifier and the enricher
//!
//! Token and ENS events are generic over how addresses are represented:
//! - `Address` right after classification
//! - [`AddressBookEntry`] after enrichment
//!
//! This keeps a single definition per event shape while letting each stage carry
//! exactly the data it has.

use alloy::primitives::{Address, Log, U256};
use serde::{Deserialize, Serialize};

use super::ens::EnsEvent;
use crate::{
    address_book::{AddressBookEntry, TokenStandard},
    types::SimulatedTransaction,
};

/// Anything that identifies an address
pub trait HasAddress {
    fn address(&self) -> Address;
}

impl HasAddress for Address {
    fn address(&self) -> Address {
        *self
    }
}

impl HasAddress for AddressBookEntry {
    fn address(&self) -> Address {
        self.address
    }
}

/// ERC20 `Transfer` or `Approval`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Event<A> {
    pub token: A,
    /// Sender, or owner for approvals
    pub from: A,
    /// Recipient, or spender for approvals
    pub to: A,
    pub amount: U256,
    pub is_approval: bool,
}

/// ERC721 `Transfer` or single id `Approval`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721Event<A> {
    pub token: A,
    /// Sender, or owner for approvals
    pub from: A,
    /// Recipient, or approved address for approvals
    pub to: A,
    pub token_id: U256,
    pub is_approval: bool,
}

/// ERC1155 `TransferSingle`, or one `(id, value)` pair of a `TransferBatch`
///
/// ERC1155 approvals only exist as [`NftAllApprovalEvent`], so this shape has no
/// approval flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc1155Event<A> {
    pub token: A,
    pub operator: A,
    pub from: A,
    pub to: A,
    pub token_id: U256,
    pub amount: U256,
}

/// `ApprovalForAll`, shared by ERC721 and ERC1155
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftAllApprovalEvent<A> {
    pub token: A,
    /// Owner granting or revoking
    pub from: A,
    /// Operator
    pub to: A,
    pub all_approval_added: bool,
}

/// Token event keyed by token standard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TokenEvent<A> {
    #[serde(rename = "ERC20")]
    Erc20(Erc20Event<A>),
    #[serde(rename = "ERC721")]
    Erc721(Erc721Event<A>),
    #[serde(rename = "ERC1155")]
    Erc1155(Erc1155Event<A>),
    #[serde(rename = "NFT All approval")]
    NftAllApproval(NftAllApprovalEvent<A>),
}

impl<A> TokenEvent<A> {
    pub fn token(&self) -> &A {
        match self {
            TokenEvent::Erc20(event) => &event.token,
            TokenEvent::Erc721(event) => &event.token,
            TokenEvent::Erc1155(event) => &event.token,
            TokenEvent::NftAllApproval(event) => &event.token,
        }
    }

    pub fn from(&self) -> &A {
        match self {
            TokenEvent::Erc20(event) => &event.from,
            TokenEvent::Erc721(event) => &event.from,
            TokenEvent::Erc1155(event) => &event.from,
            TokenEvent::NftAllApproval(event) => &event.from,
        }
    }

    pub fn to(&self) -> &A {
        match self {
            TokenEvent::Erc20(event) => &event.to,
            TokenEvent::Erc721(event) => &event.to,
            TokenEvent::Erc1155(event) => &event.to,
            TokenEvent::NftAllApproval(event) => &event.to,
        }
    }

    pub fn is_approval(&self) -> bool {
        match self {
            TokenEvent::Erc20(event) => event.is_approval,
            TokenEvent::Erc721(event) => event.is_approval,
            TokenEvent::Erc1155(_) => false,
            TokenEvent::NftAllApproval(_) => true,
        }
    }

    /// Standards the emitting contract may have for this event to be genuine
    pub fn accepted_standards(&self) -> &'static [TokenStandard] {
        match self {
            TokenEvent::Erc20(_) => &[TokenStandard::Erc20],
            TokenEvent::Erc721(_) => &[TokenStandard::Erc721],
            TokenEvent::Erc1155(_) => &[TokenStandard::Erc1155],
            TokenEvent::NftAllApproval(_) => &[TokenStandard::Erc721, TokenStandard::Erc1155],
        }
    }

    pub fn token_id(&self) -> Option<U256> {
        match self {
            TokenEvent::Erc721(event) => Some(event.token_id),
            TokenEvent::Erc1155(event) => Some(event.token_id),
            TokenEvent::Erc20(_) | TokenEvent::NftAllApproval(_) => None,
        }
    }

    pub fn amount(&self) -> Option<U256> {
        match self {
            TokenEvent::Erc20(event) => Some(event.amount),
            TokenEvent::Erc1155(event) => Some(event.amount),
            TokenEvent::Erc721(_) | TokenEvent::NftAllApproval(_) => None,
        }
    }

    /// Event name as emitted on chain
    pub fn event_name(&self) -> &'static str {
        match self {
            TokenEvent::Erc20(event) if event.is_approval => "Approval",
            TokenEvent::Erc721(event) if event.is_approval => "Approval",
            TokenEvent::Erc20(_) | TokenEvent::Erc721(_) => "Transfer",
            TokenEvent::Erc1155(_) => "TransferSingle",
            TokenEvent::NftAllApproval(_) => "ApprovalForAll",
        }
    }

    /// Converts every address field, failing on the first error
    pub fn try_map<B, E>(self, mut f: impl FnMut(A) -> Result<B, E>) -> Result<TokenEvent<B>, E> {
        Ok(match self {
            TokenEvent::Erc20(event) => TokenEvent::Erc20(Erc20Event {
                token: f(event.token)?,
                from: f(event.from)?,
                to: f(event.to)?,
                amount: event.amount,
                is_approval: event.is_approval,
            }),
            TokenEvent::Erc721(event) => TokenEvent::Erc721(Erc721Event {
                token: f(event.token)?,
                from: f(event.from)?,
                to: f(event.to)?,
                token_id: event.token_id,
                is_approval: event.is_approval,
            }),
            TokenEvent::Erc1155(event) => TokenEvent::Erc1155(Erc1155Event {
                token: f(event.token)?,
                operator: f(event.operator)?,
                from: f(event.from)?,
                to: f(event.to)?,
                token_id: event.token_id,
                amount: event.amount,
            }),
            TokenEvent::NftAllApproval(event) => TokenEvent::NftAllApproval(NftAllApprovalEvent {
                token: f(event.token)?,
                from: f(event.from)?,
                to: f(event.to)?,
                all_approval_added: event.all_approval_added,
            }),
        })
    }
}

impl<A: HasAddress> TokenEvent<A> {
    pub fn token_address(&self) -> Address {
        self.token().address()
    }

    pub fn from_address(&self) -> Address {
        self.from().address()
    }

    pub fn to_address(&self) -> Address {
        self.to().address()
    }

    /// Named arguments for display when the event is shown as a generic record
    pub fn arguments(&self) -> Vec<EventArgument> {
        let mut arguments = Vec::new();
        match self {
            TokenEvent::Erc20(event) => {
                let (from, to) = if event.is_approval { ("owner", "spender") } else { ("from", "to") };
                arguments.push(EventArgument::new(from, event.from.address()));
                arguments.push(EventArgument::new(to, event.to.address()));
                arguments.push(EventArgument::new("value", event.amount));
            }
            TokenEvent::Erc721(event) => {
                let (from, to) = if event.is_approval { ("owner", "approved") } else { ("from", "to") };
                arguments.push(EventArgument::new(from, event.from.address()));
                arguments.push(EventArgument::new(to, event.to.address()));
                arguments.push(EventArgument::new("tokenId", event.token_id));
            }
            TokenEvent::Erc1155(event) => {
                arguments.push(EventArgument::new("operator", event.operator.address()));
                arguments.push(EventArgument::new("from", event.from.address()));
                arguments.push(EventArgument::new("to", event.to.address()));
                arguments.push(EventArgument::new("id", event.token_id));
                arguments.push(EventArgument::new("value", event.amount));
            }
            TokenEvent::NftAllApproval(event) => {
                arguments.push(EventArgument::new("owner", event.from.address()));
                arguments.push(EventArgument::new("operator", event.to.address()));
                arguments.push(EventArgument::new("approved", event.all_approval_added));
            }
        }
        arguments
    }
}

/// Raw log together with its position in the transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Index of the log within the transaction's log list
    pub log_index: usize,
    pub log: Log,
}

impl RawEvent {
    /// Contract that emitted the log
    pub fn emitter(&self) -> Address {
        self.log.address
    }
}

/// Name/value pair of a decoded event argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventArgument {
    pub name: String,
    pub value: String,
}

impl EventArgument {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self { name: name.into(), value: value.to_string() }
    }
}

/// What the classifier recognised in a log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassifiedKind {
    /// Unknown signature, or a malformed log the caller chose to keep
    NonParsed,
    Token(TokenEvent<Address>),
    Ens(EnsEvent<Address>),
}

/// Output of the log classifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    pub raw: RawEvent,
    pub kind: ClassifiedKind,
}

/// Output of the event enricher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EnrichedEvent {
    NonParsed { raw: RawEvent },
    /// Decoded, but not trusted to be a token event
    Parsed {
        raw: RawEvent,
        contract: AddressBookEntry,
        name: String,
        arguments: Vec<EventArgument>,
    },
    TokenEvent { raw: RawEvent, event: TokenEvent<AddressBookEntry> },
    #[serde(rename = "ENS")]
    Ens { raw: RawEvent, event: EnsEvent<AddressBookEntry> },
}

impl EnrichedEvent {
    pub fn raw(&self) -> &RawEvent {
        match self {
            EnrichedEvent::NonParsed { raw }
            | EnrichedEvent::Parsed { raw, .. }
            | EnrichedEvent::TokenEvent { raw, .. }
            | EnrichedEvent::Ens { raw, .. } => raw,
        }
    }

    pub fn token_event(&self) -> Option<&TokenEvent<AddressBookEntry>> {
        match self {
            EnrichedEvent::TokenEvent { event, .. } => Some(event),
            _ => None,
        }
    }
}

/// Native value moved by a call frame, with metadata attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTransferEvent {
    pub from: AddressBookEntry,
    pub to: AddressBookEntry,
    pub amount: U256,
}

/// A simulated transaction with all of its events enriched
///
/// This is the shared input of the summarizer, the swap identifier and the
/// transaction classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTransaction {
    pub simulated: SimulatedTransaction,
    pub sender: AddressBookEntry,
    /// Entry of the chain's native currency
    pub native_token: AddressBookEntry,
    pub events: Vec<EnrichedEvent>,
    pub native_transfers: Vec<NativeTransferEvent>,
}

impl EnrichedTransaction {
    pub fn sender_address(&self) -> Address {
        self.sender.address
    }

    /// Trusted token events, in log order
    pub fn token_events(&self) -> impl Iterator<Item = &TokenEvent<AddressBookEntry>> {
        self.events.iter().filter_map(EnrichedEvent::token_event)
    }

    /// Number of trusted token events
    pub fn token_event_count(&self) -> usize {
        self.token_events().count()
    }
}
