//! Shared fixtures for the integration tests
#![allow(dead_code)]

use alloy::{
    primitives::{address, Address, Bytes, Log, U256},
    sol,
    sol_types::SolEvent,
};
use interceptor_core::{
    address_book::{AddressBookEntry, AddressMetadata, EntryKind},
    config::MAKE_YOU_RICH_SENDER,
    events::{enrich_transaction, EnrichedTransaction, EnsContext},
    types::{
        get_default_native_token, ExecutionStatus, InterceptorTransaction, SimulatedTransaction, Website,
    },
};

pub const ALICE: Address = address!("a11ce00000000000000000000000000000000001");
pub const BOB: Address = address!("b0b0000000000000000000000000000000000002");
pub const CAROL: Address = address!("ca201000000000000000000000000000000000c3");
pub const TOKEN_A: Address = address!("aaaa000000000000000000000000000000000001");
pub const TOKEN_B: Address = address!("bbbb000000000000000000000000000000000002");
pub const TOKEN_C: Address = address!("cccc000000000000000000000000000000000003");
pub const NFT: Address = address!("4e46540000000000000000000000000000000721");
pub const MULTI: Address = address!("1155000000000000000000000000000000001155");
pub const POOL1: Address = address!("9001000000000000000000000000000000000001");
pub const POOL2: Address = address!("9002000000000000000000000000000000000002");
pub const ROUTER: Address = address!("7007e70000000000000000000000000000000001");

pub const WEBSITE_ORIGIN: &str = "https://app.example.org";

mod erc20 {
    alloy::sol! {
        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
        event Deposit(address indexed dst, uint256 wad);
        event Withdrawal(address indexed src, uint256 wad);
    }
}

mod erc721 {
    alloy::sol! {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
        event Approval(address indexed owner, address indexed approved, uint256 indexed tokenId);
    }
}

sol! {
    event ApprovalForAll(address indexed owner, address indexed operator, bool approved);
    event TransferBatch(address indexed operator, address indexed from, address indexed to, uint256[] ids, uint256[] values);
}

fn log<E: SolEvent>(emitter: Address, event: &E) -> Log {
    Log { address: emitter, data: event.encode_log_data() }
}

pub fn erc20_transfer(token: Address, from: Address, to: Address, amount: u64) -> Log {
    log(token, &erc20::Transfer { from, to, value: U256::from(amount) })
}

pub fn erc20_approval(token: Address, owner: Address, spender: Address, amount: u64) -> Log {
    log(token, &erc20::Approval { owner, spender, value: U256::from(amount) })
}

pub fn weth_deposit(token: Address, dst: Address, amount: u64) -> Log {
    log(token, &erc20::Deposit { dst, wad: U256::from(amount) })
}

pub fn weth_withdrawal(token: Address, src: Address, amount: u64) -> Log {
    log(token, &erc20::Withdrawal { src, wad: U256::from(amount) })
}

pub fn erc721_transfer(token: Address, from: Address, to: Address, token_id: u64) -> Log {
    log(token, &erc721::Transfer { from, to, tokenId: U256::from(token_id) })
}

pub fn erc721_approval(token: Address, owner: Address, approved: Address, token_id: u64) -> Log {
    log(token, &erc721::Approval { owner, approved, tokenId: U256::from(token_id) })
}

pub fn approval_for_all(token: Address, owner: Address, operator: Address, approved: bool) -> Log {
    log(token, &ApprovalForAll { owner, operator, approved })
}

pub fn transfer_batch(token: Address, operator: Address, from: Address, to: Address, ids: &[u64], values: &[u64]) -> Log {
    log(
        token,
        &TransferBatch {
            operator,
            from,
            to,
            ids: ids.iter().map(|id| U256::from(*id)).collect(),
            values: values.iter().map(|value| U256::from(*value)).collect(),
        },
    )
}

/// Every fixture address except the native token
pub fn metadata_without_native() -> AddressMetadata {
    let erc20 = |address, symbol: &str| {
        AddressBookEntry::new(address, format!("Token {symbol}"), EntryKind::Erc20 { symbol: symbol.into(), decimals: 18 })
    };
    [
        AddressBookEntry::new(ALICE, "Alice", EntryKind::ActiveAddress { ask_for_address_access: false }),
        AddressBookEntry::new(BOB, "Bob", EntryKind::Contact),
        AddressBookEntry::new(CAROL, "Carol", EntryKind::ActiveAddress { ask_for_address_access: true }),
        AddressBookEntry::new(MAKE_YOU_RICH_SENDER, "Faucet", EntryKind::Contract),
        erc20(TOKEN_A, "AAA"),
        erc20(TOKEN_B, "BBB"),
        erc20(TOKEN_C, "CCC"),
        AddressBookEntry::new(NFT, "Fixture NFT", EntryKind::Erc721 { symbol: "NFT".into() }),
        AddressBookEntry::new(MULTI, "Fixture Multi", EntryKind::Erc1155 { symbol: Some("MULTI".into()) }),
        AddressBookEntry::new(POOL1, "Pool 1", EntryKind::Contract),
        AddressBookEntry::new(POOL2, "Pool 2", EntryKind::Contract),
        AddressBookEntry::new(ROUTER, "Router", EntryKind::Contract),
    ]
    .into_iter()
    .collect()
}

pub fn metadata() -> AddressMetadata {
    let mut metadata = metadata_without_native();
    metadata.insert(AddressBookEntry::native_token(&get_default_native_token(1)));
    metadata
}

pub fn entry(address: Address) -> AddressBookEntry {
    metadata().get(address).cloned().unwrap()
}

/// Successful contract call with no value and no gas cost
pub fn simulated(from: Address, to: Option<Address>, logs: Vec<Log>) -> SimulatedTransaction {
    SimulatedTransaction {
        transaction: InterceptorTransaction {
            from,
            to,
            value: U256::ZERO,
            input: Bytes::from(vec![0x12, 0x34, 0x56, 0x78]),
            nonce: 0,
            chain_id: 1,
            gas_limit: 1_000_000,
        },
        website: Website::from_origin(WEBSITE_ORIGIN),
        gas_spent: 50_000,
        realized_gas_price: U256::ZERO,
        status: ExecutionStatus::Success,
        logs,
        call_trace: None,
        token_balances_after: Vec::new(),
    }
}

pub fn enrich(simulated: SimulatedTransaction) -> EnrichedTransaction {
    enrich_transaction(simulated, &metadata(), &EnsContext::default()).unwrap()
}
