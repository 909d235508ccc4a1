mod common;

use alloy::primitives::{Address, I256, U256};
use common::*;
use interceptor_core::{
    config::InterceptorConfig,
    errors::{ClassifyError, MetadataError},
    events::{classify_log, classify_logs, enrich_event, ClassifiedKind, EnrichedEvent, EnsContext, TokenEvent},
    summary::LogSummarizer,
    types::{SimulationState, NATIVE_TOKEN_ADDRESS},
    visualize::{quarantine_reasons, referenced_addresses, visualize_simulation, QuarantineReason, VisualizationInputs},
};

fn delta(value: i64) -> I256 {
    I256::try_from(value).unwrap()
}

fn erc20_delta(summarizer: &LogSummarizer, address: Address, token: Address) -> Option<I256> {
    summarizer.address_summary(address).and_then(|summary| summary.erc20_balances.get(&token).copied())
}

#[test]
fn test_erc20_transfer_round_trip() {
    let transfer = erc20_transfer(TOKEN_A, ALICE, BOB, 1000);

    let classified = classify_log(&transfer, 0).unwrap();
    assert_eq!(classified.len(), 1);
    let enriched = enrich_event(classified[0].clone(), &metadata(), &EnsContext::default()).unwrap();
    let event = enriched.token_event().expect("trusted token event");
    assert_eq!(event.from().name, "Alice");
    assert_eq!(event.to().name, "Bob");
    assert_eq!(event.amount(), Some(U256::from(1000)));

    let transaction = enrich(simulated(ALICE, Some(TOKEN_A), vec![transfer]));
    let summarizer = LogSummarizer::new(&[Some(transaction)]);
    assert_eq!(erc20_delta(&summarizer, ALICE, TOKEN_A), Some(delta(-1000)));
    assert_eq!(erc20_delta(&summarizer, BOB, TOKEN_A), Some(delta(1000)));

    let outcomes = summarizer.get_summary(&metadata(), &[], &[]).unwrap();
    let alice = outcomes.iter().find(|outcome| outcome.summary_for.address == ALICE).unwrap();
    assert_eq!(alice.erc20_token_balance_changes.len(), 1);
    assert_eq!(alice.erc20_token_balance_changes[0].token.symbol(), "AAA");
    assert_eq!(alice.erc20_token_balance_changes[0].change, delta(-1000));
}

#[test]
fn test_transfer_topic_count_selects_standard() {
    let fungible = classify_log(&erc20_transfer(TOKEN_A, ALICE, BOB, 5), 0).unwrap();
    assert!(matches!(fungible[0].kind, ClassifiedKind::Token(TokenEvent::Erc20(_))));

    let nft = classify_log(&erc721_transfer(NFT, ALICE, BOB, 5), 0).unwrap();
    assert!(matches!(nft[0].kind, ClassifiedKind::Token(TokenEvent::Erc721(_))));
}

#[test]
fn test_event_from_wrong_standard_is_downgraded() {
    // a three topic Transfer emitted by an ERC721 contract
    let spoofed = erc20_transfer(NFT, ALICE, BOB, 1);
    let classified = classify_log(&spoofed, 3).unwrap();
    let enriched = enrich_event(classified[0].clone(), &metadata(), &EnsContext::default()).unwrap();

    match &enriched {
        EnrichedEvent::Parsed { contract, name, raw, .. } => {
            assert_eq!(contract.address, NFT);
            assert_eq!(name, "Transfer");
            assert_eq!(raw.log_index, 3);
        }
        other => panic!("expected a downgraded event, got {other:?}"),
    }

    let transaction = enrich(simulated(ALICE, Some(NFT), vec![spoofed]));
    assert_eq!(transaction.token_event_count(), 0);
    assert!(LogSummarizer::new(&[Some(transaction)]).address_summary(ALICE).is_none());
}

#[test]
fn test_transfer_batch_length_mismatch_is_malformed() {
    let batch = transfer_batch(MULTI, ROUTER, ALICE, BOB, &[1, 2], &[10]);
    assert_eq!(classify_log(&batch, 0), Err(ClassifyError::BatchLengthMismatch { ids: 2, values: 1 }));

    // the lenient pass keeps the log as unparsed
    let classified = classify_logs(&[batch]);
    assert_eq!(classified.len(), 1);
    assert_eq!(classified[0].kind, ClassifiedKind::NonParsed);
}

#[test]
fn test_transfer_batch_fans_out() {
    let batch = transfer_batch(MULTI, ROUTER, ALICE, BOB, &[1, 2], &[10, 20]);
    let transaction = enrich(simulated(ALICE, Some(MULTI), vec![batch]));
    assert_eq!(transaction.token_event_count(), 2);

    let summarizer = LogSummarizer::new(&[Some(transaction)]);
    let bob = summarizer.address_summary(BOB).unwrap();
    assert_eq!(bob.erc1155_balances[&MULTI][&U256::from(1)], delta(10));
    assert_eq!(bob.erc1155_balances[&MULTI][&U256::from(2)], delta(20));
}

#[test]
fn test_missing_metadata_is_fatal() {
    let stranger = Address::repeat_byte(0x77);
    let classified = classify_log(&erc20_transfer(TOKEN_A, ALICE, stranger, 1), 0).unwrap();
    assert_eq!(
        enrich_event(classified[0].clone(), &metadata(), &EnsContext::default()),
        Err(MetadataError::MissingAddress(stranger))
    );
}

#[test]
fn test_erc20_conservation() {
    let amounts = [5u64, 7, 11, 13, 2];
    let logs = amounts
        .iter()
        .enumerate()
        .map(|(index, amount)| {
            if index % 2 == 0 {
                erc20_transfer(TOKEN_A, ALICE, BOB, *amount)
            } else {
                erc20_transfer(TOKEN_A, BOB, ALICE, *amount)
            }
        })
        .collect();
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(TOKEN_A), logs)))]);

    let alice = erc20_delta(&summarizer, ALICE, TOKEN_A).unwrap();
    let bob = erc20_delta(&summarizer, BOB, TOKEN_A).unwrap();
    assert_eq!(alice, delta(-5 + 7 - 11 + 13 - 2));
    assert_eq!(alice + bob, I256::ZERO);
}

#[test]
fn test_zero_net_change_leaves_no_entry() {
    let logs = vec![erc20_transfer(TOKEN_A, ALICE, BOB, 9), erc20_transfer(TOKEN_A, BOB, ALICE, 9)];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(TOKEN_A), logs)))]);
    assert!(summarizer.address_summary(ALICE).is_none());
    assert!(summarizer.address_summary(BOB).is_none());
}

#[test]
fn test_erc721_send_and_receive_cancels() {
    let logs = vec![erc721_transfer(NFT, ALICE, BOB, 7), erc721_transfer(NFT, BOB, ALICE, 7)];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(NFT), logs)))]);
    assert!(summarizer.address_summary(ALICE).is_none());
    assert!(summarizer.address_summary(BOB).is_none());

    // spread over two transactions of the same batch
    let first = enrich(simulated(ALICE, Some(NFT), vec![erc721_transfer(NFT, ALICE, BOB, 8)]));
    let second = enrich(simulated(BOB, Some(NFT), vec![erc721_transfer(NFT, BOB, ALICE, 8)]));
    let summarizer = LogSummarizer::new(&[Some(first), None, Some(second)]);
    assert!(summarizer.address_summary(ALICE).is_none());
}

#[test]
fn test_erc1155_returned_ids_are_pruned() {
    let logs = vec![
        transfer_batch(MULTI, ROUTER, ALICE, BOB, &[1, 2], &[5, 5]),
        transfer_batch(MULTI, ROUTER, BOB, ALICE, &[1], &[5]),
    ];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(MULTI), logs)))]);
    let alice = summarizer.address_summary(ALICE).unwrap();
    assert_eq!(alice.erc1155_balances[&MULTI].len(), 1);
    assert_eq!(alice.erc1155_balances[&MULTI][&U256::from(2)], delta(-5));

    // everything comes back, no empty token map is left behind
    let logs = vec![
        transfer_batch(MULTI, ROUTER, ALICE, BOB, &[1, 2], &[5, 5]),
        transfer_batch(MULTI, ROUTER, BOB, ALICE, &[2, 1], &[5, 5]),
    ];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(MULTI), logs)))]);
    assert!(summarizer.address_summary(ALICE).map_or(true, |summary| summary.erc1155_balances.is_empty()));
    assert!(summarizer.address_summary(BOB).map_or(true, |summary| summary.erc1155_balances.is_empty()));
}

#[test]
fn test_erc721_transfer_clears_previous_approval() {
    let logs = vec![erc721_approval(NFT, ALICE, ROUTER, 3), erc721_transfer(NFT, ALICE, BOB, 3)];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(NFT), logs)))]);
    let alice = summarizer.address_summary(ALICE).unwrap();
    assert!(alice.erc721_approvals.is_empty());
    assert!(!alice.erc721_balances[&NFT][&U256::from(3)]);
}

#[test]
fn test_gas_fee_is_debited_from_sender() {
    let mut transaction = simulated(ALICE, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, ALICE, BOB, 100)]);
    transaction.gas_spent = 21_000;
    transaction.realized_gas_price = U256::from(10);
    let summarizer = LogSummarizer::new(&[Some(enrich(transaction))]);

    assert_eq!(erc20_delta(&summarizer, ALICE, NATIVE_TOKEN_ADDRESS), Some(delta(-210_000)));
    // token deltas still conserve
    let alice = erc20_delta(&summarizer, ALICE, TOKEN_A).unwrap();
    let bob = erc20_delta(&summarizer, BOB, TOKEN_A).unwrap();
    assert_eq!(alice + bob, I256::ZERO);
}

#[test]
fn test_approvals_are_recorded_per_owner() {
    let logs = vec![
        erc20_approval(TOKEN_A, ALICE, ROUTER, 50),
        approval_for_all(NFT, ALICE, ROUTER, true),
        approval_for_all(MULTI, ALICE, ROUTER, true),
        approval_for_all(MULTI, ALICE, ROUTER, false),
    ];
    let summarizer = LogSummarizer::new(&[Some(enrich(simulated(ALICE, Some(ROUTER), logs)))]);
    let outcome = summarizer.get_summary_for_addr(ALICE, &metadata(), &[], &[]).unwrap().unwrap();

    assert_eq!(outcome.erc20_token_approval_changes.len(), 1);
    assert_eq!(outcome.erc20_token_approval_changes[0].approvals[0].spender.address, ROUTER);
    assert_eq!(outcome.erc20_token_approval_changes[0].approvals[0].amount, U256::from(50));

    let operators = &outcome.erc721_or_1155_operator_approvals;
    assert_eq!(operators.len(), 2);
    let nft = operators.iter().find(|change| change.token.address == NFT).unwrap();
    assert_eq!(nft.operator.as_ref().map(|operator| operator.address), Some(ROUTER));
    let multi = operators.iter().find(|change| change.token.address == MULTI).unwrap();
    assert!(multi.operator.is_none());
}

#[test]
fn test_weth_deposit_and_withdrawal() {
    let mut deposit = simulated(ALICE, Some(TOKEN_A), vec![weth_deposit(TOKEN_A, ALICE, 5)]);
    deposit.transaction.value = U256::from(5);
    let withdrawal = simulated(ALICE, Some(TOKEN_A), vec![weth_withdrawal(TOKEN_A, ALICE, 2)]);
    let deposit = enrich(deposit);
    let withdrawal = enrich(withdrawal);

    assert!(quarantine_reasons(&withdrawal).is_empty());
    assert!(quarantine_reasons(&deposit).is_empty());

    let summarizer = LogSummarizer::new(&[Some(deposit), Some(withdrawal)]);
    assert_eq!(erc20_delta(&summarizer, ALICE, TOKEN_A), Some(delta(3)));
    assert_eq!(erc20_delta(&summarizer, ALICE, NATIVE_TOKEN_ADDRESS), Some(delta(-5)));
}

#[test]
fn test_quarantine_flags() {
    let lost_tokens = enrich(simulated(ALICE, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, ALICE, TOKEN_B, 1)]));
    assert_eq!(
        quarantine_reasons(&lost_tokens),
        vec![QuarantineReason::TokenSentToTokenContract { token: TOKEN_B }]
    );

    let mut ether = simulated(ALICE, Some(TOKEN_B), Vec::new());
    ether.transaction.value = U256::from(1);
    assert_eq!(quarantine_reasons(&enrich(ether)), vec![QuarantineReason::EtherSentToTokenContract]);

    let harmless = enrich(simulated(ALICE, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, ALICE, BOB, 1)]));
    assert!(quarantine_reasons(&harmless).is_empty());
}

#[test]
fn test_visualize_simulation() {
    let mut first = simulated(ALICE, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, ALICE, BOB, 40)]);
    first.gas_spent = 21_000;
    first.realized_gas_price = U256::from(1);
    let second = simulated(BOB, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, BOB, ALICE, 15)]);
    let state = SimulationState {
        block_number: 100,
        block_timestamp: 1_700_000_000,
        chain_id: 1,
        simulated_transactions: vec![Some(first), None, Some(second)],
    };

    let addresses = referenced_addresses(&state);
    for address in [ALICE, BOB, TOKEN_A] {
        assert!(addresses.contains(&address));
    }
    assert!(!addresses.contains(&NATIVE_TOKEN_ADDRESS));

    // the native token entry comes from the configuration
    let inputs = VisualizationInputs { metadata: metadata_without_native(), ..Default::default() };
    let visualized = visualize_simulation(state, inputs, &InterceptorConfig::default()).unwrap();

    assert_eq!(visualized.block_number, 100);
    assert_eq!(visualized.transactions.len(), 3);
    assert!(visualized.transactions[1].is_none());

    let first = visualized.transactions[0].as_ref().unwrap();
    assert_eq!(first.identification.title, "AAA Transfer");
    assert!(!first.is_quarantined());

    let alice = visualized.batch_summary.iter().find(|outcome| outcome.summary_for.address == ALICE).unwrap();
    let token_a = alice.erc20_token_balance_changes.iter().find(|change| change.token.address == TOKEN_A).unwrap();
    assert_eq!(token_a.change, delta(-25));
    let native = alice
        .erc20_token_balance_changes
        .iter()
        .find(|change| change.token.address == NATIVE_TOKEN_ADDRESS)
        .unwrap();
    assert_eq!(native.change, delta(-21_000));
    assert_eq!(native.token.symbol(), "ETH");
}

#[test]
fn test_visualize_reports_unresolved_address() {
    let stranger = Address::repeat_byte(0x42);
    let state = SimulationState {
        simulated_transactions: vec![Some(simulated(stranger, Some(TOKEN_A), Vec::new()))],
        ..Default::default()
    };
    let inputs = VisualizationInputs { metadata: metadata(), ..Default::default() };
    let err = visualize_simulation(state, inputs, &InterceptorConfig::default()).unwrap_err();
    assert_eq!(err, MetadataError::MissingAddress(stranger));
}
