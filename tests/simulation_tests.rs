mod common;

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use alloy::primitives::Address;
use async_trait::async_trait;
use common::*;
use interceptor_core::{
    access::AccessSettings,
    address_book::AddressMetadata,
    config::InterceptorConfig,
    errors::ClientError,
    simulation::{InterceptorState, RefreshOutcome, SimulationRefresher, SimulationStatus},
    traits::{AddressMetadataProvider, EthereumClientService},
    types::{InterceptorTransaction, SimulationState, Website},
};
use tokio::sync::Notify;

struct Step {
    result: Result<SimulationState, ClientError>,
    entered: Option<Arc<Notify>>,
    release: Option<Arc<Notify>>,
}

impl Step {
    fn ok(state: SimulationState) -> Self {
        Self { result: Ok(state), entered: None, release: None }
    }

    fn err(err: ClientError) -> Self {
        Self { result: Err(err), entered: None, release: None }
    }

    fn gated(state: SimulationState, entered: &Arc<Notify>, release: &Arc<Notify>) -> Self {
        Self { result: Ok(state), entered: Some(entered.clone()), release: Some(release.clone()) }
    }
}

#[derive(Default)]
struct ScriptedClient {
    script: Mutex<VecDeque<Step>>,
}

impl ScriptedClient {
    fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self { script: Mutex::new(steps.into_iter().collect()) }
    }
}

#[async_trait]
impl EthereumClientService for ScriptedClient {
    async fn block_number(&self) -> Result<u64, ClientError> {
        Ok(100)
    }

    async fn chain_id(&self) -> Result<u64, ClientError> {
        Ok(1)
    }

    async fn simulate(&self, _transactions: &[(InterceptorTransaction, Website)]) -> Result<SimulationState, ClientError> {
        let step = self.script.lock().unwrap().pop_front().expect("no scripted simulation left");
        if let Some(entered) = step.entered {
            entered.notify_one();
        }
        if let Some(release) = step.release {
            release.notified().await;
        }
        step.result
    }
}

struct FixtureMetadata;

#[async_trait]
impl AddressMetadataProvider for FixtureMetadata {
    async fn resolve_addresses(&self, _addresses: &[Address]) -> Result<AddressMetadata, ClientError> {
        Ok(metadata_without_native())
    }
}

fn state_with_transfer(block_number: u64, amount: u64) -> SimulationState {
    SimulationState {
        block_number,
        block_timestamp: 1_700_000_000,
        chain_id: 1,
        simulated_transactions: vec![Some(simulated(ALICE, Some(TOKEN_A), vec![erc20_transfer(TOKEN_A, ALICE, BOB, amount)]))],
    }
}

fn refresher(steps: impl IntoIterator<Item = Step>) -> SimulationRefresher<ScriptedClient, FixtureMetadata> {
    let state = Arc::new(InterceptorState::new(InterceptorConfig::default(), AccessSettings::default()));
    SimulationRefresher::new(ScriptedClient::new(steps), FixtureMetadata, state)
}

#[tokio::test]
async fn test_refresh_commits_visualization() {
    let refresher = refresher([Step::ok(state_with_transfer(100, 10))]);
    let mut updates = refresher.state().results.subscribe();

    let outcome = refresher.refresh().await;
    let RefreshOutcome::Committed(id) = outcome else { panic!("unexpected outcome {outcome:?}") };

    let results = refresher.state().results.current().await;
    assert_eq!(results.simulation_id, id);
    assert_eq!(results.status, SimulationStatus::Done);
    let visualized = results.visualized.unwrap();
    assert_eq!(visualized.block_number, 100);
    assert_eq!(visualized.transactions[0].as_ref().unwrap().identification.title, "AAA Transfer");

    assert_eq!(updates.recv().await.unwrap().status, SimulationStatus::Updating);
    assert_eq!(updates.recv().await.unwrap().status, SimulationStatus::Done);
}

#[tokio::test]
async fn test_connectivity_failure_keeps_last_good_results() {
    let refresher = refresher([
        Step::ok(state_with_transfer(100, 10)),
        Step::err(ClientError::Connectivity("connection refused".into())),
    ]);
    assert!(matches!(refresher.refresh().await, RefreshOutcome::Committed(_)));
    assert_eq!(refresher.on_new_block(101).await, RefreshOutcome::KeptLastGood);

    let results = refresher.state().results.current().await;
    assert_eq!(results.status, SimulationStatus::Done);
    assert!(results.error.is_none());
    assert_eq!(results.visualized.unwrap().block_number, 100);
}

#[tokio::test]
async fn test_other_failures_are_committed_as_failed() {
    let refresher = refresher([
        Step::ok(state_with_transfer(100, 10)),
        Step::err(ClientError::Rpc { code: -32000, message: "header not found".into() }),
    ]);
    refresher.refresh().await;
    assert_eq!(refresher.refresh().await, RefreshOutcome::Failed);

    let results = refresher.state().results.current().await;
    assert_eq!(results.status, SimulationStatus::Failed);
    assert!(results.error.unwrap().contains("header not found"));
    // the last visualization is still there to show
    assert_eq!(results.visualized.unwrap().block_number, 100);
}

#[tokio::test]
async fn test_newer_refresh_cancels_the_one_in_flight() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let refresher = refresher([
        Step::gated(state_with_transfer(100, 10), &entered, &release),
        Step::ok(state_with_transfer(101, 20)),
    ]);

    let (first, second) = tokio::join!(refresher.refresh(), async {
        entered.notified().await;
        let outcome = refresher.refresh().await;
        release.notify_one();
        outcome
    });

    assert_eq!(first, RefreshOutcome::Cancelled);
    let RefreshOutcome::Committed(id) = second else { panic!("unexpected outcome {second:?}") };

    let results = refresher.state().results.current().await;
    assert_eq!(results.simulation_id, id);
    assert_eq!(results.status, SimulationStatus::Done);
    assert_eq!(results.visualized.unwrap().block_number, 101);
}

#[tokio::test]
async fn test_connectivity_failure_of_newer_refresh_does_not_stick_at_updating() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let refresher = refresher([
        Step::ok(state_with_transfer(100, 10)),
        Step::gated(state_with_transfer(101, 20), &entered, &release),
        Step::err(ClientError::Connectivity("connection reset".into())),
    ]);
    refresher.refresh().await;

    let (first, second) = tokio::join!(refresher.refresh(), async {
        entered.notified().await;
        let outcome = refresher.refresh().await;
        release.notify_one();
        outcome
    });
    assert_eq!(first, RefreshOutcome::Cancelled);
    assert_eq!(second, RefreshOutcome::KeptLastGood);

    let results = refresher.state().results.current().await;
    assert_eq!(results.status, SimulationStatus::Done);
    assert_eq!(results.visualized.unwrap().block_number, 100);
}

#[tokio::test]
async fn test_connectivity_failure_after_failure_keeps_failed_status() {
    let refresher = refresher([
        Step::err(ClientError::Rpc { code: -32000, message: "header not found".into() }),
        Step::err(ClientError::Connectivity("connection refused".into())),
    ]);
    assert_eq!(refresher.refresh().await, RefreshOutcome::Failed);
    assert_eq!(refresher.refresh().await, RefreshOutcome::KeptLastGood);

    let results = refresher.state().results.current().await;
    assert_eq!(results.status, SimulationStatus::Failed);
    assert!(results.error.is_some());
}

#[tokio::test]
async fn test_invalidate_leaves_committed_results_untouched() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let refresher = refresher([
        Step::ok(state_with_transfer(100, 10)),
        Step::gated(state_with_transfer(101, 20), &entered, &release),
    ]);
    refresher.refresh().await;

    let (outcome, _) = tokio::join!(refresher.refresh(), async {
        entered.notified().await;
        refresher.invalidate().await;
        release.notify_one();
    });
    assert_eq!(outcome, RefreshOutcome::Cancelled);

    let results = refresher.state().results.current().await;
    assert_eq!(results.status, SimulationStatus::Done);
    assert_eq!(results.visualized.unwrap().block_number, 100);
}

#[test]
fn test_simulation_stack_edits() {
    tokio_test::block_on(async {
        let state = InterceptorState::new(InterceptorConfig::default(), AccessSettings::default());
        let first = simulated(ALICE, Some(BOB), Vec::new());
        let second = simulated(BOB, Some(ALICE), Vec::new());

        assert_eq!(state.push_transaction(first.transaction.clone(), first.website.clone()).await, 1);
        assert_eq!(state.push_transaction(second.transaction.clone(), second.website.clone()).await, 2);
        assert!(state.remove_transaction(5).await.is_none());
        assert_eq!(state.remove_transaction(0).await.map(|(transaction, _)| transaction.from), Some(ALICE));
        assert_eq!(state.simulation_stack.lock().await.len(), 1);

        let settings = state.update_settings(|settings| settings.active_address = Some(CAROL)).await;
        assert_eq!(settings.active_address, Some(CAROL));
        assert_eq!(state.settings().await.active_address, Some(CAROL));
    });
}
