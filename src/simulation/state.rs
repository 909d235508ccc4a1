//! Shared interceptor state
//!
//! Each logical resource sits behind its own lock so that handlers touching
//! unrelated resources never wait on each other. Simulation results additionally
//! carry a `simulation_id`, and writes older than the stored one are dropped.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{
    access::{AccessSettings, AccessStatus},
    address_book::AddressMetadata,
    config::InterceptorConfig,
    types::{InterceptorTransaction, Website},
    visualize::VisualizedSimulation,
};

const RESULTS_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimulationStatus {
    #[default]
    Done,
    Updating,
    Failed,
}

/// Latest visualization together with its bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResults {
    pub simulation_id: u64,
    pub status: SimulationStatus,
    /// Last successfully committed visualization
    pub visualized: Option<VisualizedSimulation>,
    /// Reason of the last failure while `status` is `Failed`
    pub error: Option<String>,
}

impl SimulationResults {
    /// Status of the last run that finished, ignoring a run still in flight
    ///
    /// Only a failed commit stores an error, and every successful commit clears it.
    pub fn settled_status(&self) -> SimulationStatus {
        if self.error.is_some() {
            SimulationStatus::Failed
        } else {
            SimulationStatus::Done
        }
    }
}

/// Result of a write to [`SimulationResultsStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied,
    /// The write carried an id older than the stored one and was dropped
    Stale,
}

/// Simulation results with stale-write rejection and change broadcast
pub struct SimulationResultsStore {
    results: Mutex<SimulationResults>,
    next_id: AtomicU64,
    updates: broadcast::Sender<SimulationResults>,
}

impl Default for SimulationResultsStore {
    fn default() -> Self {
        let (updates, _) = broadcast::channel(RESULTS_CHANNEL_CAPACITY);
        Self { results: Mutex::new(SimulationResults::default()), next_id: AtomicU64::new(1), updates }
    }
}

impl SimulationResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the id of a new simulation run, strictly increasing
    pub fn next_simulation_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn current(&self) -> SimulationResults {
        self.results.lock().await.clone()
    }

    /// Receives every applied update
    pub fn subscribe(&self) -> broadcast::Receiver<SimulationResults> {
        self.updates.subscribe()
    }

    /// Applies `update` on behalf of run `simulation_id`
    ///
    /// Runs older than the stored id leave the results untouched. An applied update
    /// stores `simulation_id` and is broadcast to subscribers.
    pub async fn update_with(&self, simulation_id: u64, update: impl FnOnce(&mut SimulationResults)) -> UpdateOutcome {
        let mut results = self.results.lock().await;
        if simulation_id < results.simulation_id {
            debug!(simulation_id, stored = results.simulation_id, "dropping stale simulation update");
            return UpdateOutcome::Stale;
        }
        update(&mut results);
        results.simulation_id = simulation_id;
        // no subscribers is fine
        let _ = self.updates.send(results.clone());
        UpdateOutcome::Applied
    }

    /// Replaces the results with `results`, unless they are stale
    pub async fn update(&self, results: SimulationResults) -> UpdateOutcome {
        self.update_with(results.simulation_id, |stored| *stored = results).await
    }
}

/// What the extension knows about one browser tab
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    pub website: Option<Website>,
    pub access_status: Option<AccessStatus>,
}

/// State shared by every message handler
pub struct InterceptorState {
    pub config: InterceptorConfig,
    pub settings: Mutex<AccessSettings>,
    /// Transactions simulated on top of the latest block, in submission order
    pub simulation_stack: Mutex<Vec<(InterceptorTransaction, Website)>>,
    /// Entries the user named, they win over resolved metadata
    pub address_book: Mutex<AddressMetadata>,
    pub tabs: Mutex<HashMap<u64, TabState>>,
    pub results: SimulationResultsStore,
}

impl InterceptorState {
    pub fn new(config: InterceptorConfig, settings: AccessSettings) -> Self {
        Self {
            config,
            settings: Mutex::new(settings),
            simulation_stack: Mutex::new(Vec::new()),
            address_book: Mutex::new(AddressMetadata::new()),
            tabs: Mutex::new(HashMap::new()),
            results: SimulationResultsStore::new(),
        }
    }

    /// Runs `update` on the settings and returns a snapshot of the result
    pub async fn update_settings(&self, update: impl FnOnce(&mut AccessSettings)) -> AccessSettings {
        let mut settings = self.settings.lock().await;
        update(&mut settings);
        settings.clone()
    }

    pub async fn settings(&self) -> AccessSettings {
        self.settings.lock().await.clone()
    }

    /// Appends a transaction to the simulation stack, returns the new stack length
    pub async fn push_transaction(&self, transaction: InterceptorTransaction, website: Website) -> usize {
        let mut stack = self.simulation_stack.lock().await;
        stack.push((transaction, website));
        stack.len()
    }

    /// Removes the transaction at `index`, if any
    pub async fn remove_transaction(&self, index: usize) -> Option<(InterceptorTransaction, Website)> {
        let mut stack = self.simulation_stack.lock().await;
        (index < stack.len()).then(|| stack.remove(index))
    }

    pub async fn clear_simulation_stack(&self) {
        self.simulation_stack.lock().await.clear();
    }

    pub async fn update_tab(&self, tab_id: u64, update: impl FnOnce(&mut TabState)) {
        update(self.tabs.lock().await.entry(tab_id).or_default());
    }

    pub async fn remove_tab(&self, tab_id: u64) -> Option<TabState> {
        self.tabs.lock().await.remove(&tab_id)
    }
}
