//! Cancellable simulation refresh
//!
//! A refresh re-simulates the stack, resolves metadata and commits a new
//! visualization. Starting a refresh cancels the one in flight, and a cancelled run
//! never commits. Connectivity failures keep the last good visualization, any other
//! failure is committed as [`SimulationStatus::Failed`].

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::state::{InterceptorState, SimulationStatus, UpdateOutcome};
use crate::{
    errors::InterceptorError,
    events::EnsContext,
    traits::{AddressMetadataProvider, EthereumClientService},
    visualize::{referenced_addresses, visualize_simulation, VisualizationInputs, VisualizedSimulation},
};

/// How a refresh ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New results were committed under this id
    Committed(u64),
    /// A newer run committed first
    Stale,
    /// Aborted by a newer refresh or an explicit invalidate
    Cancelled,
    /// The network failed, the previous results stay in place
    KeptLastGood,
    /// The failure was committed as the new status
    Failed,
}

/// Drives simulation refreshes against the external collaborators
pub struct SimulationRefresher<C, M> {
    client: C,
    metadata: M,
    state: Arc<InterceptorState>,
    in_flight: Mutex<CancellationToken>,
}

impl<C, M> SimulationRefresher<C, M>
where
    C: EthereumClientService,
    M: AddressMetadataProvider,
{
    pub fn new(client: C, metadata: M, state: Arc<InterceptorState>) -> Self {
        Self { client, metadata, state, in_flight: Mutex::new(CancellationToken::new()) }
    }

    pub fn state(&self) -> &Arc<InterceptorState> {
        &self.state
    }

    /// Aborts the refresh in flight, if any
    pub async fn invalidate(&self) {
        self.in_flight.lock().await.cancel();
    }

    async fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = std::mem::replace(&mut *self.in_flight.lock().await, token.clone());
        previous.cancel();
        token
    }

    /// Entry point for new block notifications
    pub async fn on_new_block(&self, block_number: u64) -> RefreshOutcome {
        debug!(block_number, "new block, refreshing simulation");
        self.refresh().await
    }

    /// Re-simulates the stack and commits the visualization
    pub async fn refresh(&self) -> RefreshOutcome {
        let token = self.begin().await;
        let results = &self.state.results;
        let simulation_id = results.next_simulation_id();

        results.update_with(simulation_id, |stored| stored.status = SimulationStatus::Updating).await;

        let visualized = self.visualize().await;
        if token.is_cancelled() {
            debug!(simulation_id, "simulation refresh aborted");
            // rejected as stale when a newer run already took over
            results.update_with(simulation_id, |stored| stored.status = stored.settled_status()).await;
            return RefreshOutcome::Cancelled;
        }

        match visualized {
            Ok(visualized) => {
                let outcome = results
                    .update_with(simulation_id, |stored| {
                        stored.status = SimulationStatus::Done;
                        stored.visualized = Some(visualized);
                        stored.error = None;
                    })
                    .await;
                match outcome {
                    UpdateOutcome::Applied => RefreshOutcome::Committed(simulation_id),
                    UpdateOutcome::Stale => RefreshOutcome::Stale,
                }
            }
            Err(err) if err.is_connectivity() => {
                warn!(simulation_id, error = %err, "simulation refresh failed to reach the network, keeping last results");
                results.update_with(simulation_id, |stored| stored.status = stored.settled_status()).await;
                RefreshOutcome::KeptLastGood
            }
            Err(err) => {
                error!(simulation_id, error = %err, "simulation refresh failed");
                results
                    .update_with(simulation_id, |stored| {
                        stored.status = SimulationStatus::Failed;
                        stored.error = Some(err.to_string());
                    })
                    .await;
                RefreshOutcome::Failed
            }
        }
    }

    async fn visualize(&self) -> Result<VisualizedSimulation, InterceptorError> {
        let stack = self.state.simulation_stack.lock().await.clone();
        let simulation = self.client.simulate(&stack).await?;

        let mut metadata = self.metadata.resolve_addresses(&referenced_addresses(&simulation)).await?;
        metadata.extend(self.state.address_book.lock().await.entries().cloned());

        let tokens: Vec<Address> = metadata.entries().filter(|entry| entry.is_token()).map(|entry| entry.address).collect();
        let price_estimates = self.metadata.price_estimates(&tokens).await?;
        let named_token_ids = self.metadata.named_token_ids(&tokens).await?;

        // ENS token ids are named after the ENS name they represent
        let ens_context = EnsContext::from_names(named_token_ids.iter().map(|named| named.name.as_str()));
        let inputs = VisualizationInputs { metadata, ens_context, price_estimates, named_token_ids };
        Ok(visualize_simulation(simulation, inputs, &self.state.config)?)
    }
}
