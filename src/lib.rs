//! # Interceptor Core
//!
//! Turns simulated Ethereum transactions into something a user can judge before
//! signing, and decides which websites may talk to the user's wallet.
//!
//! ## Core Features
//!
//! - **Event Pipeline**
//!   - Log classification (ERC20, ERC721, ERC1155, wrapped native, ENS)
//!   - Enrichment with address book metadata and a token standard guard
//!   - Net balance and approval summaries per address
//!
//! - **Transaction Analysis**
//!   - Swap identification and route reconstruction
//!   - Transaction categories with user facing phrasing
//!   - Quarantine flags for transfers that lose funds
//!
//! - **Access Control**
//!   - Per website and per address access decisions
//!   - Connection notifications in protocol order
//!   - Deduplicated access prompts
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use interceptor_core::{
//!     config::InterceptorConfig,
//!     types::SimulationState,
//!     visualize::{referenced_addresses, visualize_simulation, VisualizationInputs},
//! };
//!
//! # fn example(state: SimulationState, inputs: VisualizationInputs) -> anyhow::Result<()> {
//! let config = InterceptorConfig::default();
//!
//! // Resolve metadata for these with an `AddressMetadataProvider`
//! let _addresses = referenced_addresses(&state);
//!
//! let visualized = visualize_simulation(state, inputs, &config)?;
//! for transaction in visualized.transactions.iter().flatten() {
//!     println!("{}: {}", transaction.identification.title, transaction.identification.signing_action);
//!     if transaction.is_quarantined() {
//!         println!("  quarantined: {:?}", transaction.quarantine_reasons);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `events`: log classification, ENS decoding and enrichment
//! - `summary`: per address balance and approval summaries
//! - `swap`: swap identification and route reconstruction
//! - `transaction`: transaction categories
//! - `visualize`: assembly of the visualized simulation
//! - `access`: website access decisions and live connections
//! - `simulation`: shared state and cancellable refresh
//! - `pending`: requests waiting for the user
//! - `types`, `address_book`, `config`, `errors`, `traits`, `utils`

pub mod access;
pub mod address_book;
pub mod config;
pub mod errors;
pub mod events;
pub mod pending;
pub mod simulation;
pub mod summary;
pub mod swap;
pub mod traits;
pub mod transaction;
pub mod types;
pub mod utils;
pub mod visualize;

// Re-export commonly used items for convenience
pub use access::{get_associated_addresses, verify_access, AccessStatus, ConnectionManager};
pub use address_book::{AddressBookEntry, AddressMetadata};
pub use config::InterceptorConfig;
pub use errors::InterceptorError;
pub use events::{classify_log, enrich_event};
pub use simulation::{InterceptorState, SimulationRefresher};
pub use summary::LogSummarizer;
pub use swap::{identify_routes, identify_swap};
pub use transaction::identify_transaction;
pub use visualize::{visualize_simulation, SimulatedAndVisualizedTransaction};
