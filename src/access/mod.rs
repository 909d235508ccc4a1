//! Website access control
//!
//! Decides per website origin, and optionally per address, whether a request may
//! proceed, and keeps live website connections in sync with those decisions.

pub mod connections;
pub mod types;
pub mod verify;

pub use connections::{AccessDecision, ConnectionManager, SocketId, WebsiteConnection, WebsiteNotification};
pub use types::*;
pub use verify::{get_associated_addresses, lookup_access, verify_access};
