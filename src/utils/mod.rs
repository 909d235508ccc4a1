//! Utility functions shared by the visualization pipeline
//!
//! # Modules
//!
//! - [`fourbyte`]: human readable labels for well known function selectors
//! - [`ens_utils`]: ENS `namehash`/`labelhash` computation
//! - [`error_utils`]: revert reason decoding (`Error(string)`, `Panic(uint256)`)
//! - [`trace_utils`]: call tree walks (native transfers, error origin)
//! - [`amount_utils`]: signed delta arithmetic over token amounts

/// Function selector labels
pub mod fourbyte;

/// ENS hashing utilities
pub mod ens_utils;

/// Error parsing utilities
pub mod error_utils;

/// Call trace utilities
pub mod trace_utils;

/// Signed amount utilities
pub mod amount_utils;
