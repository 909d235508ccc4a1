//! ENS hashing
//!
//! Implements EIP-137 `namehash` and the `labelhash` used by the registrar,
//! so that hash-reversal tables can be built from names the user already knows.

use alloy::primitives::{keccak256, B256};

/// keccak256 of a single label, e.g. `labelhash("vitalik")`
pub fn labelhash(label: &str) -> B256 {
    keccak256(label.as_bytes())
}

/// EIP-137 namehash of a dot separated name
///
/// The empty name hashes to the zero node.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let mut buffer = [0u8; 64];
        buffer[..32].copy_from_slice(node.as_slice());
        buffer[32..].copy_from_slice(labelhash(label).as_slice());
        node = keccak256(buffer);
    }
    node
}
