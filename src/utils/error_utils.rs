//! Revert reason decoding for failed simulations
//!
//! Turns the raw output of a reverted transaction into something a user can read:
//! - `Error(string)` reverts yield their message
//! - `Panic(uint256)` reverts yield a description of the panic code
//! - Any other 4-byte selector is reported as a custom error

use alloy::sol_types::{Panic, Revert, SolError};

/// Parse the revert output of a failed transaction
///
/// # Arguments
/// * `output` - Raw revert data
///
/// # Returns
/// * `Some(String)` - Decoded reason, panic description or custom error selector
/// * `None` - If the output is too short or a known selector fails to decode
pub fn parse_custom_error(output: &[u8]) -> Option<String> {
    let selector: [u8; 4] = output.get(..4)?.try_into().ok()?;

    if selector == Revert::SELECTOR {
        return Revert::abi_decode(output).ok().map(|revert| revert.reason);
    }
    if selector == Panic::SELECTOR {
        let panic = Panic::abi_decode(output).ok()?;
        let code = panic.code.saturating_to::<u64>();
        return Some(match code {
            0x01 => "Panic: Assertion failed".to_string(),
            0x11 => "Panic: Arithmetic overflow".to_string(),
            0x12 => "Panic: Division by zero".to_string(),
            0x21 => "Panic: Invalid enum value".to_string(),
            0x22 => "Panic: Invalid storage byte array".to_string(),
            0x31 => "Panic: Pop on empty array".to_string(),
            0x32 => "Panic: Array access out of bounds".to_string(),
            0x41 => "Panic: Out of memory".to_string(),
            0x51 => "Panic: Invalid internal function".to_string(),
            code => format!("Panic: Unknown error code (0x{code:x})"),
        });
    }
    Some(format!("Custom error 0x{}", alloy::primitives::hex::encode(selector)))
}
