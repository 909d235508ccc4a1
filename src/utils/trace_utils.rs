//! Call trace helpers
//!
//! Walks the call tree recorded by the simulator to:
//! - Extract native value movements made by call frames
//! - Locate the frame an error originated from
//! - Detect internal (caught) failures in successful transactions

use crate::types::{CallTrace, NativeTransfer};

/// Collects every non-zero native value movement in execution order
///
/// Only frames that actually move value (`CALL`, `CALLCODE`, creations) are
/// considered, and frames that did not succeed are skipped together with their
/// subtree since their state changes were rolled back.
pub fn collect_native_transfers(root: &CallTrace) -> Vec<NativeTransfer> {
    fn walk(trace: &CallTrace, transfers: &mut Vec<NativeTransfer>) {
        if !trace.status.is_success() {
            return;
        }
        if !trace.value.is_zero() && trace.kind.transfers_value() {
            transfers.push(NativeTransfer { from: trace.from, to: trace.to, value: trace.value });
        }
        for subtrace in &trace.subtraces {
            walk(subtrace, transfers);
        }
    }

    let mut transfers = Vec::new();
    walk(root, &mut transfers);
    transfers
}

/// Performs depth-first search to find the source of an error
///
/// Traverses the call tree to find the deepest failed call that is marked
/// as the origin of the error, rather than where it was propagated to.
///
/// # Returns
/// * `Some(&CallTrace)` - Reference to the trace where the error originated
/// * `None` - No errors found in the call tree
pub fn find_error_trace(root: &CallTrace) -> Option<&CallTrace> {
    fn find_error_recursive(trace: &CallTrace) -> Option<&CallTrace> {
        let mut last_error = None;
        for subtrace in &trace.subtraces {
            if !subtrace.status.is_success() {
                if let Some(error) = find_error_recursive(subtrace) {
                    last_error = Some(error);
                }
            }
        }

        if trace.error_origin {
            Some(trace)
        } else {
            last_error
        }
    }

    if root.status.is_success() {
        return None;
    }
    find_error_recursive(root)
}

/// Whether any frame below the root failed while the root itself succeeded
pub fn has_internal_errors(root: &CallTrace) -> bool {
    fn any_failed(trace: &CallTrace) -> bool {
        trace
            .subtraces
            .iter()
            .any(|subtrace| subtrace.error_origin || !subtrace.status.is_success() || any_failed(subtrace))
    }
    root.status.is_success() && any_failed(root)
}
