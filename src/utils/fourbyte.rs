//! Human readable labels for well known function selectors
//!
//! The table is keyed by the first four bytes of `keccak256(signature)` and is
//! computed once on first use.

use alloy::primitives::keccak256;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// (signature, label) pairs for selectors the interceptor knows how to describe
const KNOWN_FUNCTIONS: &[(&str, &str)] = &[
    ("transfer(address,uint256)", "Transfer"),
    ("transferFrom(address,address,uint256)", "Transfer From"),
    ("approve(address,uint256)", "Approve"),
    ("increaseAllowance(address,uint256)", "Increase Allowance"),
    ("decreaseAllowance(address,uint256)", "Decrease Allowance"),
    ("permit(address,address,uint256,uint256,uint8,bytes32,bytes32)", "Permit"),
    ("setApprovalForAll(address,bool)", "Set Approval For All"),
    ("safeTransferFrom(address,address,uint256)", "Safe Transfer From"),
    ("safeTransferFrom(address,address,uint256,bytes)", "Safe Transfer From"),
    ("safeTransferFrom(address,address,uint256,uint256,bytes)", "Safe Transfer From"),
    ("safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)", "Safe Batch Transfer From"),
    ("deposit()", "Deposit"),
    ("withdraw(uint256)", "Withdraw"),
    ("mint(address,uint256)", "Mint"),
    ("mint(uint256)", "Mint"),
    ("burn(uint256)", "Burn"),
    ("claim()", "Claim"),
    ("multicall(bytes[])", "Multicall"),
    ("multicall(uint256,bytes[])", "Multicall"),
    ("execute(bytes,bytes[],uint256)", "Execute"),
    ("swapExactTokensForTokens(uint256,uint256,address[],address,uint256)", "Swap"),
    ("swapTokensForExactTokens(uint256,uint256,address[],address,uint256)", "Swap"),
    ("swapExactETHForTokens(uint256,address[],address,uint256)", "Swap"),
    ("swapETHForExactTokens(uint256,address[],address,uint256)", "Swap"),
    ("swapExactTokensForETH(uint256,uint256,address[],address,uint256)", "Swap"),
    ("swapTokensForExactETH(uint256,uint256,address[],address,uint256)", "Swap"),
    ("addLiquidity(address,address,uint256,uint256,uint256,uint256,address,uint256)", "Add Liquidity"),
    ("addLiquidityETH(address,uint256,uint256,uint256,address,uint256)", "Add Liquidity"),
    ("removeLiquidity(address,address,uint256,uint256,uint256,address,uint256)", "Remove Liquidity"),
    ("removeLiquidityETH(address,uint256,uint256,uint256,address,uint256)", "Remove Liquidity"),
    ("castVote(uint256,uint8)", "Vote"),
    ("castVoteWithReason(uint256,uint8,string)", "Vote"),
    ("delegate(address)", "Delegate Votes"),
    ("setText(bytes32,string,string)", "Set ENS Text Record"),
    ("setAddr(bytes32,address)", "Set ENS Address"),
    ("setName(string)", "Set ENS Reverse Name"),
    ("register(string,address,uint256,bytes32,address,bytes[],bool,uint16)", "Register ENS Name"),
    ("renew(string,uint256)", "Renew ENS Name"),
];

static FUNCTION_LABELS: Lazy<HashMap<[u8; 4], &'static str>> = Lazy::new(|| {
    KNOWN_FUNCTIONS
        .iter()
        .map(|(signature, label)| {
            let hash = keccak256(signature.as_bytes());
            let mut selector = [0u8; 4];
            selector.copy_from_slice(&hash[..4]);
            (selector, *label)
        })
        .collect()
});

/// Looks up the label of a function selector
pub fn function_label(selector: [u8; 4]) -> Option<&'static str> {
    FUNCTION_LABELS.get(&selector).copied()
}
