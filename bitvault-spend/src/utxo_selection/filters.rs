//! Eligibility filters applied before coin selection
//!
//! Both filters are order-preserving and never fail. They run in this order:
//! confirmation floor first, then pending-transaction locks.

use crate::utxo_selection::types::{UnspentOutput, UNCONFIRMED_HEIGHT};
use bitcoin::OutPoint;
use std::collections::HashSet;

/// Keep only outputs whose confirmation height is non-zero and at least
/// `min_confirmations`.
///
/// Height `0` means "still in the mempool" and is excluded even when
/// `min_confirmations` is `0`.
pub fn filter_by_confirmations(
    outputs: &[UnspentOutput],
    min_confirmations: u32,
) -> Vec<UnspentOutput> {
    outputs
        .iter()
        .filter(|output| {
            output.confirmation_height() != UNCONFIRMED_HEIGHT
                && output.confirmation_height() >= min_confirmations
        })
        .cloned()
        .collect()
}

/// Drop outputs already consumed by one of the wallet's pending transactions.
///
/// `locked_outpoints` must be the union over every pending transaction for
/// the address being spent from, fetched right before this call.
pub fn filter_locked(
    outputs: &[UnspentOutput],
    locked_outpoints: &HashSet<OutPoint>,
) -> Vec<UnspentOutput> {
    if locked_outpoints.is_empty() {
        return outputs.to_vec();
    }

    outputs
        .iter()
        .filter(|output| !locked_outpoints.contains(&output.outpoint()))
        .cloned()
        .collect()
}

/// Apply both filters in order
pub fn eligible_outputs(
    outputs: &[UnspentOutput],
    min_confirmations: u32,
    locked_outpoints: &HashSet<OutPoint>,
) -> Vec<UnspentOutput> {
    let confirmed = filter_by_confirmations(outputs, min_confirmations);
    filter_locked(&confirmed, locked_outpoints)
}
