//! Fee estimation for single-signature segwit transactions
//!
//! The planner sizes transactions with a fixed model calibrated for
//! P2WPKH inputs and outputs:
//!
//! | component           | vbytes |
//! |---------------------|--------|
//! | version, locktime, counts | 10 |
//! | each input          | 68     |
//! | each output         | 31     |
//!
//! # Fee rate unit
//!
//! [`FeeRate`] is always expressed in **satoshis per 1000 virtual bytes**
//! (sat/kvB), and the fee is `floor(vsize * rate / 1000)`. Use
//! [`FeeRate::from_sat_per_vb`] when starting from the more familiar sat/vB
//! figure.
//!
//! ```
//! use bitvault_spend::fee_estimation::{estimate_fee, FeeRate};
//!
//! // 1 input, 2 outputs = 140 vbytes; at 5 sat/vB that is 700 sats
//! let fee = estimate_fee(1, 2, FeeRate::from_sat_per_vb(5));
//! assert_eq!(fee.to_sat(), 700);
//! ```

use bitcoin::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed transaction overhead (version, locktime, input/output counts)
pub const BASE_TX_VSIZE: u64 = 10;

/// Virtual size of one P2WPKH input
pub const INPUT_VSIZE: u64 = 68;

/// Virtual size of one P2WPKH output
pub const OUTPUT_VSIZE: u64 = 31;

/// Outputs assumed while selecting: destination plus change
pub const SELECTION_OUTPUT_COUNT: usize = 2;

/// Divisor converting sat/kvB times vbytes into satoshis
const VBYTES_PER_KVB: u128 = 1000;

/// Fee rate in satoshis per 1000 virtual bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeRate(u64);

impl FeeRate {
    /// Smallest rate relayed by default policy nodes (1 sat/vB)
    pub const MIN_RELAY: FeeRate = FeeRate(1000);

    /// Create a fee rate from satoshis per 1000 virtual bytes
    pub const fn from_sat_per_kvb(sat_per_kvb: u64) -> Self {
        FeeRate(sat_per_kvb)
    }

    /// Create a fee rate from satoshis per virtual byte
    pub const fn from_sat_per_vb(sat_per_vb: u64) -> Self {
        FeeRate(sat_per_vb.saturating_mul(1000))
    }

    /// The rate in satoshis per 1000 virtual bytes
    pub const fn to_sat_per_kvb(self) -> u64 {
        self.0
    }

    /// Whether this rate produces meaningful estimates
    pub const fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for FeeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sat/kvB", self.0)
    }
}

/// Estimated virtual size of a transaction with the given shape
///
/// Saturates at `u64::MAX` rather than wrapping.
pub fn estimate_vsize(input_count: usize, output_count: usize) -> u64 {
    let vsize = BASE_TX_VSIZE as u128
        + input_count as u128 * INPUT_VSIZE as u128
        + output_count as u128 * OUTPUT_VSIZE as u128;
    u64::try_from(vsize).unwrap_or(u64::MAX)
}

/// Estimate the fee for a transaction with the given input and output counts
///
/// Computes `floor(vsize * fee_rate / 1000)`. The product is formed in 128-bit
/// arithmetic and the result saturates at `u64::MAX` sats, so the estimate
/// is non-decreasing in both counts and never wraps.
pub fn estimate_fee(input_count: usize, output_count: usize, fee_rate: FeeRate) -> Amount {
    let vsize = estimate_vsize(input_count, output_count) as u128;
    let fee = vsize * fee_rate.to_sat_per_kvb() as u128 / VBYTES_PER_KVB;
    Amount::from_sat(u64::try_from(fee).unwrap_or(u64::MAX))
}
