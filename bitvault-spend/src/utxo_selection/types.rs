//! Core types for UTXO selection
//!
//! - [`UnspentOutput`]: an immutable, spendable output reported by a provider
//! - [`SelectionResult`]: the value object produced by the coin selector
//! - [`SelectionCondition`]: the user-facing outcome of a selection
//!
//! # Example
//!
//! ```
//! use bitvault_spend::utxo_selection::types::UnspentOutput;
//! use bitcoin::{Amount, OutPoint, Txid};
//! use std::str::FromStr;
//!
//! let output = UnspentOutput::new(
//!     OutPoint::new(
//!         Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap(),
//!         0,
//!     ),
//!     Amount::from_sat(10_000),
//!     812_345, // confirmation height
//! )
//! .unwrap();
//!
//! assert!(output.is_confirmed());
//! ```

use crate::error::{SpendError, SpendResult};
use crate::fee_estimation::FeeRate;
use bitcoin::{Amount, OutPoint, Txid};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Total supply cap; no single output can be worth more
pub const MAX_MONEY: Amount = Amount::from_sat(21_000_000 * 100_000_000);

/// Height sentinel for outputs that are still in the mempool
pub const UNCONFIRMED_HEIGHT: u32 = 0;

/// An unspent transaction output as reported by a UTXO provider
///
/// Instances are immutable once created: the fields are private and only
/// exposed through getters, so an output can be shared between selections
/// without anyone altering its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "UnspentOutputRecord", into = "UnspentOutputRecord")]
pub struct UnspentOutput {
    outpoint: OutPoint,
    value: Amount,
    confirmation_height: u32,
}

impl UnspentOutput {
    /// Create a new unspent output
    ///
    /// # Arguments
    /// * `outpoint` - The transaction outpoint (txid and vout)
    /// * `value` - Value of the output, must be non-zero and at most [`MAX_MONEY`]
    /// * `confirmation_height` - Block height of the confirming block, `0` if unconfirmed
    pub fn new(outpoint: OutPoint, value: Amount, confirmation_height: u32) -> SpendResult<Self> {
        if value == Amount::ZERO {
            return Err(SpendError::InvalidArgument(format!(
                "output {} has zero value",
                outpoint
            )));
        }
        if value > MAX_MONEY {
            return Err(SpendError::InvalidArgument(format!(
                "output {} value {} exceeds the maximum supply",
                outpoint,
                value.to_sat()
            )));
        }

        Ok(Self {
            outpoint,
            value,
            confirmation_height,
        })
    }

    /// Reference to the transaction output
    pub fn outpoint(&self) -> OutPoint {
        self.outpoint
    }

    /// Value of this output
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Height of the confirming block (`0` when unconfirmed)
    pub fn confirmation_height(&self) -> u32 {
        self.confirmation_height
    }

    /// Whether this output has been mined
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_height != UNCONFIRMED_HEIGHT
    }
}

impl fmt::Display for UnspentOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} sats @ {})",
            self.outpoint,
            self.value.to_sat(),
            self.confirmation_height
        )
    }
}

/// Flat serialized form of [`UnspentOutput`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UnspentOutputRecord {
    txid: String,
    vout: u32,
    value_sats: u64,
    confirmation_height: u32,
}

impl From<UnspentOutput> for UnspentOutputRecord {
    fn from(output: UnspentOutput) -> Self {
        Self {
            txid: output.outpoint.txid.to_string(),
            vout: output.outpoint.vout,
            value_sats: output.value.to_sat(),
            confirmation_height: output.confirmation_height,
        }
    }
}

impl TryFrom<UnspentOutputRecord> for UnspentOutput {
    type Error = SpendError;

    fn try_from(record: UnspentOutputRecord) -> Result<Self, Self::Error> {
        let txid = Txid::from_str(&record.txid).map_err(|e| {
            SpendError::InvalidArgument(format!("invalid txid {}: {}", record.txid, e))
        })?;

        UnspentOutput::new(
            OutPoint::new(txid, record.vout),
            Amount::from_sat(record.value_sats),
            record.confirmation_height,
        )
    }
}

/// User-facing outcome of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCondition {
    /// A covering selection was found
    Sufficient,
    /// Candidates existed but could not cover amount plus fee
    InsufficientFunds,
    /// Nothing confirmed and unlocked was available to spend
    NoEligibleOutputs,
}

impl SelectionCondition {
    /// Validation message to show the user
    pub fn user_message(&self) -> &'static str {
        match self {
            SelectionCondition::Sufficient => "Ready to send",
            SelectionCondition::InsufficientFunds => {
                "Not enough balance to cover the amount plus network fee"
            }
            SelectionCondition::NoEligibleOutputs => {
                "Nothing to spend yet: funds are unconfirmed or held by a pending transaction"
            }
        }
    }
}

/// Result of a coin selection
///
/// Holds no reference to the UTXO set it was computed from and cannot be
/// mutated after construction. When `sufficient_funds()` is true,
/// `total_input_value == requested_amount + fee_amount + change_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub(crate) selected_outputs: Vec<UnspentOutput>,
    pub(crate) total_input_value: Amount,
    pub(crate) fee_amount: Amount,
    pub(crate) change_amount: Amount,
    pub(crate) sufficient_funds: bool,
    pub(crate) requested_amount: Amount,
    pub(crate) fee_rate: FeeRate,
    pub(crate) candidate_count: usize,
}

impl SelectionResult {
    /// Selected outputs in selection order (descending value)
    pub fn selected_outputs(&self) -> &[UnspentOutput] {
        &self.selected_outputs
    }

    /// Sum of the selected outputs' values
    pub fn total_input_value(&self) -> Amount {
        self.total_input_value
    }

    /// Fee implied by the selected input count and two outputs
    pub fn fee_amount(&self) -> Amount {
        self.fee_amount
    }

    /// Change returned to the wallet; zero when funds are insufficient
    pub fn change_amount(&self) -> Amount {
        self.change_amount
    }

    /// Whether a covering selection was found
    pub fn sufficient_funds(&self) -> bool {
        self.sufficient_funds
    }

    /// Amount the caller asked to send
    pub fn requested_amount(&self) -> Amount {
        self.requested_amount
    }

    /// Fee rate the selection was computed with
    pub fn fee_rate(&self) -> FeeRate {
        self.fee_rate
    }

    /// Number of eligible candidates handed to the selector
    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Outpoints of the selected outputs, in selection order
    pub fn selected_outpoints(&self) -> Vec<OutPoint> {
        self.selected_outputs.iter().map(UnspentOutput::outpoint).collect()
    }

    /// Classify the outcome for validation layers
    pub fn condition(&self) -> SelectionCondition {
        if self.sufficient_funds {
            SelectionCondition::Sufficient
        } else if self.candidate_count == 0 {
            SelectionCondition::NoEligibleOutputs
        } else {
            SelectionCondition::InsufficientFunds
        }
    }

    /// How much more value would have been needed to cover amount plus fee
    ///
    /// Zero for sufficient results.
    pub fn shortfall(&self) -> Amount {
        if self.sufficient_funds {
            return Amount::ZERO;
        }
        let required = self
            .requested_amount
            .to_sat()
            .saturating_add(self.fee_amount.to_sat());
        Amount::from_sat(required.saturating_sub(self.total_input_value.to_sat()))
    }
}
