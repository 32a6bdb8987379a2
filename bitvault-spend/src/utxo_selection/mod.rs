//! UTXO selection module
//!
//! This module turns a list of candidate outputs into a funded spend plan.
//!
//! # Module Structure
//!
//! - `types.rs` - [`UnspentOutput`], [`SelectionResult`] and [`SelectionCondition`]
//! - `filters.rs` - confirmation floor and pending-transaction lock filters
//! - `selector.rs` - the greedy largest-first selector state machine
//! - `builder.rs` - result assembly and post-condition checks
//!
//! # Pipeline
//!
//! ```text
//! outputs ─► filter_by_confirmations ─► filter_locked ─► CoinSelector ─► SelectionResultBuilder
//!                                                           │
//!                                                      estimate_fee (every step)
//! ```
//!
//! Everything in this module is pure and synchronous: it never mutates its
//! inputs and may be called from any number of threads at once. Fetching
//! outputs and lock sets is the caller's job (see [`crate::planner`]).
//!
//! # Typical Usage
//!
//! ```
//! use bitvault_spend::fee_estimation::FeeRate;
//! use bitvault_spend::utxo_selection::{eligible_outputs, select_coins, SelectionCondition, UnspentOutput};
//! use bitcoin::{Amount, OutPoint, Txid};
//! use std::collections::HashSet;
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("0000000000000000000000000000000000000000000000000000000000000001").unwrap();
//! let outputs = vec![
//!     UnspentOutput::new(OutPoint::new(txid, 0), Amount::from_sat(60_000), 5).unwrap(),
//!     UnspentOutput::new(OutPoint::new(txid, 1), Amount::from_sat(40_000), 5).unwrap(),
//! ];
//!
//! let candidates = eligible_outputs(&outputs, 6, &HashSet::new());
//! let result = select_coins(&candidates, Amount::from_sat(50_000), FeeRate::MIN_RELAY).unwrap();
//!
//! assert_eq!(result.condition(), SelectionCondition::NoEligibleOutputs);
//! ```

pub mod builder;
pub mod filters;
pub mod selector;
pub mod types;

pub use builder::{SelectionResultBuilder, SelectionTerminal};
pub use filters::{eligible_outputs, filter_by_confirmations, filter_locked};
pub use selector::{select_coins, CoinSelector, SelectionState};
pub use types::{SelectionCondition, SelectionResult, UnspentOutput, MAX_MONEY, UNCONFIRMED_HEIGHT};
