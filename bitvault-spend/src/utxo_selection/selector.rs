//! Greedy largest-first coin selector
//!
//! The selector is an explicit state machine over the candidate list:
//!
//! ```text
//!   Start ──(no candidates)──────────────────────────► Insufficient
//!     │
//!     └─(sort by value desc, stable)─► Accumulating ──(total >= amount + fee)──► Sufficient
//!                                        │    ▲
//!                                        └────┘ (add next largest, recompute fee)
//!                                        │
//!                                        └─(candidates exhausted)──────────────► Insufficient
//! ```
//!
//! After every added input the fee is recomputed for `selected.len()` inputs
//! and two outputs (destination and change), because the fee grows with the
//! number of inputs. Selection stops at the first covering prefix of the
//! sorted list; later candidates are never touched.
//!
//! Being unable to cover the amount is an ordinary terminal state, not an
//! error. The only errors are internal: arithmetic that cannot be represented
//! in 64 bits, or a failed post-condition in the result builder.
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::fee_estimation::FeeRate;
//! use bitvault_spend::utxo_selection::{select_coins, UnspentOutput};
//! use bitcoin::{Amount, OutPoint, Txid};
//! use std::str::FromStr;
//!
//! let txid = Txid::from_str("7967a5185e907a25225574544c31f7b059c1a191d65b53dcc1554d339c4f9efc").unwrap();
//! let outputs = vec![
//!     UnspentOutput::new(OutPoint::new(txid, 0), Amount::from_sat(70_000), 10).unwrap(),
//!     UnspentOutput::new(OutPoint::new(txid, 1), Amount::from_sat(50_000), 10).unwrap(),
//! ];
//!
//! let result = select_coins(&outputs, Amount::from_sat(60_000), FeeRate::from_sat_per_vb(2)).unwrap();
//! assert!(result.sufficient_funds());
//! assert_eq!(result.selected_outputs().len(), 1);
//! assert_eq!(result.fee_amount(), Amount::from_sat(280));
//! assert_eq!(result.change_amount(), Amount::from_sat(9_720));
//! ```

use crate::error::{SpendError, SpendResult};
use crate::fee_estimation::{estimate_fee, FeeRate, SELECTION_OUTPUT_COUNT};
use crate::logging::{self, LogLevel};
use crate::utxo_selection::builder::{SelectionResultBuilder, SelectionTerminal};
use crate::utxo_selection::types::{SelectionResult, UnspentOutput};
use bitcoin::{Amount, OutPoint};
use log::trace;
use serde_json::json;
use std::collections::HashSet;

/// State of the greedy selection
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    /// Nothing has been looked at yet
    #[default]
    Start,
    /// Taking candidates largest-first
    Accumulating {
        /// Index of the next candidate in the sorted list
        next: usize,
        selected: Vec<UnspentOutput>,
        total: Amount,
        /// Fee for the current selection; zero before the first input
        fee: Amount,
    },
    /// Terminal: the selection covers amount plus fee
    Sufficient {
        selected: Vec<UnspentOutput>,
        total: Amount,
        fee: Amount,
        change: Amount,
    },
    /// Terminal: the candidates ran out first
    Insufficient {
        selected: Vec<UnspentOutput>,
        total: Amount,
        fee: Amount,
    },
}

impl SelectionState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SelectionState::Sufficient { .. } | SelectionState::Insufficient { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            SelectionState::Start => "start",
            SelectionState::Accumulating { .. } => "accumulating",
            SelectionState::Sufficient { .. } => "sufficient",
            SelectionState::Insufficient { .. } => "insufficient",
        }
    }
}

/// Greedy coin selector driving [`SelectionState`]
#[derive(Debug, Clone)]
pub struct CoinSelector {
    candidates: Vec<UnspentOutput>,
    requested_amount: Amount,
    fee_rate: FeeRate,
    state: SelectionState,
}

impl CoinSelector {
    /// Create a selector over the given candidates
    ///
    /// Candidates are taken as-is; sorting happens on the first [`step`](Self::step).
    pub fn new(candidates: &[UnspentOutput], requested_amount: Amount, fee_rate: FeeRate) -> Self {
        Self {
            candidates: candidates.to_vec(),
            requested_amount,
            fee_rate,
            state: SelectionState::Start,
        }
    }

    /// Current state
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Candidates in the order they are considered (sorted after the first step)
    pub fn candidates(&self) -> &[UnspentOutput] {
        &self.candidates
    }

    /// Perform one transition. Stepping a terminal state is a no-op.
    pub fn step(&mut self) -> SpendResult<()> {
        let state = std::mem::take(&mut self.state);
        let from = state.name();

        self.state = match state {
            SelectionState::Start => self.start(),
            SelectionState::Accumulating {
                next,
                selected,
                total,
                fee,
            } => self.accumulate(next, selected, total, fee)?,
            terminal => terminal,
        };

        trace!("coin selection: {} -> {}", from, self.state.name());
        Ok(())
    }

    /// Step until a terminal state is reached
    pub fn run(mut self) -> SpendResult<SelectionTerminal> {
        while !self.state.is_terminal() {
            self.step()?;
        }

        match self.state {
            SelectionState::Sufficient {
                selected,
                total,
                fee,
                change,
            } => Ok(SelectionTerminal {
                selected,
                total_input_value: total,
                fee_amount: fee,
                change_amount: change,
                sufficient_funds: true,
            }),
            SelectionState::Insufficient {
                selected,
                total,
                fee,
            } => Ok(SelectionTerminal {
                selected,
                total_input_value: total,
                fee_amount: fee,
                change_amount: Amount::ZERO,
                sufficient_funds: false,
            }),
            SelectionState::Start | SelectionState::Accumulating { .. } => {
                Err(SpendError::InvariantViolation {
                    context: "selector stopped outside a terminal state".to_string(),
                })
            }
        }
    }

    fn start(&mut self) -> SelectionState {
        if self.candidates.is_empty() {
            return SelectionState::Insufficient {
                selected: Vec::new(),
                total: Amount::ZERO,
                fee: Amount::ZERO,
            };
        }

        // A provider listing the same outpoint twice must not let it be spent twice.
        let mut seen: HashSet<OutPoint> = HashSet::with_capacity(self.candidates.len());
        self.candidates.retain(|output| seen.insert(output.outpoint()));

        // Stable: equal values keep their input order.
        self.candidates.sort_by(|a, b| b.value().cmp(&a.value()));

        SelectionState::Accumulating {
            next: 0,
            selected: Vec::new(),
            total: Amount::ZERO,
            fee: Amount::ZERO,
        }
    }

    fn accumulate(
        &self,
        next: usize,
        mut selected: Vec<UnspentOutput>,
        total: Amount,
        fee: Amount,
    ) -> SpendResult<SelectionState> {
        let Some(candidate) = self.candidates.get(next) else {
            return Ok(SelectionState::Insufficient {
                selected,
                total,
                fee,
            });
        };

        let total = total
            .checked_add(candidate.value())
            .ok_or_else(|| SpendError::AmountOverflow {
                context: format!("sum of {} selected outputs", selected.len() + 1),
            })?;
        selected.push(candidate.clone());

        let fee = estimate_fee(selected.len(), SELECTION_OUTPUT_COUNT, self.fee_rate);

        // An unrepresentable requirement can never be covered.
        if let Some(required) = self.requested_amount.checked_add(fee) {
            if total >= required {
                return Ok(SelectionState::Sufficient {
                    selected,
                    total,
                    fee,
                    change: total - required,
                });
            }
        }

        Ok(SelectionState::Accumulating {
            next: next + 1,
            selected,
            total,
            fee,
        })
    }
}

/// Select coins from already-filtered candidates
///
/// # Arguments
/// * `available_outputs` - Eligible outputs (confirmation and lock filters applied)
/// * `requested_amount` - Amount to send, excluding fee
/// * `fee_rate` - Fee rate in sat/kvB
///
/// # Returns
/// * The selection result; `sufficient_funds()` is false when the candidates
///   cannot cover the amount plus fee
pub fn select_coins(
    available_outputs: &[UnspentOutput],
    requested_amount: Amount,
    fee_rate: FeeRate,
) -> SpendResult<SelectionResult> {
    let terminal = CoinSelector::new(available_outputs, requested_amount, fee_rate).run()?;

    logging::log_selection(
        LogLevel::Debug,
        "coin selection finished",
        Some(json!({
            "candidates": available_outputs.len(),
            "selected": terminal.selected.len(),
            "requested_sats": requested_amount.to_sat(),
            "fee_sats": terminal.fee_amount.to_sat(),
            "change_sats": terminal.change_amount.to_sat(),
            "sufficient": terminal.sufficient_funds,
        })),
    );

    SelectionResultBuilder::new(requested_amount, fee_rate)
        .candidate_count(available_outputs.len())
        .build(terminal)
}
