//! Assembly of [`SelectionResult`] from the selector's terminal state

use crate::error::{SpendError, SpendResult};
use crate::fee_estimation::FeeRate;
use crate::logging::{self, LogLevel};
use crate::utxo_selection::types::{SelectionResult, UnspentOutput};
use bitcoin::{Amount, OutPoint};
use serde_json::json;
use std::collections::HashSet;

/// Raw terminal state handed from the selector to the builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTerminal {
    pub selected: Vec<UnspentOutput>,
    pub total_input_value: Amount,
    pub fee_amount: Amount,
    pub change_amount: Amount,
    pub sufficient_funds: bool,
}

/// Builds the immutable [`SelectionResult`] and checks its post-conditions
///
/// The checks hold by construction. A failure means a defect in the
/// selector: it panics in debug builds and is logged and returned as
/// [`SpendError::InvariantViolation`] in release builds.
#[derive(Debug, Clone)]
pub struct SelectionResultBuilder {
    requested_amount: Amount,
    fee_rate: FeeRate,
    candidate_count: Option<usize>,
}

impl SelectionResultBuilder {
    pub fn new(requested_amount: Amount, fee_rate: FeeRate) -> Self {
        Self {
            requested_amount,
            fee_rate,
            candidate_count: None,
        }
    }

    /// Number of eligible candidates the selector was given.
    ///
    /// Defaults to the number of selected outputs when not set.
    pub fn candidate_count(mut self, count: usize) -> Self {
        self.candidate_count = Some(count);
        self
    }

    pub fn build(self, terminal: SelectionTerminal) -> SpendResult<SelectionResult> {
        if let Err(context) = self.check(&terminal) {
            logging::log_selection(
                LogLevel::Error,
                "selection invariant violated",
                Some(json!({
                    "reason": context,
                    "requested_sats": self.requested_amount.to_sat(),
                    "total_sats": terminal.total_input_value.to_sat(),
                    "fee_sats": terminal.fee_amount.to_sat(),
                    "change_sats": terminal.change_amount.to_sat(),
                })),
            );
            debug_assert!(false, "selection invariant violated: {}", context);
            return Err(SpendError::InvariantViolation { context });
        }

        Ok(SelectionResult {
            candidate_count: self.candidate_count.unwrap_or(terminal.selected.len()),
            selected_outputs: terminal.selected,
            total_input_value: terminal.total_input_value,
            fee_amount: terminal.fee_amount,
            change_amount: terminal.change_amount,
            sufficient_funds: terminal.sufficient_funds,
            requested_amount: self.requested_amount,
            fee_rate: self.fee_rate,
        })
    }

    fn check(&self, terminal: &SelectionTerminal) -> Result<(), String> {
        let sum = terminal
            .selected
            .iter()
            .try_fold(Amount::ZERO, |acc, output| acc.checked_add(output.value()));
        if sum != Some(terminal.total_input_value) {
            return Err(format!(
                "total input value {} does not match the selected outputs",
                terminal.total_input_value.to_sat()
            ));
        }

        let mut seen: HashSet<OutPoint> = HashSet::with_capacity(terminal.selected.len());
        if let Some(duplicate) = terminal
            .selected
            .iter()
            .find(|output| !seen.insert(output.outpoint()))
        {
            return Err(format!("outpoint {} selected twice", duplicate.outpoint()));
        }

        if terminal.sufficient_funds {
            let accounted = self
                .requested_amount
                .checked_add(terminal.fee_amount)
                .and_then(|amount| amount.checked_add(terminal.change_amount));
            if accounted != Some(terminal.total_input_value) {
                return Err(format!(
                    "inputs {} != amount {} + fee {} + change {}",
                    terminal.total_input_value.to_sat(),
                    self.requested_amount.to_sat(),
                    terminal.fee_amount.to_sat(),
                    terminal.change_amount.to_sat()
                ));
            }
        } else if terminal.change_amount != Amount::ZERO {
            return Err("insufficient selection carries change".to_string());
        }

        Ok(())
    }
}
