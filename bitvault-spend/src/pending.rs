//! Pending transaction locks
//!
//! A transaction the wallet has broadcast but not yet seen confirmed still
//! owns its inputs. Those outpoints are "locked": building a second
//! transaction from them would double-spend the first.
//!
//! The spend planner only ever *reads* locks. Recording a lock after
//! broadcast and releasing it on confirmation or abandonment belongs to the
//! surrounding wallet, which can use [`InMemoryPendingStore`] or its own
//! persistent implementation of [`PendingTransactionStore`].

use crate::logging::{self, sanitize_for_logging, LogLevel};
use crate::utxo_selection::SelectionResult;
use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Outpoints consumed by one pending transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransactionLock {
    /// Identifier of the pending transaction
    pub transaction_id: Txid,
    /// Inputs of that transaction
    pub locked_outpoints: HashSet<OutPoint>,
}

impl PendingTransactionLock {
    pub fn new(transaction_id: Txid, locked_outpoints: impl IntoIterator<Item = OutPoint>) -> Self {
        Self {
            transaction_id,
            locked_outpoints: locked_outpoints.into_iter().collect(),
        }
    }

    /// Whether this transaction spends `outpoint`
    pub fn locks(&self, outpoint: &OutPoint) -> bool {
        self.locked_outpoints.contains(outpoint)
    }
}

/// Union of the outpoints locked by all given pending transactions
pub fn locked_outpoints(locks: &[PendingTransactionLock]) -> HashSet<OutPoint> {
    locks
        .iter()
        .flat_map(|lock| lock.locked_outpoints.iter().copied())
        .collect()
}

/// Local, synchronous source of the lock set for an address
pub trait PendingTransactionStore: Send + Sync {
    /// All outpoints locked by pending transactions spending from `address`
    fn locked_outpoints_for(&self, address: &str) -> HashSet<OutPoint>;
}

/// Thread-safe in-memory pending transaction store keyed by address
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    pending: RwLock<HashMap<String, Vec<PendingTransactionLock>>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a broadcast transaction's inputs as locked.
    ///
    /// Recording the same transaction id again replaces the earlier entry.
    pub fn record(&self, address: &str, lock: PendingTransactionLock) {
        logging::log_locks(
            LogLevel::Debug,
            "recording pending transaction",
            Some(json!({
                "address": sanitize_for_logging(address),
                "txid": sanitize_for_logging(&lock.transaction_id.to_string()),
                "inputs": lock.locked_outpoints.len(),
            })),
        );

        let mut pending = self.pending.write().unwrap_or_else(|e| e.into_inner());
        let entries = pending.entry(address.to_string()).or_default();
        entries.retain(|existing| existing.transaction_id != lock.transaction_id);
        entries.push(lock);
    }

    /// Release the lock held by `transaction_id` (confirmed or abandoned).
    ///
    /// Returns whether a lock was removed.
    pub fn release(&self, address: &str, transaction_id: &Txid) -> bool {
        let mut pending = self.pending.write().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = pending.get_mut(address) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|lock| lock.transaction_id != *transaction_id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            pending.remove(address);
        }
        removed
    }

    /// Pending transactions currently tracked for `address`
    pub fn pending_for(&self, address: &str) -> Vec<PendingTransactionLock> {
        let pending = self.pending.read().unwrap_or_else(|e| e.into_inner());
        pending.get(address).cloned().unwrap_or_default()
    }
}

impl PendingTransactionStore for InMemoryPendingStore {
    fn locked_outpoints_for(&self, address: &str) -> HashSet<OutPoint> {
        let pending = self.pending.read().unwrap_or_else(|e| e.into_inner());
        pending
            .get(address)
            .map(|locks| locked_outpoints(locks))
            .unwrap_or_default()
    }
}

/// Re-check a selection against a freshly fetched lock set right before
/// broadcast.
///
/// Returns the selected outpoints that have been locked in the meantime; the
/// caller should discard the plan and select again when this is non-empty.
pub fn revalidate(
    result: &SelectionResult,
    locked_outpoints: &HashSet<OutPoint>,
) -> Result<(), Vec<OutPoint>> {
    let conflicts: Vec<OutPoint> = result
        .selected_outputs()
        .iter()
        .map(|output| output.outpoint())
        .filter(|outpoint| locked_outpoints.contains(outpoint))
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        logging::log_locks(
            LogLevel::Warn,
            "selection conflicts with pending transactions",
            Some(json!({ "conflicts": conflicts.len() })),
        );
        Err(conflicts)
    }
}
