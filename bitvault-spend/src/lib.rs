//! BitVault Spend Library
//!
//! This crate decides which unspent outputs of an address fund an outgoing
//! payment, and what fee and change that payment carries. It is the piece of
//! the BitVault wallet that runs between "user entered an amount" and
//! "assemble and sign the transaction".
//!
//! # Modules
//!
//! - `error`: Error type shared by the fallible operations
//! - `logging`: `log` facade helpers and `env_logger` setup
//! - `config`: TOML configuration for selection and provider settings
//! - `fee_estimation`: Fee rate type and the size-based fee model
//! - `utxo_selection`: Output filters, the greedy selector and the result builder
//! - `pending`: Outpoints locked by broadcast-but-unconfirmed transactions
//! - `providers`: The async UTXO provider boundary and a per-network registry
//! - `locks`: Per-address build locks
//! - `planner`: The end-to-end transaction plan entry point
//!
//! # Outcomes
//!
//! Insufficient funds and "nothing spendable" are ordinary results, reported
//! through [`SelectionResult::condition`]. Only a failed UTXO fetch
//! ([`SpendError::ProviderUnavailable`]) and defects (overflow, a broken
//! post-condition) surface as errors.

/// Error handling
pub mod error;

/// Logging functionality
pub mod logging;

/// Configuration management
pub mod config;

/// Fee estimation utilities
pub mod fee_estimation;

/// UTXO filtering and selection
pub mod utxo_selection;

/// Pending transaction locks
pub mod pending;

/// UTXO provider boundary
pub mod providers;

/// Per-address build locks
pub mod locks;

/// Transaction plan entry point
pub mod planner;

pub use error::{ErrorCategory, SpendError, SpendResult};

/// Re-export fee estimation types and utilities
pub use fee_estimation::{estimate_fee, estimate_vsize, FeeRate};

/// Re-export UTXO selection types
pub use utxo_selection::{
    eligible_outputs, filter_by_confirmations, filter_locked, select_coins, SelectionCondition,
    SelectionResult, UnspentOutput,
};

pub use config::SpendConfig;
pub use locks::{AddressGuard, AddressLocks};
pub use pending::{
    locked_outpoints, revalidate, InMemoryPendingStore, PendingTransactionLock,
    PendingTransactionStore,
};
pub use planner::{compute_transaction_plan, SpendPlanner};
pub use providers::{ProviderRegistry, StaticUtxoProvider, UtxoProvider};

// Re-export the Bitcoin types that appear in the public API
pub use bitcoin::{Amount, Network, OutPoint, Txid};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use std::sync::Once;

static INIT: Once = Once::new();

/// Library initialization
///
/// Installs the default logger. Safe to call more than once; only the first
/// call does anything.
pub fn init() -> Result<(), String> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = logging::init(&logging::LogConfig::default())
            .map_err(|e| format!("Failed to initialize logging: {}", e));
    });
    result
}

/// Library initialization from configuration
pub fn init_with_config(config: &SpendConfig) -> Result<(), String> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = logging::init(&config.logging)
            .map_err(|e| format!("Failed to initialize logging: {}", e));
    });
    result
}
