//! Transaction plan entry point
//!
//! [`compute_transaction_plan`] composes the whole pipeline for one address:
//!
//! 1. fetch unspent outputs from the [`UtxoProvider`] (the only step that
//!    can fail with [`SpendError::ProviderUnavailable`]),
//! 2. read the lock set from the [`PendingTransactionStore`],
//! 3. apply the confirmation and lock filters,
//! 4. run the coin selector and build the [`SelectionResult`].
//!
//! [`SpendPlanner`] wraps the same pipeline with configuration, a provider
//! registry, a fetch timeout and per-address build locks.
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::fee_estimation::FeeRate;
//! use bitvault_spend::pending::InMemoryPendingStore;
//! use bitvault_spend::planner::SpendPlanner;
//! use bitvault_spend::providers::{ProviderRegistry, StaticUtxoProvider};
//! use bitvault_spend::utxo_selection::UnspentOutput;
//! use bitcoin::{Amount, Network, OutPoint, Txid};
//! use std::str::FromStr;
//! use std::sync::Arc;
//!
//! let address = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
//! let txid = Txid::from_str("9dcbf5a86b4e70be97fc5c953ad4111dfe0a94ea6768286e5efd6c35fd9ec9d1").unwrap();
//! let provider = StaticUtxoProvider::new().with_outputs(
//!     address,
//!     Network::Testnet,
//!     vec![UnspentOutput::new(OutPoint::new(txid, 0), Amount::from_sat(100_000), 10).unwrap()],
//! );
//!
//! let planner = SpendPlanner::new(
//!     ProviderRegistry::new().with_provider(Network::Testnet, Arc::new(provider)),
//!     Arc::new(InMemoryPendingStore::new()),
//!     Network::Testnet,
//! );
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! let plan = runtime
//!     .block_on(planner.compute_transaction_plan(address, Amount::from_sat(50_000), FeeRate::from_sat_per_kvb(4929), 6))
//!     .unwrap();
//!
//! assert!(plan.sufficient_funds());
//! assert_eq!(plan.fee_amount(), Amount::from_sat(690));
//! assert_eq!(plan.change_amount(), Amount::from_sat(49_310));
//! ```

use crate::config::SpendConfig;
use crate::error::{provider_error_with_source, SpendError, SpendResult};
use crate::fee_estimation::FeeRate;
use crate::locks::{AddressGuard, AddressLocks};
use crate::logging::{self, sanitize_for_logging, LogLevel};
use crate::pending::PendingTransactionStore;
use crate::providers::{ProviderRegistry, UtxoProvider};
use crate::utxo_selection::{
    filter_by_confirmations, filter_locked, select_coins, SelectionCondition, SelectionResult,
    MAX_MONEY,
};
use bitcoin::{Amount, Network};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Default upper bound on a UTXO fetch
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

fn validate_request(requested_amount: Amount, fee_rate: FeeRate) -> SpendResult<()> {
    if requested_amount == Amount::ZERO {
        return Err(SpendError::InvalidArgument(
            "requested amount must be greater than zero".to_string(),
        ));
    }
    if requested_amount > MAX_MONEY {
        return Err(SpendError::InvalidArgument(format!(
            "requested amount {} exceeds the maximum supply",
            requested_amount.to_sat()
        )));
    }
    if !fee_rate.is_valid() {
        return Err(SpendError::InvalidArgument(
            "fee rate must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Build a selection for `address` from freshly fetched outputs and locks
///
/// # Arguments
/// * `provider` - Source of the address's unspent outputs
/// * `pending` - Source of outpoints locked by pending transactions
/// * `address` - Address being spent from
/// * `network` - Network the address belongs to
/// * `requested_amount` - Amount to send, excluding fee
/// * `fee_rate` - Fee rate in sat/kvB
/// * `min_confirmations` - Confirmation floor for spendable outputs
///
/// # Returns
/// * `Ok(SelectionResult)` for every outcome of selection, including
///   insufficient funds and no eligible outputs
/// * `Err(SpendError::ProviderUnavailable)` when the fetch failed
#[allow(clippy::too_many_arguments)]
pub async fn compute_transaction_plan(
    provider: &dyn UtxoProvider,
    pending: &dyn PendingTransactionStore,
    address: &str,
    network: Network,
    requested_amount: Amount,
    fee_rate: FeeRate,
    min_confirmations: u32,
) -> SpendResult<SelectionResult> {
    validate_request(requested_amount, fee_rate)?;

    logging::log_selection(
        LogLevel::Info,
        "computing transaction plan",
        Some(json!({
            "address": sanitize_for_logging(address),
            "network": network.to_string(),
            "requested_sats": requested_amount.to_sat(),
            "fee_rate": fee_rate.to_string(),
            "min_confirmations": min_confirmations,
        })),
    );

    let outputs = provider
        .fetch_unspent_outputs(address, network)
        .await
        .map_err(|e| match e {
            SpendError::ProviderUnavailable { .. } => e,
            other => provider_error_with_source("UTXO fetch failed", other),
        })
        .map_err(|e| {
            logging::log_provider(
                LogLevel::Warn,
                "utxo fetch failed",
                Some(json!({ "error": e.to_string() })),
            );
            e
        })?;

    // Read locks only after the fetch so the set is as fresh as possible.
    let locked = pending.locked_outpoints_for(address);

    let confirmed = filter_by_confirmations(&outputs, min_confirmations);
    let candidates = filter_locked(&confirmed, &locked);

    logging::log_selection(
        LogLevel::Debug,
        "candidates filtered",
        Some(json!({
            "fetched": outputs.len(),
            "confirmed": confirmed.len(),
            "unlocked": candidates.len(),
            "locked_outpoints": locked.len(),
        })),
    );

    let result = select_coins(&candidates, requested_amount, fee_rate)?;

    match result.condition() {
        SelectionCondition::Sufficient => logging::log_selection(
            LogLevel::Info,
            "transaction plan ready",
            Some(json!({
                "inputs": result.selected_outputs().len(),
                "fee_sats": result.fee_amount().to_sat(),
                "change_sats": result.change_amount().to_sat(),
            })),
        ),
        SelectionCondition::InsufficientFunds => logging::log_selection(
            LogLevel::Info,
            "insufficient funds",
            Some(json!({ "shortfall_sats": result.shortfall().to_sat() })),
        ),
        SelectionCondition::NoEligibleOutputs => logging::log_selection(
            LogLevel::Info,
            "no eligible outputs",
            Some(json!({ "fetched": outputs.len() })),
        ),
    }

    Ok(result)
}

/// Configured spend planner for one network
pub struct SpendPlanner {
    providers: ProviderRegistry,
    pending: Arc<dyn PendingTransactionStore>,
    network: Network,
    provider_timeout: Duration,
    default_fee_rate: FeeRate,
    min_confirmations: u32,
    build_locks: AddressLocks,
}

impl SpendPlanner {
    /// Create a planner with default timeout, fee rate and confirmation floor
    pub fn new(
        providers: ProviderRegistry,
        pending: Arc<dyn PendingTransactionStore>,
        network: Network,
    ) -> Self {
        Self {
            providers,
            pending,
            network,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            default_fee_rate: FeeRate::MIN_RELAY,
            min_confirmations: 1,
            build_locks: AddressLocks::new(),
        }
    }

    /// Create a planner from configuration
    pub fn from_config(
        config: &SpendConfig,
        providers: ProviderRegistry,
        pending: Arc<dyn PendingTransactionStore>,
    ) -> SpendResult<Self> {
        config.validate()?;
        let network = config.selection.network()?;

        Ok(Self {
            providers,
            pending,
            network,
            provider_timeout: config.provider.timeout(),
            default_fee_rate: config.selection.default_fee_rate(),
            min_confirmations: config.selection.min_confirmations,
            build_locks: AddressLocks::new(),
        })
    }

    /// Override the fetch timeout
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Share build locks with other planners spending from the same wallet
    pub fn with_build_locks(mut self, locks: AddressLocks) -> Self {
        self.build_locks = locks;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn build_locks(&self) -> &AddressLocks {
        &self.build_locks
    }

    /// Compute a plan for `address`
    ///
    /// See [`compute_transaction_plan`]. A fetch that exceeds the configured
    /// timeout is reported as `ProviderUnavailable`.
    pub async fn compute_transaction_plan(
        &self,
        address: &str,
        requested_amount: Amount,
        fee_rate: FeeRate,
        min_confirmations: u32,
    ) -> SpendResult<SelectionResult> {
        let plan = compute_transaction_plan(
            &self.providers,
            self.pending.as_ref(),
            address,
            self.network,
            requested_amount,
            fee_rate,
            min_confirmations,
        );

        tokio::time::timeout(self.provider_timeout, plan)
            .await
            .map_err(|elapsed| {
                logging::log_provider(
                    LogLevel::Warn,
                    "utxo fetch timed out",
                    Some(json!({ "timeout_ms": self.provider_timeout.as_millis() as u64 })),
                );
                provider_error_with_source(
                    format!("UTXO fetch timed out after {:?}", self.provider_timeout),
                    elapsed,
                )
            })?
    }

    /// Compute a plan with the configured fee rate and confirmation floor
    pub async fn plan_with_defaults(
        &self,
        address: &str,
        requested_amount: Amount,
    ) -> SpendResult<SelectionResult> {
        self.compute_transaction_plan(
            address,
            requested_amount,
            self.default_fee_rate,
            self.min_confirmations,
        )
        .await
    }

    /// Compute a plan while holding the build lock for `address`
    ///
    /// The returned guard must be kept alive until the transaction built
    /// from the plan has been recorded as pending (or abandoned); other
    /// `plan_exclusive` calls for the same address wait until it is dropped.
    pub async fn plan_exclusive(
        &self,
        address: &str,
        requested_amount: Amount,
        fee_rate: FeeRate,
        min_confirmations: u32,
    ) -> SpendResult<(SelectionResult, AddressGuard)> {
        let guard = self.build_locks.acquire(address).await;
        let result = self
            .compute_transaction_plan(address, requested_amount, fee_rate, min_confirmations)
            .await?;
        Ok((result, guard))
    }
}

impl std::fmt::Debug for SpendPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpendPlanner")
            .field("providers", &self.providers)
            .field("network", &self.network)
            .field("provider_timeout", &self.provider_timeout)
            .field("default_fee_rate", &self.default_fee_rate)
            .field("min_confirmations", &self.min_confirmations)
            .finish()
    }
}
