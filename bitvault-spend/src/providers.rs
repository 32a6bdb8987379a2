//! UTXO provider boundary
//!
//! The spend planner never talks to the network itself. It asks an injected
//! [`UtxoProvider`] for the outputs of an address, and resolves which
//! provider to use through a caller-owned [`ProviderRegistry`].

use crate::error::{provider_error, SpendResult};
use crate::logging::{self, sanitize_for_logging, LogLevel};
use crate::utxo_selection::UnspentOutput;
use async_trait::async_trait;
use bitcoin::Network;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Asynchronous source of the unspent outputs of an address
///
/// Implementations report transport or indexer failures as
/// [`SpendError::ProviderUnavailable`](crate::error::SpendError::ProviderUnavailable).
#[async_trait]
pub trait UtxoProvider: Send + Sync {
    async fn fetch_unspent_outputs(
        &self,
        address: &str,
        network: Network,
    ) -> SpendResult<Vec<UnspentOutput>>;
}

/// Provider serving a fixed, in-memory UTXO set
///
/// Useful for offline operation and tests. It can be switched into an
/// unavailable mode to exercise outage handling.
#[derive(Debug, Default)]
pub struct StaticUtxoProvider {
    outputs: RwLock<HashMap<(Network, String), Vec<UnspentOutput>>>,
    unavailable: AtomicBool,
}

impl StaticUtxoProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`set_outputs`](Self::set_outputs)
    pub fn with_outputs(
        self,
        address: &str,
        network: Network,
        outputs: Vec<UnspentOutput>,
    ) -> Self {
        self.set_outputs(address, network, outputs);
        self
    }

    /// Replace the outputs served for `address` on `network`
    pub fn set_outputs(&self, address: &str, network: Network, outputs: Vec<UnspentOutput>) {
        let mut map = self.outputs.write().unwrap_or_else(|e| e.into_inner());
        map.insert((network, address.to_string()), outputs);
    }

    /// Make subsequent fetches fail (or succeed again)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UtxoProvider for StaticUtxoProvider {
    async fn fetch_unspent_outputs(
        &self,
        address: &str,
        network: Network,
    ) -> SpendResult<Vec<UnspentOutput>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(provider_error(format!(
                "static provider for {} is offline",
                network
            )));
        }

        let map = self.outputs.read().unwrap_or_else(|e| e.into_inner());
        Ok(map
            .get(&(network, address.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Caller-owned registry of providers, one per network
///
/// The registry replaces process-wide provider caches: whoever builds the
/// planner decides how long providers live and shares them through `Arc`.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Network, Arc<dyn UtxoProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the provider for `network`
    pub fn register(&mut self, network: Network, provider: Arc<dyn UtxoProvider>) -> &mut Self {
        logging::log_provider(
            LogLevel::Debug,
            "registering utxo provider",
            Some(json!({ "network": network.to_string() })),
        );
        self.providers.insert(network, provider);
        self
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_provider(mut self, network: Network, provider: Arc<dyn UtxoProvider>) -> Self {
        self.register(network, provider);
        self
    }

    /// Provider for `network`, if one is registered
    pub fn get(&self, network: Network) -> Option<Arc<dyn UtxoProvider>> {
        self.providers.get(&network).cloned()
    }

    /// Networks with a registered provider
    pub fn networks(&self) -> Vec<Network> {
        let mut networks: Vec<Network> = self.providers.keys().copied().collect();
        networks.sort_by_key(|network| network.to_string());
        networks
    }

    /// Fetch through the provider registered for `network`
    pub async fn fetch(&self, address: &str, network: Network) -> SpendResult<Vec<UnspentOutput>> {
        let provider = self.get(network).ok_or_else(|| {
            provider_error(format!("no utxo provider registered for {}", network))
        })?;

        logging::log_provider(
            LogLevel::Debug,
            "fetching unspent outputs",
            Some(json!({
                "address": sanitize_for_logging(address),
                "network": network.to_string(),
            })),
        );
        provider.fetch_unspent_outputs(address, network).await
    }
}

/// A registry is itself a provider that dispatches on `network`
#[async_trait]
impl UtxoProvider for ProviderRegistry {
    async fn fetch_unspent_outputs(
        &self,
        address: &str,
        network: Network,
    ) -> SpendResult<Vec<UnspentOutput>> {
        self.fetch(address, network).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("networks", &self.networks())
            .finish()
    }
}
