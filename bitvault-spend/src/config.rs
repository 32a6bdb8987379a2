//! Configuration for the spend planner.
//!
//! Settings are stored in TOML. Every field has a default, so a partial file
//! (or an empty one) yields a usable configuration.
//!
//! ```toml
//! [selection]
//! network = "testnet"
//! min_confirmations = 3
//! default_fee_rate_sat_per_kvb = 2000
//!
//! [provider]
//! timeout_seconds = 20
//! ```

use crate::error::{config_error, SpendError, SpendResult};
use crate::fee_estimation::FeeRate;
use crate::logging::LogConfig;
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SpendConfig {
    #[serde(default)]
    pub selection: SelectionConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Coin selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Network name as understood by `bitcoin::Network` ("bitcoin", "testnet", ...)
    #[serde(default = "default_network")]
    pub network: String,

    /// Minimum confirmation height an output needs to be spendable
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: u32,

    /// Fee rate used when the caller has none, in sat/kvB
    #[serde(default = "default_fee_rate")]
    pub default_fee_rate_sat_per_kvb: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            min_confirmations: default_min_confirmations(),
            default_fee_rate_sat_per_kvb: default_fee_rate(),
        }
    }
}

impl SelectionConfig {
    /// Parsed network
    pub fn network(&self) -> SpendResult<Network> {
        Network::from_str(&self.network.to_lowercase()).map_err(|e| SpendError::Config {
            context: format!("Invalid network type {}", self.network),
            source: Some(Box::new(e)),
        })
    }

    /// Default fee rate
    pub fn default_fee_rate(&self) -> FeeRate {
        FeeRate::from_sat_per_kvb(self.default_fee_rate_sat_per_kvb)
    }
}

/// UTXO provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Upper bound on a single UTXO fetch
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }
}

impl SpendConfig {
    /// Load configuration from file
    ///
    /// A missing or unreadable file is an `Io` error, malformed TOML a
    /// `Serialization` error and out-of-range values a `Config` error.
    pub fn load(path: &Path) -> SpendResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: SpendConfig = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> SpendResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        log::debug!("Saved spend configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> SpendResult<()> {
        self.selection.network()?;

        if self.selection.default_fee_rate_sat_per_kvb == 0 {
            return Err(config_error("Invalid default fee rate: must be greater than 0"));
        }

        if self.provider.timeout_seconds == 0 {
            return Err(config_error("Invalid provider timeout: must be greater than 0"));
        }

        Ok(())
    }
}

/// Ensure a configuration file exists at the specified path
/// If it doesn't exist, create it with default values
pub fn ensure_config_exists(path: &Path) -> SpendResult<()> {
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        SpendConfig::default().save(path)?;
    }

    Ok(())
}

// Default value functions

fn default_network() -> String {
    "bitcoin".to_string()
}

fn default_min_confirmations() -> u32 {
    1
}

fn default_fee_rate() -> u64 {
    FeeRate::MIN_RELAY.to_sat_per_kvb()
}

fn default_timeout() -> u32 {
    30
}
