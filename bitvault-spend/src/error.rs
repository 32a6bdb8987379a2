//! Standardized error handling for BitVault spend planning
//!
//! This module defines the error type returned by the fallible parts of the
//! spend planner. Only conditions that abort a build attempt are modelled as
//! errors here: running out of eligible or sufficient outputs is an ordinary
//! outcome reported through [`SelectionResult`](crate::utxo_selection::SelectionResult).
//!
//! # Usage
//!
//! ```
//! use bitvault_spend::error::{provider_error, ErrorCategory, SpendError};
//!
//! let err: SpendError = provider_error("indexer returned HTTP 503");
//! assert_eq!(err.category(), ErrorCategory::Provider);
//! assert!(err.is_retryable());
//! ```

use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// The main error type for spend planning
#[derive(Debug, Error)]
pub enum SpendError {
    /// The external UTXO fetch failed (transport, indexer or timeout)
    #[error("UTXO provider unavailable: {context}")]
    ProviderUnavailable {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// A post-condition of the selection result did not hold.
    ///
    /// This is a programming defect, never a user error.
    #[error("Selection invariant violated: {context}")]
    InvariantViolation { context: String },

    /// An amount could not be represented in 64 bits
    #[error("Amount overflow: {context}")]
    AmountOverflow { context: String },

    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error("Configuration error: {context}")]
    Config {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// I/O errors
    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        context: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

/// Type alias for a Result with SpendError
pub type SpendResult<T> = Result<T, SpendError>;

impl From<io::Error> for SpendError {
    fn from(err: io::Error) -> Self {
        SpendError::Io {
            context: err.to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for SpendError {
    fn from(err: toml::de::Error) -> Self {
        SpendError::Serialization {
            context: format!("TOML deserialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::ser::Error> for SpendError {
    fn from(err: toml::ser::Error) -> Self {
        SpendError::Serialization {
            context: format!("TOML serialization error: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

/// Create a provider error with context
pub fn provider_error<S: Into<String>>(context: S) -> SpendError {
    SpendError::ProviderUnavailable {
        context: context.into(),
        source: None,
    }
}

/// Create a provider error with context and source
pub fn provider_error_with_source<S: Into<String>, E: StdError + Send + Sync + 'static>(
    context: S,
    source: E,
) -> SpendError {
    SpendError::ProviderUnavailable {
        context: context.into(),
        source: Some(Box::new(source)),
    }
}

/// Create a configuration error with context
pub fn config_error<S: Into<String>>(context: S) -> SpendError {
    SpendError::Config {
        context: context.into(),
        source: None,
    }
}

/// Error category for logging purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Internal,
    Validation,
    Config,
    Io,
    Serialization,
}

impl ErrorCategory {
    /// Convert the error category to a string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Provider => "Provider",
            ErrorCategory::Internal => "Internal",
            ErrorCategory::Validation => "Validation",
            ErrorCategory::Config => "Config",
            ErrorCategory::Io => "Io",
            ErrorCategory::Serialization => "Serialization",
        }
    }
}

impl SpendError {
    /// Get the category of this error for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            SpendError::ProviderUnavailable { .. } => ErrorCategory::Provider,
            SpendError::InvariantViolation { .. } | SpendError::AmountOverflow { .. } => {
                ErrorCategory::Internal
            }
            SpendError::InvalidArgument(_) => ErrorCategory::Validation,
            SpendError::Config { .. } => ErrorCategory::Config,
            SpendError::Io { .. } => ErrorCategory::Io,
            SpendError::Serialization { .. } => ErrorCategory::Serialization,
        }
    }

    /// Whether the caller may retry the same build attempt after a backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, SpendError::ProviderUnavailable { .. })
    }

    /// Get a sanitized message suitable for displaying to users
    pub fn user_message(&self) -> String {
        match self {
            SpendError::ProviderUnavailable { .. } => {
                "Could not load spendable coins, please try again".to_string()
            }
            SpendError::InvariantViolation { .. } | SpendError::AmountOverflow { .. } => {
                "An internal error occurred while preparing the transaction".to_string()
            }
            SpendError::InvalidArgument(message) => format!("Invalid input: {}", message),
            SpendError::Config { context, .. } => format!("Configuration error: {}", context),
            SpendError::Io { context, .. } => format!("File operation error: {}", context),
            SpendError::Serialization { context, .. } => format!("Data format error: {}", context),
        }
    }
}
