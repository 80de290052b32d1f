//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// The current address could not be determined
    #[error("unable to determine current IP address")]
    DiscoveryUnknown,

    /// No "A" record matched the configured domain
    #[error("Record not found: {0}")]
    NotFound(String),

    /// More than one "A" record matched the configured domain
    #[error("Ambiguous record set: {count} A records match {domain}, expected exactly one")]
    Ambiguous {
        /// The configured domain
        domain: String,
        /// Number of matching records
        count: usize,
    },

    /// Any read or write failure against the DNS provider
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Human-readable message
        message: String,
    },

    /// A remote call exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an "ambiguous record set" error
    pub fn ambiguous(domain: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            domain: domain.into(),
            count,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from talking to the DNS provider
    /// (as opposed to the shape of the record set or local configuration).
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_failure_classification() {
        assert!(Error::provider("cloudflare", "boom").is_provider_failure());
        assert!(Error::timeout("find_record").is_provider_failure());
        assert!(!Error::not_found("example.com").is_provider_failure());
        assert!(!Error::ambiguous("example.com", 2).is_provider_failure());
        assert!(!Error::DiscoveryUnknown.is_provider_failure());
        assert!(!Error::config("missing token").is_provider_failure());
    }

    #[test]
    fn test_ambiguous_message_names_count() {
        let err = Error::ambiguous("home.example.com", 3);
        assert_eq!(
            err.to_string(),
            "Ambiguous record set: 3 A records match home.example.com, expected exactly one"
        );
    }
}
