//! Configuration types for contact reconciliation
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

use crate::clients::MemoryUser;

/// Main import job configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportJobConfig {
    /// Client configuration
    pub client: ClientConfig,

    /// Optional reconciliation settings
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl ImportJobConfig {
    /// Create a new configuration with defaults
    pub fn new(client: ClientConfig) -> Self {
        Self {
            client,
            reconcile: ReconcileConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.client.validate()?;
        self.reconcile.validate()?;
        Ok(())
    }
}

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientConfig {
    /// JSON HTTP contacts gateway
    Http {
        /// Gateway base URL (e.g. "https://contacts.example.net")
        base_url: String,
        /// Bearer token
        api_token: String,
        /// Optional session name forwarded to the gateway
        #[serde(default)]
        session_name: Option<String>,
        /// Request timeout in seconds
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },

    /// Seeded in-memory directory (dry runs, tests)
    Memory {
        /// Users known to the directory
        #[serde(default)]
        users: Vec<MemoryUser>,
    },

    /// Custom client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ClientConfig {
    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ClientConfig::Http {
                base_url,
                api_token,
                timeout_secs,
                ..
            } => {
                if base_url.is_empty() {
                    return Err(crate::Error::config("HTTP gateway URL cannot be empty"));
                }
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "HTTP gateway URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if api_token.is_empty() {
                    return Err(crate::Error::config("HTTP gateway API token cannot be empty"));
                }
                if !(1..=300).contains(timeout_secs) {
                    return Err(crate::Error::config(format!(
                        "HTTP timeout must be between 1 and 300 seconds. Got: {}",
                        timeout_secs
                    )));
                }
                Ok(())
            }
            ClientConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom client factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom client config cannot be null"));
                }
                Ok(())
            }
            ClientConfig::Memory { .. } => Ok(()),
        }
    }

    /// Get the client type name
    pub fn type_name(&self) -> &str {
        match self {
            ClientConfig::Http { .. } => "http",
            ClientConfig::Memory { .. } => "memory",
            ClientConfig::Custom { factory, .. } => factory,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig::Memory { users: Vec::new() }
    }
}

/// What an import call failure turns into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFailurePolicy {
    /// Record a distinct `Failed` outcome carrying the error message
    #[default]
    RecordFailure,
    /// Record the entry as `NotFound` (legacy behavior)
    TreatAsNotFound,
}

impl std::str::FromStr for ImportFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "record" | "record_failure" | "record-failure" => Ok(Self::RecordFailure),
            "not-found" | "not_found" | "treat_as_not_found" | "legacy" => {
                Ok(Self::TreatAsNotFound)
            }
            other => Err(crate::Error::config(format!(
                "Unknown import failure policy '{}'. Valid: record, not-found",
                other
            ))),
        }
    }
}

/// Reconciliation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// What an import call failure turns into
    #[serde(default)]
    pub import_failure_policy: ImportFailurePolicy,

    /// Capacity of the engine's event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl ReconcileConfig {
    /// Set the import failure policy
    pub fn with_import_failure_policy(mut self, policy: ImportFailurePolicy) -> Self {
        self.import_failure_policy = policy;
        self
    }

    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            import_failure_policy: ImportFailurePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_http_timeout_secs() -> u64 {
    30
}
