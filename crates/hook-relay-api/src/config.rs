//! Configuration types for the HTTP services
//!
//! Settings are flat so that each field maps directly onto one unprefixed
//! environment variable (`HUBSPOT_SECRET_TOKEN` -> `hubspot_secret_token`,
//! `PORT` -> `port`). Nested views ([`ServerConfig`], [`LoggingConfig`]) are
//! derived from them after loading.

use crate::errors::ConfigError;
use hook_relay_core::signature::SIGNATURE_HEADER;
use hook_relay_core::TableRef;
use relay_runtime::PubSubConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_timeout_seconds() -> u64 {
    30
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_signature_header() -> String {
    SIGNATURE_HEADER.to_string()
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
            max_body_size: default_max_body_size(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

// ============================================================================
// Ingress
// ============================================================================

/// Settings for the webhook ingress service
#[derive(Clone, Serialize, Deserialize)]
pub struct IngressSettings {
    /// Shared secret the platform signs deliveries with
    #[serde(default)]
    pub hubspot_secret_token: String,

    #[serde(default)]
    pub pubsub_project_id: String,

    #[serde(default)]
    pub pubsub_topic_id: String,

    /// Pub/Sub emulator `host:port`; disables credentials when set
    #[serde(default)]
    pub pubsub_emulator_host: Option<String>,

    /// Header carrying the delivery signature
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Client-wide timeout for outbound calls; unlimited when unset
    #[serde(default)]
    pub http_timeout_seconds: Option<u64>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl IngressSettings {
    /// Check that every required setting is present
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first absent key, as its
    /// environment variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("HUBSPOT_SECRET_TOKEN", &self.hubspot_secret_token)?;
        require("PUBSUB_PROJECT_ID", &self.pubsub_project_id)?;
        require("PUBSUB_TOPIC_ID", &self.pubsub_topic_id)?;
        require("SIGNATURE_HEADER", &self.signature_header)?;
        validate_server(self.port, self.max_body_size)
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            shutdown_timeout_seconds: self.shutdown_timeout_seconds,
            max_body_size: self.max_body_size,
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json_format: self.log_json,
        }
    }

    /// Channel configuration for the publisher
    pub fn pubsub(&self) -> PubSubConfig {
        let mut config = PubSubConfig::new(&self.pubsub_project_id, &self.pubsub_topic_id);
        config.emulator_host = self
            .pubsub_emulator_host
            .clone()
            .filter(|host| !host.trim().is_empty());
        config
    }
}

impl Default for IngressSettings {
    fn default() -> Self {
        Self {
            hubspot_secret_token: String::new(),
            pubsub_project_id: String::new(),
            pubsub_topic_id: String::new(),
            pubsub_emulator_host: None,
            signature_header: default_signature_header(),
            http_timeout_seconds: None,
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
            max_body_size: default_max_body_size(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl fmt::Debug for IngressSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngressSettings")
            .field("hubspot_secret_token", &"<REDACTED>")
            .field("pubsub_project_id", &self.pubsub_project_id)
            .field("pubsub_topic_id", &self.pubsub_topic_id)
            .field("pubsub_emulator_host", &self.pubsub_emulator_host)
            .field("signature_header", &self.signature_header)
            .field("http_timeout_seconds", &self.http_timeout_seconds)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("shutdown_timeout_seconds", &self.shutdown_timeout_seconds)
            .field("max_body_size", &self.max_body_size)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Settings for the warehouse loader service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderSettings {
    #[serde(default)]
    pub bq_project_id: String,

    #[serde(default)]
    pub bq_dataset_id: String,

    #[serde(default)]
    pub bq_table_id: String,

    /// Alternative BigQuery endpoint (emulators); credentials are disabled
    /// when set
    #[serde(default)]
    pub bigquery_endpoint: Option<String>,

    /// Client-wide timeout for outbound calls; unlimited when unset
    #[serde(default)]
    pub http_timeout_seconds: Option<u64>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_shutdown_timeout_seconds")]
    pub shutdown_timeout_seconds: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl LoaderSettings {
    /// Check that every required setting is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        require("BQ_PROJECT_ID", &self.bq_project_id)?;
        require("BQ_DATASET_ID", &self.bq_dataset_id)?;
        require("BQ_TABLE_ID", &self.bq_table_id)?;
        validate_server(self.port, self.max_body_size)
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            shutdown_timeout_seconds: self.shutdown_timeout_seconds,
            max_body_size: self.max_body_size,
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json_format: self.log_json,
        }
    }

    /// Destination table
    pub fn table(&self) -> Result<TableRef, ConfigError> {
        TableRef::new(&self.bq_project_id, &self.bq_dataset_id, &self.bq_table_id).map_err(|e| {
            ConfigError::Invalid {
                message: e.to_string(),
            }
        })
    }

    /// Custom endpoint, if one is configured
    pub fn bigquery_endpoint(&self) -> Option<&str> {
        self.bigquery_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            bq_project_id: String::new(),
            bq_dataset_id: String::new(),
            bq_table_id: String::new(),
            bigquery_endpoint: None,
            http_timeout_seconds: None,
            host: default_host(),
            port: default_port(),
            shutdown_timeout_seconds: default_shutdown_timeout_seconds(),
            max_body_size: default_max_body_size(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn require(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing {
            key: key.to_string(),
        });
    }
    Ok(())
}

fn validate_server(port: u16, max_body_size: usize) -> Result<(), ConfigError> {
    if port == 0 {
        return Err(ConfigError::Invalid {
            message: "port must be non-zero".to_string(),
        });
    }
    if max_body_size == 0 {
        return Err(ConfigError::Invalid {
            message: "max_body_size must be non-zero".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
