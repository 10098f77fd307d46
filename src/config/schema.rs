//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the confirmation service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Public-facing application settings.
    pub app: AppConfig,

    /// Confirmation pipeline settings.
    pub confirmation: ConfirmationConfig,

    /// Shutdown deadlines.
    pub shutdown: ShutdownConfig,

    /// Outbound mail transport.
    pub mail: MailConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Externally reachable base URL, used to build confirmation links.
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

/// Confirmation pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Number of users that may wait in the queue before signups block.
    pub queue_capacity: usize,

    /// Length of generated confirmation nonces.
    pub nonce_length: usize,

    /// Sender address for confirmation emails.
    pub from_address: String,

    /// Subject line for confirmation emails.
    pub subject: String,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1,
            nonce_length: 32,
            from_address: "noreply@someapp.com".to_string(),
            subject: "Welcome to this app!".to_string(),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Maximum time to wait for the confirmation queue to drain.
    /// Zero waits without bound.
    pub drain_timeout_secs: u64,

    /// Grace period for in-flight HTTP requests once the listener stops.
    pub server_grace_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
            server_grace_secs: 5,
        }
    }
}

/// Mail transport selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write messages to the log instead of delivering them.
    #[default]
    Log,
    /// Deliver through a JSON mail API.
    Http,
}

/// Mail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MailConfig {
    /// Transport used to deliver confirmation emails.
    pub transport: MailTransport,

    /// Send endpoint of the mail API (HTTP transport only).
    pub endpoint: String,

    /// Bearer token for the mail API.
    #[serde(skip_serializing)]
    pub api_token: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::Log,
            endpoint: "https://send.api.mailtrap.io/api/send".to_string(),
            api_token: String::new(),
            timeout_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
