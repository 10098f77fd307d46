//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs
//! - Validate value ranges (capacities, lengths, deadlines)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{MailTransport, ServiceConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: invalid URL {value:?}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{field}: {message}")]
    OutOfRange {
        field: &'static str,
        message: &'static str,
    },

    #[error("confirmation.from_address: {0:?} is not an email address")]
    InvalidSender(String),
}

pub const MIN_NONCE_LENGTH: usize = 16;
pub const MAX_NONCE_LENGTH: usize = 128;

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if !is_http_url(&config.app.base_url) {
        errors.push(ValidationError::InvalidUrl {
            field: "app.base_url",
            value: config.app.base_url.clone(),
        });
    }

    let confirmation = &config.confirmation;
    if confirmation.queue_capacity == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "confirmation.queue_capacity",
            message: "must be at least 1",
        });
    }
    if !(MIN_NONCE_LENGTH..=MAX_NONCE_LENGTH).contains(&confirmation.nonce_length) {
        errors.push(ValidationError::OutOfRange {
            field: "confirmation.nonce_length",
            message: "must be between 16 and 128",
        });
    }
    if !confirmation.from_address.contains('@') {
        errors.push(ValidationError::InvalidSender(
            confirmation.from_address.clone(),
        ));
    }

    if config.shutdown.server_grace_secs == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "shutdown.server_grace_secs",
            message: "must be greater than zero",
        });
    }

    if config.mail.transport == MailTransport::Http {
        if !is_http_url(&config.mail.endpoint) {
            errors.push(ValidationError::InvalidUrl {
                field: "mail.endpoint",
                value: config.mail.endpoint.clone(),
            });
        }
        if config.mail.timeout_secs == 0 {
            errors.push(ValidationError::OutOfRange {
                field: "mail.timeout_secs",
                message: "must be greater than zero",
            });
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}
