//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the process environment, and validate configuration.
///
/// Without a path the built-in defaults are used as the base.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// Recognised variables: `URL`, `BIND_ADDRESS`, `PORT`, `MAIL_API_TOKEN`.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty("URL") {
        config.app.base_url = url.trim_end_matches('/').to_string();
    }

    let host = non_empty("BIND_ADDRESS");
    let port = non_empty("PORT");
    if host.is_some() || port.is_some() {
        let (current_host, current_port) = split_host_port(&config.listener.bind_address);
        let host = host.unwrap_or(current_host);
        let port = port.unwrap_or(current_port);
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(token) = non_empty("MAIL_API_TOKEN") {
        config.mail.api_token = token;
    }
}

fn split_host_port(address: &str) -> (String, String) {
    match address.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.to_string()),
        None => (address.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_port_only_override_keeps_host() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("PORT", "5000")]));
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
    }

    #[test]
    fn test_host_and_port_override() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("BIND_ADDRESS", "127.0.0.1"), ("PORT", "8000")]),
        );
        assert_eq!(config.listener.bind_address, "127.0.0.1:8000");
    }

    #[test]
    fn test_url_override_strips_trailing_slash() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("URL", "https://app.example.com/")]));
        assert_eq!(config.app.base_url, "https://app.example.com");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let mut config = ServiceConfig::default();
        apply_env_overrides(&mut config, env(&[("URL", "  "), ("MAIL_API_TOKEN", "")]));
        assert_eq!(config.app.base_url, "http://localhost:8080");
        assert!(config.mail.api_token.is_empty());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::Validation(vec![
            ValidationError::InvalidSender("x".into()),
            ValidationError::OutOfRange {
                field: "confirmation.queue_capacity",
                message: "must be at least 1",
            },
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: confirmation.from_address: \"x\" is not an email address, \
             confirmation.queue_capacity: must be at least 1"
        );
    }
}
