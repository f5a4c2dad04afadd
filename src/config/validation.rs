//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Check cross-section consistency (retention needs analytics)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if !matches!(config.upstream.scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::new(
            "upstream.scheme",
            format!("'{}' must be \"http\" or \"https\"", config.upstream.scheme),
        ));
    }
    if let Some(user_agent) = &config.upstream.user_agent {
        if HeaderValue::from_str(user_agent).is_err() {
            errors.push(ValidationError::new(
                "upstream.user_agent",
                "must be a valid HTTP header value",
            ));
        }
    }

    if config.analytics.enabled && config.analytics.database_path.trim().is_empty() {
        errors.push(ValidationError::new("analytics.database_path", "required when analytics is enabled"));
    }

    if config.retention.enabled {
        if !config.analytics.enabled {
            errors.push(ValidationError::new("retention.enabled", "requires analytics.enabled"));
        }
        if config.retention.interval_secs == 0 {
            errors.push(ValidationError::new("retention.interval_secs", "must be greater than 0"));
        }
        if config.retention.max_age_secs == 0 {
            errors.push(ValidationError::new("retention.max_age_secs", "must be greater than 0"));
        }
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("'{}' must be \"pretty\" or \"json\"", config.observability.log_format),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
