//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and URLs before any listener binds
//! - Validate value ranges (pricing, sample ratio)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: LedgerConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::LedgerConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &LedgerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, addr) in [
        ("manager.bind_address", &config.manager.bind_address),
        ("visits.bind_address", &config.visits.bind_address),
        ("sender.bind_address", &config.sender.bind_address),
        ("receiver.bind_address", &config.receiver.bind_address),
    ] {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(field, format!("invalid socket address '{}'", addr)));
        }
    }

    for (field, raw) in [
        ("manager.visits_url", &config.manager.visits_url),
        ("sender.receiver_url", &config.sender.receiver_url),
    ] {
        match url::Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(ValidationError::new(
                field,
                format!("unsupported scheme '{}'", url.scheme()),
            )),
            Err(e) => errors.push(ValidationError::new(field, format!("invalid URL '{}': {}", raw, e))),
        }
    }

    for (site, pricing) in &config.manager.sites {
        if *pricing < 0 {
            errors.push(ValidationError::new(
                format!("manager.sites.{}", site),
                "pricing must not be negative",
            ));
        }
    }

    let obs = &config.observability;
    if !(0.0..=1.0).contains(&obs.sample_ratio) {
        errors.push(ValidationError::new(
            "observability.sample_ratio",
            "must be within [0, 1]",
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }
    if let Some(endpoint) = &obs.otlp_endpoint {
        if url::Url::parse(endpoint).is_err() {
            errors.push(ValidationError::new(
                "observability.otlp_endpoint",
                format!("invalid URL '{}'", endpoint),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
