//! Configuration schema definitions.
//!
//! One file configures all four services; each process reads its own section
//! plus `[observability]`. All types derive Serde traits for deserialization
//! from TOML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LedgerConfig {
    /// Orchestrator (ad ledger front end).
    pub manager: ManagerConfig,

    /// Counter service.
    pub visits: VisitsConfig,

    /// First hop of the probe chain.
    pub sender: SenderConfig,

    /// Second hop of the probe chain.
    pub receiver: ReceiverConfig,

    /// Logging, span export and metrics.
    pub observability: ObservabilityConfig,
}

/// Orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Base URL of the counter service.
    pub visits_url: String,

    /// Sites seeded at startup, name → pricing.
    pub sites: BTreeMap<String, i64>,

    /// Advertiser budgets credited at startup, name → amount.
    pub budgets: BTreeMap<String, i64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            visits_url: "http://localhost:8080".to_string(),
            sites: BTreeMap::from([("google.com".to_string(), 100)]),
            budgets: BTreeMap::new(),
        }
    }
}

/// Counter service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VisitsConfig {
    pub bind_address: String,
}

impl Default for VisitsConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SenderConfig {
    pub bind_address: String,

    /// Base URL of the receiver.
    pub receiver_url: String,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8082".to_string(),
            receiver_url: "http://localhost:8083".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceiverConfig {
    pub bind_address: String,

    /// Rows seeded into the receiver's playlists table.
    pub playlists: Vec<PlaylistSeed>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8083".to_string(),
            playlists: vec![PlaylistSeed {
                id: "2cc9ccb7-6221-4ccb-8387-f22b6a1b354d".to_string(),
                title: "La Petite Tonkinoise".to_string(),
                album: "Bye Bye Blackbird".to_string(),
                artist: "Joséphine Baker".to_string(),
                song_id: "756716f7-2e54-4715-9f00-91dcbea6cf50".to_string(),
            }],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistSeed {
    pub id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub song_id: String,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
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
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// OTLP/HTTP traces endpoint (e.g. "http://localhost:4318/v1/traces").
    /// Without one, spans are still created and propagated but not exported.
    pub otlp_endpoint: Option<String>,

    /// Fraction of new traces sampled; children follow their parent.
    pub sample_ratio: f64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            otlp_endpoint: None,
            sample_ratio: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
            [manager]
            visits_url = "http://visits:8080"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.manager.visits_url, "http://visits:8080");
        assert_eq!(config.manager.bind_address, "0.0.0.0:8081");
        assert_eq!(config.manager.sites.get("google.com"), Some(&100));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.receiver.playlists.len(), 1);
    }
}
