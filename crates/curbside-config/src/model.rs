// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Curbside arrival coordinator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use curbside_core::Destination;
use serde::{Deserialize, Serialize};

/// Top-level Curbside configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CurbsideConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Session lifecycle deadlines and bounds.
    #[serde(default)]
    pub session: SessionConfig,

    /// Linking code generation.
    #[serde(default)]
    pub linking: LinkingConfig,

    /// Geofence evaluation.
    #[serde(default)]
    pub arrival: ArrivalConfig,

    /// Redemption code issuance.
    #[serde(default)]
    pub redemption: RedemptionConfig,

    /// Order release dispatch and retry.
    #[serde(default)]
    pub release: ReleaseConfig,

    /// Background expiry sweep.
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// HTTP collaborator endpoints.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Destinations seeded into the store at startup.
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, used in logs and health output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "curbside".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("curbside").join("curbside.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("curbside.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. `None` disables auth.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3080
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Window for linking (and, once linked, for starting position reports).
    #[serde(default = "default_linking_window_secs")]
    pub linking_window_secs: u64,

    /// Overall session time-to-live from creation.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Failed linking attempts tolerated before the session expires.
    #[serde(default = "default_max_link_attempts")]
    pub max_link_attempts: u32,

    /// How long an idempotency key keeps returning the same session.
    #[serde(default = "default_idempotency_ttl_secs")]
    pub idempotency_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            linking_window_secs: default_linking_window_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            max_link_attempts: default_max_link_attempts(),
            idempotency_ttl_secs: default_idempotency_ttl_secs(),
        }
    }
}

fn default_linking_window_secs() -> u64 {
    600
}

fn default_session_ttl_secs() -> u64 {
    7200
}

fn default_max_link_attempts() -> u32 {
    5
}

fn default_idempotency_ttl_secs() -> u64 {
    86_400
}

/// Linking code configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LinkingConfig {
    /// Lifetime of an issued code.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,

    /// Collision retries before issuing fails.
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: u32,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl_secs(),
            max_generation_attempts: default_max_generation_attempts(),
        }
    }
}

fn default_code_ttl_secs() -> u64 {
    300
}

fn default_max_generation_attempts() -> u32 {
    8
}

/// Geofence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArrivalConfig {
    /// Radius used when a destination does not set its own.
    #[serde(default = "default_radius_m")]
    pub default_radius_m: f64,

    /// Poll interval advertised to clients while en route.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            default_radius_m: default_radius_m(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_radius_m() -> f64 {
    150.0
}

fn default_poll_interval_secs() -> u64 {
    15
}

/// Redemption code configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RedemptionConfig {
    /// Lifetime of a redemption code after arrival.
    #[serde(default = "default_redemption_ttl_secs")]
    pub code_ttl_secs: u64,

    /// Number of characters in a redemption code.
    #[serde(default = "default_redemption_code_length")]
    pub code_length: usize,
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_redemption_ttl_secs(),
            code_length: default_redemption_code_length(),
        }
    }
}

fn default_redemption_ttl_secs() -> u64 {
    1800
}

fn default_redemption_code_length() -> usize {
    10
}

/// Order release dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Delay before the first dispatch retry.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound on the retry delay.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Dispatch attempts before giving up on an order.
    #[serde(default = "default_max_dispatch_attempts")]
    pub max_dispatch_attempts: u32,

    /// Interval of the dispatch/fulfillment background loop.
    #[serde(default = "default_fulfillment_poll_secs")]
    pub fulfillment_poll_secs: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_dispatch_attempts: default_max_dispatch_attempts(),
            fulfillment_poll_secs: default_fulfillment_poll_secs(),
        }
    }
}

fn default_base_backoff_ms() -> u64 {
    2_000
}

fn default_max_backoff_ms() -> u64 {
    300_000
}

fn default_max_dispatch_attempts() -> u32 {
    8
}

fn default_fulfillment_poll_secs() -> u64 {
    20
}

/// Background sweeper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweeperConfig {
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,

    /// Sessions expired per pass.
    #[serde(default = "default_sweep_batch_size")]
    pub batch_size: usize,

    /// How long consumed or expired linking codes are kept for audit.
    #[serde(default = "default_linking_code_retention_secs")]
    pub linking_code_retention_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
            batch_size: default_sweep_batch_size(),
            linking_code_retention_secs: default_linking_code_retention_secs(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    30
}

fn default_sweep_batch_size() -> usize {
    100
}

fn default_linking_code_retention_secs() -> u64 {
    86_400
}

/// HTTP collaborator endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// URL receiving release notices. `None` logs notices instead.
    #[serde(default)]
    pub notify_url: Option<String>,

    /// Base URL of the fulfillment-status service. `None` disables polling.
    #[serde(default)]
    pub fulfillment_url: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            notify_url: None,
            fulfillment_url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

/// A destination entry under `[[destinations]]`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DestinationConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Geofence radius; falls back to `arrival.default_radius_m`.
    #[serde(default)]
    pub radius_m: Option<f64>,

    /// Walk time from the geofence edge to hand-off.
    #[serde(default)]
    pub approach_secs: Option<u64>,

    /// Recipient address passed to the notifier.
    #[serde(default)]
    pub recipient: String,
}

impl DestinationConfig {
    pub fn to_destination(&self) -> Destination {
        Destination {
            id: self.id.clone(),
            name: if self.name.is_empty() {
                self.id.clone()
            } else {
                self.name.clone()
            },
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius_m,
            approach_secs: self.approach_secs,
            recipient: if self.recipient.is_empty() {
                self.id.clone()
            } else {
                self.recipient.clone()
            },
        }
    }
}

impl SessionConfig {
    pub fn linking_window(&self) -> Duration {
        Duration::from_secs(self.linking_window_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CurbsideConfig::default();
        assert_eq!(config.session.linking_window_secs, 600);
        assert_eq!(config.session.max_link_attempts, 5);
        assert_eq!(config.linking.code_ttl_secs, 300);
        assert_eq!(config.arrival.default_radius_m, 150.0);
        assert_eq!(config.redemption.code_length, 10);
        assert_eq!(config.release.max_dispatch_attempts, 8);
        assert!(config.gateway.bearer_token.is_none());
        assert!(config.destinations.is_empty());
    }

    #[test]
    fn destination_rejects_unknown_fields() {
        let toml_str = r#"
[[destinations]]
id = "d1"
latitude = 1.0
longitude = 2.0
radius = 50.0
"#;
        assert!(toml::from_str::<CurbsideConfig>(toml_str).is_err());
    }

    #[test]
    fn destination_name_and_recipient_default_to_id() {
        let entry = DestinationConfig {
            id: "store-12".into(),
            name: String::new(),
            latitude: 30.0,
            longitude: -97.0,
            radius_m: None,
            approach_secs: Some(90),
            recipient: String::new(),
        };
        let destination = entry.to_destination();
        assert_eq!(destination.name, "store-12");
        assert_eq!(destination.recipient, "store-12");
        assert_eq!(destination.approach_secs, Some(90));
    }
}
