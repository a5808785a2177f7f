// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timing and bound parameters derived from configuration.

use chrono::Duration;
use curbside_config::CurbsideConfig;

use crate::backoff::RetryPolicy;

/// Deadlines and bounds applied by the session state machine.
#[derive(Debug, Clone)]
pub struct DeadlinePolicy {
    pub linking_window: Duration,
    pub session_ttl: Duration,
    pub max_link_attempts: u32,
}

/// Everything the coordinator needs from configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorPolicy {
    pub deadlines: DeadlinePolicy,
    pub idempotency_ttl: Duration,
    pub linking_code_ttl: Duration,
    pub max_code_generation_attempts: u32,
    pub default_radius_m: f64,
    pub poll_interval_secs: u64,
    pub redemption_ttl: Duration,
    pub redemption_code_length: usize,
    pub retry: RetryPolicy,
    pub fulfillment_poll: std::time::Duration,
    pub sweep_interval: std::time::Duration,
    pub sweep_batch_size: usize,
    pub linking_code_retention: Duration,
}

const MAX_SECS: u64 = (i64::MAX / 1_000) as u64;

pub(crate) fn secs(value: u64) -> Duration {
    Duration::seconds(value.min(MAX_SECS) as i64)
}

impl From<&CurbsideConfig> for CoordinatorPolicy {
    fn from(config: &CurbsideConfig) -> Self {
        Self {
            deadlines: DeadlinePolicy {
                linking_window: secs(config.session.linking_window_secs),
                session_ttl: secs(config.session.session_ttl_secs),
                max_link_attempts: config.session.max_link_attempts,
            },
            idempotency_ttl: secs(config.session.idempotency_ttl_secs),
            linking_code_ttl: secs(config.linking.code_ttl_secs),
            max_code_generation_attempts: config.linking.max_generation_attempts,
            default_radius_m: config.arrival.default_radius_m,
            poll_interval_secs: config.arrival.poll_interval_secs,
            redemption_ttl: secs(config.redemption.code_ttl_secs),
            redemption_code_length: config.redemption.code_length,
            retry: RetryPolicy {
                base_backoff_ms: config.release.base_backoff_ms,
                max_backoff_ms: config.release.max_backoff_ms,
                max_attempts: config.release.max_dispatch_attempts,
            },
            fulfillment_poll: std::time::Duration::from_secs(config.release.fulfillment_poll_secs),
            sweep_interval: std::time::Duration::from_secs(config.sweeper.interval_secs),
            sweep_batch_size: config.sweeper.batch_size,
            linking_code_retention: secs(config.sweeper.linking_code_retention_secs),
        }
    }
}

impl Default for CoordinatorPolicy {
    fn default() -> Self {
        Self::from(&CurbsideConfig::default())
    }
}
