// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks that serde attributes cannot express.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::CurbsideConfig;

/// Validates a deserialized configuration, collecting every problem.
pub fn validate_config(config: &CurbsideConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let host = config.gateway.host.trim();
    let host_ok = host.parse::<std::net::IpAddr>().is_ok()
        || (!host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'));
    if !host_ok {
        errors.push(ConfigError::validation(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if let Some(token) = &config.gateway.bearer_token {
        if token.trim().is_empty() {
            errors.push(ConfigError::validation(
                "gateway.bearer_token must not be blank; omit it to disable auth",
            ));
        }
    }

    let session = &config.session;
    for (name, value) in [
        ("session.linking_window_secs", session.linking_window_secs),
        ("session.session_ttl_secs", session.session_ttl_secs),
        ("session.idempotency_ttl_secs", session.idempotency_ttl_secs),
        ("linking.code_ttl_secs", config.linking.code_ttl_secs),
        ("redemption.code_ttl_secs", config.redemption.code_ttl_secs),
        ("arrival.poll_interval_secs", config.arrival.poll_interval_secs),
        ("sweeper.interval_secs", config.sweeper.interval_secs),
        ("release.fulfillment_poll_secs", config.release.fulfillment_poll_secs),
        ("webhook.timeout_secs", config.webhook.timeout_secs),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!("{name} must be positive")));
        }
    }

    if session.session_ttl_secs < session.linking_window_secs {
        errors.push(ConfigError::validation(format!(
            "session.session_ttl_secs ({}) must not be shorter than session.linking_window_secs ({})",
            session.session_ttl_secs, session.linking_window_secs
        )));
    }

    if session.max_link_attempts == 0 {
        errors.push(ConfigError::validation(
            "session.max_link_attempts must be at least 1",
        ));
    }

    if config.linking.max_generation_attempts == 0 {
        errors.push(ConfigError::validation(
            "linking.max_generation_attempts must be at least 1",
        ));
    }

    if !(8..=32).contains(&config.redemption.code_length) {
        errors.push(ConfigError::validation(format!(
            "redemption.code_length must be between 8 and 32, got {}",
            config.redemption.code_length
        )));
    }

    if !positive_finite(config.arrival.default_radius_m) {
        errors.push(ConfigError::validation(format!(
            "arrival.default_radius_m must be a positive number, got {}",
            config.arrival.default_radius_m
        )));
    }

    let release = &config.release;
    if release.base_backoff_ms == 0 || release.max_backoff_ms < release.base_backoff_ms {
        errors.push(ConfigError::validation(format!(
            "release backoff must satisfy 0 < base_backoff_ms ({}) <= max_backoff_ms ({})",
            release.base_backoff_ms, release.max_backoff_ms
        )));
    }
    if release.max_dispatch_attempts == 0 {
        errors.push(ConfigError::validation(
            "release.max_dispatch_attempts must be at least 1",
        ));
    }

    if config.sweeper.batch_size == 0 {
        errors.push(ConfigError::validation("sweeper.batch_size must be at least 1"));
    }

    for url in [&config.webhook.notify_url, &config.webhook.fulfillment_url]
        .into_iter()
        .flatten()
    {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "webhook URL `{url}` must start with http:// or https://"
            )));
        }
    }

    let mut seen = HashSet::new();
    for (i, destination) in config.destinations.iter().enumerate() {
        if destination.id.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "destinations[{i}].id must not be empty"
            )));
        } else if !seen.insert(destination.id.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate destination id `{}` in [[destinations]]",
                destination.id
            )));
        }
        if !(-90.0..=90.0).contains(&destination.latitude) {
            errors.push(ConfigError::validation(format!(
                "destinations[{i}].latitude must be within [-90, 90], got {}",
                destination.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&destination.longitude) {
            errors.push(ConfigError::validation(format!(
                "destinations[{i}].longitude must be within [-180, 180], got {}",
                destination.longitude
            )));
        }
        if let Some(radius) = destination.radius_m {
            if !positive_finite(radius) {
                errors.push(ConfigError::validation(format!(
                    "destinations[{i}].radius_m must be a positive number, got {radius}"
                )));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DestinationConfig;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    fn destination(id: &str) -> DestinationConfig {
        DestinationConfig {
            id: id.to_string(),
            name: String::new(),
            latitude: 40.0,
            longitude: -74.0,
            radius_m: None,
            approach_secs: None,
            recipient: String::new(),
        }
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CurbsideConfig::default()).is_ok());
    }

    #[test]
    fn ttl_shorter_than_linking_window_is_rejected() {
        let mut config = CurbsideConfig::default();
        config.session.session_ttl_secs = 60;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "session_ttl_secs"));
    }

    #[test]
    fn inverted_backoff_is_rejected() {
        let mut config = CurbsideConfig::default();
        config.release.max_backoff_ms = 100;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "backoff"));
    }

    #[test]
    fn duplicate_destinations_are_rejected() {
        let mut config = CurbsideConfig::default();
        config.destinations = vec![destination("d1"), destination("d1")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "duplicate destination id `d1`"));
    }

    #[test]
    fn out_of_range_destination_is_rejected() {
        let mut config = CurbsideConfig::default();
        let mut bad = destination("d1");
        bad.latitude = 91.0;
        bad.radius_m = Some(-3.0);
        config.destinations = vec![bad];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "latitude"));
        assert!(has_message(&errors, "radius_m"));
    }

    #[test]
    fn non_http_webhook_is_rejected() {
        let mut config = CurbsideConfig::default();
        config.webhook.notify_url = Some("ftp://example.com".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "ftp://example.com"));
    }

    #[test]
    fn blank_bearer_token_is_rejected() {
        let mut config = CurbsideConfig::default();
        config.gateway.bearer_token = Some("  ".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "bearer_token"));
    }
}
