// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for configuration loading.

use curbside_config::diagnostic::ConfigError;
use curbside_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_config_deserializes() {
    let toml = r#"
[service]
name = "curbside-east"
log_level = "debug"

[storage]
database_path = "/tmp/curbside.db"
wal_mode = false

[gateway]
host = "0.0.0.0"
port = 9090
bearer_token = "secret"

[session]
linking_window_secs = 300
session_ttl_secs = 3600
max_link_attempts = 3

[linking]
code_ttl_secs = 120

[arrival]
default_radius_m = 75.0

[redemption]
code_ttl_secs = 900
code_length = 12

[release]
base_backoff_ms = 500
max_backoff_ms = 10000
max_dispatch_attempts = 4

[sweeper]
interval_secs = 5
batch_size = 20

[webhook]
notify_url = "http://localhost:9000/notify"
timeout_secs = 3

[[destinations]]
id = "store-1"
name = "Main Street"
latitude = 40.7128
longitude = -74.0060
radius_m = 120.0
approach_secs = 180
recipient = "kitchen-1"

[[destinations]]
id = "store-2"
latitude = 34.05
longitude = -118.25
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.service.name, "curbside-east");
    assert_eq!(config.storage.database_path, "/tmp/curbside.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.gateway.port, 9090);
    assert_eq!(config.gateway.bearer_token.as_deref(), Some("secret"));
    assert_eq!(config.session.max_link_attempts, 3);
    // Unset keys in a present table keep their defaults.
    assert_eq!(config.session.idempotency_ttl_secs, 86_400);
    assert_eq!(config.linking.max_generation_attempts, 8);
    assert_eq!(config.redemption.code_length, 12);
    assert_eq!(config.release.max_dispatch_attempts, 4);
    assert_eq!(
        config.webhook.notify_url.as_deref(),
        Some("http://localhost:9000/notify")
    );
    assert!(config.webhook.fulfillment_url.is_none());
    assert_eq!(config.destinations.len(), 2);
    assert_eq!(config.destinations[0].approach_secs, Some(180));
    assert_eq!(config.destinations[1].radius_m, None);
    assert_eq!(config.destinations[1].to_destination().name, "store-2");
}

#[test]
fn empty_config_uses_defaults() {
    let config = load_config_from_str("").expect("defaults");
    assert_eq!(config.service.name, "curbside");
    assert_eq!(config.gateway.host, "127.0.0.1");
    assert_eq!(config.session.linking_window_secs, 600);
    assert_eq!(config.session.session_ttl_secs, 7200);
    assert_eq!(config.arrival.poll_interval_secs, 15);
    assert_eq!(config.release.base_backoff_ms, 2_000);
    assert_eq!(config.sweeper.interval_secs, 30);
    assert!(config.storage.wal_mode);
}

#[test]
fn unknown_key_gets_suggestion_and_valid_keys() {
    let toml = r#"
[session]
linking_windw_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "linking_windw_secs"
                && suggestion.as_deref() == Some("linking_window_secs")
                && valid_keys.contains("max_link_attempts")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn unknown_top_level_table_is_rejected() {
    let err = load_config_from_str("[metrics]\nenabled = true\n").expect_err("unknown table");
    let message = err.to_string();
    assert!(
        message.contains("unknown field") || message.contains("metrics"),
        "got: {message}"
    );
}

#[test]
fn destination_without_coordinates_is_missing_key() {
    let toml = r#"
[[destinations]]
id = "store-1"
"#;

    let errors = load_and_validate_str(toml).expect_err("missing latitude");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::MissingKey { key } if key.contains("latitude"))),
        "got: {errors:?}"
    );
}

#[test]
fn wrong_type_is_reported() {
    let err = load_config_from_str("[gateway]\nport = \"eighty\"\n").expect_err("bad type");
    let message = err.to_string();
    assert!(
        message.contains("invalid type") || message.contains("port"),
        "got: {message}"
    );
}

#[test]
fn semantic_errors_are_collected_together() {
    let toml = r#"
[session]
max_link_attempts = 0

[sweeper]
batch_size = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("two validation errors");
    assert!(errors.len() >= 2, "got: {errors:?}");
}

#[test]
fn env_overrides_file_values() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[gateway]
port = 4000

[session]
linking_window_secs = 120
"#,
        )?;
        jail.set_env("CURBSIDE_GATEWAY_PORT", "5000");
        jail.set_env("CURBSIDE_SESSION_MAX_LINK_ATTEMPTS", "2");
        jail.set_env("CURBSIDE_GATEWAY_BEARER_TOKEN", "from-env");

        let path = jail.directory().join("custom.toml");
        let config = load_and_validate_path(&path).map_err(|errors| format!("{errors:?}"))?;
        assert_eq!(config.gateway.port, 5000);
        assert_eq!(config.gateway.bearer_token.as_deref(), Some("from-env"));
        assert_eq!(config.session.linking_window_secs, 120);
        assert_eq!(config.session.max_link_attempts, 2);
        Ok(())
    });
}

#[test]
fn config_error_renders_with_help() {
    use miette::Diagnostic;

    let error = ConfigError::UnknownKey {
        key: "prot".to_string(),
        suggestion: Some("port".to_string()),
        valid_keys: "host, port, bearer_token".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `port`"), "got: {help}");

    let mut buf = String::new();
    miette::GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("renders");
    assert!(buf.contains("prot"));
}
