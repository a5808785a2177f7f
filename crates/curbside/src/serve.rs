// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `curbside serve`: the gateway plus the background loops.

use std::sync::Arc;

use curbside_config::CurbsideConfig;
use curbside_coordinator::{ArrivalCoordinator, CoordinatorPolicy, Sweeper};
use curbside_core::{CurbsideError, StorageAdapter, SystemClock};
use curbside_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};
use curbside_storage::SqliteStore;
use tracing::{info, warn};

use crate::shutdown;

/// Opens the store, seeds configured destinations and wires the coordinator
/// to the collaborators named in `config`.
pub(crate) async fn open_coordinator(
    config: &CurbsideConfig,
) -> Result<(Arc<SqliteStore>, Arc<ArrivalCoordinator>), CurbsideError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    for entry in &config.destinations {
        store.upsert_destination(&entry.to_destination()).await?;
    }
    info!(
        path = %config.storage.database_path,
        destinations = config.destinations.len(),
        "store ready"
    );

    let notifier = curbside_webhook::notifier_from_config(&config.webhook)?;
    let fulfillment = curbside_webhook::fulfillment_from_config(&config.webhook)?;

    let coordinator = Arc::new(ArrivalCoordinator::new(
        store.clone(),
        notifier,
        fulfillment,
        Arc::new(SystemClock),
        CoordinatorPolicy::from(config),
    ));
    Ok((store, coordinator))
}

/// Runs until SIGINT/SIGTERM, then stops the loops and checkpoints the store.
pub async fn run_serve(config: CurbsideConfig) -> Result<(), CurbsideError> {
    init_tracing(&config.service.log_level);
    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        "starting curbside"
    );

    let (store, coordinator) = open_coordinator(&config).await?;
    let cancel = shutdown::install_signal_handler();
    let policy = coordinator.policy().clone();

    let release_task = tokio::spawn(
        coordinator
            .release()
            .run(cancel.clone(), policy.fulfillment_poll),
    );
    let sweeper_task = tokio::spawn(
        Sweeper::new(coordinator.clone(), policy.sweep_interval).run(cancel.clone()),
    );

    let state = GatewayState::new(
        coordinator,
        AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
    );
    let served = start_server(&ServerConfig::from(&config.gateway), state, cancel.clone()).await;

    // The server also returns early when binding fails.
    cancel.cancel();
    for task in [release_task, sweeper_task] {
        if let Err(err) = task.await {
            warn!(error = %err, "background task did not stop cleanly");
        }
    }

    store.close().await?;
    info!("curbside stopped");
    served
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("curbside={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(dir: &tempfile::TempDir) -> CurbsideConfig {
        let path = dir.path().join("curbside.db");
        let toml = format!(
            r#"
[storage]
database_path = "{}"

[[destinations]]
id = "store-12"
latitude = 30.0
longitude = -97.0
"#,
            path.display()
        );
        curbside_config::load_and_validate_str(&toml).unwrap()
    }

    #[tokio::test]
    async fn open_coordinator_seeds_destinations() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = config_for(&dir);

        let (store, coordinator) = open_coordinator(&config).await.unwrap();
        let destination = store.get_destination("store-12").await.unwrap().unwrap();
        assert_eq!(destination.recipient, "store-12");
        assert_eq!(coordinator.policy().default_radius_m, 150.0);
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopening_keeps_destinations_current() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config_for(&dir);

        let (store, _) = open_coordinator(&config).await.unwrap();
        store.close().await.unwrap();
        drop(store);

        config.destinations[0].radius_m = Some(60.0);
        let (store, _) = open_coordinator(&config).await.unwrap();
        let destination = store.get_destination("store-12").await.unwrap().unwrap();
        assert_eq!(destination.radius_m, Some(60.0));
    }
}
