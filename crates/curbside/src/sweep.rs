// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `curbside sweep`: one expiry and purge pass.

use curbside_config::CurbsideConfig;
use curbside_coordinator::Sweeper;
use curbside_core::{CurbsideError, StorageAdapter};

use crate::serve::{init_tracing, open_coordinator};

pub async fn run_sweep(config: CurbsideConfig) -> Result<(), CurbsideError> {
    init_tracing(&config.service.log_level);

    let (store, coordinator) = open_coordinator(&config).await?;
    let interval = coordinator.policy().sweep_interval;
    let report = Sweeper::new(coordinator, interval).run_once().await;
    store.close().await?;
    let report = report?;

    println!(
        "curbside sweep: expired {} session(s), purged {} idempotency record(s) and {} linking code(s)",
        report.expired, report.idempotency_purged, report.linking_codes_purged
    );
    Ok(())
}
