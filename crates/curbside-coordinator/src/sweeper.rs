// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic expiry and purge pass.

use std::sync::Arc;
use std::time::Duration;

use curbside_core::CurbsideError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::coordinator::ArrivalCoordinator;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub expired: usize,
    pub idempotency_purged: u64,
    pub linking_codes_purged: u64,
}

/// Expires overdue sessions through the same compare-and-swap path requests
/// use, then purges stale idempotency records and linking codes.
pub struct Sweeper {
    coordinator: Arc<ArrivalCoordinator>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(coordinator: Arc<ArrivalCoordinator>, interval: Duration) -> Self {
        Self {
            coordinator,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    pub async fn run_once(&self) -> Result<SweepReport, CurbsideError> {
        let expired = self.coordinator.expire_due_sessions().await?;
        let purged = self.coordinator.purge().await?;
        let report = SweepReport {
            expired,
            idempotency_purged: purged.idempotency_records,
            linking_codes_purged: purged.linking_codes,
        };
        if report != SweepReport::default() {
            info!(
                expired = report.expired,
                idempotency_purged = report.idempotency_purged,
                linking_codes_purged = report.linking_codes_purged,
                "sweep complete"
            );
        }
        Ok(report)
    }

    /// Sweeps every `interval` until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "sweeper started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tick.tick() => {
                    if let Err(err) = self.run_once().await {
                        error!(error = %err, "sweep failed");
                    }
                }
            }
        }
        info!("sweeper stopped");
    }
}
