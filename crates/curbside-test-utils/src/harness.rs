// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end coordinator tests.
//!
//! `TestHarness` assembles an [`ArrivalCoordinator`] over a temp SQLite
//! store (wrapped in [`FaultyStore`]), a [`ManualClock`] and mock
//! collaborators, with one destination seeded.

use std::sync::Arc;

use curbside_config::model::StorageConfig;
use curbside_coordinator::geofence;
use curbside_coordinator::{ArrivalCoordinator, CoordinatorPolicy, StartSession};
use curbside_core::{
    ChannelMetadata, CurbsideError, Destination, OrderRequest, Position, Session, SessionState,
    StorageAdapter,
};
use curbside_storage::SqliteStore;

use crate::clock::ManualClock;
use crate::faulty_store::FaultyStore;
use crate::mock_fulfillment::MockFulfillment;
use crate::mock_notifier::MockNotifier;

/// Opens a migrated SQLite store in a fresh temp directory.
///
/// The directory is removed when the returned guard drops.
pub async fn temp_store() -> Result<(Arc<SqliteStore>, tempfile::TempDir), CurbsideError> {
    let temp_dir =
        tempfile::TempDir::new().map_err(|e| CurbsideError::Storage { source: e.into() })?;
    let store = SqliteStore::new(StorageConfig {
        database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await?;
    Ok((Arc::new(store), temp_dir))
}

/// The destination every harness seeds: (30.0, -97.0), 150 m radius.
pub fn test_destination() -> Destination {
    Destination {
        id: "D".to_string(),
        name: "Congress Ave".to_string(),
        latitude: 30.0,
        longitude: -97.0,
        radius_m: Some(150.0),
        approach_secs: Some(120),
        recipient: "kitchen-d".to_string(),
    }
}

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    policy: CoordinatorPolicy,
    destinations: Vec<Destination>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            policy: CoordinatorPolicy::default(),
            destinations: vec![test_destination()],
        }
    }

    /// Adjusts the coordinator policy.
    pub fn with_policy(mut self, adjust: impl FnOnce(&mut CoordinatorPolicy)) -> Self {
        adjust(&mut self.policy);
        self
    }

    /// Seeds an extra destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destinations.push(destination);
        self
    }

    pub async fn build(self) -> Result<TestHarness, CurbsideError> {
        let (sqlite, temp_dir) = temp_store().await?;
        for destination in &self.destinations {
            sqlite.upsert_destination(destination).await?;
        }
        let store = Arc::new(FaultyStore::new(sqlite));
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(MockNotifier::new());
        let fulfillment = Arc::new(MockFulfillment::new());

        let coordinator = Arc::new(ArrivalCoordinator::new(
            store.clone(),
            notifier.clone(),
            Some(fulfillment.clone()),
            clock.clone(),
            self.policy,
        ));

        Ok(TestHarness {
            coordinator,
            store,
            clock,
            notifier,
            fulfillment,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete coordinator with mock collaborators and temp storage.
pub struct TestHarness {
    pub coordinator: Arc<ArrivalCoordinator>,
    /// The store the coordinator writes through; can inject commit failures.
    pub store: Arc<FaultyStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<MockNotifier>,
    pub fulfillment: Arc<MockFulfillment>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub async fn new() -> Result<Self, CurbsideError> {
        Self::builder().build().await
    }

    /// Starts a session for `actor` at destination `D`.
    pub async fn start(&self, actor: &str, key: &str) -> Result<Session, CurbsideError> {
        self.start_with_order(actor, key, None).await
    }

    pub async fn start_with_order(
        &self,
        actor: &str,
        key: &str,
        order: Option<OrderRequest>,
    ) -> Result<Session, CurbsideError> {
        let outcome = self
            .coordinator
            .start_session(StartSession {
                actor_id: actor.to_string(),
                destination_id: test_destination().id,
                idempotency_key: key.to_string(),
                order,
            })
            .await?;
        Ok(outcome.session)
    }

    /// Issues a linking code on the vehicle channel.
    pub async fn issue_code(&self) -> Result<String, CurbsideError> {
        let issued = self
            .coordinator
            .issue_linking_code(ChannelMetadata {
                channel: "vehicle".to_string(),
                device_id: Some("head-unit-1".to_string()),
                label: None,
            })
            .await?;
        Ok(issued.code)
    }

    /// A session advanced to `LINKED`.
    pub async fn linked_session(&self, actor: &str) -> Result<Session, CurbsideError> {
        let session = self.start(actor, &format!("key-{actor}")).await?;
        let code = self.issue_code().await?;
        self.coordinator.consume_linking_code(&session.id, &code).await
    }

    /// A session advanced to `EN_ROUTE` by a report far from the destination.
    pub async fn en_route_session(&self, actor: &str) -> Result<Session, CurbsideError> {
        let session = self.linked_session(actor).await?;
        let report = self
            .coordinator
            .report_position(&session.id, self.position_from_destination(5_000.0))
            .await?;
        if report.state != SessionState::EnRoute {
            return Err(CurbsideError::Internal(format!(
                "expected EN_ROUTE, got {}",
                report.state
            )));
        }
        self.coordinator
            .store()
            .get_session(&session.id)
            .await?
            .ok_or_else(|| CurbsideError::Internal("session vanished".into()))
    }

    /// A position `meters` due north of the seeded destination.
    pub fn position_from_destination(&self, meters: f64) -> Position {
        let destination = test_destination();
        geofence::offset_north(destination.latitude, destination.longitude, meters)
    }
}
