// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock fulfillment-status adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use curbside_core::{
    AdapterType, CurbsideError, FulfillmentAdapter, FulfillmentStatus, HealthStatus,
    PluginAdapter,
};

/// Reports a per-reference status set by the test. Unknown references are
/// still preparing.
#[derive(Default)]
pub struct MockFulfillment {
    statuses: Mutex<HashMap<String, FulfillmentStatus>>,
}

impl MockFulfillment {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_status(&self, reference: &str, status: FulfillmentStatus) {
        self.statuses
            .lock()
            .await
            .insert(reference.to_string(), status);
    }
}

#[async_trait]
impl PluginAdapter for MockFulfillment {
    fn name(&self) -> &str {
        "mock-fulfillment"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Fulfillment
    }

    async fn health_check(&self) -> Result<HealthStatus, CurbsideError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CurbsideError> {
        Ok(())
    }
}

#[async_trait]
impl FulfillmentAdapter for MockFulfillment {
    async fn get_status(&self, order_reference: &str) -> Result<FulfillmentStatus, CurbsideError> {
        Ok(self
            .statuses
            .lock()
            .await
            .get(order_reference)
            .copied()
            .unwrap_or(FulfillmentStatus::Preparing))
    }
}
