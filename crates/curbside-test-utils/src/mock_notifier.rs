// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification adapter for deterministic testing.
//!
//! `MockNotifier` records every release notice it is handed and can be
//! scripted to fail the next few dispatches.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use curbside_core::{
    AdapterType, CurbsideError, Destination, DispatchReceipt, HealthStatus, NotificationAdapter,
    PluginAdapter, ReleaseNotice,
};

/// A scripted dispatch failure.
#[derive(Debug, Clone)]
pub struct ScriptedFailure {
    pub message: String,
    pub retryable: bool,
}

/// A notifier that captures dispatched notices.
///
/// Queued failures are consumed first, one per dispatch; a failed dispatch
/// is not recorded as delivered.
pub struct MockNotifier {
    delivered: Mutex<Vec<(String, ReleaseNotice)>>,
    failures: Mutex<VecDeque<ScriptedFailure>>,
    attempts: Mutex<usize>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(0),
        }
    }

    /// Fails the next `count` dispatches.
    pub async fn fail_next(&self, count: usize, retryable: bool) {
        let mut failures = self.failures.lock().await;
        for _ in 0..count {
            failures.push_back(ScriptedFailure {
                message: "recipient unavailable".to_string(),
                retryable,
            });
        }
    }

    /// Notices delivered so far, with the destination id they went to.
    pub async fn delivered(&self) -> Vec<(String, ReleaseNotice)> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivered_count(&self) -> usize {
        self.delivered.lock().await.len()
    }

    /// Every dispatch call, including failed ones.
    pub async fn attempts(&self) -> usize {
        *self.attempts.lock().await
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockNotifier {
    fn name(&self) -> &str {
        "mock-notifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, CurbsideError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CurbsideError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationAdapter for MockNotifier {
    async fn dispatch(
        &self,
        destination: &Destination,
        notice: &ReleaseNotice,
    ) -> Result<DispatchReceipt, CurbsideError> {
        *self.attempts.lock().await += 1;
        if let Some(failure) = self.failures.lock().await.pop_front() {
            return Err(CurbsideError::Dispatch {
                message: failure.message,
                retryable: failure.retryable,
                source: None,
            });
        }
        self.delivered
            .lock()
            .await
            .push((destination.id.clone(), notice.clone()));
        Ok(DispatchReceipt {
            reference: Some(format!("mock-{}", uuid::Uuid::new_v4())),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use curbside_core::SessionId;

    use super::*;

    fn destination() -> Destination {
        Destination {
            id: "D".into(),
            name: "Main St".into(),
            latitude: 30.0,
            longitude: -97.0,
            radius_m: None,
            approach_secs: None,
            recipient: "kitchen".into(),
        }
    }

    fn notice() -> ReleaseNotice {
        ReleaseNotice {
            order_id: "o1".into(),
            order_reference: "ORD-1".into(),
            session_id: SessionId("s1".into()),
            destination_id: "D".into(),
            recipient: "kitchen".into(),
            message: "release".into(),
            released_at: Utc::now(),
            estimated_ready_at: None,
        }
    }

    #[tokio::test]
    async fn scripted_failures_come_first() {
        let notifier = MockNotifier::new();
        notifier.fail_next(1, true).await;

        let err = notifier.dispatch(&destination(), &notice()).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(notifier.delivered_count().await, 0);

        notifier.dispatch(&destination(), &notice()).await.unwrap();
        assert_eq!(notifier.delivered_count().await, 1);
        assert_eq!(notifier.attempts().await, 2);
    }
}
