// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Release-notice delivery.
//!
//! [`WebhookNotifier`] POSTs each notice as JSON to a single endpoint, keyed by
//! order id so the receiver can drop duplicates from retries.
//! [`LoggingNotifier`] only logs, for deployments without a webhook.

use std::time::Duration;

use async_trait::async_trait;
use curbside_core::{
    AdapterType, CurbsideError, Destination, DispatchReceipt, HealthStatus, NotificationAdapter,
    PluginAdapter, ReleaseNotice,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client;

#[derive(Debug, Serialize)]
struct NotifyPayload<'a> {
    destination_name: &'a str,
    #[serde(flatten)]
    notice: &'a ReleaseNotice,
}

#[derive(Debug, Default, Deserialize)]
struct NotifyAck {
    #[serde(default)]
    reference: Option<String>,
}

/// Delivers release notices to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: reqwest::Url,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, CurbsideError> {
        Ok(Self {
            client: client::build_client(timeout)?,
            url: client::parse_url("notify_url", url)?,
            timeout,
        })
    }
}

#[async_trait]
impl PluginAdapter for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook-notifier"
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
impl NotificationAdapter for WebhookNotifier {
    async fn dispatch(
        &self,
        destination: &Destination,
        notice: &ReleaseNotice,
    ) -> Result<DispatchReceipt, CurbsideError> {
        let payload = NotifyPayload {
            destination_name: &destination.name,
            notice,
        };
        let response = self
            .client
            .post(self.url.clone())
            .header("idempotency-key", notice.order_id.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(|e| client::transport_error(e, self.timeout))?;

        let status = response.status();
        debug!(status = %status, order_id = %notice.order_id, "release notice response");
        if !status.is_success() {
            return Err(client::status_error(response).await);
        }

        // An empty or non-JSON body is still an acknowledgement.
        let body = response.text().await.unwrap_or_default();
        let ack: NotifyAck = serde_json::from_str(&body).unwrap_or_default();
        Ok(DispatchReceipt {
            reference: ack.reference,
        })
    }
}

/// Logs release notices instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl PluginAdapter for LoggingNotifier {
    fn name(&self) -> &str {
        "logging-notifier"
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
impl NotificationAdapter for LoggingNotifier {
    async fn dispatch(
        &self,
        destination: &Destination,
        notice: &ReleaseNotice,
    ) -> Result<DispatchReceipt, CurbsideError> {
        info!(
            destination_id = %destination.id,
            recipient = %destination.recipient,
            order_id = %notice.order_id,
            order_reference = %notice.order_reference,
            session_id = %notice.session_id,
            "{}",
            notice.message
        );
        Ok(DispatchReceipt::default())
    }
}
