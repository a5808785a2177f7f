// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fulfillment-status lookups over HTTP.
//!
//! `GET {base}/orders/{reference}` answers `{"status": "preparing" | "ready"}`.
//! A 404 or an unrecognised status reads as [`FulfillmentStatus::Unknown`].

use std::time::Duration;

use async_trait::async_trait;
use curbside_core::{
    AdapterType, CurbsideError, FulfillmentAdapter, FulfillmentStatus, HealthStatus, PluginAdapter,
};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::client;

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

fn parse_status(value: &str) -> FulfillmentStatus {
    match value.trim().to_ascii_lowercase().as_str() {
        "ready" => FulfillmentStatus::Ready,
        "preparing" | "in_progress" | "queued" => FulfillmentStatus::Preparing,
        _ => FulfillmentStatus::Unknown,
    }
}

#[derive(Debug, Clone)]
pub struct WebhookFulfillment {
    client: reqwest::Client,
    base: reqwest::Url,
    timeout: Duration,
}

impl WebhookFulfillment {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CurbsideError> {
        Ok(Self {
            client: client::build_client(timeout)?,
            base: client::parse_url("fulfillment_url", base_url)?,
            timeout,
        })
    }

    fn order_url(&self, reference: &str) -> Result<reqwest::Url, CurbsideError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CurbsideError::Config("webhook.fulfillment_url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["orders", reference]);
        Ok(url)
    }
}

#[async_trait]
impl PluginAdapter for WebhookFulfillment {
    fn name(&self) -> &str {
        "webhook-fulfillment"
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
impl FulfillmentAdapter for WebhookFulfillment {
    async fn get_status(&self, order_reference: &str) -> Result<FulfillmentStatus, CurbsideError> {
        let response = self
            .client
            .get(self.order_url(order_reference)?)
            .send()
            .await
            .map_err(|e| client::transport_error(e, self.timeout))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(FulfillmentStatus::Unknown),
            status if status.is_success() => {
                let body: StatusBody =
                    response.json().await.map_err(|e| CurbsideError::Dispatch {
                        message: format!("malformed fulfillment status: {e}"),
                        retryable: false,
                        source: Some(Box::new(e)),
                    })?;
                Ok(parse_status(&body.status))
            }
            _ => Err(client::status_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn fulfillment(server: &MockServer) -> WebhookFulfillment {
        WebhookFulfillment::new(&format!("{}/api/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn reads_ready_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders/ORD-1001"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "READY"})),
            )
            .mount(&server)
            .await;

        let status = fulfillment(&server).get_status("ORD-1001").await.unwrap();
        assert_eq!(status, FulfillmentStatus::Ready);
    }

    #[tokio::test]
    async fn reference_is_a_single_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders/a%2Fb"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "preparing"})),
            )
            .mount(&server)
            .await;

        let status = fulfillment(&server).get_status("a/b").await.unwrap();
        assert_eq!(status, FulfillmentStatus::Preparing);
    }

    #[tokio::test]
    async fn missing_order_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let status = fulfillment(&server).get_status("ORD-404").await.unwrap();
        assert_eq!(status, FulfillmentStatus::Unknown);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = fulfillment(&server).get_status("ORD-1").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn unrecognised_status_is_unknown() {
        assert_eq!(parse_status("ready"), FulfillmentStatus::Ready);
        assert_eq!(parse_status("in_progress"), FulfillmentStatus::Preparing);
        assert_eq!(parse_status("picked_up"), FulfillmentStatus::Unknown);
    }
}
