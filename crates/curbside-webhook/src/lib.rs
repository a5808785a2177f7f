// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP collaborators for Curbside.
//!
//! Builds the notification and fulfillment adapters from `[webhook]`
//! configuration. Without a `notify_url` notices are only logged; without a
//! `fulfillment_url` readiness is never polled.

mod client;
pub mod fulfillment;
pub mod notifier;

use std::sync::Arc;

use curbside_config::model::WebhookConfig;
use curbside_core::{CurbsideError, FulfillmentAdapter, NotificationAdapter};
use tracing::info;

pub use fulfillment::WebhookFulfillment;
pub use notifier::{LoggingNotifier, WebhookNotifier};

/// The notifier selected by `config`.
pub fn notifier_from_config(
    config: &WebhookConfig,
) -> Result<Arc<dyn NotificationAdapter>, CurbsideError> {
    match &config.notify_url {
        Some(url) => {
            info!("release notices delivered by webhook");
            Ok(Arc::new(WebhookNotifier::new(url, config.timeout())?))
        }
        None => {
            info!("no webhook.notify_url configured, release notices will be logged");
            Ok(Arc::new(LoggingNotifier))
        }
    }
}

/// The fulfillment adapter selected by `config`, if any.
pub fn fulfillment_from_config(
    config: &WebhookConfig,
) -> Result<Option<Arc<dyn FulfillmentAdapter>>, CurbsideError> {
    config
        .fulfillment_url
        .as_deref()
        .map(|url| {
            WebhookFulfillment::new(url, config.timeout())
                .map(|f| Arc::new(f) as Arc<dyn FulfillmentAdapter>)
        })
        .transpose()
}
