// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fulfillment-status lookup for released orders.

use async_trait::async_trait;

use crate::error::CurbsideError;
use crate::order::FulfillmentStatus;
use crate::traits::adapter::PluginAdapter;

/// Reports whether a released order is still preparing or ready.
#[async_trait]
pub trait FulfillmentAdapter: PluginAdapter {
    async fn get_status(&self, order_reference: &str) -> Result<FulfillmentStatus, CurbsideError>;
}
