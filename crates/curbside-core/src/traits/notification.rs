// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification dispatcher for destination-side recipients (SMS, push, dashboard).

use async_trait::async_trait;

use crate::error::CurbsideError;
use crate::order::{DispatchReceipt, ReleaseNotice};
use crate::traits::adapter::PluginAdapter;
use crate::types::Destination;

/// Delivers release notices to a destination.
///
/// Failures are reported as [`CurbsideError::Dispatch`] with `retryable` set
/// when the caller should try again later.
#[async_trait]
pub trait NotificationAdapter: PluginAdapter {
    async fn dispatch(
        &self,
        destination: &Destination,
        notice: &ReleaseNotice,
    ) -> Result<DispatchReceipt, CurbsideError>;
}
