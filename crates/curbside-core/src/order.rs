// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queued fulfillment order held until the owning session arrives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::SessionId;

/// Lifecycle state of a queued order. Status only ever advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Queued,
    Released,
    Acknowledged,
    Ready,
    Completed,
    Canceled,
}

impl OrderStatus {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Queued, Released)
                | (Queued, Canceled)
                | (Released, Acknowledged)
                | (Released, Ready)
                | (Released, Completed)
                | (Released, Canceled)
                | (Acknowledged, Ready)
                | (Acknowledged, Completed)
                | (Acknowledged, Canceled)
                | (Ready, Completed)
                | (Ready, Canceled)
        )
    }

    /// Statuses after release that may still be completed by redemption.
    pub const RELEASED: [OrderStatus; 3] = [
        OrderStatus::Released,
        OrderStatus::Acknowledged,
        OrderStatus::Ready,
    ];
}

/// Client request to hold an order until arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Reference understood by the destination-side fulfillment system.
    pub reference: String,
    /// Preparation lead time the destination needs.
    pub lead_time_secs: u64,
}

/// When and how an order is released on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleasePlan {
    pub release_at: DateTime<Utc>,
    pub estimated_ready_at: DateTime<Utc>,
    /// Lead time fits inside the remaining approach; an earlier release
    /// would have been possible with a pre-arrival signal.
    pub lead_within_approach: bool,
}

/// An order held by the release coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedOrder {
    pub id: String,
    pub session_id: SessionId,
    pub destination_id: String,
    pub reference: String,
    pub lead_time_secs: u64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub release_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub dispatch_attempts: u32,
    /// Next dispatch retry; `None` when delivered or retries are exhausted.
    pub next_dispatch_at: Option<DateTime<Utc>>,
    pub last_dispatch_error: Option<String>,
}

/// Status reported by the destination-side fulfillment system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Preparing,
    Ready,
    Unknown,
}

/// Message handed to the notification collaborator when an order is released.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotice {
    pub order_id: String,
    pub order_reference: String,
    pub session_id: SessionId,
    pub destination_id: String,
    pub recipient: String,
    pub message: String,
    pub released_at: DateTime<Utc>,
    pub estimated_ready_at: Option<DateTime<Utc>>,
}

/// Acknowledgement returned by a successful dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    /// Collaborator-side reference for the delivered message, if any.
    #[serde(default)]
    pub reference: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_only_leaves_via_release_or_cancel() {
        assert!(OrderStatus::Queued.can_advance_to(OrderStatus::Released));
        assert!(OrderStatus::Queued.can_advance_to(OrderStatus::Canceled));
        assert!(!OrderStatus::Queued.can_advance_to(OrderStatus::Acknowledged));
        assert!(!OrderStatus::Queued.can_advance_to(OrderStatus::Completed));
    }

    #[test]
    fn status_never_moves_backwards() {
        assert!(!OrderStatus::Ready.can_advance_to(OrderStatus::Released));
        assert!(!OrderStatus::Completed.can_advance_to(OrderStatus::Ready));
        assert!(!OrderStatus::Canceled.can_advance_to(OrderStatus::Released));
    }

    #[test]
    fn released_orders_can_still_be_canceled() {
        for status in OrderStatus::RELEASED {
            assert!(status.can_advance_to(OrderStatus::Canceled), "{status}");
        }
        assert!(!OrderStatus::Completed.can_advance_to(OrderStatus::Canceled));
    }
}
