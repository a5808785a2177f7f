// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Curbside arrival coordinator.
//!
//! This crate provides the domain types (sessions, linking codes, queued
//! orders), the error taxonomy, the clock seam, and the collaborator traits
//! implemented by the storage, notification and fulfillment adapters.

pub mod clock;
pub mod error;
pub mod linking;
pub mod order;
pub mod session;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::{ConflictKind, CurbsideError, Entity, ErrorKind, ExpiredKind};
pub use linking::{ChannelMetadata, LinkingCode, LinkingCodeStatus};
pub use order::{
    DispatchReceipt, FulfillmentStatus, OrderRequest, OrderStatus, QueuedOrder, ReleaseNotice,
    ReleasePlan,
};
pub use session::{ExpiryReason, Redemption, RedemptionCode, Session, SessionState, StateTimestamps};
pub use types::{AdapterType, Anchor, Destination, HealthStatus, Position, PurgeStats, SessionId};

pub use traits::{FulfillmentAdapter, NotificationAdapter, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Storage,
            AdapterType::Notification,
            AdapterType::Fulfillment,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn destination_anchor_falls_back_to_default_radius() {
        let destination = Destination {
            id: "dest-1".into(),
            name: "Main St".into(),
            latitude: 30.0,
            longitude: -97.0,
            radius_m: None,
            approach_secs: None,
            recipient: "store-1".into(),
        };
        assert_eq!(destination.anchor(150.0).radius_m, 150.0);

        let custom = Destination {
            radius_m: Some(80.0),
            ..destination
        };
        assert_eq!(custom.anchor(150.0).radius_m, 80.0);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_storage_adapter<T: StorageAdapter>() {}
        fn _assert_notification_adapter<T: NotificationAdapter>() {}
        fn _assert_fulfillment_adapter<T: FulfillmentAdapter>() {}
    }
}
