// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the coordinator's collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod fulfillment;
pub mod notification;
pub mod storage;

pub use adapter::PluginAdapter;
pub use fulfillment::FulfillmentAdapter;
pub use notification::NotificationAdapter;
pub use storage::StorageAdapter;
