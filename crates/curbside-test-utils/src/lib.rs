// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Curbside integration tests.
//!
//! Provides mock collaborators, a manual clock and a harness for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`ManualClock`] - Clock advanced explicitly by the test
//! - [`MockNotifier`] - Records release notices; scripted failures
//! - [`MockFulfillment`] - Per-reference fulfillment status
//! - [`FaultyStore`] - Store wrapper that injects commit failures
//! - [`TestHarness`] - Coordinator over a temp SQLite store

pub mod clock;
pub mod faulty_store;
pub mod harness;
pub mod mock_fulfillment;
pub mod mock_notifier;

pub use clock::ManualClock;
pub use faulty_store::FaultyStore;
pub use harness::{TestHarness, temp_store, test_destination};
pub use mock_fulfillment::MockFulfillment;
pub use mock_notifier::MockNotifier;
