// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Arrival coordination for Curbside.
//!
//! [`ArrivalCoordinator`] exposes the client operations (start, link, report
//! position, redeem, status, cancel). The building blocks are public so the
//! gateway and tests can reach them directly:
//!
//! - [`machine`]: transition table and deadline policy (pure)
//! - [`geofence`]: haversine arrival predicate (pure)
//! - [`linking`]: linking and redemption code generation
//! - [`idempotency`]: request fingerprinting and replay
//! - [`release`]: order release plan and background dispatch
//! - [`sweeper`]: periodic expiry and purge

pub mod backoff;
pub mod coordinator;
pub mod events;
pub mod geofence;
pub mod idempotency;
pub mod linking;
pub mod machine;
pub mod policy;
pub mod release;
pub mod sweeper;

pub use backoff::{RetryDecision, RetryPolicy};
pub use coordinator::{
    ArrivalCoordinator, IssuedLinkingCode, PositionReport, SessionLookup, SessionStatus,
    StartOutcome, StartSession,
};
pub use events::{EventBus, SessionEvent};
pub use geofence::ArrivalCheck;
pub use policy::{CoordinatorPolicy, DeadlinePolicy};
pub use release::{DispatchReport, OrderReleaseCoordinator};
pub use sweeper::{SweepReport, Sweeper};
