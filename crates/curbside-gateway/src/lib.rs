// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Curbside arrival coordinator.
//!
//! Exposes the coordinator operations as a JSON API behind an optional
//! bearer token, plus an unauthenticated health endpoint.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, ServerConfig, router, start_server};
