// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Curbside arrival coordinator.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single writer
//! thread via `tokio-rusqlite`. Session transitions are compare-and-swap
//! writes on `(state, version)`; a linking-code consumption, a session
//! update and an order status change commit together or not at all.

pub mod adapter;
pub mod database;
pub mod migrations;
mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
