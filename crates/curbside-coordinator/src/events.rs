// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast of committed session state changes.

use chrono::{DateTime, Utc};
use curbside_core::{SessionId, SessionState};
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// A committed state change. `from` is `None` for session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEvent {
    pub session_id: SessionId,
    pub from: Option<SessionState>,
    pub to: SessionState,
    pub at: DateTime<Utc>,
}

/// Fan-out of [`SessionEvent`]s. Slow subscribers miss events; publishers
/// never wait.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        tracing::debug!(
            session_id = %event.session_id,
            from = ?event.from,
            to = %event.to,
            "session state changed"
        );
        // No receivers is fine.
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
