// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session record and its explicit lifecycle state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::{Anchor, SessionId};

/// Lifecycle state of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Pending,
    Linked,
    EnRoute,
    Arrived,
    Completed,
    Expired,
    Canceled,
}

impl SessionState {
    /// Every state, in lifecycle order.
    pub const ALL: [SessionState; 7] = [
        SessionState::Pending,
        SessionState::Linked,
        SessionState::EnRoute,
        SessionState::Arrived,
        SessionState::Completed,
        SessionState::Expired,
        SessionState::Canceled,
    ];

    /// Non-terminal states count toward the one-active-session-per-destination rule.
    pub const ACTIVE: [SessionState; 4] = [
        SessionState::Pending,
        SessionState::Linked,
        SessionState::EnRoute,
        SessionState::Arrived,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Expired | SessionState::Canceled
        )
    }

    /// Whether a redemption code may exist (and be shown) in this state.
    pub fn redemption_visible(self) -> bool {
        matches!(self, SessionState::Arrived | SessionState::Completed)
    }
}

/// Why a session was forced to `EXPIRED`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    LinkingWindow,
    SessionTtl,
    RedemptionTtl,
    LinkAttemptsExhausted,
}

/// A redemption code. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedemptionCode(String);

impl RedemptionCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for RedemptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RedemptionCode([redacted])")
    }
}

/// Redemption code issued on arrival, with its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub code: RedemptionCode,
    pub expires_at: DateTime<Utc>,
}

/// Timestamps at which the session entered each post-initial state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTimestamps {
    pub linked_at: Option<DateTime<Utc>>,
    pub en_route_at: Option<DateTime<Utc>>,
    pub arrived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl StateTimestamps {
    /// Records entry into `state`. `PENDING` has no slot (it is `created_at`).
    pub fn record(&mut self, state: SessionState, at: DateTime<Utc>) {
        let slot = match state {
            SessionState::Pending => return,
            SessionState::Linked => &mut self.linked_at,
            SessionState::EnRoute => &mut self.en_route_at,
            SessionState::Arrived => &mut self.arrived_at,
            SessionState::Completed => &mut self.completed_at,
            SessionState::Expired => &mut self.expired_at,
            SessionState::Canceled => &mut self.canceled_at,
        };
        *slot = Some(at);
    }

    pub fn entered(&self, state: SessionState) -> Option<DateTime<Utc>> {
        match state {
            SessionState::Pending => None,
            SessionState::Linked => self.linked_at,
            SessionState::EnRoute => self.en_route_at,
            SessionState::Arrived => self.arrived_at,
            SessionState::Completed => self.completed_at,
            SessionState::Expired => self.expired_at,
            SessionState::Canceled => self.canceled_at,
        }
    }
}

/// The central arrival session entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub idempotency_key: String,
    pub actor_id: String,
    pub destination_id: String,
    /// Anchor snapshot taken when the session was created.
    pub anchor: Anchor,
    pub state: SessionState,
    /// Incremented on every committed mutation; part of the CAS guard.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub timestamps: StateTimestamps,
    /// Deadline of the current state; `None` once terminal.
    pub deadline: Option<DateTime<Utc>>,
    pub link_attempts: u32,
    pub redemption: Option<Redemption>,
    pub expiry_reason: Option<ExpiryReason>,
}

impl Session {
    /// Whether a deadline-driven expiry should fire at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.state.is_terminal() && self.deadline.is_some_and(|deadline| deadline <= now)
    }

    /// When the current state was entered.
    pub fn state_entered_at(&self) -> DateTime<Utc> {
        self.timestamps
            .entered(self.state)
            .unwrap_or(self.created_at)
    }

    /// The redemption, only if the state permits reading it.
    pub fn visible_redemption(&self) -> Option<&Redemption> {
        if self.state.redemption_visible() {
            self.redemption.as_ref()
        } else {
            None
        }
    }
}
