// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linking code record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::SessionId;

/// Metadata describing the channel that requested a linking code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Originating channel, normally `vehicle`.
    pub channel: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Persisted status of a linking code.
///
/// `Active` codes whose expiry has passed are reported as `Expired` by
/// [`LinkingCode::effective_status`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LinkingCodeStatus {
    Active,
    Consumed,
    Expired,
}

/// A short-lived, single-use code binding the vehicle channel to a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingCode {
    pub code: String,
    pub channel: ChannelMetadata,
    pub status: LinkingCodeStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub consumed_by: Option<SessionId>,
}

impl LinkingCode {
    pub fn effective_status(&self, now: DateTime<Utc>) -> LinkingCodeStatus {
        match self.status {
            LinkingCodeStatus::Active if self.expires_at <= now => LinkingCodeStatus::Expired,
            other => other,
        }
    }
}

impl std::fmt::Debug for LinkingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkingCode")
            .field("code", &"[redacted]")
            .field("channel", &self.channel)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("consumed_at", &self.consumed_at)
            .field("consumed_by", &self.consumed_by)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn code(status: LinkingCodeStatus, expires_in: Duration) -> (LinkingCode, DateTime<Utc>) {
        let now = Utc::now();
        (
            LinkingCode {
                code: "ABC-234".into(),
                channel: ChannelMetadata {
                    channel: "vehicle".into(),
                    ..Default::default()
                },
                status,
                created_at: now,
                expires_at: now + expires_in,
                consumed_at: None,
                consumed_by: None,
            },
            now,
        )
    }

    #[test]
    fn active_code_past_expiry_reports_expired() {
        let (c, now) = code(LinkingCodeStatus::Active, Duration::seconds(-1));
        assert_eq!(c.effective_status(now), LinkingCodeStatus::Expired);
    }

    #[test]
    fn consumed_code_stays_consumed_after_expiry() {
        let (c, now) = code(LinkingCodeStatus::Consumed, Duration::seconds(-60));
        assert_eq!(c.effective_status(now), LinkingCodeStatus::Consumed);
    }

    #[test]
    fn debug_hides_code_value() {
        let (c, _) = code(LinkingCodeStatus::Active, Duration::seconds(60));
        assert!(!format!("{c:?}").contains("ABC-234"));
    }
}
