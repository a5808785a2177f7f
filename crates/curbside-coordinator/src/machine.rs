// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session transition table and deadline policy.
//!
//! Everything here is pure: a transition takes the current record and
//! returns the next one. Persisting it (conditioned on the old state and
//! version) is the coordinator's job.
//!
//! ```text
//! PENDING -> LINKED -> EN_ROUTE -> ARRIVED -> COMPLETED
//!    \          \          \          \
//!     +----------+----------+----------+--> EXPIRED | CANCELED
//! ```

use chrono::{DateTime, Utc};
use curbside_core::{
    ConflictKind, CurbsideError, ExpiryReason, Redemption, Session, SessionState,
};

use crate::policy::DeadlinePolicy;

/// A requested change to a session.
#[derive(Debug, Clone)]
pub enum Transition {
    /// A linking code naming this session was consumed.
    Link,
    /// First position report after linking.
    StartRoute,
    /// Position inside the geofence. Carries the code issued with it.
    Arrive(Redemption),
    /// Downstream redemption confirmed.
    Complete,
    /// A failed linking attempt. Expires the session once the bound is exceeded.
    FailedLinkAttempt,
    Expire(ExpiryReason),
    Cancel,
}

impl Transition {
    fn name(&self) -> &'static str {
        match self {
            Transition::Link => "link",
            Transition::StartRoute => "start route",
            Transition::Arrive(_) => "arrive",
            Transition::Complete => "complete",
            Transition::FailedLinkAttempt => "record a linking attempt on",
            Transition::Expire(_) => "expire",
            Transition::Cancel => "cancel",
        }
    }
}

/// The state `transition` leads to from `from`, or `None` if it is not allowed.
pub fn target(from: SessionState, transition: &Transition) -> Option<SessionState> {
    use SessionState::*;
    match (from, transition) {
        (Pending, Transition::Link) => Some(Linked),
        (Linked, Transition::StartRoute) => Some(EnRoute),
        (EnRoute, Transition::Arrive(_)) => Some(Arrived),
        (Arrived, Transition::Complete) => Some(Completed),
        (Pending, Transition::FailedLinkAttempt) => Some(Pending),
        (state, Transition::Expire(_)) if !state.is_terminal() => Some(Expired),
        (state, Transition::Cancel) if !state.is_terminal() => Some(Canceled),
        _ => None,
    }
}

/// Deadline for the session's current state.
pub fn deadline(session: &Session, policy: &DeadlinePolicy) -> Option<DateTime<Utc>> {
    let ttl_end = session.created_at + policy.session_ttl;
    match session.state {
        SessionState::Pending => Some(session.created_at + policy.linking_window),
        SessionState::Linked => {
            let linked_at = session.timestamps.linked_at.unwrap_or(session.created_at);
            Some((linked_at + policy.linking_window).min(ttl_end))
        }
        SessionState::EnRoute => Some(ttl_end),
        SessionState::Arrived => session.redemption.as_ref().map(|r| r.expires_at),
        SessionState::Completed | SessionState::Expired | SessionState::Canceled => None,
    }
}

/// Why the session must expire at `now`, if its deadline has passed.
pub fn due_expiry(
    session: &Session,
    now: DateTime<Utc>,
    policy: &DeadlinePolicy,
) -> Option<ExpiryReason> {
    if !session.is_due(now) {
        return None;
    }
    Some(match session.state {
        SessionState::Pending => ExpiryReason::LinkingWindow,
        SessionState::Linked => {
            let linked_at = session.timestamps.linked_at.unwrap_or(session.created_at);
            if linked_at + policy.linking_window <= session.created_at + policy.session_ttl {
                ExpiryReason::LinkingWindow
            } else {
                ExpiryReason::SessionTtl
            }
        }
        SessionState::Arrived => ExpiryReason::RedemptionTtl,
        _ => ExpiryReason::SessionTtl,
    })
}

fn step(
    mut session: Session,
    transition: Transition,
    at: DateTime<Utc>,
    policy: &DeadlinePolicy,
) -> Result<Session, CurbsideError> {
    let from = session.state;
    let Some(mut to) = target(from, &transition) else {
        return Err(CurbsideError::conflict(
            ConflictKind::WrongState,
            format!("cannot {} a session in state {from}", transition.name()),
        ));
    };

    match transition {
        Transition::Arrive(redemption) => session.redemption = Some(redemption),
        Transition::FailedLinkAttempt => {
            session.link_attempts = session.link_attempts.saturating_add(1);
            if session.link_attempts > policy.max_link_attempts {
                to = SessionState::Expired;
                session.expiry_reason = Some(ExpiryReason::LinkAttemptsExhausted);
            }
        }
        Transition::Expire(reason) => session.expiry_reason = Some(reason),
        Transition::Link | Transition::StartRoute | Transition::Complete | Transition::Cancel => {}
    }

    if to != from {
        session.state = to;
        session.timestamps.record(to, at);
    }
    session.deadline = deadline(&session, policy);
    Ok(session)
}

/// Applies `transitions` in order and returns the record to commit.
///
/// The result carries `version + 1` regardless of how many transitions were
/// chained, since it is written in a single compare-and-swap.
pub fn apply(
    session: &Session,
    transitions: impl IntoIterator<Item = Transition>,
    at: DateTime<Utc>,
    policy: &DeadlinePolicy,
) -> Result<Session, CurbsideError> {
    let mut next = session.clone();
    for transition in transitions {
        next = step(next, transition, at, policy)?;
    }
    next.version = session.version + 1;
    next.updated_at = at;
    Ok(next)
}

/// States entered by a committed change, in order. Used for event fan-out.
pub fn entered_states(before: &Session, after: &Session) -> Vec<SessionState> {
    SessionState::ALL
        .into_iter()
        .filter(|state| *state != before.state)
        .filter(|state| {
            before.timestamps.entered(*state).is_none() && after.timestamps.entered(*state).is_some()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use curbside_core::{Anchor, RedemptionCode, SessionId, StateTimestamps};

    use super::*;

    fn policy() -> DeadlinePolicy {
        DeadlinePolicy {
            linking_window: Duration::minutes(10),
            session_ttl: Duration::hours(2),
            max_link_attempts: 3,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap()
    }

    fn pending() -> Session {
        let mut session = Session {
            id: SessionId("s1".into()),
            idempotency_key: "K1".into(),
            actor_id: "driver-1".into(),
            destination_id: "D".into(),
            anchor: Anchor {
                latitude: 30.0,
                longitude: -97.0,
                radius_m: 150.0,
            },
            state: SessionState::Pending,
            version: 0,
            created_at: t0(),
            updated_at: t0(),
            timestamps: StateTimestamps::default(),
            deadline: None,
            link_attempts: 0,
            redemption: None,
            expiry_reason: None,
        };
        session.deadline = deadline(&session, &policy());
        session
    }

    fn redemption(at: DateTime<Utc>) -> Redemption {
        Redemption {
            code: RedemptionCode::new("K7P2M9XQ4R"),
            expires_at: at + Duration::minutes(30),
        }
    }

    #[test]
    fn happy_path_walks_the_table() {
        let p = policy();
        let s = pending();
        assert_eq!(s.deadline, Some(t0() + Duration::minutes(10)));

        let linked = apply(&s, [Transition::Link], t0() + Duration::minutes(1), &p).unwrap();
        assert_eq!(linked.state, SessionState::Linked);
        assert_eq!(linked.version, 1);
        assert_eq!(linked.deadline, Some(t0() + Duration::minutes(11)));

        let at = t0() + Duration::minutes(5);
        let arrived = apply(
            &linked,
            [Transition::StartRoute, Transition::Arrive(redemption(at))],
            at,
            &p,
        )
        .unwrap();
        assert_eq!(arrived.state, SessionState::Arrived);
        assert_eq!(arrived.version, 2, "chained transitions bump version once");
        assert_eq!(arrived.timestamps.en_route_at, Some(at));
        assert_eq!(arrived.deadline, Some(at + Duration::minutes(30)));
        assert_eq!(
            entered_states(&linked, &arrived),
            vec![SessionState::EnRoute, SessionState::Arrived]
        );

        let done = apply(&arrived, [Transition::Complete], at, &p).unwrap();
        assert_eq!(done.state, SessionState::Completed);
        assert_eq!(done.deadline, None);
    }

    #[test]
    fn out_of_order_transitions_are_rejected() {
        let p = policy();
        let s = pending();
        for transition in [
            Transition::StartRoute,
            Transition::Arrive(redemption(t0())),
            Transition::Complete,
        ] {
            let err = apply(&s, [transition], t0(), &p).unwrap_err();
            assert!(matches!(
                err,
                CurbsideError::Conflict {
                    kind: ConflictKind::WrongState,
                    ..
                }
            ));
        }

        let canceled = apply(&s, [Transition::Cancel], t0(), &p).unwrap();
        assert!(apply(&canceled, [Transition::Expire(ExpiryReason::SessionTtl)], t0(), &p).is_err());
        assert!(apply(&canceled, [Transition::Cancel], t0(), &p).is_err());
    }

    #[test]
    fn attempts_beyond_the_bound_expire_the_session() {
        let p = policy();
        let mut s = pending();
        for expected in 1..=3 {
            s = apply(&s, [Transition::FailedLinkAttempt], t0(), &p).unwrap();
            assert_eq!(s.state, SessionState::Pending);
            assert_eq!(s.link_attempts, expected);
        }
        s = apply(&s, [Transition::FailedLinkAttempt], t0(), &p).unwrap();
        assert_eq!(s.state, SessionState::Expired);
        assert_eq!(s.expiry_reason, Some(ExpiryReason::LinkAttemptsExhausted));
        assert_eq!(s.version, 4);
        assert!(s.deadline.is_none());
    }

    #[test]
    fn linked_deadline_is_capped_by_session_ttl() {
        let p = policy();
        let s = pending();
        let late_link = t0() + Duration::minutes(115);
        let linked = apply(&s, [Transition::Link], late_link, &p).unwrap();
        assert_eq!(linked.deadline, Some(t0() + Duration::hours(2)));
        assert_eq!(
            due_expiry(&linked, t0() + Duration::hours(2), &p),
            Some(ExpiryReason::SessionTtl)
        );
    }

    #[test]
    fn due_expiry_names_the_elapsed_deadline() {
        let p = policy();
        let s = pending();
        assert_eq!(due_expiry(&s, t0() + Duration::minutes(9), &p), None);
        assert_eq!(
            due_expiry(&s, t0() + Duration::minutes(10), &p),
            Some(ExpiryReason::LinkingWindow)
        );

        let linked = apply(&s, [Transition::Link], t0(), &p).unwrap();
        assert_eq!(
            due_expiry(&linked, t0() + Duration::minutes(11), &p),
            Some(ExpiryReason::LinkingWindow)
        );
    }
}
