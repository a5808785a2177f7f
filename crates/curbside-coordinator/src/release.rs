// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order release: the plan written in the arrival commit, and the
//! background dispatch of release notices to the destination.
//!
//! The arrival commit is the only writer of `released`. Everything after it
//! (dispatch, acknowledgement, readiness) runs here and never touches the
//! session, so a failing collaborator cannot undo an arrival.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use curbside_core::traits::storage::DispatchRecord;
use curbside_core::{
    Clock, CurbsideError, Destination, FulfillmentAdapter, FulfillmentStatus, NotificationAdapter,
    QueuedOrder, ReleaseNotice, ReleasePlan, StorageAdapter,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::{RetryDecision, RetryPolicy};
use crate::policy::secs;

/// Idle wake-up for due retries when nothing signals the worker.
const DISPATCH_TICK: Duration = Duration::from_secs(1);

/// Release plan for an order whose session arrives at `at`.
///
/// Release is always immediate. `lead_within_approach` records whether the
/// preparation lead time would have fit inside the destination's approach
/// time, i.e. whether a later release would have sufficed.
pub fn plan_release(
    order: &QueuedOrder,
    approach_secs: Option<u64>,
    at: DateTime<Utc>,
) -> ReleasePlan {
    ReleasePlan {
        release_at: at,
        estimated_ready_at: at + secs(order.lead_time_secs),
        lead_within_approach: approach_secs.is_some_and(|approach| order.lead_time_secs <= approach),
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub retrying: usize,
    pub abandoned: usize,
}

/// Delivers release notices for released orders and tracks readiness.
pub struct OrderReleaseCoordinator {
    store: Arc<dyn StorageAdapter>,
    notifier: Arc<dyn NotificationAdapter>,
    fulfillment: Option<Arc<dyn FulfillmentAdapter>>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    batch_size: usize,
    signal: Notify,
}

impl OrderReleaseCoordinator {
    pub fn new(
        store: Arc<dyn StorageAdapter>,
        notifier: Arc<dyn NotificationAdapter>,
        fulfillment: Option<Arc<dyn FulfillmentAdapter>>,
        clock: Arc<dyn Clock>,
        retry: RetryPolicy,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            notifier,
            fulfillment,
            clock,
            retry,
            batch_size: batch_size.max(1),
            signal: Notify::new(),
        }
    }

    /// Asks the background worker to run a dispatch pass now.
    pub fn wake(&self) {
        self.signal.notify_one();
    }

    fn notice(order: &QueuedOrder, destination: &Destination) -> ReleaseNotice {
        ReleaseNotice {
            order_id: order.id.clone(),
            order_reference: order.reference.clone(),
            session_id: order.session_id.clone(),
            destination_id: destination.id.clone(),
            recipient: destination.recipient.clone(),
            message: format!(
                "Customer has arrived at {}. Release order {}.",
                destination.name, order.reference
            ),
            released_at: order.released_at.unwrap_or(order.created_at),
            estimated_ready_at: order.estimated_ready_at,
        }
    }

    async fn deliver(&self, order: &QueuedOrder) -> Result<(), CurbsideError> {
        let destination = self
            .store
            .get_destination(&order.destination_id)
            .await?
            .ok_or_else(|| CurbsideError::Dispatch {
                message: format!("destination {} is not configured", order.destination_id),
                retryable: false,
                source: None,
            })?;
        let receipt = self
            .notifier
            .dispatch(&destination, &Self::notice(order, &destination))
            .await?;
        debug!(order_id = %order.id, reference = ?receipt.reference, "release notice acknowledged");
        Ok(())
    }

    /// Dispatches every order whose next attempt is due.
    ///
    /// Collaborator failures are recorded on the order and scheduled for
    /// retry; only storage errors abort the pass. Orders of canceled or
    /// expired sessions are canceled with the session and never come due.
    pub async fn dispatch_due(&self) -> Result<DispatchReport, CurbsideError> {
        let now = self.clock.now();
        let due = self
            .store
            .list_orders_due_for_dispatch(now, self.batch_size)
            .await?;
        let mut report = DispatchReport::default();

        for order in due {
            let attempt = order.dispatch_attempts + 1;
            match self.deliver(&order).await {
                Ok(()) => {
                    let at = self.clock.now();
                    self.store
                        .record_dispatch(&order.id, &DispatchRecord::Delivered { at })
                        .await?;
                    info!(order_id = %order.id, session_id = %order.session_id, attempt, "order release delivered");
                    report.delivered += 1;
                }
                Err(err @ CurbsideError::Storage { .. }) => return Err(err),
                Err(err) => {
                    let at = self.clock.now();
                    let next_attempt_at = match self.retry.decide(attempt, err.is_retryable()) {
                        RetryDecision::RetryAfter(delay) => {
                            let next = chrono::Duration::from_std(delay)
                                .ok()
                                .and_then(|delay| at.checked_add_signed(delay))
                                .unwrap_or(at);
                            warn!(
                                order_id = %order.id,
                                session_id = %order.session_id,
                                attempt,
                                next_attempt_at = %next,
                                error = %err,
                                "order release dispatch failed, will retry"
                            );
                            report.retrying += 1;
                            Some(next)
                        }
                        RetryDecision::GiveUp => {
                            error!(
                                order_id = %order.id,
                                session_id = %order.session_id,
                                attempt,
                                error = %err,
                                "order release dispatch abandoned"
                            );
                            report.abandoned += 1;
                            None
                        }
                    };
                    self.store
                        .record_dispatch(
                            &order.id,
                            &DispatchRecord::Failed {
                                at,
                                error: err.to_string(),
                                next_attempt_at,
                            },
                        )
                        .await?;
                }
            }
        }
        Ok(report)
    }

    /// Polls the fulfillment collaborator for one batch of released orders
    /// and marks the ready ones. Returns how many became ready.
    ///
    /// Each polled order moves to the back of the queue, so orders that stay
    /// unready cannot starve the rest.
    pub async fn poll_ready(&self) -> Result<usize, CurbsideError> {
        let Some(fulfillment) = &self.fulfillment else {
            return Ok(0);
        };
        let mut ready = 0;
        for order in self.store.list_orders_awaiting_ready(self.batch_size).await? {
            let status = fulfillment.get_status(&order.reference).await;
            self.store
                .record_ready_poll(&order.id, self.clock.now())
                .await?;
            match status {
                Ok(FulfillmentStatus::Ready) => {
                    if self.store.mark_order_ready(&order.id, self.clock.now()).await? {
                        info!(order_id = %order.id, "order ready for hand-off");
                        ready += 1;
                    }
                }
                Ok(status) => debug!(order_id = %order.id, %status, "order not ready"),
                Err(err) => {
                    warn!(order_id = %order.id, error = %err, "fulfillment status lookup failed");
                }
            }
        }
        Ok(ready)
    }

    /// Runs dispatch passes until `cancel` fires. Wakes on [`wake`](Self::wake),
    /// on a short idle tick for due retries, and polls readiness every
    /// `fulfillment_poll`.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, fulfillment_poll: Duration) {
        let mut ready_tick = tokio::time::interval(fulfillment_poll.max(Duration::from_secs(1)));
        ready_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("order release worker started");

        loop {
            if let Err(err) = self.dispatch_due().await {
                error!(error = %err, "order dispatch pass failed");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.signal.notified() => {}
                _ = tokio::time::sleep(DISPATCH_TICK) => {}
                _ = ready_tick.tick() => {
                    if let Err(err) = self.poll_ready().await {
                        error!(error = %err, "fulfillment poll failed");
                    }
                }
            }
        }
        info!("order release worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use curbside_core::{OrderStatus, SessionId};

    use super::*;

    fn order(lead_time_secs: u64) -> QueuedOrder {
        let created = Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap();
        QueuedOrder {
            id: "o1".into(),
            session_id: SessionId("s1".into()),
            destination_id: "D".into(),
            reference: "ORD-1".into(),
            lead_time_secs,
            status: OrderStatus::Queued,
            created_at: created,
            release_at: None,
            released_at: None,
            estimated_ready_at: None,
            acknowledged_at: None,
            ready_at: None,
            completed_at: None,
            canceled_at: None,
            dispatch_attempts: 0,
            next_dispatch_at: None,
            last_dispatch_error: None,
        }
    }

    fn destination(approach_secs: Option<u64>) -> Destination {
        Destination {
            id: "D".into(),
            name: "Main St".into(),
            latitude: 30.0,
            longitude: -97.0,
            radius_m: None,
            approach_secs,
            recipient: "kitchen".into(),
        }
    }

    #[test]
    fn release_is_immediate_and_flags_short_lead_times() {
        let at = Utc.with_ymd_and_hms(2026, 2, 10, 8, 20, 0).unwrap();

        let long_lead = plan_release(&order(600), Some(120), at);
        assert_eq!(long_lead.release_at, at);
        assert_eq!(long_lead.estimated_ready_at, at + Duration::minutes(10));
        assert!(!long_lead.lead_within_approach);

        let short_lead = plan_release(&order(60), Some(120), at);
        assert_eq!(short_lead.release_at, at, "never released earlier or later");
        assert!(short_lead.lead_within_approach);

        let no_approach = plan_release(&order(0), None, at);
        assert!(!no_approach.lead_within_approach);
        assert_eq!(no_approach.estimated_ready_at, at);
    }

    #[test]
    fn notice_addresses_the_destination_recipient() {
        let mut o = order(300);
        let at = Utc.with_ymd_and_hms(2026, 2, 10, 8, 20, 0).unwrap();
        o.released_at = Some(at);
        let notice = OrderReleaseCoordinator::notice(&o, &destination(None));
        assert_eq!(notice.recipient, "kitchen");
        assert_eq!(notice.released_at, at);
        assert!(notice.message.contains("ORD-1"));
    }
}
