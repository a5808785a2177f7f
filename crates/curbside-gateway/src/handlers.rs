// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use curbside_coordinator::{SessionLookup, SessionStatus, StartSession};
use curbside_core::{
    Anchor, ChannelMetadata, CurbsideError, Destination, ExpiryReason, HealthStatus, OrderRequest,
    OrderStatus, PluginAdapter, Position, QueuedOrder, Session, SessionId, SessionState,
    StorageAdapter,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::server::GatewayState;

/// Header carrying the idempotency key when it is not in the body.
pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

// --- Request bodies ---

/// Request body for POST /v1/sessions.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartSessionRequest {
    pub actor_id: String,
    pub destination_id: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub order: Option<OrderRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

// --- Response bodies ---

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub reference: String,
    pub status: OrderStatus,
    pub lead_time_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_ready_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ready_at: Option<DateTime<Utc>>,
}

impl From<&QueuedOrder> for OrderSummary {
    fn from(order: &QueuedOrder) -> Self {
        Self {
            reference: order.reference.clone(),
            status: order.status,
            lead_time_secs: order.lead_time_secs,
            released_at: order.released_at,
            estimated_ready_at: order.estimated_ready_at,
            ready_at: order.ready_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DestinationSummary {
    pub id: String,
    pub name: String,
}

impl From<&Destination> for DestinationSummary {
    fn from(destination: &Destination) -> Self {
        Self {
            id: destination.id.clone(),
            name: destination.name.clone(),
        }
    }
}

/// Client view of a session. The redemption code appears only once arrived.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub state: SessionState,
    pub version: i64,
    pub actor_id: String,
    pub destination_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<DestinationSummary>,
    pub anchor: Anchor,
    pub link_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_reason: Option<ExpiryReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderSummary>,
    pub poll_interval_secs: u64,
}

impl SessionSummary {
    fn new(
        session: &Session,
        destination: Option<&Destination>,
        order: Option<&QueuedOrder>,
        poll_interval_secs: u64,
    ) -> Self {
        let redemption = session.visible_redemption();
        Self {
            session_id: session.id.clone(),
            state: session.state,
            version: session.version,
            actor_id: session.actor_id.clone(),
            destination_id: session.destination_id.clone(),
            destination: destination.map(DestinationSummary::from),
            anchor: session.anchor,
            link_attempts: session.link_attempts,
            created_at: session.created_at,
            updated_at: session.updated_at,
            deadline: session.deadline,
            expiry_reason: session.expiry_reason,
            redemption_code: redemption.map(|r| r.code.as_str().to_string()),
            redemption_expires_at: redemption.map(|r| r.expires_at),
            order: order.map(OrderSummary::from),
            poll_interval_secs,
        }
    }

    fn from_status(status: &SessionStatus, poll_interval_secs: u64) -> Self {
        Self::new(
            &status.session,
            status.destination.as_ref(),
            status.order.as_ref(),
            poll_interval_secs,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub session_id: SessionId,
    pub state: SessionState,
}

impl From<&Session> for StateResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            state: session.state,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub session_id: SessionId,
    pub state: SessionState,
    pub arrived: bool,
    pub distance_m: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption_expires_at: Option<DateTime<Utc>>,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct RedemptionResponse {
    pub outcome: &'static str,
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub store: String,
}

// --- Handlers ---

fn resolve_idempotency_key(
    headers: &HeaderMap,
    body_key: Option<String>,
) -> Result<String, CurbsideError> {
    let header_key = headers
        .get(IDEMPOTENCY_HEADER)
        .map(|v| {
            v.to_str()
                .map(str::to_string)
                .map_err(|_| CurbsideError::validation("idempotency_key", "header is not ASCII"))
        })
        .transpose()?;
    match (body_key, header_key) {
        (Some(body), Some(header)) if body != header => Err(CurbsideError::validation(
            "idempotency_key",
            "body and header keys differ",
        )),
        (Some(key), _) | (None, Some(key)) => Ok(key),
        (None, None) => Err(CurbsideError::validation(
            "idempotency_key",
            "must not be empty",
        )),
    }
}

/// POST /v1/sessions
///
/// 201 for a new session, 200 when the idempotency key replays an earlier one.
pub async fn start_session(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Result<Json<StartSessionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    let idempotency_key = resolve_idempotency_key(&headers, body.idempotency_key)?;
    let outcome = state
        .coordinator
        .start_session(StartSession {
            actor_id: body.actor_id,
            destination_id: body.destination_id,
            idempotency_key,
            order: body.order,
        })
        .await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let store = state.coordinator.store();
    let destination = store.get_destination(&outcome.session.destination_id).await?;
    let order = store.get_order_for_session(&outcome.session.id).await?;
    let summary = SessionSummary::new(
        &outcome.session,
        destination.as_ref(),
        order.as_ref(),
        state.poll_interval_secs(),
    );
    Ok((status, Json(summary)).into_response())
}

/// POST /v1/linking-codes
pub async fn issue_linking_code(
    State(state): State<GatewayState>,
    body: Result<Json<ChannelMetadata>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(channel) = body?;
    let issued = state.coordinator.issue_linking_code(channel).await?;
    Ok((StatusCode::CREATED, Json(issued)).into_response())
}

/// POST /v1/sessions/{id}/link
pub async fn link_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<StateResponse>> {
    let Json(body) = body?;
    let session = state
        .coordinator
        .consume_linking_code(&SessionId(id), &body.code)
        .await?;
    Ok(Json(StateResponse::from(&session)))
}

/// POST /v1/sessions/{id}/position
pub async fn report_position(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    body: Result<Json<PositionRequest>, JsonRejection>,
) -> ApiResult<Json<PositionResponse>> {
    let Json(body) = body?;
    let session_id = SessionId(id);
    let report = state
        .coordinator
        .report_position(
            &session_id,
            Position {
                latitude: body.latitude,
                longitude: body.longitude,
                accuracy_m: body.accuracy_m,
            },
        )
        .await?;
    Ok(Json(PositionResponse {
        session_id,
        state: report.state,
        arrived: report.arrived,
        distance_m: report.distance_m,
        accuracy_m: report.accuracy_m,
        redemption_code: report
            .redemption
            .as_ref()
            .map(|r| r.code.as_str().to_string()),
        redemption_expires_at: report.redemption.as_ref().map(|r| r.expires_at),
        poll_interval_secs: state.poll_interval_secs(),
    }))
}

/// POST /v1/redemptions
pub async fn confirm_redemption(
    State(state): State<GatewayState>,
    body: Result<Json<CodeRequest>, JsonRejection>,
) -> ApiResult<Json<RedemptionResponse>> {
    let Json(body) = body?;
    let session = state.coordinator.confirm_redemption(&body.code).await?;
    Ok(Json(RedemptionResponse {
        outcome: "redeemed",
        session_id: session.id,
    }))
}

/// GET /v1/sessions/{id}
pub async fn get_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    let status = state
        .coordinator
        .get_status(SessionLookup::Id(SessionId(id)))
        .await?;
    Ok(Json(SessionSummary::from_status(&status, state.poll_interval_secs())))
}

/// GET /v1/sessions?idempotency_key=K
pub async fn find_session(
    State(state): State<GatewayState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> ApiResult<Json<SessionSummary>> {
    let Query(query) = query?;
    let key = query
        .idempotency_key
        .ok_or_else(|| CurbsideError::validation("idempotency_key", "query parameter required"))?;
    let status = state
        .coordinator
        .get_status(SessionLookup::IdempotencyKey(key))
        .await?;
    Ok(Json(SessionSummary::from_status(&status, state.poll_interval_secs())))
}

/// POST /v1/sessions/{id}/cancel
pub async fn cancel_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StateResponse>> {
    let session = state.coordinator.cancel_session(&SessionId(id)).await?;
    Ok(Json(StateResponse::from(&session)))
}

/// GET /health
///
/// Unauthenticated. 503 when the store is unhealthy.
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let (status, code, store) = match state.coordinator.store().health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", StatusCode::OK, "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason)) => ("degraded", StatusCode::OK, reason),
        Ok(HealthStatus::Unhealthy(reason)) => {
            ("unhealthy", StatusCode::SERVICE_UNAVAILABLE, reason)
        }
        Err(err) => {
            tracing::warn!(error = %err, "store health check failed");
            (
                "unhealthy",
                StatusCode::SERVICE_UNAVAILABLE,
                "health check failed".to_string(),
            )
        }
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
        store,
    };
    (code, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn idempotency_key_from_body_or_header() {
        let mut headers = HeaderMap::new();
        assert!(resolve_idempotency_key(&headers, None).is_err());
        assert_eq!(
            resolve_idempotency_key(&headers, Some("K1".into())).unwrap(),
            "K1"
        );

        headers.insert(IDEMPOTENCY_HEADER, HeaderValue::from_static("K1"));
        assert_eq!(resolve_idempotency_key(&headers, None).unwrap(), "K1");
        assert_eq!(
            resolve_idempotency_key(&headers, Some("K1".into())).unwrap(),
            "K1"
        );
        assert!(resolve_idempotency_key(&headers, Some("K2".into())).is_err());
    }

    #[test]
    fn start_request_rejects_unknown_fields() {
        let json = r#"{"actor_id": "a", "destination_id": "D", "color": "red"}"#;
        assert!(serde_json::from_str::<StartSessionRequest>(json).is_err());

        let json = r#"{
            "actor_id": "a",
            "destination_id": "D",
            "order": {"reference": "ORD-1", "lead_time_secs": 300}
        }"#;
        let req: StartSessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.order.unwrap().lead_time_secs, 300);
        assert!(req.idempotency_key.is_none());
    }

    #[test]
    fn position_request_requires_numbers() {
        assert!(serde_json::from_str::<PositionRequest>(r#"{"latitude": "north", "longitude": 1.0}"#).is_err());
        let req: PositionRequest =
            serde_json::from_str(r#"{"latitude": 30.0, "longitude": -97.0}"#).unwrap();
        assert!(req.accuracy_m.is_none());
    }
}
