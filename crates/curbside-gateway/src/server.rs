// SPDX-FileCopyrightText: 2026 Curbside Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use curbside_config::model::GatewayConfig;
use curbside_coordinator::ArrivalCoordinator;
use curbside_core::CurbsideError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub coordinator: Arc<ArrivalCoordinator>,
    pub auth: AuthConfig,
    /// Process start, for uptime on `/health`.
    pub started: Instant,
}

impl GatewayState {
    pub fn new(coordinator: Arc<ArrivalCoordinator>, auth: AuthConfig) -> Self {
        Self {
            coordinator,
            auth,
            started: Instant::now(),
        }
    }

    pub(crate) fn poll_interval_secs(&self) -> u64 {
        self.coordinator.policy().poll_interval_secs
    }
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl From<&GatewayConfig> for ServerConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
        }
    }
}

/// Builds the gateway router.
///
/// - `GET /health` (public)
/// - `POST /v1/sessions`, `GET /v1/sessions?idempotency_key=`
/// - `GET /v1/sessions/{id}`
/// - `POST /v1/sessions/{id}/link`, `/position`, `/cancel`
/// - `POST /v1/linking-codes`
/// - `POST /v1/redemptions`
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/sessions",
            post(handlers::start_session).get(handlers::find_session),
        )
        .route("/v1/sessions/{id}", get(handlers::get_session))
        .route("/v1/sessions/{id}/link", post(handlers::link_session))
        .route("/v1/sessions/{id}/position", post(handlers::report_position))
        .route("/v1/sessions/{id}/cancel", post(handlers::cancel_session))
        .route("/v1/linking-codes", post(handlers::issue_linking_code))
        .route("/v1/redemptions", post(handlers::confirm_redemption))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `cancel` fires, then drains in-flight requests.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), CurbsideError> {
    if state.auth.bearer_token.is_none() {
        tracing::warn!("gateway.bearer_token is not set, /v1 routes are unauthenticated");
    }
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CurbsideError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| CurbsideError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_from_gateway_config() {
        let config = ServerConfig::from(&GatewayConfig::default());
        assert_eq!(config.host, "127.0.0.1");
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
