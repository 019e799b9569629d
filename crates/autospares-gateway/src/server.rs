// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storefront HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use autospares_agent::{ChatEngine, ToolServices};
use autospares_config::model::ServerConfig;
use autospares_core::{MailAdapter, StoreError};
use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::session::session_middleware;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
    /// Cart, order and payment services shared with the chat tools.
    pub services: ToolServices,
    /// `None` when SMTP is not configured; invoice sends answer 503.
    pub mailer: Option<Arc<dyn MailAdapter>>,
    /// Upper bound on one chat request.
    pub request_timeout: Duration,
    /// Process start time for uptime calculation.
    pub started: Instant,
}

impl AppState {
    pub fn new(
        engine: Arc<ChatEngine>,
        services: ToolServices,
        mailer: Option<Arc<dyn MailAdapter>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            services,
            mailer,
            request_timeout,
            started: Instant::now(),
        }
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/sessions", post(handlers::create_session))
        .route("/v1/chat", post(handlers::chat))
        .route("/v1/mpesa/stk-push", post(handlers::stk_push))
        .route("/v1/mpesa/callback", post(handlers::mpesa_callback))
        .route("/v1/payments/{id}", get(handlers::payment_status))
        .route("/v1/invoices/send", post(handlers::send_invoice))
        .route("/ws", get(ws::ws_handler));

    // Cart and checkout act on the session named by `x-session-token`.
    let session_routes = Router::new()
        .route("/v1/cart", get(handlers::get_cart).put(handlers::put_cart))
        .route("/v1/orders", post(handlers::create_order))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), StoreError> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| StoreError::Internal(format!("http server error: {e}")))
}

/// Bind `host:port` from the config and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), StoreError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| StoreError::Internal(format!("failed to bind {addr}: {e}")))?;
    tracing::info!("storefront API listening on {addr}");
    serve(listener, state, cancel).await?;
    tracing::info!("storefront API stopped");
    Ok(())
}
