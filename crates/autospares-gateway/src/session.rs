// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-token middleware for cart and order routes.
//!
//! Reads `x-session-token`, loads the session, and stores the
//! [`ChatSession`] in the request extensions. A missing header is a 401 and
//! an unknown token is a 404.

use autospares_core::types::ChatSession;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::server::AppState;

/// Header carrying the client's session token.
pub const SESSION_HEADER: &str = "x-session-token";

/// The trimmed session token, if one was sent.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = token_from_headers(request.headers()) else {
        return Err(ApiError::unauthorized(format!(
            "missing {SESSION_HEADER} header"
        )));
    };

    let session: ChatSession = state
        .engine
        .sessions()
        .lookup(&token)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "session not found"))?;

    tracing::debug!(session_id = %session.id, "request bound to session");
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}
