// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session bootstrap: token minting and request-to-session resolution.
//!
//! A client may present a session id, a session token, both, or neither.
//! Resolution rules, in order:
//!
//! 1. No token: a fresh one is minted.
//! 2. A session id that is not a hyphenated UUID is discarded.
//! 3. A session found by token wins over any presented id.
//! 4. A UUID id with no stored session is discarded.
//! 5. No id left: a new session is created.
//! 6. Otherwise the existing session is touched (title, contact details).

use std::sync::Arc;

use autospares_core::types::ChatSession;
use autospares_core::{StorageAdapter, StoreError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_RANDOM_LEN: usize = 13;
const TITLE_MAX_CHARS: usize = 50;

/// Title given to sessions opened by the welcome flow.
pub const WELCOME_TITLE: &str = "Welcome Chat";

/// What the client presented, plus the titles to apply.
#[derive(Debug, Clone, Default)]
pub struct SessionRequest {
    pub session_id: Option<String>,
    pub session_token: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Title for a newly created session.
    pub new_title: String,
    /// Title written onto an existing session, if any.
    pub title_update: Option<String>,
}

/// The session a request is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSession {
    pub session_id: String,
    pub session_token: String,
    pub created: bool,
}

/// `session_<base36 millis>_<13 base36 chars>`.
pub fn mint_token() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TOKEN_RANDOM_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("session_{}_{suffix}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// True for the canonical hyphenated UUID form only.
pub fn is_uuid(id: &str) -> bool {
    id.len() == 36 && uuid::Uuid::try_parse(id).is_ok()
}

/// First 50 characters of `message`.
pub fn title_from_message(message: &str) -> String {
    message.trim().chars().take(TITLE_MAX_CHARS).collect()
}

/// Binds requests to persisted chat sessions.
#[derive(Clone)]
pub struct SessionResolver {
    storage: Arc<dyn StorageAdapter>,
}

impl SessionResolver {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Applies the resolution rules and persists the outcome.
    pub async fn resolve(&self, request: SessionRequest) -> Result<ResolvedSession, StoreError> {
        let token = match request.session_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => {
                let minted = mint_token();
                debug!(token = %minted, "minted session token");
                minted
            }
        };

        let mut session_id = request
            .session_id
            .as_deref()
            .filter(|id| {
                let ok = is_uuid(id);
                if !ok {
                    debug!(session_id = %id, "discarding malformed session id");
                }
                ok
            })
            .map(str::to_string);

        if let Some(existing) = self.storage.get_session_by_token(&token).await? {
            session_id = Some(existing.id);
        } else if let Some(id) = &session_id
            && self.storage.get_session(id).await?.is_none()
        {
            debug!(session_id = %id, "unknown session id, creating a new session");
            session_id = None;
        }

        let email = non_empty(request.email.as_deref());
        let phone = non_empty(request.phone.as_deref());

        match session_id {
            Some(id) => {
                self.storage
                    .touch_session(&id, request.title_update.as_deref(), email, phone)
                    .await?;
                Ok(ResolvedSession {
                    session_id: id,
                    session_token: token,
                    created: false,
                })
            }
            None => {
                let now = chrono::Utc::now().to_rfc3339();
                let session = ChatSession {
                    id: uuid::Uuid::new_v4().to_string(),
                    user_token: token.clone(),
                    title: Some(request.new_title),
                    email: email.map(str::to_string),
                    phone: phone.map(str::to_string),
                    created_at: now.clone(),
                    updated_at: now,
                };
                self.storage.create_session(&session).await?;
                info!(session_id = %session.id, "chat session created");
                Ok(ResolvedSession {
                    session_id: session.id,
                    session_token: token,
                    created: true,
                })
            }
        }
    }

    /// Session bound to `token`, if any.
    pub async fn lookup(&self, token: &str) -> Result<Option<ChatSession>, StoreError> {
        self.storage.get_session_by_token(token).await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
