// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat session CRUD operations.

use autospares_core::StoreError;
use autospares_core::types::ChatSession;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

const SESSION_COLUMNS: &str = "id, user_token, title, email, phone, created_at, updated_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        user_token: row.get(1)?,
        title: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Create a new session.
pub async fn create_session(db: &Database, session: &ChatSession) -> Result<(), StoreError> {
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, user_token, title, email, phone, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session.id,
                    session.user_token,
                    session.title,
                    session.email,
                    session.phone,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<ChatSession>, StoreError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ?1"),
                params![id],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the session owning a client token.
pub async fn get_session_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<ChatSession>, StoreError> {
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE user_token = ?1"),
                params![token],
                row_to_session,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Bump `updated_at`, overwriting title/email/phone only where a value is given.
pub async fn touch_session(
    db: &Database,
    id: &str,
    title: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<(), StoreError> {
    let id = id.to_string();
    let title = title.map(str::to_string);
    let email = email.map(str::to_string);
    let phone = phone.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chat_sessions SET
                    title = COALESCE(?2, title),
                    email = COALESCE(?3, email),
                    phone = COALESCE(?4, phone),
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, title, email, phone],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
