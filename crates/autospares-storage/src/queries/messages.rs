// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message log operations.

use autospares_core::StoreError;
use autospares_core::types::ChatMessage;
use rusqlite::params;

use crate::database::Database;

/// Append a message to a session's log.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), StoreError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, session_id, role, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.session_id,
                    msg.role,
                    msg.content,
                    msg.metadata,
                    msg.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The newest `limit` messages of a session, returned oldest first.
///
/// Rows written in the same millisecond keep insertion order via `rowid`.
pub async fn recent_messages(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<ChatMessage>, StoreError> {
    let session_id = session_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, role, content, metadata, created_at
                 FROM chat_messages WHERE session_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![session_id, limit], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    metadata: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::create_session;
    use crate::queries::test_support::{make_session, setup_db};

    fn make_message(id: &str, role: &str, content: &str, ts: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            session_id: "sess-1".to_string(),
            role: role.to_string(),
            content: content.to_string(),
            metadata: None,
            created_at: ts.to_string(),
        }
    }

    #[tokio::test]
    async fn recent_messages_returns_tail_in_order() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("sess-1", "tok")).await.unwrap();

        for i in 0..5 {
            let ts = format!("2026-01-01T00:00:0{i}.000Z");
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            insert_message(&db, &make_message(&format!("m{i}"), role, &format!("msg {i}"), &ts))
                .await
                .unwrap();
        }

        let tail = recent_messages(&db, "sess-1", 3).await.unwrap();
        let ids: Vec<_> = tail.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn same_timestamp_keeps_insert_order() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("sess-1", "tok")).await.unwrap();
        let ts = "2026-01-01T00:00:00.000Z";
        insert_message(&db, &make_message("u", "user", "hi", ts)).await.unwrap();
        insert_message(&db, &make_message("a", "assistant", "hello", ts))
            .await
            .unwrap();

        let all = recent_messages(&db, "sess-1", 10).await.unwrap();
        assert_eq!(all[0].id, "u");
        assert_eq!(all[1].id, "a");
    }

    #[tokio::test]
    async fn invalid_role_is_rejected() {
        let (db, _dir) = setup_db().await;
        create_session(&db, &make_session("sess-1", "tok")).await.unwrap();
        let msg = make_message("x", "system", "nope", "2026-01-01T00:00:00.000Z");
        assert!(insert_message(&db, &msg).await.is_err());
    }

    #[tokio::test]
    async fn message_for_unknown_session_violates_fk() {
        let (db, _dir) = setup_db().await;
        let msg = make_message("x", "user", "orphan", "2026-01-01T00:00:00.000Z");
        assert!(insert_message(&db, &msg).await.is_err());
    }
}
