// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod cart;
pub mod messages;
pub mod orders;
pub mod payments;
pub mod products;
pub mod sessions;

#[cfg(test)]
pub(crate) mod test_support {
    use autospares_core::types::ChatSession;
    use tempfile::{TempDir, tempdir};

    use crate::database::{Database, now_timestamp};

    pub async fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    pub fn make_session(id: &str, token: &str) -> ChatSession {
        let now = now_timestamp();
        ChatSession {
            id: id.to_string(),
            user_token: token.to_string(),
            title: Some("Welcome Chat".to_string()),
            email: None,
            phone: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}
