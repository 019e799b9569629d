// SPDX-FileCopyrightText: 2026 AutoSpares Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side cache of the server-issued session.
//!
//! Once a token is issued it is presented on every request until
//! [`SessionCache::clear`]. A different pair in a later reply (a server
//! reissue) replaces the cached one.

use std::path::{Path, PathBuf};

use autospares_core::StoreError;
use tracing::{info, warn};

use crate::api::{ApiClient, SessionPair};

const SESSION_FILE: &str = "autospares_session.json";

/// Session pair held in memory and mirrored to `<dir>/autospares_session.json`.
#[derive(Debug)]
pub struct SessionCache {
    path: PathBuf,
    current: Option<SessionPair>,
}

impl SessionCache {
    /// Open the cache in `dir`, restoring a saved pair if it is readable.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(SESSION_FILE);
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warn!(error = %e, "saved session is unreadable, ignoring it");
                    None
                }
            },
            Err(_) => None,
        };
        Self { path, current }
    }

    pub fn current(&self) -> Option<&SessionPair> {
        self.current.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.current.as_ref().map(|p| p.session_token.as_str())
    }

    /// The cached pair, bootstrapping a new session from the server when empty.
    pub async fn ensure(&mut self, api: &ApiClient) -> Result<SessionPair, StoreError> {
        if let Some(pair) = &self.current {
            return Ok(pair.clone());
        }
        let pair = api.create_session().await?;
        info!(session_id = %pair.session_id, "session issued");
        self.store(pair.clone())?;
        Ok(pair)
    }

    /// Record the pair from a server reply. Returns `true` when it replaced
    /// the cached pair.
    pub fn observe(&mut self, pair: SessionPair) -> Result<bool, StoreError> {
        if self.current.as_ref() == Some(&pair) {
            return Ok(false);
        }
        if self.current.is_some() {
            info!(session_id = %pair.session_id, "server reissued the session");
        }
        self.store(pair)?;
        Ok(true)
    }

    /// Forget the session so the next request starts a new one.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.current = None;
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Storage { source: e.into() }),
        }
    }

    fn store(&mut self, pair: SessionPair) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Storage { source: e.into() })?;
        }
        std::fs::write(&self.path, serde_json::to_string(&pair)?)
            .map_err(|e| StoreError::Storage { source: e.into() })?;
        self.current = Some(pair);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pair(token: &str) -> SessionPair {
        SessionPair {
            session_id: "5c2a7f3e-1d4b-4a8c-b9e0-6f7a8b9c0d1e".into(),
            session_token: token.into(),
        }
    }

    #[tokio::test]
    async fn token_is_reused_until_cleared() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pair("session_first")))
            .expect(1)
            .mount(&server)
            .await;
        let api = ApiClient::new(&server.uri()).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let mut cache = SessionCache::open(dir.path());
        let first = cache.ensure(&api).await.unwrap();
        for _ in 0..3 {
            assert_eq!(cache.ensure(&api).await.unwrap(), first);
        }

        // A restarted client picks the same token up from disk.
        let mut reopened = SessionCache::open(dir.path());
        assert_eq!(reopened.token(), Some("session_first"));
        assert_eq!(reopened.ensure(&api).await.unwrap(), first);

        reopened.clear().unwrap();
        assert!(reopened.token().is_none());
        assert!(SessionCache::open(dir.path()).current().is_none());
    }

    #[test]
    fn observe_only_replaces_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = SessionCache::open(dir.path());
        assert!(cache.observe(pair("session_a")).unwrap());
        assert!(!cache.observe(pair("session_a")).unwrap());
        assert!(cache.observe(pair("session_b")).unwrap());
        assert_eq!(SessionCache::open(dir.path()).token(), Some("session_b"));
    }

    #[test]
    fn unreadable_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "nope").unwrap();
        assert!(SessionCache::open(dir.path()).current().is_none());
    }
}
