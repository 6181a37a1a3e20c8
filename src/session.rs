//! Operator authentication.
//!
//! There is one shared admin secret. Logging in with it issues an opaque
//! token with a fixed lifetime, persisted locally so later commands run
//! without re-entering the secret. The gate is a convenience, not a
//! security boundary: the remote API performs no authentication of its own.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Storage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminSession {
    pub token: String,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds; the session is dead from this instant on.
    pub expires_at: i64,
}

impl AdminSession {
    pub fn issue(now: i64, ttl: Duration) -> Self {
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            token: Uuid::new_v4().to_string(),
            issued_at: now,
            expires_at: now.saturating_add(ttl),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool { now >= self.expires_at }

    pub fn remaining(&self, now: i64) -> Duration {
        Duration::from_secs(self.expires_at.saturating_sub(now).max(0) as u64)
    }
}

pub struct AdminGate {
    secret: String,
    ttl: Duration,
    store: Arc<dyn Storage>,
}

impl AdminGate {
    pub fn new(secret: impl Into<String>, ttl: Duration, store: Arc<dyn Storage>) -> Self {
        Self { secret: secret.into(), ttl, store }
    }

    /// Exchange the shared secret for a fresh session, replacing any older one.
    pub async fn login(&self, secret: &str, now: i64) -> Result<AdminSession> {
        if self.secret.is_empty() {
            warn!("login attempted but no admin secret is configured");
            return Err(Error::Unauthorized);
        }
        if secret != self.secret {
            warn!("login rejected");
            return Err(Error::Unauthorized);
        }
        let session = AdminSession::issue(now, self.ttl);
        self.store.store_session(&session).await?;
        info!(expires_at = session.expires_at, "admin session issued");
        Ok(session)
    }

    /// Forget the stored session. Returns whether one existed.
    pub async fn logout(&self) -> Result<bool> {
        Ok(self.store.clear_sessions().await? > 0)
    }

    /// The live session, if any. An expired one is removed and reported.
    pub async fn current(&self, now: i64) -> Result<Option<AdminSession>> {
        match self.store.load_session().await? {
            Some(s) if s.is_expired(now) => {
                self.store.clear_sessions().await?;
                info!("admin session expired");
                Err(Error::SessionExpired)
            }
            other => Ok(other),
        }
    }

    pub async fn require(&self, now: i64) -> Result<AdminSession> {
        self.current(now).await?.ok_or(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore(Mutex<Option<AdminSession>>);

    #[async_trait]
    impl Storage for MemoryStore {
        async fn load_session(&self) -> anyhow::Result<Option<AdminSession>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn store_session(&self, session: &AdminSession) -> anyhow::Result<()> {
            *self.0.lock().unwrap() = Some(session.clone());
            Ok(())
        }
        async fn clear_sessions(&self) -> anyhow::Result<u64> {
            Ok(self.0.lock().unwrap().take().map_or(0, |_| 1))
        }
    }

    fn gate(secret: &str) -> (AdminGate, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (AdminGate::new(secret, Duration::from_secs(60), store.clone()), store)
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected_and_nothing_stored() {
        let (gate, store) = gate("open sesame");
        assert_eq!(gate.login("guess", 0).await.unwrap_err(), Error::Unauthorized);
        assert!(store.0.lock().unwrap().is_none());
        assert_eq!(gate.require(0).await.unwrap_err(), Error::Unauthorized);
    }

    #[tokio::test]
    async fn empty_configured_secret_blocks_everyone() {
        let (gate, _) = gate("");
        assert_eq!(gate.login("", 0).await.unwrap_err(), Error::Unauthorized);
    }

    #[tokio::test]
    async fn session_lives_until_expiry() {
        let (gate, store) = gate("open sesame");
        let s = gate.login("open sesame", 1_000).await.unwrap();
        assert_eq!(s.expires_at, 1_060);
        assert_eq!(s.remaining(1_010), Duration::from_secs(50));

        assert_eq!(gate.require(1_059).await.unwrap(), s);
        assert_eq!(gate.require(1_060).await.unwrap_err(), Error::SessionExpired);
        assert!(store.0.lock().unwrap().is_none());
        // once cleared, the next check is a plain "not logged in"
        assert_eq!(gate.require(1_061).await.unwrap_err(), Error::Unauthorized);
    }

    #[tokio::test]
    async fn relogin_issues_new_token_and_logout_clears() {
        let (gate, _) = gate("pw");
        let a = gate.login("pw", 0).await.unwrap();
        let b = gate.login("pw", 5).await.unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(gate.current(6).await.unwrap(), Some(b));
        assert!(gate.logout().await.unwrap());
        assert!(!gate.logout().await.unwrap());
        assert_eq!(gate.current(6).await.unwrap(), None);
    }
}
