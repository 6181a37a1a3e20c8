use anyhow::Result;
use async_trait::async_trait;

use crate::session::AdminSession;

/// Persistence for the operator's admin session.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The most recently issued session, expired or not.
    async fn load_session(&self) -> Result<Option<AdminSession>>;
    /// Replace any stored session with `session`.
    async fn store_session(&self, session: &AdminSession) -> Result<()>;
    /// Drop every stored session; returns how many were removed.
    async fn clear_sessions(&self) -> Result<u64>;
}
