pub mod api;
pub mod banner;
pub mod category;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod import;
pub mod mapping;
pub mod session;
pub mod storage;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::api::{ApiClient, ContentStore, Dashboard, ImportFeed};
    pub use crate::banner::{Banner, Creative, MediaType, Placement};
    pub use crate::category::{Category, CategoryRegistry};
    pub use crate::config::Settings;
    pub use crate::content::{ContentKind, ContentRecord, Direction, ModerationStatus, RecordImage, RecordLink};
    pub use crate::error::{Error, Result};
    pub use crate::import::{CommitReport, FetchOutcome, ImportCandidate, ImportLimit, ImportPipeline, ImportSource, PipelineState};
    pub use crate::session::AdminSession;
    pub use crate::types::{ListQuery, Stats};
    pub use crate::Newsdesk;
}

pub use error::{Error, Result};

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, Dashboard};
use crate::banner::{Banner, Placement};
use crate::category::Category;
use crate::config::Settings;
use crate::content::{ContentKind, ContentRecord};
use crate::db::Database;
use crate::import::{CommitReport, FetchOutcome, ImportLimit, ImportPipeline, ImportSource};
use crate::session::{AdminGate, AdminSession};
use crate::types::{ListQuery, Stats};

/// One operator's view of the platform: remote API client, local session
/// store and the import pipeline.
pub struct Newsdesk {
    settings: Settings,
    db: Database,
    gate: AdminGate,
    // Kept as a Result so session commands work without an API URL configured.
    api: Result<ApiClient>,
    pipeline: ImportPipeline,
}

impl Newsdesk {
    /// Open the session database and (optionally) run migrations. No network
    /// traffic happens here.
    pub async fn connect(settings: Settings, run_migrations: bool) -> anyhow::Result<Self> {
        let db = Database::connect(settings.database_url.as_deref()).await?;
        if run_migrations { db.run_migrations().await?; }
        let gate = AdminGate::new(settings.admin_secret.clone(), settings.session_ttl(), Arc::new(db.clone()));
        let api = ApiClient::new(&settings.api_base_url, settings.request_timeout());
        if let Err(e) = &api {
            debug!(error = %e, "API client unavailable");
        }
        let pipeline = ImportPipeline::new(settings.import_author.clone(), settings.commit_concurrency);
        Ok(Self { settings, db, gate, api, pipeline })
    }

    pub fn settings(&self) -> &Settings { &self.settings }

    pub fn database(&self) -> &Database { &self.db }

    pub fn api(&self) -> Result<&ApiClient> {
        self.api.as_ref().map_err(Clone::clone)
    }

    // --- session ---

    pub async fn login(&self, secret: &str) -> Result<AdminSession> {
        self.gate.login(secret, current_epoch()).await
    }

    pub async fn logout(&self) -> Result<bool> {
        self.gate.logout().await
    }

    /// Fails with `Unauthorized` when nobody is logged in and `SessionExpired`
    /// when the stored session has run out.
    pub async fn require_session(&self) -> Result<AdminSession> {
        self.gate.require(current_epoch()).await
    }

    // --- records ---

    pub async fn list(&self, kind: ContentKind, query: &ListQuery) -> Result<Vec<ContentRecord>> {
        self.api()?.list(kind, query).await
    }

    pub async fn get(&self, kind: ContentKind, id: i64) -> Result<ContentRecord> {
        self.api()?.get(kind, id).await
    }

    pub async fn save(&self, kind: ContentKind, record: &mut ContentRecord) -> Result<Option<i64>> {
        self.api()?.save(kind, record).await
    }

    pub async fn delete(&self, kind: ContentKind, id: i64) -> Result<()> {
        self.api()?.delete(kind, id).await
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        Ok(self.api()?.load_dashboard().await)
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.api()?.stats().await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.api()?.list_categories().await
    }

    // --- banners ---

    pub async fn banners(&self, placement: Option<Placement>) -> Result<Vec<Banner>> {
        self.api()?.list_banners(placement).await
    }

    pub async fn save_banner(&self, banner: &mut Banner) -> Result<Option<i64>> {
        let api = self.api()?;
        match banner.id {
            Some(id) => api.update_banner(id, banner).await.map(|_| Some(id)),
            None => {
                let id = api.create_banner(banner).await?;
                banner.id = id;
                Ok(id)
            }
        }
    }

    // --- import ---

    pub fn pipeline(&self) -> &ImportPipeline { &self.pipeline }

    pub async fn import(&self, source: ImportSource, limit: ImportLimit) -> Result<FetchOutcome> {
        let api = self.api()?;
        self.pipeline.import(api, source, limit).await
    }

    pub async fn commit_import(&self) -> Result<CommitReport> {
        let api = self.api()?;
        self.pipeline.commit(api).await
    }
}

pub(crate) fn current_epoch() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}
