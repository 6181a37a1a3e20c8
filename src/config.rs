use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::import::DEFAULT_IMPORT_AUTHOR;

pub const CONFIG_FILE: &str = "newsdesk.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Single endpoint every resource call goes through.
    #[serde(default)]
    pub api_base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Shared operator password. Empty means nobody can log in.
    #[serde(default)]
    pub admin_secret: String,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_import_author")]
    pub import_author: String,

    /// How many import commits may be in flight at once.
    #[serde(default = "default_concurrency")]
    pub commit_concurrency: usize,

    /// Local session store; `None` uses a SQLite file in the data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
}

fn default_timeout_ms() -> u64 { 15_000 }
fn default_session_ttl() -> u64 { 12 * 60 * 60 }
fn default_import_author() -> String { DEFAULT_IMPORT_AUTHOR.to_string() }
fn default_concurrency() -> usize { 1 }

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            request_timeout_ms: default_timeout_ms(),
            admin_secret: String::new(),
            session_ttl_secs: default_session_ttl(),
            import_author: default_import_author(),
            commit_concurrency: default_concurrency(),
            database_url: None,
        }
    }
}

impl Settings {
    /// Resolve settings: explicit path, then `NEWSDESK_CONFIG`, then the
    /// per-user config dir. A missing file is not an error. Environment
    /// variables override whatever the file said.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os("NEWSDESK_CONFIG").map(PathBuf::from).or_else(default_config_path),
        };
        let mut settings = match path {
            Some(p) if p.exists() => Self::from_file(&p)?,
            Some(p) if explicit.is_some() => anyhow::bail!("config file not found: {}", p.display()),
            _ => {
                info!("no config file found, using defaults");
                Self::default()
            }
        };
        settings.apply_overrides(|k| std::env::var(k).ok());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("NEWSDESK_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_base_url = v;
        }
        if let Some(v) = var("NEWSDESK_TIMEOUT_MS").and_then(|s| s.parse().ok()) {
            self.request_timeout_ms = v;
        }
        if let Some(v) = var("NEWSDESK_ADMIN_SECRET") {
            self.admin_secret = v;
        }
        if let Some(v) = var("NEWSDESK_SESSION_TTL_SECS").and_then(|s| s.parse().ok()) {
            self.session_ttl_secs = v;
        }
        if let Some(v) = var("NEWSDESK_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = Some(v);
        }
    }

    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms.max(1)) }

    pub fn session_ttl(&self) -> Duration { Duration::from_secs(self.session_ttl_secs) }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "newsdesk", "newsdesk").map(|p| p.config_dir().join(CONFIG_FILE))
}
