use serde::{Deserialize, Deserializer, Serialize};

use crate::content::ModerationStatus;
use crate::import::ImportCandidate;

/// Read JSON `null` as the field's default. The API returns SQL NULLs
/// verbatim, so any column may come back null.
pub(crate) fn nullable<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Body of `?resource=import-rss|import-news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub count: Option<usize>,
    #[serde(default)]
    pub news: Vec<ImportCandidate>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Create responses look like `{ "id": 7, "success": true }`; neither field
/// is guaranteed, so both are optional and only the status code decides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatedResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub moderation_status: ModerationStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub total: i64,
    #[serde(default)]
    pub by_status: Vec<StatusCount>,
}

/// Optional filters for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<ModerationStatus>,
    pub category: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListQuery {
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(s) = self.status { out.push(("status", s.as_str().to_string())); }
        if let Some(c) = &self.category { out.push(("category", c.clone())); }
        if let Some(l) = self.limit { out.push(("limit", l.to_string())); }
        if let Some(o) = self.offset { out.push(("offset", o.to_string())); }
        out
    }
}
