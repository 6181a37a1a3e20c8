//! Client for the remote content API.
//!
//! Every call targets the same endpoint and picks its collection with a
//! `resource` query parameter (`?resource=news&id=7`). Success is any 2xx;
//! anything else is an opaque failure.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::banner::{Banner, Placement};
use crate::category::{Category, CategoryRegistry};
use crate::content::{ContentKind, ContentRecord};
use crate::error::{Error, Result};
use crate::import::{ImportCandidate, ImportLimit, ImportSource};
use crate::types::{CreatedResponse, ImportEnvelope, ListQuery, Stats};

/// Where committed import items are written.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Create a record; returns the server-assigned id when the response carries one.
    async fn create(&self, kind: ContentKind, record: &ContentRecord) -> Result<Option<i64>>;
}

/// Source of import candidates.
#[async_trait]
pub trait ImportFeed: Send + Sync {
    async fn fetch_candidates(&self, source: ImportSource, limit: ImportLimit) -> Result<Vec<ImportCandidate>>;
}

/// Everything the admin overview needs, loaded in one concurrent batch.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub lists: BTreeMap<ContentKind, Vec<ContentRecord>>,
    pub categories: Vec<Category>,
    /// Resources whose load failed and were replaced by an empty list.
    pub degraded: Vec<&'static str>,
}

impl Dashboard {
    pub fn records(&self, kind: ContentKind) -> &[ContentRecord] {
        self.lists.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn registry(&self) -> CategoryRegistry {
        CategoryRegistry::new(self.categories.iter().cloned())
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::Validation("API URL is not configured (set NEWSDESK_API_URL)".to_string()));
        }
        let base = Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("invalid API URL {base_url}: {e}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { http, base, timeout })
    }

    pub fn base_url(&self) -> &Url { &self.base }

    fn url(&self, resource: &str, id: Option<i64>, extra: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("resource", resource);
            if let Some(id) = id {
                q.append_pair("id", &id.to_string());
            }
            for (k, v) in extra {
                q.append_pair(k, v);
            }
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, url: Url, resource: &str, body: Option<&B>) -> Result<Response> {
        debug!(%method, %url, "api request");
        let mut req = self.http.request(method.clone(), url);
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await.map_err(|e| {
            let e = Error::from_reqwest(e, self.timeout, resource);
            warn!(%method, resource, error = %e, "api request failed");
            e
        })?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%method, resource, status = status.as_u16(), "api request rejected");
            return Err(Error::Http { status: status.as_u16(), resource: resource.to_string() });
        }
        Ok(resp)
    }

    async fn read_json<T: DeserializeOwned>(&self, resp: Response, resource: &str) -> Result<T> {
        let bytes = resp.bytes().await.map_err(|e| Error::from_reqwest(e, self.timeout, resource))?;
        serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Detail endpoints answer a missing id with 200 and `{"error": ".."}`.
    async fn read_detail<T: DeserializeOwned>(&self, resp: Response, resource: &str) -> Result<T> {
        let value: serde_json::Value = self.read_json(resp, resource).await?;
        if value.get("id").is_none() {
            if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
                return Err(Error::Rejected(msg.to_string()));
            }
        }
        serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, resource: &str, extra: &[(&str, String)]) -> Result<T> {
        let resp = self.send::<()>(Method::GET, self.url(resource, None, extra), resource, None).await?;
        self.read_json(resp, resource).await
    }

    async fn post<B: Serialize>(&self, resource: &str, body: &B) -> Result<Option<i64>> {
        let resp = self.send(Method::POST, self.url(resource, None, &[]), resource, Some(body)).await?;
        // the status already decided success; an id in the body is a bonus
        Ok(self.read_json::<CreatedResponse>(resp, resource).await.ok().and_then(|c| c.id))
    }

    async fn put<B: Serialize>(&self, resource: &str, id: i64, body: &B) -> Result<()> {
        self.send(Method::PUT, self.url(resource, Some(id), &[]), resource, Some(body)).await?;
        Ok(())
    }

    async fn delete_id(&self, resource: &str, id: i64) -> Result<()> {
        self.send::<()>(Method::DELETE, self.url(resource, Some(id), &[]), resource, None).await?;
        Ok(())
    }

    // --- content records ---

    pub async fn list(&self, kind: ContentKind, query: &ListQuery) -> Result<Vec<ContentRecord>> {
        self.get_json(kind.resource(), &query.pairs()).await
    }

    pub async fn get(&self, kind: ContentKind, id: i64) -> Result<ContentRecord> {
        let resource = kind.resource();
        let resp = self.send::<()>(Method::GET, self.url(resource, Some(id), &[]), resource, None).await?;
        self.read_detail(resp, resource).await
    }

    fn prepared(record: &ContentRecord) -> Result<ContentRecord> {
        record.validate_for_save()?;
        let mut body = record.clone();
        body.normalize_positions();
        Ok(body)
    }

    pub async fn create(&self, kind: ContentKind, record: &ContentRecord) -> Result<Option<i64>> {
        let mut body = Self::prepared(record)?;
        body.id = None;
        self.post(kind.resource(), &body).await
    }

    /// Full-record replace.
    pub async fn update(&self, kind: ContentKind, id: i64, record: &ContentRecord) -> Result<()> {
        let body = Self::prepared(record)?;
        self.put(kind.resource(), id, &body).await
    }

    /// Create or replace depending on whether the record has been persisted.
    /// A freshly created record picks up the server-assigned id when one is returned.
    pub async fn save(&self, kind: ContentKind, record: &mut ContentRecord) -> Result<Option<i64>> {
        match record.id {
            Some(id) => {
                self.update(kind, id, record).await?;
                Ok(Some(id))
            }
            None => {
                let id = self.create(kind, record).await?;
                record.id = id;
                Ok(id)
            }
        }
    }

    /// Deletes the record; the server cascades images, links and tags.
    pub async fn delete(&self, kind: ContentKind, id: i64) -> Result<()> {
        self.delete_id(kind.resource(), id).await
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.get_json("stats", &[]).await
    }

    // --- categories ---

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get_json("categories", &[]).await
    }

    pub async fn create_category(&self, category: &Category) -> Result<Option<i64>> {
        if category.code.trim().is_empty() || category.label.trim().is_empty() {
            return Err(Error::Validation("category code and label are required".to_string()));
        }
        self.post("categories", category).await
    }

    pub async fn update_category(&self, id: i64, category: &Category) -> Result<()> {
        self.put("categories", id, category).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<()> {
        self.delete_id("categories", id).await
    }

    // --- banners ---

    pub async fn list_banners(&self, placement: Option<Placement>) -> Result<Vec<Banner>> {
        let extra: Vec<(&str, String)> = placement.map(|p| ("placement", p.as_str().to_string())).into_iter().collect();
        self.get_json("banners", &extra).await
    }

    pub async fn get_banner(&self, id: i64) -> Result<Banner> {
        let resp = self.send::<()>(Method::GET, self.url("banner", Some(id), &[]), "banner", None).await?;
        self.read_detail(resp, "banner").await
    }

    pub async fn create_banner(&self, banner: &Banner) -> Result<Option<i64>> {
        banner.validate_for_save()?;
        let mut body = banner.clone().normalized();
        body.id = None;
        self.post("banner", &body).await
    }

    pub async fn update_banner(&self, id: i64, banner: &Banner) -> Result<()> {
        banner.validate_for_save()?;
        self.put("banner", id, &banner.clone().normalized()).await
    }

    pub async fn delete_banner(&self, id: i64) -> Result<()> {
        self.delete_id("banner", id).await
    }

    // --- import ---

    pub async fn fetch_import(&self, source: ImportSource, limit: ImportLimit) -> Result<Vec<ImportCandidate>> {
        let envelope: ImportEnvelope = self.get_json(source.resource(), &[("limit", limit.get().to_string())]).await?;
        if !envelope.success {
            return Err(Error::Rejected(envelope.error.unwrap_or_else(|| "import failed".to_string())));
        }
        if let Some(count) = envelope.count {
            if count != envelope.news.len() {
                debug!(count, received = envelope.news.len(), "import count disagrees with payload");
            }
        }
        Ok(envelope.news)
    }

    // --- overview ---

    /// Fetch all six content lists and the categories concurrently. A failed
    /// list shows up empty and is named in `degraded`; it never fails the batch.
    pub async fn load_dashboard(&self) -> Dashboard {
        let query = ListQuery::default();
        let lists = futures::future::join_all(
            ContentKind::ALL.iter().map(|&kind| {
                let query = &query;
                async move { (kind, self.list(kind, query).await) }
            }),
        );
        let (lists, categories) = futures::join!(lists, self.list_categories());

        let mut dash = Dashboard::default();
        for (kind, result) in lists {
            let records = result.unwrap_or_else(|e| {
                warn!(resource = kind.resource(), error = %e, "list load failed; showing empty");
                dash.degraded.push(kind.resource());
                Vec::new()
            });
            dash.lists.insert(kind, records);
        }
        dash.categories = categories.unwrap_or_else(|e| {
            warn!(resource = "categories", error = %e, "list load failed; showing empty");
            dash.degraded.push("categories");
            Vec::new()
        });
        dash
    }
}

#[async_trait]
impl ContentStore for ApiClient {
    async fn create(&self, kind: ContentKind, record: &ContentRecord) -> Result<Option<i64>> {
        ApiClient::create(self, kind, record).await
    }
}

#[async_trait]
impl ImportFeed for ApiClient {
    async fn fetch_candidates(&self, source: ImportSource, limit: ImportLimit) -> Result<Vec<ImportCandidate>> {
        self.fetch_import(source, limit).await
    }
}
