//! Bulk import: fetch candidates from the external feed, stage them for
//! review, commit the operator's selection one create call per item.
//!
//! ```text
//! Idle -> Fetching -> Staged(candidates, selection) -> Committing -> Idle
//!            |                                             |
//!            +-- failure: Idle                             +-- partial failure: Staged (unchanged)
//! ```
//!
//! Creates are independent: one failure never aborts the rest, nothing is
//! rolled back, nothing is retried. A fully successful commit clears the
//! stage; anything less leaves candidates and selection in place so the
//! operator can retry.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ContentStore, ImportFeed};
use crate::content::ContentKind;
use crate::error::{Error, Result};
use crate::mapping::record_from_candidate;

pub const DEFAULT_IMPORT_AUTHOR: &str = "GlobalMsk.ru";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportSource {
    #[default]
    Rss,
    Html,
}

impl ImportSource {
    pub fn resource(self) -> &'static str {
        match self {
            ImportSource::Rss => "import-rss",
            ImportSource::Html => "import-news",
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { ImportSource::Rss => "rss", ImportSource::Html => "html" })
    }
}

impl FromStr for ImportSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" => Ok(ImportSource::Rss),
            "html" => Ok(ImportSource::Html),
            other => Err(Error::Validation(format!("unknown import source: {other}"))),
        }
    }
}

/// Number of items to request, 1..=50.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLimit(u32);

impl ImportLimit {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 50;

    pub fn new(n: u32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&n) { Ok(Self(n)) } else { Err(Error::InvalidLimit(n)) }
    }

    pub fn get(self) -> u32 { self.0 }
}

impl Default for ImportLimit {
    fn default() -> Self { Self(20) }
}

/// An item pulled from the feed. Lives only between fetch and commit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportCandidate {
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub image_url: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub source_url: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub time_label: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub category_code: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub category_label: String,
    #[serde(default, deserialize_with = "crate::types::nullable")]
    pub content: String,
}

/// Candidates awaiting review plus the operator's selection (indices into `candidates`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Staged {
    candidates: Vec<ImportCandidate>,
    selection: BTreeSet<usize>,
}

impl Staged {
    pub fn new(candidates: Vec<ImportCandidate>) -> Self {
        Self { candidates, selection: BTreeSet::new() }
    }

    pub fn candidates(&self) -> &[ImportCandidate] { &self.candidates }
    pub fn selection(&self) -> &BTreeSet<usize> { &self.selection }
    pub fn is_selected(&self, index: usize) -> bool { self.selection.contains(&index) }

    pub fn all_selected(&self) -> bool {
        self.selection.len() == self.candidates.len()
    }

    pub fn toggle(&mut self, index: usize) -> Result<bool> {
        if index >= self.candidates.len() {
            return Err(Error::Validation(format!(
                "candidate {index} out of range (staged: {})",
                self.candidates.len()
            )));
        }
        if !self.selection.remove(&index) {
            self.selection.insert(index);
        }
        Ok(self.selection.contains(&index))
    }

    /// Bulk switch: select everything unless everything is already selected,
    /// in which case clear.
    pub fn toggle_all(&mut self) {
        if self.all_selected() {
            self.selection.clear();
        } else {
            self.selection = (0..self.candidates.len()).collect();
        }
    }

    /// Replace the selection wholesale.
    pub fn select(&mut self, indices: impl IntoIterator<Item = usize>) -> Result<()> {
        let mut next = BTreeSet::new();
        for i in indices {
            if i >= self.candidates.len() {
                return Err(Error::Validation(format!(
                    "candidate {i} out of range (staged: {})",
                    self.candidates.len()
                )));
            }
            next.insert(i);
        }
        self.selection = next;
        Ok(())
    }

    fn selected(&self) -> impl Iterator<Item = (usize, &ImportCandidate)> {
        self.selection.iter().filter_map(|&i| self.candidates.get(i).map(|c| (i, c)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Fetching,
    Staged(Staged),
    Committing,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Fetching => "fetching",
            PipelineState::Staged(_) => "staged",
            PipelineState::Committing => "committing",
        }
    }
}

/// What happened to a fetch once it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// This many candidates are now staged.
    Staged(usize),
    /// The stage was discarded while the request was in flight; the result was dropped.
    Dropped,
}

/// Result of one create call during commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Index into the staged candidate list.
    pub index: usize,
    pub title: String,
    /// Server-assigned id when the response carried one.
    pub result: Result<Option<i64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub outcomes: Vec<CommitOutcome>,
}

impl CommitReport {
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn error_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.error_count() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CommitOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

impl fmt::Display for CommitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "imported: {}, errors: {}", self.success_count(), self.error_count())
    }
}

struct Inner {
    state: PipelineState,
    // Bumped by every fetch/commit start and every discard; a request whose
    // ticket no longer matches must not touch the state.
    generation: u64,
}

pub struct ImportPipeline {
    inner: Mutex<Inner>,
    author: String,
    concurrency: usize,
}

impl Default for ImportPipeline {
    fn default() -> Self { Self::new(DEFAULT_IMPORT_AUTHOR, 1) }
}

impl ImportPipeline {
    /// `concurrency` bounds in-flight creates during commit; 1 is sequential.
    pub fn new(author: impl Into<String>, concurrency: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { state: PipelineState::Idle, generation: 0 }),
            author: author.into(),
            concurrency: concurrency.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PipelineState { self.lock().state.clone() }

    pub fn staged(&self) -> Option<Staged> {
        match &self.lock().state {
            PipelineState::Staged(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Fetch candidates and stage them, replacing anything already staged.
    /// Rejected with [`Error::ImportBusy`] while a fetch or commit is running.
    pub async fn import(&self, feed: &dyn ImportFeed, source: ImportSource, limit: ImportLimit) -> Result<FetchOutcome> {
        let ticket = {
            let mut inner = self.lock();
            if matches!(inner.state, PipelineState::Fetching | PipelineState::Committing) {
                return Err(Error::ImportBusy);
            }
            inner.state = PipelineState::Fetching;
            inner.generation += 1;
            inner.generation
        };
        info!(%source, limit = limit.get(), "fetching import candidates");

        let fetched = feed.fetch_candidates(source, limit).await;

        let mut inner = self.lock();
        if inner.generation != ticket {
            debug!("import fetch finished after discard; dropping result");
            return Ok(FetchOutcome::Dropped);
        }
        match fetched {
            Ok(candidates) => {
                let n = candidates.len();
                inner.state = PipelineState::Staged(Staged::new(candidates));
                info!(count = n, "import candidates staged");
                Ok(FetchOutcome::Staged(n))
            }
            Err(e) => {
                inner.state = PipelineState::Idle;
                warn!(error = %e, "import fetch failed");
                Err(e)
            }
        }
    }

    fn with_staged<T>(&self, f: impl FnOnce(&mut Staged) -> Result<T>) -> Result<T> {
        let mut inner = self.lock();
        match &mut inner.state {
            PipelineState::Staged(s) => f(s),
            PipelineState::Fetching | PipelineState::Committing => Err(Error::ImportBusy),
            PipelineState::Idle => Err(Error::NotStaged),
        }
    }

    /// Flip one candidate's selection; returns whether it is now selected.
    pub fn toggle(&self, index: usize) -> Result<bool> {
        self.with_staged(|s| s.toggle(index))
    }

    pub fn toggle_all(&self) -> Result<()> {
        self.with_staged(|s| {
            s.toggle_all();
            Ok(())
        })
    }

    pub fn select(&self, indices: impl IntoIterator<Item = usize>) -> Result<()> {
        self.with_staged(|s| s.select(indices))
    }

    /// Drop candidates and selection and return to idle. An in-flight fetch
    /// or commit keeps running, but its result will no longer be applied.
    pub fn discard(&self) {
        let mut inner = self.lock();
        if !matches!(inner.state, PipelineState::Idle) {
            debug!(from = inner.state.name(), "import stage discarded");
        }
        inner.generation += 1;
        inner.state = PipelineState::Idle;
    }

    /// Create one news record per selected candidate and tally the outcomes.
    ///
    /// Fails with [`Error::EmptySelection`] before any network call when
    /// nothing is selected. Per-item failures are reported in the returned
    /// [`CommitReport`], never as an `Err`.
    pub async fn commit(&self, store: &dyn ContentStore) -> Result<CommitReport> {
        let (snapshot, ticket) = {
            let mut inner = self.lock();
            let snapshot = match &inner.state {
                PipelineState::Staged(s) if s.selection.is_empty() => return Err(Error::EmptySelection),
                PipelineState::Staged(s) => s.clone(),
                PipelineState::Fetching | PipelineState::Committing => return Err(Error::ImportBusy),
                PipelineState::Idle => return Err(Error::NotStaged),
            };
            inner.state = PipelineState::Committing;
            inner.generation += 1;
            (snapshot, inner.generation)
        };

        let jobs: Vec<(usize, String, _)> = snapshot
            .selected()
            .map(|(i, c)| (i, c.title.clone(), record_from_candidate(c, &self.author)))
            .collect();
        info!(selected = jobs.len(), concurrency = self.concurrency, "committing import");

        // `buffered` yields in submission order, so outcomes line up with the selection
        let outcomes: Vec<CommitOutcome> = stream::iter(jobs)
            .map(|(index, title, record)| async move {
                let result = store.create(ContentKind::News, &record).await;
                if let Err(e) = &result {
                    warn!(index, %title, error = %e, "import create failed");
                }
                CommitOutcome { index, title, result }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = CommitReport { outcomes };
        info!(success = report.success_count(), errors = report.error_count(), "import commit finished");

        let mut inner = self.lock();
        if inner.generation == ticket {
            inner.state = if report.is_complete() {
                PipelineState::Idle
            } else {
                PipelineState::Staged(snapshot)
            };
        }
        Ok(report)
    }
}
