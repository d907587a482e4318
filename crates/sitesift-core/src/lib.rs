use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("transport failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Result-count choices a presentation shell is expected to offer.
///
/// The pipeline itself accepts any positive count; this list exists so
/// callers and tests agree on the supported picker values.
pub const SUPPORTED_RESULT_COUNTS: [usize; 4] = [3, 5, 10, 15];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub url: String,
    pub query: String,
    pub count: usize,
}

impl SearchRequest {
    /// Trim and validate inputs. This is the only gate before IO: an empty
    /// url/query or a syntactically invalid url must fail here, with no
    /// network call ever issued.
    pub fn new(target: &str, query: &str, count: usize) -> Result<Self> {
        let target = target.trim();
        let query = query.trim();
        if target.is_empty() {
            return Err(Error::Validation("url is required".to_string()));
        }
        if query.is_empty() {
            return Err(Error::Validation("query is required".to_string()));
        }
        if count == 0 {
            return Err(Error::Validation("count must be positive".to_string()));
        }
        url::Url::parse(target).map_err(|e| Error::Validation(format!("invalid url: {e}")))?;
        Ok(Self {
            url: target.to_string(),
            query: query.to_string(),
            count,
        })
    }
}

/// One retrieved passage, exactly as the service returned it.
///
/// Fields are never mutated downstream; the pipeline may reorder results but
/// each entry is passed through as-is until render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Position/identity index assigned by the service, independent of
    /// display order.
    pub ordinal: u64,
    /// Relevance in [0,1] by convention, but not contractually clamped.
    /// The service may omit it (minimal indexing pass).
    #[serde(default)]
    pub score: Option<f64>,
    /// Untrusted markup. Must pass through the sanitizer before display.
    pub html_snippet: String,
    pub text_preview: String,
    pub tokens: u64,
}

impl SearchResult {
    /// Ordering key only: an absent score sorts as zero. The displayed
    /// score stays `None`, never a fabricated zero.
    pub fn sort_score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub url: String,
    pub query: String,
    /// Total reported by the service. Informational: it is not required to
    /// equal `results.len()` and is never reconciled against it.
    pub count: u64,
    pub results: Vec<SearchResult>,
}

impl SearchResponse {
    /// Stable re-sort, descending by score. The service's own ordering
    /// survives only as the tie-break for equal (or unordered) scores.
    pub fn sort_by_score(&mut self) {
        self.results.sort_by(|a, b| {
            b.sort_score()
                .partial_cmp(&a.sort_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

/// Discrete quality classification derived from a continuous score.
///
/// Advisory only: it drives a visual treatment and carries no other
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    High,
    Medium,
    Low,
}

impl ScoreBucket {
    /// Total over the reals: every finite input (and NaN) maps to exactly
    /// one bucket.
    pub fn classify(score: f64) -> Self {
        if score > 0.8 {
            ScoreBucket::High
        } else if score > 0.6 {
            ScoreBucket::Medium
        } else {
            ScoreBucket::Low
        }
    }
}

/// A result ready for direct display: classified, and with its snippet
/// already sanitized.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedResult {
    pub ordinal: u64,
    pub score: Option<f64>,
    pub bucket: ScoreBucket,
    pub html_snippet: String,
    pub text_preview: String,
    pub tokens: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedResponse {
    pub url: String,
    pub query: String,
    pub count: u64,
    pub results: Vec<RenderedResult>,
}

/// The remote search service as an abstract capability, so tests can
/// substitute deterministic fixtures for the live endpoint.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, req: &SearchRequest) -> Result<SearchResponse>;
}

/// "Latest request wins" holder for displayed results.
///
/// The pipeline is stateless per call; honoring issuance order across
/// overlapping searches is the caller's job. `begin` hands out a
/// monotonically increasing generation token, and `commit`/`fail` apply
/// only when that token is still the newest one issued. A stale resolution
/// is discarded without touching state.
#[derive(Debug, Default)]
pub struct ResultsState {
    issued: AtomicU64,
    inner: Mutex<Applied>,
}

#[derive(Debug, Default)]
struct Applied {
    generation: u64,
    current: Option<RenderedResponse>,
}

impl ResultsState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the generation token for a search about to start. Issuing a
    /// new token supersedes every earlier in-flight search.
    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Applied> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn applies(&self, generation: u64, applied: &Applied) -> bool {
        generation == self.issued.load(Ordering::SeqCst) && generation > applied.generation
    }

    /// Apply a successful search. Returns false (state untouched) when a
    /// newer search was issued in the meantime.
    pub fn commit(&self, generation: u64, rendered: RenderedResponse) -> bool {
        let mut inner = self.lock();
        if !self.applies(generation, &inner) {
            return false;
        }
        inner.generation = generation;
        inner.current = Some(rendered);
        true
    }

    /// Apply a failed search: clears the prior displayed results so the
    /// caller re-initiates from a blank slate. Stale failures are discarded
    /// just like stale successes.
    pub fn fail(&self, generation: u64) -> bool {
        let mut inner = self.lock();
        if !self.applies(generation, &inner) {
            return false;
        }
        inner.generation = generation;
        inner.current = None;
        true
    }

    pub fn current(&self) -> Option<RenderedResponse> {
        self.lock().current.clone()
    }
}
