//! The query-result pipeline: validate → send → order, then the pure
//! render-time projection (truncate → classify → sanitize).
//!
//! The pipeline is stateless per call and performs exactly one backend
//! call per search: no retry, no backoff. Overlapping-call supersession
//! is the caller's job via [`sitesift_core::ResultsState`].

use crate::sanitize::{sanitize, SanitizePolicy};
use sitesift_core::{
    RenderedResponse, RenderedResult, Result, ScoreBucket, SearchBackend, SearchRequest,
    SearchResponse,
};

/// Run one search against `backend`.
///
/// Both string inputs are trimmed; an empty or syntactically invalid url,
/// or an empty query, fails with `Error::Validation` before any network
/// activity. On success the results come back stably re-sorted descending
/// by score (absent scores order as zero), with the service's reported
/// `count` passed through untouched and no truncation applied yet.
pub async fn search(
    backend: &dyn SearchBackend,
    target: &str,
    query_text: &str,
    requested_count: usize,
) -> Result<SearchResponse> {
    let req = SearchRequest::new(target, query_text, requested_count)?;
    tracing::trace!(url = %req.url, query = %req.query, count = req.count, "search issued");

    let mut resp = backend.search(&req).await?;
    resp.sort_by_score();

    tracing::trace!(
        returned = resp.results.len(),
        reported = resp.count,
        "search resolved"
    );
    Ok(resp)
}

/// Project a (sorted) response into its display form: the top
/// `requested_count` entries, each classified and with its snippet
/// sanitized under `policy`.
///
/// Pure and repeatable; never yields more entries than the response holds.
pub fn render(
    resp: &SearchResponse,
    requested_count: usize,
    policy: &SanitizePolicy,
) -> RenderedResponse {
    let results = resp
        .results
        .iter()
        .take(requested_count)
        .map(|r| RenderedResult {
            ordinal: r.ordinal,
            score: r.score,
            bucket: ScoreBucket::classify(r.sort_score()),
            html_snippet: sanitize(&r.html_snippet, policy),
            text_preview: r.text_preview.clone(),
            tokens: r.tokens,
        })
        .collect();

    RenderedResponse {
        url: resp.url.clone(),
        query: resp.query.clone(),
        count: resp.count,
        results,
    }
}

/// `search` + `render` in one call: the shape handed to a presentation
/// shell for direct display.
pub async fn search_rendered(
    backend: &dyn SearchBackend,
    target: &str,
    query_text: &str,
    requested_count: usize,
    policy: &SanitizePolicy,
) -> Result<RenderedResponse> {
    let resp = search(backend, target, query_text, requested_count).await?;
    Ok(render(&resp, requested_count, policy))
}
