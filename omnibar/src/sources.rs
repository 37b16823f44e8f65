//! Built-in candidate sources.
//!
//! `StaticSource` serves a fixed list. `FallbackSource` derives candidates from the
//! query text alone: a URL to navigate to when the text looks like one, a web
//! search, a site search when a bang is active, and bang suggestions while a
//! trigger is still being typed.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::candidate::{CandidateRecord, SearchCandidate};
use crate::config::EngineConfig;
use crate::interface::{CandidateKind, CandidateSource, SearchField};
use crate::query::{BangRegistry, Query, TEMPLATE_PLACEHOLDER};

/// Bare `host.tld[:port][/path]` or `localhost[:port][/path]`
static BARE_HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(localhost|[a-z0-9-]+(\.[a-z0-9-]+)*\.[a-z]{2,})(:\d{1,5})?(/\S*)?$").unwrap()
});

/// Protocols accepted as typed links
const LINK_PROTOCOLS: &[&str] = &["http://", "https://"];

/// Normalized URL for `text` if it looks like something to navigate to.
pub fn detect_url(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > 2000 || trimmed.contains(char::is_whitespace) {
        return None;
    }

    let lower = trimmed.to_lowercase();
    let candidate = if LINK_PROTOCOLS.iter().any(|p| lower.starts_with(p)) {
        trimmed.to_string()
    } else if BARE_HOST_REGEX.is_match(trimmed) {
        format!("https://{trimmed}")
    } else {
        return None;
    };

    if !validator::validate_url(candidate.as_str()) {
        return None;
    }
    url::Url::parse(&candidate).ok().map(|u| u.to_string())
}

/// Serves clones of a fixed candidate list on every query.
pub struct StaticSource {
    name: String,
    candidates: Vec<SearchCandidate>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, candidates: Vec<SearchCandidate>) -> Self {
        Self { name: name.into(), candidates }
    }

    pub fn from_records(name: impl Into<String>, records: Vec<CandidateRecord>) -> Self {
        Self::new(name, records.into_iter().map(SearchCandidate::from).collect())
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait::async_trait]
impl CandidateSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn candidates(&self, _tokens: &[String], _query: &Query) -> anyhow::Result<Vec<SearchCandidate>> {
        Ok(self.candidates.clone())
    }
}

/// Candidates synthesized from the query itself
pub struct FallbackSource {
    bangs: Arc<BangRegistry>,
    search_template: String,
    bang_rank_scale: f64,
}

impl FallbackSource {
    pub fn new(bangs: Arc<BangRegistry>, config: &EngineConfig) -> Self {
        Self {
            bangs,
            search_template: config.default_search_template.clone(),
            bang_rank_scale: config.bang_rank_scale,
        }
    }

    fn web_search(&self, raw: &str) -> SearchCandidate {
        let encoded: String = url::form_urlencoded::byte_serialize(raw.as_bytes()).collect();
        SearchCandidate::builder("search:default", CandidateKind::Search, format!("Search for {raw}"))
            .url(self.search_template.replace(TEMPLATE_PLACEHOLDER, &encoded))
            .searchable_fields(&[SearchField::Title])
            .build()
    }

    fn bang_suggestions(&self, prefix: &str) -> Vec<SearchCandidate> {
        self.bangs
            .suggestions(prefix)
            .into_iter()
            .map(|def| {
                SearchCandidate::builder(
                    format!("bang-suggestion:{}", def.trigger),
                    CandidateKind::Search,
                    format!("{} {}", def.trigger, def.site_name),
                )
                .url(format!("https://{}", def.domain))
                .supplemental_text(format!("Search {}", def.site_name))
                .searchable_fields(&[SearchField::Title])
                .score_modifier(def.rank as f64 / self.bang_rank_scale)
                .build()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl CandidateSource for FallbackSource {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn candidates(&self, _tokens: &[String], query: &Query) -> anyhow::Result<Vec<SearchCandidate>> {
        if query.raw_text.is_empty() {
            return Ok(Vec::new());
        }

        if let (Some(bang), Some(args)) = (&query.active_bang, query.bang_argument_text()) {
            if args.is_empty() {
                return Ok(Vec::new());
            }
            let site_search = SearchCandidate::builder(
                format!("bang:{}", bang.trigger),
                CandidateKind::Search,
                format!("Search {} for {}", bang.site_name, args),
            )
            .url(bang.search_url(&args))
            .searchable_fields(&[SearchField::Title])
            .build();
            return Ok(vec![site_search]);
        }

        if let Some(prefix) = &query.potential_bang_text {
            return Ok(self.bang_suggestions(prefix));
        }

        let mut out = Vec::with_capacity(2);
        if let Some(url) = detect_url(&query.raw_text) {
            out.push(
                SearchCandidate::builder(format!("url:{url}"), CandidateKind::Url, query.raw_text.clone())
                    .url(url)
                    .build(),
            );
        }
        out.push(self.web_search(&query.raw_text));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> FallbackSource {
        FallbackSource::new(Arc::new(BangRegistry::builtin()), &EngineConfig::default())
    }

    async fn fallback_for(raw: &str) -> Vec<SearchCandidate> {
        let source = fallback();
        let query = Query::parse(raw, &BangRegistry::builtin());
        source.candidates(&query.tokens, &query).await.unwrap()
    }

    #[test]
    fn test_detect_url_with_scheme() {
        assert_eq!(detect_url("https://example.com/a?b=c").as_deref(), Some("https://example.com/a?b=c"));
        assert_eq!(detect_url("HTTP://Example.com").as_deref(), Some("http://example.com/"));
    }

    #[test]
    fn test_detect_url_bare_host() {
        assert_eq!(detect_url("example.com").as_deref(), Some("https://example.com/"));
        assert_eq!(detect_url("docs.rs/tokio").as_deref(), Some("https://docs.rs/tokio"));
        assert_eq!(detect_url("localhost:8080/app").as_deref(), Some("https://localhost:8080/app"));
    }

    #[test]
    fn test_detect_url_rejects_plain_text() {
        assert_eq!(detect_url("zillow 17"), None);
        assert_eq!(detect_url("gmail"), None);
        assert_eq!(detect_url("version 1.0"), None);
        assert_eq!(detect_url("ftp://files.example.com"), None);
        assert_eq!(detect_url(""), None);
    }

    #[tokio::test]
    async fn test_fallback_web_search() {
        let out = fallback_for("rust book").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), CandidateKind::Search);
        assert_eq!(out[0].title(), "Search for rust book");
        assert_eq!(out[0].url(), Some("https://duckduckgo.com/?q=rust+book"));
    }

    #[tokio::test]
    async fn test_fallback_url_and_search() {
        let out = fallback_for("example.com").await;
        let kinds: Vec<CandidateKind> = out.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, vec![CandidateKind::Url, CandidateKind::Search]);
        assert_eq!(out[0].id(), "url:https://example.com/");
    }

    #[tokio::test]
    async fn test_fallback_active_bang() {
        let out = fallback_for("!w borrow checker").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), "bang:!w");
        assert_eq!(out[0].title(), "Search Wikipedia for borrow checker");
        assert_eq!(out[0].url(), Some("https://en.wikipedia.org/w/index.php?search=borrow+checker"));

        assert!(fallback_for("!w").await.is_empty());
    }

    #[tokio::test]
    async fn test_fallback_bang_suggestions() {
        let out = fallback_for("!y").await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title(), "!yt YouTube");
        assert_eq!(out[0].score_modifier(), Some(0.8));
    }

    #[tokio::test]
    async fn test_static_source_returns_all() {
        let source = StaticSource::new(
            "tabs",
            vec![SearchCandidate::builder("a", CandidateKind::Tab, "A").build()],
        );
        let query = Query::parse("anything", &BangRegistry::default());
        let out = source.candidates(&query.tokens, &query).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(source.name(), "tabs");
    }
}
