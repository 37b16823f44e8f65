//! Omnibar Interface Definition
//!
//! This file defines the public types shared between the engine and its hosts:
//! candidate kinds and fields, match spans and results, the candidate source and
//! action capabilities, and the error type. It acts as the source of truth for
//! shared types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::SearchCandidate;
use crate::query::Query;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// What kind of browser resource (or synthetic entry) a candidate represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Tab,
    Bookmark,
    History,
    RecentlyClosed,
    Command,
    Url,
    Search,
}

impl CandidateKind {
    /// Every kind, in declaration order
    pub const ALL: [CandidateKind; 7] = [
        CandidateKind::Tab,
        CandidateKind::Bookmark,
        CandidateKind::History,
        CandidateKind::RecentlyClosed,
        CandidateKind::Command,
        CandidateKind::Url,
        CandidateKind::Search,
    ];

    /// Short label shown next to a result
    pub fn label(&self) -> &'static str {
        match self {
            CandidateKind::Tab => "Tab",
            CandidateKind::Bookmark => "Bookmark",
            CandidateKind::History => "History",
            CandidateKind::RecentlyClosed => "Recently Closed",
            CandidateKind::Command => "Command",
            CandidateKind::Url => "URL",
            CandidateKind::Search => "Search",
        }
    }
}

/// A candidate field that may participate in matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Title,
    Url,
    SupplementalText,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Title, SearchField::Url, SearchField::SupplementalText];
}

/// How the host should open a chosen result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenModifier {
    #[default]
    None,
    NewTab,
    NewWindow,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A matched range `[start, end)` in char offsets of the original field text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// A candidate that survived matching, with its score and merged highlight spans.
///
/// `matches` only holds fields with at least one occurrence; each span list is
/// sorted and non-overlapping.
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub candidate: SearchCandidate,
    pub score: f64,
    pub matches: BTreeMap<SearchField, Vec<MatchSpan>>,
}

impl MatchResult {
    /// Matched substrings of `field`, in order
    pub fn highlighted(&self, field: SearchField) -> Vec<String> {
        let (Some(text), Some(spans)) = (self.candidate.field_text(field), self.matches.get(&field)) else {
            return Vec::new();
        };
        let chars: Vec<char> = text.chars().collect();
        spans
            .iter()
            .filter(|s| s.end <= chars.len())
            .map(|s| chars[s.start..s.end].iter().collect())
            .collect()
    }
}

/// Error type for omnibar operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OmniError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid bang table: {0}")]
    InvalidBangTable(String),
    #[error("Query superseded by generation {current}")]
    Superseded { generation: u64, current: u64 },
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACES
// ═══════════════════════════════════════════════════════════════════════════════

/// A provider of candidates (tabs, bookmarks, history, ...).
///
/// Implementations may fail; the pipeline logs the failure and carries on with
/// the candidates from the remaining sources.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    /// Name used in log events
    fn name(&self) -> &str;

    async fn candidates(&self, tokens: &[String], query: &Query) -> anyhow::Result<Vec<SearchCandidate>>;
}

/// Host-side effect run when the user picks a candidate. Never invoked by the engine.
#[async_trait::async_trait]
pub trait CandidateAction: Send + Sync + std::fmt::Debug {
    async fn execute(&self, modifier: OpenModifier, context_window_id: Option<i64>) -> anyhow::Result<()>;
}
