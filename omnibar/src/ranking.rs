//! Weighted token scoring for omnibar candidates.
//!
//! Every token must occur somewhere in a candidate's searchable fields or the
//! candidate is dropped. Surviving candidates score the sum of their occurrence
//! weights (scaled per field), a base weight for their kind, a recency bonus that
//! halves every half-life, and any modifier the source attached.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::candidate::SearchCandidate;
use crate::config::EngineConfig;
use crate::interface::{MatchResult, MatchSpan, SearchField};
use crate::search::merge_spans;
use crate::tokenizer::NormalizedText;

/// How an occurrence of a token sits within its field, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceKind {
    /// The token is the whole field
    Exact,
    /// The field starts with the token
    Prefix,
    /// The token follows whitespace, `-`, `_` or `/`
    WordStart,
    Substring,
}

impl OccurrenceKind {
    pub fn weight(&self, config: &EngineConfig) -> f64 {
        let w = &config.occurrence_weights;
        match self {
            OccurrenceKind::Exact => w.exact,
            OccurrenceKind::Prefix => w.prefix,
            OccurrenceKind::WordStart => w.word_start,
            OccurrenceKind::Substring => w.substring,
        }
    }
}

fn is_word_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '/')
}

/// Classify an occurrence at `byte_start..byte_start + byte_len` of normalized `text`.
pub(crate) fn classify_occurrence(text: &str, byte_start: usize, byte_len: usize) -> OccurrenceKind {
    if byte_start == 0 && byte_len == text.len() {
        OccurrenceKind::Exact
    } else if byte_start == 0 {
        OccurrenceKind::Prefix
    } else if text[..byte_start].chars().next_back().is_some_and(is_word_boundary) {
        OccurrenceKind::WordStart
    } else {
        OccurrenceKind::Substring
    }
}

/// All non-overlapping occurrences of `token` in a normalized field, left to right.
pub(crate) fn find_occurrences(token: &str, field: &NormalizedText) -> Vec<(OccurrenceKind, MatchSpan)> {
    if token.is_empty() {
        return Vec::new();
    }
    let text = field.as_str();
    text.match_indices(token)
        .map(|(pos, m)| {
            let kind = classify_occurrence(text, pos, m.len());
            (kind, field.original_span(pos, pos + m.len()))
        })
        .collect()
}

/// `max_recency_bonus * 0.5^(age / half_life)`; zero without a timestamp.
/// Timestamps in the future count as age zero. A half-life that is not a positive
/// finite number disables the bonus.
pub fn recency_bonus(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>, config: &EngineConfig) -> f64 {
    let Some(ts) = timestamp else {
        return 0.0;
    };
    let half_life = config.recency_half_life_secs;
    if !(half_life.is_finite() && half_life > 0.0) || !config.max_recency_bonus.is_finite() {
        return 0.0;
    }
    let age_secs = ((now - ts).num_milliseconds() as f64 / 1000.0).max(0.0);
    config.max_recency_bonus * 0.5_f64.powf(age_secs / half_life)
}

/// Score one candidate against the active tokens.
///
/// Returns `None` as soon as a token has no occurrence in any searchable field.
/// The score is not filtered here; candidates with a non-positive score still come
/// back so the assembler can apply its own cut.
pub fn score_candidate(
    tokens: &[String],
    candidate: &SearchCandidate,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Option<(f64, BTreeMap<SearchField, Vec<MatchSpan>>)> {
    if tokens.is_empty() {
        return None;
    }

    let mut field_match_total = 0.0;
    let mut spans: BTreeMap<SearchField, Vec<MatchSpan>> = BTreeMap::new();

    for token in tokens {
        let mut token_matched = false;
        for &field in candidate.searchable_fields() {
            let Some(text) = candidate.normalized_field(field) else {
                continue;
            };
            let occurrences = find_occurrences(token, text);
            if occurrences.is_empty() {
                continue;
            }
            token_matched = true;
            let field_weight = config.field_weights.weight(field);
            let field_spans = spans.entry(field).or_default();
            for (kind, span) in occurrences {
                field_match_total += kind.weight(config) * field_weight;
                field_spans.push(span);
            }
        }
        if !token_matched {
            return None;
        }
    }

    let score = field_match_total
        + config.kind_weights.weight(candidate.kind())
        + recency_bonus(candidate.timestamp(), now, config)
        + candidate.score_modifier().unwrap_or(0.0);

    let merged = spans
        .into_iter()
        .map(|(field, field_spans)| (field, merge_spans(field_spans)))
        .collect();

    Some((score, merged))
}

/// Score every candidate, dropping the ones that miss a token. Output order follows
/// input order; sorting and the `score > 0` cut happen in the assembler.
pub fn score_candidates(
    tokens: &[String],
    candidates: impl IntoIterator<Item = SearchCandidate>,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Vec<MatchResult> {
    if tokens.is_empty() {
        return Vec::new();
    }
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let (score, matches) = score_candidate(tokens, &candidate, config, now)?;
            Some(MatchResult { candidate, score, matches })
        })
        .collect()
}
