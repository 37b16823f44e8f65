//! Highlight span merging and final result ordering.
//!
//! Spans from different tokens over the same field are folded into a minimal
//! sorted list for the renderer. Results are cut at `score > 0`, put in a total
//! order (score, then recency, then id) and truncated.

use std::cmp::Ordering;

use crate::interface::{MatchResult, MatchSpan};

/// Merge overlapping or touching spans into a sorted, non-overlapping list.
pub fn merge_spans(mut spans: Vec<MatchSpan>) -> Vec<MatchSpan> {
    spans.retain(|s| !s.is_empty());
    spans.sort_unstable_by_key(|s| (s.start, s.end));

    let mut merged: Vec<MatchSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut() {
            if span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        }
        merged.push(span);
    }
    merged
}

/// Result order: higher score first, then more recent first (no timestamp last),
/// then ascending id.
pub fn compare_results(a: &MatchResult, b: &MatchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| match (a.candidate.timestamp(), b.candidate.timestamp()) {
            (Some(ta), Some(tb)) => tb.cmp(&ta),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.candidate.id().cmp(b.candidate.id()))
}

/// Keep positive scores, sort, and truncate to `max_results`.
pub fn assemble_results(mut results: Vec<MatchResult>, max_results: usize) -> Vec<MatchResult> {
    results.retain(|r| r.score > 0.0);
    results.sort_unstable_by(compare_results);
    results.truncate(max_results);
    results
}
