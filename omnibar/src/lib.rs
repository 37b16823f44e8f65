//! Omnibar - query engine for a browser command bar
//!
//! Turns incrementally typed text plus candidates from many sources (tabs,
//! bookmarks, history, recently closed items, commands, URL and search fallbacks,
//! bangs) into a ranked list with per-field highlight spans.
//!
//! The pipeline is: tokenize and parse the query, fan out to every
//! `CandidateSource`, score each candidate against the tokens, merge highlight
//! spans, then sort and truncate. `Omnibar` wraps that in a last-query-wins
//! evaluator for live typing.

pub mod candidate;
pub mod config;
pub mod interface;
pub mod pipeline;
pub mod query;
pub mod ranking;
pub mod search;
pub mod sources;
pub mod tokenizer;

pub use candidate::{CandidateBuilder, CandidateRecord, SearchCandidate};
pub use config::EngineConfig;
pub use interface::*;
pub use pipeline::{evaluate, Emission, Omnibar, PipelineState};
pub use query::{BangDefinition, BangRegistry, Query};
pub use sources::{FallbackSource, StaticSource};
