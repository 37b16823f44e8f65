//! Omnibar - query evaluation across candidate sources
//!
//! Each evaluation fans out to every source on its own task, waits for all of them
//! to settle, then scores, merges and sorts on a blocking worker.
//!
//! Supersession Architecture:
//! Every evaluation takes the next generation number. Starting a newer evaluation
//! cancels the older one's CancellationToken, which the older run checks before
//! scoring. Emission compares generations under the same lock that hands out new
//! ones, so a stale result can never reach subscribers after a newer run started.
//! Dropping an in-flight evaluation future cancels its token via a DropGuard.
//! Source tasks still running when a run is cancelled or dropped are aborted.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

use crate::candidate::SearchCandidate;
use crate::config::EngineConfig;
use crate::interface::{CandidateSource, MatchResult, OmniError};
use crate::query::{BangRegistry, Query};
use crate::ranking::score_candidates;
use crate::search::assemble_results;

/// Lifecycle of one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Gathering,
    Scoring,
    Done,
    Cancelled,
}

impl PipelineState {
    /// Whether `next` is a legal step from `self`
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Gathering)
                | (Idle, Done)
                | (Gathering, Scoring)
                | (Scoring, Done)
                | (Idle | Gathering | Scoring, Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Cancelled)
    }
}

/// Results published to subscribers by the current generation
#[derive(Debug, Clone)]
pub struct Emission {
    pub generation: u64,
    pub query: String,
    pub results: Arc<Vec<MatchResult>>,
}

/// RAII guard that cancels a token when dropped.
/// When the host drops an evaluation future, this guard cancels that run.
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// The generation allowed to emit, and where it is in its lifecycle
struct CurrentRun {
    generation: u64,
    state: PipelineState,
    token: CancellationToken,
}

/// Aborts the spawned source tasks that are still running when dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Invoke every source concurrently and concatenate what they return.
///
/// A source that errors or panics contributes nothing; the failure is logged.
pub async fn gather_candidates(
    sources: &[Arc<dyn CandidateSource>],
    tokens: &[String],
    query: &Query,
) -> Vec<SearchCandidate> {
    gather_until_cancelled(sources, tokens, query, &CancellationToken::new())
        .await
        .unwrap_or_default()
}

/// `gather_candidates` that stops waiting once `token` is cancelled, aborting the
/// source tasks still in flight. Returns `None` when cancelled.
async fn gather_until_cancelled(
    sources: &[Arc<dyn CandidateSource>],
    tokens: &[String],
    query: &Query,
    token: &CancellationToken,
) -> Option<Vec<SearchCandidate>> {
    let handles: Vec<_> = sources
        .iter()
        .map(|source| {
            let source = Arc::clone(source);
            let tokens = tokens.to_vec();
            let query = query.clone();
            tokio::spawn(async move { source.candidates(&tokens, &query).await })
        })
        .collect();
    let _abort = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());

    let settled = tokio::select! {
        settled = join_all(handles) => settled,
        _ = token.cancelled() => {
            tracing::debug!(sources = sources.len(), "gathering cancelled, aborting sources");
            return None;
        }
    };

    let mut candidates = Vec::new();
    for (source, outcome) in sources.iter().zip(settled) {
        match outcome {
            Ok(Ok(found)) => {
                tracing::trace!(source = source.name(), count = found.len(), "source settled");
                candidates.extend(found);
            }
            Ok(Err(error)) => {
                tracing::warn!(source = source.name(), %error, "candidate source failed");
            }
            Err(join_error) => {
                tracing::warn!(source = source.name(), error = %join_error, "candidate source panicked");
            }
        }
    }
    Some(candidates)
}

/// Score, merge and order gathered candidates. Synchronous.
pub fn rank_candidates(tokens: &[String], candidates: Vec<SearchCandidate>, config: &EngineConfig) -> Vec<MatchResult> {
    let scored = score_candidates(tokens, candidates, config, Utc::now());
    assemble_results(scored, config.max_results)
}

/// Evaluate `raw_text` once, without supersession tracking.
///
/// Returns an empty list without calling any source when the query has no tokens
/// to match.
pub async fn evaluate(
    raw_text: &str,
    sources: &[Arc<dyn CandidateSource>],
    bangs: &BangRegistry,
    config: &EngineConfig,
) -> Vec<MatchResult> {
    let query = Query::parse(raw_text, bangs);
    let tokens = query.active_tokens().to_vec();
    if tokens.is_empty() {
        return Vec::new();
    }
    let candidates = gather_candidates(sources, &tokens, &query).await;
    rank_candidates(&tokens, candidates, config)
}

/// Stateful evaluator for a live omnibar: last query wins.
///
/// Concurrency Model:
/// - Sources run on tokio tasks, one per source
/// - Scoring for a run happens on one `spawn_blocking` thread
/// - The current generation lives behind a single mutex; emission holds it
pub struct Omnibar {
    sources: Vec<Arc<dyn CandidateSource>>,
    bangs: Arc<BangRegistry>,
    config: Arc<EngineConfig>,
    current: Mutex<CurrentRun>,
    emitter: watch::Sender<Option<Emission>>,
}

impl Omnibar {
    /// Fails with `OmniError::InvalidConfig` if `config` does not validate.
    pub fn new(
        sources: Vec<Arc<dyn CandidateSource>>,
        bangs: Arc<BangRegistry>,
        config: EngineConfig,
    ) -> Result<Self, OmniError> {
        let config = config.validated()?;
        let (emitter, _) = watch::channel(None);
        Ok(Self {
            sources,
            bangs,
            config: Arc::new(config),
            current: Mutex::new(CurrentRun {
                generation: 0,
                state: PipelineState::Idle,
                token: CancellationToken::new(),
            }),
            emitter,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bangs(&self) -> &BangRegistry {
        &self.bangs
    }

    /// Receive every emission from the current generation
    pub fn subscribe(&self) -> watch::Receiver<Option<Emission>> {
        self.emitter.subscribe()
    }

    /// Latest generation handed out
    pub fn generation(&self) -> u64 {
        self.current.lock().generation
    }

    /// State of the latest generation
    pub fn state(&self) -> PipelineState {
        self.current.lock().state
    }

    /// Start a new generation, cancelling whatever run was current.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut current = self.current.lock();
        current.token.cancel();
        if !current.state.is_terminal() && current.generation > 0 {
            tracing::debug!(generation = current.generation, "superseded");
        }
        current.generation += 1;
        current.state = PipelineState::Idle;
        current.token = CancellationToken::new();
        (current.generation, current.token.clone())
    }

    /// Move `generation` to `next` if it is still current.
    fn advance(&self, generation: u64, next: PipelineState) -> bool {
        let mut current = self.current.lock();
        if current.generation != generation {
            return false;
        }
        debug_assert!(current.state.can_advance_to(next), "{:?} -> {:?}", current.state, next);
        tracing::debug!(generation, from = ?current.state, to = ?next, "pipeline state");
        current.state = next;
        true
    }

    fn superseded(&self, generation: u64) -> OmniError {
        let current = self.current.lock().generation;
        tracing::debug!(generation, current, "discarding stale results");
        OmniError::Superseded { generation, current }
    }

    /// Publish results if `generation` is still current. The lock is held across
    /// the send so no newer run can start in between.
    fn emit(&self, generation: u64, query: &Query, results: Vec<MatchResult>) -> Result<Vec<MatchResult>, OmniError> {
        let mut current = self.current.lock();
        if current.generation != generation {
            let newer = current.generation;
            drop(current);
            tracing::debug!(generation, current = newer, "discarding stale results");
            return Err(OmniError::Superseded { generation, current: newer });
        }
        current.state = PipelineState::Done;
        self.emitter.send_replace(Some(Emission {
            generation,
            query: query.raw_text.clone(),
            results: Arc::new(results.clone()),
        }));
        Ok(results)
    }

    /// Evaluate `raw_text` as the newest query.
    ///
    /// Returns `OmniError::Superseded` if another evaluation started before this one
    /// finished; its results are then never emitted.
    pub async fn evaluate(&self, raw_text: &str) -> Result<Vec<MatchResult>, OmniError> {
        let (generation, token) = self.begin();
        let _guard = DropGuard::new(token.clone());

        let query = Query::parse(raw_text, &self.bangs);
        let tokens = query.active_tokens().to_vec();
        if tokens.is_empty() {
            return self.emit(generation, &query, Vec::new());
        }

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();

        if !self.advance(generation, PipelineState::Gathering) {
            return Err(self.superseded(generation));
        }
        let Some(candidates) = gather_until_cancelled(&self.sources, &tokens, &query, &token).await else {
            return Err(self.superseded(generation));
        };

        #[cfg(feature = "perf-log")]
        let t1 = std::time::Instant::now();
        #[cfg(feature = "perf-log")]
        let num_candidates = candidates.len();

        if token.is_cancelled() || !self.advance(generation, PipelineState::Scoring) {
            return Err(self.superseded(generation));
        }

        let config = Arc::clone(&self.config);
        let handle = tokio::task::spawn_blocking(move || rank_candidates(&tokens, candidates, &config));
        let results = match handle.await {
            Ok(results) => results,
            Err(_join_error) => {
                // JoinError means the scoring task panicked or was aborted
                self.advance(generation, PipelineState::Cancelled);
                return Err(OmniError::Cancelled);
            }
        };

        #[cfg(feature = "perf-log")]
        {
            let t2 = std::time::Instant::now();
            tracing::debug!(
                generation,
                gather_ms = (t1 - t0).as_secs_f64() * 1000.0,
                score_ms = (t2 - t1).as_secs_f64() * 1000.0,
                candidates = num_candidates,
                results = results.len(),
                "[perf] evaluation"
            );
        }

        self.emit(generation, &query, results)
    }
}
