use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use omnibar::ranking::score_candidates;
use omnibar::search::assemble_results;
use omnibar::tokenizer::tokenize;
use omnibar::{evaluate, BangRegistry, CandidateKind, CandidateSource, EngineConfig, SearchCandidate, StaticSource};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const WORDS: &[&str] = &[
    "rust", "tokio", "async", "zillow", "houses", "upcoming", "inbox", "gmail", "settings", "chrome", "docs",
    "riverside", "weather", "forecast", "recipe", "pasta", "github", "pull", "request", "review", "café", "müller",
];

fn synthetic_candidates(count: usize) -> Vec<SearchCandidate> {
    let mut rng = StdRng::seed_from_u64(42);
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let title: Vec<&str> = (0..rng.gen_range(2..7)).map(|_| *WORDS.choose(&mut rng).unwrap()).collect();
            let kind = *CandidateKind::ALL.choose(&mut rng).unwrap();
            let slug = title.join("-");
            SearchCandidate::builder(format!("c{i}"), kind, title.join(" "))
                .url(format!("https://example{}.com/{slug}", i % 97))
                .timestamp(now - Duration::minutes(rng.gen_range(0..60 * 24 * 90)))
                .build()
        })
        .collect()
}

fn bench_scoring(c: &mut Criterion) {
    let candidates = synthetic_candidates(10_000);
    let config = EngineConfig::default();
    let now = Utc::now();

    let queries = vec![
        ("short_2char", "ru"),
        ("medium_word", "tokio"),
        ("long_word", "riverside"),
        ("multi_word", "zillow houses"),
        ("diacritics", "cafe muller"),
        ("no_match", "xylophone"),
        ("long_query", "github pull request review rust async"),
    ];

    let mut group = c.benchmark_group("scoring");
    group.sample_size(20);

    for (name, query) in queries {
        let tokens = tokenize(query);
        group.bench_function(name, |b| {
            b.iter(|| {
                let scored = score_candidates(&tokens, candidates.clone(), &config, now);
                assemble_results(scored, config.max_results)
            });
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let sources: Vec<Arc<dyn CandidateSource>> = (0..4)
        .map(|_| Arc::new(StaticSource::new("synthetic", synthetic_candidates(2_500))) as Arc<dyn CandidateSource>)
        .collect();
    let bangs = BangRegistry::builtin();
    let config = EngineConfig::default();

    let mut group = c.benchmark_group("evaluate");
    group.sample_size(20);
    for (name, query) in [("plain", "rust docs"), ("bang", "!gh tokio")] {
        group.bench_function(name, |b| {
            b.iter(|| rt.block_on(evaluate(query, &sources, &bangs, &config)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_evaluate);
criterion_main!(benches);
