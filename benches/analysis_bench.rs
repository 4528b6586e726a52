use criterion::{criterion_group, criterion_main, Criterion};
use keytrace::config::{CoverageParams, PatternParams};
use keytrace::coverage::get_coverage;
use keytrace::features::batch_by_session;
use keytrace::geometry;
use keytrace::patterns::{analyze_patterns, detailed_patterns};
use keytrace::types::Keystroke;
use std::hint::black_box;

/// 200 sessions of prose with jittered timing and fully annotated keys.
fn synthetic_log() -> Vec<Keystroke> {
    let prompt: Vec<char> = "the quick brown fox jumps over the lazy dog and then some"
        .chars()
        .collect();
    let mut rng = fastrand::Rng::with_seed(1337);
    let mut log = Vec::new();
    let mut id = 0;

    for session_id in 1..=200 {
        let mut t = 0.0;
        for (i, c) in prompt.iter().enumerate() {
            id += 1;
            t += 60.0 + rng.f64() * 180.0;
            let key = c.to_string();
            let finger = geometry::finger(&key);
            log.push(Keystroke {
                id,
                session_id,
                prev_key: (i > 0).then(|| prompt[i - 1].to_string()),
                key,
                timestamp: t,
                finger: Some(finger),
                hand: Some(finger.hand()),
                current_word: None,
            });
        }
    }
    log
}

fn criterion_benchmark(c: &mut Criterion) {
    let log = synthetic_log();
    let patterns = PatternParams::default();
    let coverage = CoverageParams::default();

    c.bench_function("analyze_patterns (11k keystrokes)", |b| {
        b.iter(|| analyze_patterns(black_box(&log), None, &patterns))
    });

    c.bench_function("detailed_patterns (11k keystrokes)", |b| {
        b.iter(|| detailed_patterns(black_box(&log), None, &patterns))
    });

    c.bench_function("get_coverage (11k keystrokes)", |b| {
        b.iter(|| get_coverage(black_box(&log), 200, &patterns, &coverage))
    });

    c.bench_function("batch_by_session (200 sessions)", |b| {
        b.iter(|| batch_by_session(black_box(&log)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
