mod common;

use common::{run, typed};
use keytrace::config::PatternParams;
use keytrace::error::KeyTraceError;
use keytrace::patterns::{
    analyze_patterns, collect_samples, detailed_patterns, digraph_details, trigraph_details,
};
use keytrace::types::{Session, SessionMode};
use regex::Regex;

fn session(id: i64, text: &str) -> Session {
    Session {
        id,
        mode: SessionMode::Top200,
        raw_text: text.to_string(),
        created_at: 0,
        label: None,
        valid: true,
    }
}

#[test]
fn test_the_yields_two_digraphs_and_one_trigraph() {
    let log = run(1, 1, &[("t", 0.0), ("h", 100.0), ("e", 250.0)]);
    let samples = collect_samples(&log, &PatternParams::default());

    assert_eq!(samples.digraphs["th"], vec![100.0]);
    assert_eq!(samples.digraphs["he"], vec![150.0]);
    assert_eq!(samples.trigraphs["the"], vec![250.0]);
    assert_eq!(samples.digraphs.len(), 2);
    assert_eq!(samples.trigraphs.len(), 1);
}

#[test]
fn test_duration_filter_is_exclusive() {
    let log = run(
        1,
        1,
        &[("a", 0.0), ("b", 0.0), ("c", 5000.0), ("d", 9999.0), ("e", 10_000.0)],
    );
    let samples = collect_samples(&log, &PatternParams::default());
    // ab = 0 and bc = 5000 fall outside (0, 5000).
    assert!(!samples.digraphs.contains_key("ab"));
    assert!(!samples.digraphs.contains_key("bc"));
    assert_eq!(samples.digraphs["cd"], vec![4999.0]);
    assert_eq!(samples.digraphs["de"], vec![1.0]);
}

#[test]
fn test_no_pattern_crosses_sessions() {
    let mut log = typed(1, 1, "ab", 100.0);
    let mut second = typed(2, 3, "cd", 100.0);
    second[0].prev_key = Some("b".to_string());
    second.iter_mut().for_each(|k| k.timestamp += 150.0);
    log.extend(second);

    let samples = collect_samples(&log, &PatternParams::default());
    assert!(!samples.digraphs.contains_key("bc"));
    assert!(samples.trigraphs.is_empty());
}

#[test]
fn test_ranking_is_fastest_first_and_limited() {
    let mut params = PatternParams::default();
    params.summary_limit = 2;
    let log = run(
        1,
        1,
        &[("a", 0.0), ("b", 300.0), ("c", 400.0), ("d", 600.0)],
    );
    let report = analyze_patterns(&log, None, &params);

    let names: Vec<&str> = report.digraphs.iter().map(|p| p.pattern.as_str()).collect();
    assert_eq!(names, vec!["bc", "cd"]);
    assert_eq!(report.fastest_transitions[0].pattern, "b->c");
    assert_eq!(report.slowest_transitions[0].pattern, "a->b");
}

#[test]
fn test_min_samples_relaxed_for_trigraph_tests() {
    let mut params = PatternParams::default();
    params.min_pattern_samples = 3;
    let log = typed(1, 1, "xyz", 100.0);

    assert!(analyze_patterns(&log, Some(SessionMode::Top200), &params)
        .trigraphs
        .is_empty());
    let relaxed = analyze_patterns(&log, Some(SessionMode::TrigraphTest), &params);
    assert_eq!(relaxed.trigraphs.len(), 1);
}

#[test]
fn test_outlier_is_excluded_from_average() {
    let mut keys = vec![];
    let mut t = 0.0;
    for gap in [100.0, 110.0, 90.0, 105.0, 95.0, 2000.0] {
        keys.push(("t", t));
        keys.push(("h", t + gap));
        t += 10_000.0;
    }
    let mut log = run(1, 1, &keys);
    // Each "t" starts a fresh run so only th is sampled.
    for ks in log.iter_mut().step_by(2) {
        ks.prev_key = None;
    }

    let report = analyze_patterns(&log, None, &PatternParams::default());
    let th = &report.digraphs[0];
    assert_eq!(th.count, 6);
    assert_eq!(th.excluded_count, 1);
    assert!((th.avg - 100.0).abs() < 1e-9);
    assert!(th.raw_avg > th.avg);
}

#[test]
fn test_detailed_histogram_labels() {
    let mut keys = vec![];
    for (i, gap) in [100.0, 120.0, 140.0, 160.0, 200.0].iter().enumerate() {
        let base = i as f64 * 10_000.0;
        keys.push(("o", base));
        keys.push(("n", base + gap));
    }
    let mut log = run(1, 1, &keys);
    for ks in log.iter_mut().step_by(2) {
        ks.prev_key = None;
    }

    let report = detailed_patterns(&log, None, &PatternParams::default());
    assert_eq!(report.total_digraphs, 1);
    let on = &report.digraphs[0];
    assert_eq!(on.distribution.len(), 10);
    assert_eq!(on.raw_times, vec![100.0, 120.0, 140.0, 160.0, 200.0]);

    let label = Regex::new(r"^\d+-\d+ms$").unwrap();
    for bin in &on.distribution {
        assert!(label.is_match(&bin.label), "{}", bin.label);
    }
    assert_eq!(on.distribution.iter().map(|b| b.count).sum::<usize>(), 5);
    assert_eq!(on.distribution[9].count, 1);
}

#[test]
fn test_trigraph_details_collects_words_and_thresholds() {
    let mut log = typed(1, 1, "the", 100.0);
    log.extend(typed(2, 4, "the", 120.0));
    log.extend(typed(3, 7, "the", 140.0));
    let sessions = vec![
        session(1, "the other theme"),
        session(2, "bathe"),
        session(3, "nothing here"),
    ];

    let d = trigraph_details("the", &log, &sessions, &PatternParams::default()).unwrap();
    assert_eq!(d.occurrences, 3);
    assert_eq!(d.raw_times, vec![200.0, 240.0, 280.0]);
    assert_eq!(d.words, vec!["bathe", "other", "the", "theme"]);
    assert!((d.avg_time - 240.0).abs() < 1e-9);
    assert!(d.threshold_low.is_some() && d.threshold_high.is_some());
}

#[test]
fn test_details_reject_wrong_length() {
    let err = digraph_details("the", &[], &[], &PatternParams::default()).unwrap_err();
    assert!(matches!(err, KeyTraceError::InvalidPattern { expected: 2, .. }));
    let err = trigraph_details("th", &[], &[], &PatternParams::default()).unwrap_err();
    assert!(matches!(err, KeyTraceError::InvalidPattern { expected: 3, .. }));
}

#[test]
fn test_digraph_details_without_data() {
    let d = digraph_details("zq", &[], &[], &PatternParams::default()).unwrap();
    assert_eq!(d.occurrences, 0);
    assert!(d.raw_times.is_empty());
    assert!(d.distribution.is_empty());
    assert_eq!(d.threshold_low, None);
}
