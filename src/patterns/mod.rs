pub mod histogram;
pub mod stats;

use crate::config::PatternParams;
use crate::error::{KeyTraceError, KtResult};
use crate::types::{split_sessions, Keystroke, Session, SessionId, SessionMode};
use histogram::{histogram, HistogramBin};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stats::{mad_filter, mean};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Raw accepted durations per pattern, as observed in the log.
#[derive(Debug, Default, Clone)]
pub struct PatternSamples {
    pub digraphs: HashMap<String, Vec<f64>>,
    pub trigraphs: HashMap<String, Vec<f64>>,
    /// Keyed `prev->key`.
    pub transitions: HashMap<String, Vec<f64>>,
}

/// Walks a log ordered by (session, id) and buckets every accepted duration.
///
/// A digraph needs a non-null `prev_key` and an earlier keystroke in the same
/// session. A trigraph needs three consecutive keystrokes of one session with no
/// breakpoint on the second or third.
pub fn collect_samples(keystrokes: &[Keystroke], params: &PatternParams) -> PatternSamples {
    let mut samples = PatternSamples::default();
    let mut last_seen: HashMap<SessionId, f64> = HashMap::new();

    for (i, ks) in keystrokes.iter().enumerate() {
        if let (Some(prev_key), Some(&prev_ts)) = (&ks.prev_key, last_seen.get(&ks.session_id)) {
            let duration = ks.timestamp - prev_ts;
            if params.accepts(duration) {
                samples
                    .digraphs
                    .entry(format!("{}{}", prev_key, ks.key))
                    .or_default()
                    .push(duration);
                samples
                    .transitions
                    .entry(format!("{}->{}", prev_key, ks.key))
                    .or_default()
                    .push(duration);
            }
        }

        if i >= 2 {
            let (a, b) = (&keystrokes[i - 2], &keystrokes[i - 1]);
            let same_session = a.session_id == ks.session_id && b.session_id == ks.session_id;
            if same_session && !b.is_breakpoint() && !ks.is_breakpoint() {
                let duration = ks.timestamp - a.timestamp;
                if params.accepts(duration) {
                    samples
                        .trigraphs
                        .entry(format!("{}{}{}", a.key, b.key, ks.key))
                        .or_default()
                        .push(duration);
                }
            }
        }

        last_seen.insert(ks.session_id, ks.timestamp);
    }
    samples
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStats {
    pub pattern: String,
    pub count: usize,
    /// Mean over the samples that survived outlier rejection.
    pub avg: f64,
    pub raw_avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mad: f64,
    pub filtered_count: usize,
    pub excluded_count: usize,
    pub lower_threshold: f64,
    pub upper_threshold: f64,
}

pub fn summarize(pattern: &str, times: &[f64], params: &PatternParams) -> PatternStats {
    let filter = mad_filter(times, params.mad_threshold, params.mad_min_samples);
    PatternStats {
        pattern: pattern.to_string(),
        count: times.len(),
        avg: mean(&filter.kept),
        raw_avg: mean(times),
        min: times.iter().copied().fold(f64::INFINITY, f64::min),
        max: times.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        median: filter.median,
        mad: filter.mad,
        filtered_count: filter.kept.len(),
        excluded_count: filter.excluded(times.len()),
        lower_threshold: filter.lower,
        upper_threshold: filter.upper,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedPattern {
    #[serde(flatten)]
    pub stats: PatternStats,
    pub distribution: Vec<HistogramBin>,
    /// Every accepted sample, ascending.
    pub raw_times: Vec<f64>,
}

fn min_samples_for(mode: Option<SessionMode>, params: &PatternParams) -> usize {
    match mode {
        Some(m) if m.is_single_trigraph() => 1,
        _ => params.min_pattern_samples.max(1),
    }
}

fn by_avg(a: &PatternStats, b: &PatternStats) -> std::cmp::Ordering {
    a.avg
        .total_cmp(&b.avg)
        .then_with(|| a.pattern.cmp(&b.pattern))
}

/// Summaries for every pattern with enough samples, fastest first.
pub fn rank(
    samples: &HashMap<String, Vec<f64>>,
    min_samples: usize,
    params: &PatternParams,
) -> Vec<PatternStats> {
    let mut ranked: Vec<PatternStats> = samples
        .par_iter()
        .filter(|(_, times)| times.len() >= min_samples)
        .map(|(pattern, times)| summarize(pattern, times, params))
        .collect();
    ranked.sort_by(by_avg);
    ranked
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub digraphs: Vec<PatternStats>,
    pub trigraphs: Vec<PatternStats>,
    pub fastest_transitions: Vec<PatternStats>,
    pub slowest_transitions: Vec<PatternStats>,
}

/// `mode` only tunes the sample floor; callers pass the already-filtered log.
pub fn analyze_patterns(
    keystrokes: &[Keystroke],
    mode: Option<SessionMode>,
    params: &PatternParams,
) -> PatternReport {
    let samples = collect_samples(keystrokes, params);
    let min_samples = min_samples_for(mode, params);
    let limit = params.summary_limit;

    let mut digraphs = rank(&samples.digraphs, min_samples, params);
    let mut trigraphs = rank(&samples.trigraphs, min_samples, params);
    let transitions = rank(&samples.transitions, min_samples, params);
    debug!(
        "ranked {} digraphs, {} trigraphs, {} transitions",
        digraphs.len(),
        trigraphs.len(),
        transitions.len()
    );

    digraphs.truncate(limit);
    trigraphs.truncate(limit);
    let fastest_transitions = transitions.iter().take(limit).cloned().collect();
    let slowest_transitions = transitions.iter().rev().take(limit).cloned().collect();

    PatternReport {
        digraphs,
        trigraphs,
        fastest_transitions,
        slowest_transitions,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedPatternReport {
    pub digraphs: Vec<DetailedPattern>,
    pub trigraphs: Vec<DetailedPattern>,
    pub total_digraphs: usize,
    pub total_trigraphs: usize,
}

fn detail_all(
    samples: &HashMap<String, Vec<f64>>,
    min_samples: usize,
    params: &PatternParams,
) -> Vec<DetailedPattern> {
    let mut out: Vec<DetailedPattern> = samples
        .par_iter()
        .filter(|(_, times)| times.len() >= min_samples)
        .map(|(pattern, times)| {
            let stats = summarize(pattern, times, params);
            let distribution = histogram(
                times,
                params.histogram_bins,
                Some((stats.lower_threshold, stats.upper_threshold)),
            );
            let mut raw_times = times.clone();
            raw_times.sort_by(f64::total_cmp);
            DetailedPattern {
                stats,
                distribution,
                raw_times,
            }
        })
        .collect();
    out.sort_by(|a, b| by_avg(&a.stats, &b.stats));
    out
}

/// Every qualifying pattern with its full distribution.
pub fn detailed_patterns(
    keystrokes: &[Keystroke],
    mode: Option<SessionMode>,
    params: &PatternParams,
) -> DetailedPatternReport {
    let samples = collect_samples(keystrokes, params);
    let min_samples = min_samples_for(mode, params);
    let digraphs = detail_all(&samples.digraphs, min_samples, params);
    let trigraphs = detail_all(&samples.trigraphs, min_samples, params);

    DetailedPatternReport {
        total_digraphs: digraphs.len(),
        total_trigraphs: trigraphs.len(),
        digraphs,
        trigraphs,
    }
}

/// Everything known about one digraph or trigraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDetails {
    pub pattern: String,
    /// Prompt words containing the pattern, sorted.
    pub words: Vec<String>,
    pub distribution: Vec<HistogramBin>,
    pub raw_times: Vec<f64>,
    pub avg_time: f64,
    pub threshold_low: Option<f64>,
    pub threshold_high: Option<f64>,
    /// Matches before the duration filter.
    pub occurrences: usize,
}

pub fn digraph_details(
    pattern: &str,
    keystrokes: &[Keystroke],
    sessions: &[Session],
    params: &PatternParams,
) -> KtResult<PatternDetails> {
    details_for(pattern, 2, keystrokes, sessions, params)
}

pub fn trigraph_details(
    pattern: &str,
    keystrokes: &[Keystroke],
    sessions: &[Session],
    params: &PatternParams,
) -> KtResult<PatternDetails> {
    details_for(pattern, 3, keystrokes, sessions, params)
}

fn details_for(
    pattern: &str,
    expected: usize,
    keystrokes: &[Keystroke],
    sessions: &[Session],
    params: &PatternParams,
) -> KtResult<PatternDetails> {
    let chars: Vec<String> = pattern.chars().map(String::from).collect();
    if chars.len() != expected {
        return Err(KeyTraceError::InvalidPattern {
            pattern: pattern.to_string(),
            expected,
        });
    }

    let prompts: HashMap<SessionId, &str> = sessions
        .iter()
        .map(|s| (s.id, s.raw_text.as_str()))
        .collect();
    let needle = pattern.to_lowercase();

    let mut occurrences = 0;
    let mut times = Vec::new();
    let mut words = BTreeSet::new();

    for run in split_sessions(keystrokes) {
        let mut matched_here = false;
        for window in run.windows(expected) {
            let keys_match = window.iter().zip(&chars).all(|(ks, c)| ks.key == *c);
            let unbroken = window[1..].iter().all(|ks| !ks.is_breakpoint());
            if !(keys_match && unbroken) {
                continue;
            }
            occurrences += 1;
            matched_here = true;
            let duration = window[expected - 1].timestamp - window[0].timestamp;
            if params.accepts(duration) {
                times.push(duration);
            }
        }

        if matched_here {
            if let Some(text) = prompts.get(&run[0].session_id) {
                words.extend(
                    text.split_whitespace()
                        .filter(|w| w.to_lowercase().contains(&needle))
                        .map(str::to_string),
                );
            }
        }
    }

    times.sort_by(f64::total_cmp);

    let (threshold_low, threshold_high) = if times.len() >= 3 {
        let m = stats::median(&times);
        let d = stats::mad(&times, m);
        if d > 0.0 {
            (
                Some(m - params.mad_threshold * d),
                Some(m + params.mad_threshold * d),
            )
        } else {
            (None, None)
        }
    } else {
        (None, None)
    };

    let band = threshold_low.zip(threshold_high);
    Ok(PatternDetails {
        pattern: pattern.to_string(),
        words: words
            .into_iter()
            .take(params.example_word_limit)
            .collect(),
        distribution: histogram(&times, params.histogram_bins, band),
        avg_time: mean(&times),
        raw_times: times,
        threshold_low,
        threshold_high,
        occurrences,
    })
}
