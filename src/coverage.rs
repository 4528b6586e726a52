use crate::config::{CoverageParams, PatternParams, MAX_SUGGESTION_COUNT};
use crate::geometry;
use crate::types::{split_sessions, Finger, Keystroke, TRACKED_FINGERS};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};
use tracing::debug;

const PAIRS: usize = TRACKED_FINGERS.len() * TRACKED_FINGERS.len();

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Missing,
    Low,
    Adequate,
    Good,
}

impl CoverageStatus {
    pub fn classify(count: usize, params: &CoverageParams) -> Self {
        if count == 0 {
            CoverageStatus::Missing
        } else if count < params.min_samples_per_pair {
            CoverageStatus::Low
        } else if count < params.target_samples_per_pair {
            CoverageStatus::Adequate
        } else {
            CoverageStatus::Good
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageCell {
    pub from: Finger,
    pub to: Finger,
    pub count: usize,
    /// Mean transition time in ms, 0 when unsampled.
    pub avg_time: f64,
    pub status: CoverageStatus,
}

/// 8x8 grid, row-major over `TRACKED_FINGERS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMatrix {
    pub cells: Vec<CoverageCell>,
}

impl CoverageMatrix {
    pub fn cell(&self, from: Finger, to: Finger) -> Option<&CoverageCell> {
        let (i, j) = (from.tracked_index()?, to.tracked_index()?);
        self.cells.get(i * TRACKED_FINGERS.len() + j)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CoverageCell]> {
        self.cells.chunks(TRACKED_FINGERS.len())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GapPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageGap {
    pub from: Finger,
    pub to: Finger,
    pub current: usize,
    pub needed: usize,
    pub priority: GapPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_trigraphs: usize,
    pub target_trigraphs: usize,
    pub min_trigraphs: usize,
    /// Percent of the trigraph target, capped at 100.
    pub trigraph_progress: f64,
    pub total_pairs: usize,
    pub covered_pairs: usize,
    pub well_covered_pairs: usize,
    pub pair_coverage_percent: f64,
    pub min_per_pair: usize,
    pub target_per_pair: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub matrix: CoverageMatrix,
    pub gaps: Vec<CoverageGap>,
    pub summary: CoverageSummary,
}

/// Per-pair sample counts and summed durations, row-major over `TRACKED_FINGERS`.
#[derive(Debug, Clone)]
pub struct PairTally {
    counts: [usize; PAIRS],
    totals: [f64; PAIRS],
}

impl Default for PairTally {
    fn default() -> Self {
        Self {
            counts: [0; PAIRS],
            totals: [0.0; PAIRS],
        }
    }
}

impl PairTally {
    /// Returns false when either finger is a thumb or unknown.
    pub fn record(&mut self, from: Finger, to: Finger, duration: f64) -> bool {
        match (from.tracked_index(), to.tracked_index()) {
            (Some(i), Some(j)) => {
                let idx = i * TRACKED_FINGERS.len() + j;
                self.counts[idx] += 1;
                self.totals[idx] += duration;
                true
            }
            _ => false,
        }
    }

    pub fn count(&self, from: Finger, to: Finger) -> usize {
        match (from.tracked_index(), to.tracked_index()) {
            (Some(i), Some(j)) => self.counts[i * TRACKED_FINGERS.len() + j],
            _ => 0,
        }
    }
}

/// Counts finger-pair transitions in a log ordered by (session, id).
///
/// The source finger is the predecessor's recorded finger, else the default for
/// `prev_key`. The destination finger is this keystroke's recorded finger, else
/// the default for its key.
pub fn tally_pairs(keystrokes: &[Keystroke], patterns: &PatternParams) -> PairTally {
    let mut tally = PairTally::default();
    for run in split_sessions(keystrokes) {
        for pair in run.windows(2) {
            let (prev, ks) = (&pair[0], &pair[1]);
            let Some(prev_key) = ks.prev_key.as_deref() else {
                continue;
            };
            let duration = ks.timestamp - prev.timestamp;
            if !patterns.accepts(duration) {
                continue;
            }
            let from = prev.finger.unwrap_or_else(|| geometry::finger(prev_key));
            let to = ks.finger.unwrap_or_else(|| geometry::finger(&ks.key));
            tally.record(from, to, duration);
        }
    }
    tally
}

pub fn build_report(
    tally: &PairTally,
    trigraph_sessions: usize,
    params: &CoverageParams,
) -> CoverageReport {
    let mut cells = Vec::with_capacity(PAIRS);
    for (i, &from) in TRACKED_FINGERS.iter().enumerate() {
        for (j, &to) in TRACKED_FINGERS.iter().enumerate() {
            let idx = i * TRACKED_FINGERS.len() + j;
            let count = tally.counts[idx];
            let avg_time = if count > 0 {
                tally.totals[idx] / count as f64
            } else {
                0.0
            };
            cells.push(CoverageCell {
                from,
                to,
                count,
                avg_time,
                status: CoverageStatus::classify(count, params),
            });
        }
    }

    let mut gaps: Vec<CoverageGap> = cells
        .iter()
        .filter(|c| c.count < params.min_samples_per_pair)
        .map(|c| CoverageGap {
            from: c.from,
            to: c.to,
            current: c.count,
            needed: params.min_samples_per_pair - c.count,
            priority: if c.count == 0 {
                GapPriority::High
            } else {
                GapPriority::Medium
            },
        })
        .collect();
    gaps.sort_by_key(|g| (g.priority, g.current));

    let covered_pairs = cells
        .iter()
        .filter(|c| c.count >= params.min_samples_per_pair)
        .count();
    let well_covered_pairs = cells
        .iter()
        .filter(|c| c.count >= params.target_samples_per_pair)
        .count();

    let summary = CoverageSummary {
        total_trigraphs: trigraph_sessions,
        target_trigraphs: params.target_total_trigraphs,
        min_trigraphs: params.min_total_trigraphs,
        trigraph_progress: (trigraph_sessions as f64 / params.target_total_trigraphs as f64
            * 100.0)
            .min(100.0),
        total_pairs: PAIRS,
        covered_pairs,
        well_covered_pairs,
        pair_coverage_percent: covered_pairs as f64 / PAIRS as f64 * 100.0,
        min_per_pair: params.min_samples_per_pair,
        target_per_pair: params.target_samples_per_pair,
    };
    debug!("coverage: {} gaps, {} pairs covered", gaps.len(), covered_pairs);

    CoverageReport {
        matrix: CoverageMatrix { cells },
        gaps,
        summary,
    }
}

/// `trigraph_sessions` is the number of sessions the log was drawn from.
pub fn get_coverage(
    keystrokes: &[Keystroke],
    trigraph_sessions: usize,
    patterns: &PatternParams,
    params: &CoverageParams,
) -> CoverageReport {
    build_report(&tally_pairs(keystrokes, patterns), trigraph_sessions, params)
}

/// Letter keys usable as the free character of a suggestion.
fn filler_keys() -> Vec<char> {
    geometry::assigned_keys()
        .filter(|c| c.is_ascii_alphabetic())
        .collect()
}

/// Up to `count` distinct trigraphs whose first or second transition goes from a
/// `from` key to a `to` key. `count` is capped at `MAX_SUGGESTION_COUNT`.
pub fn suggest_trigraphs_for_gap(
    from: Finger,
    to: Finger,
    count: usize,
    rng: &mut Rng,
) -> Vec<String> {
    let count = count.min(MAX_SUGGESTION_COUNT);
    let from_keys = geometry::keys_for_finger(from);
    let to_keys = geometry::keys_for_finger(to);
    let fillers = filler_keys();
    if from_keys.is_empty() || to_keys.is_empty() || fillers.is_empty() {
        return Vec::new();
    }
    let pick = |rng: &mut Rng, keys: &[char]| keys[rng.usize(..keys.len())];

    let mut seen = BTreeSet::new();
    for _ in 0..count.saturating_mul(2) {
        let k1 = pick(rng, &from_keys);
        let k2 = pick(rng, &to_keys);
        let lead: String = [k1, k2, pick(rng, &fillers)].iter().collect();
        let trail: String = [pick(rng, &fillers), k1, k2].iter().collect();
        seen.insert(lead);
        seen.insert(trail);
    }

    let mut unique: Vec<String> = seen.into_iter().collect();
    rng.shuffle(&mut unique);
    unique.truncate(count);
    unique
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetedTrigraph {
    pub trigraph: String,
    pub from: Finger,
    pub to: Finger,
}

/// Suggestions for the highest-priority gap, `None` once every pair is covered.
pub fn suggest_for_top_gap(
    report: &CoverageReport,
    count: usize,
    rng: &mut Rng,
) -> Option<(CoverageGap, Vec<String>)> {
    let gap = report.gaps.first()?.clone();
    let suggestions = suggest_trigraphs_for_gap(gap.from, gap.to, count, rng);
    Some((gap, suggestions))
}

/// One trigraph per gap in priority order, cycling until `count` are produced.
/// `count` is capped at `MAX_SUGGESTION_COUNT`.
pub fn stratified_batch(report: &CoverageReport, count: usize, rng: &mut Rng) -> Vec<TargetedTrigraph> {
    let count = count.min(MAX_SUGGESTION_COUNT);
    let mut batch = Vec::with_capacity(count);
    let targets: Vec<&CoverageGap> = report
        .gaps
        .iter()
        .filter(|g| {
            !geometry::keys_for_finger(g.from).is_empty()
                && !geometry::keys_for_finger(g.to).is_empty()
        })
        .collect();
    if targets.is_empty() {
        return batch;
    }

    for gap in targets.iter().cycle().take(count) {
        if let Some(trigraph) = suggest_trigraphs_for_gap(gap.from, gap.to, 1, rng).pop() {
            batch.push(TargetedTrigraph {
                trigraph,
                from: gap.from,
                to: gap.to,
            });
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tiers() {
        let p = CoverageParams::default();
        assert_eq!(CoverageStatus::classify(0, &p), CoverageStatus::Missing);
        assert_eq!(CoverageStatus::classify(4, &p), CoverageStatus::Low);
        assert_eq!(CoverageStatus::classify(5, &p), CoverageStatus::Adequate);
        assert_eq!(CoverageStatus::classify(7, &p), CoverageStatus::Adequate);
        assert_eq!(CoverageStatus::classify(8, &p), CoverageStatus::Good);
    }

    #[test]
    fn test_thumb_pairs_are_ignored() {
        let mut tally = PairTally::default();
        assert!(!tally.record(Finger::RightThumb, Finger::LeftIndex, 100.0));
        assert!(!tally.record(Finger::LeftIndex, Finger::Unknown, 100.0));
        assert!(tally.record(Finger::LeftIndex, Finger::RightIndex, 100.0));
        assert_eq!(tally.count(Finger::LeftIndex, Finger::RightIndex), 1);
    }

    #[test]
    fn test_suggestions_hit_requested_fingers() {
        let mut rng = Rng::with_seed(7);
        let out = suggest_trigraphs_for_gap(Finger::LeftRing, Finger::RightMiddle, 5, &mut rng);
        assert_eq!(out.len(), 5);
        for t in &out {
            let c: Vec<char> = t.chars().collect();
            let pair_at = |i: usize| {
                geometry::finger(&c[i].to_string()) == Finger::LeftRing
                    && geometry::finger(&c[i + 1].to_string()) == Finger::RightMiddle
            };
            assert!(pair_at(0) || pair_at(1), "{t} misses the pair");
        }
    }

    #[test]
    fn test_no_keys_no_suggestions() {
        let mut rng = Rng::with_seed(1);
        assert!(suggest_trigraphs_for_gap(Finger::LeftPinky, Finger::LeftIndex, 5, &mut rng).is_empty());
    }
}
