use crate::config::DeviationParams;
use crate::geometry::{self, OVERWRITABLE_LETTERS};
use crate::types::{Finger, Keystroke, KeystrokeId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Label used in place of a previous key at a breakpoint.
pub const START_MARKER: &str = "START";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deviation {
    pub keystroke_id: KeystrokeId,
    pub session_id: SessionId,
    pub letter: char,
    pub expected_finger: Finger,
    pub actual_finger: Finger,
    pub word: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterDeviation {
    pub letter: char,
    pub total: usize,
    pub deviated: usize,
    /// Percent.
    pub deviation_rate: f64,
    pub expected_finger: Finger,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerSwap {
    pub expected: Finger,
    pub actual: Finger,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightedChar {
    pub char: char,
    pub deviated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordDeviation {
    pub word: String,
    pub count: usize,
    pub letters_deviated: Vec<char>,
    /// First swap seen for each letter.
    pub deviation_details: BTreeMap<char, FingerSwap>,
    pub highlighted: Vec<HighlightedChar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationReport {
    pub summary: Vec<LetterDeviation>,
    pub total_deviations: usize,
    pub words_with_deviations: Vec<WordDeviation>,
    /// Newest first.
    pub recent_deviations: Vec<Deviation>,
    pub overwritable_letters: Vec<char>,
}

/// Annotated keystrokes of overwritable letters, as (lowercase letter, keystroke).
fn candidates(keystrokes: &[Keystroke]) -> impl Iterator<Item = (char, &Keystroke, Finger)> {
    keystrokes.iter().filter_map(|ks| {
        let finger = ks.finger?;
        let mut chars = ks.key.chars().flat_map(char::to_lowercase);
        let letter = chars.next()?;
        if chars.next().is_some() || !OVERWRITABLE_LETTERS.contains(&letter) {
            return None;
        }
        Some((letter, ks, finger))
    })
}

fn highlight(word: &str, deviated: &BTreeSet<char>) -> Vec<HighlightedChar> {
    word.chars()
        .map(|c| HighlightedChar {
            char: c,
            deviated: c.to_lowercase().any(|l| deviated.contains(&l)),
        })
        .collect()
}

pub fn get_deviations(keystrokes: &[Keystroke], params: &DeviationParams) -> DeviationReport {
    let mut ordered: Vec<(char, &Keystroke, Finger)> = candidates(keystrokes).collect();
    ordered.sort_by(|a, b| b.1.id.cmp(&a.1.id));

    let mut per_letter: BTreeMap<char, (usize, usize)> = BTreeMap::new();
    let mut deviations = Vec::new();
    let mut by_word: HashMap<String, Vec<usize>> = HashMap::new();

    for (letter, ks, actual) in ordered {
        let expected = geometry::finger(&letter.to_string());
        let entry = per_letter.entry(letter).or_insert((0, 0));
        entry.0 += 1;
        if actual == expected {
            continue;
        }
        entry.1 += 1;

        let word = ks
            .current_word
            .as_deref()
            .map(str::to_lowercase)
            .filter(|w| !w.is_empty());
        if let Some(w) = &word {
            by_word.entry(w.clone()).or_default().push(deviations.len());
        }
        deviations.push(Deviation {
            keystroke_id: ks.id,
            session_id: ks.session_id,
            letter,
            expected_finger: expected,
            actual_finger: actual,
            word,
        });
    }

    let mut summary: Vec<LetterDeviation> = per_letter
        .into_iter()
        .map(|(letter, (total, deviated))| LetterDeviation {
            letter,
            total,
            deviated,
            deviation_rate: deviated as f64 / total as f64 * 100.0,
            expected_finger: geometry::finger(&letter.to_string()),
        })
        .collect();
    summary.sort_by(|a, b| {
        b.deviation_rate
            .total_cmp(&a.deviation_rate)
            .then_with(|| a.letter.cmp(&b.letter))
    });

    let mut words: Vec<WordDeviation> = by_word
        .into_iter()
        .map(|(word, indices)| {
            let mut letters = BTreeSet::new();
            let mut details = BTreeMap::new();
            for &i in &indices {
                let d = &deviations[i];
                letters.insert(d.letter);
                details.entry(d.letter).or_insert(FingerSwap {
                    expected: d.expected_finger,
                    actual: d.actual_finger,
                });
            }
            WordDeviation {
                highlighted: highlight(&word, &letters),
                count: indices.len(),
                letters_deviated: letters.into_iter().collect(),
                deviation_details: details,
                word,
            }
        })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(params.word_limit);

    DeviationReport {
        summary,
        total_deviations: deviations.len(),
        words_with_deviations: words,
        recent_deviations: deviations.into_iter().take(params.recent_limit).collect(),
        overwritable_letters: OVERWRITABLE_LETTERS.to_vec(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationPattern {
    pub letter: char,
    /// Lowercased previous key, or `START` at a breakpoint.
    pub prev_key: String,
    pub expected_finger: Finger,
    pub finger_counts: BTreeMap<Finger, usize>,
    pub total: usize,
    pub dominant_finger: Finger,
    pub dominant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationPatternReport {
    pub patterns: Vec<DeviationPattern>,
    pub total_patterns: usize,
}

/// Groups by (letter, previous key) and keeps contexts where the finger varies
/// or consistently differs from the default.
pub fn get_deviation_patterns(
    keystrokes: &[Keystroke],
    params: &DeviationParams,
) -> DeviationPatternReport {
    let mut groups: BTreeMap<(char, String), BTreeMap<Finger, usize>> = BTreeMap::new();
    for (letter, ks, actual) in candidates(keystrokes) {
        let prev = ks
            .prev_key
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| START_MARKER.to_string());
        *groups
            .entry((letter, prev))
            .or_default()
            .entry(actual)
            .or_insert(0) += 1;
    }

    let mut patterns: Vec<DeviationPattern> = groups
        .into_iter()
        .filter_map(|((letter, prev_key), finger_counts)| {
            let expected = geometry::finger(&letter.to_string());
            let varied = finger_counts.len() > 1;
            let consistently_off = finger_counts.len() == 1 && !finger_counts.contains_key(&expected);
            if !(varied || consistently_off) {
                return None;
            }
            // Highest count wins; ties go to the earlier finger.
            let (&dominant_finger, &dominant_count) = finger_counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))?;
            Some(DeviationPattern {
                letter,
                prev_key,
                expected_finger: expected,
                total: finger_counts.values().sum(),
                finger_counts,
                dominant_finger,
                dominant_count,
            })
        })
        .collect();
    patterns.sort_by(|a, b| b.total.cmp(&a.total));

    let total_patterns = patterns.len();
    patterns.truncate(params.pattern_limit);
    DeviationPatternReport {
        patterns,
        total_patterns,
    }
}
