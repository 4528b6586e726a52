use crate::types::{Finger, Hand};
use serde::{Deserialize, Serialize};

/// Physical key pitch in cm. Positions are stored in key units and scaled by this.
pub const KEY_PITCH_CM: f64 = 1.9;

/// Letters whose finger is user-specific. Bulk defaulting must never touch them.
pub const OVERWRITABLE_LETTERS: [char; 6] = ['e', 'b', 'u', 'i', 'y', 'k'];

/// (key, row, col) in key units. Row -1 is the top row, 0 home, 1 bottom, 2 the space bar.
/// Columns are measured from `f`/`r`/`v`.
const POSITIONS: &[(char, f64, f64)] = &[
    // Top
    ('q', -1.0, -4.5),
    ('w', -1.0, -3.0),
    ('e', -1.0, -1.5),
    ('r', -1.0, 0.0),
    ('t', -1.0, 1.5),
    ('y', -1.0, 3.0),
    ('u', -1.0, 4.5),
    ('i', -1.0, 6.0),
    ('o', -1.0, 7.5),
    ('p', -1.0, 9.0),
    // Home
    ('a', 0.0, -4.5),
    ('s', 0.0, -3.0),
    ('d', 0.0, -1.5),
    ('f', 0.0, 0.0),
    ('g', 0.0, 1.5),
    ('h', 0.0, 3.0),
    ('j', 0.0, 4.5),
    ('k', 0.0, 6.0),
    ('l', 0.0, 7.5),
    (';', 0.0, 9.0),
    // Bottom
    ('z', 1.0, -4.5),
    ('x', 1.0, -3.0),
    ('c', 1.0, -1.5),
    ('v', 1.0, 0.0),
    ('b', 1.0, 1.5),
    ('n', 1.0, 3.0),
    ('m', 1.0, 4.5),
    (',', 1.0, 6.0),
    ('.', 1.0, 7.5),
    ('/', 1.0, 9.0),
    // Thumb
    (' ', 2.0, 0.0),
];

const FINGERS: &[(char, Finger)] = &[
    ('q', Finger::LeftRing),
    ('a', Finger::LeftRing),
    ('z', Finger::LeftRing),
    ('w', Finger::LeftMiddle),
    ('s', Finger::LeftMiddle),
    ('e', Finger::LeftMiddle),
    ('x', Finger::LeftIndex),
    ('d', Finger::LeftIndex),
    ('c', Finger::LeftIndex),
    ('r', Finger::LeftIndex),
    ('t', Finger::LeftIndex),
    ('f', Finger::LeftIndex),
    ('g', Finger::LeftIndex),
    ('v', Finger::LeftIndex),
    ('b', Finger::RightIndex),
    ('y', Finger::RightIndex),
    ('u', Finger::RightIndex),
    ('h', Finger::RightIndex),
    ('j', Finger::RightIndex),
    ('n', Finger::RightIndex),
    ('m', Finger::RightIndex),
    ('k', Finger::RightIndex),
    ('i', Finger::RightMiddle),
    ('o', Finger::RightMiddle),
    ('l', Finger::RightMiddle),
    (',', Finger::RightMiddle),
    ('p', Finger::RightRing),
    ('.', Finger::RightRing),
    (';', Finger::RightPinky),
    ('/', Finger::RightPinky),
    (' ', Finger::RightThumb),
];

/// Lookups are case-insensitive and only defined for single characters.
fn normalize(key: &str) -> Option<char> {
    let mut chars = key.chars().flat_map(char::to_lowercase);
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}

/// (row, col) in key units. Unknown keys sit at the origin.
pub fn position(key: &str) -> (f64, f64) {
    normalize(key)
        .and_then(|c| POSITIONS.iter().find(|(k, _, _)| *k == c))
        .map(|&(_, row, col)| (row, col))
        .unwrap_or((0.0, 0.0))
}

pub fn finger(key: &str) -> Finger {
    normalize(key)
        .and_then(|c| FINGERS.iter().find(|(k, _)| *k == c))
        .map(|&(_, f)| f)
        .unwrap_or(Finger::Unknown)
}

pub fn hand(key: &str) -> Hand {
    finger(key).hand()
}

/// Default (finger, hand) for a key, `None` when the key is not in the table.
pub fn default_annotation(key: &str) -> Option<(Finger, Hand)> {
    match finger(key) {
        Finger::Unknown => None,
        f => Some((f, f.hand())),
    }
}

/// Euclidean distance in cm.
pub fn distance(k1: &str, k2: &str) -> f64 {
    let (r1, c1) = position(k1);
    let (r2, c2) = position(k2);
    let dr = (r1 - r2) * KEY_PITCH_CM;
    let dc = (c1 - c2) * KEY_PITCH_CM;
    (dr * dr + dc * dc).sqrt()
}

pub fn row_delta(k1: &str, k2: &str) -> u32 {
    let (r1, _) = position(k1);
    let (r2, _) = position(k2);
    (r1 - r2).abs().trunc() as u32
}

/// Inward means toward the centre of the board: column grows on the left hand
/// and shrinks on the right. Cross-hand pairs are never rolls.
pub fn is_inward_roll(k1: &str, k2: &str, finger1: Finger, finger2: Finger) -> bool {
    let hand1 = finger1.hand();
    if hand1 != finger2.hand() {
        return false;
    }
    let (_, c1) = position(k1);
    let (_, c2) = position(k2);
    match hand1 {
        Hand::Left => c2 > c1,
        Hand::Right => c2 < c1,
        Hand::Unknown => false,
    }
}

/// Fitts' Law index of difficulty.
pub fn fitts_cost(distance: f64, key_width: f64) -> f64 {
    (1.0 + distance / key_width).log2()
}

pub fn is_overwritable(key: &str) -> bool {
    normalize(key).is_some_and(|c| OVERWRITABLE_LETTERS.contains(&c))
}

pub fn keys_for_finger(finger: Finger) -> Vec<char> {
    FINGERS
        .iter()
        .filter(|(_, f)| *f == finger)
        .map(|&(k, _)| k)
        .collect()
}

/// Every key that has a default finger, in table order.
pub fn assigned_keys() -> impl Iterator<Item = char> {
    FINGERS.iter().map(|&(k, _)| k)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub valid: bool,
    /// Keys with a finger but no position.
    pub missing_positions: Vec<char>,
    /// Keys with a position but no finger.
    pub missing_fingers: Vec<char>,
}

pub fn validate_mappings() -> MappingReport {
    let missing_positions: Vec<char> = FINGERS
        .iter()
        .map(|&(k, _)| k)
        .filter(|k| !POSITIONS.iter().any(|(p, _, _)| p == k))
        .collect();
    let missing_fingers: Vec<char> = POSITIONS
        .iter()
        .map(|&(k, _, _)| k)
        .filter(|k| !FINGERS.iter().any(|(f, _)| f == k))
        .collect();

    MappingReport {
        valid: missing_positions.is_empty() && missing_fingers.is_empty(),
        missing_positions,
        missing_fingers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups_are_case_insensitive() {
        assert_eq!(position("F"), position("f"));
        assert_eq!(finger("Q"), Finger::LeftRing);
        assert_eq!(hand("J"), Hand::Right);
    }

    #[test]
    fn test_unknown_keys_fall_back() {
        assert_eq!(position("€"), (0.0, 0.0));
        assert_eq!(position("Shift"), (0.0, 0.0));
        assert_eq!(finger("1"), Finger::Unknown);
        assert_eq!(hand("1"), Hand::Unknown);
        assert_eq!(default_annotation("1"), None);
    }

    #[test]
    fn test_tables_agree() {
        let report = validate_mappings();
        assert!(report.valid, "{:?}", report);
    }

    #[test]
    fn test_overwritable_set() {
        for c in ["e", "B", "u", "i", "y", "k"] {
            assert!(is_overwritable(c), "{c} should be overwritable");
        }
        assert!(!is_overwritable("t"));
        assert!(!is_overwritable("ee"));
    }
}
