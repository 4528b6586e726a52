#![allow(dead_code)]

use keytrace::geometry;
use keytrace::types::{Finger, Keystroke, NewKeystroke, SessionId};

/// Builds one contiguous run: the first key is a breakpoint, every later key
/// points back at its predecessor.
pub fn run(session_id: SessionId, first_id: i64, keys: &[(&str, f64)]) -> Vec<Keystroke> {
    keys.iter()
        .enumerate()
        .map(|(i, &(key, ts))| Keystroke {
            id: first_id + i as i64,
            session_id,
            key: key.to_string(),
            timestamp: ts,
            prev_key: if i == 0 {
                None
            } else {
                Some(keys[i - 1].0.to_string())
            },
            finger: None,
            hand: None,
            current_word: None,
        })
        .collect()
}

/// Types `text` with a fixed gap between keys.
pub fn typed(session_id: SessionId, first_id: i64, text: &str, gap_ms: f64) -> Vec<Keystroke> {
    let keys: Vec<String> = text.chars().map(String::from).collect();
    let pairs: Vec<(&str, f64)> = keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i as f64 * gap_ms))
        .collect();
    run(session_id, first_id, &pairs)
}

/// Fills every keystroke with its default finger and hand.
pub fn annotate_defaults(log: &mut [Keystroke]) {
    for ks in log.iter_mut() {
        let f = geometry::finger(&ks.key);
        ks.finger = Some(f);
        ks.hand = Some(f.hand());
    }
}

pub fn with_finger(mut ks: Keystroke, finger: Finger) -> Keystroke {
    ks.finger = Some(finger);
    ks.hand = Some(finger.hand());
    ks
}

/// Client payload for `text`, chained the way the collector sends it.
pub fn upload(text: &str, gap_ms: f64) -> Vec<NewKeystroke> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| NewKeystroke {
            key: c.to_string(),
            timestamp: 1_000.0 + i as f64 * gap_ms,
            prev_key: if i == 0 {
                None
            } else {
                Some(chars[i - 1].to_string())
            },
            finger: None,
            hand: None,
            current_word: None,
        })
        .collect()
}
