use crate::geometry;
use crate::types::{FingerAnnotation, Keystroke, NewKeystroke};

/// How far ahead of the cursor a typed character may be matched in the prompt.
const LOOKAHEAD: usize = 5;

fn is_break(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// The whitespace-delimited word covering `position`, if any.
pub fn word_at(text: &[char], position: usize) -> Option<String> {
    if position >= text.len() {
        return None;
    }
    let mut start = position;
    while start > 0 && !is_break(text[start - 1]) {
        start -= 1;
    }
    let mut end = position;
    while end < text.len() && !is_break(text[end]) {
        end += 1;
    }
    let word: String = text[start..end].iter().collect();
    if word.trim().is_empty() {
        None
    } else {
        Some(word)
    }
}

/// Walks the prompt alongside the typed keys and returns the word each key belongs to.
///
/// A key found within the next few prompt characters advances the cursor past
/// it; otherwise the cursor steps by one.
pub fn derive_current_words<'a, I>(raw_text: &str, keys: I) -> Vec<Option<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let text: Vec<char> = raw_text.chars().collect();
    let mut cursor = 0;
    let mut out = Vec::new();

    for key in keys {
        let mut key_chars = key.chars();
        let target = match (key_chars.next(), key_chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        };
        if cursor >= text.len() || key.is_empty() {
            out.push(None);
            continue;
        }

        let window_end = (cursor + LOOKAHEAD).min(text.len());
        let found = target.and_then(|c| text[cursor..window_end].iter().position(|&t| t == c));
        match found {
            Some(offset) => {
                out.push(word_at(&text, cursor + offset));
                cursor += offset + 1;
            }
            None => {
                out.push(word_at(&text, cursor));
                cursor += 1;
            }
        }
    }
    out
}

/// Client keystrokes ready to persist: non-overwritable keys take their default
/// finger and hand, overwritable ones keep what the client sent, and missing
/// current words are filled in from the prompt.
pub fn prepare_keystrokes(raw_text: &str, keystrokes: Vec<NewKeystroke>) -> Vec<NewKeystroke> {
    let words = derive_current_words(raw_text, keystrokes.iter().map(|k| k.key.as_str()));
    keystrokes
        .into_iter()
        .zip(words)
        .map(|(mut ks, word)| {
            if !geometry::is_overwritable(&ks.key) {
                let finger = geometry::finger(&ks.key);
                ks.finger = Some(finger);
                ks.hand = Some(finger.hand());
            }
            if ks.current_word.is_none() {
                ks.current_word = word;
            }
            ks
        })
        .collect()
}

/// Default annotations for stored keystrokes that have no finger yet.
/// Overwritable letters and keys without a default are left alone.
pub fn default_annotations(keystrokes: &[Keystroke]) -> Vec<FingerAnnotation> {
    keystrokes
        .iter()
        .filter(|ks| ks.finger.is_none() && !geometry::is_overwritable(&ks.key))
        .filter_map(|ks| {
            geometry::default_annotation(&ks.key).map(|(finger, hand)| FingerAnnotation {
                keystroke_id: ks.id,
                finger,
                hand,
            })
        })
        .collect()
}
