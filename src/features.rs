use crate::geometry::{self, KEY_PITCH_CM};
use crate::types::{split_sessions, Finger, Hand, Keystroke, KeystrokeId, SessionId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Biomechanical description of moving from one key to the next.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionFeature {
    pub finger_from: Finger,
    pub finger_to: Finger,
    pub same_hand: bool,
    pub same_finger: bool,
    /// cm
    pub euclidean_distance: f64,
    pub row_difference: u32,
    pub is_inward: bool,
    pub fitts_law_cost: f64,
}

/// A feature attached to the keystroke at the destination end of its transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredFeature {
    pub keystroke_id: KeystrokeId,
    #[serde(flatten)]
    pub feature: TransitionFeature,
}

/// Result of asking for a session's features.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome {
    Computed(Vec<StoredFeature>),
    /// Positions (within the session) lacking a finger or hand.
    IncompleteAnnotations { indices: Vec<usize> },
}

impl FeatureOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, FeatureOutcome::Computed(_))
    }
}

/// Missing annotations fall back to the geometry defaults of each key.
pub fn extract_transition(
    key_from: &str,
    key_to: &str,
    finger_from: Option<Finger>,
    finger_to: Option<Finger>,
    hand_from: Option<Hand>,
    hand_to: Option<Hand>,
) -> TransitionFeature {
    let finger_from = finger_from.unwrap_or_else(|| geometry::finger(key_from));
    let finger_to = finger_to.unwrap_or_else(|| geometry::finger(key_to));
    let hand_from = hand_from.unwrap_or_else(|| geometry::hand(key_from));
    let hand_to = hand_to.unwrap_or_else(|| geometry::hand(key_to));

    let same_hand = hand_from == hand_to;
    let distance = geometry::distance(key_from, key_to);

    TransitionFeature {
        finger_from,
        finger_to,
        same_hand,
        same_finger: finger_from == finger_to,
        euclidean_distance: distance,
        row_difference: geometry::row_delta(key_from, key_to),
        is_inward: same_hand && geometry::is_inward_roll(key_from, key_to, finger_from, finger_to),
        fitts_law_cost: geometry::fitts_cost(distance, KEY_PITCH_CM),
    }
}

/// One slot per keystroke. Slot 0 and every breakpoint are `None`.
pub fn compute_session_features(keystrokes: &[Keystroke]) -> Vec<Option<TransitionFeature>> {
    let mut out = Vec::with_capacity(keystrokes.len());
    for (i, ks) in keystrokes.iter().enumerate() {
        if i == 0 || ks.is_breakpoint() {
            out.push(None);
            continue;
        }
        let prev = &keystrokes[i - 1];
        if prev.session_id != ks.session_id {
            out.push(None);
            continue;
        }
        out.push(Some(extract_transition(
            &prev.key,
            &ks.key,
            prev.finger,
            ks.finger,
            prev.hand,
            ks.hand,
        )));
    }
    out
}

pub fn missing_annotations(keystrokes: &[Keystroke]) -> Vec<usize> {
    keystrokes
        .iter()
        .enumerate()
        .filter(|(_, ks)| !ks.is_annotated())
        .map(|(i, _)| i)
        .collect()
}

/// Refuses partially annotated input; otherwise pairs each feature with its keystroke id.
pub fn session_feature_batch(keystrokes: &[Keystroke]) -> FeatureOutcome {
    let indices = missing_annotations(keystrokes);
    if !indices.is_empty() {
        debug!("{} keystrokes missing annotations", indices.len());
        return FeatureOutcome::IncompleteAnnotations { indices };
    }

    let features = compute_session_features(keystrokes)
        .into_iter()
        .zip(keystrokes)
        .filter_map(|(feature, ks)| {
            feature.map(|feature| StoredFeature {
                keystroke_id: ks.id,
                feature,
            })
        })
        .collect();
    FeatureOutcome::Computed(features)
}

/// Computes every session in the log independently. Input must be ordered by session.
pub fn batch_by_session(keystrokes: &[Keystroke]) -> Vec<(SessionId, FeatureOutcome)> {
    split_sessions(keystrokes)
        .into_par_iter()
        .map(|run| (run[0].session_id, session_feature_batch(run)))
        .collect()
}
