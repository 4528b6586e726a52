use super::{now_epoch_secs, KeystrokeStore};
use crate::error::KtResult;
use crate::features::{StoredFeature, TransitionFeature};
use crate::types::{
    FingerAnnotation, Keystroke, KeystrokeFilter, KeystrokeId, NewKeystroke, Session, SessionId,
    SessionMode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// On-disk JSON form of a [`MemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub sessions: Vec<Session>,
    pub keystrokes: Vec<Keystroke>,
    pub features: Vec<StoredFeature>,
}

/// In-process store, optionally backed by a JSON snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: BTreeMap<SessionId, Session>,
    keystrokes: BTreeMap<KeystrokeId, Keystroke>,
    features: BTreeMap<KeystrokeId, TransitionFeature>,
    next_session_id: SessionId,
    next_keystroke_id: KeystrokeId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for s in snapshot.sessions {
            store.next_session_id = store.next_session_id.max(s.id);
            store.sessions.insert(s.id, s);
        }
        for k in snapshot.keystrokes {
            store.next_keystroke_id = store.next_keystroke_id.max(k.id);
            store.keystrokes.insert(k.id, k);
        }
        for f in snapshot.features {
            store.features.insert(f.keystroke_id, f.feature);
        }
        store
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            sessions: self.sessions.values().cloned().collect(),
            keystrokes: self.keystrokes.values().cloned().collect(),
            features: self
                .features
                .iter()
                .map(|(&keystroke_id, &feature)| StoredFeature {
                    keystroke_id,
                    feature,
                })
                .collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> KtResult<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> KtResult<()> {
        let content = serde_json::to_string_pretty(&self.to_snapshot())?;
        fs::write(path.as_ref(), content)?;
        info!("💾 Snapshot written to {}", path.as_ref().display());
        Ok(())
    }

    fn session_mode(&self, id: SessionId) -> Option<SessionMode> {
        self.sessions.get(&id).map(|s| s.mode)
    }
}

impl KeystrokeStore for MemoryStore {
    fn create_session(
        &mut self,
        mode: SessionMode,
        raw_text: &str,
        label: Option<&str>,
        keystrokes: &[NewKeystroke],
    ) -> KtResult<SessionId> {
        self.next_session_id += 1;
        let session_id = self.next_session_id;
        self.sessions.insert(
            session_id,
            Session {
                id: session_id,
                mode,
                raw_text: raw_text.to_string(),
                created_at: now_epoch_secs(),
                label: label.map(str::to_string),
                valid: true,
            },
        );

        for ks in keystrokes {
            self.next_keystroke_id += 1;
            let id = self.next_keystroke_id;
            self.keystrokes.insert(
                id,
                Keystroke {
                    id,
                    session_id,
                    key: ks.key.clone(),
                    timestamp: ks.timestamp,
                    prev_key: ks.prev_key.clone(),
                    finger: ks.finger,
                    hand: ks.hand,
                    current_word: ks.current_word.clone(),
                },
            );
        }
        Ok(session_id)
    }

    fn get_session(&self, id: SessionId) -> KtResult<Option<Session>> {
        Ok(self.sessions.get(&id).cloned())
    }

    fn list_sessions(&self, mode: Option<SessionMode>) -> KtResult<Vec<Session>> {
        Ok(self
            .sessions
            .values()
            .filter(|s| mode.map_or(true, |m| s.mode == m))
            .cloned()
            .collect())
    }

    fn list_keystrokes(&self, filter: KeystrokeFilter) -> KtResult<Vec<Keystroke>> {
        let mut out: Vec<Keystroke> = self
            .keystrokes
            .values()
            .filter(|k| match filter {
                KeystrokeFilter::All => true,
                KeystrokeFilter::Session(id) => k.session_id == id,
                KeystrokeFilter::Mode(mode) => self.session_mode(k.session_id) == Some(mode),
            })
            .cloned()
            .collect();
        out.sort_by_key(|k| (k.session_id, k.id));
        Ok(out)
    }

    fn save_features(&mut self, batch: &[StoredFeature]) -> KtResult<usize> {
        let mut saved = 0;
        for f in batch {
            if self.keystrokes.contains_key(&f.keystroke_id) {
                self.features.insert(f.keystroke_id, f.feature);
                saved += 1;
            }
        }
        Ok(saved)
    }

    fn features_for_session(&self, id: SessionId) -> KtResult<Vec<StoredFeature>> {
        Ok(self
            .features
            .iter()
            .filter(|(kid, _)| {
                self.keystrokes
                    .get(kid)
                    .map_or(false, |k| k.session_id == id)
            })
            .map(|(&keystroke_id, &feature)| StoredFeature {
                keystroke_id,
                feature,
            })
            .collect())
    }

    fn feature_count(&self) -> KtResult<usize> {
        Ok(self.features.len())
    }

    fn update_finger_annotations(
        &mut self,
        session_id: SessionId,
        annotations: &[FingerAnnotation],
    ) -> KtResult<usize> {
        let mut updated = 0;
        for a in annotations {
            if let Some(k) = self.keystrokes.get_mut(&a.keystroke_id) {
                if k.session_id == session_id {
                    k.finger = Some(a.finger);
                    k.hand = Some(a.hand);
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    fn delete_keystroke(&mut self, id: KeystrokeId) -> KtResult<bool> {
        let Some(removed) = self.keystrokes.remove(&id) else {
            return Ok(false);
        };
        self.features.remove(&id);

        let successor = self
            .keystrokes
            .range(id + 1..)
            .map(|(_, k)| k)
            .find(|k| k.session_id == removed.session_id)
            .map(|k| k.id);
        if let Some(next_id) = successor {
            if let Some(next) = self.keystrokes.get_mut(&next_id) {
                next.prev_key = None;
            }
            self.features.remove(&next_id);
        }
        Ok(true)
    }

    fn delete_session(&mut self, id: SessionId) -> KtResult<bool> {
        if self.sessions.remove(&id).is_none() {
            return Ok(false);
        }
        let doomed: Vec<KeystrokeId> = self
            .keystrokes
            .values()
            .filter(|k| k.session_id == id)
            .map(|k| k.id)
            .collect();
        for kid in doomed {
            self.keystrokes.remove(&kid);
            self.features.remove(&kid);
        }
        Ok(true)
    }

    fn update_label(&mut self, id: SessionId, label: Option<&str>) -> KtResult<bool> {
        match self.sessions.get_mut(&id) {
            Some(s) => {
                s.label = label.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
