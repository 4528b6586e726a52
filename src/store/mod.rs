pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::KtResult;
use crate::features::StoredFeature;
use crate::types::{
    FingerAnnotation, Keystroke, KeystrokeFilter, KeystrokeId, NewKeystroke, Session, SessionId,
    SessionMode,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistence for sessions, keystrokes and their derived features.
///
/// Keystrokes are always returned ordered by (session id, keystroke id).
pub trait KeystrokeStore {
    /// Inserts the session and its keystrokes verbatim, in order.
    fn create_session(
        &mut self,
        mode: SessionMode,
        raw_text: &str,
        label: Option<&str>,
        keystrokes: &[NewKeystroke],
    ) -> KtResult<SessionId>;

    fn get_session(&self, id: SessionId) -> KtResult<Option<Session>>;

    fn list_sessions(&self, mode: Option<SessionMode>) -> KtResult<Vec<Session>>;

    fn list_keystrokes(&self, filter: KeystrokeFilter) -> KtResult<Vec<Keystroke>>;

    /// Upserts by keystroke id.
    fn save_features(&mut self, batch: &[StoredFeature]) -> KtResult<usize>;

    fn features_for_session(&self, id: SessionId) -> KtResult<Vec<StoredFeature>>;

    fn feature_count(&self) -> KtResult<usize>;

    /// Only keystrokes belonging to `session_id` are touched.
    fn update_finger_annotations(
        &mut self,
        session_id: SessionId,
        annotations: &[FingerAnnotation],
    ) -> KtResult<usize>;

    /// Removes the keystroke and its feature, turns the next surviving keystroke
    /// of the session into a breakpoint and drops that keystroke's feature.
    fn delete_keystroke(&mut self, id: KeystrokeId) -> KtResult<bool>;

    fn delete_session(&mut self, id: SessionId) -> KtResult<bool>;

    fn update_label(&mut self, id: SessionId, label: Option<&str>) -> KtResult<bool>;
}

pub(crate) fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
