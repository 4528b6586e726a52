use crate::config::Config;
use crate::coverage::{self, CoverageReport, TargetedTrigraph};
use crate::deviation::{self, DeviationPatternReport, DeviationReport};
use crate::error::{KeyTraceError, KtResult};
use crate::features::{self, FeatureOutcome};
use crate::patterns::{self, DetailedPatternReport, PatternDetails, PatternReport};
use crate::session;
use crate::store::KeystrokeStore;
use crate::types::{
    Finger, FingerAnnotation, KeystrokeFilter, KeystrokeId, NewKeystroke, SessionId, SessionMode,
};
use fastrand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

/// Coverage is tracked over single-trigraph sessions unless told otherwise.
pub const DEFAULT_COVERAGE_MODE: SessionMode = SessionMode::TrigraphTest;

/// Request-facing boundary: validates input, reads from the store, runs the
/// analyzers and writes derived data back.
pub struct KeyTraceService<S: KeystrokeStore> {
    store: S,
    config: Config,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_sessions: usize,
    pub total_keystrokes: usize,
    pub total_characters: usize,
    pub sessions_by_mode: BTreeMap<String, usize>,
    pub avg_keystrokes_per_session: f64,
    pub avg_characters_per_session: f64,
    pub first_session_at: Option<u64>,
    pub last_session_at: Option<u64>,
    pub unique_digraphs: usize,
    pub sessions_with_features: usize,
    pub total_features: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUpdate {
    pub updated: usize,
    /// Present when recomputation was requested.
    pub features: Option<FeatureOutcome>,
}

impl<S: KeystrokeStore> KeyTraceService<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn require_session(&self, id: SessionId) -> KtResult<()> {
        match self.store.get_session(id)? {
            Some(_) => Ok(()),
            None => Err(KeyTraceError::SessionNotFound(id)),
        }
    }

    // --- Sessions ---

    pub fn record_session(
        &mut self,
        mode: SessionMode,
        raw_text: &str,
        label: Option<&str>,
        keystrokes: Vec<NewKeystroke>,
    ) -> KtResult<SessionId> {
        for (i, ks) in keystrokes.iter().enumerate() {
            if !ks.timestamp.is_finite() {
                return Err(KeyTraceError::Validation(format!(
                    "keystroke {} has a non-finite timestamp",
                    i
                )));
            }
        }
        let prepared = session::prepare_keystrokes(raw_text, keystrokes);
        let id = self
            .store
            .create_session(mode, raw_text, label, &prepared)?;
        info!("📝 Recorded session {} ({}, {} keystrokes)", id, mode, prepared.len());
        Ok(id)
    }

    /// Keeps keystrokes `start..=end` (positions within the session) and deletes the rest.
    pub fn crop_session(&mut self, session_id: SessionId, start: usize, end: usize) -> KtResult<usize> {
        self.require_session(session_id)?;
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::Session(session_id))?;
        if start > end || end >= keystrokes.len() {
            return Err(KeyTraceError::Validation(format!(
                "crop range {}..={} is invalid for a session of {} keystrokes",
                start,
                end,
                keystrokes.len()
            )));
        }

        let doomed: Vec<KeystrokeId> = keystrokes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < start || *i > end)
            .map(|(_, k)| k.id)
            .collect();
        for id in &doomed {
            self.store.delete_keystroke(*id)?;
        }
        info!("✂️  Cropped session {}: removed {} keystrokes", session_id, doomed.len());
        Ok(doomed.len())
    }

    pub fn delete_keystroke(&mut self, id: KeystrokeId) -> KtResult<()> {
        if self.store.delete_keystroke(id)? {
            debug!("deleted keystroke {}", id);
            Ok(())
        } else {
            Err(KeyTraceError::KeystrokeNotFound(id))
        }
    }

    pub fn delete_session(&mut self, id: SessionId) -> KtResult<()> {
        if self.store.delete_session(id)? {
            Ok(())
        } else {
            Err(KeyTraceError::SessionNotFound(id))
        }
    }

    pub fn update_label(&mut self, id: SessionId, label: Option<&str>) -> KtResult<()> {
        if self.store.update_label(id, label)? {
            Ok(())
        } else {
            Err(KeyTraceError::SessionNotFound(id))
        }
    }

    pub fn session_stats(&self) -> KtResult<SessionStats> {
        let sessions = self.store.list_sessions(None)?;
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;

        let mut sessions_by_mode = BTreeMap::new();
        for s in &sessions {
            *sessions_by_mode.entry(s.mode.to_string()).or_insert(0) += 1;
        }
        let total_characters: usize = sessions.iter().map(|s| s.raw_text.chars().count()).sum();
        let unique_digraphs: HashSet<String> = keystrokes
            .iter()
            .filter_map(|k| {
                k.prev_key
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .map(|p| format!("{}{}", p, k.key))
            })
            .collect();

        let mut sessions_with_features = 0;
        for s in &sessions {
            if !self.store.features_for_session(s.id)?.is_empty() {
                sessions_with_features += 1;
            }
        }

        let per_session = |total: usize| {
            if sessions.is_empty() {
                0.0
            } else {
                total as f64 / sessions.len() as f64
            }
        };

        Ok(SessionStats {
            total_sessions: sessions.len(),
            total_keystrokes: keystrokes.len(),
            total_characters,
            sessions_by_mode,
            avg_keystrokes_per_session: per_session(keystrokes.len()),
            avg_characters_per_session: per_session(total_characters),
            first_session_at: sessions.iter().map(|s| s.created_at).min(),
            last_session_at: sessions.iter().map(|s| s.created_at).max(),
            unique_digraphs: unique_digraphs.len(),
            sessions_with_features,
            total_features: self.store.feature_count()?,
        })
    }

    // --- Features ---

    pub fn missing_annotations(&self, session_id: SessionId) -> KtResult<Vec<usize>> {
        self.require_session(session_id)?;
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::Session(session_id))?;
        Ok(features::missing_annotations(&keystrokes))
    }

    /// Computes and persists features, unless annotations are incomplete.
    pub fn compute_features(&mut self, session_id: SessionId) -> KtResult<FeatureOutcome> {
        self.require_session(session_id)?;
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::Session(session_id))?;
        let outcome = features::session_feature_batch(&keystrokes);
        match &outcome {
            FeatureOutcome::Computed(batch) => {
                let saved = self.store.save_features(batch)?;
                info!("🧮 Saved {} features for session {}", saved, session_id);
            }
            FeatureOutcome::IncompleteAnnotations { indices } => {
                warn!(
                    "⚠️  Session {} has {} unannotated keystrokes: {:?}",
                    session_id,
                    indices.len(),
                    indices
                );
            }
        }
        Ok(outcome)
    }

    /// Recomputes every session whose annotations are complete.
    pub fn compute_all_features(&mut self) -> KtResult<Vec<(SessionId, FeatureOutcome)>> {
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;
        let outcomes = features::batch_by_session(&keystrokes);
        for (session_id, outcome) in &outcomes {
            if let FeatureOutcome::Computed(batch) = outcome {
                let saved = self.store.save_features(batch)?;
                debug!("session {}: {} features", session_id, saved);
            }
        }
        Ok(outcomes)
    }

    pub fn update_annotations(
        &mut self,
        session_id: SessionId,
        annotations: &[FingerAnnotation],
        recompute: bool,
    ) -> KtResult<AnnotationUpdate> {
        self.require_session(session_id)?;
        let updated = self
            .store
            .update_finger_annotations(session_id, annotations)?;
        if updated < annotations.len() {
            warn!(
                "⚠️  {} of {} annotations did not match a keystroke in session {}",
                annotations.len() - updated,
                annotations.len(),
                session_id
            );
        }
        let features = if recompute {
            Some(self.compute_features(session_id)?)
        } else {
            None
        };
        Ok(AnnotationUpdate { updated, features })
    }

    /// Fills in default fingers for unannotated, non-overwritable keystrokes.
    pub fn apply_default_annotations(&mut self, session_id: SessionId) -> KtResult<usize> {
        self.require_session(session_id)?;
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::Session(session_id))?;
        let defaults = session::default_annotations(&keystrokes);
        self.store.update_finger_annotations(session_id, &defaults)
    }

    // --- Patterns ---

    pub fn analyze_patterns(&self, mode: Option<SessionMode>) -> KtResult<PatternReport> {
        let keystrokes = self.store.list_keystrokes(mode.into())?;
        Ok(patterns::analyze_patterns(&keystrokes, mode, &self.config.patterns))
    }

    pub fn detailed_patterns(&self, mode: Option<SessionMode>) -> KtResult<DetailedPatternReport> {
        let keystrokes = self.store.list_keystrokes(mode.into())?;
        Ok(patterns::detailed_patterns(&keystrokes, mode, &self.config.patterns))
    }

    pub fn digraph_details(&self, pattern: &str) -> KtResult<PatternDetails> {
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;
        let sessions = self.store.list_sessions(None)?;
        patterns::digraph_details(pattern, &keystrokes, &sessions, &self.config.patterns)
    }

    pub fn trigraph_details(&self, pattern: &str) -> KtResult<PatternDetails> {
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;
        let sessions = self.store.list_sessions(None)?;
        patterns::trigraph_details(pattern, &keystrokes, &sessions, &self.config.patterns)
    }

    // --- Coverage ---

    pub fn get_coverage(&self, mode: Option<SessionMode>) -> KtResult<CoverageReport> {
        let keystrokes = self.store.list_keystrokes(mode.into())?;
        let sessions = self.store.list_sessions(mode)?.len();
        Ok(coverage::get_coverage(
            &keystrokes,
            sessions,
            &self.config.patterns,
            &self.config.coverage,
        ))
    }

    pub fn suggest_trigraphs_for_gap(
        &self,
        from: Finger,
        to: Finger,
        count: usize,
        rng: &mut Rng,
    ) -> Vec<String> {
        coverage::suggest_trigraphs_for_gap(from, to, count, rng)
    }

    pub fn stratified_batch(&self, count: usize, rng: &mut Rng) -> KtResult<Vec<TargetedTrigraph>> {
        let report = self.get_coverage(Some(DEFAULT_COVERAGE_MODE))?;
        Ok(coverage::stratified_batch(&report, count, rng))
    }

    // --- Deviations ---

    pub fn get_deviations(&self, limit: Option<usize>) -> KtResult<DeviationReport> {
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;
        let mut params = self.config.deviation.clone();
        if let Some(limit) = limit {
            params.word_limit = limit;
        }
        Ok(deviation::get_deviations(&keystrokes, &params))
    }

    pub fn get_deviation_patterns(&self) -> KtResult<DeviationPatternReport> {
        let keystrokes = self.store.list_keystrokes(KeystrokeFilter::All)?;
        Ok(deviation::get_deviation_patterns(
            &keystrokes,
            &self.config.deviation,
        ))
    }
}
