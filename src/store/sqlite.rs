use super::{now_epoch_secs, KeystrokeStore};
use crate::error::{KeyTraceError, KtResult};
use crate::features::{StoredFeature, TransitionFeature};
use crate::types::{
    Finger, FingerAnnotation, Hand, Keystroke, KeystrokeFilter, KeystrokeId, NewKeystroke,
    Session, SessionId, SessionMode,
};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp REAL NOT NULL,
    mode TEXT NOT NULL,
    raw_text TEXT NOT NULL,
    valid INTEGER NOT NULL DEFAULT 1,
    label TEXT
);

CREATE TABLE IF NOT EXISTS keystrokes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    key_char TEXT NOT NULL,
    timestamp REAL NOT NULL,
    prev_key TEXT,
    finger TEXT,
    hand TEXT,
    current_word TEXT
);

CREATE TABLE IF NOT EXISTS keystroke_features (
    keystroke_id INTEGER PRIMARY KEY REFERENCES keystrokes(id) ON DELETE CASCADE,
    finger_from TEXT NOT NULL,
    finger_to TEXT NOT NULL,
    same_hand INTEGER NOT NULL,
    same_finger INTEGER NOT NULL,
    euclidean_distance REAL NOT NULL,
    row_difference INTEGER NOT NULL,
    is_inward INTEGER NOT NULL,
    fitts_law_cost REAL NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_keystrokes_session ON keystrokes(session_id, id);
CREATE INDEX IF NOT EXISTS idx_sessions_mode ON sessions(mode);
";

const KEYSTROKE_COLUMNS: &str =
    "k.id, k.session_id, k.key_char, k.timestamp, k.prev_key, k.finger, k.hand, k.current_word";

const FEATURE_COLUMNS: &str = "f.keystroke_id, f.finger_from, f.finger_to, f.same_hand, \
     f.same_finger, f.euclidean_distance, f.row_difference, f.is_inward, f.fitts_law_cost, \
     k.session_id";

/// SQLite-backed store using the collector's three-table layout.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> KtResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("🗄️  Opened database {}", path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> KtResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> KtResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

fn malformed(
    session_id: SessionId,
    keystroke_id: Option<KeystrokeId>,
) -> impl Fn(rusqlite::Error) -> KeyTraceError {
    move |e| KeyTraceError::MalformedRecord {
        session_id,
        keystroke_id,
        reason: e.to_string(),
    }
}

/// Session creation time in whole epoch seconds, stored as either INTEGER or REAL.
fn epoch_secs(value: Value) -> Result<u64, String> {
    match value {
        Value::Integer(n) => Ok(u64::try_from(n).unwrap_or(0)),
        Value::Real(x) if x.is_finite() => Ok(if x > 0.0 { x as u64 } else { 0 }),
        other => Err(format!("invalid session timestamp {:?}", other)),
    }
}

fn row_to_session(row: &Row) -> KtResult<Session> {
    let id: SessionId = row.get("id")?;
    let column_err = malformed(id, None);
    let mode: String = row.get("mode").map_err(&column_err)?;
    let created_at = epoch_secs(row.get("timestamp").map_err(&column_err)?).map_err(|reason| {
        KeyTraceError::MalformedRecord {
            session_id: id,
            keystroke_id: None,
            reason,
        }
    })?;
    let valid: i64 = row.get("valid").map_err(&column_err)?;
    Ok(Session {
        id,
        mode: SessionMode::from_name(&mode).map_err(|_| KeyTraceError::MalformedRecord {
            session_id: id,
            keystroke_id: None,
            reason: format!("unknown mode '{}'", mode),
        })?,
        raw_text: row.get("raw_text").map_err(&column_err)?,
        created_at,
        label: row.get("label").map_err(&column_err)?,
        valid: valid != 0,
    })
}

fn row_to_keystroke(row: &Row) -> KtResult<Keystroke> {
    let id: KeystrokeId = row.get(0)?;
    let session_id: SessionId = row.get(1)?;
    let column_err = malformed(session_id, Some(id));
    let finger: Option<String> = row.get(5).map_err(&column_err)?;
    let hand: Option<String> = row.get(6).map_err(&column_err)?;
    Ok(Keystroke {
        id,
        session_id,
        key: row.get(2).map_err(&column_err)?,
        timestamp: row.get(3).map_err(&column_err)?,
        prev_key: row.get(4).map_err(&column_err)?,
        finger: finger.filter(|f| !f.is_empty()).map(|f| Finger::from_label(&f)),
        hand: hand.filter(|h| !h.is_empty()).map(|h| Hand::from_label(&h)),
        current_word: row.get(7).map_err(&column_err)?,
    })
}

fn row_to_feature(row: &Row) -> KtResult<StoredFeature> {
    let keystroke_id: KeystrokeId = row.get(0)?;
    let session_id: SessionId = row.get(9)?;
    let column_err = malformed(session_id, Some(keystroke_id));
    let finger_from: String = row.get(1).map_err(&column_err)?;
    let finger_to: String = row.get(2).map_err(&column_err)?;
    let row_difference: i64 = row.get(6).map_err(&column_err)?;
    let flag = |idx: usize| row.get::<_, i64>(idx).map(|v| v != 0).map_err(&column_err);
    Ok(StoredFeature {
        keystroke_id,
        feature: TransitionFeature {
            finger_from: Finger::from_label(&finger_from),
            finger_to: Finger::from_label(&finger_to),
            same_hand: flag(3)?,
            same_finger: flag(4)?,
            euclidean_distance: row.get(5).map_err(&column_err)?,
            row_difference: u32::try_from(row_difference).unwrap_or(0),
            is_inward: flag(7)?,
            fitts_law_cost: row.get(8).map_err(&column_err)?,
        },
    })
}

impl KeystrokeStore for SqliteStore {
    fn create_session(
        &mut self,
        mode: SessionMode,
        raw_text: &str,
        label: Option<&str>,
        keystrokes: &[NewKeystroke],
    ) -> KtResult<SessionId> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO sessions (timestamp, mode, raw_text, valid, label) VALUES (?1, ?2, ?3, 1, ?4)",
            params![now_epoch_secs() as i64, mode.to_string(), raw_text, label],
        )?;
        let session_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO keystrokes (session_id, key_char, timestamp, prev_key, finger, hand, current_word)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for ks in keystrokes {
                stmt.execute(params![
                    session_id,
                    ks.key,
                    ks.timestamp,
                    ks.prev_key,
                    ks.finger.map(|f| f.to_string()),
                    ks.hand.map(|h| h.to_string()),
                    ks.current_word,
                ])?;
            }
        }
        tx.commit()?;
        debug!("session {} stored with {} keystrokes", session_id, keystrokes.len());
        Ok(session_id)
    }

    fn get_session(&self, id: SessionId) -> KtResult<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, mode, raw_text, valid, label FROM sessions WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_session(row)?)),
            None => Ok(None),
        }
    }

    fn list_sessions(&self, mode: Option<SessionMode>) -> KtResult<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, mode, raw_text, valid, label FROM sessions
             WHERE ?1 IS NULL OR mode = ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![mode.map(|m| m.to_string())])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_session(row)?);
        }
        Ok(out)
    }

    fn list_keystrokes(&self, filter: KeystrokeFilter) -> KtResult<Vec<Keystroke>> {
        let (sql, arg): (String, Option<Value>) = match filter {
            KeystrokeFilter::All => (
                format!("SELECT {KEYSTROKE_COLUMNS} FROM keystrokes k ORDER BY k.session_id, k.id"),
                None,
            ),
            KeystrokeFilter::Session(id) => (
                format!(
                    "SELECT {KEYSTROKE_COLUMNS} FROM keystrokes k WHERE k.session_id = ?1 ORDER BY k.id"
                ),
                Some(Value::Integer(id)),
            ),
            KeystrokeFilter::Mode(mode) => (
                format!(
                    "SELECT {KEYSTROKE_COLUMNS} FROM keystrokes k JOIN sessions s ON k.session_id = s.id
                     WHERE s.mode = ?1 ORDER BY k.session_id, k.id"
                ),
                Some(Value::Text(mode.to_string())),
            ),
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = match arg {
            Some(a) => stmt.query(params![a])?,
            None => stmt.query([])?,
        };
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_keystroke(row)?);
        }
        Ok(out)
    }

    fn save_features(&mut self, batch: &[StoredFeature]) -> KtResult<usize> {
        let tx = self.conn.transaction()?;
        let mut saved = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO keystroke_features
                 (keystroke_id, finger_from, finger_to, same_hand, same_finger,
                  euclidean_distance, row_difference, is_inward, fitts_law_cost)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9
                 WHERE EXISTS (SELECT 1 FROM keystrokes WHERE id = ?1)",
            )?;
            for f in batch {
                let x = &f.feature;
                saved += stmt.execute(params![
                    f.keystroke_id,
                    x.finger_from.to_string(),
                    x.finger_to.to_string(),
                    x.same_hand as i64,
                    x.same_finger as i64,
                    x.euclidean_distance,
                    x.row_difference as i64,
                    x.is_inward as i64,
                    x.fitts_law_cost,
                ])?;
            }
        }
        tx.commit()?;
        Ok(saved)
    }

    fn features_for_session(&self, id: SessionId) -> KtResult<Vec<StoredFeature>> {
        let sql = format!(
            "SELECT {FEATURE_COLUMNS} FROM keystroke_features f
             JOIN keystrokes k ON f.keystroke_id = k.id
             WHERE k.session_id = ?1 ORDER BY f.keystroke_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(row_to_feature(row)?);
        }
        Ok(out)
    }

    fn feature_count(&self) -> KtResult<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM keystroke_features", [], |r| r.get(0))?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn update_finger_annotations(
        &mut self,
        session_id: SessionId,
        annotations: &[FingerAnnotation],
    ) -> KtResult<usize> {
        let tx = self.conn.transaction()?;
        let mut updated = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE keystrokes SET finger = ?1, hand = ?2 WHERE id = ?3 AND session_id = ?4",
            )?;
            for a in annotations {
                updated += stmt.execute(params![
                    a.finger.to_string(),
                    a.hand.to_string(),
                    a.keystroke_id,
                    session_id
                ])?;
            }
        }
        tx.commit()?;
        Ok(updated)
    }

    fn delete_keystroke(&mut self, id: KeystrokeId) -> KtResult<bool> {
        let tx = self.conn.transaction()?;
        let session_id: Option<SessionId> = tx
            .query_row(
                "SELECT session_id FROM keystrokes WHERE id = ?1",
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        let Some(session_id) = session_id else {
            return Ok(false);
        };

        let successor: Option<KeystrokeId> = tx
            .query_row(
                "SELECT MIN(id) FROM keystrokes WHERE session_id = ?1 AND id > ?2",
                params![session_id, id],
                |r| r.get(0),
            )?;

        tx.execute("DELETE FROM keystrokes WHERE id = ?1", params![id])?;
        if let Some(next_id) = successor {
            tx.execute(
                "UPDATE keystrokes SET prev_key = NULL WHERE id = ?1",
                params![next_id],
            )?;
            tx.execute(
                "DELETE FROM keystroke_features WHERE keystroke_id = ?1",
                params![next_id],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }

    fn delete_session(&mut self, id: SessionId) -> KtResult<bool> {
        let n = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(n > 0)
    }

    fn update_label(&mut self, id: SessionId, label: Option<&str>) -> KtResult<bool> {
        let n = self.conn.execute(
            "UPDATE sessions SET label = ?1 WHERE id = ?2",
            params![label, id],
        )?;
        Ok(n > 0)
    }
}
