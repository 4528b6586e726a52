use crate::error::{KeyTraceError, KtResult};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

pub type SessionId = i64;
pub type KeystrokeId = i64;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Display,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    LeftPinky,
    LeftRing,
    LeftMiddle,
    LeftIndex,
    LeftThumb,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
    Unknown,
}

/// The eight fingers tracked by coverage, in matrix order.
pub const TRACKED_FINGERS: [Finger; 8] = [
    Finger::LeftPinky,
    Finger::LeftRing,
    Finger::LeftMiddle,
    Finger::LeftIndex,
    Finger::RightIndex,
    Finger::RightMiddle,
    Finger::RightRing,
    Finger::RightPinky,
];

impl Finger {
    /// Parses a stored finger label. Anything outside the vocabulary is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Finger::Unknown)
    }

    pub fn hand(self) -> Hand {
        match self {
            Finger::LeftPinky
            | Finger::LeftRing
            | Finger::LeftMiddle
            | Finger::LeftIndex
            | Finger::LeftThumb => Hand::Left,
            Finger::RightThumb
            | Finger::RightIndex
            | Finger::RightMiddle
            | Finger::RightRing
            | Finger::RightPinky => Hand::Right,
            Finger::Unknown => Hand::Unknown,
        }
    }

    pub fn is_thumb(self) -> bool {
        matches!(self, Finger::LeftThumb | Finger::RightThumb)
    }

    /// Position in the coverage matrix, `None` for thumbs and `Unknown`.
    pub fn tracked_index(self) -> Option<usize> {
        TRACKED_FINGERS.iter().position(|&f| f == self)
    }

    pub fn all() -> impl Iterator<Item = Finger> {
        Finger::iter().filter(|f| *f != Finger::Unknown)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
    Unknown,
}

impl Hand {
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Hand::Unknown)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display, Serialize, Deserialize,
)]
pub enum SessionMode {
    #[strum(serialize = "top200")]
    #[serde(rename = "top200")]
    Top200,
    #[strum(serialize = "trigraphs")]
    #[serde(rename = "trigraphs")]
    Trigraphs,
    #[strum(serialize = "nonsense")]
    #[serde(rename = "nonsense")]
    Nonsense,
    #[strum(serialize = "calibration")]
    #[serde(rename = "calibration")]
    Calibration,
    #[strum(serialize = "trigraph_test")]
    #[serde(rename = "trigraph_test")]
    TrigraphTest,
}

impl SessionMode {
    pub fn from_name(name: &str) -> KtResult<Self> {
        name.trim()
            .parse()
            .map_err(|_| KeyTraceError::UnknownMode(name.to_string()))
    }

    /// Single-trigraph collection sessions, where rarity is the point.
    pub fn is_single_trigraph(self) -> bool {
        self == SessionMode::TrigraphTest
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keystroke {
    pub id: KeystrokeId,
    pub session_id: SessionId,
    pub key: String,
    pub timestamp: f64,
    pub prev_key: Option<String>,
    pub finger: Option<Finger>,
    pub hand: Option<Hand>,
    pub current_word: Option<String>,
}

impl Keystroke {
    /// A keystroke with a null `prev_key` starts a new run; nothing may bridge it.
    pub fn is_breakpoint(&self) -> bool {
        self.prev_key.is_none()
    }

    pub fn is_annotated(&self) -> bool {
        self.finger.is_some() && self.hand.is_some()
    }
}

/// Keystroke payload as captured by a client, before it is assigned an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewKeystroke {
    pub key: String,
    pub timestamp: f64,
    #[serde(default)]
    pub prev_key: Option<String>,
    #[serde(default)]
    pub finger: Option<Finger>,
    #[serde(default)]
    pub hand: Option<Hand>,
    #[serde(default)]
    pub current_word: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub mode: SessionMode,
    pub raw_text: String,
    /// Seconds since the Unix epoch.
    pub created_at: u64,
    pub label: Option<String>,
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FingerAnnotation {
    pub keystroke_id: KeystrokeId,
    pub finger: Finger,
    pub hand: Hand,
}

/// Which slice of the keystroke log a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystrokeFilter {
    All,
    Session(SessionId),
    Mode(SessionMode),
}

impl From<Option<SessionMode>> for KeystrokeFilter {
    fn from(mode: Option<SessionMode>) -> Self {
        match mode {
            Some(m) => KeystrokeFilter::Mode(m),
            None => KeystrokeFilter::All,
        }
    }
}

/// Splits a log ordered by (session, id) into one slice per session.
pub fn split_sessions(keystrokes: &[Keystroke]) -> Vec<&[Keystroke]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=keystrokes.len() {
        if i == keystrokes.len() || keystrokes[i].session_id != keystrokes[start].session_id {
            if i > start {
                runs.push(&keystrokes[start..i]);
            }
            start = i;
        }
    }
    runs
}
