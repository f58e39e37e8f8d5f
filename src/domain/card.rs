use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::kind::CardKind;
use super::lenient;
use crate::config;

/// Card identifier as the client sees it.
///
/// The server issues numeric ids; they are kept in string form so that
/// ids synthesized locally (never all-digit) can share the same key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// True for ids the server handed out (non-empty, ASCII digits only)
  pub fn is_server_id(&self) -> bool {
    !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
  }
}

impl fmt::Display for CardId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for CardId {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

impl From<String> for CardId {
  fn from(s: String) -> Self {
    Self(s)
  }
}

impl From<u64> for CardId {
  fn from(n: u64) -> Self {
    Self(n.to_string())
  }
}

impl<'de> Deserialize<'de> for CardId {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
      Number(u64),
      Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
      Raw::Number(n) => CardId::from(n),
      Raw::Text(s) => CardId(s),
    })
  }
}

/// Spaced repetition state of one card, owned by the local progress store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
  /// Consecutive successful reviews since the last lapse
  pub reps: u32,
  pub ease: f64,
  /// Days until the next review; 0 means not yet scheduled
  pub interval: u32,
  #[serde(with = "chrono::serde::ts_milliseconds")]
  pub due: DateTime<Utc>,
  /// Total "again" grades, never reset
  pub lapses: u32,
}

impl SchedulingState {
  /// Fresh state for a card seen for the first time: due immediately
  pub fn new(now: DateTime<Utc>) -> Self {
    Self {
      reps: 0,
      ease: config::DEFAULT_EASE,
      interval: 0,
      due: now,
      lapses: 0,
    }
  }

  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.due <= now
  }

  pub fn is_new(&self) -> bool {
    self.reps == 0
  }

  /// Stored states that break the ease floor are treated as corrupt
  pub fn is_well_formed(&self) -> bool {
    self.ease.is_finite() && self.ease >= config::MIN_EASE
  }
}

impl Default for SchedulingState {
  fn default() -> Self {
    Self::new(now_millis())
  }
}

/// Current time truncated to whole milliseconds, the precision stored
/// timestamps keep
pub fn now_millis() -> DateTime<Utc> {
  let now = Utc::now();
  DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// `now + days`, saturating at the far end of the calendar
pub(crate) fn due_after_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
  now
    .checked_add_signed(Duration::days(i64::from(days)))
    .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Usage example attached to a vocabulary word or grammar point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
  pub en: String,
  #[serde(default)]
  pub vi: String,
}

/// What the local progress store keeps per card id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEntry {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub srs: Option<SchedulingState>,
  #[serde(
    with = "chrono::serde::ts_milliseconds_option",
    skip_serializing_if = "Option::is_none"
  )]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub examples: Option<Vec<Example>>,
}

impl PersistedEntry {
  pub fn new(srs: SchedulingState, created_at: DateTime<Utc>) -> Self {
    Self {
      srs: Some(srs),
      created_at: Some(created_at),
      examples: None,
    }
  }

  /// Decode one stored entry, dropping any field that is malformed.
  ///
  /// Returns `None` only when the value is not an object at all.
  pub fn from_json(value: &Value) -> Option<Self> {
    let obj = value.as_object()?;

    let srs = obj
      .get("srs")
      .and_then(|v| serde_json::from_value::<SchedulingState>(v.clone()).ok())
      .filter(SchedulingState::is_well_formed);

    let created_at = obj
      .get("createdAt")
      .and_then(Value::as_i64)
      .and_then(DateTime::from_timestamp_millis);

    let examples = obj
      .get("examples")
      .and_then(|v| serde_json::from_value::<Vec<Example>>(v.clone()).ok());

    Some(Self {
      srs,
      created_at,
      examples,
    })
  }

  /// Shallow patch: every field present in `patch` replaces ours
  pub fn apply_patch(&mut self, patch: PersistedEntry) {
    if patch.srs.is_some() {
      self.srs = patch.srs;
    }
    if patch.created_at.is_some() {
      self.created_at = patch.created_at;
    }
    if patch.examples.is_some() {
      self.examples = patch.examples;
    }
  }
}

/// Server-maintained progress flags that arrive with every card
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerProgress {
  #[serde(deserialize_with = "lenient::null_default")]
  pub known: bool,
  #[serde(deserialize_with = "lenient::null_default")]
  pub favorite: bool,
  #[serde(deserialize_with = "lenient::null_default")]
  pub correct_count: u32,
  #[serde(deserialize_with = "lenient::null_default")]
  pub wrong_count: u32,
  #[serde(deserialize_with = "lenient::opt_or_none")]
  pub last_reviewed_at: Option<String>,
}

/// One card as returned by the content endpoints: id, progress flags and
/// the kind-specific content fields, all flat in the same JSON object.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCard<W> {
  pub id: CardId,
  #[serde(flatten)]
  pub progress: ServerProgress,
  #[serde(flatten)]
  pub content: W,
}

/// A card in the in-memory deck: server content and flags merged with the
/// locally owned scheduling state.
#[derive(Debug, Clone, PartialEq)]
pub struct Card<K: CardKind> {
  pub id: CardId,
  pub content: K::Content,
  pub known: bool,
  pub favorite: bool,
  pub correct_count: u32,
  pub wrong_count: u32,
  pub last_reviewed_at: Option<String>,
  pub srs: SchedulingState,
  /// First time this client saw the card; diagnostics only
  pub created_at: DateTime<Utc>,
}

impl<K: CardKind> Card<K> {
  /// Build a card purely from server data, with default scheduling state
  pub fn from_remote(remote: RemoteCard<K::Wire>, now: DateTime<Utc>) -> Self {
    let RemoteCard {
      id,
      progress,
      content,
    } = remote;

    Self {
      id,
      content: K::content_from_wire(content),
      known: progress.known,
      favorite: progress.favorite,
      correct_count: progress.correct_count,
      wrong_count: progress.wrong_count,
      last_reviewed_at: progress.last_reviewed_at,
      srs: SchedulingState::new(now),
      created_at: now,
    }
  }

  /// Locally owned fields, as written to the progress store
  pub fn persisted_entry(&self) -> PersistedEntry {
    PersistedEntry::new(self.srs, self.created_at)
  }

  pub fn is_mastered(&self) -> bool {
    K::is_mastered(self)
  }
}
