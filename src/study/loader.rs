//! Content loading: decode of server listings and the "latest load wins"
//! token guard.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::api::ApiError;
use crate::domain::{CardKind, RemoteCard};

#[derive(Debug, thiserror::Error)]
pub enum ContentLoadError {
  #[error(transparent)]
  Api(#[from] ApiError),

  #[error("Unexpected content shape: {0}")]
  UnexpectedShape(String),
}

/// Decode a card listing; anything but a list of well-formed cards fails
pub fn decode_cards<K: CardKind>(body: Value) -> Result<Vec<RemoteCard<K::Wire>>, ContentLoadError> {
  let Value::Array(items) = body else {
    return Err(ContentLoadError::UnexpectedShape(format!(
      "expected a list of {} cards",
      K::DOMAIN
    )));
  };

  items
    .into_iter()
    .enumerate()
    .map(|(i, item)| {
      serde_json::from_value(item).map_err(|e| {
        ContentLoadError::UnexpectedShape(format!("{} card #{}: {}", K::DOMAIN, i, e))
      })
    })
    .collect()
}

/// Issues increasing load tokens; only the newest one is current
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
  latest: Arc<AtomicU64>,
}

impl LoadGuard {
  pub fn issue(&self) -> u64 {
    self.latest.fetch_add(1, Ordering::SeqCst) + 1
  }

  pub fn is_current(&self, token: u64) -> bool {
    self.latest.load(Ordering::SeqCst) == token
  }
}

/// A finished fetch, tagged with the token it was issued under
pub struct LoadResult<K: CardKind> {
  pub(crate) token: u64,
  pub(crate) result: Result<Vec<RemoteCard<K::Wire>>, ContentLoadError>,
}

impl<K: CardKind> LoadResult<K> {
  pub fn token(&self) -> u64 {
    self.token
  }
}

#[derive(Debug)]
pub enum LoadOutcome {
  /// Deck replaced with this many cards
  Applied(usize),
  /// A newer load was started; result discarded
  Stale,
  /// Deck cleared; message kept for display
  Failed(ContentLoadError),
}

impl LoadOutcome {
  pub fn is_applied(&self) -> bool {
    matches!(self, LoadOutcome::Applied(_))
  }

  pub fn is_stale(&self) -> bool {
    matches!(self, LoadOutcome::Stale)
  }
}
