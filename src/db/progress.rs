//! Local progress store: one JSON map of card id -> persisted entry per
//! (domain, user) key.
//!
//! Reads never fail. A payload that does not parse, or a database error
//! while reading, is logged and treated as an empty map so that study can
//! continue with default scheduling state.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Result, params};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use super::{DbPool, LogOnError, init_db, init_memory_db, try_lock};
use crate::auth::UserIdentity;
use crate::config;
use crate::domain::{CardId, CardKind, PersistedEntry};

pub type ProgressMap = HashMap<CardId, PersistedEntry>;

/// Namespaced store key: `<prefix>_<user id | guest>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
  pub fn new(prefix: &str, identity: &UserIdentity) -> Self {
    let user = match identity {
      UserIdentity::User(id) => id.as_str(),
      UserIdentity::Guest => config::GUEST_USER,
    };
    Self(format!("{}_{}", prefix, user))
  }

  /// Key for one card kind, so vocabulary and grammar never share entries
  pub fn for_kind<K: CardKind>(identity: &UserIdentity) -> Self {
    Self::new(K::STORAGE_PREFIX, identity)
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for StoreKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Clone)]
pub struct ProgressStore {
  pool: DbPool,
}

impl ProgressStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }

  /// Open the on-disk store, creating file and table on first use
  pub fn open(path: &Path) -> Result<Self> {
    Ok(Self::new(init_db(path)?))
  }

  pub fn in_memory() -> Result<Self> {
    Ok(Self::new(init_memory_db()?))
  }

  pub fn read(&self, key: &StoreKey) -> ProgressMap {
    let conn = match try_lock(&self.pool) {
      Ok(conn) => conn,
      Err(e) => {
        tracing::warn!("Reading progress for {}: {}", key, e);
        return ProgressMap::new();
      }
    };
    read_map(&conn, key)
  }

  /// Replace the whole map stored under `key`
  pub fn write(&self, key: &StoreKey, map: &ProgressMap) -> Result<()> {
    let conn = try_lock(&self.pool)?;
    write_map(&conn, key, map)
  }

  pub fn clear(&self, key: &StoreKey) -> Result<()> {
    let conn = try_lock(&self.pool)?;
    conn.execute("DELETE FROM progress WHERE store_key = ?1", params![key.as_str()])?;
    tracing::info!("Cleared progress for {}", key);
    Ok(())
  }

  /// Patch one card's entry, keeping fields the patch leaves out
  pub fn save_entry(&self, key: &StoreKey, id: &CardId, entry: PersistedEntry) -> Result<()> {
    self.upsert_entries(key, [(id.clone(), entry)])
  }

  /// Patch several entries under one lock
  pub fn upsert_entries<I>(&self, key: &StoreKey, entries: I) -> Result<()>
  where
    I: IntoIterator<Item = (CardId, PersistedEntry)>,
  {
    let conn = try_lock(&self.pool)?;
    let mut map = read_map(&conn, key);
    for (id, patch) in entries {
      map.entry(id).or_default().apply_patch(patch);
    }
    write_map(&conn, key, &map)
  }
}

fn read_map(conn: &Connection, key: &StoreKey) -> ProgressMap {
  let payload: Option<String> = conn
    .query_row(
      "SELECT payload FROM progress WHERE store_key = ?1",
      params![key.as_str()],
      |row| row.get(0),
    )
    .optional()
    .log_warn_default(&format!("Reading progress for {}", key));

  match payload {
    Some(payload) => decode_payload(&payload),
    None => ProgressMap::new(),
  }
}

fn write_map(conn: &Connection, key: &StoreKey, map: &ProgressMap) -> Result<()> {
  let payload =
    serde_json::to_string(map).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
  conn.execute(
    "INSERT OR REPLACE INTO progress (store_key, payload, updated_at) VALUES (?1, ?2, ?3)",
    params![key.as_str(), payload, Utc::now().to_rfc3339()],
  )?;
  Ok(())
}

/// Lenient decode of a stored payload.
///
/// Anything but a JSON object yields an empty map; entries that are not
/// objects are skipped; bad fields inside an entry are dropped.
pub fn decode_payload(payload: &str) -> ProgressMap {
  let value: Value = match serde_json::from_str(payload) {
    Ok(v) => v,
    Err(e) => {
      tracing::warn!("Discarding unparsable progress payload: {}", e);
      return ProgressMap::new();
    }
  };

  let Some(obj) = value.as_object() else {
    tracing::warn!("Discarding progress payload that is not an object");
    return ProgressMap::new();
  };

  obj
    .iter()
    .filter_map(|(id, entry)| {
      PersistedEntry::from_json(entry).map(|entry| (CardId::from(id.as_str()), entry))
    })
    .collect()
}
