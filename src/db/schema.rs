use rusqlite::{Connection, Result};

pub fn run_migrations(conn: &Connection) -> Result<()> {
  // One row per (domain, user) store key; payload is the JSON progress map
  conn.execute_batch(
    r#"
    CREATE TABLE IF NOT EXISTS progress (
      store_key TEXT PRIMARY KEY,
      payload TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );
    "#,
  )?;

  Ok(())
}
