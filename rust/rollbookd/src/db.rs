use crate::model::ClassRecord;
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

pub const DB_FILE: &str = "rollbook.sqlite3";
pub const CLASSES_KEY: &str = "classes";
pub const CLASSES_CORRUPT_KEY: &str = "classes.corrupt";
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored classes are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(conn)
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |r| {
            r.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let updated_at = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv_store(key, value, updated_at)
         VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET
           value = excluded.value,
           updated_at = excluded.updated_at",
        (key, value, &updated_at),
    )
    .with_context(|| format!("failed to write key {}", key))?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let Some(text) = kv_get(conn, key)? else {
        return Ok(None);
    };
    let value = serde_json::from_str(&text)
        .with_context(|| format!("setting {} is not valid JSON", key))?;
    Ok(Some(value))
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    kv_set(conn, key, &serde_json::to_string(value)?)
}

/// A stored `null` is treated like a missing key.
pub fn decode_classes(text: &str) -> Result<Vec<ClassRecord>, StoreError> {
    let classes: Option<Vec<ClassRecord>> = serde_json::from_str(text)?;
    Ok(classes.unwrap_or_default())
}

pub fn encode_classes(classes: &[ClassRecord]) -> anyhow::Result<String> {
    Ok(serde_json::to_string(classes)?)
}

/// Reads the class collection. Never fails: a missing key, a read error or a
/// malformed blob all come back as an empty collection. A malformed blob is
/// first copied to `classes.corrupt` so the next save cannot destroy it.
pub fn load_classes(conn: &Connection) -> Vec<ClassRecord> {
    let text = match kv_get(conn, CLASSES_KEY) {
        Ok(Some(t)) => t,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, "class store unreadable, starting empty");
            return Vec::new();
        }
    };

    match decode_classes(&text) {
        Ok(classes) => classes,
        Err(e) => {
            tracing::warn!(error = %e, bytes = text.len(), "class store malformed, starting empty");
            if let Err(e) = kv_set(conn, CLASSES_CORRUPT_KEY, &text) {
                tracing::warn!(error = %e, "could not preserve malformed class store");
            }
            Vec::new()
        }
    }
}

pub fn save_classes(conn: &Connection, classes: &[ClassRecord]) -> anyhow::Result<()> {
    let text = encode_classes(classes)?;
    kv_set(conn, CLASSES_KEY, &text)?;
    tracing::debug!(classes = classes.len(), bytes = text.len(), "class store saved");
    Ok(())
}
