use crate::db;
use crate::model::DEFAULT_SESSION_COUNT;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

pub const MAX_SESSION_COUNT: usize = 500;

/// Process-level configuration read once at startup.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub workspace: Option<PathBuf>,
    pub log_filter: String,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let workspace = lookup("ROLLBOOKD_WORKSPACE")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_filter = lookup("ROLLBOOKD_LOG")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());
        Self {
            workspace,
            log_filter,
        }
    }
}

/// Per-workspace settings, stored as JSON under the `settings` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub default_session_count: usize,
    pub clamp_marks: bool,
    pub mark_min: i64,
    pub mark_max: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_session_count: DEFAULT_SESSION_COUNT,
            clamp_marks: true,
            mark_min: 0,
            mark_max: 100,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_session_count > MAX_SESSION_COUNT {
            return Err(format!(
                "defaultSessionCount must be between 0 and {}",
                MAX_SESSION_COUNT
            ));
        }
        if self.mark_min > self.mark_max {
            return Err("markMin must not exceed markMax".to_string());
        }
        Ok(())
    }

    /// Applies the boundary range a numeric mark widget would enforce.
    pub fn bound_mark(&self, value: i64) -> i64 {
        if self.clamp_marks {
            value.clamp(self.mark_min, self.mark_max)
        } else {
            value
        }
    }

    /// Merges a camelCase patch object over the current settings.
    pub fn patched(&self, patch: &Value) -> Result<Settings, String> {
        let Some(patch) = patch.as_object() else {
            return Err("patch must be an object".to_string());
        };
        let mut merged: Map<String, Value> = match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => return Err("internal settings object must be a JSON object".to_string()),
        };
        for (k, v) in patch {
            if !merged.contains_key(k) {
                return Err(format!("unknown setting: {}", k));
            }
            merged.insert(k.clone(), v.clone());
        }
        let next: Settings =
            serde_json::from_value(Value::Object(merged)).map_err(|e| e.to_string())?;
        next.validate()?;
        Ok(next)
    }
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings(conn: &Connection) -> Settings {
    match db::settings_get_json(conn, db::SETTINGS_KEY) {
        Ok(Some(v)) => match serde_json::from_value::<Settings>(v) {
            Ok(s) if s.validate().is_ok() => s,
            _ => {
                tracing::warn!("workspace settings invalid, using defaults");
                Settings::default()
            }
        },
        Ok(None) => Settings::default(),
        Err(e) => {
            tracing::warn!(error = %e, "workspace settings unreadable, using defaults");
            Settings::default()
        }
    }
}

pub fn save_settings(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    db::settings_set_json(conn, db::SETTINGS_KEY, &serde_json::to_value(settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn env_lookup_defaults() {
        let cfg = DaemonConfig::from_lookup(|_| None);
        assert!(cfg.workspace.is_none());
        assert_eq!(cfg.log_filter, "info");

        let cfg = DaemonConfig::from_lookup(|k| match k {
            "ROLLBOOKD_WORKSPACE" => Some("/tmp/rb".to_string()),
            "ROLLBOOKD_LOG" => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(cfg.workspace, Some(PathBuf::from("/tmp/rb")));
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn patch_merges_and_validates() {
        let s = Settings::default();
        let next = s
            .patched(&json!({ "defaultSessionCount": 4, "clampMarks": false }))
            .expect("patch");
        assert_eq!(next.default_session_count, 4);
        assert!(!next.clamp_marks);
        assert_eq!(next.mark_max, 100);

        assert!(s.patched(&json!({ "markMin": 50, "markMax": 10 })).is_err());
        assert!(s.patched(&json!({ "colour": "blue" })).is_err());
        assert!(s.patched(&json!({ "defaultSessionCount": 501 })).is_err());
        assert!(s.patched(&json!([1, 2])).is_err());
    }

    #[test]
    fn bound_mark_respects_toggle() {
        let mut s = Settings::default();
        assert_eq!(s.bound_mark(150), 100);
        assert_eq!(s.bound_mark(-3), 0);
        assert_eq!(s.bound_mark(42), 42);
        s.clamp_marks = false;
        assert_eq!(s.bound_mark(150), 150);
    }
}
