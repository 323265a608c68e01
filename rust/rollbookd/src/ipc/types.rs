use std::path::PathBuf;

use crate::config::Settings;
use crate::model::ClassRepository;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub classes: ClassRepository,
    pub current_class: Option<usize>,
    pub settings: Settings,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            classes: ClassRepository::new(),
            current_class: None,
            settings: Settings::default(),
        }
    }
}
