//! Client configuration and tuning constants.
//!
//! Runtime settings come from `config.toml`, then the environment (a `.env`
//! file is loaded first if present), then built-in defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ==================== Scheduler Configuration ====================

/// Starting ease factor for a card never reviewed before
pub const DEFAULT_EASE: f64 = 2.5;

/// Ease never drops below this
pub const MIN_EASE: f64 = 1.3;

/// "again" re-queues the card this many minutes out, inside the same session
pub const AGAIN_REQUEUE_MINUTES: i64 = 10;

/// Ease penalty for "again"
pub const AGAIN_EASE_PENALTY: f64 = 0.2;

/// Ease penalty for "hard"
pub const HARD_EASE_PENALTY: f64 = 0.15;

/// Interval multiplier for "hard"
pub const HARD_INTERVAL_FACTOR: f64 = 1.2;

/// Ease bonus for "easy", also added on top of the new ease for the interval
pub const EASY_BONUS: f64 = 0.15;

/// First interval in days after an "easy" on an unscheduled card
pub const EASY_FIRST_INTERVAL_DAYS: u32 = 3;

// ==================== Mastery Rules ====================

/// Vocabulary: a positive grade at this many reps marks the word known
pub const VOCABULARY_KNOWN_REPS: u32 = 3;

/// Grammar: mastered after this many consecutive successful reviews...
pub const GRAMMAR_MASTERED_REPS: u32 = 5;

/// ...or once scheduled at least this many days out
pub const GRAMMAR_MASTERED_INTERVAL_DAYS: u32 = 7;

// ==================== Study Configuration ====================

/// Number of distractor choices in quiz mode
pub const DISTRACTOR_COUNT: usize = 3;

/// Default cap on new cards mixed into the study pool
pub const DEFAULT_NEW_CARD_LIMIT: usize = 20;

/// Cards shown in the "review today" panel
pub const REVIEW_QUEUE_LIMIT: usize = 5;

/// CEFR level assumed when the server sends none
pub const DEFAULT_LEVEL: &str = "A1";

/// Filter value meaning "no filter"
pub const FILTER_ALL: &str = "ALL";

// ==================== Storage Configuration ====================

pub const VOCABULARY_STORAGE_PREFIX: &str = "eng_vocab_progress_v1";
pub const GRAMMAR_STORAGE_PREFIX: &str = "grammar_deck_v1";

/// Store key suffix when the user cannot be identified
pub const GUEST_USER: &str = "guest";

pub const DEFAULT_DB_PATH: &str = "data/progress.db";

// ==================== API Configuration ====================

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

// ==================== Runtime Configuration ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api: Option<ApiSection>,
    storage: Option<StorageSection>,
    study: Option<StudySection>,
}

#[derive(Debug, Deserialize)]
struct ApiSection {
    base_url: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StorageSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StudySection {
    new_card_limit: Option<usize>,
    due_only: Option<bool>,
}

/// Resolved client settings
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub db_path: PathBuf,
    pub new_card_limit: usize,
    pub due_only: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            new_card_limit: DEFAULT_NEW_CARD_LIMIT,
            due_only: true,
        }
    }
}

/// Load settings with priority: config.toml > environment > default
pub fn load() -> ClientConfig {
    // Load .env file if present
    let _ = dotenvy::dotenv();
    load_from(Path::new("config.toml"), |key| std::env::var(key).ok())
}

/// Same as [`load`] with the file path and environment injected
pub fn load_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> ClientConfig {
    let file = read_file_config(path);
    let defaults = ClientConfig::default();

    let api = file.api.as_ref();
    let api_url = api
        .and_then(|a| a.base_url.clone())
        .or_else(|| env("API_URL"))
        .unwrap_or(defaults.api_url);
    let api_token = api
        .and_then(|a| a.token.clone())
        .or_else(|| env("API_TOKEN"))
        .filter(|t| !t.trim().is_empty());

    let db_path = file
        .storage
        .as_ref()
        .and_then(|s| s.path.clone())
        .or_else(|| env("PROGRESS_DB_PATH"))
        .map(PathBuf::from)
        .unwrap_or(defaults.db_path);

    let study = file.study.as_ref();
    let new_card_limit = study
        .and_then(|s| s.new_card_limit)
        .or_else(|| env("NEW_CARD_LIMIT").and_then(|v| v.trim().parse().ok()))
        .unwrap_or(defaults.new_card_limit);
    let due_only = study.and_then(|s| s.due_only).unwrap_or(defaults.due_only);

    tracing::info!("Using API at {} and progress store {}", api_url, db_path.display());

    ClientConfig {
        api_url,
        api_token,
        db_path,
        new_card_limit,
        due_only,
    }
}

fn read_file_config(path: &Path) -> FileConfig {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return FileConfig::default();
    };
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}
