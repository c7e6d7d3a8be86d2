use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Application configuration loaded from environment variables.
///
/// The API key is only required once there is something to generate, so an empty
/// inbox runs without credentials.
#[derive(Clone)]
pub struct Config {
    anthropic_api_key: Option<String>,
    pub base_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    /// `base_dir` comes from the CLI. A `.env` in the base directory is loaded first,
    /// then one in the working directory; neither overrides variables already set.
    pub fn from_env(base_dir: PathBuf) -> Self {
        dotenvy::from_path(base_dir.join(".env")).ok();
        dotenvy::dotenv().ok();

        Self::from_vars(
            base_dir,
            std::env::var(API_KEY_VAR).ok(),
            std::env::var("RUST_LOG").ok(),
        )
    }

    pub fn from_vars(base_dir: PathBuf, api_key: Option<String>, rust_log: Option<String>) -> Self {
        Config {
            anthropic_api_key: api_key.filter(|v| !v.trim().is_empty()),
            base_dir,
            rust_log: rust_log.unwrap_or_else(|| "info".to_string()),
        }
    }

    /// Fails when `ANTHROPIC_API_KEY` is missing or blank.
    pub fn require_api_key(&self) -> Result<&str> {
        self.anthropic_api_key
            .as_deref()
            .with_context(|| format!("Required environment variable '{API_KEY_VAR}' is not set"))
    }

    pub fn paths(&self) -> Paths {
        Paths::new(&self.base_dir)
    }
}

/// Keeps the API key out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("anthropic_api_key", &"<redacted>")
            .field("base_dir", &self.base_dir)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

/// Filesystem layout derived from the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub inbox: PathBuf,
    pub done: PathBuf,
    pub context_bank: PathBuf,
    pub shape_state: PathBuf,
}

impl Paths {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            inbox: base_dir.join("inbox"),
            done: base_dir.join("done"),
            context_bank: base_dir.join("context.json"),
            shape_state: base_dir.join("last_shape.txt"),
        }
    }
}
