//! Service configuration loaded from TOML.

use crate::error::{ProgressError, Result};
use crate::store::DEFAULT_STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "examflow.toml";
pub const CONFIG_ENV_VAR: &str = "EXAMFLOW_CONFIG";

/// XP paid out for the events the practice UI raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardTable {
    pub correct_answer: u64,
    pub fast_answer_bonus: u64,
    /// Answers strictly faster than this earn the bonus.
    pub fast_answer_seconds: u64,
    pub ai_question: u64,
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            correct_answer: 20,
            fast_answer_bonus: 10,
            fast_answer_seconds: 30,
            ai_question: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_host: String,
    pub bind_port: u16,
    pub data_dir: PathBuf,
    pub storage_key: String,
    /// 0 disables the quota check.
    pub store_quota_bytes: usize,
    pub subject_target: u64,
    pub rewards: RewardTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            bind_port: 8080,
            data_dir: PathBuf::from("data"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            store_quota_bytes: 5 * 1024 * 1024,
            subject_target: 100,
            rewards: RewardTable::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ProgressError::Config(e.to_string()))
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Config path from the first CLI argument, then `EXAMFLOW_CONFIG`, then `examflow.toml`.
    pub fn resolve_path(arg: Option<String>) -> PathBuf {
        arg.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
