use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::WorkArrangement;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleFilter {
    /// If non-empty, a title must mention one of these to be in scope.
    pub include: Vec<String>,
    /// A title mentioning any of these is out of scope.
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub digests_dir: Option<PathBuf>,
    /// Most trusted source first.
    pub source_priority: Vec<String>,
    pub role_filter: RoleFilter,
    pub allowed_arrangements: Vec<WorkArrangement>,
    pub batch_size: usize,
    pub title_max_len: usize,
    pub date_tolerance_days: i64,
    pub best_match_threshold: f64,
    pub enricher_command: Option<Vec<String>>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            digests_dir: None,
            source_priority: ["linkedin-page", "linkedin-alert", "indeed", "feed", "scrape"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            role_filter: RoleFilter::default(),
            allowed_arrangements: Vec::new(),
            batch_size: 10,
            title_max_len: 120,
            date_tolerance_days: 3,
            best_match_threshold: 0.7,
            enricher_command: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from the per-user config dir. A missing
    /// file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match directories::ProjectDirs::from("", "", "huntlog") {
                Some(dirs) => dirs.config_dir().join("config.json"),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("huntlog.db")
    }

    pub fn digests_dir(&self) -> PathBuf {
        self.digests_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("digests"))
    }

    /// Rank of a source tag; lower is more trusted, unknown tags sort last.
    pub fn source_rank(&self, source: &str) -> usize {
        self.source_priority
            .iter()
            .position(|s| s.eq_ignore_ascii_case(source))
            .unwrap_or(self.source_priority.len())
    }

    pub fn arrangement_allowed(&self, arrangement: WorkArrangement) -> bool {
        arrangement == WorkArrangement::Unknown
            || self.allowed_arrangements.is_empty()
            || self.allowed_arrangements.contains(&arrangement)
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "huntlog") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
