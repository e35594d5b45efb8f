//! Configuration and data directory resolution

use crate::error::KonkordError;
use crate::search::SearchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "konkord.json";
pub const SETTINGS_DB_NAME: &str = "settings.db";
pub const DATA_DIR_ENV: &str = "KONKORD_DATA_DIR";

const DEFAULT_RESULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_RECENT_SOURCES_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xml,
    Json,
}

impl ExportFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "xml" => Some(ExportFormat::Xml),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnnotatorKind {
    /// Pre-annotated `form/pos/lemma` text.
    #[default]
    Tagged,
    /// Raw text, split on whitespace and sentence punctuation.
    Whitespace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub result_cache_capacity: usize,
    pub recent_sources_limit: usize,
    pub cross_sentence_windows: bool,
    pub export_format: ExportFormat,
    pub annotator: AnnotatorKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: get_data_dir(),
            result_cache_capacity: DEFAULT_RESULT_CACHE_CAPACITY,
            recent_sources_limit: DEFAULT_RECENT_SOURCES_LIMIT,
            cross_sentence_windows: true,
            export_format: ExportFormat::default(),
            annotator: AnnotatorKind::default(),
        }
    }
}

impl Config {
    /// Load `konkord.json` from a data directory. A missing file gives the
    /// defaults with `data_dir` set to that directory.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self, KonkordError> {
        let path = data_dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self {
                data_dir: data_dir.to_path_buf(),
                ..Self::default()
            });
        }
        let mut config = Self::load_file(&path)?;
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, KonkordError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| KonkordError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| KonkordError::Config(format!("Failed to parse {:?}: {}", path, e)))
    }

    pub fn save(&self) -> Result<PathBuf, KonkordError> {
        std::fs::create_dir_all(&self.data_dir)?;
        let path = self.data_dir.join(CONFIG_FILE_NAME);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| KonkordError::Config(e.to_string()))?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            cross_sentence_windows: self.cross_sentence_windows,
        }
    }

    pub fn settings_db_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_DB_NAME)
    }
}

/// Data directory: `KONKORD_DATA_DIR`, else the platform data directory,
/// else `./data`.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("konkord"))
        .unwrap_or_else(|| PathBuf::from("data"))
}
