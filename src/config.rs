//! Ingestion settings: built-in defaults, then an optional JSON file, then
//! command-line overrides.

use crate::error::SetupError;
use crate::index::IndexConfig;
use crate::ingest::pipeline::DEFAULT_REPORT_EVERY;
use crate::ingest::policy::{CommitPolicy, DEFAULT_STORED_FIELDS, FieldPolicy};
use crate::source::WikimediaOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "dumpdex";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Commit after this many documents
    #[serde(default = "default_commit_interval")]
    pub commit_interval: u64,

    /// Print a progress line after this many documents
    #[serde(default = "default_report_every")]
    pub report_every: u64,

    /// Restart the dump at end of file
    #[serde(default)]
    pub forever: bool,

    /// Index Image:/File: pages instead of skipping them
    #[serde(default)]
    pub keep_image_only_docs: bool,

    /// Fields whose values are retrievable from the index
    #[serde(default = "default_stored_fields")]
    pub stored_fields: Vec<String>,

    /// Documents held in memory before a segment is flushed
    #[serde(default = "default_max_buffered_docs")]
    pub max_buffered_docs: usize,

    /// Article URL prefix; derived from the dump file name if unset
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_commit_interval() -> u64 {
    CommitPolicy::DEFAULT_INTERVAL
}

fn default_report_every() -> u64 {
    DEFAULT_REPORT_EVERY
}

fn default_stored_fields() -> Vec<String> {
    DEFAULT_STORED_FIELDS.iter().map(|s| s.to_string()).collect()
}

fn default_max_buffered_docs() -> usize {
    IndexConfig::default().max_buffered_docs
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            commit_interval: default_commit_interval(),
            report_every: default_report_every(),
            forever: false,
            keep_image_only_docs: false,
            stored_fields: default_stored_fields(),
            max_buffered_docs: default_max_buffered_docs(),
            base_url: None,
        }
    }
}

impl IngestConfig {
    /// Load from `path`, or from the platform config directory when None.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match get_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: IngestConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
        tracing::debug!("loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.commit_interval == 0 {
            return Err(SetupError::Config(
                "commit_interval must be a positive integer".to_string(),
            ));
        }
        if self.report_every == 0 {
            return Err(SetupError::Config(
                "report_every must be a positive integer".to_string(),
            ));
        }
        if self.max_buffered_docs == 0 {
            return Err(SetupError::Config(
                "max_buffered_docs must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    pub fn field_policy(&self) -> FieldPolicy {
        FieldPolicy::new(self.stored_fields.iter().cloned())
    }

    pub fn commit_policy(&self) -> Result<CommitPolicy, SetupError> {
        CommitPolicy::new(self.commit_interval).ok_or_else(|| {
            SetupError::Config("commit_interval must be a positive integer".to_string())
        })
    }

    pub fn source_options(&self) -> WikimediaOptions {
        WikimediaOptions {
            forever: self.forever,
            keep_image_only_docs: self.keep_image_only_docs,
            base_url: self.base_url.clone(),
        }
    }

    pub fn index_config(&self) -> IndexConfig {
        IndexConfig {
            max_buffered_docs: self.max_buffered_docs,
        }
    }
}

/// `<config dir>/dumpdex/config.json`, if the platform has a config directory
pub fn get_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.commit_interval, 1_000_000);
        assert_eq!(config.report_every, 5_000);
        assert_eq!(config.stored_fields, vec!["id", "title", "url", "date"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"commit_interval": 250, "forever": true}"#).unwrap();

        let config = IngestConfig::load(Some(&path)).unwrap();
        assert_eq!(config.commit_interval, 250);
        assert!(config.forever);
        assert!(config.source_options().forever);
        assert_eq!(config.report_every, 5_000);
        assert_eq!(config.max_buffered_docs, 50_000);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(IngestConfig::load(Some(&dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_validate_rejects_zeros() {
        let config = IngestConfig {
            commit_interval: 0,
            ..IngestConfig::default()
        };
        assert!(matches!(config.validate(), Err(SetupError::Config(_))));

        let config = IngestConfig {
            report_every: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());

        let config = IngestConfig {
            max_buffered_docs: 0,
            ..IngestConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storing_body_is_allowed() {
        let config = IngestConfig {
            stored_fields: vec!["id".to_string(), "body".to_string()],
            ..IngestConfig::default()
        };
        assert!(config.field_policy().store("body"));
    }
}
