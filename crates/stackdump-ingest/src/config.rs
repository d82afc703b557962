//! Run configuration
//!
//! Defaults reproduce a bare invocation: `stack.db` and the eight dump files
//! in the working directory, fail-fast on the first bad record, progress
//! every 1000 rows. Environment variables override the defaults and the CLI
//! overrides both.

use crate::error::{IngestError, Result};
use crate::loader::LoadOptions;
use crate::schema::STACK_EXCHANGE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_DATABASE: &str = "stack.db";

pub const DEFAULT_DATA_DIR: &str = ".";

/// Rows between two progress log lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// What to do when a single record cannot be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Abort the run; nothing is committed
    #[default]
    FailFast,
    /// Log the record, count it as skipped and keep going
    Skip,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail-fast" | "failfast" | "abort" => Ok(ErrorPolicy::FailFast),
            "skip" | "skip-and-log" => Ok(ErrorPolicy::Skip),
            other => Err(IngestError::config(format!(
                "invalid error policy '{}' (expected fail-fast or skip)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::FailFast => write!(f, "fail-fast"),
            ErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Ingest run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// SQLite database file; created when missing
    pub database_path: PathBuf,

    /// Directory holding the dump files
    pub data_dir: PathBuf,

    /// Entities to load, in load order
    pub entities: Vec<String>,

    pub error_policy: ErrorPolicy,

    pub progress_interval: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            entities: STACK_EXCHANGE.iter().map(|s| s.name.to_string()).collect(),
            error_policy: ErrorPolicy::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl IngestConfig {
    /// Defaults overridden by the environment
    ///
    /// Environment variables:
    /// - `STACKDUMP_DATABASE`: database file path
    /// - `STACKDUMP_DATA_DIR`: directory holding the dump files
    /// - `STACKDUMP_ENTITIES`: comma-separated entity names
    /// - `STACKDUMP_ON_ERROR`: fail-fast or skip
    /// - `STACKDUMP_PROGRESS_INTERVAL`: rows between progress lines
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STACKDUMP_DATABASE") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("STACKDUMP_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(list) = std::env::var("STACKDUMP_ENTITIES") {
            config.entities = parse_entity_list(&list);
        }

        if let Ok(policy) = std::env::var("STACKDUMP_ON_ERROR") {
            config.error_policy = policy.parse()?;
        }

        if let Ok(interval) = std::env::var("STACKDUMP_PROGRESS_INTERVAL") {
            config.progress_interval = interval.trim().parse().map_err(|_| {
                IngestError::config(format!("invalid progress interval '{}'", interval))
            })?;
        }

        Ok(config)
    }

    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }

    /// Reject settings no run could use
    pub fn validate(&self) -> Result<()> {
        if self.entities.is_empty() {
            return Err(IngestError::config("no entities selected"));
        }

        if self.progress_interval == 0 {
            return Err(IngestError::config("progress interval must be at least 1"));
        }

        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            error_policy: self.error_policy,
            progress_interval: self.progress_interval,
        }
    }
}

/// Split `posts, users,,votes` into `["posts", "users", "votes"]`
pub fn parse_entity_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builder for [`IngestConfig`]
#[derive(Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    /// Start from an existing configuration instead of the defaults
    pub fn from_config(config: IngestConfig) -> Self {
        Self { config }
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn entities<S: Into<String>>(mut self, entities: impl IntoIterator<Item = S>) -> Self {
        self.config.entities = entities.into_iter().map(Into::into).collect();
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn progress_interval(mut self, rows: u64) -> Self {
        self.config.progress_interval = rows;
        self
    }

    pub fn build(self) -> IngestConfig {
        self.config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_bare_invocation() {
        let config = IngestConfig::default();

        assert_eq!(config.database_path, PathBuf::from("stack.db"));
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(
            config.entities,
            vec![
                "badges",
                "comments",
                "posts",
                "posthistory",
                "postlinks",
                "tags",
                "users",
                "votes"
            ]
        );
        assert_eq!(config.error_policy, ErrorPolicy::FailFast);
        assert_eq!(config.progress_interval, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_error_policy_from_str() {
        assert_eq!("fail-fast".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::FailFast);
        assert_eq!("SKIP".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Skip);
        assert!(matches!(
            "retry".parse::<ErrorPolicy>(),
            Err(IngestError::Configuration(_))
        ));
    }

    #[test]
    fn test_parse_entity_list() {
        assert_eq!(parse_entity_list(" Posts, users,,votes "), vec!["posts", "users", "votes"]);
        assert!(parse_entity_list(" , ").is_empty());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = IngestConfig::builder()
            .database_path("/tmp/so.db")
            .entities(["tags"])
            .error_policy(ErrorPolicy::Skip)
            .progress_interval(0)
            .build();

        assert_eq!(config.entities, vec!["tags"]);
        assert!(matches!(config.validate(), Err(IngestError::Configuration(_))));

        let options = IngestConfigBuilder::from_config(config)
            .progress_interval(10)
            .build()
            .load_options();
        assert_eq!(options.error_policy, ErrorPolicy::Skip);
        assert_eq!(options.progress_interval, 10);
    }
}
