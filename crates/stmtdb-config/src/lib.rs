//! Typed runtime configuration for stmtdb storage fronts.
//!
//! Configuration is read from TOML once at startup and validated before any
//! pipeline is started. Every field has a default, so an empty document is a
//! valid configuration.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

pub const DEFAULT_PIPELINE_TAG: &str = "backing";
pub const DEFAULT_WORKER_NAME: &str = "stmtdb-pipeline";

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

///
/// StorageConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub pipeline: PipelineConfig,
    pub statements: StatementConfig,
}

impl StorageConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()
    }
}

///
/// PipelineConfig
///
/// Shape of one queued execution pipeline.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Bounded queue capacity; `None` selects an unbounded queue.
    pub queue_capacity: Option<usize>,

    pub shutdown: ShutdownPolicy,

    /// Time each executed statement and report it to the instrumentation sink.
    pub instrumentation: bool,

    /// Tag attached to every timing event ("backing", "front-end", ...).
    pub tag: String,

    pub query_mode: QueryMode,

    /// Thread name of the pipeline worker.
    pub worker_name: String,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == Some(0) {
            return Err(ConfigError::Invalid {
                field: "pipeline.queue_capacity",
                reason: "capacity must be greater than zero; omit it for an unbounded queue"
                    .to_string(),
            });
        }
        if self.tag.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "pipeline.tag",
                reason: "tag must not be empty".to_string(),
            });
        }
        if self.worker_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "pipeline.worker_name",
                reason: "worker name must not be empty".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.queue_capacity.is_some()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: None,
            shutdown: ShutdownPolicy::default(),
            instrumentation: false,
            tag: DEFAULT_PIPELINE_TAG.to_string(),
            query_mode: QueryMode::default(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
        }
    }
}

///
/// ShutdownPolicy
///
/// What happens to operations still queued when the pipeline shuts down.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Execute every queued operation before joining the worker.
    #[default]
    Drain,

    /// Fail every queued operation with a discard error.
    Discard,
}

///
/// QueryMode
///
/// Routing of read-only statements.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Queries travel through the queue like writes.
    #[default]
    Queued,

    /// Queries run on the caller thread once prior queued writes are done.
    Bypass,
}

///
/// StatementConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StatementConfig {
    /// Cache compiled statements by descriptor fingerprint.
    pub cache: bool,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self { cache: true }
    }
}

#[cfg(test)]
mod tests;
