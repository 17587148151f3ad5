use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Default maximum number of history entries.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Default time within which two adjacent operations may merge.
pub const DEFAULT_MERGE_WINDOW: Duration = Duration::from_secs(1);

/// Error returned when a history configuration cannot be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The TOML text was malformed or had wrongly typed fields.
    #[error("failed to parse history config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tuning for [`OperationStack`](super::OperationStack).
///
/// Loadable from TOML; missing keys keep their defaults:
///
/// ```toml
/// max_depth = 250
/// merge_window_ms = 500   # 0 disables the time limit
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OperationStackConfig {
    /// Maximum number of history entries. The oldest entry is dropped when
    /// a push exceeds it. Values below 1 are treated as 1.
    pub max_depth: usize,
    /// Maximum creation-time distance for two operations to merge.
    /// `None` merges regardless of timing.
    #[serde(rename = "merge_window_ms", deserialize_with = "deserialize_merge_window")]
    pub merge_window: Option<Duration>,
}

impl OperationStackConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Returns this config with a different depth limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns this config with a different merge window.
    #[must_use]
    pub fn with_merge_window(mut self, merge_window: Option<Duration>) -> Self {
        self.merge_window = merge_window;
        self
    }

    pub(crate) fn effective_max_depth(&self) -> usize {
        self.max_depth.max(1)
    }
}

impl Default for OperationStackConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            merge_window: Some(DEFAULT_MERGE_WINDOW),
        }
    }
}

fn deserialize_merge_window<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = u64::deserialize(deserializer)?;
    Ok((millis > 0).then(|| Duration::from_millis(millis)))
}
