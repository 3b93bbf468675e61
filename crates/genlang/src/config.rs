//! Engine configuration, loadable from JSON.

use std::fs;
use std::path::{Path, PathBuf};

use genlang_eval::ExecutionBudget;
use genlang_parser::ParserConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parser limits plus the execution budget applied to every run.
///
/// Missing fields take their defaults:
///
/// ```
/// use genlang::GenLangConfig;
///
/// let json = r#"{ "budget": { "max_instructions": 5000 } }"#;
/// let config = GenLangConfig::from_json_str(json).unwrap();
/// assert_eq!(config.budget.max_instructions, 5000);
/// assert_eq!(config.parser.max_nesting, 64);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenLangConfig {
    pub parser: ParserConfig,
    pub budget: ExecutionBudget,
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenLangConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> String {
        // Plain integers and nested structs only; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(GenLangConfig::from_json_str("{}").unwrap(), GenLangConfig::default());
    }

    #[test]
    fn test_nested_fields() {
        let config = GenLangConfig::from_json_str(
            r#"{
                "parser": { "max_errors": 3 },
                "budget": { "max_duration_ms": 1500, "max_call_depth": 32 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.parser.max_errors, 3);
        assert_eq!(config.parser.max_nesting, 64);
        assert_eq!(config.budget.max_duration, Duration::from_millis(1500));
        assert_eq!(config.budget.max_call_depth, 32);
        assert_eq!(config.budget.max_instructions, 1_000_000);
    }

    #[test]
    fn test_json_round_trip() {
        let config = GenLangConfig::default();
        assert_eq!(GenLangConfig::from_json_str(&config.to_json_string()).unwrap(), config);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            GenLangConfig::from_json_str(r#"{ "budget": { "max_instructions": "lots" } }"#),
            Err(ConfigError::Json(_))
        ));
        let err = GenLangConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
