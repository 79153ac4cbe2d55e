use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Runtime knobs of the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Deepest allowed chain of nested sub-process invocations.
    pub max_subprocess_depth: usize,
    /// Re-resolve action accessor bindings on every run instead of caching them.
    pub refresh_bindings_each_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_subprocess_depth: 16,
            refresh_bindings_each_run: false,
        }
    }
}

impl EngineConfig {
    /// Parses a config document. The top level must be a JSON object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::Parse("config must be a JSON object".to_string()));
        }
        serde_json::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = EngineConfig::from_json(r#"{ "maxSubprocessDepth": 3 }"#).unwrap();
        assert_eq!(config.max_subprocess_depth, 3);
        assert!(!config.refresh_bindings_each_run);
    }

    #[test]
    fn non_object_documents_are_rejected() {
        assert!(EngineConfig::from_json("[1]").is_err());
        assert!(EngineConfig::from_json("3").is_err());
        assert!(EngineConfig::from_json("{ \"maxSubprocessDepth\": \"deep\" }").is_err());
    }
}
