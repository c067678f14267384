//! Configuration management for taskbrief.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Optional. Without it the model runs offline and
//!   corrections/briefings echo their input.
//! - `OPENROUTER_API_URL` - Optional. Override the chat-completions endpoint.
//! - `DEFAULT_MODEL` - Optional. Defaults to `openai/gpt-4o-mini`.
//! - `TASKBRIEF_STORE` - Optional. `memory`, `file` or `sqlite`. Defaults to `sqlite`.
//! - `TASKBRIEF_DATA_DIR` - Optional. Directory for store files. Defaults to `./.taskbrief`.
//! - `TASKBRIEF_USER` - Optional. Names the store file. Defaults to `default`.

use crate::store::TodoStoreType;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key; `None` means offline mode
    pub api_key: Option<String>,

    /// Endpoint override for OpenAI-compatible providers
    pub api_url: Option<String>,

    /// Model identifier (OpenRouter format)
    pub default_model: String,

    pub store_type: TodoStoreType,

    /// Directory holding store files
    pub data_dir: PathBuf,

    pub user_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_model = match lookup("DEFAULT_MODEL") {
            Some(model) if model.trim().is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "DEFAULT_MODEL".to_string(),
                    "must not be empty".to_string(),
                ))
            }
            Some(model) => model.trim().to_string(),
            None => DEFAULT_MODEL.to_string(),
        };

        let store_type = match non_empty("TASKBRIEF_STORE") {
            Some(value) => TodoStoreType::parse(&value).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "TASKBRIEF_STORE".to_string(),
                    format!("unknown store type '{}'", value),
                )
            })?,
            None => TodoStoreType::default(),
        };

        let data_dir = non_empty("TASKBRIEF_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".taskbrief"));

        Ok(Self {
            api_key: non_empty("OPENROUTER_API_KEY"),
            api_url: non_empty("OPENROUTER_API_URL"),
            default_model,
            store_type,
            data_dir,
            user_id: non_empty("TASKBRIEF_USER").unwrap_or_else(|| "default".to_string()),
        })
    }

    /// Whether requests go to a real model.
    pub fn is_online(&self) -> bool {
        self.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_are_offline_sqlite() {
        let config = load(&[]).expect("config");
        assert!(!config.is_online());
        assert_eq!(config.default_model, DEFAULT_MODEL);
        assert_eq!(config.store_type, TodoStoreType::Sqlite);
        assert_eq!(config.data_dir, PathBuf::from(".taskbrief"));
        assert_eq!(config.user_id, "default");
    }

    #[test]
    fn reads_overrides() {
        let config = load(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("DEFAULT_MODEL", "anthropic/claude-3.5-haiku"),
            ("TASKBRIEF_STORE", "json"),
            ("TASKBRIEF_DATA_DIR", "/tmp/tb"),
            ("TASKBRIEF_USER", "sam"),
        ])
        .expect("config");
        assert!(config.is_online());
        assert_eq!(config.default_model, "anthropic/claude-3.5-haiku");
        assert_eq!(config.store_type, TodoStoreType::File);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tb"));
        assert_eq!(config.user_id, "sam");
    }

    #[test]
    fn blank_api_key_means_offline() {
        let config = load(&[("OPENROUTER_API_KEY", "  ")]).expect("config");
        assert!(!config.is_online());
    }

    #[test]
    fn rejects_unknown_store_and_empty_model() {
        assert!(matches!(
            load(&[("TASKBRIEF_STORE", "postgres")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "TASKBRIEF_STORE"
        ));
        assert!(matches!(
            load(&[("DEFAULT_MODEL", "")]),
            Err(ConfigError::InvalidValue(key, _)) if key == "DEFAULT_MODEL"
        ));
    }
}
