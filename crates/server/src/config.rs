use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("could not parse config file {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: String,
    pub database: PathBuf,
    pub duplicate_index_cap: i64,
    pub completion: CompletionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1:8700".to_string(),
            database: PathBuf::from("kontera.db"),
            duplicate_index_cap: kontera_import::DEFAULT_INDEX_CAP,
            completion: CompletionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
        }
    }
}

impl Config {
    /// Read `kontera.toml` (or `$KONTERA_CONFIG`) if present, otherwise
    /// fall back to defaults. The API key can always be supplied through
    /// the environment so it stays out of the config file.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("KONTERA_CONFIG").unwrap_or_else(|_| "kontera.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text)
                .map_err(|source| ConfigError::Parse { path: path.clone(), source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        if let Ok(key) = std::env::var("KONTERA_OPENAI_API_KEY") {
            config.completion.api_key = Some(key);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            bind = "0.0.0.0:9000"

            [completion]
            model = "gpt-4.1"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.database, PathBuf::from("kontera.db"));
        assert_eq!(config.completion.model, "gpt-4.1");
        assert_eq!(config.completion.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bind, "127.0.0.1:8700");
        assert_eq!(config.duplicate_index_cap, kontera_import::DEFAULT_INDEX_CAP);
        assert!(config.completion.api_key.is_none());
    }
}
