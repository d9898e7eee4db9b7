use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::client::Language;

const DEFAULT_CONFIG_FILE: &str = "jardin.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub business: BusinessConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BusinessConfig {
    pub owner_name: String,
    pub proposal_validity_days: u32,
    pub default_language: Language,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://jardin.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            business: BusinessConfig {
                owner_name: "Jaime".to_string(),
                proposal_validity_days: 30,
                default_language: Language::English,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    database: Option<FileDatabase>,
    business: Option<FileBusiness>,
    logging: Option<FileLogging>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileBusiness {
    owner_name: Option<String>,
    proposal_validity_days: Option<u32>,
    default_language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<String>,
}

impl AppConfig {
    /// Layered load: defaults, then the TOML file, then `JARDIN_*`
    /// environment variables, then programmatic overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(file) = read_file(&options)? {
            config.apply_file(file)?;
        }
        config.apply_env()?;
        if let Some(url) = options.overrides.database_url {
            config.database.url = url;
        }
        if let Some(level) = options.overrides.log_level {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(database) = file.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(business) = file.business {
            if let Some(owner_name) = business.owner_name {
                self.business.owner_name = owner_name;
            }
            if let Some(days) = business.proposal_validity_days {
                self.business.proposal_validity_days = days;
            }
            if let Some(language) = business.default_language {
                self.business.default_language = Language::parse_lenient(&language);
            }
        }
        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format.parse()?;
            }
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var("JARDIN_DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(value) = env::var("JARDIN_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("JARDIN_DB_MAX_CONNECTIONS", &value)?;
        }
        if let Ok(value) = env::var("JARDIN_PROPOSAL_VALIDITY_DAYS") {
            self.business.proposal_validity_days =
                parse_env("JARDIN_PROPOSAL_VALIDITY_DAYS", &value)?;
        }
        if let Ok(owner) = env::var("JARDIN_OWNER_NAME") {
            self.business.owner_name = owner;
        }
        if let Ok(level) = env::var("JARDIN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("JARDIN_LOG_FORMAT") {
            self.logging.format = format.parse()?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database max_connections must be at least 1".to_string(),
            ));
        }
        if self.business.proposal_validity_days == 0 {
            return Err(ConfigError::Validation(
                "proposal_validity_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn read_file(options: &LoadOptions) -> Result<Option<FileConfig>, ConfigError> {
    let path = options
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    if !path.exists() {
        if options.require_file {
            return Err(ConfigError::MissingConfigFile(path));
        }
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)
        .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
    let parsed =
        toml::from_str(&raw).map_err(|source| ConfigError::ParseFile { path, source })?;
    Ok(Some(parsed))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::load(LoadOptions::default()).expect("load defaults");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.business.proposal_validity_days, 30);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn overrides_beat_defaults() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                log_level: Some("debug".to_string()),
            },
            ..LoadOptions::default()
        })
        .expect("load with overrides");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn file_env_and_override_layers_stack_in_order() {
        let path =
            std::env::temp_dir().join(format!("jardin-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[database]\nurl = \"sqlite://from-file.db\"\n\n[business]\nowner_name = \"From File\"\n",
        )
        .expect("write config file");

        let from_file = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            ..LoadOptions::default()
        })
        .expect("load file layer");
        assert_eq!(from_file.database.url, "sqlite://from-file.db");
        assert_eq!(from_file.business.owner_name, "From File");

        std::env::set_var("JARDIN_OWNER_NAME", "From Env");
        let layered = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        std::env::remove_var("JARDIN_OWNER_NAME");
        std::fs::remove_file(&path).ok();

        let layered = layered.expect("load layered");
        assert_eq!(layered.business.owner_name, "From Env");
        assert_eq!(layered.database.url, "sqlite::memory:");
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn log_format_parses_known_values() {
        assert_eq!("json".parse::<LogFormat>().expect("parse"), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
