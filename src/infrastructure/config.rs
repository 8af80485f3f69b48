//! Application settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `sacamantecas.toml`, then `SACAMANTECAS_*` environment variables.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::address_resolver::DEFAULT_FALLBACK_CHARSET;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_REPOSITORY: &str = "https://github.com/DervishD/sacamantecas";

const SETTINGS_FILE_NAME: &str = "sacamantecas.toml";
const PROFILES_FILE_NAME: &str = "sacamantecas.ini";
const ENV_PREFIX: &str = "SACAMANTECAS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Settings validation failed: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// INI file holding the catalogue profiles
    pub profiles_path: PathBuf,
    /// Charset used when neither the transport nor the page declares one
    pub fallback_charset: String,
    pub user_agent: String,
    pub request_timeout_seconds: u64,
    /// Directory receiving the log and debug files
    pub log_dir: PathBuf,
    /// `EnvFilter` directives for the debug file
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let root = application_dir();
        Self {
            profiles_path: root.join(PROFILES_FILE_NAME),
            fallback_charset: DEFAULT_FALLBACK_CHARSET.to_string(),
            user_agent: format!(
                "{APP_NAME}/{APP_VERSION} +{APP_REPOSITORY} ({})",
                std::env::consts::OS
            ),
            request_timeout_seconds: 30,
            log_dir: root,
            log_level: "debug".to_string(),
        }
    }
}

impl Settings {
    /// Load settings; `explicit` must exist when given, the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (application_dir().join(SETTINGS_FILE_NAME), false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(required),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fallback_charset.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "fallback_charset cannot be empty".to_string(),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "user_agent cannot be empty".to_string(),
            });
        }
        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "request_timeout_seconds must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Directory of the running executable, or the working directory as a fallback
pub fn application_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
}
