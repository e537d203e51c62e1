use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use jiff::SignedDuration;
use serde::Deserialize;
use thiserror::Error;

use crate::mrf::{MrfSettings, NewUserSettings};

/// Largest age that still fits a `SignedDuration`.
const MAX_AGE_HOURS: i64 = i64::MAX / 3600;

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) mrf: MrfConfig,
    pub(crate) server: ServerConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct MrfConfig {
    /// Substrings that get a note rejected when found in its content.
    pub(crate) keywords: Vec<String>,
    pub(crate) case_insensitive_keywords: bool,
    /// Mention count at which a note is considered a hellthread.
    pub(crate) hellthread_threshold: i64,
    pub(crate) new_user: NewUserConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct NewUserConfig {
    pub(crate) max_age_hours: i64,
    pub(crate) min_followers: i64,
    /// Handle length used by known spambots, 0 turns the heuristic off.
    pub(crate) suspicious_handle_length: i64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) http_port: u16,
    pub(crate) data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConfigError {
    #[error("mrf.hellthread_threshold must be a positive integer, got {0}")]
    HellthreadThreshold(i64),
    #[error("mrf.new_user.max_age_hours must be a positive integer, got {0}")]
    MaxAge(i64),
    #[error("mrf.new_user.min_followers must not be negative, got {0}")]
    MinFollowers(i64),
    #[error("mrf.new_user.suspicious_handle_length must not be negative, got {0}")]
    HandleLength(i64),
    #[error("mrf.keywords must not contain an empty string")]
    EmptyKeyword,
}

impl Default for MrfConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "https://discord.gg/ctkpaarr".to_string(),
                "@ap12@mastodon-japan.net".to_string(),
                "ctkpaarr".to_string(),
            ],
            case_insensitive_keywords: false,
            hellthread_threshold: 15,
            new_user: NewUserConfig::default(),
        }
    }
}

impl Default for NewUserConfig {
    fn default() -> Self {
        Self {
            max_age_hours: 72,
            min_followers: 3,
            suspicious_handle_length: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Read the TOML file at `path`, or fall back to defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("unable to parse config file {}", path.display()))
    }
}

impl MrfConfig {
    /// Check the configured values and turn them into policy settings.
    pub(crate) fn validate(&self) -> Result<MrfSettings, ConfigError> {
        if self.keywords.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyKeyword);
        }
        let hellthread_threshold = usize::try_from(self.hellthread_threshold)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(ConfigError::HellthreadThreshold(self.hellthread_threshold))?;
        Ok(MrfSettings {
            keywords: self.keywords.clone(),
            case_insensitive_keywords: self.case_insensitive_keywords,
            hellthread_threshold,
            new_user: self.new_user.validate()?,
        })
    }
}

impl NewUserConfig {
    fn validate(&self) -> Result<NewUserSettings, ConfigError> {
        if self.max_age_hours <= 0 || self.max_age_hours > MAX_AGE_HOURS {
            return Err(ConfigError::MaxAge(self.max_age_hours));
        }
        let min_followers = u64::try_from(self.min_followers)
            .map_err(|_| ConfigError::MinFollowers(self.min_followers))?;
        let suspicious_handle_length = usize::try_from(self.suspicious_handle_length)
            .map_err(|_| ConfigError::HandleLength(self.suspicious_handle_length))?;
        Ok(NewUserSettings {
            max_age: SignedDuration::from_hours(self.max_age_hours),
            min_followers,
            suspicious_handle_length: (suspicious_handle_length > 0)
                .then_some(suspicious_handle_length),
        })
    }
}
