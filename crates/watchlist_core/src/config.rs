//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold tunables for code generation, invite expiry and user search.
//! - Load them from TOML with per-field defaults.
//!
//! # Invariants
//! - A validated config always yields at least one code attempt and a code
//!   space of at least 8 random bytes.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const DEFAULT_PARTNER_LIST_NAME: &str = "Our Watchlist";
const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const MIN_CODE_BYTES: usize = 8;
const MAX_CODE_BYTES: usize = 64;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Top-level configuration for the watchlist core.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub invite: InviteConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InviteConfig {
    /// Random bytes per code before URL-safe encoding.
    pub code_bytes: usize,
    /// Inserts attempted before a code collision is reported as a store error.
    pub max_code_attempts: u32,
    /// Time-to-live for new invites. `None` means invites never expire.
    pub default_ttl_ms: Option<i64>,
    /// Name given to partner lists when the inviter supplies none.
    pub default_partner_list_name: String,
    /// Longest accepted partner list name, in characters.
    pub max_list_name_chars: usize,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            code_bytes: 16,
            max_code_attempts: 5,
            default_ttl_ms: Some(7 * DAY_MS),
            default_partner_list_name: DEFAULT_PARTNER_LIST_NAME.to_string(),
            max_list_name_chars: 100,
        }
    }
}

impl InviteConfig {
    /// Rejects code spaces too small to be unguessable and other unusable
    /// invite settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CODE_BYTES..=MAX_CODE_BYTES).contains(&self.code_bytes) {
            return Err(ConfigError::Invalid(format!(
                "invite.code_bytes must be within {MIN_CODE_BYTES}..={MAX_CODE_BYTES}, got {}",
                self.code_bytes
            )));
        }
        if self.max_code_attempts == 0 {
            return Err(ConfigError::Invalid(
                "invite.max_code_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(ttl) = self.default_ttl_ms {
            if ttl <= 0 {
                return Err(ConfigError::Invalid(format!(
                    "invite.default_ttl_ms must be positive, got {ttl}"
                )));
            }
        }
        if self.default_partner_list_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "invite.default_partner_list_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Queries shorter than this return no results without a store read.
    pub min_query_chars: usize,
    pub max_results: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_chars: 2,
            max_results: 20,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a TOML document. Missing fields take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.invite.validate()?;
        if self.search.min_query_chars == 0 {
            return Err(ConfigError::Invalid(
                "search.min_query_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
