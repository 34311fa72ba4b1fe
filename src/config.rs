//! Runtime configuration.
//!
//! Every field has a default; a JSON file or `JIT_FUNDING_*` environment
//! variables override them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::REVERSAL_TYPE_CODE;

const ENV_PREFIX: &str = "JIT_FUNDING_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {var}: '{value}'")]
    InvalidVar { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Rolling window for providers whose credit limit row carries none.
    #[serde(default = "default_auth_expire_days")]
    pub auth_expire_days: u32,

    /// Transaction type code the provider uses for reversals.
    #[serde(default = "default_reversal_type_code")]
    pub reversal_type_code: String,

    /// Save decision audits on a detached task instead of inline.
    #[serde(default = "default_audit_in_background")]
    pub audit_in_background: bool,

    /// Buffer between the CSV reader and the ledger in the binary.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Default `tracing` directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_directive")]
    pub log_directive: String,
}

fn default_auth_expire_days() -> u32 {
    30
}

fn default_reversal_type_code() -> String {
    REVERSAL_TYPE_CODE.to_string()
}

fn default_audit_in_background() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    16
}

fn default_log_directive() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_expire_days: default_auth_expire_days(),
            reversal_type_code: default_reversal_type_code(),
            audit_in_background: default_audit_in_background(),
            channel_capacity: default_channel_capacity(),
            log_directive: default_log_directive(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_vars(std::env::vars())
    }

    /// Apply `JIT_FUNDING_*` overrides from the given variables.
    pub fn with_vars(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        for (var, value) in vars {
            let Some(key) = var.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let invalid = || ConfigError::InvalidVar {
                var: var.clone(),
                value: value.clone(),
            };
            match key {
                "AUTH_EXPIRE_DAYS" => self.auth_expire_days = value.parse().map_err(|_| invalid())?,
                "REVERSAL_TYPE_CODE" => self.reversal_type_code = value.clone(),
                "AUDIT_IN_BACKGROUND" => {
                    self.audit_in_background = value.parse().map_err(|_| invalid())?
                }
                "CHANNEL_CAPACITY" => match value.parse() {
                    Ok(capacity) if capacity > 0 => self.channel_capacity = capacity,
                    _ => return Err(invalid()),
                },
                "LOG" => self.log_directive = value.clone(),
                _ => {}
            }
        }
        Ok(self)
    }
}
