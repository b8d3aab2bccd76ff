use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::models::{DEFAULT_SECRET_PREFIX, ROBOT_NAME_ILLEGAL_CHARS};

/// Robot account behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RobotSettings {
    /// Prefix of the login name shown in issued credentials.
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// Prefix of generated secrets, to make them recognizable in logs and scanners.
    #[serde(default = "default_secret_prefix")]
    pub secret_prefix: String,

    /// Lifetime given to robots created with `expires_at = 0`.
    #[serde(default = "default_token_duration_minutes")]
    pub default_token_duration_minutes: u64,

    /// Largest page size a listing may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            secret_prefix: default_secret_prefix(),
            default_token_duration_minutes: default_token_duration_minutes(),
            max_page_size: default_max_page_size(),
        }
    }
}

impl RobotSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_token_duration_minutes == 0 {
            return Err(ConfigError::Validation(
                "robots.default_token_duration_minutes must be at least 1".into(),
            ));
        }
        if self.max_page_size == 0 {
            return Err(ConfigError::Validation(
                "robots.max_page_size must be at least 1".into(),
            ));
        }
        // A prefix ending in a legal name character would make login names ambiguous
        if let Some(last) = self.name_prefix.chars().last()
            && !ROBOT_NAME_ILLEGAL_CHARS.contains(&last)
        {
            return Err(ConfigError::Validation(format!(
                "robots.name_prefix must end with one of {:?}",
                ROBOT_NAME_ILLEGAL_CHARS
            )));
        }
        Ok(())
    }

    /// Default robot lifetime in seconds.
    pub fn default_token_duration_secs(&self) -> i64 {
        i64::try_from(self.default_token_duration_minutes)
            .unwrap_or(i64::MAX)
            .saturating_mul(60)
    }
}

fn default_name_prefix() -> String {
    "robot$".to_string()
}

fn default_secret_prefix() -> String {
    DEFAULT_SECRET_PREFIX.to_string()
}

fn default_token_duration_minutes() -> u64 {
    30 * 24 * 60 // 30 days
}

fn default_max_page_size() -> u64 {
    100
}
