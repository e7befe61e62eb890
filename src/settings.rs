use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "settings.toml";

const DEFAULT_API_URL: &str = "https://slack.com/api/";
const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 1000;
const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub slack: SlackSettings,
    #[serde(default)]
    pub mail: MailSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackSettings {
    #[serde(default = "default_api_url", rename = "api-url")]
    pub api_url: String,
    #[serde(
        default = "default_rate_limit_delay_ms",
        rename = "rate-limit-delay-ms"
    )]
    pub rate_limit_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default = "default_sendmail")]
    pub sendmail: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_rate_limit_delay_ms() -> u64 {
    DEFAULT_RATE_LIMIT_DELAY_MS
}

fn default_sendmail() -> String {
    DEFAULT_SENDMAIL.to_string()
}

impl Default for SlackSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
        }
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            sendmail: default_sendmail(),
        }
    }
}

impl SlackSettings {
    /// Minimum spacing between two consecutive Slack API calls
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }
}
