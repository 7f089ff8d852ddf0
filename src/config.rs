use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use deadline_core::constants::{DEFAULT_HORIZON_DAYS, DEFAULT_PACING};
use deadline_provider_google::GoogleCredentials;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory holding termin.txt and friends
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Deadlines go to the first calendar whose name starts with this
    #[serde(default = "default_calendar_prefix")]
    pub calendar_prefix: String,

    /// How many days ahead open deadlines are considered
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,

    /// Pause between two calendar changes, in milliseconds
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// OAuth client for Google Calendar
    #[serde(default)]
    pub google: Option<GoogleConfig>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
}

fn default_data_dir() -> String {
    "~/DeadlineReminder".to_string()
}

fn default_calendar_prefix() -> String {
    "Deadline".to_string()
}

fn default_horizon_days() -> i64 {
    DEFAULT_HORIZON_DAYS
}

fn default_pacing_ms() -> u64 {
    DEFAULT_PACING.as_millis() as u64
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            calendar_prefix: default_calendar_prefix(),
            horizon_days: default_horizon_days(),
            pacing_ms: default_pacing_ms(),
            google: None,
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// End of the window of open deadlines, `days` (or the configured horizon) after `now`.
    pub fn horizon(&self, now: NaiveDateTime, days: Option<i64>) -> NaiveDateTime {
        now + Duration::days(days.unwrap_or(self.horizon_days))
    }

    pub fn pacing(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pacing_ms)
    }

    pub fn google_credentials(&self) -> Result<GoogleCredentials> {
        let google = self.google.as_ref().with_context(|| {
            format!(
                "Google Calendar is not configured.\n\n\
                Add your OAuth client to {}:\n\n\
                [google]\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"",
                config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "config.toml".to_string())
            )
        })?;

        Ok(GoogleCredentials {
            client_id: google.client_id.clone(),
            client_secret: google.client_secret.clone(),
        })
    }
}

/// Get the config directory path (~/.config/deadline-reminder)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("deadline-reminder");
    Ok(config_dir)
}

/// Get the config file path (~/.config/deadline-reminder/config.toml)
pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Get the tokens file path (~/.config/deadline-reminder/tokens.json)
pub fn tokens_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("tokens.json"))
}

/// Load config from ~/.config/deadline-reminder/config.toml, defaults if it doesn't exist
pub fn load_config() -> Result<Config> {
    let path = config_path()?;

    if !path.exists() {
        return Ok(Config::default());
    }

    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;

    parse_config(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str(contents)?)
}

/// Expand ~ in paths to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.calendar_prefix, "Deadline");
        assert_eq!(config.horizon_days, 400);
        assert_eq!(config.pacing_ms, 1000);
        assert!(config.google.is_none());
        assert!(config.google_credentials().is_err());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
            data_dir = "/tmp/deadlines"
            calendar_prefix = "Termine"
            horizon_days = 30
            pacing_ms = 0

            [google]
            client_id = "id"
            client_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir(), PathBuf::from("/tmp/deadlines"));
        assert_eq!(config.calendar_prefix, "Termine");
        assert!(config.pacing().is_zero());
        assert_eq!(config.google_credentials().unwrap().client_id, "id");
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/DeadlineReminder"), home.join("DeadlineReminder"));
        }
    }
}
