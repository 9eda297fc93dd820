use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_HUB_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_PATH: &str = "/hub/api/user";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STORE_PATH: &str = "interlog-store.json";

/// What the host hands us on load and on every settings change.
///
/// Missing fields fall back to "nothing tracked". Whether settings exist at
/// all is expressed by the caller as `Option<TrackingSettings>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingSettings {
    pub included_events: Vec<String>,
    pub enable_tracking: bool,
}

impl TrackingSettings {
    pub fn new<I, S>(included_events: I, enable_tracking: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            included_events: included_events.into_iter().map(Into::into).collect(),
            enable_tracking,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Where identity comes from and where the log goes.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub hub_url: String,
    pub user_path: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
    pub store_path: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            hub_url: DEFAULT_HUB_URL.to_string(),
            user_path: DEFAULT_USER_PATH.to_string(),
            api_token: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
        }
    }
}

impl CollectorConfig {
    /// Defaults overridden by `INTERLOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("INTERLOG_HUB_URL") {
            config.hub_url = url;
        }
        if let Some(path) = lookup("INTERLOG_USER_PATH") {
            config.user_path = path;
        }
        if let Some(token) = lookup("INTERLOG_API_TOKEN").filter(|t| !t.is_empty()) {
            config.api_token = Some(token);
        }
        if let Some(raw) = lookup("INTERLOG_TIMEOUT_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: "INTERLOG_TIMEOUT_MS",
                value: raw.clone(),
            })?;
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("INTERLOG_STORE") {
            config.store_path = PathBuf::from(path);
        }

        Ok(config)
    }

    /// Full identity endpoint URL.
    pub fn user_endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.hub_url.trim_end_matches('/'),
            self.user_path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_settings_missing_fields_default_to_disabled() {
        let settings = TrackingSettings::from_json("{}").unwrap();
        assert!(!settings.enable_tracking);
        assert!(settings.included_events.is_empty());

        let json = r#"{"includedEvents":["click","keydown"],"enableTracking":true}"#;
        let settings = TrackingSettings::from_json(json).unwrap();
        assert_eq!(settings, TrackingSettings::new(["click", "keydown"], true));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INTERLOG_HUB_URL", "http://hub.local/"),
            ("INTERLOG_TIMEOUT_MS", "250"),
            ("INTERLOG_API_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let config = CollectorConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.user_endpoint(), "http://hub.local/hub/api/user");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let err = CollectorConfig::from_lookup(|k| {
            (k == "INTERLOG_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "INTERLOG_TIMEOUT_MS", .. }));
    }
}
