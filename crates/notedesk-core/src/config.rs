//! Application configuration management.
//!
//! Configuration holds the server base URL, the default page size, the
//! request timeout and the token refresh policy. It is stored at
//! `~/.config/notedesk/config.json` and may be overridden from the
//! environment (`NOTEDESK_BASE_URL`, `NOTEDESK_REFRESH_POLICY`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "notedesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Server used when nothing is configured (the notes API's dev port)
const DEFAULT_BASE_URL: &str = "http://localhost:3500";

const DEFAULT_ITEMS_PER_PAGE: u32 = 10;

/// HTTP request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "NOTEDESK_BASE_URL";
pub const ENV_REFRESH_POLICY: &str = "NOTEDESK_REFRESH_POLICY";

/// How concurrent requests that hit 401 share token refreshes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Every 401 triggers its own refresh call
    #[default]
    Independent,
    /// Refreshes are serialized; a request whose token was already replaced
    /// by another refresh retries with the new token instead of refreshing
    SingleFlight,
}

impl FromStr for RefreshPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "independent" => Ok(RefreshPolicy::Independent),
            "single-flight" | "single_flight" | "singleflight" => Ok(RefreshPolicy::SingleFlight),
            other => Err(anyhow::anyhow!("Unknown refresh policy: {}", other)),
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::Independent => write!(f, "independent"),
            RefreshPolicy::SingleFlight => write!(f, "single-flight"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub items_per_page: u32,
    pub request_timeout_secs: u64,
    pub refresh_policy: RefreshPolicy,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            refresh_policy: RefreshPolicy::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a specific file, falling back to defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(policy) = lookup(ENV_REFRESH_POLICY) {
            self.refresh_policy = policy
                .parse()
                .with_context(|| format!("Invalid {}", ENV_REFRESH_POLICY))?;
        }
        Ok(())
    }

    /// Root of the REST API, `<base_url>/api`
    pub fn api_base_url(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url_trims_slashes() {
        let mut config = Config::default();
        assert_eq!(config.api_base_url(), "http://localhost:3500/api");

        config.base_url = "https://notes.example.com/".to_string();
        assert_eq!(config.api_base_url(), "https://notes.example.com/api");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"base_url": "https://x.test"}"#).unwrap();
        assert_eq!(config.base_url, "https://x.test");
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.refresh_policy, RefreshPolicy::Independent);
    }

    #[test]
    fn test_refresh_policy_parse() {
        assert_eq!("single-flight".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::SingleFlight);
        assert_eq!("Independent".parse::<RefreshPolicy>().unwrap(), RefreshPolicy::Independent);
        assert!("sometimes".parse::<RefreshPolicy>().is_err());

        let json = serde_json::to_string(&RefreshPolicy::SingleFlight).unwrap();
        assert_eq!(json, r#""single-flight""#);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|key| match key {
                ENV_BASE_URL => Some(" https://api.test ".to_string()),
                ENV_REFRESH_POLICY => Some("single-flight".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.base_url, "https://api.test");
        assert_eq!(config.refresh_policy, RefreshPolicy::SingleFlight);

        let err = config.apply_overrides(|key| {
            (key == ENV_REFRESH_POLICY).then(|| "bogus".to_string())
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip_via_file() {
        let dir = std::env::temp_dir().join(format!("notedesk-config-test-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE);

        assert_eq!(Config::load_from(&path).unwrap().base_url, DEFAULT_BASE_URL);

        let config = Config {
            last_username: Some("dave".to_string()),
            items_per_page: 25,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.last_username.as_deref(), Some("dave"));
        assert_eq!(loaded.items_per_page, 25);

        let _ = std::fs::remove_dir_all(dir);
    }
}
