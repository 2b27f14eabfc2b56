use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides the backend base URL
pub const API_URL_ENV: &str = "ESIMSTATUS_API_URL";

/// Loopback backend used for development builds
pub const DEV_API_URL: &str = "http://localhost:8000";

/// Hosted backend used for release builds
pub const PROD_API_URL: &str = "https://api.esimstatus.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend base URL (falls back to the build default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Client-side limit for the eSIM status check
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,

    /// Client-side limit for every other call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_check_timeout() -> u64 {
    240
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            check_timeout_secs: default_check_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenewalMode {
    /// Fixed base price, currency choice only
    #[default]
    Simple,
    /// Pick one of the backend's packages
    Packages,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewalConfig {
    #[serde(default)]
    pub mode: RenewalMode,

    /// Display price in the simple flow; the backend decides the real charge
    #[serde(default = "default_base_price")]
    pub base_price: f64,

    #[serde(default = "default_base_currency")]
    pub base_currency: String,

    #[serde(default = "default_renewal_days")]
    pub renewal_days: u32,
}

fn default_base_price() -> f64 {
    10.0
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_renewal_days() -> u32 {
    7
}

impl Default for RenewalConfig {
    fn default() -> Self {
        Self {
            mode: RenewalMode::default(),
            base_price: default_base_price(),
            base_currency: default_base_currency(),
            renewal_days: default_renewal_days(),
        }
    }
}

/// Optional `#RRGGBB` overrides for the built-in palette
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ThemeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub danger: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub renewal: RenewalConfig,

    #[serde(default)]
    pub theme: ThemeConfig,
}

impl AppConfig {
    /// Get the config file path
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("esimstatus");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        // Keep the user's broken file; run on defaults
                        tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                        return Ok(AppConfig::default());
                    }
                },
                Err(e) => tracing::warn!("Failed to read config: {}", e),
            }
        }

        let config = AppConfig::default();
        if let Err(e) = config.save() {
            tracing::warn!("Could not write default config: {}", e);
        }
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        let mut clean_config = self.clone();
        if clean_config.api.base_url.as_ref().is_some_and(|u| u.trim().is_empty()) {
            clean_config.api.base_url = None;
        }

        let content = toml::to_string_pretty(&clean_config)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Pick the backend URL: CLI flag, then environment, then file, then build default
    pub fn resolve_base_url(&self, cli: Option<&str>, env: Option<&str>) -> String {
        let chosen = [cli, env, self.api.base_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or(default_base_url());

        chosen.trim_end_matches('/').to_string()
    }
}

/// Loopback while developing, the hosted API otherwise
pub fn default_base_url() -> &'static str {
    if cfg!(debug_assertions) {
        DEV_API_URL
    } else {
        PROD_API_URL
    }
}
