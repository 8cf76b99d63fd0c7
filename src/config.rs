// =============================================================================
// Application Configuration: JSON file with serde defaults and env overrides
// =============================================================================
//
// Every field carries `#[serde(default)]` so that a partial (or empty) JSON
// file still loads. A missing file is not fatal: `main` falls back to the
// defaults with a warning.
//
// Environment overrides (applied after the file):
//   QUANT_BIND_ADDR      listen address
//   QUANT_PROVIDER_URL   base URL of the quote service
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::macd::MacdParams;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_lookback_days() -> u64 {
    365
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("quant-dashboard/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_requests_per_minute() -> u32 {
    60
}

fn default_window() -> usize {
    20
}

fn default_num_std() -> f64 {
    2.0
}

fn default_rsi_period() -> usize {
    14
}

// =============================================================================
// ProviderConfig
// =============================================================================

/// Settings for the upstream market data service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Outbound request cap; requests beyond it fail with `RateLimited`.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

// =============================================================================
// IndicatorDefaults
// =============================================================================

/// Parameters used when a request omits them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorDefaults {
    #[serde(default = "default_window")]
    pub sma_window: usize,

    #[serde(default = "default_window")]
    pub bbands_window: usize,

    #[serde(default = "default_num_std")]
    pub bbands_num_std: f64,

    #[serde(default)]
    pub macd: MacdParams,

    #[serde(default = "default_rsi_period")]
    pub rsi_window: usize,
}

impl Default for IndicatorDefaults {
    fn default() -> Self {
        Self {
            sma_window: default_window(),
            bbands_window: default_window(),
            bbands_num_std: default_num_std(),
            macd: MacdParams::default(),
            rsi_window: default_rsi_period(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Calendar days of history shown when a request gives no start date.
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u64,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub defaults: IndicatorDefaults,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_lookback_days: default_lookback_days(),
            provider: ProviderConfig::default(),
            defaults: IndicatorDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            bind_addr = %config.bind_addr,
            provider = %config.provider.base_url,
            "config loaded"
        );

        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("QUANT_BIND_ADDR").filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(url) = lookup("QUANT_PROVIDER_URL").filter(|s| !s.trim().is_empty()) {
            self.provider.base_url = url.trim().to_string();
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}
