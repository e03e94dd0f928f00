//! # Engine Configuration
//!
//! Configuration for the session engine and its background tasks.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     CARTA_CATALOG_TIMEOUT_MS=500                                       │
//! │     CARTA_REAPER_ENABLED=true                                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/carta/carta.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.carta.carta/carta.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     EUR, 2 s catalog timeout, reaper off                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # carta.toml
//! [engine]
//! default_currency = "EUR"
//! catalog_timeout_ms = 2000
//!
//! [limits]
//! max_lines = 100
//! max_line_quantity = 999
//! max_coupon_codes = 10
//! max_coupon_length = 64
//!
//! [reaper]
//! enabled = true
//! idle_ttl_secs = 1800
//! sweep_interval_secs = 60
//! ```

use std::path::PathBuf;
use std::time::Duration;

use carta_core::cart::CartLimits;
use carta_core::types::{CurrencyCode, DEFAULT_CURRENCY};
use carta_core::validation::validate_currency;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Engine Settings
// =============================================================================

/// Settings for the recalculation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Currency of sessions created without an explicit one.
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Upper bound on one promotion catalog call (milliseconds).
    /// A slower catalog counts as unavailable.
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_ms: u64,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_catalog_timeout() -> u64 {
    2000
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            default_currency: default_currency(),
            catalog_timeout_ms: default_catalog_timeout(),
        }
    }
}

impl EngineSettings {
    /// Catalog timeout as a [`Duration`].
    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.catalog_timeout_ms)
    }

    /// Default currency in canonical form.
    pub fn currency(&self) -> CurrencyCode {
        CurrencyCode::new(&self.default_currency)
    }
}

// =============================================================================
// Reaper Settings
// =============================================================================

/// Idle-session eviction.
///
/// ## Timing
/// ```text
///   updated_at                       now − idle_ttl
///       │                                  │
///  ─────┼──────────────────────────────────┼───────────────► time
///       │◄──── session is evictable ──────►│
///
///   The reaper wakes every sweep_interval and evicts every
///   session whose updated_at is older than now − idle_ttl.
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaperSettings {
    /// Start the reaper with the engine. Off by default.
    #[serde(default)]
    pub enabled: bool,

    /// Idle time after which a session is evicted (seconds).
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    /// Interval between sweeps (seconds).
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_idle_ttl() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ReaperSettings {
    fn default() -> Self {
        ReaperSettings {
            enabled: false,
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl ReaperSettings {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recalculation pipeline settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Cart size limits.
    #[serde(default)]
    pub limits: CartLimits,

    /// Idle-session reaper.
    #[serde(default)]
    pub reaper: ReaperSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (carta.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        validate_currency(&self.engine.default_currency)
            .map_err(|e| ConfigError::Invalid(format!("engine.default_currency: {}", e)))?;

        if self.engine.catalog_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "engine.catalog_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.limits.max_lines == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_lines must be greater than 0".into(),
            ));
        }

        if self.limits.max_line_quantity <= 0 {
            return Err(ConfigError::Invalid(
                "limits.max_line_quantity must be greater than 0".into(),
            ));
        }

        if self.limits.max_coupon_length == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_coupon_length must be greater than 0".into(),
            ));
        }

        if self.reaper.enabled {
            if self.reaper.idle_ttl_secs == 0 {
                return Err(ConfigError::Invalid(
                    "reaper.idle_ttl_secs must be greater than 0".into(),
                ));
            }
            if self.reaper.sweep_interval_secs == 0 {
                return Err(ConfigError::Invalid(
                    "reaper.sweep_interval_secs must be greater than 0".into(),
                ));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key → value source.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(currency) = lookup("CARTA_DEFAULT_CURRENCY") {
            debug!(currency = %currency, "Overriding default currency from environment");
            self.engine.default_currency = currency;
        }

        if let Some(timeout) = lookup("CARTA_CATALOG_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => {
                    debug!(ms, "Overriding catalog timeout from environment");
                    self.engine.catalog_timeout_ms = ms;
                }
                Err(_) => warn!(value = %timeout, "Ignoring invalid CARTA_CATALOG_TIMEOUT_MS"),
            }
        }

        if let Some(lines) = lookup("CARTA_MAX_CART_LINES") {
            match lines.parse::<usize>() {
                Ok(max) => self.limits.max_lines = max,
                Err(_) => warn!(value = %lines, "Ignoring invalid CARTA_MAX_CART_LINES"),
            }
        }

        if let Some(qty) = lookup("CARTA_MAX_LINE_QUANTITY") {
            match qty.parse::<i64>() {
                Ok(max) => self.limits.max_line_quantity = max,
                Err(_) => warn!(value = %qty, "Ignoring invalid CARTA_MAX_LINE_QUANTITY"),
            }
        }

        if let Some(enabled) = lookup("CARTA_REAPER_ENABLED") {
            match enabled.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.reaper.enabled = true,
                "0" | "false" | "no" | "off" => self.reaper.enabled = false,
                _ => warn!(value = %enabled, "Unknown CARTA_REAPER_ENABLED value"),
            }
        }

        if let Some(ttl) = lookup("CARTA_IDLE_TTL_SECS") {
            match ttl.parse::<u64>() {
                Ok(secs) => {
                    debug!(secs, "Overriding idle TTL from environment");
                    self.reaper.idle_ttl_secs = secs;
                }
                Err(_) => warn!(value = %ttl, "Ignoring invalid CARTA_IDLE_TTL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "carta", "carta")
            .map(|dirs| dirs.config_dir().join("carta.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
