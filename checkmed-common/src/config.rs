//! Configuration loading and resolution
//!
//! Every setting is resolved by the same priority order:
//! 1. Explicit override (command-line argument)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never stops startup. It is logged and the
//! remaining tiers are used instead.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Environment variable naming an explicit TOML config path
pub const CONFIG_PATH_ENV: &str = "CHECKMED_CONFIG";
/// Environment variable overriding the verification service base URL
pub const SERVICE_URL_ENV: &str = "CHECKMED_SERVICE_URL";
/// Environment variable overriding the session cache directory
pub const CACHE_DIR_ENV: &str = "CHECKMED_CACHE_DIR";

const DEFAULT_SERVICE_URL: &str = "https://checkmed-2q81.onrender.com/api";

/// `[logging]` table of the TOML config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// `[pacing]` table of the TOML config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub success_floor_ms: Option<u64>,
    pub failure_floor_ms: Option<u64>,
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub location_timeout_ms: Option<u64>,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Minimum time a verification call takes before its verdict is surfaced.
///
/// Gives the presentation layer a fixed window for its progress indicator.
/// A failure gets the longer floor so a negative result has more reading time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub success_floor: Duration,
    pub failure_floor: Duration,
}

impl PacingPolicy {
    /// No artificial delay at all
    pub fn immediate() -> Self {
        Self {
            success_floor: Duration::ZERO,
            failure_floor: Duration::ZERO,
        }
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            success_floor: Duration::from_millis(2000),
            failure_floor: Duration::from_millis(3000),
        }
    }
}

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub service_url: String,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub location_timeout: Duration,
    pub pacing: PacingPolicy,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            cache_dir: default_cache_dir(),
            request_timeout: Duration::from_secs(60),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            location_timeout: Duration::from_secs(10),
            pacing: PacingPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

/// Platform cache directory, e.g. `~/.cache/checkmed` on Linux
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("checkmed"))
        .unwrap_or_else(|| PathBuf::from("./checkmed_cache"))
}

/// Default TOML location, e.g. `~/.config/checkmed/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("checkmed").join("config.toml"))
}

/// Fully resolved settings consumed by the verification library
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the remote verification service, without trailing slash
    pub service_url: String,
    pub cache_dir: PathBuf,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub location_timeout: Duration,
    pub pacing: PacingPolicy,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            service_url: defaults.service_url,
            cache_dir: defaults.cache_dir,
            request_timeout: defaults.request_timeout,
            cache_ttl: defaults.cache_ttl,
            location_timeout: defaults.location_timeout,
            pacing: defaults.pacing,
            log_level: defaults.log_level,
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub service_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

/// Read a TOML config file.
///
/// Returns `Ok(None)` when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))?;
    Ok(Some(config))
}

/// Resolves [`Settings`] across the four configuration tiers
pub struct ConfigResolver {
    overrides: ConfigOverrides,
    defaults: CompiledDefaults,
}

impl ConfigResolver {
    pub fn new(overrides: ConfigOverrides) -> Self {
        Self {
            overrides,
            defaults: CompiledDefaults::for_current_platform(),
        }
    }

    /// Path of the TOML file that will be consulted, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.overrides.config_path {
            return Some(path.clone());
        }
        if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        default_config_path()
    }

    fn toml_config(&self) -> TomlConfig {
        let Some(path) = self.config_path() else {
            return TomlConfig::default();
        };
        match load_toml_config(&path) {
            Ok(Some(config)) => {
                debug!(path = %path.display(), "Loaded TOML config");
                config
            }
            Ok(None) => {
                debug!(path = %path.display(), "No TOML config, using defaults");
                TomlConfig::default()
            }
            Err(e) => {
                warn!("Ignoring TOML config: {}", e);
                TomlConfig::default()
            }
        }
    }

    pub fn resolve(&self) -> Settings {
        let toml = self.toml_config();
        let defaults = &self.defaults;

        let service_url = self
            .overrides
            .service_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| non_empty_env(SERVICE_URL_ENV))
            .or_else(|| toml.service_url.clone().filter(|u| !u.trim().is_empty()))
            .unwrap_or_else(|| defaults.service_url.clone());

        let cache_dir = self
            .overrides
            .cache_dir
            .clone()
            .or_else(|| non_empty_env(CACHE_DIR_ENV).map(PathBuf::from))
            .or_else(|| toml.cache_dir.clone())
            .unwrap_or_else(|| defaults.cache_dir.clone());

        let pacing = PacingPolicy {
            success_floor: toml
                .pacing
                .success_floor_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing.success_floor),
            failure_floor: toml
                .pacing
                .failure_floor_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing.failure_floor),
        };

        Settings {
            service_url: service_url.trim().trim_end_matches('/').to_string(),
            cache_dir,
            request_timeout: toml
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            cache_ttl: toml
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            location_timeout: toml
                .location_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.location_timeout),
            pacing,
            log_level: toml.logging.level,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_defaults() {
        let pacing = PacingPolicy::default();
        assert_eq!(pacing.success_floor, Duration::from_secs(2));
        assert_eq!(pacing.failure_floor, Duration::from_secs(3));
        assert!(pacing.failure_floor > pacing.success_floor);
    }

    #[test]
    fn test_toml_config_all_fields_optional() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_config_partial_tables() {
        let config: TomlConfig = toml::from_str(
            r#"
            service_url = "http://localhost:8000/api/"

            [pacing]
            failure_floor_ms = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.service_url.as_deref(), Some("http://localhost:8000/api/"));
        assert_eq!(config.pacing.success_floor_ms, None);
        assert_eq!(config.pacing.failure_floor_ms, Some(500));
    }
}
