use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::domains::messaging::AppOrigin;
use crate::errors::WakeError;
use crate::utils::env_adapter::EnvAdapter;

pub const CONFIG_PATH_ENV: &str = "WAKELINK_CONFIG";
pub const ORIGIN_ENV: &str = "WAKELINK_ORIGIN";
pub const FORCE_UNSUPPORTED_ENV: &str = "WAKELINK_FORCE_UNSUPPORTED";

pub const DEFAULT_ORIGIN: &str = "app://wakelink";
const DEFAULT_REASON: &str = "Display kept awake by wakelink";

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_peer_watch_interval_ms() -> u64 {
    500
}

fn default_timer_minutes() -> u32 {
    30
}

fn default_reason() -> String {
    DEFAULT_REASON.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InhibitorConfig {
    #[serde(default = "default_reason")]
    pub reason: String,
}

impl Default for InhibitorConfig {
    fn default() -> Self {
        Self {
            reason: default_reason(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WakeConfig {
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_peer_watch_interval_ms")]
    pub peer_watch_interval_ms: u64,
    #[serde(default)]
    pub force_unsupported: bool,
    #[serde(default = "default_timer_minutes")]
    pub default_timer_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub inhibitor: InhibitorConfig,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            tick_interval_ms: default_tick_interval_ms(),
            peer_watch_interval_ms: default_peer_watch_interval_ms(),
            force_unsupported: false,
            default_timer_minutes: default_timer_minutes(),
            log_level: None,
            inhibitor: InhibitorConfig::default(),
        }
    }
}

impl WakeConfig {
    /// Resolves the config file location: `$WAKELINK_CONFIG`, else the platform config dir.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = EnvAdapter::get(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("wakelink").join("config.toml"))
    }

    /// Loads the config from the default location and applies environment overrides.
    pub fn load() -> Result<Self, WakeError> {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_from(&path)?,
            None => {
                debug!("No config directory available, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reads a TOML file. Missing files yield defaults; unparsable files are logged and ignored.
    pub fn load_from(path: &Path) -> Result<Self, WakeError> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .map_err(|e| WakeError::io("read_config", path.display(), e))?;

        match toml::from_str::<WakeConfig>(&raw) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                warn!(
                    "Failed to parse config at {}, using defaults: {e}",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(origin) = EnvAdapter::get(ORIGIN_ENV) {
            self.origin = origin;
        }
        if let Some(force) = EnvAdapter::get_flag(FORCE_UNSUPPORTED_ENV) {
            self.force_unsupported = force;
        }
    }

    pub fn validate(&self) -> Result<(), WakeError> {
        AppOrigin::parse(&self.origin)?;
        if self.tick_interval_ms == 0 {
            return Err(WakeError::config(
                "tick_interval_ms",
                "must be greater than zero",
            ));
        }
        if self.peer_watch_interval_ms == 0 {
            return Err(WakeError::config(
                "peer_watch_interval_ms",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn app_origin(&self) -> Result<AppOrigin, WakeError> {
        AppOrigin::parse(&self.origin)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn peer_watch_interval(&self) -> Duration {
        Duration::from_millis(self.peer_watch_interval_ms)
    }

    pub fn to_toml(&self) -> Result<String, WakeError> {
        toml::to_string_pretty(self).map_err(|e| WakeError::config("serialize", e))
    }
}
