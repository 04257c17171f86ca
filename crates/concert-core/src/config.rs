//! Controller configuration.
//!
//! Plain JSON with millisecond integer fields. Every field has a default, so
//! a config file only needs the values it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "CONCERT_CONFIG";

pub const DEFAULT_VOLUME: i32 = 70;
pub const MAX_VOLUME: i32 = 100;
pub const MAX_NETWORK_PINGS: u32 = 5;
pub const NETWORK_ATTEMPT_TIMEOUT_MS: u64 = 1000;
pub const MAX_PLAY_ATTEMPTS: u32 = 5;
pub const PLAY_ATTEMPT_DELAY_MS: u64 = 300;
pub const PAUSE_DELAY_MS: u64 = 100;
pub const NETWORK_CACHING_MS: u64 = 1500;
pub const STREAM_OPEN_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Volume applied to the engine at construction.
    pub default_volume: i32,
    /// Upper clamp for `set_volume`. There is no lower clamp.
    pub max_volume: i32,
    pub max_network_pings: u32,
    /// Per-ping timeout.
    pub network_attempt_timeout_ms: u64,
    /// Total budget for the reachability gate. 0 = unbounded.
    pub network_deadline_ms: u64,
    pub max_play_attempts: u32,
    /// How long each start-up attempt waits for an active state.
    pub play_attempt_delay_ms: u64,
    /// Total budget for the start-up loop. 0 = unbounded.
    pub play_start_deadline_ms: u64,
    pub pause_delay_ms: u64,
    /// Pre-roll buffered before the native engine reports `Playing`.
    pub network_caching_ms: u64,
    /// Connect and response-header limit when the native engine opens an
    /// HTTP stream. 0 = unbounded.
    pub stream_open_timeout_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            max_volume: MAX_VOLUME,
            max_network_pings: MAX_NETWORK_PINGS,
            network_attempt_timeout_ms: NETWORK_ATTEMPT_TIMEOUT_MS,
            network_deadline_ms: 10_000,
            max_play_attempts: MAX_PLAY_ATTEMPTS,
            play_attempt_delay_ms: PLAY_ATTEMPT_DELAY_MS,
            play_start_deadline_ms: 5_000,
            pause_delay_ms: PAUSE_DELAY_MS,
            network_caching_ms: NETWORK_CACHING_MS,
            stream_open_timeout_ms: STREAM_OPEN_TIMEOUT_MS,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from the file named by `CONCERT_CONFIG`, or defaults when unset.
    pub fn from_env() -> ConfigResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => {
                log::info!("concert: loading config from {}", path.to_string_lossy());
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_network_pings == 0 {
            return Err(ConfigError::Invalid("max_network_pings must be at least 1".into()));
        }
        if self.max_play_attempts == 0 {
            return Err(ConfigError::Invalid("max_play_attempts must be at least 1".into()));
        }
        if self.default_volume > self.max_volume {
            return Err(ConfigError::Invalid(format!(
                "default_volume {} exceeds max_volume {}",
                self.default_volume, self.max_volume
            )));
        }
        Ok(())
    }

    pub fn network_attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.network_attempt_timeout_ms)
    }

    pub fn network_deadline(&self) -> Option<Duration> {
        non_zero_ms(self.network_deadline_ms)
    }

    pub fn play_attempt_delay(&self) -> Duration {
        Duration::from_millis(self.play_attempt_delay_ms)
    }

    pub fn play_start_deadline(&self) -> Option<Duration> {
        non_zero_ms(self.play_start_deadline_ms)
    }

    pub fn pause_delay(&self) -> Duration {
        Duration::from_millis(self.pause_delay_ms)
    }

    pub fn network_caching(&self) -> Duration {
        Duration::from_millis(self.network_caching_ms)
    }

    pub fn stream_open_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.stream_open_timeout_ms)
    }
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::io::Write;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    #[test]
    fn defaults_match_constants() {
        let c = ControllerConfig::default();
        assert_eq!(c.default_volume, 70);
        assert_eq!(c.max_volume, 100);
        assert_eq!(c.max_network_pings, 5);
        assert_eq!(c.network_attempt_timeout(), Duration::from_secs(1));
        assert_eq!(c.max_play_attempts, 5);
        assert_eq!(c.play_attempt_delay(), Duration::from_millis(300));
        assert_eq!(c.pause_delay(), Duration::from_millis(100));
        assert_eq!(c.network_caching(), Duration::from_millis(1500));
        assert_eq!(c.stream_open_timeout(), Some(Duration::from_secs(5)));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = ControllerConfig::from_json_str(r#"{"max_play_attempts": 3, "pause_delay_ms": 0}"#)
            .unwrap();
        assert_eq!(c.max_play_attempts, 3);
        assert_eq!(c.pause_delay(), Duration::ZERO);
        assert_eq!(c.max_network_pings, 5);
        assert_eq!(c.default_volume, 70);
    }

    #[test]
    fn zero_deadline_means_unbounded() {
        let c = ControllerConfig::from_json_str(r#"{"network_deadline_ms": 0}"#).unwrap();
        assert_eq!(c.network_deadline(), None);
        assert_eq!(c.play_start_deadline(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_attempts_rejected() {
        let err = ControllerConfig::from_json_str(r#"{"max_play_attempts": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        let err = ControllerConfig::from_json_str(r#"{"max_network_pings": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn default_volume_above_max_rejected() {
        let err =
            ControllerConfig::from_json_str(r#"{"default_volume": 90, "max_volume": 80}"#).unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = ControllerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_volume": 55}}"#).unwrap();
        let c = ControllerConfig::load(file.path()).unwrap();
        assert_eq!(c.default_volume, 55);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ControllerConfig::load(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn from_env_reads_named_file() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_volume": 80, "default_volume": 20}}"#).unwrap();

        std::env::set_var(CONFIG_ENV, file.path());
        let c = ControllerConfig::from_env().unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(c.max_volume, 80);
        assert_eq!(c.default_volume, 20);
    }

    #[test]
    fn from_env_unset_uses_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        std::env::remove_var(CONFIG_ENV);
        assert_eq!(ControllerConfig::from_env().unwrap(), ControllerConfig::default());
    }
}
