//! Error types.
//!
//! Playback failures never abort an operation: they ride alongside the
//! status snapshot in an [`Outcome`](crate::models::Outcome).

use std::path::PathBuf;

use thiserror::Error;

/// Why a playback operation did not do what was asked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("stream unreachable after {attempts} attempt(s): {locator}")]
    Unreachable { locator: String, attempts: u32 },

    #[error("engine did not start playback after {attempts} attempt(s)")]
    EngineStartFailed { attempts: u32 },

    #[error("no media loaded")]
    NoMediaLoaded,

    #[error("invalid seek position: {0}")]
    InvalidSeek(f64),

    #[error("playback start cancelled")]
    Cancelled,
}

impl PlaybackError {
    /// Stable machine-readable code written to JSON payloads.
    pub fn code(&self) -> &'static str {
        match self {
            PlaybackError::Unreachable { .. } => "unreachable",
            PlaybackError::EngineStartFailed { .. } => "engine_start_failed",
            PlaybackError::NoMediaLoaded => "no_media_loaded",
            PlaybackError::InvalidSeek(_) => "invalid_seek",
            PlaybackError::Cancelled => "cancelled",
        }
    }
}

/// Failure loading or validating a [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Log errors from non-critical operations without panicking.
#[cfg_attr(not(feature = "native"), allow(dead_code))]
pub(crate) fn log_err<T, E: std::fmt::Display>(result: Result<T, E>, context: &str) -> bool {
    match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("concert: {} failed: {}", context, e);
            false
        }
    }
}
