//! Engine playback states.
//!
//! Serialized as the engine's native state names. Downstream consumers match
//! on these strings, so the set is closed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Native playback state reported by a media engine.
///
/// Lifecycle: `NothingSpecial -> Opening -> Buffering -> Playing <-> Paused`,
/// ending in `Stopped`, `Ended` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EngineState {
    /// Nothing loaded, or media loaded but never started.
    #[default]
    NothingSpecial,
    Opening,
    Buffering,
    Playing,
    Paused,
    Stopped,
    Ended,
    Error,
}

impl EngineState {
    pub const ALL: [EngineState; 8] = [
        EngineState::NothingSpecial,
        EngineState::Opening,
        EngineState::Buffering,
        EngineState::Playing,
        EngineState::Paused,
        EngineState::Stopped,
        EngineState::Ended,
        EngineState::Error,
    ];

    /// Playing-like states. A loaded track is only kept while the engine is in one.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            EngineState::Playing
                | EngineState::Buffering
                | EngineState::Opening
                | EngineState::Paused
        )
    }

    /// States that require the loaded media and current track to be released.
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineState::NothingSpecial => "NothingSpecial",
            EngineState::Opening => "Opening",
            EngineState::Buffering => "Buffering",
            EngineState::Playing => "Playing",
            EngineState::Paused => "Paused",
            EngineState::Stopped => "Stopped",
            EngineState::Ended => "Ended",
            EngineState::Error => "Error",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
