//! Concert data models.
//!
//! Types exist where Rust type safety genuinely helps: a closed engine-state
//! enum that downstream consumers match on, the caller-owned track record,
//! and the flat status payloads returned by every controller operation.

pub mod state;
pub mod status;
pub mod track;

pub use state::EngineState;
pub use status::{LoadedMedia, Outcome, PauseStatus, StatusSnapshot, VolumeStatus};
pub use track::{LocatorKind, Track};
