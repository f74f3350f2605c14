//! Replay runtime
//!
//! Components for capturing and playing back replays.

mod ghosts;
mod player;
mod recorder;
mod session;
mod world_diff;
mod world_replay;

pub use ghosts::{GhostKind, GhostRegistry};
pub use player::{
    FRAME_EPSILON, MAX_SPEED, MIN_SPEED, PlaybackState, Player, PlayerConfig, bracket,
    first_trigger_after,
};
pub use recorder::{FinishedRecording, Recorder, RecorderConfig, default_name};
pub use session::{ReplayController, SavedRecording};
pub use world_diff::WorldStateDiffer;
pub(crate) use world_diff::approx_eq;
pub use world_replay::{OriginalVisual, WorldStateReplayer};
