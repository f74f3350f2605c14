//! Ghostreel replay system
//!
//! Records what happened in a live simulation and plays it back as ghosts
//! overlaid on the present world:
//!
//! - **Entity frames**: per-tick pose and animation state of every character
//! - **Triggers**: one-shot animation events fired exactly once on playback
//! - **World events**: pieces created, destroyed or changed during the recording
//!
//! # Architecture
//!
//! ```text
//! Recording:  SimulationView -> Recorder (+ WorldStateDiffer) -> .valreplay
//! Playback:   .valreplay -> Player -> GhostRegistry -> Presentation
//!                                  -> WorldStateReplayer
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ghostreel_core::replay::{ReplayController, commands};
//!
//! let mut session = ReplayController::from_config(&config).unwrap();
//!
//! // Every host tick:
//! session.tick(dt, now, &sim, &mut stage);
//!
//! // From the console:
//! for line in commands::run("replay boss_fight", &mut session, &sim, &mut stage, now) {
//!     println!("{line}");
//! }
//! ```

pub mod binary;
pub mod commands;
pub mod error;
pub mod runtime;
pub mod storage;
pub mod timeline;
pub mod types;

// Re-export core types
pub use types::{
    AnimFlags, AnimParam, AnimState, EntityId, EntitySnapshot, Equipment, FORMAT_VERSION,
    HealthTier, MAGIC, REPLAY_EXTENSION, ReplayFile, ReplayFrame, TriggerEvent, WorldEvent,
    WorldEventKind,
};

// Re-export binary format
pub use binary::{BinaryReader, BinaryWriter, decode, encode};

pub use error::{ReplayError, Result};

// Re-export runtime
pub use runtime::{
    GhostKind, GhostRegistry, PlaybackState, Player, PlayerConfig, Recorder, RecorderConfig,
    ReplayController, SavedRecording, WorldStateDiffer, WorldStateReplayer,
};

pub use commands::Command;
pub use storage::{ReplayEntry, ReplayStore};
pub use timeline::{TimelineAction, TimelineStatus};
