//! Ghostreel Core - replay capture and ghost playback
//!
//! This crate records the observable state of a simulated world and plays it
//! back as non-interactive ghosts on top of the live world.
//!
//! # Architecture
//!
//! - [`host`] - Interfaces the host implements (simulation queries, presentation)
//! - [`replay`] - Recording, the `.valreplay` format and playback
//! - [`config`] - Persistent replay settings

pub mod config;
pub mod host;
#[cfg(test)]
mod integration;
pub mod replay;
#[cfg(test)]
pub mod test_utils;

// Re-export host interfaces
pub use host::{Presentation, SimulationView, TriggerObserver};

// Re-export configuration
pub use config::ReplayConfig;

// Re-export the session entry points
pub use replay::{ReplayController, ReplayError, ReplayFile, ReplayStore};
