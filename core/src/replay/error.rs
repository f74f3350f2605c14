//! Errors reported by the replay system
//!
//! None of these are fatal to the host: every public operation either
//! succeeds, is a safely ignorable no-op, or returns one of these.

use std::io;

use thiserror::Error;

use super::types::FORMAT_VERSION;

/// Failure of a replay read, write or session operation
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Bad magic, truncated stream or otherwise undecodable data
    #[error("corrupt replay file: {0}")]
    CorruptFormat(String),

    /// Stored version is newer than this reader understands
    #[error("unsupported replay version {found} (newest supported is {})", FORMAT_VERSION)]
    UnsupportedVersion { found: i32 },

    /// Playback refused because the recording holds no frames
    #[error("replay file has no frames")]
    EmptyRecording,

    /// Recording and playback cannot run at the same time
    #[error("cannot {attempted} while {active}")]
    ConcurrentModeConflict {
        attempted: &'static str,
        active: &'static str,
    },

    #[error("already recording")]
    AlreadyRecording,

    #[error("not currently recording")]
    NotRecording,

    #[error("already playing a replay")]
    AlreadyPlaying,

    #[error("no replay is currently playing")]
    NotPlaying,

    #[error("replay file not found: {0}")]
    ReplayNotFound(String),

    /// Names must stay inside the replay directory
    #[error("invalid replay name: {0:?}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReplayError {
    pub(crate) fn corrupt(detail: impl Into<String>) -> Self {
        Self::CorruptFormat(detail.into())
    }

    /// Map a stream error from the reader; running out of bytes means corruption
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt("unexpected end of stream")
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for replay operations
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;
