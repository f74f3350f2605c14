//! Console command surface
//!
//! ```text
//! record [name]      start recording, or stop and save if already recording
//! record stop        stop and save
//! replay <name>      play a saved replay
//! replay list        list saved replays with their size
//! replay exit        stop playback
//! ```
//!
//! Commands produce human-readable lines for the host's console.

use thiserror::Error;

use crate::host::{Presentation, SimulationView};
use crate::replay::error::ReplayError;
use crate::replay::runtime::ReplayController;
use crate::replay::storage::ReplayStore;

/// Help line for `record`
pub const RECORD_USAGE: &str = "Recording: record [name] | record stop";
/// Help line for `replay`
pub const REPLAY_USAGE: &str = "Usage: replay <file> | list | exit";

/// Parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bare `record` or `record <name>`
    RecordToggle(Option<String>),
    RecordStop,
    ReplayPlay(String),
    ReplayList,
    ReplayExit,
}

/// Errors from parsing a command line
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{0}")]
    Usage(&'static str),
}

impl Command {
    /// Parse one console line
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let head = words.next().ok_or(CommandError::Empty)?;
        let arg = words.next();

        match head.to_ascii_lowercase().as_str() {
            "record" => Ok(match arg {
                Some(a) if a.eq_ignore_ascii_case("stop") => Self::RecordStop,
                Some(name) => Self::RecordToggle(Some(name.to_string())),
                None => Self::RecordToggle(None),
            }),
            "replay" => {
                let arg = arg.ok_or(CommandError::Usage(REPLAY_USAGE))?;
                Ok(match arg.to_ascii_lowercase().as_str() {
                    "list" => Self::ReplayList,
                    "exit" => Self::ReplayExit,
                    _ => Self::ReplayPlay(arg.to_string()),
                })
            }
            _ => Err(CommandError::Unknown(head.to_string())),
        }
    }

    /// Run against the session and return the lines to print
    pub fn execute(
        self,
        session: &mut ReplayController,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
        now: f32,
    ) -> Vec<String> {
        match self {
            Self::RecordStop => stop_recording(session, now, None),
            Self::RecordToggle(name) if session.is_recording() => {
                stop_recording(session, now, name)
            }
            Self::RecordToggle(name) => match session.start_recording(sim, name, now) {
                Ok(name) => vec![format!("Recording started: {name}")],
                Err(e) => vec![capitalize(&e.to_string())],
            },
            Self::ReplayList => list(session.store()),
            Self::ReplayExit => {
                if session.stop_playback(sim, present) {
                    vec!["Replay stopped.".to_string()]
                } else {
                    vec!["No replay is currently playing.".to_string()]
                }
            }
            Self::ReplayPlay(name) => match session.play(&name, sim, present) {
                Ok(duration) => vec![format!("Playing replay: {name} ({duration:.1}s)")],
                Err(ReplayError::ReplayNotFound(_)) => {
                    vec![format!("Replay file not found: {name}")]
                }
                Err(
                    e @ (ReplayError::ConcurrentModeConflict { .. }
                    | ReplayError::AlreadyPlaying
                    | ReplayError::EmptyRecording
                    | ReplayError::InvalidName(_)),
                ) => vec![capitalize(&e.to_string())],
                Err(e) => vec![format!("Failed to load replay: {e}")],
            },
        }
    }
}

/// Parse and run one console line
pub fn run(
    line: &str,
    session: &mut ReplayController,
    sim: &dyn SimulationView,
    present: &mut dyn Presentation,
    now: f32,
) -> Vec<String> {
    match Command::parse(line) {
        Ok(command) => command.execute(session, sim, present, now),
        Err(CommandError::Usage(usage)) => vec![usage.to_string()],
        Err(e) => vec![e.to_string()],
    }
}

/// Tab-completion candidates for the argument of `command`
pub fn completions(command: &str, store: &ReplayStore) -> Vec<String> {
    match command.to_ascii_lowercase().as_str() {
        "record" => vec!["stop".to_string()],
        "replay" => {
            let mut options = vec!["list".to_string(), "exit".to_string()];
            options.extend(store.names());
            options
        }
        _ => Vec::new(),
    }
}

fn stop_recording(session: &mut ReplayController, now: f32, name: Option<String>) -> Vec<String> {
    match session.stop_recording(now, name) {
        Ok(saved) => vec![format!(
            "Recording saved: {} ({} frames, {:.1}s)",
            saved.file_name, saved.frames, saved.duration
        )],
        Err(ReplayError::NotRecording) => vec!["Not currently recording.".to_string()],
        Err(e) => vec![format!("Failed to save replay: {e}")],
    }
}

fn list(store: &ReplayStore) -> Vec<String> {
    let entries = match store.list() {
        Ok(entries) => entries,
        Err(e) => return vec![format!("Failed to list replays: {e}")],
    };
    if entries.is_empty() {
        return vec!["No replay files found.".to_string()];
    }

    let mut lines = Vec::with_capacity(entries.len() + 1);
    lines.push(format!("Replay files ({}):", entries.len()));
    lines.extend(
        entries
            .iter()
            .map(|e| format!("  {} ({}KB)", e.name, e.size_kb())),
    );
    lines
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>() + ".",
        None => String::new(),
    }
}
