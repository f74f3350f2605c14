//! Replay session controller
//!
//! Owns the one recorder and the one player of a host session and keeps them
//! from running at the same time. The host drives it once per tick and
//! forwards animation triggers through [`TriggerObserver`].

use chrono::Utc;

use crate::config::ReplayConfig;
use crate::host::{Presentation, SimulationView, TriggerObserver};
use crate::replay::error::{ReplayError, Result};
use crate::replay::runtime::player::Player;
use crate::replay::runtime::recorder::Recorder;
use crate::replay::storage::{self, ReplayStore};
use crate::replay::types::{EntityId, ReplayFile};

/// Summary of a recording that was just written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecording {
    pub name: String,
    pub file_name: String,
    pub frames: usize,
    pub duration: f32,
}

/// Recording and playback for one host session
#[derive(Debug)]
pub struct ReplayController {
    recorder: Recorder,
    player: Player,
    store: ReplayStore,
}

impl ReplayController {
    pub fn new(recorder: Recorder, player: Player, store: ReplayStore) -> Self {
        Self {
            recorder,
            player,
            store,
        }
    }

    /// Build a controller from settings; `None` if no replay directory can be determined
    pub fn from_config(config: &ReplayConfig) -> Option<Self> {
        let dir = config.replay_dir()?;
        Some(Self::new(
            Recorder::new(config.recorder()),
            Player::new(config.player()),
            ReplayStore::new(dir),
        ))
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn store(&self) -> &ReplayStore {
        &self.store
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    /// Start recording at host time `now`; returns the recording name
    pub fn start_recording(
        &mut self,
        sim: &dyn SimulationView,
        name: Option<String>,
        now: f32,
    ) -> Result<String> {
        if self.player.is_playing() {
            return Err(ReplayError::ConcurrentModeConflict {
                attempted: "record",
                active: "replaying",
            });
        }
        check_name(name.as_deref())?;
        let name = self.recorder.start(sim, name, now, Utc::now())?;
        Ok(name.to_string())
    }

    /// Stop recording and write the file, optionally under a new name
    ///
    /// An invalid new name is rejected before the capture is finished, so
    /// recording carries on.
    pub fn stop_recording(&mut self, now: f32, name: Option<String>) -> Result<SavedRecording> {
        if !self.recorder.is_recording() {
            return Err(ReplayError::NotRecording);
        }
        check_name(name.as_deref())?;
        let done = self.recorder.stop(now, name)?;
        let path = self.store.save(&done.name, &done.replay)?;
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(SavedRecording {
            name: done.name,
            file_name,
            frames: done.replay.frames.len(),
            duration: done.replay.duration,
        })
    }

    /// Start playing an in-memory recording
    pub fn start_playback(
        &mut self,
        replay: ReplayFile,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> Result<()> {
        if self.recorder.is_recording() {
            return Err(ReplayError::ConcurrentModeConflict {
                attempted: "replay",
                active: "recording",
            });
        }
        self.player.start(replay, sim, present)
    }

    /// Load a saved replay by name and start playing it; returns its duration
    pub fn play(
        &mut self,
        name: &str,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> Result<f32> {
        if self.recorder.is_recording() {
            return Err(ReplayError::ConcurrentModeConflict {
                attempted: "replay",
                active: "recording",
            });
        }
        if self.player.is_playing() {
            return Err(ReplayError::AlreadyPlaying);
        }
        let replay = self.store.load(name)?;
        let duration = replay.duration;
        self.start_playback(replay, sim, present)?;
        Ok(duration)
    }

    /// Stop playback; `false` if nothing was playing
    pub fn stop_playback(
        &mut self,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> bool {
        self.player.stop(sim, present)
    }

    pub fn toggle_pause(&mut self) -> Option<bool> {
        self.player.toggle_pause()
    }

    pub fn seek(
        &mut self,
        time: f32,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> Result<()> {
        self.player.seek(time, sim, present)
    }

    pub fn adjust_speed(&mut self, delta: f32) -> Option<f32> {
        self.player.adjust_speed(delta)
    }

    pub fn set_speed(&mut self, speed: f32) -> Option<f32> {
        self.player.set_speed(speed)
    }

    /// Per-tick update: sample while recording, advance while playing
    pub fn tick(
        &mut self,
        dt: f32,
        now: f32,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        self.recorder.sample(sim, now);
        self.player.tick(dt, sim, present);
    }

    /// Tear down whatever is active without saving, e.g. on host shutdown
    pub fn shutdown(&mut self, sim: &dyn SimulationView, present: &mut dyn Presentation) {
        self.recorder.abort();
        self.player.stop(sim, present);
    }
}

/// Blank names fall back to a generated one, so only real names are checked
fn check_name(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) if !name.trim().is_empty() => storage::validate_name(name),
        _ => Ok(()),
    }
}

impl TriggerObserver for ReplayController {
    fn on_trigger(&mut self, id: EntityId, name: &str, now: f32) {
        self.recorder.capture_trigger(id, name, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::runtime::player::PlayerConfig;
    use crate::replay::runtime::recorder::RecorderConfig;
    use crate::replay::types::ReplayFrame;
    use crate::test_utils::{FakeStage, FakeWorld};

    fn controller(dir: &std::path::Path) -> ReplayController {
        ReplayController::new(
            Recorder::new(RecorderConfig::default()),
            Player::new(PlayerConfig::default()),
            ReplayStore::new(dir),
        )
    }

    fn one_frame() -> ReplayFile {
        let mut replay = ReplayFile::new(0);
        replay.frames.push(ReplayFrame::new(0.0));
        replay
    }

    #[test]
    fn test_record_while_playing_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        session.start_playback(one_frame(), &world, &mut stage).unwrap();
        let err = session.start_recording(&world, None, 0.0).unwrap_err();
        assert_eq!(err.to_string(), "cannot record while replaying");
        assert!(!session.is_recording());
    }

    #[test]
    fn test_replay_while_recording_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        session.start_recording(&world, Some("x".into()), 0.0).unwrap();
        let err = session
            .start_playback(one_frame(), &world, &mut stage)
            .unwrap_err();
        assert!(matches!(err, ReplayError::ConcurrentModeConflict { .. }));
        assert!(!session.is_playing());
    }

    #[test]
    fn test_stop_recording_writes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        session.start_recording(&world, Some("take".into()), 10.0).unwrap();
        session.tick(0.1, 10.1, &world, &mut stage);
        session.tick(0.1, 10.2, &world, &mut stage);
        let saved = session.stop_recording(11.0, None).unwrap();

        assert_eq!(saved.file_name, "take.valreplay");
        assert_eq!(saved.frames, 2);
        assert!((saved.duration - 1.0).abs() < 1e-4);
        assert!(tmp.path().join("take.valreplay").is_file());
    }

    #[test]
    fn test_invalid_name_does_not_start_recording() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut session = controller(tmp.path());

        let err = session
            .start_recording(&world, Some("a/b".into()), 0.0)
            .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidName(ref n) if n == "a/b"));
        assert!(!session.is_recording());
    }

    #[test]
    fn test_invalid_rename_keeps_recording() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        session.start_recording(&world, Some("take".into()), 0.0).unwrap();
        session.tick(0.1, 0.1, &world, &mut stage);
        session.on_trigger(EntityId::new(1, 1), "swing", 0.15);
        session.tick(0.1, 0.2, &world, &mut stage);

        let err = session
            .stop_recording(0.5, Some("../x".into()))
            .unwrap_err();
        assert!(matches!(err, ReplayError::InvalidName(_)));
        assert!(session.is_recording());
        assert_eq!(session.recorder().name(), Some("take"));
        assert!(!tmp.path().join("x.valreplay").exists());

        let saved = session.stop_recording(1.0, None).unwrap();
        assert_eq!(saved.file_name, "take.valreplay");
        let replay = session.store().load("take").unwrap();
        assert_eq!(replay.triggers.len(), 1);
    }

    #[test]
    fn test_stop_without_recording() {
        let tmp = tempfile::tempdir().unwrap();
        let mut session = controller(tmp.path());

        assert!(matches!(
            session.stop_recording(1.0, Some("a/b".into())),
            Err(ReplayError::NotRecording)
        ));
    }

    #[test]
    fn test_triggers_flow_through_observer() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut session = controller(tmp.path());

        session.on_trigger(EntityId::new(1, 1), "early", 0.0);
        session.start_recording(&world, Some("t".into()), 0.0).unwrap();
        session.on_trigger(EntityId::new(1, 1), "swing", 0.5);
        session.stop_recording(1.0, None).unwrap();

        let replay = session.store().load("t").unwrap();
        assert_eq!(replay.triggers.len(), 1);
        assert_eq!(replay.triggers[0].name, "swing");
    }

    #[test]
    fn test_play_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        assert!(matches!(
            session.play("ghost", &world, &mut stage),
            Err(ReplayError::ReplayNotFound(_))
        ));
    }

    #[test]
    fn test_shutdown_clears_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let world = FakeWorld::new();
        let mut stage = FakeStage::new();
        let mut session = controller(tmp.path());

        session.start_playback(one_frame(), &world, &mut stage).unwrap();
        session.shutdown(&world, &mut stage);
        assert!(!session.is_playing());
        assert!(!session.is_recording());
    }
}
