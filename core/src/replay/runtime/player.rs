//! Replay player
//!
//! Advances a virtual clock over a loaded recording, interpolates between
//! the two frames bracketing it and drives ghosts, triggers and world events.

use hashbrown::{HashMap, HashSet};

use crate::host::{Presentation, SimulationView};
use crate::replay::error::{ReplayError, Result};
use crate::replay::runtime::ghosts::{GhostKind, GhostRegistry};
use crate::replay::runtime::world_replay::WorldStateReplayer;
use crate::replay::types::{EntityId, EntitySnapshot, ReplayFile, ReplayFrame, TriggerEvent};

/// Slowest playback speed
pub const MIN_SPEED: f32 = 0.1;
/// Fastest playback speed
pub const MAX_SPEED: f32 = 4.0;
/// Frames closer together than this are treated as simultaneous
pub const FRAME_EPSILON: f32 = 1e-4;

/// Externally visible playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Play placement/destruction effects on world ghosts
    pub play_effects: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self { play_effects: true }
    }
}

/// State of one active playback
#[derive(Debug)]
struct Playback {
    replay: ReplayFile,
    clock: f32,
    speed: f32,
    paused: bool,
    trigger_cursor: usize,
    /// Identities shown during the previous tick
    active: HashSet<EntityId>,
    ghosts: GhostRegistry,
    world: Option<WorldStateReplayer>,
}

/// Replay player state
#[derive(Debug, Default)]
pub struct Player {
    config: PlayerConfig,
    playback: Option<Playback>,
}

impl Player {
    /// Create a new player with the given configuration
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            playback: None,
        }
    }

    /// Begin playing `replay` from time zero.
    ///
    /// Refuses to start over an active playback or with a frameless file.
    /// Mutual exclusion with recording is enforced by the session controller.
    pub fn start(
        &mut self,
        replay: ReplayFile,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> Result<()> {
        if self.playback.is_some() {
            return Err(ReplayError::AlreadyPlaying);
        }
        if replay.frames.is_empty() {
            return Err(ReplayError::EmptyRecording);
        }

        let mut ghosts = GhostRegistry::new();
        let world = replay.has_world_events().then(|| {
            let mut world = WorldStateReplayer::new(self.config.play_effects);
            world.initialize(&replay.world_events, &mut ghosts, sim, present);
            world
        });

        tracing::info!(
            duration = replay.duration,
            frames = replay.frames.len(),
            triggers = replay.triggers.len(),
            world_events = replay.world_events.len(),
            "replay started"
        );

        self.playback = Some(Playback {
            replay,
            clock: 0.0,
            speed: 1.0,
            paused: false,
            trigger_cursor: 0,
            active: HashSet::new(),
            ghosts,
            world,
        });
        Ok(())
    }

    /// Advance the clock by `dt` real seconds and refresh every ghost.
    ///
    /// The clock only moves while unpaused, but ghosts are refreshed on every
    /// tick so scrubbing a paused replay still updates the scene.
    pub fn tick(&mut self, dt: f32, sim: &dyn SimulationView, present: &mut dyn Presentation) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };

        if !playback.paused {
            playback.clock = (playback.clock + dt * playback.speed).max(0.0);
            if playback.clock >= playback.replay.duration {
                playback.clock = playback.replay.duration;
                playback.paused = true;
                tracing::debug!("replay reached the end, pausing");
            }
        }

        playback.show_frames(present);
        playback.fire_triggers(present);
        if let Some(world) = playback.world.as_mut() {
            world.update(
                &playback.replay.world_events,
                playback.clock,
                &mut playback.ghosts,
                sim,
                present,
            );
        }
    }

    /// Jump to `time` (clamped to the recording).
    ///
    /// Triggers between the old and new time never fire: a forward jump skips
    /// them and a backward jump rewinds the cursor so they fire again when
    /// the clock next passes them.
    pub fn seek(
        &mut self,
        time: f32,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) -> Result<()> {
        let playback = self.playback.as_mut().ok_or(ReplayError::NotPlaying)?;

        let target = time.clamp(0.0, playback.replay.duration);
        let after = first_trigger_after(&playback.replay.triggers, target);
        playback.trigger_cursor = if target < playback.clock {
            after
        } else {
            playback.trigger_cursor.max(after)
        };
        playback.clock = target;

        if let Some(world) = playback.world.as_mut() {
            world.seek_to(
                &playback.replay.world_events,
                target,
                &mut playback.ghosts,
                sim,
                present,
            );
        }
        Ok(())
    }

    /// Stop playback, restoring the world and destroying every ghost.
    ///
    /// Returns `false` if nothing was playing.
    pub fn stop(&mut self, sim: &dyn SimulationView, present: &mut dyn Presentation) -> bool {
        let Some(mut playback) = self.playback.take() else {
            return false;
        };
        if let Some(world) = playback.world.as_mut() {
            world.restore_all(&mut playback.ghosts, sim, present);
        }
        playback.ghosts.destroy_all(present);
        tracing::info!("replay stopped");
        true
    }

    /// Flip the paused flag; returns the new value
    pub fn toggle_pause(&mut self) -> Option<bool> {
        let playback = self.playback.as_mut()?;
        playback.paused = !playback.paused;
        Some(playback.paused)
    }

    pub fn set_paused(&mut self, paused: bool) {
        if let Some(playback) = self.playback.as_mut() {
            playback.paused = paused;
        }
    }

    /// Set the playback speed (clamped); returns the applied value
    pub fn set_speed(&mut self, speed: f32) -> Option<f32> {
        let playback = self.playback.as_mut()?;
        playback.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        Some(playback.speed)
    }

    /// Change the playback speed by `delta` (clamped); returns the applied value
    pub fn adjust_speed(&mut self, delta: f32) -> Option<f32> {
        let current = self.playback.as_ref()?.speed;
        self.set_speed(current + delta)
    }

    pub fn state(&self) -> PlaybackState {
        match &self.playback {
            None => PlaybackState::Stopped,
            Some(p) if p.paused => PlaybackState::Paused,
            Some(_) => PlaybackState::Playing,
        }
    }

    /// Check if a replay is loaded (playing or paused)
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.playback.as_ref().is_some_and(|p| p.paused)
    }

    /// Current virtual time in seconds
    pub fn time(&self) -> f32 {
        self.playback.as_ref().map_or(0.0, |p| p.clock)
    }

    pub fn duration(&self) -> f32 {
        self.playback.as_ref().map_or(0.0, |p| p.replay.duration)
    }

    pub fn speed(&self) -> f32 {
        self.playback.as_ref().map_or(1.0, |p| p.speed)
    }

    pub fn has_world_events(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.replay.has_world_events())
    }

    pub fn world_event_count(&self) -> usize {
        self.playback
            .as_ref()
            .map_or(0, |p| p.replay.world_events.len())
    }

    /// The loaded recording
    pub fn replay(&self) -> Option<&ReplayFile> {
        self.playback.as_ref().map(|p| &p.replay)
    }

    /// Ghosts of the active playback
    pub fn ghosts(&self) -> Option<&GhostRegistry> {
        self.playback.as_ref().map(|p| &p.ghosts)
    }

    /// World-state replayer of the active playback, if the file has world events
    pub fn world(&self) -> Option<&WorldStateReplayer> {
        self.playback.as_ref().and_then(|p| p.world.as_ref())
    }

    /// Mobile identities shown on the last tick
    pub fn active_entities(&self) -> Option<&HashSet<EntityId>> {
        self.playback.as_ref().map(|p| &p.active)
    }

    /// Index of the next trigger to fire
    pub fn trigger_cursor(&self) -> usize {
        self.playback.as_ref().map_or(0, |p| p.trigger_cursor)
    }
}

impl Playback {
    fn show_frames(&mut self, present: &mut dyn Presentation) {
        let Some((ia, ib, t)) = bracket(&self.replay.frames, self.clock) else {
            return;
        };
        let frame_a = &self.replay.frames[ia];
        let frame_b = &self.replay.frames[ib];

        let later: HashMap<EntityId, &EntitySnapshot> =
            frame_b.entities.iter().map(|e| (e.id, e)).collect();
        let mut current = HashSet::with_capacity(frame_a.entities.len().max(later.len()));

        for a in &frame_a.entities {
            current.insert(a.id);
            self.ghosts.get_or_create(
                present,
                a.id,
                GhostKind::Mobile,
                a.prefab_hash,
                a.position,
                a.rotation,
            );

            match later.get(&a.id) {
                Some(b) => {
                    let position = a.position.lerp(b.position, t);
                    let rotation = a.rotation.slerp(b.rotation, t);
                    let anim = a.anim.blend(&b.anim, t);
                    self.ghosts.update(present, a.id, position, rotation, &anim);
                    let nearer = if t >= 0.5 { *b } else { a };
                    self.ghosts.update_equipment(present, a.id, nearer);
                }
                None => {
                    self.ghosts.update(present, a.id, a.position, a.rotation, &a.anim);
                    self.ghosts.update_equipment(present, a.id, a);
                }
            }
        }

        for b in &frame_b.entities {
            if !current.insert(b.id) {
                continue;
            }
            self.ghosts.get_or_create(
                present,
                b.id,
                GhostKind::Mobile,
                b.prefab_hash,
                b.position,
                b.rotation,
            );
            self.ghosts.update(present, b.id, b.position, b.rotation, &b.anim);
            self.ghosts.update_equipment(present, b.id, b);
        }

        for id in self.active.difference(&current) {
            self.ghosts.remove(present, *id);
        }
        self.active = current;
    }

    fn fire_triggers(&mut self, present: &mut dyn Presentation) {
        while let Some(trigger) = self.replay.triggers.get(self.trigger_cursor) {
            if trigger.time > self.clock {
                break;
            }
            self.ghosts.fire_trigger(present, trigger.id, &trigger.name);
            self.trigger_cursor += 1;
        }
    }
}

/// Locate the frames bracketing `time`.
///
/// Returns `(a, b, t)` with `frames[a].time <= time <= frames[b].time` and
/// the blend factor `t` in `0..=1`. At either end of the recording `a == b`.
/// `None` only for an empty frame list.
pub fn bracket(frames: &[ReplayFrame], time: f32) -> Option<(usize, usize, f32)> {
    let last = frames.len().checked_sub(1)?;

    let a = if time <= frames[0].time {
        0
    } else if time >= frames[last].time {
        last
    } else {
        frames.partition_point(|f| f.time <= time) - 1
    };
    let b = (a + 1).min(last);

    let span = frames[b].time - frames[a].time;
    let t = if span > FRAME_EPSILON {
        ((time - frames[a].time) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some((a, b, t))
}

/// Index of the first trigger strictly after `time`
pub fn first_trigger_after(triggers: &[TriggerEvent], time: f32) -> usize {
    triggers.partition_point(|t| t.time <= time)
}
