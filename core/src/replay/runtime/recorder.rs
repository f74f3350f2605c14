//! Replay recorder
//!
//! Samples live mobile entities once per tick into an in-memory
//! [`ReplayFile`], buffers animation triggers, and drives the
//! [`WorldStateDiffer`] for structural changes.

use chrono::{DateTime, Local, Utc};

use crate::host::{Capability, SimulationView};
use crate::replay::error::{ReplayError, Result};
use crate::replay::runtime::world_diff::WorldStateDiffer;
use crate::replay::types::{
    AnimFlags, AnimParam, AnimState, EntityId, EntitySnapshot, ReplayFile, ReplayFrame,
    TriggerEvent,
};

/// Configuration for the recorder
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Track structural pieces and record world events
    pub world_state: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self { world_state: true }
    }
}

/// Salted synchronized-state keys, computed once
#[derive(Debug, Clone)]
struct SyncKeys {
    forward_speed: i32,
    sideway_speed: i32,
    turn_speed: i32,
    flags: [(AnimFlags, i32); 7],
    state_f: i32,
    state_i: i32,
}

impl SyncKeys {
    fn new() -> Self {
        Self {
            forward_speed: AnimParam::ForwardSpeed.sync_key(),
            sideway_speed: AnimParam::SidewaySpeed.sync_key(),
            turn_speed: AnimParam::TurnSpeed.sync_key(),
            flags: AnimFlags::PARAMS.map(|(flag, param)| (flag, param.sync_key())),
            state_f: AnimParam::StateF.sync_key(),
            state_i: AnimParam::StateI.sync_key(),
        }
    }
}

/// In-progress recording
#[derive(Debug)]
struct Capture {
    name: String,
    start: f32,
    replay: ReplayFile,
    pending_triggers: Vec<TriggerEvent>,
    world: Option<WorldStateDiffer>,
}

/// A finished recording ready to be saved
#[derive(Debug, Clone)]
pub struct FinishedRecording {
    pub name: String,
    pub replay: ReplayFile,
}

/// Replay recorder state
#[derive(Debug)]
pub struct Recorder {
    config: RecorderConfig,
    keys: SyncKeys,
    capture: Option<Capture>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(RecorderConfig::default())
    }
}

impl Recorder {
    /// Create a new recorder with the given configuration
    pub fn new(config: RecorderConfig) -> Self {
        Self {
            config,
            keys: SyncKeys::new(),
            capture: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Start recording at host time `now` (seconds).
    ///
    /// `created` stamps the file; `name` defaults to one derived from it.
    pub fn start(
        &mut self,
        sim: &dyn SimulationView,
        name: Option<String>,
        now: f32,
        created: DateTime<Utc>,
    ) -> Result<&str> {
        if self.capture.is_some() {
            return Err(ReplayError::AlreadyRecording);
        }

        let world = self.config.world_state.then(|| {
            let mut differ = WorldStateDiffer::new();
            differ.capture_baseline(sim);
            differ
        });

        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_name(created));
        tracing::info!(name = %name, "recording started");

        let capture = self.capture.insert(Capture {
            name,
            start: now,
            replay: ReplayFile::new(created.timestamp()),
            pending_triggers: Vec::new(),
            world,
        });
        Ok(&capture.name)
    }

    /// Check if recording is active
    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    /// Name the current recording will be saved under
    pub fn name(&self) -> Option<&str> {
        self.capture.as_ref().map(|c| c.name.as_str())
    }

    /// Frames captured so far
    pub fn frame_count(&self) -> usize {
        self.capture.as_ref().map_or(0, |c| c.replay.frames.len())
    }

    /// Seconds recorded as of host time `now`
    pub fn elapsed(&self, now: f32) -> f32 {
        self.capture.as_ref().map_or(0.0, |c| now - c.start)
    }

    /// Capture one tick of live state
    pub fn sample(&mut self, sim: &dyn SimulationView, now: f32) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        let Some(instances) = sim.instances() else {
            return;
        };

        let time = now - capture.start;
        if let Some(last) = capture.replay.frames.last()
            && time <= last.time
        {
            tracing::trace!(time, last = last.time, "dropping non-increasing sample");
            return;
        }

        let mut frame = ReplayFrame::new(time);
        for id in instances {
            if !sim.has_capability(id, Capability::Character) {
                continue;
            }
            if let Some(snapshot) = snapshot(&self.keys, sim, id) {
                frame.entities.push(snapshot);
            }
        }
        capture.replay.frames.push(frame);

        if let Some(world) = capture.world.as_mut() {
            world.scan(sim, time);
        }
    }

    /// Record a one-shot animation trigger fired on a live entity
    pub fn capture_trigger(&mut self, id: EntityId, name: &str, now: f32) {
        let Some(capture) = self.capture.as_mut() else {
            return;
        };
        capture.pending_triggers.push(TriggerEvent {
            time: now - capture.start,
            id,
            name: name.to_string(),
        });
    }

    /// Stop recording and finalize the replay, optionally under a new name
    pub fn stop(&mut self, now: f32, rename: Option<String>) -> Result<FinishedRecording> {
        let Some(mut capture) = self.capture.take() else {
            return Err(ReplayError::NotRecording);
        };

        let mut replay = std::mem::take(&mut capture.replay);
        replay.duration = (now - capture.start).max(0.0);
        replay.triggers.append(&mut capture.pending_triggers);
        // Buffered in arrival order; keep the file sorted for the playback cursor
        replay.triggers.sort_by(|a, b| a.time.total_cmp(&b.time));
        if let Some(world) = capture.world.as_mut() {
            replay.world_events = world.take_events();
        }

        let name = rename
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(capture.name);

        tracing::info!(
            name = %name,
            frames = replay.frames.len(),
            duration = replay.duration,
            triggers = replay.triggers.len(),
            world_events = replay.world_events.len(),
            "recording stopped"
        );

        Ok(FinishedRecording { name, replay })
    }

    /// Drop the current recording without producing a file
    pub fn abort(&mut self) {
        if let Some(capture) = self.capture.take() {
            tracing::warn!(name = %capture.name, "recording discarded");
        }
    }
}

/// Default recording name, `replay_YYYYMMDD_HHMMSS` in local time
pub fn default_name(created: DateTime<Utc>) -> String {
    created
        .with_timezone(&Local)
        .format("replay_%Y%m%d_%H%M%S")
        .to_string()
}

fn snapshot(keys: &SyncKeys, sim: &dyn SimulationView, id: EntityId) -> Option<EntitySnapshot> {
    let transform = sim.transform(id)?;

    let mut flags = AnimFlags::empty();
    for (flag, key) in keys.flags {
        flags.set(flag, sim.synced_bool(id, key));
    }

    Some(EntitySnapshot {
        id,
        prefab_hash: sim.prefab_hash(id),
        position: transform.position,
        rotation: transform.rotation,
        anim: AnimState {
            forward_speed: sim.synced_float(id, keys.forward_speed, 0.0),
            sideway_speed: sim.synced_float(id, keys.sideway_speed, 0.0),
            turn_speed: sim.synced_float(id, keys.turn_speed, 0.0),
            flags,
            state_f: sim.synced_int(id, keys.state_f, 0),
            state_i: sim.synced_int(id, keys.state_i, 0),
        },
        equipment: sim.equipment(id),
    })
}
