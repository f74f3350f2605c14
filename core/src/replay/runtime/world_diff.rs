//! World-state differ
//!
//! Watches structural pieces while recording and emits [`WorldEvent`]s only
//! when something observable changed. The host's per-object revision counter
//! gates the expensive field comparison.

use glam::Vec3;
use hashbrown::{HashMap, HashSet};

use crate::host::{Capability, SimulationView, health_fraction};
use crate::replay::types::{EntityId, WorldEvent, WorldEventKind, euler_degrees};

/// Last observed appearance of a tracked piece
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrackedPiece {
    prefab_hash: i32,
    position: Vec3,
    /// Euler degrees
    rotation: Vec3,
    revision: u32,
    health: f32,
    state: i32,
}

impl TrackedPiece {
    fn observe(sim: &dyn SimulationView, id: EntityId) -> Option<Self> {
        let transform = sim.transform(id)?;
        Some(Self {
            prefab_hash: sim.prefab_hash(id),
            position: transform.position,
            rotation: euler_degrees(transform.rotation),
            revision: sim.revision(id),
            health: health_fraction(sim, id),
            state: sim.piece_state(id),
        })
    }

    fn event(&self, time: f32, kind: WorldEventKind, id: EntityId) -> WorldEvent {
        WorldEvent {
            time,
            kind,
            id,
            prefab_hash: self.prefab_hash,
            position: self.position,
            rotation: self.rotation,
            health: self.health,
            state: self.state,
        }
    }
}

/// Revision-gated change detector for structural pieces
#[derive(Debug, Default)]
pub struct WorldStateDiffer {
    tracked: HashMap<EntityId, TrackedPiece>,
    /// Instances found not to be pieces; never examined again
    rejected: HashSet<EntityId>,
    events: Vec<WorldEvent>,
}

impl WorldStateDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking every piece already in the world without emitting events
    pub fn capture_baseline(&mut self, sim: &dyn SimulationView) {
        let Some(instances) = sim.instances() else {
            return;
        };

        for id in instances {
            if !sim.has_capability(id, Capability::Piece) {
                self.rejected.insert(id);
                continue;
            }
            if let Some(piece) = TrackedPiece::observe(sim, id) {
                self.tracked.insert(id, piece);
            }
        }

        tracing::debug!(
            tracked = self.tracked.len(),
            rejected = self.rejected.len(),
            "world baseline captured"
        );
    }

    /// Compare the live world against the cache and record changes at `time`
    pub fn scan(&mut self, sim: &dyn SimulationView, time: f32) {
        let (Some(instances), Some(existing)) = (sim.instances(), sim.existing()) else {
            return;
        };

        for id in instances {
            if self.rejected.contains(&id) {
                continue;
            }

            match self.tracked.get(&id).copied() {
                Some(cached) => {
                    let revision = sim.revision(id);
                    if revision == cached.revision {
                        continue;
                    }
                    let Some(current) = TrackedPiece::observe(sim, id) else {
                        continue;
                    };
                    let changed = !approx_eq(current.health, cached.health)
                        || current.state != cached.state;
                    if changed {
                        self.events
                            .push(current.event(time, WorldEventKind::StateChanged, id));
                        self.tracked.insert(id, current);
                    } else {
                        // Position-only edits refresh the cache silently
                        self.tracked.insert(
                            id,
                            TrackedPiece {
                                health: cached.health,
                                state: cached.state,
                                ..current
                            },
                        );
                    }
                }
                None => {
                    if !sim.has_capability(id, Capability::Piece) {
                        self.rejected.insert(id);
                        continue;
                    }
                    let Some(piece) = TrackedPiece::observe(sim, id) else {
                        continue;
                    };
                    tracing::trace!(
                        user_id = id.user_id,
                        local_id = id.local_id,
                        prefab_hash = piece.prefab_hash,
                        "piece created"
                    );
                    self.events.push(piece.event(time, WorldEventKind::Created, id));
                    self.tracked.insert(id, piece);
                }
            }
        }

        let mut gone: Vec<EntityId> = self
            .tracked
            .keys()
            .filter(|id| !existing.contains(*id))
            .copied()
            .collect();
        gone.sort_unstable();

        for id in gone {
            if let Some(last) = self.tracked.remove(&id) {
                self.events.push(last.event(time, WorldEventKind::Destroyed, id));
            }
        }
    }

    /// Events recorded so far, in time order
    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.tracked.contains_key(&id)
    }

    /// Hand over the recorded events, leaving the cache in place
    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Float equality tolerant to representation noise
pub(crate) fn approx_eq(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}
