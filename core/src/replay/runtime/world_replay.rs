//! World-state replayer
//!
//! Replays recorded structural changes on top of the present-day world.
//! At initialization each recorded piece is put in one of three buckets:
//!
//! - **destroyed-only**: gone now but recorded as destroyed; a world ghost
//!   stands in for it from the start until its `Destroyed` event
//! - **created-only**: created during the recording and still standing; the
//!   live object is hidden until its `Created` event spawns a ghost
//! - everything else stays untouched until a `StateChanged` event targets it
//!
//! Every override is reversible. [`WorldStateReplayer::restore_all`] undoes
//! all of them and [`WorldStateReplayer::seek_to`] rebuilds from scratch.

use hashbrown::{HashMap, HashSet};

use crate::host::{Effect, Presentation, SimulationView, VisualTarget, health_fraction};
use crate::replay::runtime::ghosts::{GhostKind, GhostRegistry};
use crate::replay::types::{EntityId, HealthTier, WorldEvent, WorldEventKind};

/// True visual state of a live object, cached before its first override
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginalVisual {
    pub health: f32,
    pub state: i32,
}

/// Event-driven replayer for structural pieces
#[derive(Debug, Default)]
pub struct WorldStateReplayer {
    play_effects: bool,
    cursor: usize,
    /// Live instances at initialization
    live: HashSet<EntityId>,
    created_only: HashSet<EntityId>,
    destroyed_only: HashSet<EntityId>,
    hidden: HashSet<EntityId>,
    overridden: HashMap<EntityId, OriginalVisual>,
    /// World ghosts spawned by this replayer
    ghosts: HashSet<EntityId>,
}

impl WorldStateReplayer {
    pub fn new(play_effects: bool) -> Self {
        Self {
            play_effects,
            ..Self::default()
        }
    }

    /// Categorize recorded pieces against the live world and set up the
    /// starting overrides
    pub fn initialize(
        &mut self,
        events: &[WorldEvent],
        registry: &mut GhostRegistry,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        self.cursor = 0;
        self.created_only.clear();
        self.destroyed_only.clear();
        self.hidden.clear();
        self.overridden.clear();
        self.ghosts.clear();

        self.live = sim
            .instances()
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();
        let existing = sim.existing().unwrap_or_else(|| {
            tracing::warn!("object index unavailable, using loaded instances as existence set");
            self.live.clone()
        });

        let mut has_created = HashSet::new();
        let mut has_destroyed = HashSet::new();
        for event in events {
            match event.kind {
                WorldEventKind::Created => {
                    has_created.insert(event.id);
                }
                WorldEventKind::Destroyed => {
                    has_destroyed.insert(event.id);
                }
                WorldEventKind::StateChanged => {}
            }
        }

        // A Created event alone does not disqualify: pieces that stream in
        // during recording are reported as created too.
        self.destroyed_only = has_destroyed
            .iter()
            .filter(|id| !existing.contains(*id))
            .copied()
            .collect();

        self.created_only = has_created
            .iter()
            .filter(|id| !has_destroyed.contains(*id) && existing.contains(*id))
            .copied()
            .collect();

        let mut hide: Vec<EntityId> = self
            .created_only
            .iter()
            .filter(|id| self.live.contains(*id))
            .copied()
            .collect();
        hide.sort_unstable();
        for id in hide {
            present.set_live_visible(id, false);
            self.hidden.insert(id);
        }

        // Seed each destroyed-only piece from its first recorded appearance
        for event in events {
            if !self.destroyed_only.contains(&event.id) || self.ghosts.contains(&event.id) {
                continue;
            }
            let spawned = registry.get_or_create(
                present,
                event.id,
                GhostKind::World,
                event.prefab_hash,
                event.position,
                event.rotation_quat(),
            );
            if spawned.is_some() {
                self.ghosts.insert(event.id);
                registry.apply_visual_state(
                    present,
                    event.id,
                    HealthTier::from_fraction(event.health),
                    event.state,
                );
            } else {
                // Retried on a later event for the same piece, if any
                tracing::debug!(
                    user_id = event.id.user_id,
                    local_id = event.id.local_id,
                    "no ghost for destroyed piece"
                );
            }
        }

        tracing::debug!(
            events = events.len(),
            created = has_created.len(),
            destroyed = has_destroyed.len(),
            destroyed_only = self.destroyed_only.len(),
            created_only = self.created_only.len(),
            "world replay initialized"
        );
    }

    /// Apply every event with `time <= now` not yet applied
    pub fn update(
        &mut self,
        events: &[WorldEvent],
        now: f32,
        registry: &mut GhostRegistry,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        while let Some(event) = events.get(self.cursor) {
            if event.time > now {
                break;
            }
            self.apply(event, registry, sim, present);
            self.cursor += 1;
        }
    }

    /// Tear everything down, then rebuild and replay up to `time`
    pub fn seek_to(
        &mut self,
        events: &[WorldEvent],
        time: f32,
        registry: &mut GhostRegistry,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        self.restore_all(registry, sim, present);
        self.initialize(events, registry, sim, present);
        self.update(events, time, registry, sim, present);
    }

    /// Remove world ghosts, unhide hidden objects and restore overridden ones
    pub fn restore_all(
        &mut self,
        registry: &mut GhostRegistry,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        for id in self.ghosts.drain() {
            registry.remove(present, id);
        }

        let live_now: HashSet<EntityId> = sim
            .instances()
            .map(|ids| ids.into_iter().collect())
            .unwrap_or_default();

        let mut hidden: Vec<EntityId> = self.hidden.drain().collect();
        hidden.sort_unstable();
        for id in hidden {
            if live_now.contains(&id) {
                present.set_live_visible(id, true);
            }
        }

        let mut overridden: Vec<(EntityId, OriginalVisual)> = self.overridden.drain().collect();
        overridden.sort_unstable_by_key(|(id, _)| *id);
        for (id, original) in overridden {
            if live_now.contains(&id) {
                present.apply_visual_state(
                    VisualTarget::Live(id),
                    HealthTier::from_fraction(original.health),
                    original.state,
                );
            }
        }
    }

    fn apply(
        &mut self,
        event: &WorldEvent,
        registry: &mut GhostRegistry,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        let id = event.id;
        let tier = HealthTier::from_fraction(event.health);
        let rotation = event.rotation_quat();

        match event.kind {
            WorldEventKind::Created => {
                let spawned = registry.get_or_create(
                    present,
                    id,
                    GhostKind::World,
                    event.prefab_hash,
                    event.position,
                    rotation,
                );
                if spawned.is_some() {
                    self.ghosts.insert(id);
                    registry.apply_visual_state(present, id, tier, event.state);
                    if self.play_effects {
                        registry.play_effect(
                            present,
                            id,
                            Effect::Placement,
                            event.position,
                            rotation,
                        );
                    }
                }
            }
            WorldEventKind::Destroyed => {
                if self.play_effects {
                    registry.play_effect(
                        present,
                        id,
                        Effect::Destruction,
                        event.position,
                        rotation,
                    );
                }
                if self.ghosts.remove(&id) {
                    registry.remove(present, id);
                }
            }
            WorldEventKind::StateChanged => {
                if self.ghosts.contains(&id)
                    && registry.apply_visual_state(present, id, tier, event.state)
                {
                    return;
                }
                if self.live.contains(&id) {
                    self.overridden.entry(id).or_insert_with(|| OriginalVisual {
                        health: health_fraction(sim, id),
                        state: sim.piece_state(id),
                    });
                    present.apply_visual_state(VisualTarget::Live(id), tier, event.state);
                }
            }
        }
    }

    /// Pieces gone now that were destroyed during the recording
    pub fn destroyed_only(&self) -> &HashSet<EntityId> {
        &self.destroyed_only
    }

    /// Pieces created during the recording that still stand
    pub fn created_only(&self) -> &HashSet<EntityId> {
        &self.created_only
    }

    pub fn is_hidden(&self, id: EntityId) -> bool {
        self.hidden.contains(&id)
    }

    /// Cached baseline of an overridden live object
    pub fn original_visual(&self, id: EntityId) -> Option<OriginalVisual> {
        self.overridden.get(&id).copied()
    }

    pub fn has_ghost(&self, id: EntityId) -> bool {
        self.ghosts.contains(&id)
    }

    pub fn ghost_count(&self) -> usize {
        self.ghosts.len()
    }

    /// Index of the next event to apply
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
