//! Ghost registry
//!
//! Owns every proxy object shown during playback, keyed by entity identity.
//! Mobile ghosts (driven by frame snapshots) and world ghosts (driven by
//! world events) share one map; they only differ in which behaviour
//! components are switched off when the proxy is instantiated.

use glam::{Quat, Vec3};
use hashbrown::{HashMap, HashSet};

use crate::host::{
    AnimatorHandle, Component, Effect, Presentation, ProxyHandle, SpawnedProxy, VisualTarget,
};
use crate::replay::types::{AnimFlags, AnimParam, AnimState, EntityId, EntitySnapshot, HealthTier};

/// Which kind of recorded object a ghost stands in for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GhostKind {
    /// Character or creature replayed from frame snapshots
    Mobile,
    /// Structural piece replayed from world events
    World,
}

impl GhostKind {
    /// Components turned off on a freshly instantiated proxy
    pub fn disabled_components(self) -> &'static [Component] {
        match self {
            Self::Mobile => &[
                Component::BaseAi,
                Component::MonsterAi,
                Component::AnimalAi,
                Component::TransformSync,
                Component::AnimationSync,
                Component::CharacterDrop,
            ],
            Self::World => &[Component::TransformSync, Component::WearAndTear],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct GhostRecord {
    kind: GhostKind,
    spawned: SpawnedProxy,
}

/// Proxy lifecycle for one playback session
#[derive(Debug, Default)]
pub struct GhostRegistry {
    ghosts: HashMap<EntityId, GhostRecord>,
    /// Prefab hashes already reported as unresolvable
    unresolved: HashSet<i32>,
}

impl GhostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.ghosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ghosts.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ghosts.contains_key(&id)
    }

    /// Kind of the ghost registered for `id`
    pub fn kind(&self, id: EntityId) -> Option<GhostKind> {
        self.ghosts.get(&id).map(|r| r.kind)
    }

    /// Live proxy for `id`, ignoring stale records
    pub fn proxy(&self, present: &dyn Presentation, id: EntityId) -> Option<ProxyHandle> {
        self.live(present, id).map(|r| r.spawned.proxy)
    }

    /// Return the live proxy for `id`, instantiating one if needed.
    ///
    /// A record whose proxy was torn down outside the registry is evicted and
    /// replaced in the same call. Returns `None` when the prefab hash does not
    /// resolve to a template; the caller skips the entity for this tick.
    pub fn get_or_create(
        &mut self,
        present: &mut dyn Presentation,
        id: EntityId,
        kind: GhostKind,
        prefab_hash: i32,
        position: Vec3,
        rotation: Quat,
    ) -> Option<ProxyHandle> {
        if let Some(record) = self.ghosts.get(&id) {
            if present.is_alive(record.spawned.proxy) {
                return Some(record.spawned.proxy);
            }
            tracing::debug!(
                user_id = id.user_id,
                local_id = id.local_id,
                "ghost proxy destroyed externally, recreating"
            );
            self.ghosts.remove(&id);
        }

        let Some(template) = present.resolve_template(prefab_hash) else {
            if self.unresolved.insert(prefab_hash) {
                tracing::warn!(prefab_hash, "prefab not found, entity will not be shown");
            } else {
                tracing::trace!(prefab_hash, "prefab still unresolved");
            }
            return None;
        };

        let spawned = present.instantiate(template, position, rotation, kind.disabled_components());
        self.ghosts.insert(id, GhostRecord { kind, spawned });
        Some(spawned.proxy)
    }

    /// Move a ghost and drive its animation parameters
    pub fn update(
        &mut self,
        present: &mut dyn Presentation,
        id: EntityId,
        position: Vec3,
        rotation: Quat,
        anim: &AnimState,
    ) {
        let Some(record) = self.live(present, id) else {
            return;
        };
        let spawned = record.spawned;

        present.set_pose(spawned.proxy, position, rotation);
        if let Some(animator) = spawned.animator {
            drive_animator(present, animator, anim);
        }
    }

    /// Copy a snapshot's equipment onto the ghost's equipment visuals
    pub fn update_equipment(
        &mut self,
        present: &mut dyn Presentation,
        id: EntityId,
        snapshot: &EntitySnapshot,
    ) {
        let Some(gear) = &snapshot.equipment else {
            return;
        };
        let Some(handle) = self.live(present, id).and_then(|r| r.spawned.equipment) else {
            return;
        };
        present.set_equipment(handle, gear);
    }

    /// Fire a one-shot animation trigger on the ghost
    pub fn fire_trigger(&mut self, present: &mut dyn Presentation, id: EntityId, name: &str) {
        if let Some(animator) = self.live(present, id).and_then(|r| r.spawned.animator) {
            present.set_trigger(animator, name);
        }
    }

    /// Show a wear tier and discrete state on the ghost; `false` if there is no live ghost
    pub fn apply_visual_state(
        &mut self,
        present: &mut dyn Presentation,
        id: EntityId,
        tier: HealthTier,
        state: i32,
    ) -> bool {
        match self.proxy(present, id) {
            Some(proxy) => {
                present.apply_visual_state(VisualTarget::Ghost(proxy), tier, state);
                true
            }
            None => false,
        }
    }

    /// Play an effect at the given pose using the ghost's own effect references
    pub fn play_effect(
        &mut self,
        present: &mut dyn Presentation,
        id: EntityId,
        effect: Effect,
        position: Vec3,
        rotation: Quat,
    ) {
        if let Some(proxy) = self.proxy(present, id) {
            present.play_effect(proxy, effect, position, rotation);
        }
    }

    /// Destroy and forget the ghost for `id`; returns whether a record existed
    pub fn remove(&mut self, present: &mut dyn Presentation, id: EntityId) -> bool {
        match self.ghosts.remove(&id) {
            Some(record) => {
                if present.is_alive(record.spawned.proxy) {
                    present.destroy(record.spawned.proxy);
                }
                true
            }
            None => false,
        }
    }

    /// Destroy every ghost
    pub fn destroy_all(&mut self, present: &mut dyn Presentation) {
        let count = self.ghosts.len();
        for (_, record) in self.ghosts.drain() {
            if present.is_alive(record.spawned.proxy) {
                present.destroy(record.spawned.proxy);
            }
        }
        if count > 0 {
            tracing::debug!(count, "destroyed all ghosts");
        }
    }

    fn live(&self, present: &dyn Presentation, id: EntityId) -> Option<&GhostRecord> {
        self.ghosts
            .get(&id)
            .filter(|r| present.is_alive(r.spawned.proxy))
    }
}

fn drive_animator(present: &mut dyn Presentation, animator: AnimatorHandle, anim: &AnimState) {
    present.set_float(animator, AnimParam::ForwardSpeed, anim.forward_speed);
    present.set_float(animator, AnimParam::SidewaySpeed, anim.sideway_speed);
    present.set_float(animator, AnimParam::TurnSpeed, anim.turn_speed);
    for (flag, param) in AnimFlags::PARAMS {
        present.set_bool(animator, param, anim.flags.contains(flag));
    }
    present.set_int(animator, AnimParam::StateF, anim.state_f);
    present.set_int(animator, AnimParam::StateI, anim.state_i);
}
