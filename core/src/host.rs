//! Host collaborator interfaces
//!
//! The replay engine never reaches into the live simulation or the render
//! layer directly. The host implements [`SimulationView`] (read-only queries
//! against live state) and [`Presentation`] (proxy objects, effects and
//! visual overrides), and forwards animation triggers through
//! [`TriggerObserver`].

use glam::{Quat, Vec3};
use hashbrown::HashSet;

use crate::replay::types::{AnimParam, EntityId, Equipment, HealthTier};

/// Capability markers a live object may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Mobile, animated entity (captured every tick)
    Character,
    /// Structural piece (tracked by the world-state differ)
    Piece,
}

/// World-space pose of an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Read-only query surface of the host simulation
pub trait SimulationView {
    /// Objects with a local instance, or `None` while the object index is unavailable
    fn instances(&self) -> Option<Vec<EntityId>>;

    /// Every object the authoritative global index knows about, instantiated or not
    fn existing(&self) -> Option<HashSet<EntityId>>;

    fn prefab_hash(&self, id: EntityId) -> i32;

    fn transform(&self, id: EntityId) -> Option<Transform>;

    fn has_capability(&self, id: EntityId, capability: Capability) -> bool;

    /// Synchronized float by key (see [`AnimParam::sync_key`])
    fn synced_float(&self, id: EntityId, key: i32, default: f32) -> f32;

    fn synced_bool(&self, id: EntityId, key: i32) -> bool;

    fn synced_int(&self, id: EntityId, key: i32, default: i32) -> i32;

    /// Equipment visuals, if the object has an equipment capability
    fn equipment(&self, id: EntityId) -> Option<Equipment>;

    /// Maximum health, if the object is destructible
    fn max_health(&self, id: EntityId) -> Option<f32>;

    /// Current synchronized health; `None` means untouched (full)
    fn health(&self, id: EntityId) -> Option<f32>;

    /// Discrete piece state (door open/closed, ...)
    fn piece_state(&self, id: EntityId) -> i32;

    /// Monotonic per-object change counter
    fn revision(&self, id: EntityId) -> u32;
}

/// Remaining health of a piece as a fraction in `0..=1`.
///
/// Objects without destructibility, or with non-positive maximum health,
/// always report 1.
pub fn health_fraction(sim: &dyn SimulationView, id: EntityId) -> f32 {
    match sim.max_health(id) {
        Some(max) if max > 0.0 => {
            let current = sim.health(id).unwrap_or(max);
            (current / max).clamp(0.0, 1.0)
        }
        _ => 1.0,
    }
}

/// Instantiable template resolved from a prefab hash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(pub u64);

/// Render-layer handle of a proxy object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyHandle(pub u64);

/// Animation driver attached to a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimatorHandle(pub u64);

/// Equipment visual driver attached to a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EquipmentHandle(pub u64);

/// Behaviour components that must stay switched off on a ghost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    BaseAi,
    MonsterAi,
    AnimalAi,
    TransformSync,
    AnimationSync,
    CharacterDrop,
    /// Wear/damage behaviour of a piece (its visuals and effects stay usable)
    WearAndTear,
}

/// A freshly instantiated proxy and the drivers found on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedProxy {
    pub proxy: ProxyHandle,
    pub animator: Option<AnimatorHandle>,
    pub equipment: Option<EquipmentHandle>,
}

/// Object whose wear visuals are being set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualTarget {
    Ghost(ProxyHandle),
    /// Live object temporarily overridden during playback
    Live(EntityId),
}

/// One-shot effects played on world ghosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Placement,
    Destruction,
}

/// Render-layer surface used to show ghosts
pub trait Presentation {
    fn resolve_template(&self, prefab_hash: i32) -> Option<TemplateId>;

    /// Clone `template` at the given pose as a non-networked, kinematic,
    /// collider-less object with every component in `disable` switched off
    fn instantiate(
        &mut self,
        template: TemplateId,
        position: Vec3,
        rotation: Quat,
        disable: &[Component],
    ) -> SpawnedProxy;

    /// `false` once the proxy has been torn down, by anyone
    fn is_alive(&self, proxy: ProxyHandle) -> bool;

    fn destroy(&mut self, proxy: ProxyHandle);

    fn set_pose(&mut self, proxy: ProxyHandle, position: Vec3, rotation: Quat);

    fn set_float(&mut self, animator: AnimatorHandle, param: AnimParam, value: f32);

    fn set_bool(&mut self, animator: AnimatorHandle, param: AnimParam, value: bool);

    fn set_int(&mut self, animator: AnimatorHandle, param: AnimParam, value: i32);

    fn set_trigger(&mut self, animator: AnimatorHandle, name: &str);

    fn set_equipment(&mut self, equipment: EquipmentHandle, gear: &Equipment);

    /// Show the wear tier and set the integer animation state
    fn apply_visual_state(&mut self, target: VisualTarget, tier: HealthTier, state: i32);

    /// Play an effect using the proxy's own effect references
    fn play_effect(&mut self, proxy: ProxyHandle, effect: Effect, position: Vec3, rotation: Quat);

    /// Hide or reveal the local instance of a live object
    fn set_live_visible(&mut self, id: EntityId, visible: bool);
}

/// Receives one-shot animation triggers fired on live entities.
///
/// The host's animation layer calls this whenever a trigger fires.
pub trait TriggerObserver {
    /// `now` is host time in seconds
    fn on_trigger(&mut self, id: EntityId, name: &str, now: f32);
}
