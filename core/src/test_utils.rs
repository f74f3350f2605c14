//! Shared test utilities for integration and unit tests
//!
//! [`FakeWorld`] stands in for the host simulation and [`FakeStage`] for its
//! render layer. Both are plain in-memory maps that tests poke directly.

use glam::{Quat, Vec3};
use hashbrown::{HashMap, HashSet};

use crate::host::{
    AnimatorHandle, Capability, Component, Effect, EquipmentHandle, Presentation, ProxyHandle,
    SimulationView, SpawnedProxy, TemplateId, Transform, VisualTarget,
};
use crate::replay::types::{AnimParam, EntityId, Equipment, HealthTier};

// ============================================================================
// Fake Simulation
// ============================================================================

#[derive(Debug, Clone)]
struct FakeObject {
    prefab_hash: i32,
    transform: Transform,
    capabilities: HashSet<Capability>,
    instanced: bool,
    floats: HashMap<i32, f32>,
    bools: HashMap<i32, bool>,
    ints: HashMap<i32, i32>,
    equipment: Option<Equipment>,
    max_health: Option<f32>,
    health: Option<f32>,
    state: i32,
    revision: u32,
}

impl FakeObject {
    fn new(prefab_hash: i32, position: Vec3, capability: Capability) -> Self {
        let mut capabilities = HashSet::new();
        capabilities.insert(capability);
        Self {
            prefab_hash,
            transform: Transform {
                position,
                rotation: Quat::IDENTITY,
            },
            capabilities,
            instanced: true,
            floats: HashMap::new(),
            bools: HashMap::new(),
            ints: HashMap::new(),
            equipment: None,
            max_health: None,
            health: None,
            state: 0,
            revision: 0,
        }
    }
}

/// In-memory simulation
#[derive(Debug)]
pub struct FakeWorld {
    objects: HashMap<EntityId, FakeObject>,
    index_available: bool,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorld {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            index_available: true,
        }
    }

    pub fn add_character(&mut self, id: EntityId, prefab_hash: i32, position: Vec3) {
        self.objects
            .insert(id, FakeObject::new(prefab_hash, position, Capability::Character));
    }

    pub fn add_piece(
        &mut self,
        id: EntityId,
        prefab_hash: i32,
        position: Vec3,
        max_health: Option<f32>,
    ) {
        let mut object = FakeObject::new(prefab_hash, position, Capability::Piece);
        object.max_health = max_health;
        self.objects.insert(id, object);
    }

    pub fn set_piece_state(&mut self, id: EntityId, state: i32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.state = state;
            object.revision += 1;
        }
    }

    pub fn set_health(&mut self, id: EntityId, health: f32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.health = Some(health);
            object.revision += 1;
        }
    }

    /// Change health without bumping the revision counter
    pub fn set_health_silently(&mut self, id: EntityId, health: f32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.health = Some(health);
        }
    }

    pub fn bump_revision(&mut self, id: EntityId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.revision += 1;
        }
    }

    pub fn move_object(&mut self, id: EntityId, position: Vec3, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.transform = Transform { position, rotation };
            object.revision += 1;
        }
    }

    /// Remove the object from the world entirely
    pub fn destroy(&mut self, id: EntityId) {
        self.objects.remove(&id);
    }

    /// Drop the local instance; the global index still knows the object
    pub fn unload(&mut self, id: EntityId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.instanced = false;
        }
    }

    pub fn grant_piece_marker(&mut self, id: EntityId) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.capabilities.insert(Capability::Piece);
        }
    }

    /// While unavailable, `instances` and `existing` report `None`
    pub fn set_index_available(&mut self, available: bool) {
        self.index_available = available;
    }

    pub fn set_synced_float(&mut self, id: EntityId, key: i32, value: f32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.floats.insert(key, value);
        }
    }

    pub fn set_synced_bool(&mut self, id: EntityId, key: i32, value: bool) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.bools.insert(key, value);
        }
    }

    pub fn set_synced_int(&mut self, id: EntityId, key: i32, value: i32) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.ints.insert(key, value);
        }
    }

    pub fn set_equipment(&mut self, id: EntityId, equipment: Equipment) {
        if let Some(object) = self.objects.get_mut(&id) {
            object.equipment = Some(equipment);
        }
    }

    fn instanced(&self, id: EntityId) -> Option<&FakeObject> {
        self.objects.get(&id).filter(|o| o.instanced)
    }
}

impl SimulationView for FakeWorld {
    fn instances(&self) -> Option<Vec<EntityId>> {
        if !self.index_available {
            return None;
        }
        let mut ids: Vec<EntityId> = self
            .objects
            .iter()
            .filter(|(_, o)| o.instanced)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Some(ids)
    }

    fn existing(&self) -> Option<HashSet<EntityId>> {
        if !self.index_available {
            return None;
        }
        Some(self.objects.keys().copied().collect())
    }

    fn prefab_hash(&self, id: EntityId) -> i32 {
        self.objects.get(&id).map_or(0, |o| o.prefab_hash)
    }

    fn transform(&self, id: EntityId) -> Option<Transform> {
        self.instanced(id).map(|o| o.transform)
    }

    fn has_capability(&self, id: EntityId, capability: Capability) -> bool {
        self.instanced(id)
            .is_some_and(|o| o.capabilities.contains(&capability))
    }

    fn synced_float(&self, id: EntityId, key: i32, default: f32) -> f32 {
        self.instanced(id)
            .and_then(|o| o.floats.get(&key).copied())
            .unwrap_or(default)
    }

    fn synced_bool(&self, id: EntityId, key: i32) -> bool {
        self.instanced(id)
            .and_then(|o| o.bools.get(&key).copied())
            .unwrap_or(false)
    }

    fn synced_int(&self, id: EntityId, key: i32, default: i32) -> i32 {
        self.instanced(id)
            .and_then(|o| o.ints.get(&key).copied())
            .unwrap_or(default)
    }

    fn equipment(&self, id: EntityId) -> Option<Equipment> {
        self.instanced(id).and_then(|o| o.equipment.clone())
    }

    fn max_health(&self, id: EntityId) -> Option<f32> {
        self.objects.get(&id).and_then(|o| o.max_health)
    }

    fn health(&self, id: EntityId) -> Option<f32> {
        self.objects.get(&id).and_then(|o| o.health)
    }

    fn piece_state(&self, id: EntityId) -> i32 {
        self.objects.get(&id).map_or(0, |o| o.state)
    }

    fn revision(&self, id: EntityId) -> u32 {
        self.objects.get(&id).map_or(0, |o| o.revision)
    }
}

// ============================================================================
// Fake Presentation
// ============================================================================

/// Every mutating call made against a [`FakeStage`], in order
#[derive(Debug, Clone, PartialEq)]
pub enum StageCall {
    Instantiate(ProxyHandle, TemplateId),
    Destroy(ProxyHandle),
    SetPose(ProxyHandle, Vec3, Quat),
    SetFloat(ProxyHandle, AnimParam, f32),
    SetBool(ProxyHandle, AnimParam, bool),
    SetInt(ProxyHandle, AnimParam, i32),
    Trigger(ProxyHandle, String),
    SetEquipment(ProxyHandle),
    Visual(VisualTarget, HealthTier, i32),
    PlayEffect(ProxyHandle, Effect),
    SetVisible(EntityId, bool),
}

#[derive(Debug, Clone, Default)]
struct FakeProxy {
    alive: bool,
    disabled: Vec<Component>,
    pose: Option<(Vec3, Quat)>,
    floats: HashMap<AnimParam, f32>,
    bools: HashMap<AnimParam, bool>,
    ints: HashMap<AnimParam, i32>,
    equipment: Option<Equipment>,
    triggers: Vec<String>,
}

/// In-memory render layer
#[derive(Debug, Default)]
pub struct FakeStage {
    /// Registered prefabs and whether their proxies carry equipment visuals
    templates: HashMap<i32, bool>,
    proxies: Vec<FakeProxy>,
    visuals: HashMap<VisualTarget, (HealthTier, i32)>,
    live_visible: HashMap<EntityId, bool>,
    calls: Vec<StageCall>,
}

impl FakeStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_template(&mut self, prefab_hash: i32) {
        self.templates.entry(prefab_hash).or_insert(false);
    }

    pub fn set_equipment_capable(&mut self, prefab_hash: i32, capable: bool) {
        self.templates.insert(prefab_hash, capable);
    }

    pub fn instantiated_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn alive_count(&self) -> usize {
        self.proxies.iter().filter(|p| p.alive).count()
    }

    pub fn disabled_components(&self, proxy: ProxyHandle) -> Vec<Component> {
        self.get(proxy).map(|p| p.disabled.clone()).unwrap_or_default()
    }

    /// Tear a proxy down behind the registry's back
    pub fn kill(&mut self, proxy: ProxyHandle) {
        if let Some(p) = self.get_mut(proxy) {
            p.alive = false;
        }
    }

    pub fn pose(&self, proxy: ProxyHandle) -> Option<(Vec3, Quat)> {
        self.get(proxy).and_then(|p| p.pose)
    }

    pub fn anim_float(&self, proxy: ProxyHandle, param: AnimParam) -> Option<f32> {
        self.get(proxy).and_then(|p| p.floats.get(&param).copied())
    }

    pub fn anim_bool(&self, proxy: ProxyHandle, param: AnimParam) -> Option<bool> {
        self.get(proxy).and_then(|p| p.bools.get(&param).copied())
    }

    pub fn anim_int(&self, proxy: ProxyHandle, param: AnimParam) -> Option<i32> {
        self.get(proxy).and_then(|p| p.ints.get(&param).copied())
    }

    pub fn equipment(&self, proxy: ProxyHandle) -> Option<Equipment> {
        self.get(proxy).and_then(|p| p.equipment.clone())
    }

    pub fn triggers(&self, proxy: ProxyHandle) -> Vec<String> {
        self.get(proxy).map(|p| p.triggers.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> &[StageCall] {
        &self.calls
    }

    /// Last visibility set on a live object, if any
    pub fn live_visible(&self, id: EntityId) -> Option<bool> {
        self.live_visible.get(&id).copied()
    }

    /// Last wear tier and state applied to `target`
    pub fn visual(&self, target: VisualTarget) -> Option<(HealthTier, i32)> {
        self.visuals.get(&target).copied()
    }

    fn get(&self, proxy: ProxyHandle) -> Option<&FakeProxy> {
        self.proxies.get(proxy.0 as usize)
    }

    fn get_mut(&mut self, proxy: ProxyHandle) -> Option<&mut FakeProxy> {
        self.proxies.get_mut(proxy.0 as usize)
    }
}

impl Presentation for FakeStage {
    fn resolve_template(&self, prefab_hash: i32) -> Option<TemplateId> {
        self.templates
            .contains_key(&prefab_hash)
            .then_some(TemplateId(prefab_hash as u32 as u64))
    }

    fn instantiate(
        &mut self,
        template: TemplateId,
        position: Vec3,
        rotation: Quat,
        disable: &[Component],
    ) -> SpawnedProxy {
        let handle = self.proxies.len() as u64;
        let prefab_hash = template.0 as u32 as i32;
        let equipment_capable = self.templates.get(&prefab_hash).copied().unwrap_or(false);

        self.proxies.push(FakeProxy {
            alive: true,
            disabled: disable.to_vec(),
            pose: Some((position, rotation)),
            ..Default::default()
        });
        self.calls
            .push(StageCall::Instantiate(ProxyHandle(handle), template));

        SpawnedProxy {
            proxy: ProxyHandle(handle),
            animator: Some(AnimatorHandle(handle)),
            equipment: equipment_capable.then_some(EquipmentHandle(handle)),
        }
    }

    fn is_alive(&self, proxy: ProxyHandle) -> bool {
        self.get(proxy).is_some_and(|p| p.alive)
    }

    fn destroy(&mut self, proxy: ProxyHandle) {
        self.kill(proxy);
        self.calls.push(StageCall::Destroy(proxy));
    }

    fn set_pose(&mut self, proxy: ProxyHandle, position: Vec3, rotation: Quat) {
        if let Some(p) = self.get_mut(proxy) {
            p.pose = Some((position, rotation));
        }
        self.calls.push(StageCall::SetPose(proxy, position, rotation));
    }

    fn set_float(&mut self, animator: AnimatorHandle, param: AnimParam, value: f32) {
        let proxy = ProxyHandle(animator.0);
        if let Some(p) = self.get_mut(proxy) {
            p.floats.insert(param, value);
        }
        self.calls.push(StageCall::SetFloat(proxy, param, value));
    }

    fn set_bool(&mut self, animator: AnimatorHandle, param: AnimParam, value: bool) {
        let proxy = ProxyHandle(animator.0);
        if let Some(p) = self.get_mut(proxy) {
            p.bools.insert(param, value);
        }
        self.calls.push(StageCall::SetBool(proxy, param, value));
    }

    fn set_int(&mut self, animator: AnimatorHandle, param: AnimParam, value: i32) {
        let proxy = ProxyHandle(animator.0);
        if let Some(p) = self.get_mut(proxy) {
            p.ints.insert(param, value);
        }
        self.calls.push(StageCall::SetInt(proxy, param, value));
    }

    fn set_trigger(&mut self, animator: AnimatorHandle, name: &str) {
        let proxy = ProxyHandle(animator.0);
        if let Some(p) = self.get_mut(proxy) {
            p.triggers.push(name.to_string());
        }
        self.calls.push(StageCall::Trigger(proxy, name.to_string()));
    }

    fn set_equipment(&mut self, equipment: EquipmentHandle, gear: &Equipment) {
        let proxy = ProxyHandle(equipment.0);
        if let Some(p) = self.get_mut(proxy) {
            p.equipment = Some(gear.clone());
        }
        self.calls.push(StageCall::SetEquipment(proxy));
    }

    fn apply_visual_state(&mut self, target: VisualTarget, tier: HealthTier, state: i32) {
        self.visuals.insert(target, (tier, state));
        self.calls.push(StageCall::Visual(target, tier, state));
    }

    fn play_effect(
        &mut self,
        proxy: ProxyHandle,
        effect: Effect,
        _position: Vec3,
        _rotation: Quat,
    ) {
        self.calls.push(StageCall::PlayEffect(proxy, effect));
    }

    fn set_live_visible(&mut self, id: EntityId, visible: bool) {
        self.live_visible.insert(id, visible);
        self.calls.push(StageCall::SetVisible(id, visible));
    }
}
