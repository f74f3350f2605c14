//! Core types for the replay system
//!
//! In-memory model of a recording: per-tick entity snapshots, one-shot
//! animation triggers and structural world events. The binary format
//! (`.valreplay`) is a direct serialization of [`ReplayFile`].

use std::fmt;

use glam::{EulerRot, Quat, Vec3};
use xxhash_rust::xxh3::xxh3_64;

/// Magic tag at the start of every replay file
pub const MAGIC: [u8; 4] = *b"VRPL";

/// Current binary format version.
///
/// History:
/// - v1: frames and triggers only
/// - v2: adds the world event section
/// - v3: adds the per-entity equipment block
pub const FORMAT_VERSION: i32 = 3;

/// File suffix for saved replays (without the dot)
pub const REPLAY_EXTENSION: &str = "valreplay";

/// Salt added to animation parameter hashes when reading synchronized state.
///
/// Keeps animation keys from colliding with unrelated synchronized values.
pub const SYNC_SALT: i32 = 438_569;

/// Stable identity of a simulated object.
///
/// Unique across the whole simulation and stable for the object's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EntityId {
    /// Owning peer
    pub user_id: i64,
    /// Per-peer object counter
    pub local_id: u32,
}

impl EntityId {
    pub const fn new(user_id: i64, local_id: u32) -> Self {
        Self { user_id, local_id }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.local_id)
    }
}

bitflags::bitflags! {
    /// Animation booleans packed into one byte (bits 0-6)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimFlags: u8 {
        const IN_WATER = 1 << 0;
        const ON_GROUND = 1 << 1;
        const ENCUMBERED = 1 << 2;
        const FLYING = 1 << 3;
        const FALLING = 1 << 4;
        const CROUCHING = 1 << 5;
        const BLOCKING = 1 << 6;
    }
}

impl AnimFlags {
    /// Each flag paired with the animation parameter it drives
    pub const PARAMS: [(AnimFlags, AnimParam); 7] = [
        (AnimFlags::IN_WATER, AnimParam::InWater),
        (AnimFlags::ON_GROUND, AnimParam::OnGround),
        (AnimFlags::ENCUMBERED, AnimParam::Encumbered),
        (AnimFlags::FLYING, AnimParam::Flying),
        (AnimFlags::FALLING, AnimParam::Falling),
        (AnimFlags::CROUCHING, AnimParam::Crouching),
        (AnimFlags::BLOCKING, AnimParam::Blocking),
    ];
}

/// Named animation parameters captured from live entities and replayed on ghosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimParam {
    ForwardSpeed,
    SidewaySpeed,
    TurnSpeed,
    InWater,
    OnGround,
    Encumbered,
    Flying,
    Falling,
    Crouching,
    Blocking,
    StateF,
    StateI,
}

impl AnimParam {
    /// Parameter name as the animation layer knows it
    pub fn name(self) -> &'static str {
        match self {
            Self::ForwardSpeed => "forward_speed",
            Self::SidewaySpeed => "sideway_speed",
            Self::TurnSpeed => "turn_speed",
            Self::InWater => "inWater",
            Self::OnGround => "onGround",
            Self::Encumbered => "encumbered",
            Self::Flying => "flying",
            Self::Falling => "falling",
            Self::Crouching => "crouching",
            Self::Blocking => "blocking",
            Self::StateF => "statef",
            Self::StateI => "statei",
        }
    }

    /// Stable 32-bit hash of the parameter name
    pub fn hash(self) -> i32 {
        xxh3_64(self.name().as_bytes()) as i32
    }

    /// Key of this parameter in an entity's synchronized state store
    pub fn sync_key(self) -> i32 {
        SYNC_SALT.wrapping_add(self.hash())
    }
}

/// Animation state of one entity at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimState {
    pub forward_speed: f32,
    pub sideway_speed: f32,
    pub turn_speed: f32,
    pub flags: AnimFlags,
    pub state_f: i32,
    pub state_i: i32,
}

impl AnimState {
    /// Blend two states at factor `t`.
    ///
    /// Speeds are interpolated; flags and integer states are discrete and
    /// come from whichever side is nearer (`t >= 0.5` picks `other`).
    pub fn blend(&self, other: &AnimState, t: f32) -> AnimState {
        let nearer = if t < 0.5 { self } else { other };
        AnimState {
            forward_speed: lerp(self.forward_speed, other.forward_speed, t),
            sideway_speed: lerp(self.sideway_speed, other.sideway_speed, t),
            turn_speed: lerp(self.turn_speed, other.turn_speed, t),
            flags: nearer.flags,
            state_f: nearer.state_f,
            state_i: nearer.state_i,
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Equipment visuals of an entity that carries gear.
///
/// Empty strings mark unset slots.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Equipment {
    pub left_item: String,
    pub left_item_variant: i32,
    pub right_item: String,
    pub chest_item: String,
    pub leg_item: String,
    pub helmet_item: String,
    pub shoulder_item: String,
    pub shoulder_item_variant: i32,
    pub utility_item: String,
    pub trinket_item: String,
    pub beard_item: String,
    pub hair_item: String,
    pub left_back_item: String,
    pub left_back_item_variant: i32,
    pub right_back_item: String,
}

/// Full observable state of one mobile entity at one recorded instant
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    /// Kind of object to instantiate for a ghost
    pub prefab_hash: i32,
    pub position: Vec3,
    /// Unit quaternion
    pub rotation: Quat,
    pub anim: AnimState,
    /// Present only for entities that carry equipment
    pub equipment: Option<Equipment>,
}

impl EntitySnapshot {
    pub fn has_equipment(&self) -> bool {
        self.equipment.is_some()
    }
}

/// One-shot animation trigger fired on a live entity during recording
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    /// Seconds from recording start
    pub time: f32,
    pub id: EntityId,
    pub name: String,
}

/// Kind of structural change recorded for a piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WorldEventKind {
    Created = 0,
    Destroyed = 1,
    StateChanged = 2,
}

impl WorldEventKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Created),
            1 => Some(Self::Destroyed),
            2 => Some(Self::StateChanged),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Destroyed => "destroyed",
            Self::StateChanged => "state-changed",
        }
    }
}

/// Structural change to a non-mobile piece
#[derive(Debug, Clone, PartialEq)]
pub struct WorldEvent {
    /// Seconds from recording start
    pub time: f32,
    pub kind: WorldEventKind,
    pub id: EntityId,
    pub prefab_hash: i32,
    pub position: Vec3,
    /// Euler angles in degrees (not a quaternion, unlike mobile entities)
    pub rotation: Vec3,
    /// Remaining health, 0..=1
    pub health: f32,
    /// Discrete piece state (door open/closed, ...)
    pub state: i32,
}

impl WorldEvent {
    pub fn rotation_quat(&self) -> Quat {
        quat_from_euler_degrees(self.rotation)
    }
}

/// All mobile entities observed during one tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReplayFrame {
    /// Seconds from recording start
    pub time: f32,
    pub entities: Vec<EntitySnapshot>,
}

impl ReplayFrame {
    pub fn new(time: f32) -> Self {
        Self {
            time,
            entities: Vec::new(),
        }
    }

    pub fn find(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// Complete recording (in-memory representation)
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayFile {
    /// Format version the file was read with (new files use [`FORMAT_VERSION`])
    pub version: i32,
    /// Creation time, seconds since the Unix epoch
    pub timestamp: i64,
    /// Total length in seconds
    pub duration: f32,
    /// Strictly increasing in time
    pub frames: Vec<ReplayFrame>,
    /// Non-decreasing in time
    pub triggers: Vec<TriggerEvent>,
    /// Non-decreasing in time
    pub world_events: Vec<WorldEvent>,
}

impl Default for ReplayFile {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ReplayFile {
    /// Create an empty recording stamped with `timestamp`
    pub fn new(timestamp: i64) -> Self {
        Self {
            version: FORMAT_VERSION,
            timestamp,
            duration: 0.0,
            frames: Vec::new(),
            triggers: Vec::new(),
            world_events: Vec::new(),
        }
    }

    /// Total number of entity snapshots across all frames
    pub fn snapshot_count(&self) -> usize {
        self.frames.iter().map(|f| f.entities.len()).sum()
    }

    pub fn has_world_events(&self) -> bool {
        !self.world_events.is_empty()
    }

    /// Number of world events of the given kind
    pub fn world_event_count(&self, kind: WorldEventKind) -> usize {
        self.world_events.iter().filter(|e| e.kind == kind).count()
    }
}

/// Discrete wear tier shown for a piece's health fraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthTier {
    /// Above 0.75
    New,
    /// Above 0.25 up to 0.75
    Worn,
    /// 0.25 and below
    Broken,
}

impl HealthTier {
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction > 0.75 {
            Self::New
        } else if fraction > 0.25 {
            Self::Worn
        } else {
            Self::Broken
        }
    }
}

/// Euler angles (degrees, Y-X-Z order) of a rotation
pub fn euler_degrees(rotation: Quat) -> Vec3 {
    let (y, x, z) = rotation.to_euler(EulerRot::YXZ);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Rotation from Euler angles in degrees (Y-X-Z order)
pub fn quat_from_euler_degrees(euler: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        euler.y.to_radians(),
        euler.x.to_radians(),
        euler.z.to_radians(),
    )
}
