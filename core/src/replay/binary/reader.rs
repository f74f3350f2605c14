//! Binary replay format reader
//!
//! Reads .valreplay files of any version up to [`FORMAT_VERSION`].
//! Optional sections are gated on the version field alone, never on
//! whether more bytes happen to follow.

use crate::replay::error::{ReplayError, Result};
use crate::replay::types::*;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};
use std::io::Read;

/// Upper bound on speculative preallocation from untrusted counts
const MAX_PREALLOC: usize = 4096;

/// Reader for binary replay format
pub struct BinaryReader<R: Read> {
    reader: R,
}

impl<R: Read> BinaryReader<R> {
    /// Create a new binary reader
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read a complete replay from the input
    pub fn read_replay(&mut self) -> Result<ReplayFile> {
        let mut magic = [0u8; 4];
        self.reader
            .read_exact(&mut magic)
            .map_err(ReplayError::from_read)?;
        if magic != MAGIC {
            return Err(ReplayError::corrupt(format!(
                "invalid magic {:?}",
                String::from_utf8_lossy(&magic)
            )));
        }

        let version = self.i32()?;
        if version > FORMAT_VERSION {
            return Err(ReplayError::UnsupportedVersion { found: version });
        }
        if version < 1 {
            return Err(ReplayError::corrupt(format!("invalid version {version}")));
        }

        let timestamp = self
            .reader
            .read_i64::<LittleEndian>()
            .map_err(ReplayError::from_read)?;
        let duration = self.f32()?;
        let frame_count = self.count("frame")?;
        let trigger_count = self.count("trigger")?;

        let mut frames = Vec::with_capacity(frame_count.min(MAX_PREALLOC));
        for _ in 0..frame_count {
            frames.push(self.read_frame(version)?);
        }

        let mut triggers = Vec::with_capacity(trigger_count.min(MAX_PREALLOC));
        for _ in 0..trigger_count {
            triggers.push(TriggerEvent {
                time: self.f32()?,
                id: self.id()?,
                name: self.string()?,
            });
        }

        let world_events = if version >= 2 {
            let event_count = self.count("world event")?;
            let mut events = Vec::with_capacity(event_count.min(MAX_PREALLOC));
            for _ in 0..event_count {
                events.push(self.read_world_event()?);
            }
            events
        } else {
            Vec::new()
        };

        Ok(ReplayFile {
            version,
            timestamp,
            duration,
            frames,
            triggers,
            world_events,
        })
    }

    fn read_frame(&mut self, version: i32) -> Result<ReplayFrame> {
        let time = self.f32()?;
        let entity_count = self.count("entity")?;
        let mut entities = Vec::with_capacity(entity_count.min(MAX_PREALLOC));
        for _ in 0..entity_count {
            entities.push(self.read_entity(version)?);
        }
        Ok(ReplayFrame { time, entities })
    }

    fn read_entity(&mut self, version: i32) -> Result<EntitySnapshot> {
        let id = self.id()?;
        let prefab_hash = self.i32()?;
        let position = self.vec3()?;
        let rotation = Quat::from_xyzw(self.f32()?, self.f32()?, self.f32()?, self.f32()?);
        let anim = AnimState {
            forward_speed: self.f32()?,
            sideway_speed: self.f32()?,
            turn_speed: self.f32()?,
            // Keep unknown bits so the byte survives a rewrite unchanged
            flags: AnimFlags::from_bits_retain(self.u8()?),
            state_f: self.i32()?,
            state_i: self.i32()?,
        };

        let equipment = if version >= 3 && self.bool()? {
            Some(self.read_equipment()?)
        } else {
            None
        };

        Ok(EntitySnapshot {
            id,
            prefab_hash,
            position,
            rotation,
            anim,
            equipment,
        })
    }

    fn read_equipment(&mut self) -> Result<Equipment> {
        Ok(Equipment {
            left_item: self.string()?,
            left_item_variant: self.i32()?,
            right_item: self.string()?,
            chest_item: self.string()?,
            leg_item: self.string()?,
            helmet_item: self.string()?,
            shoulder_item: self.string()?,
            shoulder_item_variant: self.i32()?,
            utility_item: self.string()?,
            trinket_item: self.string()?,
            beard_item: self.string()?,
            hair_item: self.string()?,
            left_back_item: self.string()?,
            left_back_item_variant: self.i32()?,
            right_back_item: self.string()?,
        })
    }

    fn read_world_event(&mut self) -> Result<WorldEvent> {
        let time = self.f32()?;
        let tag = self.u8()?;
        let kind = WorldEventKind::from_u8(tag)
            .ok_or_else(|| ReplayError::corrupt(format!("unknown world event type {tag}")))?;
        Ok(WorldEvent {
            time,
            kind,
            id: self.id()?,
            prefab_hash: self.i32()?,
            position: self.vec3()?,
            rotation: self.vec3()?,
            health: self.f32()?,
            state: self.i32()?,
        })
    }

    fn id(&mut self) -> Result<EntityId> {
        let user_id = self
            .reader
            .read_i64::<LittleEndian>()
            .map_err(ReplayError::from_read)?;
        let local_id = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(ReplayError::from_read)?;
        Ok(EntityId { user_id, local_id })
    }

    fn vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.f32()?, self.f32()?, self.f32()?))
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let n = self.i32()?;
        usize::try_from(n).map_err(|_| ReplayError::corrupt(format!("negative {what} count {n}")))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.string_len()?;
        let mut bytes = Vec::with_capacity(len.min(MAX_PREALLOC));
        self.reader
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut bytes)
            .map_err(ReplayError::from_read)?;
        if bytes.len() != len {
            return Err(ReplayError::corrupt("unexpected end of stream"));
        }
        String::from_utf8(bytes).map_err(|_| ReplayError::corrupt("string is not valid UTF-8"))
    }

    /// 7-bit variable-length prefix, at most five bytes
    fn string_len(&mut self) -> Result<usize> {
        let mut len: u32 = 0;
        for i in 0..5 {
            let byte = self.u8()?;
            len |= u32::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(len as usize);
            }
        }
        Err(ReplayError::corrupt("string length prefix too long"))
    }

    fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    fn u8(&mut self) -> Result<u8> {
        self.reader.read_u8().map_err(ReplayError::from_read)
    }

    fn i32(&mut self) -> Result<i32> {
        self.reader
            .read_i32::<LittleEndian>()
            .map_err(ReplayError::from_read)
    }

    fn f32(&mut self) -> Result<f32> {
        self.reader
            .read_f32::<LittleEndian>()
            .map_err(ReplayError::from_read)
    }
}
