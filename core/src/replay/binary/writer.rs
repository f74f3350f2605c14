//! Binary replay format writer
//!
//! Writes .valreplay files. Always emits the current layout unless an
//! older version is requested explicitly with [`BinaryWriter::with_version`].

use crate::replay::types::*;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

/// Writer for binary replay format
pub struct BinaryWriter<W: Write> {
    writer: W,
    version: i32,
}

impl<W: Write> BinaryWriter<W> {
    /// Create a new binary writer emitting [`FORMAT_VERSION`]
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            version: FORMAT_VERSION,
        }
    }

    /// Create a writer that emits an older layout (1 or 2).
    ///
    /// Sections the older layout lacks are skipped: v1 has no world events,
    /// v1 and v2 have no equipment block.
    pub fn with_version(writer: W, version: i32) -> Self {
        Self {
            writer,
            version: version.clamp(1, FORMAT_VERSION),
        }
    }

    /// Write a complete replay to the output
    pub fn write_replay(&mut self, replay: &ReplayFile) -> io::Result<()> {
        self.write_header(replay)?;

        for frame in &replay.frames {
            self.write_frame(frame)?;
        }

        for trigger in &replay.triggers {
            self.writer.write_f32::<LittleEndian>(trigger.time)?;
            self.write_id(trigger.id)?;
            self.write_string(&trigger.name)?;
        }

        if self.version >= 2 {
            self.writer
                .write_i32::<LittleEndian>(count(replay.world_events.len())?)?;
            for event in &replay.world_events {
                self.write_world_event(event)?;
            }
        }

        Ok(())
    }

    fn write_header(&mut self, replay: &ReplayFile) -> io::Result<()> {
        self.writer.write_all(&MAGIC)?;
        self.writer.write_i32::<LittleEndian>(self.version)?;
        self.writer.write_i64::<LittleEndian>(replay.timestamp)?;
        self.writer.write_f32::<LittleEndian>(replay.duration)?;
        self.writer
            .write_i32::<LittleEndian>(count(replay.frames.len())?)?;
        self.writer
            .write_i32::<LittleEndian>(count(replay.triggers.len())?)?;
        Ok(())
    }

    fn write_frame(&mut self, frame: &ReplayFrame) -> io::Result<()> {
        self.writer.write_f32::<LittleEndian>(frame.time)?;
        self.writer
            .write_i32::<LittleEndian>(count(frame.entities.len())?)?;
        for entity in &frame.entities {
            self.write_entity(entity)?;
        }
        Ok(())
    }

    fn write_entity(&mut self, e: &EntitySnapshot) -> io::Result<()> {
        self.write_id(e.id)?;
        self.writer.write_i32::<LittleEndian>(e.prefab_hash)?;
        self.write_vec3(e.position.x, e.position.y, e.position.z)?;
        self.writer.write_f32::<LittleEndian>(e.rotation.x)?;
        self.writer.write_f32::<LittleEndian>(e.rotation.y)?;
        self.writer.write_f32::<LittleEndian>(e.rotation.z)?;
        self.writer.write_f32::<LittleEndian>(e.rotation.w)?;
        self.writer.write_f32::<LittleEndian>(e.anim.forward_speed)?;
        self.writer.write_f32::<LittleEndian>(e.anim.sideway_speed)?;
        self.writer.write_f32::<LittleEndian>(e.anim.turn_speed)?;
        self.writer.write_u8(e.anim.flags.bits())?;
        self.writer.write_i32::<LittleEndian>(e.anim.state_f)?;
        self.writer.write_i32::<LittleEndian>(e.anim.state_i)?;

        if self.version >= 3 {
            match &e.equipment {
                Some(equipment) => {
                    self.writer.write_u8(1)?;
                    self.write_equipment(equipment)?;
                }
                None => self.writer.write_u8(0)?,
            }
        }
        Ok(())
    }

    fn write_equipment(&mut self, eq: &Equipment) -> io::Result<()> {
        self.write_string(&eq.left_item)?;
        self.writer.write_i32::<LittleEndian>(eq.left_item_variant)?;
        self.write_string(&eq.right_item)?;
        self.write_string(&eq.chest_item)?;
        self.write_string(&eq.leg_item)?;
        self.write_string(&eq.helmet_item)?;
        self.write_string(&eq.shoulder_item)?;
        self.writer
            .write_i32::<LittleEndian>(eq.shoulder_item_variant)?;
        self.write_string(&eq.utility_item)?;
        self.write_string(&eq.trinket_item)?;
        self.write_string(&eq.beard_item)?;
        self.write_string(&eq.hair_item)?;
        self.write_string(&eq.left_back_item)?;
        self.writer
            .write_i32::<LittleEndian>(eq.left_back_item_variant)?;
        self.write_string(&eq.right_back_item)?;
        Ok(())
    }

    fn write_world_event(&mut self, event: &WorldEvent) -> io::Result<()> {
        self.writer.write_f32::<LittleEndian>(event.time)?;
        self.writer.write_u8(event.kind as u8)?;
        self.write_id(event.id)?;
        self.writer.write_i32::<LittleEndian>(event.prefab_hash)?;
        self.write_vec3(event.position.x, event.position.y, event.position.z)?;
        self.write_vec3(event.rotation.x, event.rotation.y, event.rotation.z)?;
        self.writer.write_f32::<LittleEndian>(event.health)?;
        self.writer.write_i32::<LittleEndian>(event.state)?;
        Ok(())
    }

    fn write_id(&mut self, id: EntityId) -> io::Result<()> {
        self.writer.write_i64::<LittleEndian>(id.user_id)?;
        self.writer.write_u32::<LittleEndian>(id.local_id)?;
        Ok(())
    }

    fn write_vec3(&mut self, x: f32, y: f32, z: f32) -> io::Result<()> {
        self.writer.write_f32::<LittleEndian>(x)?;
        self.writer.write_f32::<LittleEndian>(y)?;
        self.writer.write_f32::<LittleEndian>(z)?;
        Ok(())
    }

    /// 7-bit variable-length byte count, then UTF-8 bytes
    fn write_string(&mut self, s: &str) -> io::Result<()> {
        let mut len = u32::try_from(s.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "string too long"))?;
        while len >= 0x80 {
            self.writer.write_u8((len as u8 & 0x7F) | 0x80)?;
            len >>= 7;
        }
        self.writer.write_u8(len as u8)?;
        self.writer.write_all(s.as_bytes())
    }

    /// Consume the writer and return the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn count(len: usize) -> io::Result<i32> {
    i32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many elements"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_header() {
        let mut buffer = Vec::new();
        let replay = ReplayFile {
            timestamp: 1_700_000_000,
            duration: 2.5,
            ..ReplayFile::default()
        };
        BinaryWriter::new(&mut buffer).write_replay(&replay).unwrap();

        // magic(4) + version(4) + timestamp(8) + duration(4) + counts(8) + world count(4)
        assert_eq!(buffer.len(), 32);
        assert_eq!(&buffer[0..4], b"VRPL");
        assert_eq!(&buffer[4..8], &3i32.to_le_bytes());
        assert_eq!(&buffer[8..16], &1_700_000_000i64.to_le_bytes());
        assert_eq!(&buffer[16..20], &2.5f32.to_le_bytes());
    }

    #[test]
    fn test_v1_layout_has_no_world_section() {
        let mut buffer = Vec::new();
        BinaryWriter::with_version(&mut buffer, 1)
            .write_replay(&ReplayFile::default())
            .unwrap();
        assert_eq!(buffer.len(), 28);
        assert_eq!(&buffer[4..8], &1i32.to_le_bytes());
    }

    #[test]
    fn test_string_length_prefix() {
        let mut buffer = Vec::new();
        let mut writer = BinaryWriter::new(&mut buffer);
        writer.write_string("abc").unwrap();
        writer.write_string(&"x".repeat(200)).unwrap();

        assert_eq!(&buffer[0..4], &[3, b'a', b'b', b'c']);
        // 200 = 0b1_1001000 -> 0xC8 0x01
        assert_eq!(&buffer[4..6], &[0xC8, 0x01]);
        assert_eq!(buffer.len(), 4 + 2 + 200);
    }

    #[test]
    fn test_entity_size_without_equipment() {
        let mut buffer = Vec::new();
        let snapshot = EntitySnapshot {
            id: EntityId::new(1, 2),
            prefab_hash: 7,
            position: glam::Vec3::ZERO,
            rotation: glam::Quat::IDENTITY,
            anim: AnimState::default(),
            equipment: None,
        };
        BinaryWriter::new(&mut buffer).write_entity(&snapshot).unwrap();
        // id(12) + prefab(4) + pos(12) + rot(16) + floats(12) + bools(1) + ints(8) + flag(1)
        assert_eq!(buffer.len(), 66);
    }
}
