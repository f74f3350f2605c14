//! Binary replay format (.valreplay)
//!
//! Little-endian, no padding. Strings are a 7-bit variable-length byte
//! count followed by UTF-8. Later versions only ever append fields, so the
//! reader gates each optional part on the stored version.
//!
//! # File Structure
//!
//! ```text
//! magic "VRPL" | version i32 | timestamp i64 | duration f32
//! frame_count i32 | trigger_count i32
//! frames[frame_count]
//!   time f32 | entity_count i32
//!   entities[entity_count]
//!     user_id i64 | local_id u32 | prefab_hash i32
//!     position 3xf32 | rotation 4xf32
//!     forward, sideway, turn speed f32 | anim flags u8 | state_f, state_i i32
//!     has_equipment u8                                      (v3+)
//!     equipment block if has_equipment                      (v3+)
//! triggers[trigger_count]
//!   time f32 | user_id i64 | local_id u32 | name string
//! world_event_count i32                                     (v2+)
//! world_events[world_event_count]                           (v2+)
//!   time f32 | type u8 | user_id i64 | local_id u32 | prefab_hash i32
//!   position 3xf32 | rotation euler 3xf32 | health f32 | state i32
//! ```

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;

use crate::replay::error::Result;
use crate::replay::types::ReplayFile;

/// Serialize a replay in the current format
pub fn encode(replay: &ReplayFile) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    BinaryWriter::new(&mut buffer).write_replay(replay)?;
    Ok(buffer)
}

/// Deserialize a replay of any supported version
pub fn decode(bytes: &[u8]) -> Result<ReplayFile> {
    BinaryReader::new(bytes).read_replay()
}
