//! Integration tests for the replay pipeline
//!
//! Full record -> save -> load -> play cycles through [`ReplayController`],
//! world-state playback against a changed world, and loading files written
//! by older format versions.
//!
//! [`ReplayController`]: crate::replay::runtime::ReplayController


#[cfg(test)]
pub(crate) mod test_utils {
    use crate::replay::runtime::{Player, PlayerConfig, Recorder, RecorderConfig, ReplayController};
    use crate::replay::storage::ReplayStore;
    use crate::replay::types::EntityId;

    /// Prefab registered for every character in these tests
    pub const HUMAN: i32 = 1_001;
    /// Prefab registered for every piece in these tests
    pub const WALL: i32 = 2_002;

    pub fn id(n: u32) -> EntityId {
        EntityId::new(77, n)
    }

    /// Controller with default settings storing into `dir`
    pub fn controller(dir: &std::path::Path) -> ReplayController {
        ReplayController::new(
            Recorder::new(RecorderConfig::default()),
            Player::new(PlayerConfig::default()),
            ReplayStore::new(dir),
        )
    }
}
