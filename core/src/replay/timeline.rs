//! Playback timeline model
//!
//! Read-only status of the active playback plus the actions a timeline
//! control surface (scrub bar, play/pause, stop, speed buttons) can send.

use std::fmt;

use crate::host::{Presentation, SimulationView};
use crate::replay::runtime::{Player, ReplayController, approx_eq};

/// Snapshot of the playback queries, taken once per UI refresh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineStatus {
    pub time: f32,
    pub duration: f32,
    pub speed: f32,
    pub paused: bool,
    pub world_events: usize,
}

impl TimelineStatus {
    /// `None` while nothing is playing
    pub fn of(player: &Player) -> Option<Self> {
        if !player.is_playing() {
            return None;
        }
        Some(Self {
            time: player.time(),
            duration: player.duration(),
            speed: player.speed(),
            paused: player.is_paused(),
            world_events: player.world_event_count(),
        })
    }

    /// `Time: 0:05.0 / 1:30.0  [12 world events]`
    pub fn time_label(&self) -> String {
        let mut label = format!(
            "Time: {} / {}",
            format_time(self.time),
            format_time(self.duration)
        );
        if self.world_events > 0 {
            label.push_str(&format!("  [{} world events]", self.world_events));
        }
        label
    }

    /// `Speed: 1.00x`
    pub fn speed_label(&self) -> String {
        format!("Speed: {:.2}x", self.speed)
    }

    /// Caption of the play/pause button
    pub fn pause_label(&self) -> &'static str {
        if self.paused { "Play" } else { "Pause" }
    }
}

impl fmt::Display for TimelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.time_label(), self.speed_label())
    }
}

/// `m:ss.s`
pub fn format_time(seconds: f32) -> String {
    // Round once so 59.97 carries into the minutes instead of showing 0:60.0
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    format!("{minutes}:{:02}.{}", rest / 10, rest % 10)
}

/// Input from the timeline control surface
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineAction {
    TogglePause,
    Stop,
    SlowDown,
    SpeedUp,
    /// Scrub bar moved to this time
    Scrub(f32),
}

impl TimelineAction {
    /// Apply to the session; `speed_step` is the +/- increment
    pub fn apply(
        self,
        session: &mut ReplayController,
        speed_step: f32,
        sim: &dyn SimulationView,
        present: &mut dyn Presentation,
    ) {
        match self {
            Self::TogglePause => {
                session.toggle_pause();
            }
            Self::Stop => {
                session.stop_playback(sim, present);
            }
            Self::SlowDown => {
                session.adjust_speed(-speed_step);
            }
            Self::SpeedUp => {
                session.adjust_speed(speed_step);
            }
            Self::Scrub(time) => {
                // The bar reports its position every frame; only real moves seek
                if !approx_eq(time, session.player().time())
                    && let Err(e) = session.seek(time, sim, present)
                {
                    tracing::debug!(error = %e, "scrub ignored");
                }
            }
        }
    }
}
