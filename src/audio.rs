//! Audio collaborator boundary
//!
//! Playback itself lives outside this process. The node only tells the sink
//! which cue to play and whether ambience should run; both calls are
//! fire-and-forget.

use crate::control::Direction;
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    /// Wheel rotation tick
    Wheel,
    /// Button acknowledgement
    Bell,
}

impl AudioCue {
    pub fn name(self) -> &'static str {
        match self {
            AudioCue::Wheel => "wheel",
            AudioCue::Bell => "bell",
        }
    }
}

impl fmt::Display for AudioCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait AudioSink: Send + 'static {
    fn play_cue(&self, cue: AudioCue);

    fn set_ambience(&self, enabled: bool, direction: Direction);
}

/// Sink that reports cues through tracing
#[derive(Debug, Default, Clone)]
pub struct TracingAudio;

impl AudioSink for TracingAudio {
    fn play_cue(&self, cue: AudioCue) {
        info!(target: "audio", "play cue {}", cue);
    }

    fn set_ambience(&self, enabled: bool, direction: Direction) {
        debug!(target: "audio", "ambience enabled={} direction={}", enabled, direction);
    }
}
