//! Engine-to-UI state
//!
//! The controller republishes a [`PlaybackSnapshot`] after every transition
//! on a `tokio::sync::watch` channel. Subscribers always see the latest
//! complete state, never a partial update.

use crate::queue::QueueSummary;
use crate::types::{PlayMode, QueueTrack, TransportState};
use serde::{Deserialize, Serialize};

/// Player bar state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub queue: QueueSummary,

    /// Track selected in the queue (`None` when idle at end or empty)
    pub current_track: Option<QueueTrack>,

    pub transport: TransportState,

    /// Last polled position in seconds
    pub current_time: f64,

    /// Duration of the loaded track in seconds
    pub duration: f64,

    /// Linear volume (0.0-1.0)
    pub volume: f32,

    pub shuffle: bool,
    pub play_mode: PlayMode,

    /// Most recent backend failure, cleared by the next successful load
    pub last_error: Option<String>,
}

impl PlaybackSnapshot {
    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Playing
    }

    /// Playback progress (0.0-1.0)
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            queue: QueueSummary::default(),
            current_track: None,
            transport: TransportState::Idle,
            current_time: 0.0,
            duration: 0.0,
            volume: 0.8,
            shuffle: false,
            play_mode: PlayMode::Off,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_handles_unknown_duration() {
        let mut snapshot = PlaybackSnapshot::default();
        assert_eq!(snapshot.progress(), 0.0);

        snapshot.duration = 200.0;
        snapshot.current_time = 50.0;
        assert_eq!(snapshot.progress(), 0.25);
    }

    #[test]
    fn snapshot_serializes_transport_in_kebab_case() {
        let snapshot = PlaybackSnapshot {
            transport: TransportState::Playing,
            play_mode: PlayMode::RepeatOne,
            ..PlaybackSnapshot::default()
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["transport"], "playing");
        assert_eq!(json["play_mode"], "repeat-one");
    }
}
