//! Core types for queue sequencing and playback

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Track information for queue management
///
/// Carries what the backend needs to preload the track and what the player
/// bar needs to display it. Supplied by the library/query layer and treated
/// as an immutable value by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueTrack {
    /// Unique song identifier from storage
    pub id: String,

    /// Download URL or local path handed to the backend
    pub path: String,

    /// Song title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    pub album: Option<String>,

    /// Song duration as stored with the song document
    pub duration: Duration,

    /// Cover art URL (optional)
    pub artwork: Option<String>,
}

/// What a queue was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Album,
    Artist,
    Playlist,
    LikedSongs,
}

/// Source descriptor for the current queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSource {
    pub kind: SourceKind,

    /// Album/artist/playlist document id
    pub id: String,

    /// Human readable name ("Liked Songs", the album title, ...)
    pub name: String,
}

impl QueueSource {
    pub fn new(kind: SourceKind, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Play mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayMode {
    /// Stop after the last track
    #[default]
    #[serde(rename = "none")]
    Off,

    /// Loop the whole queue
    Repeat,

    /// Replay the current track
    RepeatOne,
}

impl PlayMode {
    /// Next mode in the `none -> repeat -> repeat-one -> none` cycle
    pub fn cycled(self) -> Self {
        match self {
            PlayMode::Off => PlayMode::Repeat,
            PlayMode::Repeat => PlayMode::RepeatOne,
            PlayMode::RepeatOne => PlayMode::Off,
        }
    }
}

/// Transport state of the playback session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportState {
    /// Nothing loaded
    #[default]
    Idle,

    /// Preload/play in flight
    Loading,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Configuration for the playback controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0.0-1.0, default: 0.8)
    pub volume: f32,

    /// Initial shuffle flag (default: false)
    pub shuffle: bool,

    /// Initial play mode (default: none)
    pub play_mode: PlayMode,

    /// How often the current time is polled while playing (default: 1s)
    pub poll_interval: Duration,

    /// "Previous" restarts the current track instead when playback is past
    /// this point (default: disabled)
    pub restart_threshold: Option<Duration>,

    /// Whether next/previous honour repeat-one (default: true, a skip
    /// replays the current track; false moves to the neighbouring track)
    pub skip_respects_repeat_one: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 0.8,
            shuffle: false,
            play_mode: PlayMode::Off,
            poll_interval: Duration::from_secs(1),
            restart_threshold: None,
            skip_respects_repeat_one: true,
        }
    }
}
