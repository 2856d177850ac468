//! Relar - Queue & Playback Engine
//!
//! Backend-agnostic queue sequencing and playback control for the Relar
//! music client.
//!
//! This crate provides:
//! - Shuffle permutations that never reorder the underlying queue
//! - Queue navigation under play modes (none, repeat, repeat-one)
//! - A playback controller task driving a native audio backend
//! - Current-time polling while playing
//! - Snapshots of the player state for the UI
//!
//! # Architecture
//!
//! `relar-playback` does not decode or output audio. The platform layer
//! implements [`AudioBackend`] and pushes transport events (track complete,
//! lock-screen next/previous, ...) through a [`BackendEventSink`]. The
//! controller is the only writer of queue and session state; everything else
//! talks to it through a [`PlaybackHandle`].
//!
//! # Example: Queue Sequencing
//!
//! ```rust
//! use relar_playback::{PlayMode, QueueManager, QueueSource, QueueTrack, SourceKind};
//! use std::time::Duration;
//!
//! let track = |id: &str| QueueTrack {
//!     id: id.to_string(),
//!     path: format!("https://cdn.example.com/{id}.mp3"),
//!     title: format!("Song {id}"),
//!     artist: "Artist".to_string(),
//!     album: Some("Album".to_string()),
//!     duration: Duration::from_secs(200),
//!     artwork: None,
//! };
//!
//! let mut queue = QueueManager::new();
//! queue.set_play_mode(PlayMode::Repeat);
//! queue
//!     .set_queue(
//!         vec![track("a"), track("b"), track("c")],
//!         QueueSource::new(SourceKind::Album, "album-1", "Album"),
//!         Some(2),
//!     )
//!     .unwrap();
//!
//! // Repeat wraps around to the top
//! assert_eq!(queue.peek_next().map(|t| t.id.as_str()), Some("a"));
//!
//! // Shuffling keeps the current track at the front of the shuffled order
//! queue.set_shuffle(true).unwrap();
//! assert_eq!(queue.current_position(), Some(0));
//! assert_eq!(queue.current().map(|t| t.id.as_str()), Some("c"));
//! ```
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use relar_playback::{
//!     AudioBackend, BackendEventSink, BackendResult, PlaybackConfig, PlaybackController,
//!     PreloadRequest,
//! };
//! use std::sync::Arc;
//!
//! struct NativePlayer;
//!
//! #[async_trait]
//! impl AudioBackend for NativePlayer {
//!     fn connect(&self, sink: BackendEventSink) {
//!         // Keep the sink and emit BackendEvent::Complete when a track ends
//!     }
//!     async fn preload(&self, request: &PreloadRequest) -> BackendResult<()> { Ok(()) }
//!     async fn set_album_art(&self, url: &str) -> BackendResult<()> { Ok(()) }
//!     async fn play(&self) -> BackendResult<()> { Ok(()) }
//!     async fn pause(&self) -> BackendResult<()> { Ok(()) }
//!     async fn set_volume(&self, volume: f32) -> BackendResult<()> { Ok(()) }
//!     async fn current_time(&self) -> BackendResult<f64> { Ok(0.0) }
//!     async fn set_current_time(&self, seconds: f64) -> BackendResult<()> { Ok(()) }
//!     async fn duration(&self) -> BackendResult<f64> { Ok(0.0) }
//! }
//!
//! # async fn run() -> relar_playback::Result<()> {
//! let player = PlaybackController::spawn(PlaybackConfig::default());
//! player.attach_backend(Arc::new(NativePlayer)).await?;
//!
//! let mut updates = player.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("{:?} {:.0}s", snapshot.transport, snapshot.current_time);
//! }
//! # Ok(())
//! # }
//! ```

mod backend;
mod controller;
mod error;
mod events;
mod queue;
mod shuffle;
pub mod types;
mod volume;

// Public exports
pub use backend::{
    AudioBackend, BackendError, BackendEvent, BackendEventSink, BackendResult, PreloadRequest,
};
pub use controller::{PlaybackController, PlaybackHandle};
pub use error::{PlaybackError, Result};
pub use events::PlaybackSnapshot;
pub use queue::{QueueManager, QueueState, QueueSummary, Removal, RemovalOutcome};
pub use shuffle::ShuffleIndex;
pub use types::{PlayMode, PlaybackConfig, QueueSource, QueueTrack, SourceKind, TransportState};
pub use volume::Volume;
