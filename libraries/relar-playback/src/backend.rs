//! Native audio backend contract
//!
//! The engine never decodes audio itself. A platform layer (a mobile media
//! session, a desktop output thread) implements [`AudioBackend`] and pushes
//! transport notifications back through the [`BackendEventSink`] it receives
//! on [`AudioBackend::connect`].

use crate::error::PlaybackError;
use crate::types::QueueTrack;
use crate::volume::Volume;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors reported by a backend implementation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The native layer is not available on this platform
    #[error("Audio backend unavailable")]
    Unavailable,

    /// The path could not be opened or is unreachable
    #[error("Invalid source {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Result type for backend calls
pub type BackendResult<T> = std::result::Result<T, BackendError>;

impl From<BackendError> for PlaybackError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable => PlaybackError::BackendUnavailable,
            BackendError::InvalidSource { path, reason } => {
                PlaybackError::InvalidTrackSource { path, reason }
            }
            BackendError::Other(message) => PlaybackError::Backend(message),
        }
    }
}

/// Everything the backend needs to prepare a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadRequest {
    pub path: String,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,

    /// Linear volume to start at (0.0-1.0)
    pub volume: f32,
}

impl PreloadRequest {
    pub fn new(track: &QueueTrack, volume: Volume) -> Self {
        Self {
            path: track.path.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            volume: volume.level(),
        }
    }
}

/// Notifications pushed by the backend
///
/// `Next`/`Previous`/`Play`/`Pause` originate from OS media controls
/// (lock screen, headset buttons). No ordering between events is assumed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendEvent {
    /// The loaded track played to its end
    Complete,
    Play,
    Pause,
    Next,
    Previous,
    Stop,

    /// Playback failed after the track was loaded
    Error(String),
}

/// A backend event tagged with the load generation current at emit time and
/// the attachment that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StampedEvent {
    pub event: BackendEvent,
    pub generation: u64,
    pub connection: u64,
}

/// Handle a backend uses to push events into the controller
///
/// Cheap to clone. Each attachment gets a sink with its own connection id;
/// once the backend is replaced or detached the controller ignores whatever
/// the old sink still emits. Events emitted after the controller has shut
/// down are dropped.
#[derive(Debug, Clone)]
pub struct BackendEventSink {
    tx: mpsc::UnboundedSender<StampedEvent>,
    generation: Arc<AtomicU64>,
    connection: u64,
}

impl BackendEventSink {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<StampedEvent>,
        generation: Arc<AtomicU64>,
        connection: u64,
    ) -> Self {
        Self {
            tx,
            generation,
            connection,
        }
    }

    /// Push an event; returns `false` once the controller is gone
    pub fn emit(&self, event: BackendEvent) -> bool {
        let generation = self.generation.load(Ordering::SeqCst);
        self.tx
            .send(StampedEvent {
                event,
                generation,
                connection: self.connection,
            })
            .is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Native audio backend
///
/// Times are in seconds. Implementations are shared behind an `Arc` and
/// must tolerate calls from the controller task while emitting events from
/// their own threads.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Receive the sink used for pushing events
    fn connect(&self, sink: BackendEventSink);

    /// Called when the controller drops this backend
    fn disconnect(&self) {}

    /// Prepare a track without starting it
    async fn preload(&self, request: &PreloadRequest) -> BackendResult<()>;

    /// Update the artwork shown by the OS media session
    async fn set_album_art(&self, url: &str) -> BackendResult<()>;

    async fn play(&self) -> BackendResult<()>;

    async fn pause(&self) -> BackendResult<()>;

    /// Stop playback; backends without a distinct stop just pause
    async fn stop(&self) -> BackendResult<()> {
        self.pause().await
    }

    /// Set linear volume (0.0-1.0)
    async fn set_volume(&self, volume: f32) -> BackendResult<()>;

    async fn current_time(&self) -> BackendResult<f64>;

    async fn set_current_time(&self, seconds: f64) -> BackendResult<()>;

    /// Duration of the loaded track
    async fn duration(&self) -> BackendResult<f64>;
}
