//! Error types for queue sequencing and playback control

use thiserror::Error;

/// Playback errors
///
/// `IndexOutOfBounds`, `EmptyQueueOperation` and `InvalidPermutation` are
/// caller bugs and are returned as soon as they are detected. The backend
/// variants are runtime conditions: the controller drops the session to idle
/// and records them in the snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// No audio backend is attached to the controller
    #[error("No audio backend connected")]
    BackendUnavailable,

    /// The backend rejected the track source during preload
    #[error("Invalid track source {path}: {reason}")]
    InvalidTrackSource { path: String, reason: String },

    /// Any other backend failure (play, pause, seek)
    #[error("Audio backend error: {0}")]
    Backend(String),

    /// Seek target cannot be clamped (NaN or infinite)
    #[error("Seek position out of range: {0}")]
    SeekOutOfRange(f64),

    /// Seek requested while no track is loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Index out of bounds
    #[error("Index out of bounds: {index} (length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Navigation requested on a queue without content
    #[error("Cannot {0} on an empty queue")]
    EmptyQueueOperation(&'static str),

    /// Explicit shuffle mapping is not a permutation of `[0, n)`
    #[error("Invalid permutation: {0}")]
    InvalidPermutation(String),

    /// The controller task has shut down
    #[error("Playback controller is closed")]
    ControllerClosed,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
