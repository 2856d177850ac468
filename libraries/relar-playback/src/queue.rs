//! Queue sequencing under shuffle and play-mode policies
//!
//! The content vector always stays in original order. The current position
//! is an index into the effective order: the shuffled order when shuffle is
//! enabled, the original order otherwise.
//!
//! ```text
//! content (original):  A  B  C  D
//! shuffle index:       C  A  D  B    <- effective order when shuffled
//! position:                  ^ (2) -> D is current
//! ```

use crate::error::{PlaybackError, Result};
use crate::shuffle::ShuffleIndex;
use crate::types::{PlayMode, QueueSource, QueueTrack};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Queue lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueState {
    /// No content
    Empty,

    /// A track is selected at the current position
    Active,

    /// Content present but nothing selected (playback ran off the end
    /// under play mode `none`, or tracks were enqueued into an empty queue)
    IdleAtEnd,
}

/// What removing a track did to the current selection
#[derive(Debug, Clone, PartialEq)]
pub enum RemovalOutcome {
    /// The current track is unchanged
    Unaffected,

    /// The current track was removed and this track replaces it
    Replaced(QueueTrack),

    /// The current track was removed and nothing replaces it
    Stopped,
}

/// A removed track and the effect on the current selection
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub track: QueueTrack,
    pub outcome: RemovalOutcome,
}

/// Read-only view of the queue for the UI snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub source: Option<QueueSource>,

    /// Track ids in effective order
    pub order: Vec<String>,

    /// Current position in `order`
    pub position: Option<usize>,
}

impl QueueSummary {
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Ordered tracks for the current listening session
#[derive(Debug, Clone)]
pub struct QueueManager {
    /// Content in original order
    tracks: Vec<QueueTrack>,

    source: Option<QueueSource>,

    /// Present exactly when shuffle is enabled
    shuffle: Option<ShuffleIndex>,

    /// Current position in the effective order (`Some` only when active)
    position: Option<usize>,

    state: QueueState,
    mode: PlayMode,
}

impl QueueManager {
    /// Create new empty queue
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            source: None,
            shuffle: None,
            position: None,
            state: QueueState::Empty,
            mode: PlayMode::Off,
        }
    }

    /// Create an empty queue with initial shuffle flag and play mode
    pub fn with_settings(shuffle: bool, mode: PlayMode) -> Self {
        let mut queue = Self::new();
        queue.mode = mode;
        if shuffle {
            queue.shuffle = Some(ShuffleIndex::identity(0));
        }
        queue
    }

    // ===== Content =====

    /// Replace the queue content
    ///
    /// `start` is an original index (default 0). With shuffle enabled the
    /// permutation is rebuilt with the start track pinned first.
    pub fn set_queue(
        &mut self,
        tracks: Vec<QueueTrack>,
        source: QueueSource,
        start: Option<usize>,
    ) -> Result<()> {
        let start = start.unwrap_or(0);
        if !tracks.is_empty() && start >= tracks.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index: start,
                len: tracks.len(),
            });
        }

        debug!(
            "Setting queue from {:?} '{}' ({} tracks, start {})",
            source.kind,
            source.name,
            tracks.len(),
            start
        );

        self.tracks = tracks;
        self.source = Some(source);

        if self.tracks.is_empty() {
            if self.shuffle.is_some() {
                self.shuffle = Some(ShuffleIndex::identity(0));
            }
            self.position = None;
            self.state = QueueState::Empty;
            return Ok(());
        }

        if self.shuffle.is_some() {
            self.shuffle = Some(ShuffleIndex::build(self.tracks.len(), Some(start))?);
            self.position = Some(0);
        } else {
            self.position = Some(start);
        }
        self.state = QueueState::Active;

        Ok(())
    }

    /// Append a track to the queue
    ///
    /// When shuffled, the track goes to the end of the shuffled order.
    pub fn enqueue(&mut self, track: QueueTrack) {
        self.tracks.push(track);
        if let Some(shuffle) = self.shuffle.as_mut() {
            shuffle.push();
        }
        if self.state == QueueState::Empty {
            self.state = QueueState::IdleAtEnd;
        }
    }

    /// Remove the track with the given original index
    pub fn remove_track(&mut self, original_index: usize) -> Result<Removal> {
        if self.tracks.is_empty() {
            return Err(PlaybackError::EmptyQueueOperation("remove a track"));
        }
        if original_index >= self.tracks.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index: original_index,
                len: self.tracks.len(),
            });
        }

        let removed_position = match self.shuffle.as_mut() {
            Some(shuffle) => shuffle.remove_original_index(original_index)?,
            None => original_index,
        };
        let track = self.tracks.remove(original_index);
        let was_current = self.position == Some(removed_position);

        debug!(
            "Removed '{}' (original {}, position {})",
            track.title, original_index, removed_position
        );

        let outcome = if self.tracks.is_empty() {
            self.position = None;
            self.state = QueueState::Empty;
            if was_current {
                RemovalOutcome::Stopped
            } else {
                RemovalOutcome::Unaffected
            }
        } else if was_current {
            // The following track slid into the removed slot
            let next = if removed_position < self.tracks.len() {
                Some(removed_position)
            } else if self.mode == PlayMode::Off {
                None
            } else {
                Some(0)
            };
            self.commit(next);
            match self.current() {
                Some(current) => RemovalOutcome::Replaced(current.clone()),
                None => RemovalOutcome::Stopped,
            }
        } else {
            if let Some(position) = self.position {
                if removed_position < position {
                    self.position = Some(position - 1);
                }
            }
            RemovalOutcome::Unaffected
        };

        Ok(Removal { track, outcome })
    }

    /// Remove the track at an effective position
    pub fn remove_at(&mut self, position: usize) -> Result<Removal> {
        let original_index = self.original_index_at(position)?;
        self.remove_track(original_index)
    }

    /// Drop all content (shuffle flag and play mode are kept)
    pub fn clear(&mut self) {
        self.tracks.clear();
        if self.shuffle.is_some() {
            self.shuffle = Some(ShuffleIndex::identity(0));
        }
        self.position = None;
        self.state = QueueState::Empty;
    }

    // ===== Shuffle & Play Mode =====

    /// Enable or disable shuffle without changing the current track
    pub fn set_shuffle(&mut self, enabled: bool) -> Result<()> {
        if enabled == self.shuffle.is_some() {
            return Ok(());
        }

        if enabled {
            let pinned = self.current_original_index();
            self.shuffle = Some(ShuffleIndex::build(self.tracks.len(), pinned)?);
            if pinned.is_some() {
                self.position = Some(0);
            }
        } else {
            let current = self.current_original_index();
            self.shuffle = None;
            self.position = current;
        }

        debug!("Shuffle {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Check if shuffle is enabled
    pub fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    /// Shuffle permutation, if enabled
    pub fn shuffle_index(&self) -> Option<&ShuffleIndex> {
        self.shuffle.as_ref()
    }

    /// Set play mode
    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    /// Advance the play mode cycle and return the new mode
    pub fn cycle_play_mode(&mut self) -> PlayMode {
        self.mode = self.mode.cycled();
        self.mode
    }

    /// Get current play mode
    pub fn play_mode(&self) -> PlayMode {
        self.mode
    }

    // ===== Navigation =====

    /// Track that would play after the current one finishes
    pub fn peek_next(&self) -> Option<&QueueTrack> {
        self.next_position(true)
            .and_then(|position| self.track_at(position))
    }

    /// Track that "previous" would select
    pub fn peek_previous(&self) -> Option<&QueueTrack> {
        self.previous_position(true)
            .and_then(|position| self.track_at(position))
    }

    /// Commit `peek_next()`; goes idle-at-end when there is no next track
    pub fn advance(&mut self) -> Result<Option<QueueTrack>> {
        self.ensure_content("advance")?;
        let next = self.next_position(true);
        Ok(self.commit(next))
    }

    /// Commit `peek_previous()`
    pub fn retreat(&mut self) -> Result<Option<QueueTrack>> {
        self.ensure_content("retreat")?;
        let previous = self.previous_position(true);
        Ok(self.commit(previous))
    }

    /// User-directed skip forward; repeat-one behaves like repeat
    pub fn skip_next(&mut self) -> Result<Option<QueueTrack>> {
        self.ensure_content("skip forward")?;
        let next = self.next_position(false);
        Ok(self.commit(next))
    }

    /// User-directed skip back; repeat-one behaves like repeat
    pub fn skip_previous(&mut self) -> Result<Option<QueueTrack>> {
        self.ensure_content("skip back")?;
        let previous = self.previous_position(false);
        Ok(self.commit(previous))
    }

    /// Select the track at an effective position
    pub fn jump_to(&mut self, position: usize) -> Result<QueueTrack> {
        self.ensure_content("jump")?;
        if position >= self.tracks.len() {
            return Err(PlaybackError::IndexOutOfBounds {
                index: position,
                len: self.tracks.len(),
            });
        }

        self.commit(Some(position))
            .ok_or(PlaybackError::IndexOutOfBounds {
                index: position,
                len: self.tracks.len(),
            })
    }

    fn ensure_content(&self, operation: &'static str) -> Result<()> {
        if self.tracks.is_empty() {
            Err(PlaybackError::EmptyQueueOperation(operation))
        } else {
            Ok(())
        }
    }

    fn next_position(&self, honour_repeat_one: bool) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        let Some(position) = self.position else {
            // Idle at end: start over from the top
            return Some(0);
        };

        if honour_repeat_one && self.mode == PlayMode::RepeatOne {
            return Some(position);
        }

        if position + 1 < len {
            Some(position + 1)
        } else if self.mode == PlayMode::Off {
            None
        } else {
            Some(0)
        }
    }

    fn previous_position(&self, honour_repeat_one: bool) -> Option<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }

        let Some(position) = self.position else {
            return Some(len - 1);
        };

        if honour_repeat_one && self.mode == PlayMode::RepeatOne {
            return Some(position);
        }

        // "Previous" always wraps
        Some(if position == 0 { len - 1 } else { position - 1 })
    }

    fn commit(&mut self, position: Option<usize>) -> Option<QueueTrack> {
        match position {
            Some(position) => {
                self.position = Some(position);
                self.state = QueueState::Active;
                self.track_at(position).cloned()
            }
            None => {
                debug!("Reached the end of the queue in mode {:?}", self.mode);
                self.position = None;
                self.state = QueueState::IdleAtEnd;
                None
            }
        }
    }

    // ===== State Queries =====

    /// Currently selected track
    pub fn current(&self) -> Option<&QueueTrack> {
        self.position.and_then(|position| self.track_at(position))
    }

    /// Current position in the effective order
    pub fn current_position(&self) -> Option<usize> {
        self.position
    }

    /// Original index of the current track
    pub fn current_original_index(&self) -> Option<usize> {
        self.position
            .and_then(|position| self.original_index_at(position).ok())
    }

    /// Track at an effective position
    pub fn track_at(&self, position: usize) -> Option<&QueueTrack> {
        self.original_index_at(position)
            .ok()
            .and_then(|index| self.tracks.get(index))
    }

    /// Original index of the track at an effective position
    pub fn original_index_at(&self, position: usize) -> Result<usize> {
        let len = self.tracks.len();
        let index = match &self.shuffle {
            Some(shuffle) => shuffle.to_original(position),
            None => (position < len).then_some(position),
        };
        index.ok_or(PlaybackError::IndexOutOfBounds {
            index: position,
            len,
        })
    }

    /// Tracks in effective order
    pub fn effective_order(&self) -> Vec<&QueueTrack> {
        match &self.shuffle {
            Some(shuffle) => shuffle.apply(&self.tracks),
            None => self.tracks.iter().collect(),
        }
    }

    /// Tracks in original order
    pub fn tracks(&self) -> &[QueueTrack] {
        &self.tracks
    }

    /// Source the queue was started from
    pub fn source(&self) -> Option<&QueueSource> {
        self.source.as_ref()
    }

    /// Get lifecycle state
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Build the UI summary
    pub fn summary(&self) -> QueueSummary {
        QueueSummary {
            source: self.source.clone(),
            order: self
                .effective_order()
                .into_iter()
                .map(|track| track.id.clone())
                .collect(),
            position: self.position,
        }
    }
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new()
    }
}
