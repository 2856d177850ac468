//! Shuffle permutation for queue traversal
//!
//! The queue content is never reordered. Shuffling builds a permutation
//! between original indices and shuffled positions, so toggling shuffle off
//! only needs a lookup and removing a track never re-shuffles the rest.

use crate::error::{PlaybackError, Result};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Bidirectional shuffle mapping
///
/// `to_shuffled[i]` is the shuffled position of original index `i` and
/// `to_original[p]` the original index at shuffled position `p`. The two
/// vectors are always mutual inverses of one permutation of `[0, len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShuffleIndex {
    to_shuffled: Vec<usize>,
    to_original: Vec<usize>,
}

impl ShuffleIndex {
    /// Build a uniformly random permutation of `[0, len)`
    ///
    /// When `pinned` is given, that original index is placed at shuffled
    /// position 0 and every other index is shuffled over positions `1..len`.
    pub fn build(len: usize, pinned: Option<usize>) -> Result<Self> {
        Self::build_with_rng(len, pinned, &mut thread_rng())
    }

    /// Same as [`ShuffleIndex::build`] with a caller-provided RNG
    pub fn build_with_rng<R: Rng + ?Sized>(
        len: usize,
        pinned: Option<usize>,
        rng: &mut R,
    ) -> Result<Self> {
        if let Some(index) = pinned {
            if index >= len {
                return Err(PlaybackError::IndexOutOfBounds { index, len });
            }
        }

        let mut to_original: Vec<usize> = (0..len).filter(|&i| Some(i) != pinned).collect();
        to_original.shuffle(rng);

        if let Some(index) = pinned {
            to_original.insert(0, index);
        }

        Ok(Self::from_order_unchecked(to_original))
    }

    /// Identity permutation (shuffled order == original order)
    pub fn identity(len: usize) -> Self {
        Self::from_order_unchecked((0..len).collect())
    }

    /// Build from an explicit shuffled order
    ///
    /// `to_original[p]` is the original index placed at shuffled position
    /// `p`. Rejects anything that is not a permutation of `[0, len)`.
    pub fn from_original_order(to_original: Vec<usize>) -> Result<Self> {
        let len = to_original.len();
        let mut seen = vec![false; len];

        for &index in &to_original {
            if index >= len {
                return Err(PlaybackError::InvalidPermutation(format!(
                    "index {} outside 0..{}",
                    index, len
                )));
            }
            if seen[index] {
                return Err(PlaybackError::InvalidPermutation(format!(
                    "index {} appears twice",
                    index
                )));
            }
            seen[index] = true;
        }

        Ok(Self::from_order_unchecked(to_original))
    }

    fn from_order_unchecked(to_original: Vec<usize>) -> Self {
        let mut to_shuffled = vec![0; to_original.len()];
        for (position, &index) in to_original.iter().enumerate() {
            to_shuffled[index] = position;
        }

        Self {
            to_shuffled,
            to_original,
        }
    }

    /// Number of elements in the permutation
    pub fn len(&self) -> usize {
        self.to_original.len()
    }

    /// Check if the permutation is empty
    pub fn is_empty(&self) -> bool {
        self.to_original.is_empty()
    }

    /// Shuffled position of an original index
    pub fn to_shuffled(&self, original_index: usize) -> Option<usize> {
        self.to_shuffled.get(original_index).copied()
    }

    /// Original index at a shuffled position
    pub fn to_original(&self, position: usize) -> Option<usize> {
        self.to_original.get(position).copied()
    }

    /// Original -> shuffled mapping
    pub fn shuffled_positions(&self) -> &[usize] {
        &self.to_shuffled
    }

    /// Shuffled -> original mapping (the shuffled order as original indices)
    pub fn original_indices(&self) -> &[usize] {
        &self.to_original
    }

    /// Derive the shuffled order of `items`
    ///
    /// `items` must be in original order and have the permutation's length;
    /// extra or missing items are skipped.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        self.to_original
            .iter()
            .filter_map(|&index| items.get(index))
            .collect()
    }

    /// Remove the element with original index `original_index`
    ///
    /// Every remaining element keeps its relative shuffled position and
    /// original indices above the removed one shift down by one, matching a
    /// `Vec::remove` on the content. Returns the shuffled position the
    /// element occupied. Out of range indices leave the permutation untouched.
    ///
    /// O(n) in the queue length: both maps are renumbered.
    pub fn remove_original_index(&mut self, original_index: usize) -> Result<usize> {
        let len = self.len();
        let Some(position) = self.to_shuffled(original_index) else {
            return Err(PlaybackError::IndexOutOfBounds {
                index: original_index,
                len,
            });
        };

        self.to_original.remove(position);
        for index in &mut self.to_original {
            if *index > original_index {
                *index -= 1;
            }
        }

        self.to_shuffled.truncate(len - 1);
        for (shuffled, &index) in self.to_original.iter().enumerate() {
            self.to_shuffled[index] = shuffled;
        }

        Ok(position)
    }

    /// Append a new original index at the end of the shuffled order
    pub fn push(&mut self) {
        let index = self.len();
        self.to_shuffled.push(index);
        self.to_original.push(index);
    }
}
