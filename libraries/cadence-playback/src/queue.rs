//! Play queue with cursor, shuffle permutation and repeat policy
//!
//! ```text
//! items (insertion order):   [A, B, C, D, E]
//! shuffled (optional):       [2, 0, 4, 1, 3]   -> active order C A E B D
//! cursor:                     ^ index into the active order
//! ```
//!
//! Shuffling only replaces the permutation, so the set of tracks never
//! changes and turning shuffle off restores insertion order. All positions
//! taken and returned by this type are positions in the active order.
//!
//! The queue only exposes raw cursor movement. Policies such as "repeat one
//! replays on completion" or "stop at the end" belong to the manager.

use crate::error::{PlaybackError, Result};
use crate::shuffle::{is_permutation, shuffled_order};
use crate::types::{RepeatMode, Track};

/// Outcome of removing one entry
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    /// The removed track
    pub track: Track,

    /// The removed entry was the current track
    pub current_removed: bool,

    /// The current (last) entry was removed and the cursor wrapped to 0
    pub wrapped: bool,
}

/// Ordered play queue
#[derive(Debug, Clone, Default)]
pub struct Queue {
    /// Tracks in insertion order
    items: Vec<Track>,

    /// Permutation of indices into `items`, present iff shuffle is on
    shuffled: Option<Vec<usize>>,

    /// Position of the current track in the active order
    cursor: Option<usize>,

    /// Repeat policy consulted at the boundaries
    repeat: RepeatMode,
}

impl Queue {
    /// Create new empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a queue from persisted parts
    ///
    /// Fails if the permutation does not cover `items` exactly or the cursor
    /// does not point into the queue.
    pub fn from_parts(
        items: Vec<Track>,
        shuffled: Option<Vec<usize>>,
        cursor: Option<usize>,
        repeat: RepeatMode,
    ) -> Result<Self> {
        if let Some(order) = &shuffled {
            if !is_permutation(order, items.len()) {
                return Err(PlaybackError::InvalidSession(format!(
                    "shuffle order is not a permutation of {} items",
                    items.len()
                )));
            }
        }

        match (items.is_empty(), cursor) {
            (true, Some(c)) => {
                return Err(PlaybackError::InvalidSession(format!(
                    "cursor {} in empty queue",
                    c
                )))
            }
            (false, None) => {
                return Err(PlaybackError::InvalidSession(
                    "non-empty queue without cursor".to_string(),
                ))
            }
            (false, Some(c)) if c >= items.len() => {
                return Err(PlaybackError::InvalidSession(format!(
                    "cursor {} out of range for {} items",
                    c,
                    items.len()
                )))
            }
            _ => {}
        }

        Ok(Self {
            items,
            shuffled,
            cursor,
            repeat,
        })
    }

    // ===== Queries =====

    /// Total number of tracks in queue
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Map an active-order position to an index into `items`
    fn item_index(&self, position: usize) -> usize {
        match &self.shuffled {
            Some(order) => order[position],
            None => position,
        }
    }

    /// Get track at position in the active order
    pub fn get(&self, position: usize) -> Option<&Track> {
        if position < self.items.len() {
            self.items.get(self.item_index(position))
        } else {
            None
        }
    }

    /// Iterate tracks in the active order
    pub fn iter(&self) -> impl Iterator<Item = &Track> + '_ {
        (0..self.items.len()).map(move |p| &self.items[self.item_index(p)])
    }

    /// Tracks in insertion order
    pub fn items(&self) -> &[Track] {
        &self.items
    }

    /// Shuffle permutation, if shuffle is on
    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffled.as_deref()
    }

    /// Whether shuffle is on
    pub fn is_shuffled(&self) -> bool {
        self.shuffled.is_some()
    }

    /// Cursor position in the active order (`None` iff empty)
    pub fn position(&self) -> Option<usize> {
        self.cursor
    }

    /// Currently selected track
    pub fn current_track(&self) -> Option<&Track> {
        self.cursor.and_then(|c| self.get(c))
    }

    /// Track that `next()` would select, without moving
    pub fn peek_next(&self) -> Option<&Track> {
        let c = self.cursor?;
        if c + 1 < self.len() {
            self.get(c + 1)
        } else if self.repeat != RepeatMode::Off {
            self.get(0)
        } else {
            None
        }
    }

    /// Current repeat mode
    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    /// Set repeat mode (does not move the cursor)
    pub fn set_repeat(&mut self, mode: RepeatMode) {
        self.repeat = mode;
    }

    /// Whether the current track plays inside an album context
    ///
    /// True when shuffle is off and the neighbouring entry before or after
    /// the cursor belongs to the same album.
    pub fn in_album_context(&self) -> bool {
        if self.is_shuffled() {
            return false;
        }

        let (Some(c), Some(current)) = (self.cursor, self.current_track()) else {
            return false;
        };

        let before = c
            .checked_sub(1)
            .and_then(|p| self.get(p))
            .is_some_and(|t| t.same_album(current));
        let after = self.get(c + 1).is_some_and(|t| t.same_album(current));

        before || after
    }

    // ===== Replacement =====

    /// Replace contents, turn shuffle off and select `start_at` (clamped)
    pub fn set_items(&mut self, tracks: Vec<Track>, start_at: usize) {
        self.cursor = if tracks.is_empty() {
            None
        } else {
            Some(start_at.min(tracks.len() - 1))
        };
        self.items = tracks;
        self.shuffled = None;
    }

    /// Clear entire queue (repeat mode is kept)
    pub fn clear(&mut self) {
        self.items.clear();
        self.shuffled = None;
        self.cursor = None;
    }

    // ===== Cursor movement =====

    /// Advance one position
    ///
    /// Wraps to the first position at the end unless repeat is Off.
    /// Returns true iff the cursor advanced.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        let Some(c) = self.cursor else {
            return false;
        };

        if c + 1 < self.len() {
            self.cursor = Some(c + 1);
            true
        } else if self.repeat != RepeatMode::Off {
            self.cursor = Some(0);
            true
        } else {
            false
        }
    }

    /// Go back one position
    ///
    /// Wraps to the last position at the start unless repeat is Off.
    /// Returns true iff the cursor moved.
    pub fn prev(&mut self) -> bool {
        let Some(c) = self.cursor else {
            return false;
        };

        if c > 0 {
            self.cursor = Some(c - 1);
            true
        } else if self.repeat != RepeatMode::Off {
            self.cursor = Some(self.len() - 1);
            true
        } else {
            false
        }
    }

    /// Select a position, clamped to the queue
    ///
    /// Returns true if the cursor changed.
    pub fn skip_to(&mut self, position: usize) -> bool {
        if self.is_empty() {
            return false;
        }

        let target = position.min(self.len() - 1);
        let changed = self.cursor != Some(target);
        self.cursor = Some(target);
        changed
    }

    // ===== Shuffle =====

    /// Shuffle the active order with a seeded permutation
    ///
    /// The current track moves to the front and the cursor follows it.
    pub fn enable_shuffle(&mut self, seed: u64) {
        let anchor = self.cursor.map(|c| self.item_index(c));
        let order = shuffled_order(self.items.len(), seed, anchor);

        self.cursor = anchor.map(|_| 0);
        self.shuffled = Some(order);
    }

    /// Restore insertion order, keeping the current track selected
    pub fn disable_shuffle(&mut self) {
        if let Some(order) = self.shuffled.take() {
            self.cursor = self.cursor.map(|c| order[c]);
        }
    }

    // ===== Insertion / removal =====

    /// Insert tracks at a position in the active order
    ///
    /// The position is clamped to the end. The cursor is shifted when the
    /// insertion point is at or before it, so the current track never
    /// changes. With shuffle on, new tracks are appended to the insertion
    /// order and spliced into the permutation.
    ///
    /// Returns the position of the first inserted track.
    pub fn insert_at(&mut self, position: usize, tracks: Vec<Track>) -> usize {
        let count = tracks.len();
        let position = position.min(self.len());

        if count == 0 {
            return position;
        }

        match &mut self.shuffled {
            Some(order) => {
                let base = self.items.len();
                self.items.extend(tracks);
                order.splice(position..position, base..base + count);
            }
            None => {
                self.items.splice(position..position, tracks);
            }
        }

        self.cursor = match self.cursor {
            None => Some(0),
            Some(c) if position <= c => Some(c + count),
            Some(c) => Some(c),
        };

        position
    }

    /// Insert tracks right after the current track
    pub fn insert_next(&mut self, tracks: Vec<Track>) -> usize {
        let position = self.cursor.map_or(0, |c| c + 1);
        self.insert_at(position, tracks)
    }

    /// Append tracks to the end of the active order
    pub fn add_to_end(&mut self, tracks: Vec<Track>) -> usize {
        let position = self.len();
        self.insert_at(position, tracks)
    }

    /// Remove the entry at a position in the active order
    ///
    /// Removing the current entry selects the next surviving entry (wrapping
    /// to the first one if it was last), or leaves the queue without a
    /// cursor when it becomes empty.
    pub fn remove(&mut self, position: usize) -> Option<Removal> {
        if position >= self.len() {
            return None;
        }

        let item_index = self.item_index(position);
        if let Some(order) = &mut self.shuffled {
            order.remove(position);
            for i in order.iter_mut() {
                if *i > item_index {
                    *i -= 1;
                }
            }
        }
        let track = self.items.remove(item_index);

        let mut current_removed = false;
        let mut wrapped = false;

        if let Some(c) = self.cursor {
            if self.items.is_empty() {
                current_removed = true;
                self.cursor = None;
            } else if position < c {
                self.cursor = Some(c - 1);
            } else if position == c {
                current_removed = true;
                if position >= self.items.len() {
                    wrapped = true;
                    self.cursor = Some(0);
                }
            }
        }

        Some(Removal {
            track,
            current_removed,
            wrapped,
        })
    }

    /// Move an entry within the active order
    ///
    /// The cursor keeps pointing at the same track.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.len();
        if from >= len {
            return Err(PlaybackError::IndexOutOfBounds(from));
        }
        if to >= len {
            return Err(PlaybackError::IndexOutOfBounds(to));
        }
        if from == to {
            return Ok(());
        }

        match &mut self.shuffled {
            Some(order) => {
                let index = order.remove(from);
                order.insert(to, index);
            }
            None => {
                let track = self.items.remove(from);
                self.items.insert(to, track);
            }
        }

        if let Some(c) = self.cursor {
            self.cursor = Some(if c == from {
                to
            } else if from < c && to >= c {
                c - 1
            } else if from > c && to <= c {
                c + 1
            } else {
                c
            });
        }

        Ok(())
    }
}
