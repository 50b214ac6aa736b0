// Bar - Immutable hit/rest grid for one bar of one instrument
// Bars are shared via Arc; the empty bar is memoized per grid shape

use super::timeline::GridShape;
use super::{SequencerError, SequencerResult};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One shared empty bar per grid shape
static EMPTY_BARS: Lazy<Mutex<HashMap<GridShape, Arc<Bar>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slots {
    /// All rests
    Empty,
    /// Explicit sequence, length == grid_len
    Pattern(Box<[bool]>),
}

/// Immutable grid of `grid_len` boolean slots ("hit" or "rest")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    shape: GridShape,
    slots: Slots,
}

impl Bar {
    /// Shared empty bar for this grid shape
    ///
    /// Every call with the same shape returns the same allocation, so
    /// `Arc::ptr_eq` holds across all rolling bars of a kit.
    pub fn empty(shape: GridShape) -> Arc<Bar> {
        let mut cache = EMPTY_BARS.lock();
        cache
            .entry(shape)
            .or_insert_with(|| {
                Arc::new(Bar {
                    shape,
                    slots: Slots::Empty,
                })
            })
            .clone()
    }

    /// Pattern bar from an explicit sequence
    pub fn pattern(shape: GridShape, slots: Vec<bool>) -> SequencerResult<Arc<Bar>> {
        if slots.len() != shape.grid_len() {
            return Err(SequencerError::Configuration(format!(
                "pattern has {} ticks, grid {} expects {}",
                slots.len(),
                shape,
                shape.grid_len()
            )));
        }
        Ok(Arc::new(Bar {
            shape,
            slots: Slots::Pattern(slots.into_boxed_slice()),
        }))
    }

    /// Pattern bar from hit positions
    pub fn from_hits(shape: GridShape, hits: &[usize]) -> SequencerResult<Arc<Bar>> {
        let len = shape.grid_len();
        let mut slots = vec![false; len];
        for &index in hits {
            if index >= len {
                return Err(SequencerError::InvalidIndex { index, len });
            }
            slots[index] = true;
        }
        Self::pattern(shape, slots)
    }

    /// Parse a pattern string such as `"x...x...|x...x..."`
    ///
    /// Hits: `x`, `X`, `1`, `*`. Rests: `.`, `-`, `0`, `_`.
    /// Whitespace and `|` are ignored so bars can be written beat by beat.
    pub fn parse(shape: GridShape, text: &str) -> SequencerResult<Arc<Bar>> {
        let mut slots = Vec::with_capacity(shape.grid_len());
        for c in text.chars() {
            match c {
                'x' | 'X' | '1' | '*' => slots.push(true),
                '.' | '-' | '0' | '_' => slots.push(false),
                '|' => {}
                c if c.is_whitespace() => {}
                other => {
                    return Err(SequencerError::Configuration(format!(
                        "invalid pattern character '{}' in \"{}\"",
                        other, text
                    )));
                }
            }
        }
        Self::pattern(shape, slots)
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Number of slots in this bar
    pub fn len(&self) -> usize {
        self.shape.grid_len()
    }

    /// True for the all-rest variant (not merely a pattern without hits)
    pub fn is_empty_bar(&self) -> bool {
        matches!(self.slots, Slots::Empty)
    }

    /// Slot value without bounds reporting (callers guarantee the range)
    #[inline]
    fn slot(&self, index: usize) -> bool {
        match &self.slots {
            Slots::Empty => false,
            Slots::Pattern(slots) => slots[index],
        }
    }

    /// Bounds-checked slot access
    pub fn get(&self, index: usize) -> SequencerResult<bool> {
        self.check_index(index)?;
        Ok(self.slot(index))
    }

    /// Lazy iteration over all slots in index order
    /// Each call starts again from the first slot.
    pub fn iter(&self) -> BarIter<'_> {
        BarIter {
            bar: self,
            index: 0,
        }
    }

    /// Snapshot of `count` slots starting at `start`
    pub fn copy_range(&self, start: usize, count: usize) -> SequencerResult<Vec<bool>> {
        let len = self.len();
        match start.checked_add(count) {
            Some(end) if end <= len => Ok((start..end).map(|i| self.slot(i)).collect()),
            _ => Err(SequencerError::InvalidIndex {
                index: start.saturating_add(count),
                len,
            }),
        }
    }

    /// Snapshot from `start` to the end of the bar
    pub fn copy_from(&self, start: usize) -> SequencerResult<Vec<bool>> {
        if start > self.len() {
            return Err(SequencerError::InvalidIndex {
                index: start,
                len: self.len(),
            });
        }
        self.copy_range(start, self.len() - start)
    }

    /// Snapshot of the first `count` slots
    pub fn copy_prefix(&self, count: usize) -> SequencerResult<Vec<bool>> {
        self.copy_range(0, count)
    }

    /// New pattern bar equal to this one with a single slot flipped
    pub fn with_toggled(&self, index: usize) -> SequencerResult<Arc<Bar>> {
        self.check_index(index)?;
        let mut slots: Vec<bool> = self.iter().collect();
        slots[index] = !slots[index];
        Self::pattern(self.shape, slots)
    }

    /// Number of hits in the bar
    pub fn hit_count(&self) -> usize {
        self.iter().filter(|&hit| hit).count()
    }

    /// Pattern string using `x` for hits and `.` for rests
    pub fn to_pattern_string(&self) -> String {
        self.iter().map(|hit| if hit { 'x' } else { '.' }).collect()
    }

    fn check_index(&self, index: usize) -> SequencerResult<()> {
        if index < self.len() {
            Ok(())
        } else {
            Err(SequencerError::InvalidIndex {
                index,
                len: self.len(),
            })
        }
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per_beat = self.shape.ticks_per_beat() as usize;
        for (i, hit) in self.iter().enumerate() {
            if i > 0 && i % per_beat == 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", if hit { 'x' } else { '.' })?;
        }
        Ok(())
    }
}

/// Finite iterator over the slots of a bar
#[derive(Debug, Clone)]
pub struct BarIter<'a> {
    bar: &'a Bar,
    index: usize,
}

impl Iterator for BarIter<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.index >= self.bar.len() {
            return None;
        }
        let value = self.bar.slot(self.index);
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bar.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BarIter<'_> {}

impl<'a> IntoIterator for &'a Bar {
    type Item = bool;
    type IntoIter = BarIter<'a>;

    fn into_iter(self) -> BarIter<'a> {
        self.iter()
    }
}
