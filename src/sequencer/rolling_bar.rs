// RollingBar - previous/current/next window over one instrument's bars
//
// The bar being played (`current`) is never modified once it has begun.
// Enable/disable and pattern edits only ever change `next`, so they become
// audible at the following bar boundary.

use super::bar::Bar;
use super::timeline::GridShape;
use super::{SequencerError, SequencerResult};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct RollingBar {
    shape: GridShape,
    /// Pattern used for every bar while the instrument is enabled
    template: Arc<Bar>,
    /// Shared empty bar for `shape`
    empty: Arc<Bar>,
    previous: Arc<Bar>,
    current: Arc<Bar>,
    next: Arc<Bar>,
    /// Ticks consumed inside `current`, in [0, grid_len]
    offset: usize,
    enabled: bool,
}

impl RollingBar {
    /// Create a rolling window for `template`
    ///
    /// The first bar is always silent; call `prime_current_to_template()`
    /// to make it sound immediately.
    pub fn new(template: Arc<Bar>, enabled: bool) -> Self {
        let shape = template.shape();
        let empty = Bar::empty(shape);
        let next = if enabled {
            Arc::clone(&template)
        } else {
            Arc::clone(&empty)
        };

        Self {
            shape,
            template,
            previous: Arc::clone(&empty),
            current: Arc::clone(&empty),
            next,
            empty,
            offset: 0,
            enabled,
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Ticks already consumed in the current bar
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn template(&self) -> &Arc<Bar> {
        &self.template
    }

    pub fn previous_bar(&self) -> &Arc<Bar> {
        &self.previous
    }

    pub fn current_bar(&self) -> &Arc<Bar> {
        &self.current
    }

    pub fn next_bar(&self) -> &Arc<Bar> {
        &self.next
    }

    /// Consume one tick
    ///
    /// When the current bar is exhausted the window rolls first, so every
    /// call advances exactly one tick and never returns a gap.
    pub fn next_tick(&mut self) -> bool {
        if self.offset >= self.shape.grid_len() {
            self.roll();
        }
        let hit = self.current.get(self.offset).unwrap_or(false);
        self.offset += 1;
        hit
    }

    /// previous ← current, current ← next, next ← template or empty
    fn roll(&mut self) {
        self.previous = std::mem::replace(&mut self.current, Arc::clone(&self.next));
        self.next = self.queued_bar();
        self.offset = 0;
    }

    fn queued_bar(&self) -> Arc<Bar> {
        if self.enabled {
            Arc::clone(&self.template)
        } else {
            Arc::clone(&self.empty)
        }
    }

    /// Queue the template for the next bar
    pub fn enable(&mut self) {
        self.enabled = true;
        self.next = self.queued_bar();
    }

    /// Queue silence for the next bar
    pub fn disable(&mut self) {
        self.enabled = false;
        self.next = self.queued_bar();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.enable();
        } else {
            self.disable();
        }
    }

    /// Flip one tick of the next bar
    ///
    /// An empty `next` is materialized as a pattern bar. While enabled the
    /// edit is also kept in the template so later bars repeat it.
    /// Returns false (and changes nothing) when `index` is out of range.
    pub fn toggle_next_bar_tick(&mut self, index: usize) -> bool {
        let Ok(toggled) = self.next.with_toggled(index) else {
            return false;
        };
        if self.enabled {
            self.template = Arc::clone(&toggled);
        }
        self.next = toggled;
        true
    }

    /// Flip one tick of the template without touching `next`
    /// Used to keep edits on a disabled instrument until it is re-enabled.
    pub fn toggle_template_tick(&mut self, index: usize) -> bool {
        let Ok(toggled) = self.template.with_toggled(index) else {
            return false;
        };
        self.template = toggled;
        if self.enabled {
            self.next = Arc::clone(&self.template);
        }
        true
    }

    /// Replace the template; the next bar follows if enabled
    pub fn set_template(&mut self, template: Arc<Bar>) -> SequencerResult<()> {
        if template.shape() != self.shape {
            return Err(SequencerError::Configuration(format!(
                "template grid {} does not match rolling bar grid {}",
                template.shape(),
                self.shape
            )));
        }
        self.template = template;
        self.next = self.queued_bar();
        Ok(())
    }

    /// Restart the window so the first bar already reflects `enabled`
    ///
    /// Overrides the usual "first bar is whatever was queued" rule; used
    /// once when playback starts. History is cleared and the cursor rewinds.
    pub fn prime_current_to_template(&mut self) {
        self.previous = Arc::clone(&self.empty);
        self.current = self.queued_bar();
        self.next = self.queued_bar();
        self.offset = 0;
    }

    /// `grid_len` ticks ending at the cursor followed by `grid_len` ticks
    /// starting at the cursor
    ///
    /// Past half: tail of `previous` + consumed prefix of `current`.
    /// Future half: unconsumed suffix of `current` + head of `next`.
    pub fn display(&self) -> Vec<bool> {
        let len = self.shape.grid_len();
        let offset = self.offset.min(len);
        let mut window = Vec::with_capacity(len * 2);

        window.extend(self.previous.iter().skip(offset));
        window.extend(self.current.iter().take(offset));
        window.extend(self.current.iter().skip(offset));
        window.extend(self.next.iter().take(offset));

        window
    }
}
