use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open interval of list indices currently rendered by the view layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct VisibleRange {
    pub start: usize,
    pub end: usize,
}

impl VisibleRange {
    /// Create a range; an inverted interval collapses to an empty one at `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Width of the range; zero for an inverted one.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Limit the width of the range to `max_width`, keeping its start.
    pub fn clamped(self, max_width: usize) -> Self {
        if self.len() <= max_width {
            return self;
        }
        Self {
            start: self.start,
            end: self.start + max_width,
        }
    }

    /// Indices of this range that exist in a sequence of `len` elements.
    pub fn indices_within(self, len: usize) -> Range<usize> {
        let start = self.start.min(len);
        start..self.end.min(len).max(start)
    }
}

impl From<Range<usize>> for VisibleRange {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

/// Pagination request derived from a visible range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationAction {
    /// The user reached the end of the loaded rooms.
    AddOnePage,
    /// The user is back at the top; shrink the window to bound memory.
    ResetToOnePage,
    None,
}

impl PaginationAction {
    /// Decide the pagination request for `range` given `loaded_count` rooms.
    pub fn for_range(range: VisibleRange, loaded_count: usize) -> Self {
        if range.end >= loaded_count {
            Self::AddOnePage
        } else if range.start == 0 {
            Self::ResetToOnePage
        } else {
            Self::None
        }
    }
}
