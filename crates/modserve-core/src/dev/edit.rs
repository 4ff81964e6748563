//! Positional text edits anchored to the original source.
//!
//! Edits are recorded against offsets into the untouched original and
//! applied in a single pass by [`EditBuffer::finish`], so no edit is ever
//! computed against an already-shifted buffer.

use std::borrow::Cow;
use thiserror::Error;

/// An edit that cannot be applied to the original source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("offset {pos} is out of bounds or not on a char boundary")]
    InvalidOffset { pos: usize },

    #[error("overwrite {start}..{end} overlaps an earlier overwrite")]
    Overlap { start: usize, end: usize },

    #[error("insert at {pos} falls inside an overwritten range")]
    InsideOverwrite { pos: usize },
}

impl EditError {
    /// The offset the error is anchored to.
    #[must_use]
    pub fn pos(&self) -> usize {
        match self {
            Self::InvalidOffset { pos } | Self::InsideOverwrite { pos } => *pos,
            Self::Overlap { start, .. } => *start,
        }
    }
}

#[derive(Debug, Clone)]
struct Overwrite {
    start: usize,
    end: usize,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// Attached to the chunk ending at the anchor.
    After,
    /// Attached to the chunk starting at the anchor.
    Before,
}

#[derive(Debug, Clone)]
struct Insert {
    pos: usize,
    side: Side,
    text: String,
}

/// Ordered set of edits over an immutable original source.
#[derive(Debug, Clone)]
pub struct EditBuffer<'a> {
    original: &'a str,
    prepends: Vec<String>,
    overwrites: Vec<Overwrite>,
    inserts: Vec<Insert>,
}

impl<'a> EditBuffer<'a> {
    #[must_use]
    pub fn new(original: &'a str) -> Self {
        Self {
            original,
            prepends: Vec::new(),
            overwrites: Vec::new(),
            inserts: Vec::new(),
        }
    }

    /// The source the edits are anchored to.
    #[must_use]
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Whether any edit has been requested.
    #[must_use]
    pub fn has_edits(&self) -> bool {
        !(self.prepends.is_empty() && self.overwrites.is_empty() && self.inserts.is_empty())
    }

    /// Insert `text` at the very start of the output. Multiple prepends keep
    /// call order.
    pub fn prepend(&mut self, text: impl Into<String>) {
        self.prepends.push(text.into());
    }

    /// Replace `start..end` of the original with `text`.
    pub fn overwrite(
        &mut self,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<(), EditError> {
        self.check_offset(start)?;
        self.check_offset(end)?;
        if start >= end {
            return Err(EditError::InvalidOffset { pos: start });
        }
        if self
            .overwrites
            .iter()
            .any(|o| start < o.end && o.start < end)
        {
            return Err(EditError::Overlap { start, end });
        }
        if self.inserts.iter().any(|i| start < i.pos && i.pos < end) {
            return Err(EditError::InsideOverwrite { pos: start });
        }
        self.overwrites.push(Overwrite {
            start,
            end,
            text: text.into(),
        });
        Ok(())
    }

    /// Insert `text` at `pos`, after any overwrite that ends at `pos`.
    pub fn insert_after(&mut self, pos: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.insert(pos, Side::After, text.into())
    }

    /// Insert `text` at `pos`, before any overwrite that starts at `pos`.
    pub fn insert_before(&mut self, pos: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.insert(pos, Side::Before, text.into())
    }

    fn insert(&mut self, pos: usize, side: Side, text: String) -> Result<(), EditError> {
        self.check_offset(pos)?;
        if self.overwrites.iter().any(|o| o.start < pos && pos < o.end) {
            return Err(EditError::InsideOverwrite { pos });
        }
        self.inserts.push(Insert { pos, side, text });
        Ok(())
    }

    fn check_offset(&self, pos: usize) -> Result<(), EditError> {
        if self.original.is_char_boundary(pos) {
            Ok(())
        } else {
            Err(EditError::InvalidOffset { pos })
        }
    }

    /// Apply every edit against the original offsets.
    ///
    /// Returns the original, borrowed, when no edit was requested.
    #[must_use]
    pub fn finish(self) -> Cow<'a, str> {
        if !self.has_edits() {
            return Cow::Borrowed(self.original);
        }

        let Self {
            original,
            prepends,
            overwrites,
            inserts,
        } = self;

        // At one anchor: inserts after, inserts before, then the overwrite.
        let mut ops: Vec<(usize, u8, usize, usize, &str)> = inserts
            .iter()
            .map(|i| {
                let rank = match i.side {
                    Side::After => 0,
                    Side::Before => 1,
                };
                (i.pos, rank, i.pos, i.pos, i.text.as_str())
            })
            .chain(
                overwrites
                    .iter()
                    .map(|o| (o.start, 2, o.start, o.end, o.text.as_str())),
            )
            .collect();
        // Stable: equal anchors keep call order.
        ops.sort_by_key(|&(anchor, rank, ..)| (anchor, rank));

        let extra: usize = prepends.iter().map(String::len).sum::<usize>()
            + ops.iter().map(|op| op.4.len()).sum::<usize>();
        let mut out = String::with_capacity(original.len() + extra);
        for text in &prepends {
            out.push_str(text);
        }

        let mut cursor = 0;
        for (_, _, start, end, text) in ops {
            out.push_str(&original[cursor..start]);
            out.push_str(text);
            cursor = end;
        }
        out.push_str(&original[cursor..]);

        Cow::Owned(out)
    }
}
