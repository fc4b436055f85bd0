//! Source locations shared by every token, AST node, checked node, and MIR instruction.

use std::fmt;

use crate::intern::{InternerBuilder, StringId};

/// A single point in a source file: 0-indexed line and column, plus an absolute
/// byte offset used for range arithmetic and slicing the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
pub struct Pos {
    pub line: u32,
    pub col: u32,
    pub byte: u32,
}

impl Pos {
    #[must_use]
    pub const fn new(line: u32, col: u32, byte: u32) -> Self {
        Self { line, col, byte }
    }
}

/// `(file_id, start_line, start_col, start_pos, end_line, end_col, end_pos)`.
///
/// Immutable once constructed. `file` is an interned filename rather than a
/// `String` so `Location` stays `Copy`, mirroring how the teacher keeps
/// `CodeRange` cheap to pass around by interning the filename.
#[derive(Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub file: StringId,
    start: Pos,
    end: Pos,
}

impl Location {
    #[must_use]
    pub const fn new(file: StringId, start: Pos, end: Pos) -> Self {
        Self { file, start, end }
    }

    /// Location for a single point (e.g. EOF), with `start == end`.
    #[must_use]
    pub const fn point(file: StringId, pos: Pos) -> Self {
        Self { file, start: pos, end: pos }
    }

    #[must_use]
    pub const fn start(&self) -> Pos {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> Pos {
        self.end
    }

    /// Returns a new location spanning from `self`'s start to `other`'s end.
    ///
    /// Used when a parser folds several sub-nodes into one larger node and
    /// wants the parent's location to cover the whole production.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self { file: self.file, start: self.start, end: other.end }
    }

    #[must_use]
    pub fn is_within(&self, file_len: u32) -> bool {
        self.start.byte <= self.end.byte && self.end.byte <= file_len
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}..{}:{}",
            self.file.index(),
            self.start.line,
            self.start.col,
            self.end.line,
            self.end.col
        )
    }
}

/// Renders `file:line:col` (1-indexed for humans) for diagnostic headers.
pub fn format_start(loc: Location, interner: &InternerBuilder) -> String {
    format!(
        "{}:{}:{}",
        interner.resolve(loc.file),
        loc.start.line + 1,
        loc.start.col + 1
    )
}
