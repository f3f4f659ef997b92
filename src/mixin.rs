//! Mixin types for structures.
//!
//! - `Located` is a generic wrapper that attaches a source line number to a value.
//! - `LocatedExt` is a trait that provides extension methods for creating `Located` instances.

/// A generic wrapper that attaches a source line number to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Located<T> {
    /// Wrapped content value
    content: T,
    /// One-based line in the source, zero when unknown
    line: u32,
}

impl<T> Located<T> {
    /// Instances a new `Located`
    pub const fn new(content: T, line: u32) -> Self {
        Self { content, line }
    }

    /// Returns the wrapped content.
    pub const fn content(&self) -> &T {
        &self.content
    }

    /// Takes the content out of the wrapper.
    pub fn into_content(self) -> T {
        self.content
    }

    /// Returns the source line.
    pub const fn line(&self) -> u32 {
        self.line
    }
}

/// Extension methods for `Located`.
pub trait LocatedExt {
    /// Instances a new `Located` at the given line.
    fn at_line(self, line: u32) -> Located<Self>
    where
        Self: Sized,
    {
        Located::new(self, line)
    }
}

impl<T> LocatedExt for T {}
