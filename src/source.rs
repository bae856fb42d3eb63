use std::ops::{Range, RangeInclusive};

/// Byte offset into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceOffset(usize);

impl SourceOffset {
    pub fn byte_offset(&self) -> usize {
        self.0
    }
}

impl From<usize> for SourceOffset {
    fn from(offset: usize) -> Self {
        Self(offset)
    }
}

impl From<SourceOffset> for miette::SourceOffset {
    fn from(offset: SourceOffset) -> Self {
        offset.0.into()
    }
}
impl From<SourceOffset> for miette::SourceSpan {
    fn from(offset: SourceOffset) -> Self {
        Self::from(&SourceSpan::from(offset))
    }
}

/// Half-open byte range into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    start: SourceOffset,
    length: usize,
}

impl SourceSpan {
    pub fn new(start: SourceOffset, length: usize) -> Self {
        Self { start, length }
    }
    pub fn range(start: SourceOffset, end: SourceOffset) -> Self {
        Self {
            start,
            length: end.0 - start.0,
        }
    }
    pub fn range_inclusive(start: SourceOffset, end: SourceOffset) -> Self {
        Self {
            start,
            length: end.0 - start.0 + 1,
        }
    }
    pub fn start(&self) -> SourceOffset {
        self.start
    }
    pub fn end(&self) -> SourceOffset {
        (self.start.0 + self.length).into()
    }
    pub fn len(&self) -> usize {
        self.length
    }
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
    /// Smallest span covering both `self` and `other`.
    pub fn until(&self, other: SourceSpan) -> SourceSpan {
        SourceSpan::range(self.start.min(other.start), self.end().max(other.end()))
    }
}

impl From<SourceOffset> for SourceSpan {
    fn from(offset: SourceOffset) -> Self {
        Self::new(offset, 1)
    }
}
impl From<usize> for SourceSpan {
    fn from(offset: usize) -> Self {
        Self::new(offset.into(), 1)
    }
}
impl From<Range<usize>> for SourceSpan {
    fn from(range: Range<usize>) -> Self {
        Self::range(range.start.into(), range.end.into())
    }
}
impl From<RangeInclusive<usize>> for SourceSpan {
    fn from(range: RangeInclusive<usize>) -> Self {
        Self::range_inclusive((*range.start()).into(), (*range.end()).into())
    }
}

impl From<&SourceSpan> for miette::SourceSpan {
    fn from(span: &SourceSpan) -> Self {
        Self::new(span.start.into(), span.length)
    }
}
impl From<SourceSpan> for miette::SourceSpan {
    fn from(span: SourceSpan) -> Self {
        Self::from(&span)
    }
}
