use std::sync::Arc;

use miette::{MietteError, MietteSpanContents, SourceCode, SpanContents};

use crate::source::{SourceOffset, SourceSpan};

#[derive(Debug)]
struct SourceReferenceInner {
    name: String,
    text: String,
}

/// Cheaply cloneable handle to a named piece of source text. Error values
/// carry one of these so a diagnostic can be rendered long after the
/// pipeline that produced it has been torn down.
#[derive(Clone, Debug)]
pub struct SourceReference(Arc<SourceReferenceInner>);

impl SourceReference {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        SourceReference(Arc::new(SourceReferenceInner {
            name: name.into(),
            text: text.into(),
        }))
    }
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn text(&self) -> &str {
        &self.0.text
    }
    /// The source text covered by `span`, clamped to the buffer.
    pub fn slice(&self, span: SourceSpan) -> &str {
        let text = self.text();
        let start = span.start().byte_offset().min(text.len());
        let end = span.end().byte_offset().min(text.len());
        &text[start..end]
    }
    /// 1-based line number containing `offset`.
    pub fn line_at(&self, offset: SourceOffset) -> usize {
        let upto = offset.byte_offset().min(self.text().len());
        1 + self.text()[..upto].bytes().filter(|b| *b == b'\n').count()
    }
}

impl SourceCode for SourceReference {
    fn read_span<'a>(
        &'a self,
        span: &miette::SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
        let contents = self
            .text()
            .read_span(span, context_lines_before, context_lines_after)?;
        Ok(Box::new(MietteSpanContents::new_named(
            self.name().to_string(),
            contents.data(),
            *contents.span(),
            contents.line(),
            contents.column(),
            contents.line_count(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn line_lookup() {
        let source = SourceReference::new("test.lox", "one;\ntwo;\nthree;\n");
        assert_eq!(source.line_at(0.into()), 1);
        assert_eq!(source.line_at(4.into()), 1);
        assert_eq!(source.line_at(5.into()), 2);
        assert_eq!(source.line_at(11.into()), 3);
        // past the end clamps to the last line
        assert_eq!(source.line_at(9999.into()), 4);
    }

    #[test]
    fn slicing_clamps() {
        let source = SourceReference::new("test.lox", "print 1;");
        assert_eq!(source.slice(SourceSpan::from(0..5)), "print");
        assert_eq!(source.slice(SourceSpan::from(6..9999)), "1;");
    }
}
