//! Renders collected errors in the classic reporting format:
//! `[line N] Error<where>: <message>` for static errors, and
//! `<message>` followed by `[line N]` for runtime errors.

use crate::{
    parser::ParserError,
    resolver::ResolverError,
    scanner::{ScanError, TokenKindName},
    source::SourceSpan,
    source_reference::SourceReference,
    tree_walk_interpreter::RuntimeError,
    vm_interpreter::{CompileError, VmError},
};

pub fn scan_error(error: &ScanError) -> String {
    format!("[line {}] Error: {}", error.line(), error)
}

pub fn parse_error(source: &SourceReference, error: &ParserError) -> String {
    error_at(
        source,
        error.span(),
        error.actual() == TokenKindName::Eof,
        &error.to_string(),
    )
}

pub fn resolve_error(source: &SourceReference, error: &ResolverError) -> String {
    error_at(source, error.span(), false, &error.to_string())
}

pub fn compile_error(error: &CompileError) -> String {
    let at = if error.at_end {
        " at end".to_string()
    } else {
        format!(" at '{}'", error.lexeme())
    };
    format!("[line {}] Error{}: {}", error.line(), at, error)
}

pub fn runtime_error(error: &RuntimeError) -> String {
    format!("{}\n[line {}]", error, error.line())
}

pub fn vm_error(error: &VmError) -> String {
    format!("{}\n[line {}]", error, error.line)
}

fn error_at(source: &SourceReference, span: SourceSpan, at_end: bool, message: &str) -> String {
    let at = if at_end {
        " at end".to_string()
    } else {
        format!(" at '{}'", source.slice(span))
    };
    format!("[line {}] Error{}: {}", source.line_at(span.start()), at, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn static_error_format() {
        let (program, scan_errors, parse_errors) = parse("test.lox", "print 1 +;\n@");
        assert_eq!(parse_errors.len(), 1);
        assert_eq!(scan_errors.len(), 1);
        assert_eq!(
            parse_error(&program.source_reference, &parse_errors[0]),
            "[line 1] Error at ';': Expect expression."
        );
        assert_eq!(
            scan_error(&scan_errors[0]),
            "[line 2] Error: Unexpected character '@'."
        );
    }

    #[test]
    fn error_at_end_of_input() {
        let (program, _, parse_errors) = parse("test.lox", "print 1");
        assert_eq!(
            parse_error(&program.source_reference, &parse_errors[0]),
            "[line 1] Error at end: Expect ';' after value."
        );
    }
}
