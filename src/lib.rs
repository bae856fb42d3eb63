pub mod ast;
pub mod diag;
mod fixed_que;
mod keywords;
pub mod parser;
pub mod resolver;
pub mod scanner;
mod side_table;
pub mod source;
pub mod source_reference;
pub mod tree_walk_interpreter;
pub mod vm_interpreter;

pub use parser::{Parser, ParserError};
pub use resolver::{Resolver, ResolverError};
pub use scanner::{ScanError, Scanner};
pub use source::{SourceOffset, SourceSpan};
pub use source_reference::SourceReference;
pub use tree_walk_interpreter::{Interpreter, PreparedProgram, RuntimeError, RuntimeValue};
pub use vm_interpreter::{InterpretError, Vm};

use ast::Program;
use scanner::TokenKind;

/// Scans and parses one source unit, collecting rather than aborting on
/// errors. Comment tokens never reach the parser.
pub fn parse(file_name: &str, source: &str) -> (Program, Vec<ScanError>, Vec<ParserError>) {
    let source_reference = SourceReference::new(file_name, source);
    let mut scan_errors = Vec::new();
    let tokens: Vec<scanner::Token> = Scanner::new(source)
        .filter_map(|result| match result {
            Ok(token) => Some(token),
            Err(error) => {
                scan_errors.push(error);
                None
            }
        })
        .filter(|token| token.kind != TokenKind::LineComment)
        .collect();
    let (program, parse_errors) = Parser::parse(tokens.into_iter(), source_reference);
    (program, scan_errors, parse_errors)
}
