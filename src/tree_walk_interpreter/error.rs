use crate::{source::SourceSpan, source_reference::SourceReference};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber {
        operator: String,
        #[label("the '{operator}' operator expected a number")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers {
        operator: String,
        #[label("the '{operator}' operator expected numbers")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings {
        #[label("'+' takes two numbers or two strings")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable {
        name: String,
        #[label("not defined anywhere")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Undefined property '{name}'.")]
    UndefinedProperty {
        name: String,
        #[label("no such field or method")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Only instances have properties.")]
    PropertyOnNonInstance {
        #[label("property access on a non-instance")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Only instances have fields.")]
    FieldOnNonInstance {
        #[label("field assignment on a non-instance")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Can only call functions and classes.")]
    NotCallable {
        #[label("this is not callable")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass {
        #[label("this is not a class")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
    #[error("Expected {expected} arguments but got {actual}.")]
    ArityMismatch {
        expected: usize,
        actual: usize,
        #[label("called here")]
        found_at: SourceSpan,
        #[source_code]
        source_code: SourceReference,
    },
}

impl RuntimeError {
    pub fn span(&self) -> SourceSpan {
        match self {
            RuntimeError::OperandMustBeNumber { found_at, .. }
            | RuntimeError::OperandsMustBeNumbers { found_at, .. }
            | RuntimeError::OperandsMustBeNumbersOrStrings { found_at, .. }
            | RuntimeError::UndefinedVariable { found_at, .. }
            | RuntimeError::UndefinedProperty { found_at, .. }
            | RuntimeError::PropertyOnNonInstance { found_at, .. }
            | RuntimeError::FieldOnNonInstance { found_at, .. }
            | RuntimeError::NotCallable { found_at, .. }
            | RuntimeError::SuperclassMustBeClass { found_at, .. }
            | RuntimeError::ArityMismatch { found_at, .. } => *found_at,
        }
    }

    pub fn source_code(&self) -> &SourceReference {
        match self {
            RuntimeError::OperandMustBeNumber { source_code, .. }
            | RuntimeError::OperandsMustBeNumbers { source_code, .. }
            | RuntimeError::OperandsMustBeNumbersOrStrings { source_code, .. }
            | RuntimeError::UndefinedVariable { source_code, .. }
            | RuntimeError::UndefinedProperty { source_code, .. }
            | RuntimeError::PropertyOnNonInstance { source_code, .. }
            | RuntimeError::FieldOnNonInstance { source_code, .. }
            | RuntimeError::NotCallable { source_code, .. }
            | RuntimeError::SuperclassMustBeClass { source_code, .. }
            | RuntimeError::ArityMismatch { source_code, .. } => source_code,
        }
    }

    /// 1-based line of the failing operation, for the runtime error report.
    pub fn line(&self) -> usize {
        self.source_code().line_at(self.span().start())
    }
}
