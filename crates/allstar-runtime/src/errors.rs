//! Error taxonomy, split along the recoverable/non-recoverable line drawn in
//! the error-handling design: recoverable recognition errors are caught at
//! rule-entry boundaries and handed to the error strategy; faults propagate
//! unchanged.

use allstar_bytecode::interval::IntervalSet;

/// Recoverable recognition errors. Generated rule methods catch these at
/// rule-entry boundaries, invoke the error strategy's recovery, and attach
/// an error node to the current parse tree.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecognitionError {
    #[error("mismatched input: expected one of {expected}, found token type {found}")]
    InputMismatch { found: i32, expected: IntervalSetDisplay },

    #[error("no viable alternative at input")]
    NoViableAlt { start_token_index: i64 },

    #[error("no lexer rule matches input at line {line}, column {column}")]
    LexerNoViableAlt { line: u32, column: u32 },

    #[error("rule failed predicate: {message}")]
    FailedPredicate {
        rule_index: u32,
        pred_index: u32,
        message: String,
    },
}

/// Wraps an `IntervalSet` for use inside a `#[error(...)]` format string
/// without requiring `IntervalSet` itself to live in this crate.
#[derive(Debug, Clone)]
pub struct IntervalSetDisplay(pub IntervalSet);

impl std::fmt::Display for IntervalSetDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-recoverable faults: violated invariants or malformed input that no
/// amount of recovery can paper over. These propagate up unchanged.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeFault {
    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Deserialization(#[from] allstar_bytecode::DeserializeError),

    #[error(transparent)]
    Stream(#[from] allstar_core::StreamError),
}
