//! Errors raised by the input-stream abstractions. These are all
//! non-recoverable: violating a stream's marking discipline or seeking out
//! of bounds indicates a bug in the caller, not a recognition failure.

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("release of mark {requested} does not match the innermost outstanding mark {innermost}")]
    UnbalancedMark { requested: i64, innermost: i64 },

    #[error("seek index {index} out of bounds (stream size {size})")]
    SeekOutOfBounds { index: i64, size: i64 },

    #[error("index {index} out of bounds while reading token at lookahead {lookahead}")]
    TokenIndexOutOfBounds { index: i64, lookahead: i32 },
}
