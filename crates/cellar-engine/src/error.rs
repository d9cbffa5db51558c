//! Error types for the Cellar engine.

use thiserror::Error;

/// Errors raised while decoding addresses, resolving ranges or evaluating formulas.
///
/// Address and range failures propagate to callers. Evaluation failures are
/// turned into the `#ERROR` display value by [`crate::engine::evaluate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("Range {0} covers more than {max} cells", max = crate::engine::MAX_RANGE_CELLS)]
    RangeTooLarge(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Result is not a finite number")]
    NonFinite,
}

pub type Result<T> = std::result::Result<T, EngineError>;
