//! Core results and error types

use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The scanner hit input it cannot tokenize.
    #[error("lex error at line {line}: {message}")]
    Lex {
        /// Line the offending input starts on (1-based).
        line: usize,
        /// Description of the lexing error.
        message: String,
    },

    /// The token stream does not match the grammar.
    #[error("syntax error at line {line}: {message}")]
    Syntax {
        /// Line of the offending token (1-based).
        line: usize,
        /// Description of the parsing error.
        message: String,
    },
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
