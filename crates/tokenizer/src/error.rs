use thiserror::Error;

/// Errors that can occur while turning source bytes into token codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("parser unavailable: {0}")]
    Parser(String),
    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
    #[error("tokenizer failed: {0}")]
    Custom(String),
}

impl TokenizeError {
    pub fn custom<E: std::fmt::Display>(err: E) -> Self {
        Self::Custom(err.to_string())
    }
}
