use thiserror::Error;

/// Result type for jflowc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the jflowc compiler
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Lexical error at line {line}, column {column}: unexpected '{text}'")]
    Lexical {
        line: usize,
        column: usize,
        text: String,
    },

    #[error("Semantic error: {message}")]
    Semantic { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A bug in the compiler rather than in the input program
    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a parse error with location information
    pub fn parse_error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a semantic error
    pub fn semantic_error(message: impl Into<String>) -> Self {
        Self::Semantic { message: message.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create an internal compiler error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Whether this error indicates a compiler bug
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_mentions_position() {
        let e = Error::parse_error(3, 7, "expected ';'");
        assert_eq!(e.to_string(), "Parse error at line 3, column 7: expected ';'");
    }

    #[test]
    fn test_internal_errors_are_distinct_from_user_errors() {
        assert!(Error::internal("lost destination").is_internal());
        assert!(!Error::semantic_error("type mismatch").is_internal());
    }
}
