use super::span::Location;
use crate::common::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub enum ParseError {
    /// Unexpected token encountered
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },

    /// Unexpected end of input
    UnexpectedEndOfInput {
        expected: String,
        location: Location,
    },

    /// Input that lexes but is not part of the accepted language
    InvalidSyntax {
        message: String,
        location: Location,
    },

    /// Character sequence no token matches
    LexicalError {
        text: String,
        location: Location,
    },
}

impl ParseError {
    pub fn unexpected_token(expected: &str, found: &str, location: Location) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            location,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, location: Location) -> Self {
        ParseError::UnexpectedEndOfInput {
            expected: expected.to_string(),
            location,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, location: Location) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            location,
        }
    }

    pub fn location(&self) -> Location {
        match self {
            ParseError::UnexpectedToken { location, .. }
            | ParseError::UnexpectedEndOfInput { location, .. }
            | ParseError::InvalidSyntax { location, .. }
            | ParseError::LexicalError { location, .. } => *location,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found, .. } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            ParseError::UnexpectedEndOfInput { expected, .. } => {
                write!(f, "expected {}, found end of input", expected)
            }
            ParseError::InvalidSyntax { message, .. } => write!(f, "{}", message),
            ParseError::LexicalError { text, .. } => write!(f, "unexpected '{}'", text),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        let loc = err.location();
        match err {
            ParseError::LexicalError { text, .. } => Error::Lexical {
                line: loc.line,
                column: loc.column,
                text,
            },
            other => Error::parse_error(loc.line, loc.column, other.to_string()),
        }
    }
}
