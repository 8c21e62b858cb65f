//! Positioned compiler diagnostics
//!
//! Warnings (unreachable code) never stop a phase; errors are collected per
//! method by the driver and suppress code generation for the unit.

use std::fmt;

use crate::parser::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Span,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", self.span.start, tag, self.message)
    }
}

#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}: {}", span.start, message);
        self.items.push(Diagnostic { severity: Severity::Warning, span, message });
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        let message = message.into();
        log::debug!("error at {}: {}", span.start, message);
        self.items.push(Diagnostic { severity: Severity::Error, span, message });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One line per error, in report order
    pub fn render_errors(&self) -> String {
        self.errors().map(|d| d.to_string()).collect::<Vec<_>>().join("\n")
    }
}
