//! Common utilities and definitions shared across modules
//!
//! This module contains the crate-wide error type, the compilation
//! configuration, positioned diagnostics and shared constants.

pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod error;

// Re-export commonly used items for convenience
pub use config::Config;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
