//! Abstract syntax tree
//!
//! Units and methods are plain owned data. Method bodies are arenas of
//! statements and breakables (see `stmt`), mutated in place by resolution.

pub mod expr;
pub mod printer;
pub mod stmt;
pub mod types;
pub mod unit;

pub use expr::*;
pub use printer::AstPrinter;
pub use stmt::*;
pub use types::*;
pub use unit::*;
