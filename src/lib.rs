//! jflowc - statement resolution and code generation for a small Java-like language
//!
//! ## Architecture
//!
//! - **parser**: lexical analysis and parsing into units with per-method statement arenas
//! - **wash**: type table construction, method resolution, flow and definite assignment analysis
//! - **codegen**: lowering of resolved bodies onto an abstract target (`Architecture`)
//! - **ast**: units, statements, breakables and expressions
//! - **common**: errors, configuration and diagnostics
//!
//! ## Compilation Flow
//!
//! ```text
//! Source → Parser → Program → Enter → Resolve (per method) → Generate (per method) → Listings
//! ```
//!
//! Warnings never stop compilation. Any error excludes its unit from
//! generation and makes `compile` fail with the rendered diagnostics.

pub mod ast;
pub mod codegen;
pub mod common;
pub mod parser;
pub mod wash;

pub use codegen::MethodCode;
pub use common::{Config, Diagnostics, Error, Result};
pub use wash::RuntimeUse;

use std::path::Path;

use ast::Program;

/// Output of a successful compilation
#[derive(Debug)]
pub struct Compilation {
    /// Warnings collected while resolving
    pub diagnostics: Diagnostics,
    pub methods: Vec<MethodCode>,
    /// Runtime routines the generated code calls
    pub runtime: RuntimeUse,
}

impl Compilation {
    pub fn method(&self, name: &str) -> Option<&MethodCode> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Compile one source file held in memory
pub fn compile(source: &str, config: &Config) -> Result<Compilation> {
    config.validate()?;
    log::info!("parsing {} bytes", source.len());
    let program = parser::parse_program(source)?;
    compile_program(program, config)
}

/// Compile several sources as one program; units may refer to each other
pub fn compile_sources(sources: &[&str], config: &Config) -> Result<Compilation> {
    config.validate()?;
    log::info!("parsing {} sources", sources.len());
    let program = parser::parse_programs(sources)?;
    compile_program(program, config)
}

/// Compile a source file from disk
pub fn compile_file(path: impl AsRef<Path>, config: &Config) -> Result<Compilation> {
    let path = path.as_ref();
    log::info!("compiling {}", path.display());
    let source = std::fs::read_to_string(path)?;
    compile(&source, config)
}

fn compile_program(mut program: Program, config: &Config) -> Result<Compilation> {
    log::debug!("{} units parsed", program.units.len());

    let mut diagnostics = Diagnostics::new();
    let resolution = wash::resolve_program(&mut program, config, &mut diagnostics);
    for warning in diagnostics.warnings() {
        log::warn!("{}", warning);
    }
    if diagnostics.has_errors() {
        log::info!("resolution failed with {} error(s)", diagnostics.error_count());
        return Err(Error::semantic_error(diagnostics.render_errors()));
    }

    let methods = codegen::generate_program(&mut program, &resolution, config)?;
    log::info!("generated {} method(s)", methods.len());
    Ok(Compilation {
        diagnostics,
        methods,
        runtime: resolution.runtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_stop_compilation() {
        let out = compile("class A { int f() { return 1; return 2; } }", &Config::default()).unwrap();
        assert_eq!(out.diagnostics.warning_count(), 1);
        assert!(out.method("A.f/0").is_some());
    }

    #[test]
    fn test_errors_are_rendered() {
        let err = compile("class A { int f() { } }", &Config::default()).unwrap_err();
        assert!(err.to_string().contains("missing return statement"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config::default().with_word_size(3);
        assert!(matches!(compile("class A { }", &config), Err(Error::Config { .. })));
    }
}
