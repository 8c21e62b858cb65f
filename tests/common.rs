// Common test utilities
#![allow(dead_code)]

use jflowc::ast::{BreakableId, MethodBody, Program};
use jflowc::codegen::MethodCode;
use jflowc::parser::parse_program;
use jflowc::wash::{resolve_program, Resolution};
use jflowc::{compile, Compilation, Config, Diagnostics};

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

/// Compile with the default configuration, panicking on any error
pub fn compile_ok(source: &str) -> Compilation {
    compile_with(source, &Config::default())
}

pub fn compile_with(source: &str, config: &Config) -> Compilation {
    init_logger();
    match compile(source, config) {
        Ok(c) => c,
        Err(e) => panic!("compilation failed:\n{}", e),
    }
}

/// Compile expecting failure and return the rendered message
pub fn compile_err(source: &str) -> String {
    init_logger();
    match compile(source, &Config::default()) {
        Ok(_) => panic!("compilation unexpectedly succeeded"),
        Err(e) => e.to_string(),
    }
}

pub fn method<'a>(compilation: &'a Compilation, symbol: &str) -> &'a MethodCode {
    compilation
        .method(symbol)
        .unwrap_or_else(|| panic!("no method {} in {:?}", symbol, compilation.methods.iter().map(|m| &m.name).collect::<Vec<_>>()))
}

/// Parse and resolve without generating, keeping the annotated program
pub fn resolve(source: &str) -> (Program, Resolution, Diagnostics) {
    init_logger();
    let mut program = parse_program(source).expect("Failed to parse");
    let mut diags = Diagnostics::new();
    let resolution = resolve_program(&mut program, &Config::default(), &mut diags);
    (program, resolution, diags)
}

pub fn body<'a>(program: &'a Program, unit: &str, method: &str) -> &'a MethodBody {
    program
        .unit(unit)
        .and_then(|u| u.methods.iter().find(|m| m.name == method))
        .and_then(|m| m.body.as_ref())
        .expect("method with body")
}

pub fn labeled(body: &MethodBody, label: &str) -> BreakableId {
    let index = body
        .breakables
        .iter()
        .position(|b| b.has_label(label))
        .unwrap_or_else(|| panic!("no breakable labeled {}", label));
    BreakableId(index)
}
