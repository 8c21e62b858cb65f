mod common;

use std::fs;

use jflowc::{compile_file, compile_sources, Config, Error};
use tempfile::TempDir;

#[test]
fn test_compile_file_from_disk() {
    common::init_logger();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("counter.jl");
    fs::write(&path, "class Counter { int n; void bump() { n = n + 1; } }").unwrap();

    let out = compile_file(&path, &Config::default()).expect("compile");
    assert_eq!(out.methods.len(), 1);
    assert_eq!(out.methods[0].name, "Counter.bump/0");
}

#[test]
fn test_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = compile_file(dir.path().join("absent.jl"), &Config::default()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_sources_see_each_other() {
    let out = compile_sources(
        &["class Base { int get() { return 1; } }", "class Derived extends Base { int twice() { return get() + get(); } }"],
        &Config::default(),
    )
    .expect("compile");
    assert!(out.method("Derived.twice/0").is_some());
}

#[test]
fn test_every_error_is_reported() {
    let source = "class A {\n  void f() { break; }\n  int g() { }\n}";
    let err = jflowc::compile(source, &Config::default()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("2:14: error: break outside switch or loop"), "{}", message);
    assert!(message.contains("missing return statement"), "{}", message);
}
