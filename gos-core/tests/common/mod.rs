// gos-core - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for interpreter integration tests.

use gos_core::{eval_program, Context, Env, Error};
use gos_parser::{optimize, parse, PrimValue};

/// Evaluate a source string in a fresh environment, capturing output.
///
/// Returns the program's value and everything written by `out`.
pub fn eval_source(source: &str) -> Result<(PrimValue, String), Error> {
    eval_with_input(source, "")
}

/// Evaluate a source string with the given text available to `in`.
pub fn eval_with_input(source: &str, input: &str) -> Result<(PrimValue, String), Error> {
    let program = optimize(parse(source).expect("parse error"));

    let mut out = Vec::new();
    let mut reader = std::io::BufReader::new(input.as_bytes());
    let mut ctx = Context::new(&mut out, &mut reader);
    let mut env = Env::new();

    let value = eval_program(&program, &mut env, &mut ctx)?;
    Ok((value, String::from_utf8(out).expect("utf-8 output")))
}

/// Evaluate and return only the captured output, panicking on error.
#[allow(dead_code)]
pub fn output_of(source: &str) -> String {
    let (_, output) = eval_source(source).expect("evaluation error");
    output
}

/// Evaluate and return only the program value, panicking on error.
#[allow(dead_code)]
pub fn value_of(source: &str) -> PrimValue {
    let (value, _) = eval_source(source).expect("evaluation error");
    value
}
