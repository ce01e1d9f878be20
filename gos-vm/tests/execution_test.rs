// gos-vm - End-to-end execution tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Full-pipeline tests: source through preprocess-free front end,
//! compiler and VM, plus parity checks against the tree-walking
//! interpreter.

use gos_core::{eval_program, Context, Env};
use gos_parser::{optimize, parse, PrimValue};
use gos_vm::{compile, Chunk, OpCode, Outcome, RuntimeError, Vm};

/// Compile and run a source string, capturing output.
///
/// Asserts the value stack is fully drained afterwards: every program
/// must be stack-balanced.
fn run_source(source: &str) -> Result<(Outcome, String), RuntimeError> {
    run_with_input(source, "")
}

fn run_with_input(source: &str, input: &str) -> Result<(Outcome, String), RuntimeError> {
    let program = optimize(parse(source).expect("parse error"));
    let chunk = compile(&program).expect("compile error");

    let mut out = Vec::new();
    let mut reader = std::io::BufReader::new(input.as_bytes());
    let mut ctx = Context::new(&mut out, &mut reader);

    let mut vm = Vm::new();
    let outcome = vm.run(&chunk, &mut ctx)?;
    if matches!(outcome, Outcome::Finished(_)) {
        assert_eq!(vm.stack_len(), 0, "stack not balanced for: {}", source);
    }
    Ok((outcome, String::from_utf8(out).expect("utf-8 output")))
}

fn output_of(source: &str) -> String {
    let (_, output) = run_source(source).expect("runtime error");
    output
}

fn value_of(source: &str) -> PrimValue {
    match run_source(source).expect("runtime error").0 {
        Outcome::Finished(value) => value,
        Outcome::Exited(status) => panic!("unexpected exit({})", status),
    }
}

/// Run the same source on the tree-walking interpreter.
fn interpret_output(source: &str) -> String {
    let program = optimize(parse(source).expect("parse error"));
    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let mut env = Env::new();
    eval_program(&program, &mut env, &mut ctx).expect("interpreter error");
    String::from_utf8(out).expect("utf-8 output")
}

// ============================================================================
// Language scenarios
// ============================================================================

#[test]
fn test_arithmetic_output() {
    assert_eq!(output_of("let x = (1 + 2) * 3  out x"), "9\n");
}

#[test]
fn test_while_countdown() {
    assert_eq!(
        output_of("let n = 10  while (n > 0) { out n n-- }"),
        "10\n9\n8\n7\n6\n5\n4\n3\n2\n1\n"
    );
}

#[test]
fn test_iterative_fibonacci() {
    let src = "fun f(x) { if (x <= 1) return x else { let a = 0 let b = 1 \
               while (x > 1) { let tmp = a + b  a = b  b = tmp  x-- } return b } }  out f(10)";
    assert_eq!(output_of(src), "55\n");
}

#[test]
fn test_recursive_fibonacci() {
    let src = "fun fib(n a b) { if n == 0 return a  return fib(n - 1 b a + b) }  out fib(40 0 1)";
    assert_eq!(output_of(src), "102334155\n");
}

#[test]
fn test_block_yields_last_value() {
    assert_eq!(output_of("let x = { let a = 1  let b = 2  a + b }  out x"), "3\n");
}

#[test]
fn test_label_goto_countdown() {
    assert_eq!(
        output_of("let n = 3  label: out n  n--  if n != 0 goto label"),
        "3\n2\n1\n"
    );
}

#[test]
fn test_goto_loop_stays_stack_balanced() {
    // A long goto loop; run_source asserts the stack drains to zero.
    let src = "let n = 1000  top: n--  if n != 0 goto top  out n";
    assert_eq!(output_of(src), "0\n");
}

#[test]
fn test_forward_goto() {
    assert_eq!(output_of("goto skip  out 1  skip: out 2"), "2\n");
}

#[test]
fn test_nested_function_calls() {
    let src = "fun double(x) { return x + x } \
               fun quad(x) { return double(double(x)) } \
               out quad(3)";
    assert_eq!(output_of(src), "12\n");
}

#[test]
fn test_function_declared_after_globals() {
    // Parameters land in frame-relative slots even when globals exist.
    let src = "let g = 10 fun add(a b) { return a + b } out add(g 5)";
    assert_eq!(output_of(src), "15\n");
}

#[test]
fn test_if_yields_branch_value() {
    assert_eq!(value_of("let x = 5 if x > 0 { 1 } else { 2 }"), PrimValue::Number(1.0));
    assert_eq!(value_of("let x = 5 if x < 0 { 1 } else { 2 }"), PrimValue::Number(2.0));
}

#[test]
fn test_if_without_else_on_false_is_unit() {
    assert_eq!(value_of("let x = 0 if x > 0 { 1 }"), PrimValue::Unit);
}

#[test]
fn test_string_operations() {
    assert_eq!(output_of("out 'foo' + 'bar'"), "foobar\n");
    assert_eq!(value_of("'abc' < 'abd'"), PrimValue::Bool(true));
}

#[test]
fn test_inc_dec_store_back() {
    assert_eq!(output_of("let n = 5  n++  out n"), "6\n");
    assert_eq!(output_of("let n = 5  n--  out n"), "4\n");
}

#[test]
fn test_in_reads_into_slot() {
    let (_, output) = run_with_input("in name out name", "gos\n").unwrap();
    assert_eq!(output, "gos\n");
}

#[test]
fn test_exit_outcome() {
    let (outcome, output) = run_source("out 1 exit 3 out 2").unwrap();
    assert_eq!(outcome, Outcome::Exited(3));
    assert_eq!(output, "1\n");
}

#[test]
fn test_eval_pushes_result() {
    assert_eq!(value_of("eval '1 + 2'"), PrimValue::Number(3.0));
    assert_eq!(output_of("out eval '40 + 2'"), "42\n");
}

#[test]
fn test_eval_shares_context() {
    assert_eq!(output_of("eval 'out 7'"), "7\n");
}

#[test]
fn test_truthiness_in_jumps() {
    assert_eq!(value_of("if 0 { 1 } else { 2 }"), PrimValue::Number(2.0));
    assert_eq!(value_of("if '' { 1 } else { 2 }"), PrimValue::Number(2.0));
    assert_eq!(value_of("if null { 1 } else { 2 }"), PrimValue::Number(2.0));
    assert_eq!(value_of("if 'x' { 1 } else { 2 }"), PrimValue::Number(1.0));
}

#[test]
fn test_logical_operators() {
    assert_eq!(value_of("true && false"), PrimValue::Bool(false));
    assert_eq!(value_of("true || false"), PrimValue::Bool(true));
    assert_eq!(value_of("6 & 3"), PrimValue::Number(2.0));
    assert_eq!(value_of("6 | 3"), PrimValue::Number(7.0));
    assert_eq!(value_of("6 ^ 3"), PrimValue::Number(5.0));
}

#[test]
fn test_division_yields_fractions() {
    assert_eq!(value_of("7 / 2"), PrimValue::Number(3.5));
}

// ============================================================================
// Parity with the tree-walking interpreter
// ============================================================================

#[test]
fn test_parity_with_interpreter() {
    let scenarios = [
        "let x = (1 + 2) * 3  out x",
        "let n = 10  while (n > 0) { out n n-- }",
        "fun f(x) { if (x <= 1) return x else { let a = 0 let b = 1 \
         while (x > 1) { let tmp = a + b  a = b  b = tmp  x-- } return b } }  out f(10)",
        "fun fib(n a b) { if n == 0 return a  return fib(n - 1 b a + b) }  out fib(40 0 1)",
        "let x = { let a = 1  let b = 2  a + b }  out x",
        "let n = 3  label: out n  n--  if n != 0 goto label",
        "out 'foo' + 'bar'",
        "let x = 1 { let x = 2 out x } out x",
    ];

    for src in scenarios {
        assert_eq!(
            output_of(src),
            interpret_output(src),
            "VM and interpreter disagree on: {}",
            src
        );
    }
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_division_by_zero() {
    let err = run_source("let z = 0 out 1 / z").unwrap_err();
    assert!(matches!(err, RuntimeError::Op(_)), "got {:?}", err);
}

#[test]
fn test_type_mismatch() {
    let err = run_source("out 1 + 'a'").unwrap_err();
    assert!(matches!(err, RuntimeError::Op(_)), "got {:?}", err);
}

#[test]
fn test_unknown_opcode() {
    let mut chunk = Chunk::new();
    chunk.code = vec![0xFE];

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let err = Vm::new().run(&chunk, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::UnknownOpcode(0xFE)));
}

#[test]
fn test_stack_underflow() {
    let mut chunk = Chunk::new();
    chunk.code = vec![OpCode::Pop as u8, OpCode::Halt as u8];

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let err = Vm::new().run(&chunk, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::StackUnderflow));
}

#[test]
fn test_jump_out_of_range() {
    let mut chunk = Chunk::new();
    chunk.code = vec![OpCode::Jump as u8, 0xFF, 0xFF, OpCode::Halt as u8];

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let err = Vm::new().run(&chunk, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::JumpOutOfRange(0xFFFF)));
}

#[test]
fn test_ip_runs_off_the_code() {
    let mut chunk = Chunk::new();
    chunk.code = vec![OpCode::Pos as u8];
    chunk.constants.push(PrimValue::Number(1.0));

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    // Pos underflows first; an empty chunk exercises the ip check.
    assert!(Vm::new().run(&chunk, &mut ctx).is_err());

    let empty = Chunk::new();
    let err = Vm::new().run(&empty, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::IpOutOfRange(0)));
}

#[test]
fn test_ret_without_frame() {
    let mut chunk = Chunk::new();
    chunk.constants.push(PrimValue::Unit);
    chunk.code = vec![
        OpCode::LoadConst as u8,
        0,
        OpCode::Ret as u8,
        OpCode::Halt as u8,
    ];

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let err = Vm::new().run(&chunk, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::CallStackUnderflow));
}

#[test]
fn test_constant_out_of_range() {
    let mut chunk = Chunk::new();
    chunk.code = vec![OpCode::LoadConst as u8, 7, OpCode::Halt as u8];

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    let err = Vm::new().run(&chunk, &mut ctx).unwrap_err();
    assert!(matches!(err, RuntimeError::ConstantOutOfRange(7)));
}

#[test]
fn test_eval_with_bad_source() {
    let err = run_source("eval 'let'").unwrap_err();
    assert!(matches!(err, RuntimeError::Eval(_)));
}

#[test]
fn test_eval_requires_string() {
    let err = run_source("eval 42").unwrap_err();
    assert!(matches!(err, RuntimeError::TypeError { .. }));
}

// ============================================================================
// Serialization through the pipeline
// ============================================================================

#[test]
fn test_compiled_chunk_round_trips_and_runs() {
    let program = optimize(parse("let x = (1 + 2) * 3  out x").expect("parse error"));
    let chunk = compile(&program).expect("compile error");

    let bytes = gos_vm::save(&chunk).expect("serialize error");
    let loaded = gos_vm::load(&bytes).expect("deserialize error");
    assert_eq!(loaded, chunk);

    let mut out = Vec::new();
    let mut input = std::io::empty();
    let mut ctx = Context::new(&mut out, &mut input);
    Vm::new().run(&loaded, &mut ctx).expect("runtime error");
    assert_eq!(String::from_utf8(out).unwrap(), "9\n");
}
