// gos-core - Runtime and evaluator for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error types for the tree-walking interpreter.
//!
//! `Return`, `Exit` and `Goto` are control-flow signals rather than real
//! failures: they unwind through `Result` until the construct that
//! handles them (a function call, the host driver, or a block defining
//! the label) catches them. Reaching the top level makes them
//! diagnostics.

use std::fmt;

use gos_parser::{OpError, PrimValue};

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors and control-flow signals produced during evaluation.
#[derive(Debug, Clone)]
pub enum Error {
    /// Variable reference did not resolve.
    UndefinedVariable(String),
    /// Function call did not resolve.
    UndefinedFunction(String),
    /// Name already declared in the same scope.
    DuplicateVariable(String),
    /// Function already declared in the same scope.
    DuplicateFunction(String),
    /// Wrong number of arguments.
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// Operator applied to unsuitable operands.
    Op(OpError),
    /// `++`/`--` applied to something that is not a variable.
    InvalidIncTarget,
    /// `eval` applied to a non-string.
    EvalType(&'static str),
    /// Nested `eval` source failed to parse.
    EvalParse(String),
    /// I/O failure on `out`/`in`.
    Io(String),

    /// Control signal: `return value`.
    Return(PrimValue),
    /// Control signal: `exit status`.
    Exit(i32),
    /// Control signal: `goto label`, not yet resolved to a block.
    Goto(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UndefinedVariable(name) => {
                write!(f, "Interpreter error: undefined variable '{}'", name)
            }
            Error::UndefinedFunction(name) => {
                write!(f, "Interpreter error: undefined function '{}'", name)
            }
            Error::DuplicateVariable(name) => {
                write!(
                    f,
                    "Interpreter error: '{}' is already declared in this scope",
                    name
                )
            }
            Error::DuplicateFunction(name) => {
                write!(
                    f,
                    "Interpreter error: function '{}' is already declared in this scope",
                    name
                )
            }
            Error::ArityMismatch {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Interpreter error: function '{}' expects {} arguments, got {}",
                    name, expected, got
                )
            }
            Error::Op(e) => write!(f, "Interpreter error: {}", e),
            Error::InvalidIncTarget => {
                write!(f, "Interpreter error: '++'/'--' require a variable")
            }
            Error::EvalType(got) => {
                write!(f, "Interpreter error: eval requires a string, got {}", got)
            }
            Error::EvalParse(msg) => write!(f, "Interpreter error: eval: {}", msg),
            Error::Io(msg) => write!(f, "Interpreter error: {}", msg),
            Error::Return(_) => {
                write!(f, "Interpreter error: 'return' used outside a function")
            }
            Error::Exit(status) => write!(f, "Interpreter error: exit({})", status),
            Error::Goto(label) => {
                write!(f, "Interpreter error: unknown label '{}'", label)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<OpError> for Error {
    fn from(e: OpError) -> Self {
        Error::Op(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
