// gos-core - Runtime and evaluator for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # gos-core
//!
//! Tree-walking interpreter for the Gos programming language, plus the
//! execution [`Context`] shared with the bytecode VM.
//!
//! # Quick Start
//!
//! ```
//! use gos_core::{eval_program, Context, Env};
//! use gos_parser::{optimize, parse};
//!
//! let program = optimize(parse("let x = (1 + 2) * 3  out x").unwrap());
//!
//! let mut out = Vec::new();
//! let mut input = std::io::empty();
//! let mut ctx = Context::new(&mut out, &mut input);
//! let mut env = Env::new();
//!
//! eval_program(&program, &mut env, &mut ctx).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "9\n");
//! ```

pub mod context;
pub mod env;
pub mod error;
pub mod eval;

pub use context::Context;
pub use env::{Env, Function};
pub use error::{Error, Result};
pub use eval::{eval, eval_program};
