// gos-vm - Bytecode compiler and virtual machine for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # gos-vm
//!
//! Bytecode compiler and stack-based virtual machine for Gos.
//!
//! This crate provides an alternative execution model to the AST-walking
//! interpreter in `gos-core`: the compiler lowers an AST into a
//! position-encoded bytecode [`Chunk`], the VM executes it, and the
//! serializer gives chunks a stable on-disk form.
//!
//! # Quick Start
//!
//! ```
//! use gos_core::Context;
//! use gos_parser::{optimize, parse};
//! use gos_vm::{compile, Outcome, Vm};
//!
//! let program = optimize(parse("let x = (1 + 2) * 3  out x").unwrap());
//! let chunk = compile(&program).unwrap();
//!
//! let mut out = Vec::new();
//! let mut input = std::io::empty();
//! let mut ctx = Context::new(&mut out, &mut input);
//!
//! let outcome = Vm::new().run(&chunk, &mut ctx).unwrap();
//! assert!(matches!(outcome, Outcome::Finished(_)));
//! assert_eq!(String::from_utf8(out).unwrap(), "9\n");
//! ```

pub mod chunk;
pub mod compiler;
pub mod opcode;
pub mod serialize;
pub mod vm;

pub use chunk::{Chunk, MAX_CODE_SIZE, MAX_CONSTANTS};
pub use compiler::{compile, CompileError, Compiler};
pub use opcode::OpCode;
pub use serialize::{load, load_file, save, save_file, SerializeError, CHUNK_EXTENSION};
pub use vm::{Outcome, RuntimeError, Vm};
