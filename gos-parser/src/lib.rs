// gos-parser - Front end for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # gos-parser
//!
//! Front end for the Gos programming language: preprocessor, lexer,
//! parser and constant-folding optimizer, plus the primitive value type
//! shared by every execution back end.
//!
//! # Quick Start
//!
//! ```
//! use gos_parser::{optimize, parse};
//!
//! let program = parse("let x = (1 + 2) * 3  out x").unwrap();
//! let program = optimize(program);
//!
//! assert_eq!(program.body.len(), 2);
//! ```

pub mod ast;
pub mod lexer;
pub mod optimize;
pub mod parser;
pub mod preprocessor;
pub mod value;

pub use ast::{Expr, Program};
pub use lexer::{Lexer, LexerError, TokenKind};
pub use optimize::optimize;
pub use parser::{parse, Parser, ParserError};
pub use preprocessor::{Preprocessor, PreprocessorError, SYSTEM_IMPORT_DIR};
pub use value::{OpError, PrimValue};
