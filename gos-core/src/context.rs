// gos-core - Runtime and evaluator for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Execution context: where `out` writes, where `in` reads from, and
//! whether `out` appends a trailing newline.
//!
//! Both the interpreter and the VM take a `&mut Context`, so tests can
//! capture output in a buffer and the driver can hand over the real
//! standard streams.

use std::io::{BufRead, Write};

use gos_parser::PrimValue;

/// Shared I/O state for one execution.
pub struct Context<'a> {
    out: &'a mut dyn Write,
    input: &'a mut dyn BufRead,
    /// Append a newline after each `out`. On by default; the driver's
    /// `--no-newline` flag clears it.
    pub newline: bool,
}

impl<'a> Context<'a> {
    pub fn new(out: &'a mut dyn Write, input: &'a mut dyn BufRead) -> Self {
        Context {
            out,
            input,
            newline: true,
        }
    }

    /// Write a value's textual form, honouring the newline flag.
    pub fn write_value(&mut self, value: &PrimValue) -> std::io::Result<()> {
        if self.newline {
            writeln!(self.out, "{}", value)
        } else {
            write!(self.out, "{}", value)?;
            self.out.flush()
        }
    }

    /// Read one line of input, without its trailing newline.
    pub fn read_line(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_value_with_newline() {
        let mut out = Vec::new();
        let mut input = std::io::empty();
        let mut ctx = Context::new(&mut out, &mut input);
        ctx.write_value(&PrimValue::Number(9.0)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "9\n");
    }

    #[test]
    fn test_write_value_without_newline() {
        let mut out = Vec::new();
        let mut input = std::io::empty();
        let mut ctx = Context::new(&mut out, &mut input);
        ctx.newline = false;
        ctx.write_value(&PrimValue::Str("a".into())).unwrap();
        ctx.write_value(&PrimValue::Str("b".into())).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ab");
    }

    #[test]
    fn test_read_line_strips_newline() {
        let mut out = Vec::new();
        let mut input = std::io::BufReader::new("hello\nworld\n".as_bytes());
        let mut ctx = Context::new(&mut out, &mut input);
        assert_eq!(ctx.read_line().unwrap(), "hello");
        assert_eq!(ctx.read_line().unwrap(), "world");
    }
}
