// gos-vm - Bytecode compiler and virtual machine for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine executing Gos bytecode.
//!
//! The loop is strictly sequential: fetch one opcode byte, decode its
//! inline operands, execute, repeat until HALT or EXIT. A VM instance
//! owns its stack and slot array and is discarded after one run.

pub mod error;
pub mod frame;
pub mod stack;

use gos_core::Context;
use gos_parser::value::{self, BinaryOp, UnaryOp};
use gos_parser::{optimize, PrimValue};

use crate::chunk::Chunk;
use crate::compiler;
use crate::opcode::OpCode;

pub use error::{Result, RuntimeError};
pub use frame::Frame;
pub use stack::ValueStack;

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// HALT was reached; the program's final value.
    Finished(PrimValue),
    /// EXIT was executed with this status; the host should terminate
    /// the process with it.
    Exited(i32),
}

/// The Gos virtual machine.
pub struct Vm {
    ip: usize,
    stack: ValueStack,
    slots: Vec<PrimValue>,
    frames: Vec<Frame>,
    base_slot: usize,
}

impl Vm {
    /// Create a new VM.
    pub fn new() -> Self {
        Vm {
            ip: 0,
            stack: ValueStack::new(),
            slots: Vec::new(),
            frames: Vec::new(),
            base_slot: 0,
        }
    }

    /// Current operand-stack depth.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// Execute a chunk from address zero until HALT or EXIT.
    pub fn run(&mut self, chunk: &Chunk, ctx: &mut Context<'_>) -> Result<Outcome> {
        self.ip = 0;
        self.base_slot = 0;
        self.slots = vec![PrimValue::Unit; chunk.max_slot as usize];

        loop {
            let byte = self.read_byte(chunk)?;
            let op = OpCode::from_u8(byte).ok_or(RuntimeError::UnknownOpcode(byte))?;

            match op {
                OpCode::LoadConst => {
                    let idx = self.read_byte(chunk)? as usize;
                    let value = chunk
                        .constants
                        .get(idx)
                        .cloned()
                        .ok_or(RuntimeError::ConstantOutOfRange(idx))?;
                    self.stack.push(value);
                }
                OpCode::LoadVar => {
                    let slot = self.read_byte(chunk)? as usize;
                    let idx = self.base_slot + slot;
                    let value = self
                        .slots
                        .get(idx)
                        .cloned()
                        .ok_or(RuntimeError::SlotOutOfRange(slot))?;
                    self.stack.push(value);
                }
                OpCode::StoreVar => {
                    let slot = self.read_byte(chunk)? as usize;
                    let idx = self.base_slot + slot;
                    // The value stays on the stack; declarations follow
                    // with an explicit POP.
                    let value = self.stack.peek()?.clone();
                    if idx >= self.slots.len() {
                        self.slots.resize(idx + 1, PrimValue::Unit);
                    }
                    self.slots[idx] = value;
                }

                OpCode::Add => self.binary(BinaryOp::Add)?,
                OpCode::Sub => self.binary(BinaryOp::Sub)?,
                OpCode::Mul => self.binary(BinaryOp::Mul)?,
                OpCode::Div => self.binary(BinaryOp::Div)?,
                OpCode::Eq => self.binary(BinaryOp::Eq)?,
                OpCode::Ne => self.binary(BinaryOp::Ne)?,
                OpCode::Gt => self.binary(BinaryOp::Gt)?,
                OpCode::Ge => self.binary(BinaryOp::Ge)?,
                OpCode::Lt => self.binary(BinaryOp::Lt)?,
                OpCode::Le => self.binary(BinaryOp::Le)?,
                OpCode::LogAnd => self.binary(BinaryOp::And)?,
                OpCode::LogOr => self.binary(BinaryOp::Or)?,
                OpCode::LogXor => self.binary(BinaryOp::Xor)?,

                OpCode::LogNot => self.unary(UnaryOp::Not)?,
                OpCode::Neg => self.unary(UnaryOp::Neg)?,
                OpCode::Pos => self.unary(UnaryOp::Pos)?,
                OpCode::Inc => self.unary(UnaryOp::Inc)?,
                OpCode::Dec => self.unary(UnaryOp::Dec)?,

                OpCode::Out => {
                    let value = self.stack.pop()?;
                    ctx.write_value(&value)?;
                }
                OpCode::In => {
                    let slot = self.read_byte(chunk)? as usize;
                    let idx = self.base_slot + slot;
                    let line = ctx.read_line()?;
                    if idx >= self.slots.len() {
                        self.slots.resize(idx + 1, PrimValue::Unit);
                    }
                    self.slots[idx] = PrimValue::Str(line);
                }

                OpCode::Pop => {
                    self.stack.pop()?;
                }

                OpCode::Jump => {
                    let target = self.read_target(chunk)?;
                    self.ip = target;
                }
                OpCode::JumpIfFalse => {
                    let target = self.read_target(chunk)?;
                    let value = self.stack.pop()?;
                    if !value.is_truthy() {
                        self.ip = target;
                    }
                }

                OpCode::Call => {
                    let target = self.read_target(chunk)?;
                    let argc = self.read_byte(chunk)? as usize;

                    self.frames.push(Frame::new(self.ip, self.base_slot));

                    // The arguments become the new frame's first slots,
                    // in declaration order.
                    let new_base = self.slots.len();
                    let args = self.stack.pop_n(argc)?;
                    self.slots.extend(args);

                    self.base_slot = new_base;
                    self.ip = target;
                }
                OpCode::Ret => {
                    let value = self.stack.pop()?;
                    let frame = self.frames.pop().ok_or(RuntimeError::CallStackUnderflow)?;
                    self.slots.truncate(self.base_slot);
                    self.base_slot = frame.base_slot;
                    self.ip = frame.return_ip;
                    self.stack.push(value);
                }

                OpCode::Exit => {
                    let status = self.stack.pop()?;
                    let code = match status {
                        PrimValue::Number(n) => n as i32,
                        _ => 0,
                    };
                    return Ok(Outcome::Exited(code));
                }

                OpCode::Eval => {
                    let source = match self.stack.pop()? {
                        PrimValue::Str(s) => s,
                        other => {
                            return Err(RuntimeError::TypeError {
                                expected: "string",
                                got: other.type_name(),
                            });
                        }
                    };
                    match self.eval_source(&source, ctx)? {
                        Outcome::Finished(value) => self.stack.push(value),
                        exited @ Outcome::Exited(_) => return Ok(exited),
                    }
                }

                OpCode::Halt => {
                    let value = if self.stack.is_empty() {
                        PrimValue::Unit
                    } else {
                        self.stack.pop()?
                    };
                    return Ok(Outcome::Finished(value));
                }
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn read_byte(&mut self, chunk: &Chunk) -> Result<u8> {
        let byte = *chunk
            .code
            .get(self.ip)
            .ok_or(RuntimeError::IpOutOfRange(self.ip))?;
        self.ip += 1;
        Ok(byte)
    }

    /// Read a two-byte big-endian jump target and bounds-check it.
    fn read_target(&mut self, chunk: &Chunk) -> Result<usize> {
        let high = self.read_byte(chunk)? as usize;
        let low = self.read_byte(chunk)? as usize;
        let target = (high << 8) | low;
        if target >= chunk.code.len() {
            return Err(RuntimeError::JumpOutOfRange(target));
        }
        Ok(target)
    }

    fn binary(&mut self, op: BinaryOp) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;
        let result = value::binary(op, &left, &right)?;
        self.stack.push(result);
        Ok(())
    }

    fn unary(&mut self, op: UnaryOp) -> Result<()> {
        let operand = self.stack.pop()?;
        let result = value::unary(op, &operand)?;
        self.stack.push(result);
        Ok(())
    }

    /// The host-level escape hatch: run a source string through the
    /// whole pipeline in a nested VM sharing this context.
    fn eval_source(&mut self, source: &str, ctx: &mut Context<'_>) -> Result<Outcome> {
        let program = gos_parser::parse(source).map_err(|e| RuntimeError::Eval(e.to_string()))?;
        let program = optimize(program);
        let chunk = compiler::compile(&program).map_err(|e| RuntimeError::Eval(e.to_string()))?;
        let mut nested = Vm::new();
        nested.run(&chunk, ctx)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
