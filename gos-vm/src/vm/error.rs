// gos-vm - Bytecode compiler and virtual machine for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

use gos_parser::OpError;

/// Runtime error during VM execution.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// Value stack underflow.
    StackUnderflow,
    /// RET with no frame to return to.
    CallStackUnderflow,
    /// Byte that is not an instruction.
    UnknownOpcode(u8),
    /// Instruction pointer ran off the code.
    IpOutOfRange(usize),
    /// Jump or call target outside the code.
    JumpOutOfRange(usize),
    /// Constant index outside the pool.
    ConstantOutOfRange(usize),
    /// Slot index outside the slot array.
    SlotOutOfRange(usize),
    /// Operator applied to unsuitable operands.
    Op(OpError),
    /// A value had the wrong type for an instruction.
    TypeError {
        expected: &'static str,
        got: &'static str,
    },
    /// The source string handed to EVAL failed to compile.
    Eval(String),
    /// I/O failure on OUT/IN.
    Io(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackUnderflow => write!(f, "VM error: stack underflow"),
            RuntimeError::CallStackUnderflow => {
                write!(f, "VM error: return with no active call")
            }
            RuntimeError::UnknownOpcode(byte) => {
                write!(f, "VM error: unknown opcode 0x{:02x}", byte)
            }
            RuntimeError::IpOutOfRange(ip) => {
                write!(f, "VM error: instruction pointer {} out of range", ip)
            }
            RuntimeError::JumpOutOfRange(target) => {
                write!(f, "VM error: jump target {:#06x} out of range", target)
            }
            RuntimeError::ConstantOutOfRange(idx) => {
                write!(f, "VM error: constant index {} out of range", idx)
            }
            RuntimeError::SlotOutOfRange(slot) => {
                write!(f, "VM error: slot {} out of range", slot)
            }
            RuntimeError::Op(e) => write!(f, "VM error: {}", e),
            RuntimeError::TypeError { expected, got } => {
                write!(f, "VM error: expected {}, got {}", expected, got)
            }
            RuntimeError::Eval(msg) => write!(f, "VM error: eval: {}", msg),
            RuntimeError::Io(msg) => write!(f, "VM error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<OpError> for RuntimeError {
    fn from(e: OpError) -> Self {
        RuntimeError::Op(e)
    }
}

impl From<std::io::Error> for RuntimeError {
    fn from(e: std::io::Error) -> Self {
        RuntimeError::Io(e.to_string())
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
