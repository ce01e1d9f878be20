// gos-vm - Bytecode compiler and virtual machine for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: lowers an AST into a [`Chunk`].
//!
//! Variables live in frame-relative slots handed out by a scope stack:
//! each declaration takes the next slot, and leaving a scope recycles
//! the slots it introduced. Function bodies restart slot numbering at
//! zero, so parameter 0 is slot 0 of the frame the VM builds for the
//! call; a function body cannot see enclosing variables (there are no
//! closures), only enclosing functions.
//!
//! Statement-valued nodes compile to a net stack effect of zero and
//! expression-valued nodes to exactly one pushed value; blocks pop the
//! values of their non-final expression children. This keeps the stack
//! balanced across loops and gotos.

use std::collections::HashMap;
use std::fmt;

use gos_parser::ast::{Expr, FuncDecl, Program};
use gos_parser::{PrimValue, TokenKind};

use crate::chunk::{Chunk, MAX_CODE_SIZE};
use crate::opcode::OpCode;

/// Error during compilation.
#[derive(Debug, Clone)]
pub enum CompileError {
    /// Variable reference did not resolve.
    UndefinedVariable(String),
    /// Function call did not resolve.
    UndefinedFunction(String),
    /// Name already declared in the same scope.
    DuplicateVariable(String),
    /// Function already declared in the same scope.
    DuplicateFunction(String),
    /// Label already recorded.
    DuplicateLabel(String),
    /// `goto` target never defined.
    UnresolvedLabel(String),
    /// Wrong number of call arguments.
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    /// `++`/`--` applied to something that is not a variable.
    InvalidIncTarget,
    /// A token that is not a runtime operator reached emission.
    UnsupportedOperator(String),
    /// Constant pool overflow.
    TooManyConstants,
    /// Slot space overflow.
    TooManyLocals,
    /// Code grew past the addressable range.
    CodeTooLarge,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => {
                write!(f, "Compiler error: undefined variable '{}'", name)
            }
            CompileError::UndefinedFunction(name) => {
                write!(f, "Compiler error: undefined function '{}'", name)
            }
            CompileError::DuplicateVariable(name) => {
                write!(
                    f,
                    "Compiler error: '{}' is already declared in this scope",
                    name
                )
            }
            CompileError::DuplicateFunction(name) => {
                write!(
                    f,
                    "Compiler error: function '{}' is already declared in this scope",
                    name
                )
            }
            CompileError::DuplicateLabel(name) => {
                write!(f, "Compiler error: label '{}' is already defined", name)
            }
            CompileError::UnresolvedLabel(name) => {
                write!(f, "Compiler error: unresolved label '{}'", name)
            }
            CompileError::ArityMismatch {
                name,
                expected,
                got,
            } => {
                write!(
                    f,
                    "Compiler error: function '{}' expects {} arguments, got {}",
                    name, expected, got
                )
            }
            CompileError::InvalidIncTarget => {
                write!(f, "Compiler error: '++'/'--' require a variable")
            }
            CompileError::UnsupportedOperator(op) => {
                write!(f, "Compiler error: '{}' is not a runtime operator", op)
            }
            CompileError::TooManyConstants => {
                write!(f, "Compiler error: too many constants in one chunk")
            }
            CompileError::TooManyLocals => {
                write!(f, "Compiler error: too many local variables")
            }
            CompileError::CodeTooLarge => {
                write!(f, "Compiler error: code exceeds the addressable range")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

/// A lexical scope: declared names and how many slots it introduced.
struct Scope {
    vars: HashMap<String, u16>,
    slot_count: u16,
}

/// A declared function: where its body starts and how many parameters
/// it takes.
struct FuncInfo {
    addr: u16,
    param_count: usize,
}

/// The bytecode compiler. Invoked once per translation unit.
pub struct Compiler {
    chunk: Chunk,
    scopes: Vec<Scope>,
    funcs: Vec<HashMap<String, FuncInfo>>,
    labels: HashMap<String, u16>,
    /// Goto sites waiting for their label: (label, operand offset).
    pending_gotos: Vec<(String, usize)>,
    next_slot: u16,
    /// Scope index below which variable lookup does not descend; set to
    /// the current function boundary.
    var_floor: usize,
}

/// Compile a program into a chunk.
pub fn compile(program: &Program) -> Result<Chunk> {
    Compiler::new().run(program)
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            chunk: Chunk::new(),
            scopes: Vec::new(),
            funcs: Vec::new(),
            labels: HashMap::new(),
            pending_gotos: Vec::new(),
            next_slot: 0,
            var_floor: 0,
        }
    }

    /// Compile the whole program and finish the chunk.
    pub fn run(mut self, program: &Program) -> Result<Chunk> {
        self.enter_scope();
        let result = self.compile_seq(&program.body);
        self.exit_scope();
        result?;

        self.emit_op(OpCode::Halt)?;
        self.resolve_gotos()?;
        Ok(self.chunk)
    }

    // ========================================================================
    // Scopes, slots, functions
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scopes.push(Scope {
            vars: HashMap::new(),
            slot_count: 0,
        });
        self.funcs.push(HashMap::new());
    }

    fn exit_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.next_slot -= scope.slot_count;
        }
        self.funcs.pop();
    }

    fn declare_var(&mut self, name: &str) -> Result<u16> {
        let scope = self.scopes.last_mut().expect("a scope is always open");
        if scope.vars.contains_key(name) {
            return Err(CompileError::DuplicateVariable(name.to_string()));
        }
        if self.next_slot as usize >= u8::MAX as usize + 1 {
            return Err(CompileError::TooManyLocals);
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        scope.slot_count += 1;
        scope.vars.insert(name.to_string(), slot);
        self.chunk.max_slot = self.chunk.max_slot.max(self.next_slot);
        Ok(slot)
    }

    /// Resolve a variable, innermost scope first, stopping at the
    /// current function boundary.
    fn resolve_var(&self, name: &str) -> Result<u16> {
        self.scopes[self.var_floor..]
            .iter()
            .rev()
            .find_map(|scope| scope.vars.get(name).copied())
            .ok_or_else(|| CompileError::UndefinedVariable(name.to_string()))
    }

    /// Resolve a function, innermost scope first. Unlike variables,
    /// functions stay visible inside nested function bodies.
    fn resolve_func(&self, name: &str) -> Option<(u16, usize)> {
        self.funcs
            .iter()
            .rev()
            .find_map(|table| table.get(name).map(|f| (f.addr, f.param_count)))
    }

    // ========================================================================
    // Emission primitives
    // ========================================================================

    fn emit_byte(&mut self, byte: u8) -> Result<()> {
        if self.chunk.code.len() >= MAX_CODE_SIZE {
            return Err(CompileError::CodeTooLarge);
        }
        self.chunk.code.push(byte);
        Ok(())
    }

    fn emit_op(&mut self, op: OpCode) -> Result<()> {
        self.emit_byte(op as u8)
    }

    fn emit_u16(&mut self, value: u16) -> Result<()> {
        self.emit_byte((value >> 8) as u8)?;
        self.emit_byte((value & 0xFF) as u8)
    }

    fn current_addr(&self) -> Result<u16> {
        let addr = self.chunk.code.len();
        if addr > u16::MAX as usize {
            return Err(CompileError::CodeTooLarge);
        }
        Ok(addr as u16)
    }

    /// Emit a jump with a placeholder target; returns the operand
    /// offset for patching.
    fn emit_jump(&mut self, op: OpCode) -> Result<usize> {
        self.emit_op(op)?;
        let operand = self.chunk.code.len();
        self.emit_u16(0)?;
        Ok(operand)
    }

    /// Point a previously emitted jump at the current position.
    fn patch_jump(&mut self, operand: usize) -> Result<()> {
        let target = self.current_addr()?;
        self.chunk.code[operand] = (target >> 8) as u8;
        self.chunk.code[operand + 1] = (target & 0xFF) as u8;
        Ok(())
    }

    fn emit_constant(&mut self, value: PrimValue) -> Result<()> {
        let idx = self
            .chunk
            .add_constant(value)
            .ok_or(CompileError::TooManyConstants)?;
        self.emit_op(OpCode::LoadConst)?;
        self.emit_byte(idx)
    }

    fn emit_unit(&mut self) -> Result<()> {
        self.emit_constant(PrimValue::Unit)
    }

    // ========================================================================
    // Expression emission
    // ========================================================================

    /// Compile a statement sequence the way blocks evaluate: the values
    /// of non-final expression children are discarded and the sequence
    /// as a whole leaves exactly one value.
    fn compile_seq(&mut self, body: &[Expr]) -> Result<()> {
        if body.is_empty() {
            return self.emit_unit();
        }
        let last = body.len() - 1;
        for (i, expr) in body.iter().enumerate() {
            self.compile_expr(expr)?;
            if i < last {
                if expr.is_expression() {
                    self.emit_op(OpCode::Pop)?;
                }
            } else if !expr.is_expression() {
                self.emit_unit()?;
            }
        }
        Ok(())
    }

    /// Compile an expression in value position: statement-valued nodes
    /// are padded with unit so exactly one value is left behind.
    fn compile_value(&mut self, expr: &Expr) -> Result<()> {
        self.compile_expr(expr)?;
        if !expr.is_expression() {
            self.emit_unit()?;
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Val(v) => self.emit_constant(v.value.clone()),

            Expr::Var(v) => {
                let slot = self.resolve_var(&v.name)?;
                self.emit_op(OpCode::LoadVar)?;
                self.emit_byte(slot as u8)
            }

            Expr::VarDecl(decl) => {
                self.compile_value(&decl.value)?;
                let slot = self.declare_var(&decl.name)?;
                self.emit_op(OpCode::StoreVar)?;
                self.emit_byte(slot as u8)?;
                self.emit_op(OpCode::Pop)
            }

            Expr::VarMod(m) => {
                self.compile_value(&m.value)?;
                let slot = self.resolve_var(&m.name)?;
                self.emit_op(OpCode::StoreVar)?;
                self.emit_byte(slot as u8)?;
                self.emit_op(OpCode::Pop)
            }

            Expr::BinOp(bin) => {
                self.compile_value(&bin.left)?;
                self.compile_value(&bin.right)?;
                let op = binop_opcode(&bin.op)?;
                self.emit_op(op)
            }

            Expr::UnaryOp(unary) => match unary.op {
                TokenKind::Inc | TokenKind::Dec => {
                    let name = match unary.argument.as_ref() {
                        Expr::Var(v) => &v.name,
                        _ => return Err(CompileError::InvalidIncTarget),
                    };
                    let slot = self.resolve_var(name)?;
                    self.emit_op(OpCode::LoadVar)?;
                    self.emit_byte(slot as u8)?;
                    self.emit_op(if unary.op == TokenKind::Inc {
                        OpCode::Inc
                    } else {
                        OpCode::Dec
                    })?;
                    self.emit_op(OpCode::StoreVar)?;
                    self.emit_byte(slot as u8)
                }
                TokenKind::Neg => {
                    self.compile_value(&unary.argument)?;
                    self.emit_op(OpCode::Neg)
                }
                TokenKind::Not => {
                    self.compile_value(&unary.argument)?;
                    self.emit_op(OpCode::LogNot)
                }
                TokenKind::Pos => {
                    self.compile_value(&unary.argument)?;
                    self.emit_op(OpCode::Pos)
                }
                ref other => Err(CompileError::UnsupportedOperator(other.to_string())),
            },

            Expr::Out(out) => {
                self.compile_value(&out.value)?;
                self.emit_op(OpCode::Out)
            }

            Expr::In(input) => {
                let slot = self.declare_var(&input.name)?;
                self.emit_op(OpCode::In)?;
                self.emit_byte(slot as u8)
            }

            Expr::If(i) => {
                self.compile_value(&i.cond)?;
                let else_jump = self.emit_jump(OpCode::JumpIfFalse)?;

                self.enter_scope();
                let then_result = self.compile_value(&i.then);
                self.exit_scope();
                then_result?;

                let end_jump = self.emit_jump(OpCode::Jump)?;
                self.patch_jump(else_jump)?;

                match &i.else_branch {
                    Some(else_branch) => {
                        self.enter_scope();
                        let else_result = self.compile_value(else_branch);
                        self.exit_scope();
                        else_result?;
                    }
                    None => self.emit_unit()?,
                }
                self.patch_jump(end_jump)
            }

            Expr::While(w) => {
                let loop_top = self.current_addr()?;
                self.compile_value(&w.cond)?;
                let exit_jump = self.emit_jump(OpCode::JumpIfFalse)?;

                self.enter_scope();
                let body_result = self.compile_expr(&w.body);
                self.exit_scope();
                body_result?;
                if w.body.is_expression() {
                    self.emit_op(OpCode::Pop)?;
                }

                self.emit_op(OpCode::Jump)?;
                self.emit_u16(loop_top)?;
                self.patch_jump(exit_jump)
            }

            Expr::Stmt(block) => {
                self.enter_scope();
                let result = self.compile_seq(&block.body);
                self.exit_scope();
                result
            }

            Expr::FuncDecl(decl) => self.compile_func_decl(decl),

            Expr::FuncCall(call) => {
                for arg in &call.args {
                    self.compile_value(arg)?;
                }
                let (addr, param_count) = self
                    .resolve_func(&call.name)
                    .ok_or_else(|| CompileError::UndefinedFunction(call.name.clone()))?;
                if param_count != call.args.len() {
                    return Err(CompileError::ArityMismatch {
                        name: call.name.clone(),
                        expected: param_count,
                        got: call.args.len(),
                    });
                }
                self.emit_op(OpCode::Call)?;
                self.emit_u16(addr)?;
                self.emit_byte(call.args.len() as u8)
            }

            Expr::Return(ret) => {
                match &ret.value {
                    Some(value) => self.compile_value(value)?,
                    None => self.emit_unit()?,
                }
                self.emit_op(OpCode::Ret)
            }

            Expr::Exit(exit) => {
                self.compile_value(&exit.status)?;
                self.emit_op(OpCode::Exit)
            }

            Expr::Eval(eval) => {
                self.compile_value(&eval.code)?;
                self.emit_op(OpCode::Eval)
            }

            Expr::Label(label) => {
                let addr = self.current_addr()?;
                if self.labels.insert(label.name.clone(), addr).is_some() {
                    return Err(CompileError::DuplicateLabel(label.name.clone()));
                }
                Ok(())
            }

            Expr::Goto(goto) => {
                let operand = self.emit_jump(OpCode::Jump)?;
                self.pending_gotos.push((goto.label.clone(), operand));
                Ok(())
            }
        }
    }

    /// Emit a function: a jump over the body, then the body itself with
    /// frame-relative slots starting at zero.
    fn compile_func_decl(&mut self, decl: &FuncDecl) -> Result<()> {
        let table = self.funcs.last_mut().expect("a scope is always open");
        if table.contains_key(&decl.name) {
            return Err(CompileError::DuplicateFunction(decl.name.clone()));
        }

        let over_jump = self.emit_jump(OpCode::Jump)?;
        let addr = self.current_addr()?;

        // Recorded before the body compiles, so the body can call itself.
        self.funcs
            .last_mut()
            .expect("a scope is always open")
            .insert(
                decl.name.clone(),
                FuncInfo {
                    addr,
                    param_count: decl.params.len(),
                },
            );

        let saved_slot = self.next_slot;
        let saved_floor = self.var_floor;
        self.next_slot = 0;
        self.var_floor = self.scopes.len();
        self.enter_scope();

        let result = self.compile_func_body(decl);

        self.exit_scope();
        self.next_slot = saved_slot;
        self.var_floor = saved_floor;
        result?;

        self.patch_jump(over_jump)
    }

    fn compile_func_body(&mut self, decl: &FuncDecl) -> Result<()> {
        for param in &decl.params {
            self.declare_var(param)?;
        }
        self.compile_value(&decl.body)?;
        self.emit_op(OpCode::Ret)
    }

    /// Patch every `goto` site; a label still missing here is an error.
    fn resolve_gotos(&mut self) -> Result<()> {
        for (label, operand) in std::mem::take(&mut self.pending_gotos) {
            let addr = *self
                .labels
                .get(&label)
                .ok_or(CompileError::UnresolvedLabel(label))?;
            self.chunk.code[operand] = (addr >> 8) as u8;
            self.chunk.code[operand + 1] = (addr & 0xFF) as u8;
        }
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn binop_opcode(op: &TokenKind) -> Result<OpCode> {
    match op {
        TokenKind::Add => Ok(OpCode::Add),
        TokenKind::Sub => Ok(OpCode::Sub),
        TokenKind::Mul => Ok(OpCode::Mul),
        TokenKind::Div => Ok(OpCode::Div),
        TokenKind::Eq => Ok(OpCode::Eq),
        TokenKind::Ne => Ok(OpCode::Ne),
        TokenKind::Gt => Ok(OpCode::Gt),
        TokenKind::Ge => Ok(OpCode::Ge),
        TokenKind::Lt => Ok(OpCode::Lt),
        TokenKind::Le => Ok(OpCode::Le),
        TokenKind::And | TokenKind::BitAnd => Ok(OpCode::LogAnd),
        TokenKind::Or | TokenKind::BitOr => Ok(OpCode::LogOr),
        TokenKind::BitXor => Ok(OpCode::LogXor),
        other => Err(CompileError::UnsupportedOperator(other.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================
