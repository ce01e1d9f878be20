// gos-core - Runtime and evaluator for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! AST-walking evaluator.
//!
//! Every expression evaluates to exactly one [`PrimValue`];
//! statement-valued nodes evaluate to unit. Control flow (`return`,
//! `exit`, `goto`) travels as [`Error`] signals: a function call catches
//! `Return`, the block defining a label catches `Goto`, and `Exit`
//! reaches the host.

use gos_parser::ast::{Expr, Program};
use gos_parser::{Parser, PrimValue, TokenKind};
use gos_parser::value as ops;

use crate::context::Context;
use crate::env::{Env, Function};
use crate::error::{Error, Result};

/// Evaluate a whole program in the root scope.
///
/// Returns the value of the program's last expression-valued statement,
/// or unit.
pub fn eval_program(program: &Program, env: &mut Env, ctx: &mut Context<'_>) -> Result<PrimValue> {
    eval_seq(&program.body, env, ctx)
}

/// Evaluate a single expression.
pub fn eval(expr: &Expr, env: &mut Env, ctx: &mut Context<'_>) -> Result<PrimValue> {
    match expr {
        Expr::Val(v) => Ok(v.value.clone()),
        Expr::Var(v) => env.get(&v.name),

        Expr::VarDecl(decl) => {
            let value = eval(&decl.value, env, ctx)?;
            env.declare(&decl.name, value)?;
            Ok(PrimValue::Unit)
        }
        Expr::VarMod(m) => {
            let value = eval(&m.value, env, ctx)?;
            env.assign(&m.name, value)?;
            Ok(PrimValue::Unit)
        }

        Expr::BinOp(bin) => {
            // Left before right, always.
            let left = eval(&bin.left, env, ctx)?;
            let right = eval(&bin.right, env, ctx)?;
            let op = bin
                .op
                .binary_op()
                .ok_or(Error::Op(gos_parser::OpError::TypeMismatch {
                    op: "?",
                    lhs: left.type_name(),
                    rhs: right.type_name(),
                }))?;
            Ok(ops::binary(op, &left, &right)?)
        }
        Expr::UnaryOp(unary) => eval_unary(unary, env, ctx),

        Expr::Out(out) => {
            let value = eval(&out.value, env, ctx)?;
            ctx.write_value(&value)?;
            Ok(PrimValue::Unit)
        }
        Expr::In(input) => {
            let line = ctx.read_line()?;
            env.declare(&input.name, PrimValue::Str(line))?;
            Ok(PrimValue::Unit)
        }

        Expr::If(i) => {
            let cond = eval(&i.cond, env, ctx)?;
            if cond.is_truthy() {
                eval_scoped(&i.then, env, ctx)
            } else {
                match &i.else_branch {
                    Some(e) => eval_scoped(e, env, ctx),
                    None => Ok(PrimValue::Unit),
                }
            }
        }
        Expr::While(w) => {
            loop {
                let cond = eval(&w.cond, env, ctx)?;
                if !cond.is_truthy() {
                    break;
                }
                eval_scoped(&w.body, env, ctx)?;
            }
            Ok(PrimValue::Unit)
        }

        Expr::Stmt(block) => {
            env.push_scope();
            let result = eval_seq(&block.body, env, ctx);
            env.pop_scope();
            result
        }

        Expr::FuncDecl(decl) => {
            env.declare_function(
                &decl.name,
                Function {
                    params: decl.params.clone(),
                    body: std::rc::Rc::new((*decl.body).clone()),
                },
            )?;
            Ok(PrimValue::Unit)
        }
        Expr::FuncCall(call) => {
            let function = env
                .lookup_function(&call.name)
                .ok_or_else(|| Error::UndefinedFunction(call.name.clone()))?;
            if function.params.len() != call.args.len() {
                return Err(Error::ArityMismatch {
                    name: call.name.clone(),
                    expected: function.params.len(),
                    got: call.args.len(),
                });
            }

            // Arguments evaluate in source order, in the caller's scope.
            let mut args = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                args.push(eval(arg, env, ctx)?);
            }

            env.push_function_scope();
            let mut result = Ok(PrimValue::Unit);
            for (param, value) in function.params.iter().zip(args) {
                if let Err(e) = env.declare(param, value) {
                    result = Err(e);
                    break;
                }
            }
            if result.is_ok() {
                result = eval(&function.body, env, ctx);
            }
            env.pop_scope();

            match result {
                Err(Error::Return(value)) => Ok(value),
                other => other,
            }
        }

        Expr::Return(ret) => {
            let value = match &ret.value {
                Some(v) => eval(v, env, ctx)?,
                None => PrimValue::Unit,
            };
            Err(Error::Return(value))
        }
        Expr::Exit(exit) => {
            let status = eval(&exit.status, env, ctx)?;
            let code = match status {
                PrimValue::Number(n) => n as i32,
                _ => 0,
            };
            Err(Error::Exit(code))
        }

        Expr::Eval(e) => {
            let code = eval(&e.code, env, ctx)?;
            let source = match code {
                PrimValue::Str(s) => s,
                other => return Err(Error::EvalType(other.type_name())),
            };
            let program = Parser::new(&source)
                .and_then(|mut p| p.parse())
                .map_err(|e| Error::EvalParse(e.to_string()))?;
            env.push_scope();
            let result = eval_seq(&program.body, env, ctx);
            env.pop_scope();
            result
        }

        Expr::Label(_) => Ok(PrimValue::Unit),
        Expr::Goto(goto) => Err(Error::Goto(goto.label.clone())),
    }
}

/// Evaluate an `if` branch or loop body in its own scope.
fn eval_scoped(expr: &Expr, env: &mut Env, ctx: &mut Context<'_>) -> Result<PrimValue> {
    env.push_scope();
    let result = eval(expr, env, ctx);
    env.pop_scope();
    result
}

/// Evaluate a statement sequence, resolving `goto` against the labels
/// this sequence defines.
fn eval_seq(body: &[Expr], env: &mut Env, ctx: &mut Context<'_>) -> Result<PrimValue> {
    let mut last = PrimValue::Unit;
    let mut idx = 0;
    while idx < body.len() {
        match eval(&body[idx], env, ctx) {
            Ok(value) => {
                last = if body[idx].is_expression() {
                    value
                } else {
                    PrimValue::Unit
                };
                idx += 1;
            }
            Err(Error::Goto(label)) => match label_position(body, &label) {
                Some(pos) => idx = pos + 1,
                None => return Err(Error::Goto(label)),
            },
            Err(e) => return Err(e),
        }
    }
    Ok(last)
}

fn label_position(body: &[Expr], label: &str) -> Option<usize> {
    body.iter()
        .position(|e| matches!(e, Expr::Label(l) if l.name == label))
}

fn eval_unary(
    unary: &gos_parser::ast::UnaryOp,
    env: &mut Env,
    ctx: &mut Context<'_>,
) -> Result<PrimValue> {
    match unary.op {
        TokenKind::Inc | TokenKind::Dec => {
            // `n++` / `n--` read, adjust and store back, yielding the
            // new value.
            let name = match unary.argument.as_ref() {
                Expr::Var(v) => &v.name,
                _ => return Err(Error::InvalidIncTarget),
            };
            let op = unary.op.unary_op().expect("inc/dec map to unary ops");
            let current = env.get(name)?;
            let updated = ops::unary(op, &current)?;
            env.assign(name, updated.clone())?;
            Ok(updated)
        }
        _ => {
            let value = eval(&unary.argument, env, ctx)?;
            let op = unary
                .op
                .unary_op()
                .ok_or(Error::Op(gos_parser::OpError::UnaryTypeMismatch {
                    op: "?",
                    operand: value.type_name(),
                }))?;
            Ok(ops::unary(op, &value)?)
        }
    }
}
