// gos-parser - Front end for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Constant folding and dead-branch elimination.
//!
//! A pure AST-to-AST rewrite. Folding evaluates through the same
//! operator semantics the runtime uses, so a folded value is always
//! exactly what execution would have produced. An operator error during
//! folding (type mismatch, division by zero) leaves the node unfolded
//! for the runtime to report.

use crate::ast::{
    BinOp, Eval, Exit, Expr, FuncCall, FuncDecl, If, Out, Program, Return, Stmt, UnaryOp, Val,
    VarDecl, VarMod, While,
};
use crate::value::{self, UnaryOp as UnaryOpKind};

/// Optimize a whole translation unit.
pub fn optimize(program: Program) -> Program {
    Program {
        body: program.body.into_iter().map(fold_expr).collect(),
    }
}

/// Optimize a single expression tree.
pub fn fold_expr(expr: Expr) -> Expr {
    match expr {
        Expr::BinOp(bin) => fold_binop(bin),
        Expr::UnaryOp(unary) => fold_unary(unary),
        Expr::If(i) => fold_if(i),
        Expr::While(w) => fold_while(w),

        Expr::Stmt(block) => Expr::Stmt(Stmt {
            body: block.body.into_iter().map(fold_expr).collect(),
        }),
        Expr::VarDecl(decl) => Expr::VarDecl(VarDecl {
            name: decl.name,
            value: Box::new(fold_expr(*decl.value)),
        }),
        Expr::VarMod(m) => Expr::VarMod(VarMod {
            name: m.name,
            value: Box::new(fold_expr(*m.value)),
        }),
        Expr::Out(out) => Expr::Out(Out {
            value: Box::new(fold_expr(*out.value)),
        }),
        Expr::FuncDecl(decl) => Expr::FuncDecl(FuncDecl {
            name: decl.name,
            params: decl.params,
            body: Box::new(fold_expr(*decl.body)),
        }),
        Expr::FuncCall(call) => Expr::FuncCall(FuncCall {
            name: call.name,
            args: call.args.into_iter().map(fold_expr).collect(),
        }),
        Expr::Return(ret) => Expr::Return(Return {
            value: ret.value.map(|v| Box::new(fold_expr(*v))),
        }),
        Expr::Exit(exit) => Expr::Exit(Exit {
            status: Box::new(fold_expr(*exit.status)),
        }),
        Expr::Eval(eval) => Expr::Eval(Eval {
            code: Box::new(fold_expr(*eval.code)),
        }),

        // Leaves
        other @ (Expr::Val(_) | Expr::Var(_) | Expr::In(_) | Expr::Label(_) | Expr::Goto(_)) => {
            other
        }
    }
}

fn fold_binop(bin: BinOp) -> Expr {
    let left = fold_expr(*bin.left);
    let right = fold_expr(*bin.right);

    if let (Expr::Val(l), Expr::Val(r)) = (&left, &right)
        && let Some(op) = bin.op.binary_op()
        && let Ok(value) = value::binary(op, &l.value, &r.value)
    {
        return Expr::Val(Val { value });
    }

    Expr::BinOp(BinOp {
        op: bin.op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn fold_unary(unary: UnaryOp) -> Expr {
    let argument = fold_expr(*unary.argument);

    // Only negation and logical not fold; `+`, `++` and `--` are left
    // for the runtime.
    if let Expr::Val(v) = &argument
        && let Some(op @ (UnaryOpKind::Neg | UnaryOpKind::Not)) = unary.op.unary_op()
        && let Ok(value) = value::unary(op, &v.value)
    {
        return Expr::Val(Val { value });
    }

    Expr::UnaryOp(UnaryOp {
        op: unary.op,
        argument: Box::new(argument),
    })
}

fn fold_if(i: If) -> Expr {
    let cond = fold_expr(*i.cond);
    let then = fold_expr(*i.then);
    let else_branch = i.else_branch.map(|e| Box::new(fold_expr(*e)));

    if let Expr::Val(v) = &cond {
        return if v.value.is_truthy() {
            then
        } else {
            match else_branch {
                Some(e) => *e,
                None => Expr::Stmt(Stmt { body: Vec::new() }),
            }
        };
    }

    Expr::If(If {
        cond: Box::new(cond),
        then: Box::new(then),
        else_branch,
    })
}

fn fold_while(w: While) -> Expr {
    let cond = fold_expr(*w.cond);
    let body = fold_expr(*w.body);

    // A loop whose condition is statically false never runs.
    if let Expr::Val(v) = &cond
        && !v.value.is_truthy()
    {
        return Expr::Stmt(Stmt { body: Vec::new() });
    }

    Expr::While(While {
        cond: Box::new(cond),
        body: Box::new(body),
    })
}

// ============================================================================
// Tests
// ============================================================================
