// gos-core - Runtime and evaluator for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexical environment for the tree-walking interpreter.
//!
//! A stack of scopes, each holding variable bindings and function
//! declarations. Scopes pushed for a function body carry a barrier:
//! variable lookup stops there (the language has no closures), while
//! function lookup passes through so outer functions stay callable.

use std::collections::HashMap;
use std::rc::Rc;

use gos_parser::ast::Expr;
use gos_parser::PrimValue;

use crate::error::{Error, Result};

/// A declared function.
#[derive(Debug, Clone)]
pub struct Function {
    pub params: Vec<String>,
    pub body: Rc<Expr>,
}

#[derive(Debug, Default)]
struct Scope {
    vars: HashMap<String, PrimValue>,
    funcs: HashMap<String, Function>,
    /// Variable lookup does not cross a barrier scope.
    barrier: bool,
}

/// The environment: innermost scope last.
#[derive(Debug)]
pub struct Env {
    scopes: Vec<Scope>,
}

impl Env {
    /// Create an environment with a single root scope.
    pub fn new() -> Self {
        Env {
            scopes: vec![Scope::default()],
        }
    }

    /// Enter a block scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Enter a function-body scope. Variables outside it are invisible.
    pub fn push_function_scope(&mut self) {
        self.scopes.push(Scope {
            barrier: true,
            ..Scope::default()
        });
    }

    /// Leave the innermost scope. The root scope is never popped.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Declare a fresh variable in the innermost scope.
    pub fn declare(&mut self, name: &str, value: PrimValue) -> Result<()> {
        let scope = self.scopes.last_mut().expect("root scope always exists");
        if scope.vars.contains_key(name) {
            return Err(Error::DuplicateVariable(name.to_string()));
        }
        scope.vars.insert(name.to_string(), value);
        Ok(())
    }

    /// Assign to an existing variable, innermost scope first.
    pub fn assign(&mut self, name: &str, value: PrimValue) -> Result<()> {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.vars.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            if scope.barrier {
                break;
            }
        }
        Err(Error::UndefinedVariable(name.to_string()))
    }

    /// Read a variable, innermost scope first.
    pub fn get(&self, name: &str) -> Result<PrimValue> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.vars.get(name) {
                return Ok(value.clone());
            }
            if scope.barrier {
                break;
            }
        }
        Err(Error::UndefinedVariable(name.to_string()))
    }

    /// Declare a function in the innermost scope.
    pub fn declare_function(&mut self, name: &str, function: Function) -> Result<()> {
        let scope = self.scopes.last_mut().expect("root scope always exists");
        if scope.funcs.contains_key(name) {
            return Err(Error::DuplicateFunction(name.to_string()));
        }
        scope.funcs.insert(name.to_string(), function);
        Ok(())
    }

    /// Look up a function, innermost scope first. Function lookup is not
    /// stopped by barriers.
    pub fn lookup_function(&self, name: &str) -> Option<Function> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.funcs.get(name).cloned())
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
