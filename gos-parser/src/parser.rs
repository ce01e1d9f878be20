// gos-parser - Front end for the Gos programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive-descent parser for Gos.
//!
//! Precedence, lowest binding last: `*` `/`, then `+` `-`, then the
//! comparison operators (including `&&` and `||`), then `&` `|` `^`.
//! All binary operators are left-associative.

use std::fmt;

use crate::ast::{
    BinOp, Eval, Exit, Expr, FuncCall, FuncDecl, Goto, If, In, Label, Out, Program, Return, Stmt,
    UnaryOp, Val, Var, VarDecl, VarMod, While,
};
use crate::lexer::{Lexer, LexerError, TokenKind};

/// Parser error: either a tokenisation failure or a syntax error with
/// position information.
#[derive(Debug, Clone)]
pub enum ParserError {
    Lexer(LexerError),
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserError::Lexer(e) => write!(f, "{}", e),
            ParserError::Syntax {
                message,
                line,
                column,
            } => {
                write!(f, "Parser error at {}:{}: {}", line, column, message)
            }
        }
    }
}

impl std::error::Error for ParserError {}

impl From<LexerError> for ParserError {
    fn from(e: LexerError) -> Self {
        ParserError::Lexer(e)
    }
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParserError>;

/// The parser drives the lexer one token at a time and builds the AST.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Create a parser over the given source.
    pub fn new(source: &'a str) -> Result<Self> {
        Ok(Parser {
            lexer: Lexer::new(source)?,
        })
    }

    /// Parse a whole translation unit.
    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();
        while !matches!(self.current(), TokenKind::Eof) {
            body.push(self.ctrl()?);
        }
        Ok(Program { body })
    }

    // ========================================================================
    // Grammar
    // ========================================================================

    /// ctrl: `if` | `while` | `fun` | stmt
    fn ctrl(&mut self) -> Result<Expr> {
        match self.current() {
            TokenKind::If => self.if_expr(),
            TokenKind::While => self.while_expr(),
            TokenKind::Fun => self.func_decl(),
            _ => self.stmt(),
        }
    }

    /// stmt: `{ ctrl* }` | ctrl | expr
    fn stmt(&mut self) -> Result<Expr> {
        match self.current() {
            TokenKind::LBrace => self.block(),
            TokenKind::If | TokenKind::While | TokenKind::Fun => self.ctrl(),
            _ => self.expr(),
        }
    }

    /// expr: statement keyword dispatch, or the operator grammar.
    fn expr(&mut self) -> Result<Expr> {
        match self.current() {
            TokenKind::Goto => {
                self.advance()?;
                let label = self.ident()?;
                Ok(Expr::Goto(Goto { label }))
            }
            TokenKind::Let => {
                self.advance()?;
                let name = self.ident()?;
                if !matches!(self.current(), TokenKind::Assign) {
                    return Err(self.syntax_error(format!(
                        "missing '=' in declaration of '{}'",
                        name
                    )));
                }
                self.advance()?;
                let value = self.expr()?;
                Ok(Expr::VarDecl(VarDecl {
                    name,
                    value: Box::new(value),
                }))
            }
            TokenKind::Out => {
                self.advance()?;
                let value = self.expr()?;
                Ok(Expr::Out(Out {
                    value: Box::new(value),
                }))
            }
            TokenKind::In => {
                self.advance()?;
                let name = self.ident()?;
                Ok(Expr::In(In { name }))
            }
            TokenKind::Return => {
                self.advance()?;
                let value = if matches!(self.current(), TokenKind::RBrace | TokenKind::Eof) {
                    None
                } else {
                    Some(Box::new(self.expr()?))
                };
                Ok(Expr::Return(Return { value }))
            }
            TokenKind::Exit => {
                self.advance()?;
                let status = self.expr()?;
                Ok(Expr::Exit(Exit {
                    status: Box::new(status),
                }))
            }
            TokenKind::Eval => {
                self.advance()?;
                let code = self.expr()?;
                Ok(Expr::Eval(Eval {
                    code: Box::new(code),
                }))
            }
            TokenKind::Del => Err(self.syntax_error("'del' is reserved".to_string())),
            TokenKind::If | TokenKind::While | TokenKind::LBrace => self.stmt(),
            _ => self.logical(),
        }
    }

    /// logical: comparison ((`&` | `|` | `^`) comparison)*
    fn logical(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        while matches!(
            self.current(),
            TokenKind::BitAnd | TokenKind::BitOr | TokenKind::BitXor
        ) {
            let op = self.current().clone();
            self.advance()?;
            let right = self.comparison()?;
            left = Expr::BinOp(BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// comparison: additive ((`==` | `!=` | `>` | `>=` | `<` | `<=` | `&&` | `||`) additive)*
    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        while matches!(
            self.current(),
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Gt
                | TokenKind::Ge
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::And
                | TokenKind::Or
        ) {
            let op = self.current().clone();
            self.advance()?;
            let right = self.additive()?;
            left = Expr::BinOp(BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// additive: term ((`+` | `-`) term)*
    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.term()?;
        while matches!(self.current(), TokenKind::Add | TokenKind::Sub) {
            let op = self.current().clone();
            self.advance()?;
            let right = self.term()?;
            left = Expr::BinOp(BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// term: factor ((`*` | `/`) factor)*
    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;
        while matches!(self.current(), TokenKind::Mul | TokenKind::Div) {
            let op = self.current().clone();
            self.advance()?;
            let right = self.factor()?;
            left = Expr::BinOp(BinOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
        Ok(left)
    }

    /// factor: literal | `(` expr `)` | unary factor | identifier forms
    fn factor(&mut self) -> Result<Expr> {
        match self.current().clone() {
            TokenKind::Literal(value) => {
                self.advance()?;
                Ok(Expr::Val(Val { value }))
            }
            TokenKind::LParen => {
                self.advance()?;
                let inner = self.expr()?;
                if !matches!(self.current(), TokenKind::RParen) {
                    return Err(self.syntax_error(format!(
                        "expected ')', found '{}'",
                        self.current()
                    )));
                }
                self.advance()?;
                Ok(inner)
            }
            op @ (TokenKind::Pos | TokenKind::Neg | TokenKind::Not) => {
                self.advance()?;
                let argument = self.factor()?;
                Ok(Expr::UnaryOp(UnaryOp {
                    op,
                    argument: Box::new(argument),
                }))
            }
            TokenKind::Ident(name) => {
                self.advance()?;
                self.ident_suffix(name)
            }
            other => Err(self.syntax_error(format!("unexpected '{}'", other))),
        }
    }

    /// An identifier can be a label marker, an increment/decrement, a
    /// call, an assignment or a plain variable reference, depending on
    /// the following token.
    fn ident_suffix(&mut self, name: String) -> Result<Expr> {
        match self.current() {
            TokenKind::Colon => {
                self.advance()?;
                Ok(Expr::Label(Label { name }))
            }
            TokenKind::Inc | TokenKind::Dec => {
                let op = self.current().clone();
                self.advance()?;
                Ok(Expr::UnaryOp(UnaryOp {
                    op,
                    argument: Box::new(Expr::Var(Var { name })),
                }))
            }
            TokenKind::LParen => {
                self.advance()?;
                let mut args = Vec::new();
                // Arguments are whitespace-separated expressions.
                while !matches!(self.current(), TokenKind::RParen) {
                    if matches!(self.current(), TokenKind::Eof) {
                        return Err(self.syntax_error(format!(
                            "expected ')' to close call of '{}'",
                            name
                        )));
                    }
                    args.push(self.expr()?);
                }
                self.advance()?;
                Ok(Expr::FuncCall(FuncCall { name, args }))
            }
            TokenKind::Assign => {
                self.advance()?;
                let value = self.expr()?;
                Ok(Expr::VarMod(VarMod {
                    name,
                    value: Box::new(value),
                }))
            }
            _ => Ok(Expr::Var(Var { name })),
        }
    }

    fn if_expr(&mut self) -> Result<Expr> {
        self.advance()?;
        let cond = self.expr()?;
        let then = self.stmt()?;
        let else_branch = if matches!(self.current(), TokenKind::Else) {
            self.advance()?;
            Some(Box::new(self.stmt()?))
        } else {
            None
        };
        Ok(Expr::If(If {
            cond: Box::new(cond),
            then: Box::new(then),
            else_branch,
        }))
    }

    fn while_expr(&mut self) -> Result<Expr> {
        self.advance()?;
        let cond = self.expr()?;
        let body = self.stmt()?;
        Ok(Expr::While(While {
            cond: Box::new(cond),
            body: Box::new(body),
        }))
    }

    fn func_decl(&mut self) -> Result<Expr> {
        self.advance()?;
        let name = self.ident()?;
        if !matches!(self.current(), TokenKind::LParen) {
            return Err(self.syntax_error(format!(
                "expected '(' after function name '{}'",
                name
            )));
        }
        self.advance()?;

        let mut params = Vec::new();
        loop {
            match self.current().clone() {
                TokenKind::RParen => break,
                TokenKind::Ident(param) => {
                    params.push(param);
                    self.advance()?;
                }
                other => {
                    return Err(self.syntax_error(format!(
                        "expected parameter name or ')', found '{}'",
                        other
                    )));
                }
            }
        }
        self.advance()?;

        let body = self.stmt()?;
        Ok(Expr::FuncDecl(FuncDecl {
            name,
            params,
            body: Box::new(body),
        }))
    }

    fn block(&mut self) -> Result<Expr> {
        self.advance()?;
        let mut body = Vec::new();
        while !matches!(self.current(), TokenKind::RBrace) {
            if matches!(self.current(), TokenKind::Eof) {
                return Err(self.syntax_error("expected '}' before end of input".to_string()));
            }
            body.push(self.ctrl()?);
        }
        self.advance()?;
        Ok(Expr::Stmt(Stmt { body }))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn current(&self) -> &TokenKind {
        self.lexer.current()
    }

    fn advance(&mut self) -> Result<()> {
        self.lexer.advance()?;
        Ok(())
    }

    fn ident(&mut self) -> Result<String> {
        match self.current().clone() {
            TokenKind::Ident(name) => {
                self.advance()?;
                Ok(name)
            }
            other => Err(self.syntax_error(format!("expected a name, found '{}'", other))),
        }
    }

    fn syntax_error(&self, message: String) -> ParserError {
        ParserError::Syntax {
            message,
            line: self.lexer.line(),
            column: self.lexer.column(),
        }
    }
}

/// Parse a source string into a [`Program`].
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source)?.parse()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PrimValue;

    fn parse_one(source: &str) -> Expr {
        let program = parse(source).expect("parse error");
        assert_eq!(program.body.len(), 1, "expected one expression");
        program.body.into_iter().next().unwrap()
    }

    fn num(n: f64) -> Expr {
        Expr::Val(Val {
            value: PrimValue::Number(n),
        })
    }

    #[test]
    fn test_precedence_mul_over_add() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse_one("1 + 2 * 3");
        match expr {
            Expr::BinOp(bin) => {
                assert_eq!(bin.op, TokenKind::Add);
                assert_eq!(*bin.left, num(1.0));
                assert!(matches!(*bin.right, Expr::BinOp(ref inner) if inner.op == TokenKind::Mul));
            }
            other => panic!("expected BinOp, got {:?}", other),
        }
    }

    #[test]
    fn test_parens_override_precedence() {
        // (1 + 2) * 3 parses as (1 + 2) * 3
        let expr = parse_one("(1 + 2) * 3");
        match expr {
            Expr::BinOp(bin) => {
                assert_eq!(bin.op, TokenKind::Mul);
                assert!(matches!(*bin.left, Expr::BinOp(ref inner) if inner.op == TokenKind::Add));
                assert_eq!(*bin.right, num(3.0));
            }
            other => panic!("expected BinOp, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associativity() {
        // 10 - 4 - 3 parses as (10 - 4) - 3
        let expr = parse_one("10 - 4 - 3");
        match expr {
            Expr::BinOp(bin) => {
                assert_eq!(bin.op, TokenKind::Sub);
                assert_eq!(*bin.right, num(3.0));
            }
            other => panic!("expected BinOp, got {:?}", other),
        }
    }

    #[test]
    fn test_comparison_binds_looser_than_additive() {
        let expr = parse_one("n - 1 > 0");
        match expr {
            Expr::BinOp(bin) => assert_eq!(bin.op, TokenKind::Gt),
            other => panic!("expected BinOp, got {:?}", other),
        }
    }

    #[test]
    fn test_var_decl() {
        let expr = parse_one("let x = 5");
        assert_eq!(
            expr,
            Expr::VarDecl(VarDecl {
                name: "x".into(),
                value: Box::new(num(5.0)),
            })
        );
    }

    #[test]
    fn test_var_decl_requires_assign() {
        assert!(parse("let x 5").is_err());
    }

    #[test]
    fn test_var_mod() {
        let expr = parse_one("x = x + 1");
        assert!(matches!(expr, Expr::VarMod(ref m) if m.name == "x"));
    }

    #[test]
    fn test_label_and_goto() {
        let program = parse("loop: goto loop").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[0], Expr::Label(ref l) if l.name == "loop"));
        assert!(matches!(program.body[1], Expr::Goto(ref g) if g.label == "loop"));
    }

    #[test]
    fn test_postfix_inc_dec() {
        let expr = parse_one("n--");
        match expr {
            Expr::UnaryOp(u) => {
                assert_eq!(u.op, TokenKind::Dec);
                assert!(matches!(*u.argument, Expr::Var(ref v) if v.name == "n"));
            }
            other => panic!("expected UnaryOp, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_binds_to_factor() {
        // -2 * 3 parses as (-2) * 3
        let expr = parse_one("-2 * 3");
        match expr {
            Expr::BinOp(bin) => {
                assert_eq!(bin.op, TokenKind::Mul);
                assert!(matches!(*bin.left, Expr::UnaryOp(ref u) if u.op == TokenKind::Neg));
            }
            other => panic!("expected BinOp, got {:?}", other),
        }
    }

    #[test]
    fn test_func_decl_and_params() {
        let expr = parse_one("fun fib(n a b) { return a }");
        match expr {
            Expr::FuncDecl(decl) => {
                assert_eq!(decl.name, "fib");
                assert_eq!(decl.params, ["n", "a", "b"]);
            }
            other => panic!("expected FuncDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_call_args_whitespace_separated() {
        let expr = parse_one("fib(n - 1 b a + b)");
        match expr {
            Expr::FuncCall(call) => {
                assert_eq!(call.name, "fib");
                assert_eq!(call.args.len(), 3);
                assert!(matches!(call.args[0], Expr::BinOp(_)));
                assert!(matches!(call.args[1], Expr::Var(_)));
                assert!(matches!(call.args[2], Expr::BinOp(_)));
            }
            other => panic!("expected FuncCall, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else() {
        let expr = parse_one("if x > 0 { out x } else { out 0 }");
        match expr {
            Expr::If(i) => {
                assert!(i.else_branch.is_some());
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_block_as_declaration_value() {
        let expr = parse_one("let x = { let a = 1 a }");
        match expr {
            Expr::VarDecl(decl) => assert!(matches!(*decl.value, Expr::Stmt(_))),
            other => panic!("expected VarDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_return_without_value() {
        let expr = parse_one("fun f() { return }");
        match expr {
            Expr::FuncDecl(decl) => match *decl.body {
                Expr::Stmt(ref block) => {
                    assert!(matches!(block.body[0], Expr::Return(Return { value: None })));
                }
                ref other => panic!("expected block body, got {:?}", other),
            },
            other => panic!("expected FuncDecl, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_block() {
        assert!(parse("{ out 1").is_err());
    }

    #[test]
    fn test_del_is_reserved() {
        assert!(parse("del x").is_err());
    }

    #[test]
    fn test_parser_does_not_fold() {
        // Folding is the optimizer's job; the parser keeps the tree.
        let expr = parse_one("1 + 2");
        assert!(matches!(expr, Expr::BinOp(_)));
    }
}
