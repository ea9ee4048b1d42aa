//! AST types for Pyrite (functions, statements, expressions).

use std::fmt;

/// Root of a compiled source file: list of function definitions.
#[derive(Clone, Debug)]
pub struct Module {
    pub filename: String,
    pub funcs: Vec<FnDecl>,
}

/// Function definition: `def name(a, b):` plus an indented body.
#[derive(Clone, Debug)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    /// 1-based source line of the `def` header.
    pub line: u32,
}

/// Statement.
#[derive(Clone, Debug)]
pub enum Stmt {
    /// `x = expr`
    Assign {
        target: String,
        value: Expr,
        line: u32,
    },
    /// `return expr`
    Return { value: Expr, line: u32 },
    /// `if cond:` with a nested body and no `else`.
    If {
        cond: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
    /// `if cond:` immediately followed by `else:` at the same indentation.
    IfElse {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        line: u32,
    },
    /// `while cond:` with a nested body.
    While {
        cond: Expr,
        body: Vec<Stmt>,
        line: u32,
    },
}

impl Stmt {
    /// 1-based source line this statement came from.
    pub fn line(&self) -> u32 {
        match self {
            Stmt::Assign { line, .. }
            | Stmt::Return { line, .. }
            | Stmt::If { line, .. }
            | Stmt::IfElse { line, .. }
            | Stmt::While { line, .. } => *line,
        }
    }
}

/// Expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    /// Integer literal.
    Int(i64),
    /// Variable reference.
    Var(String),
    /// Three-token infix operation `left OP right`.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Direct call `name(arg, arg, ...)`.
    Call { callee: String, args: Vec<Expr> },
}

/// The operator set of the three-token expression grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Lt,
    Gt,
}

impl BinOp {
    /// Parse the middle token of a three-token expression.
    pub fn from_token(tok: &str) -> Option<BinOp> {
        match tok {
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "<" => Some(BinOp::Lt),
            ">" => Some(BinOp::Gt),
            _ => None,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        };
        write!(f, "{}", s)
    }
}
