//! AST node types for GenLang.
//!
//! Every node carries a [`Span`] for error reporting. Nodes are built once
//! by the parser and never mutated afterwards. Function nodes sit behind
//! [`Arc`] so closures can point at them and a finished [`Program`] can be
//! shared read-only between threads.

use std::sync::Arc;

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete script: global definitions followed by function definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub globals: Vec<VarDef>,
    pub functions: Vec<Arc<Function>>,
    pub span: Span,
}

impl Program {
    /// Find a top-level function by name.
    pub fn function(&self, name: &str) -> Option<&Arc<Function>> {
        self.functions
            .iter()
            .find(|f| f.name.as_ref().is_some_and(|n| n.name == name))
    }
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A type annotation. Descriptive only; never checked.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub span: Span,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Definitions
// ══════════════════════════════════════════════════════════════════════════════

/// `[const] type name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDef {
    pub type_ref: TypeRef,
    pub name: Ident,
    pub value: Expr,
    pub constant: bool,
    pub span: Span,
}

/// `fun type name(params) body`, or the anonymous `fun type (params) body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// `None` for function expressions.
    pub name: Option<Ident>,
    pub result: TypeRef,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

impl Function {
    /// Name used in diagnostics and value display.
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("<lambda>", |n| n.name.as_str())
    }
}

/// `type name [= default]`
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_ref: TypeRef,
    pub name: Ident,
    pub default: Option<Expr>,
    pub span: Span,
}

/// `{ statements... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `[const] type name = expr`
    VarDef(VarDef),
    /// A function defined inside a block.
    FunDef(Arc<Function>),
    /// `name = expr`
    Assign(AssignStmt),
    /// A bare expression.
    Expr(ExprStmt),
    /// `return expr`
    Return(ReturnStmt),
    /// `for type item in iterable do body`
    For(ForStmt),
    /// `while condition do body`
    While(WhileStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub name: Ident,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub type_ref: TypeRef,
    pub item: Ident,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `-3.5`
    NumberLit(f64),
    /// `true` / `false`
    BoolLit(bool),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `[k: v, ...]` or `[:]`
    Map(Vec<MapEntry>),
    /// `[a..b]`, `[a...b step s]`
    Range(RangeExpr),

    // ── Names & Calls ──
    Identifier(String),
    /// `name(args...)`
    Call { name: Ident, args: Vec<Expr> },
    /// `expr(args...)` where `expr` is not a plain name.
    Apply { callee: Box<Expr>, args: Vec<Expr> },
    /// `receiver.method(args...)`
    MethodCall {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    /// `new Type(args...)`
    Create { type_ref: TypeRef, args: Vec<Expr> },
    /// `target[key]`
    Index { target: Box<Expr>, key: Box<Expr> },
    /// `target[key] = value`
    Update {
        target: Box<Expr>,
        key: Box<Expr>,
        value: Box<Expr>,
    },

    // ── Operators ──
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary { op: UnaryOp, operand: Box<Expr> },

    // ── Control Flow ──
    If(Box<IfExpr>),

    /// `fun type (params) body`
    Function(Arc<Function>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeExpr {
    pub start: Box<Expr>,
    pub end: Box<Expr>,
    /// `...` includes `end`, `..` stops before it.
    pub inclusive: bool,
    pub step: Option<Box<Expr>>,
}

/// `if cond then stmts [else stmts]`
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// Binary operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    Xor,
    And,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::LessEq => "<=",
            BinOp::Greater => ">",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
}
