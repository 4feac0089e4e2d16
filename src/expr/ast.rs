//! Expression AST.

/// A parsed expression. Built once per distinct expression string at
/// template compile time, then interpreted on every evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Numeric literal.
    Number(f64),
    /// String literal (single or double quoted).
    Str(String),
    /// `[a, b, c]`
    List(Vec<Expr>),
    /// `{key: value, "other": value}`
    Map(Vec<(String, Expr)>),
    /// Bare identifier, resolved against the state first.
    Ident(String),
    /// `object.field`
    Member(Box<Expr>, String),
    /// `container[index]`
    Index(Box<Expr>, Box<Expr>),
    /// `callee(args...)`
    Call(Box<Expr>, Vec<Expr>),
    /// `!x` / `-x`
    Unary(UnaryOp, Box<Expr>),
    /// Infix operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `cond ? then : else`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical negation, always yields a boolean.
    Not,
    /// Numeric negation.
    Neg,
}

/// Infix operators, loosest-binding last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}
