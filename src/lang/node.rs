use super::symbol::Symbol;
use crate::frontend::lexer::Span;
use crate::frontend::token::Token;

/// A block: the declarations and body of the program or of one procedure.
///
/// `level` is the lexical level of the block's own scope (the program block
/// is level 0) and `variable_count` the number of variables it declares,
/// which sizes the activation record.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub level: usize,
    pub variable_count: usize,
    pub constants: Vec<Symbol>,
    pub variables: Vec<Symbol>,
    pub procedures: Vec<ProcedureDecl>,
    pub body: Stmt,
}

/// `procedure <name>; <block>;`
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDecl {
    pub symbol: Symbol,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    // ───────────────────────────── Data ─────────────────────────────────
    /// `target := value`
    Assign {
        target: Symbol,
        value: Expr,
        span: Span,
    },

    /// `read a, b` - each target receives one integer from the input.
    Read { targets: Vec<(Symbol, Span)> },

    /// `write e1, e2` - each value is written on its own line.
    Write { values: Vec<Expr> },

    // ─────────────────────────── Control flow ───────────────────────────
    /// `call <name>`
    Call { callee: Symbol, span: Span },

    /// `if cond then .. [else ..]`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// `while cond do ..`
    While { condition: Expr, body: Box<Stmt> },

    /// `begin s1; s2; .. end`
    Sequence(Vec<Stmt>),

    /// `return` - leave the current procedure early.
    Return,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Binary arithmetic or comparison. `op` is the operator token as written.
    Binary {
        op: Token,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },

    /// Unary operation (`odd e`).
    Unary {
        op: Token,
        operand: Box<Expr>,
        span: Span,
    },

    Literal(i64),

    /// A reference to a variable or constant.
    Variable { symbol: Symbol, span: Span },
}
