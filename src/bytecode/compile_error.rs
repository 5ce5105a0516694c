use crate::frontend::lexer::Span;
use crate::frontend::token::Token;
use crate::lang::symbol::Symbol;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Assignment or `read` into a constant or a procedure
    NotAssignable {
        kind: &'static str,
        name: String,
        span: Span,
    },
    /// `call` on a name that is not a procedure
    NotCallable {
        kind: &'static str,
        name: String,
        span: Span,
    },
    /// A procedure name used where a value is expected
    NotAValue { name: String, span: Span },
    /// A token in operator position that has no operator
    InvalidOperator { token: String, span: Span },
    /// Internal compiler error (shouldn't happen for trees built by the parser)
    Internal(String),
}

impl CompileError {
    pub fn not_assignable(symbol: &Symbol, span: Span) -> Self {
        CompileError::NotAssignable {
            kind: symbol.kind_name(),
            name: symbol.name.clone(),
            span,
        }
    }

    pub fn not_callable(symbol: &Symbol, span: Span) -> Self {
        CompileError::NotCallable {
            kind: symbol.kind_name(),
            name: symbol.name.clone(),
            span,
        }
    }

    pub fn not_a_value(symbol: &Symbol, span: Span) -> Self {
        CompileError::NotAValue {
            name: symbol.name.clone(),
            span,
        }
    }

    pub fn invalid_operator(token: &Token, span: Span) -> Self {
        CompileError::InvalidOperator {
            token: token.describe().to_string(),
            span,
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }

    /// Source location of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::NotAssignable { span, .. }
            | CompileError::NotCallable { span, .. }
            | CompileError::NotAValue { span, .. }
            | CompileError::InvalidOperator { span, .. } => Some(*span),
            CompileError::Internal(_) => None,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(span) = self.span() {
            write!(f, "{}: ", span)?;
        }
        match self {
            CompileError::NotAssignable { kind, name, .. } => {
                write!(f, "compile error: {} '{}' is not assignable", kind, name)?;
                write!(f, "\n  hint: only variables declared with 'var' can be assigned or read into")
            }
            CompileError::NotCallable { kind, name, .. } => {
                write!(f, "compile error: {} '{}' is not a procedure", kind, name)?;
                write!(f, "\n  hint: 'call' expects a name declared with 'procedure'")
            }
            CompileError::NotAValue { name, .. } => {
                write!(
                    f,
                    "compile error: procedure '{}' cannot be used in an expression",
                    name
                )
            }
            CompileError::InvalidOperator { token, .. } => {
                write!(f, "compile error: invalid operator '{}'", token)
            }
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {}
