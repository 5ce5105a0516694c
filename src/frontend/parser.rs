use crate::frontend::lexer::{Span, Spanned};
use crate::frontend::parser_error::ParserError;
use crate::frontend::scope::ScopeChain;
use crate::frontend::token::Token;
use crate::lang::node::{Block, Expr, ProcedureDecl, Stmt};
use crate::lang::symbol::Symbol;

/// Recursive-descent parser for PL/0.
///
/// The parser consumes lexed `Spanned` tokens and produces the program's
/// top-level `Block` with every name already bound to its `Symbol`:
/// - declarations are entered into a `ScopeChain` as they are parsed,
/// - references are resolved against the chain at the point of use,
///   so a name must be declared before it is used.
///
/// Semantic checks that depend on *what* a name is (assigning to a constant,
/// calling a variable) are left to the bytecode compiler.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    scopes: ScopeChain,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser {
            tokens,
            pos: 0,
            scopes: ScopeChain::new(),
        }
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    /// Span of the current token, or of the last token once past the end.
    fn span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.span)
            .unwrap_or(Span { line: 1, col: 1 })
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token if it equals `expected`.
    fn matches(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if self.matches(&expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}' instead of '{}'",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        self.error_at(message, self.span())
    }

    fn error_at(&self, message: impl Into<String>, span: Span) -> ParserError {
        ParserError {
            message: message.into(),
            line: span.line,
            col: span.col,
        }
    }

    /// Parses a complete program: `block "."`, followed by end of source.
    pub fn parse(&mut self) -> Result<Block, ParserError> {
        self.scopes.enter();
        let block = self.block()?;
        self.scopes.leave();

        self.expect(Token::Period)?;
        self.expect(Token::Eof)?;
        Ok(block)
    }

    fn block(&mut self) -> Result<Block, ParserError> {
        let constants = if self.peek() == &Token::Const {
            self.constant_declaration()?
        } else {
            Vec::new()
        };

        let variables = if self.peek() == &Token::Var {
            self.variable_declaration()?
        } else {
            Vec::new()
        };

        let level = self.scopes.level();
        let variable_count = self.scopes.variable_count();

        let mut procedures = Vec::new();
        while self.peek() == &Token::Procedure {
            procedures.push(self.procedure_declaration()?);
        }

        let body = self.statement()?;

        Ok(Block {
            level,
            variable_count,
            constants,
            variables,
            procedures,
            body,
        })
    }

    /// `const a = 1, b = 2;`
    fn constant_declaration(&mut self) -> Result<Vec<Symbol>, ParserError> {
        self.expect(Token::Const)?;

        let mut constants = Vec::new();
        loop {
            let span = self.span();
            let name = self.identifier()?;
            self.expect(Token::Eq)?;
            let value = self.number()?;
            let symbol = self
                .scopes
                .define_constant(&name, value)
                .map_err(|e| self.error_at(e, span))?;
            constants.push(symbol);

            if !self.matches(&Token::Comma) {
                break;
            }
        }

        self.expect(Token::Semicolon)?;
        Ok(constants)
    }

    /// `var a, b;`
    fn variable_declaration(&mut self) -> Result<Vec<Symbol>, ParserError> {
        self.expect(Token::Var)?;

        let mut variables = Vec::new();
        loop {
            let span = self.span();
            let name = self.identifier()?;
            let symbol = self
                .scopes
                .define_variable(&name)
                .map_err(|e| self.error_at(e, span))?;
            variables.push(symbol);

            if !self.matches(&Token::Comma) {
                break;
            }
        }

        self.expect(Token::Semicolon)?;
        Ok(variables)
    }

    /// `procedure name; block;`
    ///
    /// The procedure's own name is defined before its body is parsed, so a
    /// procedure can call itself.
    fn procedure_declaration(&mut self) -> Result<ProcedureDecl, ParserError> {
        self.expect(Token::Procedure)?;

        let span = self.span();
        let name = self.identifier()?;
        let symbol = self
            .scopes
            .define_procedure(&name)
            .map_err(|e| self.error_at(e, span))?;
        self.expect(Token::Semicolon)?;

        self.scopes.enter();
        let block = self.block()?;
        self.scopes.leave();

        self.expect(Token::Semicolon)?;

        Ok(ProcedureDecl {
            symbol,
            block,
            span,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParserError> {
        match self.peek() {
            Token::Ident(_) => self.assign_statement(),
            Token::Call => self.call_statement(),
            Token::Read => self.read_statement(),
            Token::Write => self.write_statement(),
            Token::Begin => self.statement_list(),
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::Return => {
                self.advance();
                Ok(Stmt::Return)
            }
            // Empty statement, e.g. before `end` in `begin x := 1; end`.
            Token::Semicolon | Token::End | Token::Period | Token::Else => {
                Ok(Stmt::Sequence(Vec::new()))
            }
            other => Err(self.error(format!(
                "expected a statement instead of '{}'",
                other.describe()
            ))),
        }
    }

    fn assign_statement(&mut self) -> Result<Stmt, ParserError> {
        let (target, span) = self.resolved_identifier()?;
        self.expect(Token::Assign)?;
        let value = self.expression()?;
        Ok(Stmt::Assign {
            target,
            value,
            span,
        })
    }

    fn call_statement(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::Call)?;
        let (callee, span) = self.resolved_identifier()?;
        Ok(Stmt::Call { callee, span })
    }

    fn read_statement(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::Read)?;

        let mut targets = Vec::new();
        loop {
            targets.push(self.resolved_identifier()?);
            if !self.matches(&Token::Comma) {
                break;
            }
        }

        Ok(Stmt::Read { targets })
    }

    fn write_statement(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::Write)?;

        let mut values = Vec::new();
        loop {
            values.push(self.expression()?);
            if !self.matches(&Token::Comma) {
                break;
            }
        }

        Ok(Stmt::Write { values })
    }

    /// `begin s1; s2; ... end`
    fn statement_list(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::Begin)?;

        let mut statements = Vec::new();
        loop {
            statements.push(self.statement()?);
            if !self.matches(&Token::Semicolon) {
                break;
            }
        }

        self.expect(Token::End)?;
        Ok(Stmt::Sequence(statements))
    }

    fn if_statement(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::If)?;
        let condition = self.condition()?;
        self.expect(Token::Then)?;
        let then_branch = Box::new(self.statement()?);

        let else_branch = if self.matches(&Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParserError> {
        self.expect(Token::While)?;
        let condition = self.condition()?;
        self.expect(Token::Do)?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `odd expr` or `expr relop expr`.
    fn condition(&mut self) -> Result<Expr, ParserError> {
        let span = self.span();
        if self.matches(&Token::Odd) {
            let operand = Box::new(self.expression()?);
            return Ok(Expr::Unary {
                op: Token::Odd,
                operand,
                span,
            });
        }

        let lhs = Box::new(self.expression()?);
        let op_span = self.span();
        let op = self.advance();
        if !op.is_relational() {
            return Err(self.error_at(
                format!(
                    "expected a comparison operator instead of '{}'",
                    op.describe()
                ),
                op_span,
            ));
        }
        let rhs = Box::new(self.expression()?);

        Ok(Expr::Binary {
            op,
            lhs,
            rhs,
            span: op_span,
        })
    }

    /// `["+"|"-"] term {("+"|"-") term}`
    ///
    /// A leading minus is parsed as `0 - term`.
    fn expression(&mut self) -> Result<Expr, ParserError> {
        let span = self.span();
        let mut lhs = match self.peek() {
            Token::Minus => {
                self.advance();
                Expr::Binary {
                    op: Token::Minus,
                    lhs: Box::new(Expr::Literal(0)),
                    rhs: Box::new(self.term()?),
                    span,
                }
            }
            Token::Plus => {
                self.advance();
                self.term()?
            }
            _ => self.term()?,
        };

        while matches!(self.peek(), Token::Plus | Token::Minus) {
            let span = self.span();
            let op = self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ParserError> {
        let mut lhs = self.factor()?;

        while matches!(self.peek(), Token::Star | Token::Slash) {
            let span = self.span();
            let op = self.advance();
            let rhs = self.factor()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            };
        }

        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, ParserError> {
        match self.peek() {
            Token::Ident(_) => {
                let (symbol, span) = self.resolved_identifier()?;
                Ok(Expr::Variable { symbol, span })
            }
            Token::Number(_) => Ok(Expr::Literal(self.number()?)),
            Token::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            other => Err(self.error(format!(
                "expected an identifier, a number or '(' instead of '{}'",
                other.describe()
            ))),
        }
    }

    fn identifier(&mut self) -> Result<String, ParserError> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!(
                "expected an identifier instead of '{}'",
                other.describe()
            ))),
        }
    }

    /// Reads an identifier and binds it to the innermost declaration.
    fn resolved_identifier(&mut self) -> Result<(Symbol, Span), ParserError> {
        let span = self.span();
        let name = self.identifier()?;
        match self.scopes.resolve(&name) {
            Some(symbol) => Ok((symbol.clone(), span)),
            None => Err(self.error_at(format!("undeclared identifier \"{}\"", name), span)),
        }
    }

    fn number(&mut self) -> Result<i64, ParserError> {
        match self.peek() {
            Token::Number(n) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            other => Err(self.error(format!(
                "expected a number instead of '{}'",
                other.describe()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::lang::symbol::SymbolKind;

    fn parse(source: &str) -> Result<Block, ParserError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse()
    }

    #[test]
    fn test_minimal_program() {
        let block = parse("var x; begin x := 1 + 2; write x end.").unwrap();

        assert_eq!(block.level, 0);
        assert_eq!(block.variable_count, 1);
        match &block.body {
            Stmt::Sequence(stmts) => {
                assert_eq!(stmts.len(), 2);
                assert!(matches!(stmts[0], Stmt::Assign { .. }));
                assert!(matches!(stmts[1], Stmt::Write { .. }));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_procedure_levels() {
        let block = parse(
            "var a;
             procedure p;
               var b, c;
               procedure q;
                 begin c := a end;
               call q;
             call p.",
        )
        .unwrap();

        let p = &block.procedures[0];
        assert_eq!(p.block.level, 1);
        assert_eq!(p.block.variable_count, 2);
        assert!(matches!(p.symbol.kind, SymbolKind::Procedure { level: 0, .. }));

        let q = &p.block.procedures[0];
        assert_eq!(q.block.level, 2);
        assert_eq!(q.block.variable_count, 0);
        assert!(matches!(q.symbol.kind, SymbolKind::Procedure { level: 1, .. }));

        match &q.block.body {
            Stmt::Sequence(stmts) => match &stmts[0] {
                Stmt::Assign { target, value, .. } => {
                    assert_eq!(target.kind, SymbolKind::Variable { level: 1, index: 1 });
                    match value {
                        Expr::Variable { symbol, .. } => {
                            assert_eq!(symbol.kind, SymbolKind::Variable { level: 0, index: 0 })
                        }
                        other => panic!("expected variable, got {:?}", other),
                    }
                }
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let block = parse("var x; x := 1 + 2 * 3.").unwrap();
        match block.body {
            Stmt::Assign {
                value: Expr::Binary { op, rhs, .. },
                ..
            } => {
                assert_eq!(op, Token::Plus);
                assert!(matches!(*rhs, Expr::Binary { op: Token::Star, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_leading_minus() {
        let block = parse("var x; x := -5.").unwrap();
        match block.body {
            Stmt::Assign {
                value: Expr::Binary { op, lhs, rhs, .. },
                ..
            } => {
                assert_eq!(op, Token::Minus);
                assert_eq!(*lhs, Expr::Literal(0));
                assert_eq!(*rhs, Expr::Literal(5));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_if_else_and_while() {
        let block = parse(
            "var i; begin
               if 1 < 2 then write 1 else write 2;
               while odd i do i := i - 1
             end.",
        )
        .unwrap();

        match block.body {
            Stmt::Sequence(stmts) => {
                assert!(matches!(
                    stmts[0],
                    Stmt::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
                assert!(matches!(
                    stmts[1],
                    Stmt::While {
                        condition: Expr::Unary { op: Token::Odd, .. },
                        ..
                    }
                ));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_constant_assignment_is_left_to_compiler() {
        let block = parse("const k = 3; k := 4.").unwrap();
        match block.body {
            Stmt::Assign { target, .. } => {
                assert_eq!(target.kind, SymbolKind::Constant { value: 3 })
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_statement_before_end() {
        let block = parse("var x; begin x := 1; end.").unwrap();
        match block.body {
            Stmt::Sequence(stmts) => {
                assert_eq!(stmts.len(), 2);
                assert_eq!(stmts[1], Stmt::Sequence(Vec::new()));
            }
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_undeclared_identifier() {
        let err = parse("var x;\nbegin y := 1 end.").unwrap_err();
        assert!(err.message.contains("undeclared identifier \"y\""));
        assert_eq!((err.line, err.col), (2, 7));
    }

    #[test]
    fn test_duplicated_symbol() {
        let err = parse("var x, x; x := 1.").unwrap_err();
        assert!(err.message.contains("duplicated symbol"));
    }

    #[test]
    fn test_missing_period() {
        let err = parse("var x; x := 1").unwrap_err();
        assert!(err.message.contains("expected '.'"));
        assert!(err.message.contains("end of source"));
    }

    #[test]
    fn test_missing_comparison_operator() {
        let err = parse("var x; if x then x := 1.").unwrap_err();
        assert!(err.message.contains("comparison operator"));
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("var x; x := 1. x").unwrap_err();
        assert!(err.message.contains("end of source"));
    }
}
