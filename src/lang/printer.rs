use super::node::{Block, Expr, ProcedureDecl, Stmt};
use super::symbol::{Symbol, SymbolKind};

/// Renders a resolved tree as indented text, one node per line.
pub struct TreePrinter {
    out: String,
    depth: usize,
}

impl TreePrinter {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    pub fn print(mut self, program: &Block) -> String {
        self.block(program);
        self.out
    }

    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.depth += 1;
        f(self);
        self.depth -= 1;
    }

    fn block(&mut self, block: &Block) {
        self.line(format!(
            "block (level {}, {} variables)",
            block.level, block.variable_count
        ));
        self.nested(|p| {
            if !block.constants.is_empty() {
                p.line(format!("constants [ {} ]", symbol_list(&block.constants)));
            }
            if !block.variables.is_empty() {
                p.line(format!("variables [ {} ]", symbol_list(&block.variables)));
            }
            for procedure in &block.procedures {
                p.procedure(procedure);
            }
            p.stmt(&block.body);
        });
    }

    fn procedure(&mut self, decl: &ProcedureDecl) {
        self.line(format!("procedure {}", decl.symbol.name));
        self.nested(|p| p.block(&decl.block));
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Assign { target, value, .. } => {
                self.line(format!("assign {}", target.name));
                self.nested(|p| p.expr(value));
            }
            Stmt::Read { targets } => {
                let names: Vec<&str> = targets.iter().map(|(s, _)| s.name.as_str()).collect();
                self.line(format!("read {}", names.join(", ")));
            }
            Stmt::Write { values } => {
                self.line("write");
                self.nested(|p| values.iter().for_each(|v| p.expr(v)));
            }
            Stmt::Call { callee, .. } => self.line(format!("call {}", callee.name)),
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.line("if");
                self.nested(|p| {
                    p.line("condition");
                    p.nested(|p| p.expr(condition));
                    p.line("then");
                    p.nested(|p| p.stmt(then_branch));
                    if let Some(alt) = else_branch {
                        p.line("else");
                        p.nested(|p| p.stmt(alt));
                    }
                });
            }
            Stmt::While { condition, body } => {
                self.line("while");
                self.nested(|p| {
                    p.line("condition");
                    p.nested(|p| p.expr(condition));
                    p.line("body");
                    p.nested(|p| p.stmt(body));
                });
            }
            Stmt::Sequence(stmts) => {
                self.line("begin");
                self.nested(|p| stmts.iter().for_each(|s| p.stmt(s)));
                self.line("end");
            }
            Stmt::Return => self.line("return"),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Binary { op, lhs, rhs, .. } => {
                self.line(format!("binary {}", op));
                self.nested(|p| {
                    p.expr(lhs);
                    p.expr(rhs);
                });
            }
            Expr::Unary { op, operand, .. } => {
                self.line(format!("unary {}", op));
                self.nested(|p| p.expr(operand));
            }
            Expr::Literal(n) => self.line(format!("literal {}", n)),
            Expr::Variable { symbol, .. } => match symbol.kind {
                SymbolKind::Variable { level, index } => {
                    self.line(format!("variable {} (level {}, slot {})", symbol.name, level, index))
                }
                SymbolKind::Constant { value } => {
                    self.line(format!("constant {} = {}", symbol.name, value))
                }
                SymbolKind::Procedure { .. } => self.line(format!("procedure {}", symbol.name)),
            },
        }
    }
}

fn symbol_list(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Span;
    use crate::frontend::token::Token;

    #[test]
    fn test_print_nested_tree() {
        let x = Symbol::variable("x", 0, 0);
        let program = Block {
            level: 0,
            variable_count: 1,
            constants: vec![Symbol::constant("ten", 10)],
            variables: vec![x.clone()],
            procedures: vec![],
            body: Stmt::Sequence(vec![
                Stmt::Assign {
                    target: x.clone(),
                    value: Expr::Binary {
                        op: Token::Plus,
                        lhs: Box::new(Expr::Literal(1)),
                        rhs: Box::new(Expr::Literal(2)),
                        span: Span::default(),
                    },
                    span: Span::default(),
                },
                Stmt::Write {
                    values: vec![Expr::Variable {
                        symbol: x,
                        span: Span::default(),
                    }],
                },
            ]),
        };

        let text = TreePrinter::new().print(&program);
        let expected = "\
block (level 0, 1 variables)
  constants [ ten ]
  variables [ x ]
  begin
    assign x
      binary +
        literal 1
        literal 2
    write
      variable x (level 0, slot 0)
  end
";
        assert_eq!(text, expected);
    }
}
