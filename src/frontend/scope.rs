use std::collections::HashMap;

use crate::lang::symbol::{ProcId, Symbol};

struct Scope {
    members: HashMap<String, Symbol>,
    variable_count: usize,
}

/// Chain of lexical scopes open during parsing.
///
/// The innermost scope is the last element; its index is its lexical level.
pub struct ScopeChain {
    scopes: Vec<Scope>,
    next_proc: usize,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            next_proc: 0,
        }
    }

    pub fn enter(&mut self) {
        self.scopes.push(Scope {
            members: HashMap::new(),
            variable_count: 0,
        });
    }

    /// Closes the innermost scope, returning its variable count.
    pub fn leave(&mut self) -> usize {
        self.scopes.pop().map(|s| s.variable_count).unwrap_or(0)
    }

    /// Lexical level of the innermost scope.
    pub fn level(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    pub fn variable_count(&self) -> usize {
        self.scopes.last().map(|s| s.variable_count).unwrap_or(0)
    }

    pub fn define_variable(&mut self, name: &str) -> Result<Symbol, String> {
        let symbol = Symbol::variable(name, self.level(), self.variable_count());
        self.define(symbol)
    }

    pub fn define_constant(&mut self, name: &str, value: i64) -> Result<Symbol, String> {
        self.define(Symbol::constant(name, value))
    }

    pub fn define_procedure(&mut self, name: &str) -> Result<Symbol, String> {
        let id = ProcId(self.next_proc);
        self.next_proc += 1;
        self.define(Symbol::procedure(name, self.level(), id))
    }

    fn define(&mut self, symbol: Symbol) -> Result<Symbol, String> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| "no open scope".to_string())?;

        if scope.members.contains_key(&symbol.name) {
            return Err(format!("duplicated symbol \"{}\"", symbol.name));
        }
        if symbol.is_variable() {
            scope.variable_count += 1;
        }
        scope.members.insert(symbol.name.clone(), symbol.clone());
        Ok(symbol)
    }

    /// Finds `name` in the innermost scope that declares it.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.members.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::symbol::SymbolKind;

    #[test]
    fn test_variable_slots_are_contiguous() {
        let mut chain = ScopeChain::new();
        chain.enter();
        let a = chain.define_variable("a").unwrap();
        chain.define_constant("k", 7).unwrap();
        let b = chain.define_variable("b").unwrap();

        assert_eq!(a.kind, SymbolKind::Variable { level: 0, index: 0 });
        assert_eq!(b.kind, SymbolKind::Variable { level: 0, index: 1 });
        assert_eq!(chain.variable_count(), 2);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut chain = ScopeChain::new();
        chain.enter();
        chain.define_variable("x").unwrap();
        let err = chain.define_constant("x", 1).unwrap_err();
        assert!(err.contains("duplicated symbol"));
    }

    #[test]
    fn test_resolve_walks_outward_and_shadows() {
        let mut chain = ScopeChain::new();
        chain.enter();
        chain.define_variable("x").unwrap();
        chain.define_variable("y").unwrap();
        chain.enter();
        chain.define_variable("x").unwrap();

        assert_eq!(chain.level(), 1);
        assert_eq!(
            chain.resolve("x").unwrap().kind,
            SymbolKind::Variable { level: 1, index: 0 }
        );
        assert_eq!(
            chain.resolve("y").unwrap().kind,
            SymbolKind::Variable { level: 0, index: 1 }
        );
        assert!(chain.resolve("z").is_none());

        assert_eq!(chain.leave(), 1);
        assert_eq!(
            chain.resolve("x").unwrap().kind,
            SymbolKind::Variable { level: 0, index: 0 }
        );
    }

    #[test]
    fn test_procedures_get_distinct_ids() {
        let mut chain = ScopeChain::new();
        chain.enter();
        let p = chain.define_procedure("p").unwrap();
        chain.enter();
        let q = chain.define_procedure("q").unwrap();

        match (p.kind, q.kind) {
            (
                SymbolKind::Procedure { level: lp, id: ip },
                SymbolKind::Procedure { level: lq, id: iq },
            ) => {
                assert_eq!((lp, lq), (0, 1));
                assert_ne!(ip, iq);
            }
            other => panic!("expected procedures, got {:?}", other),
        }
    }
}
