/// Identity of a declared procedure, unique within one program.
///
/// The code generator keys its entry-address table by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// `index` is the variable's slot within its frame's locals.
    Variable { level: usize, index: usize },

    Constant { value: i64 },

    /// `level` is the level of the scope that declares the procedure, not the
    /// level of its body.
    Procedure { level: usize, id: ProcId },
}

/// A name bound by a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, level: usize, index: usize) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Variable { level, index },
        }
    }

    pub fn constant(name: impl Into<String>, value: i64) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Constant { value },
        }
    }

    pub fn procedure(name: impl Into<String>, level: usize, id: ProcId) -> Self {
        Symbol {
            name: name.into(),
            kind: SymbolKind::Procedure { level, id },
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable { .. })
    }

    /// Human-readable kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            SymbolKind::Variable { .. } => "variable",
            SymbolKind::Constant { .. } => "constant",
            SymbolKind::Procedure { .. } => "procedure",
        }
    }
}
