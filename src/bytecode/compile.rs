use std::collections::HashMap;

use log::{debug, trace};

use crate::{
    bytecode::{
        Bytecode,
        assembler::Assembler,
        compile_error::CompileError,
        ir::Backpatcher,
        op::Operator,
    },
    frontend::lexer::Span,
    lang::{
        node::{Block, Expr, Stmt},
        symbol::{ProcId, Symbol, SymbolKind},
    },
};

/// A `CALL` emitted before its callee's entry point was known.
struct PendingCall {
    patch: Backpatcher,
    callee: ProcId,
    callee_level: usize,
    name: String,
}

/// Single-pass code generator from a resolved tree to a flat instruction
/// stream.
///
/// Structured control flow is patched as soon as the jump target is emitted.
/// Calls are patched in [`Compiler::finalize`], once every procedure body has
/// been emitted and its entry address recorded: a procedure's body is always
/// laid out after the code of the block that calls it.
pub struct Compiler {
    asm: Assembler,

    /// Entry address of each procedure whose body has been emitted
    entry_points: HashMap<ProcId, usize>,

    /// Calls waiting for their callee's entry address
    pending_calls: Vec<PendingCall>,

    /// Lexical level of the block being emitted
    level: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            asm: Assembler::new(),
            entry_points: HashMap::new(),
            pending_calls: Vec::new(),
            level: 0,
        }
    }

    /// Compiles the program block and resolves every call.
    ///
    /// On error no bytecode is returned.
    pub fn compile_program(mut self, program: &Block) -> Result<Bytecode, CompileError> {
        self.emit_block(program)?;
        self.finalize()?;

        if self.asm.outstanding() != 0 {
            return Err(CompileError::internal(format!(
                "{} backpatch(es) left unresolved",
                self.asm.outstanding()
            )));
        }

        let code = self.asm.finish();
        debug!("generated {} instructions", code.len());
        Ok(code)
    }

    /// Entry address recorded for a procedure, once its body has been emitted.
    pub fn entry_point(&self, id: ProcId) -> Option<usize> {
        self.entry_points.get(&id).copied()
    }

    /// Emits `ENTER`, the block body and its `RET`, then the body of each
    /// nested procedure, recording each one's entry address first.
    pub fn emit_block(&mut self, block: &Block) -> Result<(), CompileError> {
        let enclosing = self.level;
        self.level = block.level;
        debug!(
            "emitting block at level {} with {} variables at {}",
            block.level,
            block.variable_count,
            self.asm.next_address()
        );

        self.asm.enter(block.variable_count);
        self.emit_stmt(&block.body)?;
        self.asm.leave();

        for procedure in &block.procedures {
            let id = match procedure.symbol.kind {
                SymbolKind::Procedure { id, .. } => id,
                _ => {
                    return Err(CompileError::internal(format!(
                        "declaration of '{}' is not bound to a procedure symbol",
                        procedure.symbol.name
                    )));
                }
            };
            let entry = self.asm.next_address();
            debug!("procedure '{}' entry at {}", procedure.symbol.name, entry);
            self.entry_points.insert(id, entry);
            self.emit_block(&procedure.block)?;
        }

        self.level = enclosing;
        Ok(())
    }

    /// Emits a `CALL` from `caller_level` with a placeholder target and queues
    /// it for [`Compiler::finalize`].
    pub fn emit_call(
        &mut self,
        callee: &Symbol,
        caller_level: usize,
        span: Span,
    ) -> Result<(), CompileError> {
        let (callee_level, id) = match callee.kind {
            SymbolKind::Procedure { level, id } => (level, id),
            _ => return Err(CompileError::not_callable(callee, span)),
        };

        let patch = self.asm.call(caller_level);
        trace!("call to '{}' at {} pending", callee.name, patch.position());
        self.pending_calls.push(PendingCall {
            patch,
            callee: id,
            callee_level,
            name: callee.name.clone(),
        });
        Ok(())
    }

    /// Resolves every pending call: the level operand becomes the number of
    /// static links to follow and the address the callee's entry point.
    ///
    /// Drains the pending list, so calling it again does nothing.
    pub fn finalize(&mut self) -> Result<(), CompileError> {
        for pending in std::mem::take(&mut self.pending_calls) {
            let entry = self.entry_point(pending.callee).ok_or_else(|| {
                CompileError::internal(format!(
                    "procedure '{}' has no entry address",
                    pending.name
                ))
            })?;

            let caller_level = self.asm.provisional_level(&pending.patch);
            let distance = caller_level - pending.callee_level as i64;
            if distance < 0 {
                return Err(CompileError::internal(format!(
                    "call to '{}' from level {} cannot reach its declaring level {}",
                    pending.name, caller_level, pending.callee_level
                )));
            }

            debug!(
                "patched call at {} to '{}': distance {}, entry {}",
                pending.patch.position(),
                pending.name,
                distance,
                entry
            );
            self.asm.patch_call(pending.patch, distance as usize, entry);
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Assign {
                target,
                value,
                span,
            } => {
                self.emit_expr(value)?;
                self.emit_store(target, *span)?;
            }

            Stmt::Read { targets } => {
                for (target, span) in targets {
                    self.asm.read();
                    self.emit_store(target, *span)?;
                }
            }

            Stmt::Write { values } => {
                for value in values {
                    self.emit_expr(value)?;
                    self.asm.write();
                }
            }

            Stmt::Call { callee, span } => {
                self.emit_call(callee, self.level, *span)?;
            }

            // condition; JUMP_IF_FALSE else; then; JUMP end; else: alt; end:
            Stmt::If {
                condition,
                then_branch,
                else_branch: Some(alt),
            } => {
                self.emit_expr(condition)?;
                let goto_else = self.asm.branch_if_false();
                self.emit_stmt(then_branch)?;
                let goto_end = self.asm.branch();
                self.asm.patch_here(goto_else);
                self.emit_stmt(alt)?;
                self.asm.patch_here(goto_end);
            }

            // condition; JUMP_IF_FALSE end; then; end:
            Stmt::If {
                condition,
                then_branch,
                else_branch: None,
            } => {
                self.emit_expr(condition)?;
                let goto_end = self.asm.branch_if_false();
                self.emit_stmt(then_branch)?;
                self.asm.patch_here(goto_end);
            }

            // begin: condition; JUMP_IF_FALSE end; body; JUMP begin; end:
            Stmt::While { condition, body } => {
                let begin = self.asm.next_address();
                self.emit_expr(condition)?;
                let goto_end = self.asm.branch_if_false();
                self.emit_stmt(body)?;
                self.asm.branch_to(begin);
                self.asm.patch_here(goto_end);
            }

            Stmt::Sequence(stmts) => {
                for stmt in stmts {
                    self.emit_stmt(stmt)?;
                }
            }

            Stmt::Return => self.asm.leave(),
        }

        Ok(())
    }

    /// Post-order: operands first, so the VM sees them left to right.
    fn emit_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::Binary { op, lhs, rhs, span } => {
                let operator = Operator::from_binary_token(op)
                    .ok_or_else(|| CompileError::invalid_operator(op, *span))?;
                self.emit_expr(lhs)?;
                self.emit_expr(rhs)?;
                self.asm.operate(operator);
            }
            Expr::Unary { op, operand, span } => {
                let operator = Operator::from_unary_token(op)
                    .ok_or_else(|| CompileError::invalid_operator(op, *span))?;
                self.emit_expr(operand)?;
                self.asm.operate(operator);
            }
            Expr::Literal(value) => self.asm.load_const(*value),
            Expr::Variable { symbol, span } => self.emit_load(symbol, *span)?,
        }
        Ok(())
    }

    fn emit_load(&mut self, symbol: &Symbol, span: Span) -> Result<(), CompileError> {
        match symbol.kind {
            SymbolKind::Variable { level, index } => {
                let distance = self.distance_to(level, symbol)?;
                self.asm.load_var(distance, index);
                Ok(())
            }
            SymbolKind::Constant { value } => {
                self.asm.load_const(value);
                Ok(())
            }
            SymbolKind::Procedure { .. } => Err(CompileError::not_a_value(symbol, span)),
        }
    }

    fn emit_store(&mut self, symbol: &Symbol, span: Span) -> Result<(), CompileError> {
        match symbol.kind {
            SymbolKind::Variable { level, index } => {
                let distance = self.distance_to(level, symbol)?;
                self.asm.store_var(distance, index);
                Ok(())
            }
            SymbolKind::Constant { .. } | SymbolKind::Procedure { .. } => {
                Err(CompileError::not_assignable(symbol, span))
            }
        }
    }

    /// Static links between the current block and the one declaring `symbol`.
    fn distance_to(&self, declared_level: usize, symbol: &Symbol) -> Result<usize, CompileError> {
        self.level.checked_sub(declared_level).ok_or_else(|| {
            CompileError::internal(format!(
                "'{}' declared at level {} is not visible from level {}",
                symbol.name, declared_level, self.level
            ))
        })
    }
}
