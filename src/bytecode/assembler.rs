use crate::bytecode::ir::{Backpatcher, Bytecode};
use crate::bytecode::op::{Instruction, Opcode, Operator};

/// Operand value for fields an instruction does not use, and the
/// placeholder written into operands that will be backpatched.
const UNUSED: i64 = 0;

/// Frame slots reserved for the return address and the static and dynamic
/// links. `ENTER` operands count them; the VM allocates only the rest.
pub const RESERVED_SLOTS: usize = 3;

/// Emits instructions into a growing [`Bytecode`] stream.
///
/// Forward references are emitted with placeholder operands and a
/// [`Backpatcher`] is handed back; the assembler tracks how many are still
/// outstanding so the compiler can prove every one was resolved.
pub struct Assembler {
    code: Bytecode,
    outstanding: usize,
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            code: Bytecode::new(),
            outstanding: 0,
        }
    }

    fn emit(&mut self, opcode: Opcode, level: i64, address: i64) {
        self.code.code.push(Instruction::new(opcode, level, address));
    }

    fn emit_patchable(&mut self, opcode: Opcode, level: i64) -> Backpatcher {
        self.emit(opcode, level, UNUSED);
        self.outstanding += 1;
        Backpatcher {
            pos: self.code.len() - 1,
        }
    }

    /// Index the next emitted instruction will occupy.
    pub fn next_address(&self) -> usize {
        self.code.len()
    }

    pub fn load_const(&mut self, value: i64) {
        self.emit(Opcode::LoadConst, UNUSED, value);
    }

    pub fn load_var(&mut self, distance: usize, index: usize) {
        self.emit(Opcode::LoadVar, distance as i64, index as i64);
    }

    pub fn store_var(&mut self, distance: usize, index: usize) {
        self.emit(Opcode::StoreVar, distance as i64, index as i64);
    }

    /// Emits a `CALL` whose level operand is provisionally the caller's
    /// absolute level and whose target is unknown.
    pub fn call(&mut self, caller_level: usize) -> Backpatcher {
        self.emit_patchable(Opcode::Call, caller_level as i64)
    }

    /// Backward jump to an already known address.
    pub fn branch_to(&mut self, target: usize) {
        self.emit(Opcode::Jump, UNUSED, target as i64);
    }

    pub fn branch(&mut self) -> Backpatcher {
        self.emit_patchable(Opcode::Jump, UNUSED)
    }

    pub fn branch_if_false(&mut self) -> Backpatcher {
        self.emit_patchable(Opcode::JumpIfFalse, UNUSED)
    }

    pub fn enter(&mut self, variable_count: usize) {
        self.emit(
            Opcode::Enter,
            UNUSED,
            (variable_count + RESERVED_SLOTS) as i64,
        );
    }

    pub fn leave(&mut self) {
        self.operate(Operator::Return);
    }

    pub fn read(&mut self) {
        self.operate(Operator::Read);
    }

    pub fn write(&mut self) {
        self.operate(Operator::Write);
    }

    pub fn operate(&mut self, op: Operator) {
        self.emit(Opcode::Operate, UNUSED, op.code());
    }

    /// Points a forward branch at the next instruction to be emitted.
    pub fn patch_here(&mut self, patch: Backpatcher) {
        let here = self.next_address();
        self.patch_address(patch, here);
    }

    pub fn patch_address(&mut self, patch: Backpatcher, address: usize) {
        self.code.code[patch.pos].address = address as i64;
        self.outstanding -= 1;
    }

    /// Resolves a call: both the static-link distance and the entry point.
    pub fn patch_call(&mut self, patch: Backpatcher, distance: usize, entry: usize) {
        self.code.code[patch.pos].level = distance as i64;
        self.patch_address(patch, entry);
    }

    /// The provisional level operand written by [`Assembler::call`].
    pub fn provisional_level(&self, patch: &Backpatcher) -> i64 {
        self.code.code[patch.pos].level
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn code(&self) -> &Bytecode {
        &self.code
    }

    pub fn finish(self) -> Bytecode {
        self.code
    }
}
