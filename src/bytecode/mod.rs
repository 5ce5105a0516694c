pub mod assembler;
pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod ir;
pub mod op;

pub use ir::{Backpatcher, Bytecode};
pub use op::{Instruction, Opcode, Operator};
