use crate::bytecode::op::{Instruction, Opcode};
use serde::{Deserialize, Serialize};

/// A compiled program: one flat, append-only instruction stream.
///
/// Procedure entry points and jump targets are indices into `code`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    pub code: Vec<Instruction>,
}

impl Bytecode {
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.code.get(index)
    }

    /// Encodes the program as a compact binary image.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Decodes a program written by [`Bytecode::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Indices of branch and call instructions whose target lies outside the
    /// stream.
    pub fn dangling_targets(&self) -> Vec<usize> {
        self.code
            .iter()
            .enumerate()
            .filter(|(_, ins)| ins.opcode.is_branch())
            .filter(|(_, ins)| ins.address < 0 || ins.address as usize >= self.code.len())
            .map(|(ip, _)| ip)
            .collect()
    }

    pub fn count(&self, opcode: Opcode) -> usize {
        self.code.iter().filter(|i| i.opcode == opcode).count()
    }
}

/// Handle to one emitted instruction whose operands are not final yet.
///
/// A `Backpatcher` is an index into the stream, never a reference, so the
/// stream may keep growing while patches are outstanding. It is consumed by
/// the assembler when resolved and cannot be copied, so each patch is
/// applied at most once.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "an unresolved backpatch leaves a placeholder operand in the bytecode"]
pub struct Backpatcher {
    pub(crate) pos: usize,
}

impl Backpatcher {
    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_round_trip() {
        let bc = Bytecode {
            code: vec![
                Instruction::new(Opcode::Enter, 0, 4),
                Instruction::new(Opcode::LoadConst, 0, -17),
                Instruction::new(Opcode::StoreVar, 0, 0),
                Instruction::new(Opcode::Operate, 0, 0),
            ],
        };

        let bytes = bc.to_bytes().unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(Bytecode::from_bytes(&bytes).unwrap(), bc);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(Bytecode::from_bytes(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn test_dangling_targets() {
        let bc = Bytecode {
            code: vec![
                Instruction::new(Opcode::Jump, 0, 2),
                Instruction::new(Opcode::JumpIfFalse, 0, 3),
                Instruction::new(Opcode::Call, 0, -1),
                Instruction::new(Opcode::LoadConst, 0, 99),
            ],
        };

        assert_eq!(bc.dangling_targets(), vec![2]);
    }
}
