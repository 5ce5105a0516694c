use serde::{Deserialize, Serialize};

use crate::frontend::token::Token;

// =============================================================================
// OPCODE - Instruction kinds
// =============================================================================

/// What an instruction does. The meaning of the `level` and `address`
/// operands depends on the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Push `address` as a value.
    LoadConst,
    /// Push local `address` of the frame `level` static links away.
    LoadVar,
    /// Pop into local `address` of the frame `level` static links away.
    StoreVar,
    /// Call the procedure at `address`; its static link is the frame `level`
    /// static links away from the caller.
    Call,
    /// Reserve the current frame; `address` is the frame size including the
    /// three bookkeeping slots.
    Enter,
    /// Unconditional jump to `address`.
    Jump,
    /// Pop; jump to `address` if the value is zero.
    JumpIfFalse,
    /// Operator `address` (see [`Operator`]).
    Operate,
}

impl Opcode {
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::LoadConst => "LOAD_CONST",
            Opcode::LoadVar => "LOAD_VAR",
            Opcode::StoreVar => "STORE_VAR",
            Opcode::Call => "CALL",
            Opcode::Enter => "ENTER",
            Opcode::Jump => "JUMP",
            Opcode::JumpIfFalse => "JUMP_IF_FALSE",
            Opcode::Operate => "OPERATE",
        }
    }

    /// True for opcodes whose `address` is an instruction index.
    pub fn is_branch(&self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIfFalse | Opcode::Call)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// OPERATOR - OPERATE operand ids
// =============================================================================

/// Operators carried in the `address` operand of an `OPERATE` instruction.
///
/// The numeric ids are part of the bytecode format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i64)]
pub enum Operator {
    Return = 0,
    Sub = 1,
    Add = 2,
    Div = 3,
    Mul = 4,
    Lt = 5,
    Le = 6,
    Gt = 7,
    Ge = 8,
    Eq = 9,
    Ne = 10,
    Odd = 11,
    Write = 14,
    Read = 16,
}

impl Operator {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Operator> {
        use Operator::*;
        Some(match code {
            0 => Return,
            1 => Sub,
            2 => Add,
            3 => Div,
            4 => Mul,
            5 => Lt,
            6 => Le,
            7 => Gt,
            8 => Ge,
            9 => Eq,
            10 => Ne,
            11 => Odd,
            14 => Write,
            16 => Read,
            _ => return None,
        })
    }

    /// Two-operand operator for a token between two expressions.
    pub fn from_binary_token(token: &Token) -> Option<Operator> {
        Some(match token {
            Token::Plus => Operator::Add,
            Token::Minus => Operator::Sub,
            Token::Star => Operator::Mul,
            Token::Slash => Operator::Div,
            Token::Eq => Operator::Eq,
            Token::NotEq => Operator::Ne,
            Token::Lt => Operator::Lt,
            Token::LtEq => Operator::Le,
            Token::Gt => Operator::Gt,
            Token::GtEq => Operator::Ge,
            _ => return None,
        })
    }

    /// One-operand operator for a token in prefix position. Only `odd` is one.
    pub fn from_unary_token(token: &Token) -> Option<Operator> {
        match token {
            Token::Odd => Some(Operator::Odd),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Return => "RET",
            Operator::Sub => "SUB",
            Operator::Add => "ADD",
            Operator::Div => "DIV",
            Operator::Mul => "MUL",
            Operator::Lt => "LT",
            Operator::Le => "LE",
            Operator::Gt => "GT",
            Operator::Ge => "GE",
            Operator::Eq => "EQ",
            Operator::Ne => "NE",
            Operator::Odd => "ODD",
            Operator::Write => "WRITE",
            Operator::Read => "READ",
        }
    }
}

// =============================================================================
// INSTRUCTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub level: i64,
    pub address: i64,
}

impl Instruction {
    pub fn new(opcode: Opcode, level: i64, address: i64) -> Self {
        Self {
            opcode,
            level,
            address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_codes_round_trip() {
        for op in [
            Operator::Return,
            Operator::Sub,
            Operator::Add,
            Operator::Div,
            Operator::Mul,
            Operator::Lt,
            Operator::Le,
            Operator::Gt,
            Operator::Ge,
            Operator::Eq,
            Operator::Ne,
            Operator::Odd,
            Operator::Write,
            Operator::Read,
        ] {
            assert_eq!(Operator::from_code(op.code()), Some(op));
        }
    }

    #[test]
    fn test_wire_ids() {
        assert_eq!(Operator::Return.code(), 0);
        assert_eq!(Operator::Odd.code(), 11);
        assert_eq!(Operator::Write.code(), 14);
        assert_eq!(Operator::Read.code(), 16);
        assert_eq!(Operator::from_code(12), None);
        assert_eq!(Operator::from_code(-1), None);
    }

    #[test]
    fn test_operator_from_binary_token() {
        assert_eq!(Operator::from_binary_token(&Token::Plus), Some(Operator::Add));
        assert_eq!(Operator::from_binary_token(&Token::NotEq), Some(Operator::Ne));
        assert_eq!(Operator::from_binary_token(&Token::Odd), None);
        assert_eq!(Operator::from_binary_token(&Token::Assign), None);
        assert_eq!(Operator::from_binary_token(&Token::Begin), None);
    }

    #[test]
    fn test_operator_from_unary_token() {
        assert_eq!(Operator::from_unary_token(&Token::Odd), Some(Operator::Odd));
        assert_eq!(Operator::from_unary_token(&Token::Minus), None);
        assert_eq!(Operator::from_unary_token(&Token::Plus), None);
        assert_eq!(Operator::from_unary_token(&Token::Write), None);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::LoadConst.name(), "LOAD_CONST");
        assert_eq!(Opcode::JumpIfFalse.to_string(), "JUMP_IF_FALSE");
        assert!(Opcode::Call.is_branch());
        assert!(!Opcode::Enter.is_branch());
    }
}
