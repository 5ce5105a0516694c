//! # PL/0 Syntax Tree
//!
//! The resolved tree produced by the parser and consumed by the bytecode
//! compiler. Every name in the tree has already been bound to a
//! [`symbol::Symbol`], so code generation never looks names up.

pub mod node;
pub mod printer;
pub mod symbol;
