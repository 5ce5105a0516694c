pub mod bytecode;
pub mod driver;
pub mod frontend;
pub mod lang;
pub mod runtime;
