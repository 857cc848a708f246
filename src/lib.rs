pub mod asmgen;
pub mod ast;
pub mod error;
pub mod strings;
pub mod symbols;
