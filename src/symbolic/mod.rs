//! Parsing assembly source into programs.

pub mod ast;
pub mod parser;
pub mod program;
pub mod token;

pub use self::program::Program;
