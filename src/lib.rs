//! A crate for assembling and executing programs for a small 32-bit teaching instruction set.
//!
//! Instructions are single 32-bit words made of a 2-bit operation class, a 5-bit category and
//! two operands, each an addressing mode and an 8-bit field. Memory and the register file are
//! two separate address spaces of cells, both eight bits wide.
//!
//! This crate provides the functionality to:
//! - Encode and decode instruction words.
//! - Assemble symbolic source into instruction words, resolving labels in two passes.
//! - Execute programs with a fetch-decode-execute emulator, including stack, subroutine and
//!   auto-increment addressing.
//! - Observe execution through events and faults.
//!
//! # Example
//! ```
//! use isa32::{
//!     assembler::assemble,
//!     emulator::{Emulator, TestIo},
//!     machine::Machine,
//!     storage::Word,
//!     symbol_table::SymbolTable,
//! };
//!
//! // Adds 10 and 20 together and prints the answer.
//! let source = r#"
//!     DEF START
//!     MOV 10 R1
//!     MOV 20 R2
//!     ADD R1 R2
//!     PRNT R1
//!     EOP
//! "#;
//!
//! let mut machine = Machine::new(Default::default()).unwrap();
//! let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);
//!
//! // Assemble into memory starting at the program counter.
//! assemble(source, &mut symbols, &mut machine).unwrap();
//!
//! let mut emulator = Emulator::new(machine, TestIo::new());
//! emulator.run().unwrap();
//!
//! assert_eq!(emulator.io.output(), &[Word::Int(30)]);
//! ```
//!
//! # Executables
//!
//! ## `isa32run`
//!
//! Built with the `isa32run` feature. Assembles a source file and executes it, reading `SCAN`
//! input from the standard input and writing `PRNT` output to the standard output.
//!
//! ```text
//! $ isa32run countdown.asm
//! 3
//! 2
//! 1
//! ```
pub mod addressing;
pub mod assembler;
pub mod emulator;
pub mod error;
pub mod event;
pub mod fault;
pub mod instruction;
pub mod machine;
pub mod parsing;
pub mod source_map;
pub mod storage;
pub mod symbol_table;
pub mod symbolic;
