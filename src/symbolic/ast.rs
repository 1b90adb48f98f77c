//! Syntax tree of a single assembly source line.

use std::fmt;

use itertools::Itertools;

use crate::instruction::OpCode;

/// A number or a name used as an address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Number(i64),
    Name(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Name(name) => write!(f, "{}", name),
        }
    }
}

/// An operand as written in the source.
///
/// Bare names are classified by the assembler against the symbol table. Registers become
/// register operands except `A1`..`A4`, which are indexed. Memory symbols and labels become
/// direct operands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    /// `NAME`
    Name(String),

    /// `#5` or `5`
    Immediate(i64),

    /// `*R1`
    Deref(String),

    /// `[M1]` or `[200]`
    Indirect(Value),

    /// `@M1` or `@200`
    Direct(Value),

    /// `I1+`
    PostIncrement(String),

    /// `-I1`
    PreDecrement(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Name(name) => write!(f, "{}", name),
            Operand::Immediate(value) => write!(f, "#{}", value),
            Operand::Deref(name) => write!(f, "*{}", name),
            Operand::Indirect(value) => write!(f, "[{}]", value),
            Operand::Direct(value) => write!(f, "@{}", value),
            Operand::PostIncrement(name) => write!(f, "{}+", name),
            Operand::PreDecrement(name) => write!(f, "-{}", name),
        }
    }
}

/// An instruction before encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statement {
    pub opcode: OpCode,
    pub operands: Vec<Operand>,
}

impl Statement {
    pub fn new(opcode: OpCode, operands: Vec<Operand>) -> Statement {
        Statement { opcode, operands }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "{}", self.opcode)
        } else {
            write!(f, "{} {}", self.opcode, self.operands.iter().join(" "))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// `DEF name` or `DEB name`. Binds `name` to the address of the next instruction.
    Label(String),

    Statement(Statement),
}

/// A non-empty source line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Line number in the source, starting from 1.
    pub number: usize,
    pub kind: LineKind,
}
