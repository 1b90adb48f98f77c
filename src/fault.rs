//! Execution-time faults.
//!
//! Every fault stops the machine. Side effects committed before the fault, such as an
//! auto-increment or a stack pointer change, are kept.

use std::fmt;

use crate::instruction::DecodeError;
use crate::machine::AddressSpace;

/// What went wrong.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// The fetched word does not name an opcode.
    UnknownOpcode {
        class: u8,
        category: u8,
    },

    /// A stack operand names no stack operation.
    InvalidStackSelector(u8),

    /// The fetched cell does not hold a 32-bit instruction word.
    MalformedWord(i64),

    /// An instruction tried to write to an immediate operand.
    ImmediateNotWritable,

    DivisionByZero,

    /// A value was popped or read from an empty stack.
    StackUnderflow,

    /// A push would move the top of the stack past the stack region.
    StackOverflow,

    /// An address outside of the configured register file or memory.
    InvalidAddress {
        space: AddressSpace,
        address: i64,
    },

    /// An encoded decimal was used where an integer is required.
    NonIntegerOperand,
}

impl FaultKind {
    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }

    /// Short identifier of the fault kind.
    pub fn name(&self) -> &'static str {
        match self {
            FaultKind::UnknownOpcode { .. } => "UnknownOpcode",
            FaultKind::InvalidStackSelector(_) => "InvalidStackSelector",
            FaultKind::MalformedWord(_) => "MalformedWord",
            FaultKind::ImmediateNotWritable => "ImmediateNotWritable",
            FaultKind::DivisionByZero => "DivisionByZero",
            FaultKind::StackUnderflow => "StackUnderflow",
            FaultKind::StackOverflow => "StackOverflow",
            FaultKind::InvalidAddress { .. } => "InvalidAddress",
            FaultKind::NonIntegerOperand => "NonIntegerOperand",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FaultKind::UnknownOpcode { class, category } => write!(
                f,
                "unknown opcode (class {:02b}, category {:05b})",
                class, category,
            ),
            FaultKind::InvalidStackSelector(selector) => {
                write!(f, "invalid stack selector {}", selector)
            }
            FaultKind::MalformedWord(value) => {
                write!(f, "cell holds {} which is not an instruction word", value)
            }
            FaultKind::ImmediateNotWritable => write!(f, "cannot write to an immediate operand"),
            FaultKind::DivisionByZero => write!(f, "division by zero"),
            FaultKind::StackUnderflow => write!(f, "stack underflow"),
            FaultKind::StackOverflow => write!(f, "stack overflow"),
            FaultKind::InvalidAddress { space, address } => {
                write!(f, "invalid {} address {}", space, address)
            }
            FaultKind::NonIntegerOperand => write!(f, "operand is not an integer"),
        }
    }
}

impl From<DecodeError> for FaultKind {
    fn from(err: DecodeError) -> FaultKind {
        match err {
            DecodeError::UnknownOpcode { class, category } => {
                FaultKind::UnknownOpcode { class, category }
            }
            DecodeError::InvalidStackSelector(selector) => FaultKind::InvalidStackSelector(selector),
        }
    }
}

/// Pipeline stage during which a fault was raised.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    /// Instruction decoding and operand resolution.
    Decode,
    Dispatch,
    Writeback,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stage::Fetch => write!(f, "fetch"),
            Stage::Decode => write!(f, "decode"),
            Stage::Dispatch => write!(f, "dispatch"),
            Stage::Writeback => write!(f, "writeback"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Execution may continue after the fault is reported. No fault kind is currently
    /// recoverable.
    Recoverable,

    /// Execution stops.
    Fatal,
}

/// A fault together with where it happened.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub stage: Stage,

    /// Address of the faulting instruction, if the program counter held a valid address.
    pub address: Option<u16>,
}

impl Fault {
    pub fn new(kind: FaultKind, stage: Stage, address: Option<u16>) -> Fault {
        Fault { kind, stage, address }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {} during {}", self.kind.name(), self.kind, self.stage)?;

        if let Some(address) = self.address {
            write!(f, " at address {}", address)?;
        }

        Ok(())
    }
}

impl std::error::Error for Fault {}

/// Result of a successfully executed instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The machine is ready to execute the next instruction.
    Continue,

    /// The machine executed `EOP` or was already halted.
    Halted,
}

#[test]
fn test_fault_display() {
    let fault = Fault::new(FaultKind::DivisionByZero, Stage::Dispatch, Some(2));
    assert_eq!(fault.to_string(), "DivisionByZero: division by zero during dispatch at address 2");

    let fault = Fault::new(
        FaultKind::InvalidAddress { space: AddressSpace::Memory, address: 300 },
        Stage::Fetch,
        None,
    );
    assert_eq!(fault.to_string(), "InvalidAddress: invalid memory address 300 during fetch");
    assert_eq!(fault.severity(), Severity::Fatal);
}

#[test]
fn test_decode_error_conversion() {
    assert_eq!(
        FaultKind::from(DecodeError::InvalidStackSelector(9)),
        FaultKind::InvalidStackSelector(9),
    );
}
