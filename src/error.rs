//! Error types shared by the parsers and the assembler.

use std::fmt::{self, Display};

use nom::error::ErrorKind;

use crate::symbol_table::SymbolError;

#[derive(Debug, Clone, PartialEq)]
enum InnerError<Kind> {
    Incomplete,
    Context(&'static str),
    Other(Kind),
    Nom(ErrorKind),
}

impl<Kind: Display> fmt::Display for InnerError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InnerError::Context(ctx) => write!(f, "invalid {}", ctx),
            InnerError::Nom(_err) => write!(f, "unexpected input"),
            InnerError::Other(kind) => fmt::Display::fmt(kind, f),
            InnerError::Incomplete => write!(f, "expected more input"),
        }
    }
}

/// Error returned by the literal parsers in [parsing](crate::parsing).
///
/// Holds a stack of reasons, innermost first, each paired with the input that was left when it
/// was raised.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError<Kind> {
    stack: Vec<(String, InnerError<Kind>)>,
}

impl<Kind> ParseError<Kind> {
    pub(crate) fn from_kind(input: &str, kind: Kind) -> ParseError<Kind> {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Other(kind))],
        }
    }

    pub(crate) fn incomplete() -> ParseError<Kind> {
        ParseError {
            stack: vec![(String::new(), InnerError::Incomplete)],
        }
    }

    /// The domain specific reason of the error, if there is one.
    pub fn kind(&self) -> Option<&Kind> {
        self.stack.iter().find_map(|(_, err)| match err {
            InnerError::Other(kind) => Some(kind),
            _ => None,
        })
    }

    /// The outermost context the error was raised in, such as `"integer"`.
    pub fn context(&self) -> Option<&'static str> {
        self.stack.iter().rev().find_map(|(_, err)| match err {
            InnerError::Context(ctx) => Some(*ctx),
            _ => None,
        })
    }
}

impl<Kind: Display> fmt::Display for ParseError<Kind> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (input, kind) = match self.stack.last() {
            Some(entry) => entry,
            None => return write!(f, "unknown error"),
        };

        let rest: String = input.lines().next().unwrap_or("").chars().take(20).collect();

        if rest.is_empty() {
            write!(f, "{}", kind)
        } else {
            write!(f, "{} at '{}'", kind, rest)
        }
    }
}

impl<Kind: fmt::Debug + Display> std::error::Error for ParseError<Kind> {}

impl<Kind> nom::error::ParseError<&str> for ParseError<Kind> {
    fn from_error_kind(input: &str, kind: ErrorKind) -> Self {
        ParseError {
            stack: vec![(input.to_string(), InnerError::Nom(kind))],
        }
    }

    fn append(input: &str, kind: ErrorKind, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Nom(kind)));
        other
    }

    fn add_context(input: &str, ctx: &'static str, mut other: Self) -> Self {
        other.stack.push((input.to_string(), InnerError::Context(ctx)));
        other
    }
}

/// Domain errors of numeric literals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LiteralError {
    /// The integer does not fit in a 32-bit word.
    OutOfRange(i64),
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LiteralError::OutOfRange(value) => {
                write!(f, "value {} does not fit in a 32-bit word", value)
            }
        }
    }
}

/// Reasons the assembler rejects a program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssemblyErrorKind {
    UndefinedSymbol(String),

    DuplicateSymbol {
        name: String,
        existing: u16,
        requested: u16,
    },

    UnknownOpcode {
        mnemonic: String,

        /// The closest known mnemonic, if any.
        suggestion: Option<&'static str>,
    },

    /// An immediate operand outside of `0..=255`.
    ImmediateOutOfRange(i64),

    /// A register or memory address that does not fit in an operand field.
    AddressOutOfRange(i64),

    OperandCount {
        mnemonic: &'static str,
        expected: &'static str,
        found: usize,
    },

    /// An operand whose form is not allowed in its position.
    InvalidOperand(String),

    /// The line could not be tokenized or structured.
    Syntax(String),

    /// The program does not fit between the origin and the end of memory.
    ProgramTooLarge {
        words: usize,
        available: usize,
    },

    /// The program counter does not hold a valid memory address.
    InvalidOrigin(i64),
}

impl From<SymbolError> for AssemblyErrorKind {
    fn from(err: SymbolError) -> AssemblyErrorKind {
        match err {
            SymbolError::UndefinedSymbol(name) => AssemblyErrorKind::UndefinedSymbol(name),
            SymbolError::DuplicateSymbol { name, existing, requested } => {
                AssemblyErrorKind::DuplicateSymbol { name, existing, requested }
            }
        }
    }
}

impl fmt::Display for AssemblyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssemblyErrorKind::UndefinedSymbol(name) => write!(f, "undefined symbol '{}'", name),
            AssemblyErrorKind::DuplicateSymbol { name, existing, requested } => write!(
                f,
                "symbol '{}' is already defined at {} (redefined at {})",
                name, existing, requested,
            ),
            AssemblyErrorKind::UnknownOpcode { mnemonic, suggestion: Some(suggestion) } => write!(
                f,
                "unknown opcode '{}', did you mean '{}'?",
                mnemonic, suggestion,
            ),
            AssemblyErrorKind::UnknownOpcode { mnemonic, suggestion: None } => {
                write!(f, "unknown opcode '{}'", mnemonic)
            }
            AssemblyErrorKind::ImmediateOutOfRange(value) => {
                write!(f, "immediate value {} is outside of 0..=255", value)
            }
            AssemblyErrorKind::AddressOutOfRange(address) => {
                write!(f, "address {} does not fit in an operand", address)
            }
            AssemblyErrorKind::OperandCount { mnemonic, expected, found } => write!(
                f,
                "{} takes {} operands, found {}",
                mnemonic, expected, found,
            ),
            AssemblyErrorKind::InvalidOperand(operand) => write!(f, "invalid operand {}", operand),
            AssemblyErrorKind::Syntax(message) => write!(f, "syntax error: {}", message),
            AssemblyErrorKind::ProgramTooLarge { words, available } => write!(
                f,
                "program of {} words does not fit in the {} words after the origin",
                words, available,
            ),
            AssemblyErrorKind::InvalidOrigin(origin) => write!(f, "invalid origin {}", origin),
        }
    }
}

/// An assembly error and the source line it was found on. Lines are numbered from 1; line 0
/// means the error concerns the whole program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssemblyError {
    pub line: usize,
    pub kind: AssemblyErrorKind,
}

impl AssemblyError {
    pub fn new(line: usize, kind: AssemblyErrorKind) -> AssemblyError {
        AssemblyError { line, kind }
    }
}

impl fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "line {}: {}", self.line, self.kind)
        }
    }
}

impl std::error::Error for AssemblyError {}

#[test]
fn test_assembly_error_display() {
    let err = AssemblyError::new(
        3,
        AssemblyErrorKind::UnknownOpcode {
            mnemonic: "MOVE".to_string(),
            suggestion: Some("MOV"),
        },
    );

    assert_eq!(err.to_string(), "line 3: unknown opcode 'MOVE', did you mean 'MOV'?");

    let err = AssemblyError::new(0, AssemblyErrorKind::InvalidOrigin(-4));
    assert_eq!(err.to_string(), "invalid origin -4");
}
