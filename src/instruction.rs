//! Types for representing instructions and their parts, and the 32-bit word format.
//!
//! An instruction word is laid out as follows (most significant bit first):
//!
//! ```text
//! class(2) | category(5) | mode1(3) | operand1(8) | mode2(3) | operand2(8) | reserved(3)
//! ```
//!
//! The `class` and `category` fields together identify the [OpCode]. Both the assembler and the
//! emulator go through [OpCode::class], [OpCode::category] and [OpCode::from_parts], so there is
//! exactly one table describing the mapping.

use std::collections::HashMap;
use std::convert::TryFrom;
use std::fmt;

use itertools::Itertools;
use lazy_static::lazy_static;

use crate::symbol_table::register_name;

const CLASS_SHIFT: u32 = 30;
const CATEGORY_SHIFT: u32 = 25;
const MODE1_SHIFT: u32 = 22;
const OPERAND1_SHIFT: u32 = 14;
const MODE2_SHIFT: u32 = 11;
const OPERAND2_SHIFT: u32 = 3;

const CLASS_MASK: u32 = 0b11;
const CATEGORY_MASK: u32 = 0b1_1111;
const MODE_MASK: u32 = 0b111;
const OPERAND_MASK: u32 = 0xFF;

/// Flag in the operand field of an [auto-increment](Mode::AutoIncrement) operand which selects
/// the decrement variant.
pub const AUTO_DECREMENT_FLAG: u8 = 0x80;

/// The 2-bit instruction class. Determines the shape of the instruction and how the emulator
/// dispatches it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// Read-only instructions that produce output or stop the machine.
    Control,

    /// Instructions that move a value into a location.
    Write,

    /// Instructions that change the program counter.
    Transfer,

    /// Two-operand integer arithmetic.
    Arithmetic,
}

impl OpClass {
    pub fn as_bits(&self) -> u8 {
        match self {
            OpClass::Control => 0b00,
            OpClass::Write => 0b01,
            OpClass::Transfer => 0b10,
            OpClass::Arithmetic => 0b11,
        }
    }

    pub fn from_bits(bits: u8) -> OpClass {
        match bits & 0b11 {
            0b00 => OpClass::Control,
            0b01 => OpClass::Write,
            0b10 => OpClass::Transfer,
            _ => OpClass::Arithmetic,
        }
    }
}

/// Describes the predicate of a jump instruction.
///
/// Conditional predicates test the value of the first operand, which the assembler arranges to
/// be the difference of the two compared values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    /// Jump if the operand is zero. (`JEQ`)
    Equal,

    /// Jump if the operand is not zero. (`JNE`)
    NotEqual,

    /// Jump if the operand is negative. (`JLT`)
    Less,

    /// Jump if the operand is zero or negative. (`JLE`)
    LessOrEqual,

    /// Jump if the operand is positive. (`JGT`)
    Greater,

    /// Jump if the operand is zero or positive. (`JGE`)
    GreaterOrEqual,

    /// Always jump. (`JMP`)
    Unconditional,
}

impl JumpCondition {
    /// Evaluates the predicate against a value.
    pub fn holds(&self, value: i64) -> bool {
        match self {
            JumpCondition::Equal => value == 0,
            JumpCondition::NotEqual => value != 0,
            JumpCondition::Less => value < 0,
            JumpCondition::LessOrEqual => value <= 0,
            JumpCondition::Greater => value > 0,
            JumpCondition::GreaterOrEqual => value >= 0,
            JumpCondition::Unconditional => true,
        }
    }
}

/// Instructions of the architecture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Sends the value of the operand to the output device.
    Print,

    /// Stops the machine.
    EndOfProgram,

    /// Copies the value of the first operand into the location of the second operand.
    Move,

    /// Pushes the value of the operand onto the stack.
    Push,

    /// Pops the top of the stack into the location of the operand.
    Pop,

    /// Pushes the return address and jumps to the operand.
    Call,

    /// Pops the return address into the program counter.
    Return,

    /// Reads a value from the input device into the location of the operand.
    Scan,

    /// Label marker. Never emitted by the assembler and does nothing when executed.
    Define,

    /// Copies the top of the stack into the location of the operand without popping it.
    Top,

    /// Changes the program counter if the condition holds.
    Jump {
        condition: JumpCondition,
    },

    /// Stores the remainder of a truncating division in the first operand.
    Modulo,

    /// Adds the second operand to the first.
    Add,

    /// Subtracts the second operand from the first.
    Subtract,

    /// Multiplies the first operand by the second.
    Multiply,

    /// Divides the first operand by the second, truncating towards zero.
    Divide,
}

impl OpCode {
    /// Every opcode of the architecture.
    pub const ALL: [OpCode; 22] = [
        OpCode::Print,
        OpCode::EndOfProgram,
        OpCode::Move,
        OpCode::Push,
        OpCode::Pop,
        OpCode::Call,
        OpCode::Return,
        OpCode::Scan,
        OpCode::Define,
        OpCode::Top,
        OpCode::Jump { condition: JumpCondition::Equal },
        OpCode::Jump { condition: JumpCondition::NotEqual },
        OpCode::Jump { condition: JumpCondition::Less },
        OpCode::Jump { condition: JumpCondition::LessOrEqual },
        OpCode::Jump { condition: JumpCondition::Greater },
        OpCode::Jump { condition: JumpCondition::GreaterOrEqual },
        OpCode::Jump { condition: JumpCondition::Unconditional },
        OpCode::Modulo,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
    ];

    pub fn class(&self) -> OpClass {
        match self {
            OpCode::Print | OpCode::EndOfProgram => OpClass::Control,

            OpCode::Move
            | OpCode::Push
            | OpCode::Pop
            | OpCode::Call
            | OpCode::Return
            | OpCode::Scan
            | OpCode::Define
            | OpCode::Top => OpClass::Write,

            OpCode::Jump { .. } => OpClass::Transfer,

            OpCode::Modulo
            | OpCode::Add
            | OpCode::Subtract
            | OpCode::Multiply
            | OpCode::Divide => OpClass::Arithmetic,
        }
    }

    /// Index of the opcode within its class.
    pub fn category(&self) -> u8 {
        match self {
            OpCode::Print => 0,
            OpCode::EndOfProgram => 1,

            OpCode::Move => 0,
            OpCode::Push => 1,
            OpCode::Pop => 2,
            OpCode::Call => 3,
            OpCode::Return => 4,
            OpCode::Scan => 5,
            OpCode::Define => 6,
            OpCode::Top => 7,

            OpCode::Jump { condition: JumpCondition::Equal } => 0,
            OpCode::Jump { condition: JumpCondition::NotEqual } => 1,
            OpCode::Jump { condition: JumpCondition::Less } => 2,
            OpCode::Jump { condition: JumpCondition::LessOrEqual } => 3,
            OpCode::Jump { condition: JumpCondition::Greater } => 4,
            OpCode::Jump { condition: JumpCondition::GreaterOrEqual } => 5,
            OpCode::Jump { condition: JumpCondition::Unconditional } => 6,

            OpCode::Modulo => 0,
            OpCode::Add => 1,
            OpCode::Subtract => 2,
            OpCode::Multiply => 3,
            OpCode::Divide => 4,
        }
    }

    /// Recovers the opcode from its class and category codes.
    pub fn from_parts(class: OpClass, category: u8) -> Option<OpCode> {
        OpCode::ALL
            .iter()
            .copied()
            .find(|op| op.class() == class && op.category() == category)
    }

    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Print => "PRNT",
            OpCode::EndOfProgram => "EOP",
            OpCode::Move => "MOV",
            OpCode::Push => "PUSH",
            OpCode::Pop => "POP",
            OpCode::Call => "CALL",
            OpCode::Return => "RET",
            OpCode::Scan => "SCAN",
            OpCode::Define => "DEF",
            OpCode::Top => "TOP",
            OpCode::Jump { condition } => match condition {
                JumpCondition::Equal => "JEQ",
                JumpCondition::NotEqual => "JNE",
                JumpCondition::Less => "JLT",
                JumpCondition::LessOrEqual => "JLE",
                JumpCondition::Greater => "JGT",
                JumpCondition::GreaterOrEqual => "JGE",
                JumpCondition::Unconditional => "JMP",
            },
            OpCode::Modulo => "MOD",
            OpCode::Add => "ADD",
            OpCode::Subtract => "SUB",
            OpCode::Multiply => "MUL",
            OpCode::Divide => "DIV",
        }
    }

    /// Looks up an opcode by its mnemonic, ignoring case.
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        MNEMONICS.get(mnemonic.to_uppercase().as_str()).copied()
    }

    /// Returns the mnemonic closest to `mnemonic`, if any is reasonably close.
    pub fn suggest(mnemonic: &str) -> Option<&'static str> {
        let upper = mnemonic.to_uppercase();

        OpCode::ALL
            .iter()
            .map(|op| (edit_distance::edit_distance(&upper, op.mnemonic()), op.mnemonic()))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, mnemonic)| mnemonic)
    }

    /// Returns true for the conditional members of the jump family.
    pub fn is_conditional_jump(&self) -> bool {
        match self {
            OpCode::Jump { condition } => *condition != JumpCondition::Unconditional,
            _ => false,
        }
    }
}

lazy_static! {
    static ref MNEMONICS: HashMap<&'static str, OpCode> = OpCode::ALL
        .iter()
        .map(|op| (op.mnemonic(), *op))
        .collect();
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}

/// Addressing modes. The numeric codes are part of the word format and never change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The operand is a register address.
    Register,

    /// The operand is a register holding a memory address.
    RegisterIndirect,

    /// The operand is the value itself.
    Immediate,

    /// The operand is a memory address holding another memory address.
    Indirect,

    /// The operand is an index register whose contents, plus a displacement, form a memory
    /// address.
    Indexed,

    /// The operand is a register which is read and then incremented, or decremented and then
    /// read if [AUTO_DECREMENT_FLAG] is set.
    AutoIncrement,

    /// The operand is a memory address.
    Direct,

    /// The operand is a [StackOp] selector.
    Stack,
}

impl Mode {
    pub fn from_bits(bits: u8) -> Mode {
        match bits & 0b111 {
            0b000 => Mode::Register,
            0b001 => Mode::RegisterIndirect,
            0b010 => Mode::Immediate,
            0b011 => Mode::Indirect,
            0b100 => Mode::Indexed,
            0b101 => Mode::AutoIncrement,
            0b110 => Mode::Direct,
            _ => Mode::Stack,
        }
    }

    pub fn as_bits(&self) -> u8 {
        match self {
            Mode::Register => 0b000,
            Mode::RegisterIndirect => 0b001,
            Mode::Immediate => 0b010,
            Mode::Indirect => 0b011,
            Mode::Indexed => 0b100,
            Mode::AutoIncrement => 0b101,
            Mode::Direct => 0b110,
            Mode::Stack => 0b111,
        }
    }
}

/// Selects the stack operation performed by a [stack](Mode::Stack) operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StackOp {
    Push,
    Pop,
    Top,
}

impl StackOp {
    pub fn from_byte(byte: u8) -> Option<StackOp> {
        match byte {
            0 => Some(StackOp::Push),
            1 => Some(StackOp::Pop),
            2 => Some(StackOp::Top),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            StackOp::Push => 0,
            StackOp::Pop => 1,
            StackOp::Top => 2,
        }
    }
}

impl fmt::Display for StackOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StackOp::Push => write!(f, "PUSH"),
            StackOp::Pop => write!(f, "POP"),
            StackOp::Top => write!(f, "TOP"),
        }
    }
}

/// An addressing mode and the 8-bit operand field it interprets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Operand {
    pub mode: Mode,
    pub value: u8,
}

impl Operand {
    /// Placeholder for an operand slot the instruction does not use.
    pub const NONE: Operand = Operand { mode: Mode::Register, value: 0 };

    pub fn new(mode: Mode, value: u8) -> Operand {
        Operand { mode, value }
    }

    pub fn register(address: u8) -> Operand {
        Operand::new(Mode::Register, address)
    }

    pub fn immediate(value: u8) -> Operand {
        Operand::new(Mode::Immediate, value)
    }

    pub fn direct(address: u8) -> Operand {
        Operand::new(Mode::Direct, address)
    }

    pub fn stack(op: StackOp) -> Operand {
        Operand::new(Mode::Stack, op.as_byte())
    }

    /// Auto-increment operand, or auto-decrement if `decrement` is set. The register address
    /// must fit in seven bits.
    pub fn auto(register: u8, decrement: bool) -> Operand {
        let flag = if decrement { AUTO_DECREMENT_FLAG } else { 0 };
        Operand::new(Mode::AutoIncrement, (register & !AUTO_DECREMENT_FLAG) | flag)
    }

    fn as_bits(&self) -> (u32, u32) {
        (self.mode.as_bits() as u32, self.value as u32)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let register = |address: u8| {
            register_name(address as u16)
                .map(str::to_string)
                .unwrap_or_else(|| format!("%{}", address))
        };

        match self.mode {
            Mode::Register => write!(f, "{}", register(self.value)),
            Mode::RegisterIndirect => write!(f, "*{}", register(self.value)),
            Mode::Immediate => write!(f, "#{}", self.value),
            Mode::Indirect => write!(f, "[{}]", self.value),
            Mode::Indexed => write!(f, "{}", register(self.value)),
            Mode::AutoIncrement if self.value & AUTO_DECREMENT_FLAG != 0 => {
                write!(f, "-{}", register(self.value & !AUTO_DECREMENT_FLAG))
            }
            Mode::AutoIncrement => write!(f, "{}+", register(self.value)),
            Mode::Direct => write!(f, "@{}", self.value),
            Mode::Stack => match StackOp::from_byte(self.value) {
                Some(op) => write!(f, "{}", op),
                None => write!(f, "<stack {}>", self.value),
            },
        }
    }
}

/// A decoded instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: OpCode,
    pub first: Operand,
    pub second: Operand,
}

impl Instruction {
    pub fn new(opcode: OpCode, first: Operand, second: Operand) -> Instruction {
        Instruction { opcode, first, second }
    }

    /// The operand slots this opcode actually reads, for display purposes.
    fn shown_operands(&self) -> Vec<Operand> {
        match self.opcode {
            OpCode::EndOfProgram | OpCode::Define | OpCode::Return => vec![],
            OpCode::Print
            | OpCode::Scan
            | OpCode::Push
            | OpCode::Pop
            | OpCode::Top
            | OpCode::Call
            | OpCode::Jump { condition: JumpCondition::Unconditional } => vec![self.first],
            _ => vec![self.first, self.second],
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let operands = self.shown_operands();

        if operands.is_empty() {
            write!(f, "{}", self.opcode)
        } else {
            write!(f, "{} {}", self.opcode, operands.iter().join(", "))
        }
    }
}

impl From<Instruction> for u32 {
    fn from(ins: Instruction) -> u32 {
        let (mode1, operand1) = ins.first.as_bits();
        let (mode2, operand2) = ins.second.as_bits();

        (ins.opcode.class().as_bits() as u32) << CLASS_SHIFT
            | (ins.opcode.category() as u32) << CATEGORY_SHIFT
            | mode1 << MODE1_SHIFT
            | operand1 << OPERAND1_SHIFT
            | mode2 << MODE2_SHIFT
            | operand2 << OPERAND2_SHIFT
    }
}

/// Reasons a 32-bit word does not decode into an [Instruction].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// No opcode has this class and category.
    UnknownOpcode {
        class: u8,
        category: u8,
    },

    /// A stack operand names no [StackOp].
    InvalidStackSelector(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::UnknownOpcode { class, category } => {
                write!(f, "unknown opcode (class {:02b}, category {:05b})", class, category)
            }
            DecodeError::InvalidStackSelector(selector) => {
                write!(f, "invalid stack selector {}", selector)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl TryFrom<u32> for Instruction {
    type Error = DecodeError;

    fn try_from(word: u32) -> Result<Instruction, DecodeError> {
        let class = ((word >> CLASS_SHIFT) & CLASS_MASK) as u8;
        let category = ((word >> CATEGORY_SHIFT) & CATEGORY_MASK) as u8;

        let opcode = OpCode::from_parts(OpClass::from_bits(class), category)
            .ok_or(DecodeError::UnknownOpcode { class, category })?;

        let first = Operand {
            mode: Mode::from_bits(((word >> MODE1_SHIFT) & MODE_MASK) as u8),
            value: ((word >> OPERAND1_SHIFT) & OPERAND_MASK) as u8,
        };

        let second = Operand {
            mode: Mode::from_bits(((word >> MODE2_SHIFT) & MODE_MASK) as u8),
            value: ((word >> OPERAND2_SHIFT) & OPERAND_MASK) as u8,
        };

        for operand in &[first, second] {
            if operand.mode == Mode::Stack && StackOp::from_byte(operand.value).is_none() {
                return Err(DecodeError::InvalidStackSelector(operand.value));
            }
        }

        Ok(Instruction { opcode, first, second })
    }
}

#[test]
fn test_opcode_parts_are_unique() {
    for (i, a) in OpCode::ALL.iter().enumerate() {
        for b in &OpCode::ALL[i + 1..] {
            assert!(
                a.class() != b.class() || a.category() != b.category(),
                "{} and {} share an encoding", a, b,
            );
        }

        assert_eq!(OpCode::from_parts(a.class(), a.category()), Some(*a));
        assert_eq!(OpCode::from_mnemonic(a.mnemonic()), Some(*a));
    }
}

#[test]
fn test_encode_field_layout() {
    let ins = Instruction::new(
        OpCode::Add,
        Operand::register(1),
        Operand::immediate(0xFF),
    );

    let word: u32 = ins.into();

    assert_eq!(word >> 30, 0b11);
    assert_eq!((word >> 25) & 0b1_1111, 1);
    assert_eq!((word >> 22) & 0b111, 0b000);
    assert_eq!((word >> 14) & 0xFF, 1);
    assert_eq!((word >> 11) & 0b111, 0b010);
    assert_eq!((word >> 3) & 0xFF, 0xFF);
    assert_eq!(word & 0b111, 0);
}

#[test]
fn test_decode_encode_roundtrip() {
    let instructions = [
        Instruction::new(OpCode::Move, Operand::immediate(10), Operand::register(1)),
        Instruction::new(OpCode::Push, Operand::new(Mode::RegisterIndirect, 3), Operand::stack(StackOp::Push)),
        Instruction::new(OpCode::Return, Operand::NONE, Operand::stack(StackOp::Pop)),
        Instruction::new(
            OpCode::Jump { condition: JumpCondition::GreaterOrEqual },
            Operand::auto(28, true),
            Operand::direct(200),
        ),
        Instruction::new(OpCode::Divide, Operand::new(Mode::Indexed, 24), Operand::new(Mode::Indirect, 255)),
        Instruction::new(OpCode::EndOfProgram, Operand::NONE, Operand::NONE),
    ];

    for ins in instructions.iter() {
        let word: u32 = (*ins).into();
        assert_eq!(Instruction::try_from(word), Ok(*ins));
    }
}

#[test]
fn test_decode_ignores_reserved_bits() {
    let ins = Instruction::new(OpCode::Print, Operand::register(2), Operand::NONE);
    let word: u32 = ins.into();

    assert_eq!(Instruction::try_from(word | 0b111), Ok(ins));
}

#[test]
fn test_decode_unknown_opcode() {
    // Class 00 only has two categories.
    let word: u32 = 0b00_00101 << 25;

    assert_eq!(
        Instruction::try_from(word),
        Err(DecodeError::UnknownOpcode { class: 0, category: 5 }),
    );
}

#[test]
fn test_suggest_mnemonic() {
    assert_eq!(OpCode::suggest("MOVE"), Some("MOV"));
    assert_eq!(OpCode::suggest("prnt"), Some("PRNT"));
    assert_eq!(OpCode::suggest("FROBNICATE"), None);
}

#[test]
fn test_display() {
    let ins = Instruction::new(OpCode::Move, Operand::immediate(10), Operand::register(1));
    assert_eq!(ins.to_string(), "MOV #10, R1");

    let ins = Instruction::new(OpCode::Push, Operand::auto(28, false), Operand::stack(StackOp::Push));
    assert_eq!(ins.to_string(), "PUSH I1+");
}
