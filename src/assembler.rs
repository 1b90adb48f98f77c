//! Two-pass assembly from source text to instruction words in memory.
//!
//! The first pass binds `DEF`/`DEB` labels to the address of the instruction that follows them.
//! The second pass encodes every statement. Words reach memory only after both passes succeed,
//! and new labels reach the caller's symbol table at the same point.

use slog::{debug, o, trace, Discard, Logger};

use crate::error::{AssemblyError, AssemblyErrorKind};
use crate::instruction::{self, Instruction, JumpCondition, Mode, OpCode, StackOp};
use crate::machine::Machine;
use crate::source_map::SourceMap;
use crate::storage::{Storage, Word};
use crate::symbol_table::{reg, SymbolKind, SymbolTable};
use crate::symbolic::ast::{LineKind, Operand, Statement, Value};
use crate::symbolic::parser::arity;
use crate::symbolic::program::{expand, skip_target, width};
use crate::symbolic::Program;

/// The result of a successful assembly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assembly {
    /// Address of the first word.
    pub origin: u16,

    /// The emitted instruction words, in address order.
    pub words: Vec<u32>,

    pub source_map: SourceMap,
}

impl Assembly {
    /// Address one past the last emitted word.
    pub fn end(&self) -> u16 {
        self.origin + self.words.len() as u16
    }
}

/// Assembles `source` into `machine`'s memory, starting at its program counter.
pub fn assemble<S>(
    source: &str,
    symbols: &mut SymbolTable,
    machine: &mut Machine<S>,
) -> Result<Assembly, AssemblyError>
where
    S: Storage,
{
    assemble_with_logger(source, symbols, machine, None)
}

pub fn assemble_with_logger<S, L>(
    source: &str,
    symbols: &mut SymbolTable,
    machine: &mut Machine<S>,
    logger: L,
) -> Result<Assembly, AssemblyError>
where
    S: Storage,
    L: Into<Option<Logger>>,
{
    let program = Program::parse(source)?;
    assemble_program_with_logger(&program, symbols, machine, logger)
}

/// Assembles an already parsed program.
pub fn assemble_program<S>(
    program: &Program,
    symbols: &mut SymbolTable,
    machine: &mut Machine<S>,
) -> Result<Assembly, AssemblyError>
where
    S: Storage,
{
    assemble_program_with_logger(program, symbols, machine, None)
}

pub fn assemble_program_with_logger<S, L>(
    program: &Program,
    symbols: &mut SymbolTable,
    machine: &mut Machine<S>,
    logger: L,
) -> Result<Assembly, AssemblyError>
where
    S: Storage,
    L: Into<Option<Logger>>,
{
    let logger = logger
        .into()
        .unwrap_or_else(|| Logger::root(Discard, o!()))
        .new(o!("stage" => "assembly"));

    let pc = machine
        .pc()
        .map_err(|_| AssemblyError::new(0, AssemblyErrorKind::InvalidOrigin(-1)))?;

    let origin = machine
        .memory_address(pc)
        .map_err(|_| AssemblyError::new(0, AssemblyErrorKind::InvalidOrigin(pc)))?;

    let words = program.statements().map(|(_, s)| width(s)).sum::<usize>();
    let available = (machine.config().memory - origin) as usize;

    if words > available {
        return Err(AssemblyError::new(
            0,
            AssemblyErrorKind::ProgramTooLarge { words, available },
        ));
    }

    let mut scratch = symbols.clone();

    define_labels(program, origin, &mut scratch, &logger)?;
    let encoded = encode_program(program, origin, &scratch, &logger)?;

    for (address, line, word) in &encoded {
        machine.store(*address as i64, Word::from(*word)).map_err(|_| {
            AssemblyError::new(*line, AssemblyErrorKind::AddressOutOfRange(*address as i64))
        })?;
    }

    *symbols = scratch;

    debug!(logger, "program stored"; "origin" => origin, "words" => encoded.len());

    Ok(Assembly {
        origin,
        words: encoded.iter().map(|(_, _, word)| *word).collect(),
        source_map: encoded.iter().map(|(address, line, _)| (*address, *line)).collect(),
    })
}

/// First pass. Binds every label to the address of the next instruction.
///
/// Returns the address one past the last instruction.
pub fn define_labels(
    program: &Program,
    origin: u16,
    symbols: &mut SymbolTable,
    logger: &Logger,
) -> Result<u16, AssemblyError> {
    let mut counter = origin;

    for line in &program.lines {
        match line.kind {
            LineKind::Label(ref name) => {
                symbols
                    .define(name.as_str(), counter, SymbolKind::Label)
                    .map_err(|err| AssemblyError::new(line.number, err.into()))?;

                trace!(logger, "define label"; "name" => %name, "address" => counter);
            }
            LineKind::Statement(ref statement) => counter += width(statement) as u16,
        }
    }

    debug!(logger, "labels defined"; "end" => counter);

    Ok(counter)
}

/// Second pass. Encodes every statement, returning `(address, line, word)` triples.
pub fn encode_program(
    program: &Program,
    origin: u16,
    symbols: &SymbolTable,
    logger: &Logger,
) -> Result<Vec<(u16, usize, u32)>, AssemblyError> {
    let mut counter = origin;
    let mut encoded = Vec::new();

    for (line, statement) in program.statements() {
        if let Some(target) = skip_target(statement, counter as i64) {
            address_byte(target).map_err(|kind| AssemblyError::new(line, kind))?;
        }

        for expanded in expand(statement, counter as i64) {
            let instruction = encode_statement(&expanded, symbols)
                .map_err(|kind| AssemblyError::new(line, kind))?;

            let word: u32 = instruction.into();

            trace!(logger, "emit";
                   "address" => counter,
                   "instruction" => %instruction,
                   "word" => format!("{:#010x}", word));

            encoded.push((counter, line, word));
            counter += 1;
        }
    }

    debug!(logger, "program encoded"; "words" => encoded.len());

    Ok(encoded)
}

/// Encodes a single statement that has already been expanded.
pub fn encode_statement(
    statement: &Statement,
    symbols: &SymbolTable,
) -> Result<Instruction, AssemblyErrorKind> {
    use instruction::Operand as Op;

    let operands = statement
        .operands
        .iter()
        .map(|operand| encode_operand(operand, symbols))
        .collect::<Result<Vec<_>, _>>()?;

    let (first, second) = match (statement.opcode, operands.as_slice()) {
        (OpCode::EndOfProgram, []) | (OpCode::Define, []) => (Op::NONE, Op::NONE),
        (OpCode::Return, []) => (Op::NONE, Op::stack(StackOp::Pop)),
        (OpCode::Print, [x])
        | (OpCode::Scan, [x])
        | (OpCode::Jump { condition: JumpCondition::Unconditional }, [x]) => (*x, Op::NONE),
        (OpCode::Push, [x]) | (OpCode::Call, [x]) => (*x, Op::stack(StackOp::Push)),
        (OpCode::Pop, [x]) => (*x, Op::stack(StackOp::Pop)),
        (OpCode::Top, [x]) => (*x, Op::stack(StackOp::Top)),
        (OpCode::Jump { .. }, [value, target]) => (*value, *target),
        (OpCode::Move, [a, b])
        | (OpCode::Modulo, [a, b])
        | (OpCode::Add, [a, b])
        | (OpCode::Subtract, [a, b])
        | (OpCode::Multiply, [a, b])
        | (OpCode::Divide, [a, b]) => (*a, *b),
        (opcode, operands) => {
            return Err(AssemblyErrorKind::OperandCount {
                mnemonic: opcode.mnemonic(),
                expected: arity(opcode).1,
                found: operands.len(),
            })
        }
    };

    Ok(Instruction::new(statement.opcode, first, second))
}

fn operand_byte(value: i64) -> Option<u8> {
    if value >= 0 && value <= 0xFF {
        Some(value as u8)
    } else {
        None
    }
}

fn address_byte(address: i64) -> Result<u8, AssemblyErrorKind> {
    operand_byte(address).ok_or(AssemblyErrorKind::AddressOutOfRange(address))
}

/// Operand for a bare register name. Array pointers are indexed, every other register is
/// addressed directly. Index registers auto-increment only when written `I1+` or `-I1`.
fn register_operand(address: u16) -> instruction::Operand {
    if address >= reg::A1 && address <= reg::A4 {
        instruction::Operand::new(Mode::Indexed, address as u8)
    } else {
        instruction::Operand::register(address as u8)
    }
}

fn register_address(name: &str, symbols: &SymbolTable) -> Result<u16, AssemblyErrorKind> {
    let symbol = symbols.resolve(name)?;

    match symbol.kind {
        SymbolKind::Register => Ok(symbol.address),
        _ => Err(AssemblyErrorKind::InvalidOperand(name.to_string())),
    }
}

/// Encodes an operand into its mode and 8-bit field.
pub fn encode_operand(
    operand: &Operand,
    symbols: &SymbolTable,
) -> Result<instruction::Operand, AssemblyErrorKind> {
    use instruction::Operand as Op;

    let encoded = match operand {
        Operand::Immediate(value) => {
            Op::immediate(operand_byte(*value).ok_or(AssemblyErrorKind::ImmediateOutOfRange(*value))?)
        }
        Operand::Name(name) => {
            let symbol = symbols.resolve(name)?;

            match symbol.kind {
                SymbolKind::Register => register_operand(symbol.address),
                SymbolKind::Memory | SymbolKind::Label => {
                    Op::direct(address_byte(symbol.address as i64)?)
                }
            }
        }
        Operand::Deref(name) => {
            Op::new(Mode::RegisterIndirect, register_address(name, symbols)? as u8)
        }
        Operand::Indirect(Value::Number(address)) => {
            Op::new(Mode::Indirect, address_byte(*address)?)
        }
        Operand::Indirect(Value::Name(name)) => {
            let symbol = symbols.resolve(name)?;

            match symbol.kind {
                SymbolKind::Register => Op::new(Mode::RegisterIndirect, symbol.address as u8),
                SymbolKind::Memory | SymbolKind::Label => {
                    Op::new(Mode::Indirect, address_byte(symbol.address as i64)?)
                }
            }
        }
        Operand::Direct(Value::Number(address)) => Op::direct(address_byte(*address)?),
        Operand::Direct(Value::Name(name)) => {
            let symbol = symbols.resolve(name)?;

            match symbol.kind {
                SymbolKind::Register => {
                    return Err(AssemblyErrorKind::InvalidOperand(operand.to_string()))
                }
                SymbolKind::Memory | SymbolKind::Label => {
                    Op::direct(address_byte(symbol.address as i64)?)
                }
            }
        }
        Operand::PostIncrement(name) => Op::auto(register_address(name, symbols)? as u8, false),
        Operand::PreDecrement(name) => Op::auto(register_address(name, symbols)? as u8, true),
    };

    Ok(encoded)
}

#[cfg(test)]
fn setup() -> (SymbolTable, Machine) {
    let machine = Machine::new(Default::default()).unwrap();
    let symbols = SymbolTable::with_architecture(machine.config().variables_base);
    (symbols, machine)
}

#[cfg(test)]
fn decode_all(assembly: &Assembly) -> Vec<Instruction> {
    use std::convert::TryFrom;

    assembly
        .words
        .iter()
        .map(|word| Instruction::try_from(*word).unwrap())
        .collect()
}

#[test]
fn test_assemble_stores_words_from_pc() {
    let (mut symbols, mut machine) = setup();
    machine.set_pc(10).unwrap();

    let assembly = assemble("DEF START\nMOV 10 R1\nEOP", &mut symbols, &mut machine).unwrap();

    assert_eq!(assembly.origin, 10);
    assert_eq!(assembly.end(), 12);
    assert_eq!(symbols.resolve("START").map(|s| s.address), Ok(10));
    assert_eq!(machine.load(10), Ok(Word::from(assembly.words[0])));
    assert_eq!(machine.load(11), Ok(Word::from(assembly.words[1])));
    assert_eq!(assembly.source_map.get_source_line(11), Some(3));

    assert_eq!(
        decode_all(&assembly),
        vec![
            Instruction::new(
                OpCode::Move,
                instruction::Operand::immediate(10),
                instruction::Operand::register(1),
            ),
            Instruction::new(OpCode::EndOfProgram, instruction::Operand::NONE, instruction::Operand::NONE),
        ],
    );
}

#[test]
fn test_conditional_jump_takes_two_slots() {
    let (mut symbols, mut machine) = setup();

    let assembly = assemble("JEQ R1 R2\nDEF AFTER\nPRNT R1", &mut symbols, &mut machine).unwrap();

    assert_eq!(assembly.words.len(), 3);
    assert_eq!(symbols.resolve("AFTER").map(|s| s.address), Ok(2));

    let decoded = decode_all(&assembly);
    assert_eq!(decoded[0].opcode, OpCode::Subtract);
    assert_eq!(decoded[1].opcode, OpCode::Jump { condition: JumpCondition::Equal });
    assert_eq!(decoded[1].second, instruction::Operand::immediate(3));
    assert_eq!(decoded[2].opcode, OpCode::Print);
}

#[test]
fn test_skip_past_last_address() {
    let (mut symbols, mut machine) = setup();
    machine.set_pc(254).unwrap();

    let err = assemble("JEQ R1\nEOP", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(err, AssemblyError::new(1, AssemblyErrorKind::AddressOutOfRange(256)));

    machine.set_pc(253).unwrap();
    assert!(assemble("JEQ R1\nEOP", &mut symbols, &mut machine).is_ok());
}

#[test]
fn test_forward_label_reference() {
    let (mut symbols, mut machine) = setup();

    let source = "JMP END\nPRNT R1\nDEF END\nEOP";
    let assembly = assemble(source, &mut symbols, &mut machine).unwrap();

    assert_eq!(decode_all(&assembly)[0].first, instruction::Operand::direct(2));
}

#[test]
fn test_operand_classification() {
    let (mut symbols, mut machine) = setup();

    let source = "MOV A1 *R2\nMOV I1 -I2\nMOV [M1] @M2\nMOV [R3] PC\nADD R1 [7]\nMOV I2+ I2";
    let assembly = assemble(source, &mut symbols, &mut machine).unwrap();
    let decoded = decode_all(&assembly);

    assert_eq!(decoded[0].first, instruction::Operand::new(Mode::Indexed, reg::A1 as u8));
    assert_eq!(decoded[0].second, instruction::Operand::new(Mode::RegisterIndirect, 2));
    assert_eq!(decoded[1].first, instruction::Operand::register(reg::I1 as u8));
    assert_eq!(decoded[1].second, instruction::Operand::auto(reg::I2 as u8, true));
    assert_eq!(decoded[2].first, instruction::Operand::new(Mode::Indirect, 200));
    assert_eq!(decoded[2].second, instruction::Operand::direct(201));
    assert_eq!(decoded[3].first, instruction::Operand::new(Mode::RegisterIndirect, 3));
    assert_eq!(decoded[3].second, instruction::Operand::register(reg::PC as u8));
    assert_eq!(decoded[4].second, instruction::Operand::new(Mode::Indirect, 7));
    assert_eq!(decoded[5].first, instruction::Operand::auto(reg::I2 as u8, false));
    assert_eq!(decoded[5].second, instruction::Operand::register(reg::I2 as u8));
}

#[test]
fn test_immediate_out_of_range() {
    let (mut symbols, mut machine) = setup();

    for source in &["MOV 256 R1", "MOV #-1 R1"] {
        let err = assemble(source, &mut symbols, &mut machine).unwrap_err();
        assert!(match err.kind {
            AssemblyErrorKind::ImmediateOutOfRange(_) => true,
            _ => false,
        }, "{}", err);
    }

    assert!(assemble("MOV 255 R1", &mut symbols, &mut machine).is_ok());
}

#[test]
fn test_errors_leave_state_untouched() {
    let (mut symbols, mut machine) = setup();
    let before = symbols.len();

    let err = assemble("DEF X\nMOV 1 R1\nMOV 2 NOWHERE", &mut symbols, &mut machine).unwrap_err();

    assert_eq!(err, AssemblyError::new(3, AssemblyErrorKind::UndefinedSymbol("NOWHERE".to_string())));
    assert_eq!(symbols.len(), before);
    assert_eq!(machine.load(0), Ok(Word::Int(0)));
}

#[test]
fn test_duplicate_label() {
    let (mut symbols, mut machine) = setup();

    let err = assemble("DEF X\nEOP\nDEF X\nEOP", &mut symbols, &mut machine).unwrap_err();

    assert_eq!(
        err,
        AssemblyError::new(
            3,
            AssemblyErrorKind::DuplicateSymbol {
                name: "X".to_string(),
                existing: 0,
                requested: 1,
            },
        ),
    );
}

#[test]
fn test_invalid_operands() {
    let (mut symbols, mut machine) = setup();

    let err = assemble("MOV *M1 R1", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(err.kind, AssemblyErrorKind::InvalidOperand("M1".to_string()));

    let err = assemble("MOV @R1 R2", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(err.kind, AssemblyErrorKind::InvalidOperand("@R1".to_string()));

    let err = assemble("MOV [300] R2", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(err.kind, AssemblyErrorKind::AddressOutOfRange(300));
}

#[test]
fn test_program_too_large() {
    let (mut symbols, mut machine) = setup();
    machine.set_pc(255).unwrap();

    let err = assemble("EOP\nEOP", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::new(0, AssemblyErrorKind::ProgramTooLarge { words: 2, available: 1 }),
    );

    machine.set_pc(-3).unwrap();
    let err = assemble("EOP", &mut symbols, &mut machine).unwrap_err();
    assert_eq!(err.kind, AssemblyErrorKind::InvalidOrigin(-3));
}
