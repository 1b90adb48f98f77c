//! [Emulator] for executing assembled programs.
//!
//! Every step goes through the same pipeline: fetch the word at `PC`, decode it, advance `PC`,
//! resolve the operands (applying their side effects), execute, and write the result back. A
//! fault anywhere in the pipeline halts the machine and is reported to the [InputOutput]
//! handler.

use std::convert::TryFrom;
use std::io::BufRead;

use slog::{debug, error, o, trace, Discard, Logger};

use crate::addressing::resolve;
use crate::event::{Event, EventDispatcher, EventListener};
use crate::fault::{Fault, FaultKind, Outcome, Stage};
use crate::instruction::{Instruction, JumpCondition, OpClass, OpCode, Operand};
use crate::machine::{Location, Machine};
use crate::parsing::parse_word;
use crate::storage::{Storage, Word};
use crate::symbol_table::reg;

/// Interface to the input and output devices.
pub trait InputOutput {
    /// Called when a `PRNT` instruction is executed.
    fn print(&mut self, value: Word);

    /// Called when a `SCAN` instruction is executed. Blocks until a value is available.
    fn scan(&mut self) -> Word;

    /// Called once when execution stops because of a fault.
    fn fault(&mut self, _fault: &Fault) {}
}

/// Utility struct for implementing methods in the context of emulating a single instruction.
struct InstructionEmulationContext<'e, S, IO> {
    /// The emulator in whose context the instruction is being emulated.
    emulator: &'e mut Emulator<S, IO>,

    /// The instruction that we are currently emulating.
    instruction: Instruction,

    /// Address the instruction was fetched from.
    address: u16,
}

type StepResult<T> = Result<T, (FaultKind, Stage)>;

impl<'e, S, IO> InstructionEmulationContext<'e, S, IO>
where
    S: Storage,
    IO: InputOutput,
{
    /// Resolves an operand and applies the side effects of its addressing mode.
    fn resolve(&mut self, operand: Operand) -> StepResult<Location> {
        let machine = &mut self.emulator.machine;
        let resolution = resolve(machine, operand).map_err(|kind| (kind, Stage::Decode))?;

        for effect in &resolution.effects {
            let (register, data) = effect
                .apply(&mut self.emulator.machine)
                .map_err(|kind| (kind, Stage::Decode))?;

            self.emulator.events.dispatch(Event::RegisterChange { register, data });
        }

        Ok(resolution.location)
    }

    fn first(&mut self) -> StepResult<Location> {
        self.resolve(self.instruction.first)
    }

    fn second(&mut self) -> StepResult<Location> {
        self.resolve(self.instruction.second)
    }

    fn read(&mut self, location: Location) -> StepResult<Word> {
        self.emulator
            .machine
            .read(location)
            .map_err(|kind| (kind, Stage::Dispatch))
    }

    fn read_int(&mut self, location: Location) -> StepResult<i64> {
        self.read(location)?
            .as_int()
            .ok_or((FaultKind::NonIntegerOperand, Stage::Dispatch))
    }

    fn write(&mut self, location: Location, data: Word) -> StepResult<()> {
        self.emulator
            .machine
            .write(location, data)
            .map_err(|kind| (kind, Stage::Writeback))?;

        match location {
            Location::Register(register) => {
                self.emulator.events.dispatch(Event::RegisterChange { register, data })
            }
            Location::Memory(address) => {
                self.emulator.events.dispatch(Event::MemoryChange { address, data })
            }
            Location::Immediate(_) => (),
        }

        Ok(())
    }

    /// The address a control transfer operand points to.
    fn target(&mut self, location: Location) -> StepResult<i64> {
        match location {
            Location::Memory(address) => Ok(address as i64),
            Location::Immediate(value) => Ok(value),
            Location::Register(_) => self.read_int(location),
        }
    }

    fn transfer(&mut self, to: i64) -> StepResult<()> {
        self.write(Location::Register(reg::PC), Word::Int(to))?;
        self.emulator.events.dispatch(Event::ControlTransfer {
            from: self.address,
            to,
        });

        Ok(())
    }

    fn emulate(&mut self) -> StepResult<Outcome> {
        match self.instruction.opcode.class() {
            OpClass::Control => self.emulate_control(),
            OpClass::Write => self.emulate_write(),
            OpClass::Transfer => self.emulate_transfer(),
            OpClass::Arithmetic => self.emulate_arithmetic(),
        }
    }

    fn emulate_control(&mut self) -> StepResult<Outcome> {
        match self.instruction.opcode {
            OpCode::Print => {
                let location = self.first()?;
                let data = self.read(location)?;

                self.emulator.io.print(data);
                self.emulator.events.dispatch(Event::Output { data });
            }
            _ => {
                self.emulator.halted = true;
                self.emulator.events.dispatch(Event::Halt);
                return Ok(Outcome::Halted);
            }
        }

        Ok(Outcome::Continue)
    }

    fn emulate_write(&mut self) -> StepResult<Outcome> {
        match self.instruction.opcode {
            OpCode::Move | OpCode::Push => {
                let source = self.first()?;
                let destination = self.second()?;
                let data = self.read(source)?;
                self.write(destination, data)?;
            }
            OpCode::Pop | OpCode::Top => {
                let destination = self.first()?;
                let source = self.second()?;
                let data = self.read(source)?;
                self.write(destination, data)?;
            }
            OpCode::Call => {
                let target = self.first()?;
                let to = self.target(target)?;
                let slot = self.second()?;

                let return_address = self.read(Location::Register(reg::PC))?;
                self.write(slot, return_address)?;
                self.transfer(to)?;
            }
            OpCode::Return => {
                let slot = self.second()?;
                let to = self.read_int(slot)?;
                self.transfer(to)?;
            }
            OpCode::Scan => {
                let destination = self.first()?;
                let data = self.emulator.io.scan();

                self.emulator.events.dispatch(Event::Input { data });
                self.write(destination, data)?;
            }
            _ => (),
        }

        Ok(Outcome::Continue)
    }

    fn emulate_transfer(&mut self) -> StepResult<Outcome> {
        let condition = match self.instruction.opcode {
            OpCode::Jump { condition } => condition,
            _ => return Ok(Outcome::Continue),
        };

        if condition == JumpCondition::Unconditional {
            let target = self.first()?;
            let to = self.target(target)?;
            self.transfer(to)?;
            return Ok(Outcome::Continue);
        }

        let location = self.first()?;
        let value = self.read_int(location)?;
        let target = self.second()?;

        if condition.holds(value) {
            let to = self.target(target)?;
            self.transfer(to)?;
        }

        Ok(Outcome::Continue)
    }

    fn emulate_arithmetic(&mut self) -> StepResult<Outcome> {
        let destination = self.first()?;
        let source = self.second()?;

        let a = self.read_int(destination)?;
        let b = self.read_int(source)?;

        let result = match self.instruction.opcode {
            OpCode::Add => a.wrapping_add(b),
            OpCode::Subtract => a.wrapping_sub(b),
            OpCode::Multiply => a.wrapping_mul(b),
            OpCode::Divide | OpCode::Modulo if b == 0 => {
                return Err((FaultKind::DivisionByZero, Stage::Dispatch))
            }
            OpCode::Divide => a.wrapping_div(b),
            OpCode::Modulo => a.wrapping_rem(b),
            _ => return Ok(Outcome::Continue),
        };

        self.write(destination, Word::Int(result))?;

        Ok(Outcome::Continue)
    }
}

/// The emulator owns a [Machine] and drives it instruction by instruction, doing input and
/// output through an [InputOutput] handler.
pub struct Emulator<S, IO> {
    /// The register file and memory of the emulated machine.
    pub machine: Machine<S>,

    /// Interface for doing IO operations.
    pub io: IO,

    /// True if the execution has been halted, either by `EOP` or by a fault.
    pub halted: bool,

    fault: Option<Fault>,
    logger: Logger,
    events: EventDispatcher,
}

impl<S, IO> Emulator<S, IO>
where
    S: Storage,
    IO: InputOutput,
{
    /// Create a new emulator. Execution starts from the current value of the `PC` register.
    pub fn new(machine: Machine<S>, io: IO) -> Emulator<S, IO> {
        Emulator::with_logger(machine, io, None)
    }

    pub fn with_logger<L>(machine: Machine<S>, io: IO, logger: L) -> Emulator<S, IO>
    where
        L: Into<Option<Logger>>,
    {
        let mut emulator = Emulator {
            machine,
            io,
            halted: false,
            fault: None,
            logger: Logger::root(Discard, o!()),
            events: EventDispatcher::new(),
        };

        emulator.set_logger(logger);
        emulator
    }

    pub fn set_logger<L>(&mut self, logger: L)
    where
        L: Into<Option<Logger>>,
    {
        self.logger = logger
            .into()
            .unwrap_or_else(|| Logger::root(Discard, o!()))
            .new(o!("stage" => "execution"));
    }

    pub fn add_listener<L: EventListener + 'static>(&mut self, listener: L) {
        self.events.add_listener(listener);
    }

    /// The fault that stopped execution, if any.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Fetches and decodes the instruction `PC` points to, without changing any state.
    pub fn current_instruction(&mut self) -> Result<Instruction, Fault> {
        self.fetch().map(|(_, instruction)| instruction)
    }

    fn fetch(&mut self) -> Result<(u16, Instruction), Fault> {
        let pc = self
            .machine
            .pc()
            .map_err(|kind| Fault::new(kind, Stage::Fetch, None))?;

        let address = self
            .machine
            .memory_address(pc)
            .map_err(|kind| Fault::new(kind, Stage::Fetch, None))?;

        let word = self
            .machine
            .load(address as i64)
            .map_err(|kind| Fault::new(kind, Stage::Fetch, Some(address)))?;

        let raw = match word {
            Word::Int(value) if value >= 0 && value <= u32::max_value() as i64 => value as u32,
            Word::Int(value) => {
                return Err(Fault::new(FaultKind::MalformedWord(value), Stage::Decode, Some(address)))
            }
            Word::Encoded(bits) => {
                return Err(Fault::new(
                    FaultKind::MalformedWord(bits as i64),
                    Stage::Decode,
                    Some(address),
                ))
            }
        };

        let instruction = Instruction::try_from(raw)
            .map_err(|err| Fault::new(err.into(), Stage::Decode, Some(address)))?;

        Ok((address, instruction))
    }

    fn execute(&mut self) -> Result<Outcome, Fault> {
        let (address, instruction) = self.fetch()?;

        trace!(self.logger, "execute"; "pc" => address, "instruction" => %instruction);

        let fault = |(kind, stage): (FaultKind, Stage)| Fault::new(kind, stage, Some(address));

        self.machine
            .set_register(reg::IR, Word::Int(address as i64))
            .and_then(|_| self.machine.set_pc(address as i64 + 1))
            .map_err(|kind| fault((kind, Stage::Fetch)))?;

        let mut ctx = InstructionEmulationContext {
            emulator: self,
            instruction,
            address,
        };

        ctx.emulate().map_err(fault)
    }

    /// Fetches the next instruction, increments the program counter and executes the
    /// instruction.
    ///
    /// # Errors
    /// Returns the fault if the instruction could not be executed. The emulator is halted
    /// afterwards and the fault has been reported to the IO handler.
    pub fn step(&mut self) -> Result<Outcome, Fault> {
        if self.halted {
            return Ok(Outcome::Halted);
        }

        match self.execute() {
            Ok(Outcome::Halted) => {
                debug!(self.logger, "halted");
                Ok(Outcome::Halted)
            }
            Ok(outcome) => Ok(outcome),
            Err(fault) => {
                error!(self.logger, "fault"; "kind" => fault.kind.name(), "message" => %fault);

                self.halted = true;
                self.fault = Some(fault);
                self.io.fault(&fault);

                Err(fault)
            }
        }
    }

    /// Executes the program until it halts or faults.
    pub fn run(&mut self) -> Result<(), Fault> {
        while !self.halted {
            self.step()?;
        }

        Ok(())
    }

    /// Executes at most `limit` instructions. Returns [Outcome::Continue] if the machine is
    /// still running afterwards.
    pub fn run_for(&mut self, limit: usize) -> Result<Outcome, Fault> {
        for _ in 0..limit {
            if self.step()? == Outcome::Halted {
                return Ok(Outcome::Halted);
            }
        }

        if self.halted {
            Ok(Outcome::Halted)
        } else {
            Ok(Outcome::Continue)
        }
    }
}

/// An IO handler for testing purposes.
///
/// Reads input values from a pre-determined input buffer and
/// appends printed values to an output buffer. An exhausted input buffer reads as zero.
#[derive(Debug, Default)]
pub struct TestIo {
    input_buffer: Vec<Word>,
    output_buffer: Vec<Word>,
    faults: Vec<Fault>,
}

impl TestIo {
    pub fn new() -> TestIo {
        TestIo::default()
    }

    pub fn with_input<I: IntoIterator<Item = Word>>(input: I) -> TestIo {
        TestIo {
            input_buffer: input.into_iter().collect(),
            ..TestIo::default()
        }
    }

    pub fn input(&mut self, value: Word) {
        self.input_buffer.push(value);
    }

    pub fn output(&self) -> &[Word] {
        &self.output_buffer[..]
    }

    pub fn into_output(self) -> Vec<Word> {
        self.output_buffer
    }

    /// Faults reported so far.
    pub fn faults(&self) -> &[Fault] {
        &self.faults[..]
    }
}

impl InputOutput for TestIo {
    fn print(&mut self, value: Word) {
        self.output_buffer.push(value);
    }

    fn scan(&mut self) -> Word {
        if self.input_buffer.is_empty() {
            Word::default()
        } else {
            self.input_buffer.remove(0)
        }
    }

    fn fault(&mut self, fault: &Fault) {
        self.faults.push(*fault);
    }
}

impl InputOutput for &mut TestIo {
    fn print(&mut self, value: Word) {
        (**self).print(value)
    }

    fn scan(&mut self) -> Word {
        (**self).scan()
    }

    fn fault(&mut self, fault: &Fault) {
        (**self).fault(fault)
    }
}

/// An IO handler on the terminal.
///
/// `PRNT` writes the value on its own line to the standard output. `SCAN` reads lines from the
/// standard input until one parses as an integer or a decimal; end of input reads as zero.
/// Faults are printed as `EXCEPTION: <message>`.
pub struct StdIo;

impl InputOutput for StdIo {
    fn print(&mut self, value: Word) {
        println!("{}", value);
    }

    fn scan(&mut self) -> Word {
        let stdin = std::io::stdin();

        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };

            match parse_word(&line) {
                Ok(word) => return word,
                Err(err) => eprintln!("invalid input: {}", err),
            }
        }

        Word::default()
    }

    fn fault(&mut self, fault: &Fault) {
        println!("EXCEPTION: {}", fault);
    }
}

#[cfg(test)]
macro_rules! assert_register {
    ($emulator:expr, $register:expr, $value:expr) => {
        assert_eq!(
            $emulator.machine.register($register),
            Ok(Word::Int($value)),
            "register {} != {}",
            $register,
            $value,
        );
    };
}

#[cfg(test)]
fn load(source: &str, io: TestIo) -> Emulator<crate::storage::Bank, TestIo> {
    let mut machine = Machine::new(Default::default()).unwrap();
    let mut symbols =
        crate::symbol_table::SymbolTable::with_architecture(machine.config().variables_base);

    crate::assembler::assemble(source, &mut symbols, &mut machine).unwrap();

    Emulator::new(machine, io)
}

#[test]
fn test_add_and_print() {
    let mut emulator = load(
        "DEF START\nMOV 10 R1\nMOV 20 R2\nADD R1 R2\nPRNT R1\nEOP",
        TestIo::new(),
    );

    emulator.run().unwrap();

    assert!(emulator.halted);
    assert_eq!(emulator.io.output(), &[Word::Int(30)]);
    assert_register!(emulator, reg::R1, 30);
    assert_register!(emulator, reg::PC, 5);
    assert_register!(emulator, reg::IR, 4);
}

#[test]
fn test_division_by_zero() {
    let mut emulator = load("MOV 10 R1\nMOV 0 R2\nDIV R1 R2", TestIo::new());

    let fault = emulator.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::DivisionByZero);
    assert_eq!(fault.stage, Stage::Dispatch);
    assert_eq!(fault.address, Some(2));
    assert!(emulator.halted);
    assert_eq!(emulator.fault(), Some(&fault));
    assert_eq!(emulator.io.faults(), &[fault]);
    assert_register!(emulator, reg::R1, 10);
}

#[test]
fn test_step_after_halt() {
    let mut emulator = load("EOP", TestIo::new());

    assert_eq!(emulator.step(), Ok(Outcome::Halted));
    assert_eq!(emulator.step(), Ok(Outcome::Halted));
    assert_register!(emulator, reg::PC, 1);
}

#[test]
fn test_arithmetic() {
    let mut emulator = load(
        "MOV 17 R1\nMOV 5 R2\nMOV R1 R3\nMOD R3 R2\nMOV R1 R4\nDIV R4 R2\nMOV R1 R5\nMUL R5 R2\nSUB R2 R1\nEOP",
        TestIo::new(),
    );

    emulator.run().unwrap();

    assert_register!(emulator, reg::R3, 2);
    assert_register!(emulator, reg::R4, 3);
    assert_register!(emulator, reg::R5, 85);
    assert_register!(emulator, reg::R2, -12);
}

#[test]
fn test_truncating_division() {
    let mut emulator = load("MOV 0 R1\nSUB R1 7\nDIV R1 2\nMOV 0 R2\nSUB R2 7\nMOD R2 2\nEOP", TestIo::new());

    emulator.run().unwrap();

    assert_register!(emulator, reg::R1, -3);
    assert_register!(emulator, reg::R2, -1);
}

#[test]
fn test_countdown_loop() {
    let source = r#"
        MOV 3 R1
        DEF LOOP
        PRNT R1
        SUB R1 1
        JNE R1 0 LOOP
        EOP
    "#;

    let mut emulator = load(source, TestIo::new());
    emulator.run().unwrap();

    assert_eq!(
        emulator.io.into_output(),
        vec![Word::Int(3), Word::Int(2), Word::Int(1)],
    );
}

#[test]
fn test_conditional_skip() {
    let source = "MOV 4 R1\nMOV 4 R2\nJEQ R1 R2\nPRNT 1\nPRNT 2\nEOP";

    let mut emulator = load(source, TestIo::new());
    emulator.run().unwrap();

    assert_eq!(emulator.io.output(), &[Word::Int(2)]);
}

#[test]
fn test_jump_conditions() {
    let cases = [
        ("JEQ", 0, true),
        ("JEQ", 1, false),
        ("JNE", 1, true),
        ("JLT", 0, false),
        ("JLE", 0, true),
        ("JGT", 1, true),
        ("JGE", 0, true),
    ];

    for (mnemonic, value, taken) in cases.iter() {
        let source = format!("MOV {} R1\n{} R1 0 SKIP\nPRNT 1\nDEF SKIP\nEOP", value, mnemonic);

        let mut emulator = load(&source, TestIo::new());
        emulator.run().unwrap();

        let expected: &[Word] = if *taken { &[] } else { &[Word::Int(1)] };
        assert_eq!(emulator.io.output(), expected, "{} with {}", mnemonic, value);
    }
}

#[test]
fn test_push_pop() {
    let source = r#"
        PUSH 1
        PUSH 2
        PUSH 3
        TOP R4
        POP R1
        POP R2
        POP R3
        EOP
    "#;

    let mut emulator = load(source, TestIo::new());
    emulator.run().unwrap();

    assert_register!(emulator, reg::R1, 3);
    assert_register!(emulator, reg::R2, 2);
    assert_register!(emulator, reg::R3, 1);
    assert_register!(emulator, reg::R4, 3);
    assert_register!(emulator, reg::TSP, 111);
}

#[test]
fn test_stack_underflow() {
    let mut emulator = load("PUSH 1\nPOP R1\nPOP R2\nEOP", TestIo::new());

    let fault = emulator.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::StackUnderflow);
    assert_eq!(fault.stage, Stage::Decode);
    assert_eq!(fault.address, Some(2));
}

#[test]
fn test_push_with_stack_pointer_at_limit() {
    let source = r#"
        MOV 1 R1
        MOV 63 R2
        DEF DOUBLE
        MUL R1 2
        SUB R2 1
        JNE R2 0 DOUBLE
        SUB R1 1
        MOV R1 TSP
        PUSH 5
        EOP
    "#;

    let mut emulator = load(source, TestIo::new());
    let fault = emulator.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::StackOverflow);
    assert_eq!(fault.stage, Stage::Decode);
    assert_eq!(fault.address, Some(8));
    assert_register!(emulator, reg::TSP, i64::max_value());
}

#[test]
fn test_call_and_return() {
    let source = r#"
        CALL SUBROUTINE
        PRNT R1
        EOP
        DEF SUBROUTINE
        MOV 42 R1
        RET
    "#;

    let mut emulator = load(source, TestIo::new());
    emulator.run().unwrap();

    assert_eq!(emulator.io.output(), &[Word::Int(42)]);
    assert_register!(emulator, reg::TSP, 111);
}

#[test]
fn test_scan() {
    let io = TestIo::with_input(vec![Word::Int(7), Word::from_decimal(2.5)]);
    let mut emulator = load("SCAN R1\nSCAN R2\nSCAN R3\nPRNT R2\nADD R1 R1\nEOP", io);

    emulator.run().unwrap();

    assert_register!(emulator, reg::R1, 14);
    assert_register!(emulator, reg::R3, 0);
    assert_eq!(emulator.io.output(), &[Word::from_decimal(2.5)]);
}

#[test]
fn test_non_integer_operand() {
    let io = TestIo::with_input(vec![Word::from_decimal(2.5)]);
    let mut emulator = load("SCAN R1\nADD R1 1\nEOP", io);

    let fault = emulator.run().unwrap_err();
    assert_eq!(fault.kind, FaultKind::NonIntegerOperand);
}

#[test]
fn test_auto_increment() {
    let source = r#"
        MOV 40 I1
        MOV I1 R1
        MOV I1+ R2
        MOV -I1 R3
        EOP
    "#;

    let mut emulator = load(source, TestIo::new());
    emulator.run().unwrap();

    assert_register!(emulator, reg::R1, 40);
    assert_register!(emulator, reg::R2, 40);
    assert_register!(emulator, reg::R3, 40);
    assert_register!(emulator, reg::I1, 40);
}

#[test]
fn test_index_registers_are_writable() {
    let mut emulator = load("MOV 5 I1\nMOV I1+ R1\nADD I2 I1\nPRNT I1\nEOP", TestIo::new());

    emulator.run().unwrap();

    assert_register!(emulator, reg::R1, 5);
    assert_register!(emulator, reg::I1, 6);
    assert_register!(emulator, reg::I2, 6);
    assert_eq!(emulator.io.output(), &[Word::Int(6)]);
}

#[test]
fn test_write_to_immediate() {
    let mut emulator = load("MOV R1 5", TestIo::new());

    let fault = emulator.run().unwrap_err();
    assert_eq!(fault.kind, FaultKind::ImmediateNotWritable);
    assert_eq!(fault.stage, Stage::Writeback);
}

#[test]
fn test_memory_and_indirection() {
    let source = r#"
        MOV 200 R1
        MOV 9 *R1
        MOV M1 R2
        MOV 200 M2
        MOV [M2] R3
        MOV A1 R4
        EOP
    "#;

    let mut emulator = load(source, TestIo::new());
    emulator.machine.set_register(reg::A1, Word::Int(200)).unwrap();
    emulator.run().unwrap();

    assert_register!(emulator, reg::R2, 9);
    assert_register!(emulator, reg::R3, 9);
    assert_eq!(emulator.machine.load(201), Ok(Word::Int(200)));
    assert_register!(emulator, reg::R4, 9);
}

#[test]
fn test_running_off_memory() {
    let mut machine = Machine::new(Default::default()).unwrap();
    machine.set_pc(255).unwrap();

    let mut symbols = crate::symbol_table::SymbolTable::with_architecture(200);
    crate::assembler::assemble("PRNT 1", &mut symbols, &mut machine).unwrap();

    let mut emulator = Emulator::new(machine, TestIo::new());
    let fault = emulator.run().unwrap_err();

    assert_eq!(emulator.io.output(), &[Word::Int(1)]);
    assert_eq!(fault.stage, Stage::Fetch);
    assert_eq!(fault.address, None);
}

#[test]
fn test_malformed_word() {
    let mut machine = Machine::new(Default::default()).unwrap();
    machine.store(0, Word::Int(-1)).unwrap();

    let mut emulator = Emulator::new(machine, TestIo::new());
    let fault = emulator.step().unwrap_err();

    assert_eq!(fault.kind, FaultKind::MalformedWord(-1));
}

#[test]
fn test_unknown_opcode() {
    let mut machine = Machine::new(Default::default()).unwrap();
    machine.store(0, Word::Int(0b00_00101 << 25)).unwrap();

    let mut emulator = Emulator::new(machine, TestIo::new());
    let fault = emulator.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::UnknownOpcode { class: 0, category: 5 });
    assert_eq!(fault.stage, Stage::Decode);
    assert_eq!(fault.address, Some(0));
    assert!(emulator.halted);
    assert_eq!(emulator.io.faults(), &[fault]);
}

#[test]
fn test_events() {
    use crate::event::EventLog;

    let log = EventLog::new();

    let mut emulator = load("MOV 5 R1\nPRNT R1\nJMP END\nEOP\nDEF END\nEOP", TestIo::new());
    emulator.add_listener(log.clone());
    emulator.run().unwrap();

    assert_eq!(
        log.take(),
        vec![
            Event::RegisterChange { register: reg::R1, data: Word::Int(5) },
            Event::Output { data: Word::Int(5) },
            Event::RegisterChange { register: reg::PC, data: Word::Int(4) },
            Event::ControlTransfer { from: 2, to: 4 },
            Event::Halt,
        ],
    );
}
