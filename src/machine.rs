//! Machine state: configuration, register file and memory.

use std::fmt;

use crate::storage::{Bank, Storage, Word};
use crate::symbol_table::reg;
use crate::fault::FaultKind;

/// Memory addresses are eight bits wide.
pub const MAX_MEMORY: u16 = 256;

/// Register addresses range over `0..32`.
pub const MAX_REGISTERS: u16 = 32;

/// Geometry and initial pointer layout of a machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MachineConfig {
    /// Number of registers.
    pub registers: u16,

    /// Number of memory cells.
    pub memory: u16,

    /// Address of the first instruction. The program counter starts here.
    pub origin: u16,

    /// First cell of the stack region. `SPR` starts here and `TSP` one below it.
    pub stack_base: u16,

    /// First cell of the constant region. Also the exclusive upper limit of the stack.
    pub constants_base: u16,

    pub blocks_base: u16,

    /// First cell of the variable region. `M1`..`M7` live here.
    pub variables_base: u16,

    pub messages_base: u16,

    /// Added to the index register contents by indexed operands.
    pub index_displacement: i64,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            registers: MAX_REGISTERS,
            memory: MAX_MEMORY,
            origin: 0,
            stack_base: 112,
            constants_base: 152,
            blocks_base: 168,
            variables_base: 200,
            messages_base: 216,
            index_displacement: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Memory is empty or larger than eight bit addresses can reach.
    MemorySize(u16),

    /// The register file cannot hold the architectural registers, or is larger than the
    /// register address space.
    RegisterCount(u16),

    /// The stack region is empty or does not fit in memory.
    StackBounds {
        base: u16,
        limit: u16,
    },

    /// The origin is outside of memory.
    Origin(u16),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MemorySize(size) => write!(
                f,
                "memory size {} is not between 1 and {}",
                size, MAX_MEMORY,
            ),
            ConfigError::RegisterCount(count) => write!(
                f,
                "register count {} is not between {} and {}",
                count,
                reg::I2 + 1,
                MAX_REGISTERS,
            ),
            ConfigError::StackBounds { base, limit } => {
                write!(f, "invalid stack region {}..{}", base, limit)
            }
            ConfigError::Origin(origin) => write!(f, "origin {} is outside of memory", origin),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MachineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory == 0 || self.memory > MAX_MEMORY {
            return Err(ConfigError::MemorySize(self.memory));
        }

        if self.registers <= reg::I2 || self.registers > MAX_REGISTERS {
            return Err(ConfigError::RegisterCount(self.registers));
        }

        if self.stack_base >= self.constants_base || self.constants_base > self.memory {
            return Err(ConfigError::StackBounds {
                base: self.stack_base,
                limit: self.constants_base,
            });
        }

        if self.origin >= self.memory {
            return Err(ConfigError::Origin(self.origin));
        }

        Ok(())
    }

    /// Exclusive upper limit of the stack region.
    pub fn stack_limit(&self) -> u16 {
        self.constants_base
    }

    /// Registers which start out non-zero, with their initial values.
    pub fn initial_registers(&self) -> Vec<(u16, i64)> {
        let region = |base: u16| (base as i64, base as i64 - 1);

        let mut values = vec![(reg::PC, self.origin as i64)];

        for (pointer, next, base) in &[
            (reg::SPR, reg::TSP, self.stack_base),
            (reg::CPR, reg::NCP, self.constants_base),
            (reg::BPR, reg::NBP, self.blocks_base),
            (reg::VPR, reg::NVP, self.variables_base),
            (reg::MPR, reg::NMP, self.messages_base),
        ] {
            let (start, empty) = region(*base);
            values.push((*pointer, start));
            values.push((*next, empty));
        }

        values
    }
}

/// One of the two disjoint address spaces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    Register,
    Memory,
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressSpace::Register => write!(f, "register"),
            AddressSpace::Memory => write!(f, "memory"),
        }
    }
}

/// Effective location of an operand.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Location {
    Register(u16),
    Memory(u16),

    /// A value with no backing cell.
    Immediate(i64),
}

impl Location {
    /// The address space of the location, or `None` for immediates.
    pub fn space(&self) -> Option<AddressSpace> {
        match self {
            Location::Register(_) => Some(AddressSpace::Register),
            Location::Memory(_) => Some(AddressSpace::Memory),
            Location::Immediate(_) => None,
        }
    }
}

/// A register file and a memory, each bounded by the [MachineConfig].
#[derive(Clone, Debug)]
pub struct Machine<S = Bank> {
    registers: S,
    memory: S,
    config: MachineConfig,
}

impl Machine<Bank> {
    /// Creates a machine with dense storage, sized by `config`.
    pub fn new(config: MachineConfig) -> Result<Machine<Bank>, ConfigError> {
        Machine::with_storage(config, Bank::new(), Bank::new())
    }
}

impl<S> Machine<S>
where
    S: Storage,
{
    /// Creates a machine on top of caller provided storage. Both storages are grown to the
    /// configured size.
    pub fn with_storage(
        config: MachineConfig,
        mut registers: S,
        mut memory: S,
    ) -> Result<Machine<S>, ConfigError> {
        config.validate()?;

        registers.grow(config.registers as usize);
        memory.grow(config.memory as usize);

        let mut machine = Machine {
            registers,
            memory,
            config,
        };

        machine.reset_registers();

        Ok(machine)
    }

    /// Zeroes every register and then sets the program counter and region pointers to their
    /// initial values. Memory is left untouched.
    pub fn reset_registers(&mut self) {
        for address in 0..self.config.registers {
            self.registers.store(address, Word::default());
        }

        for (register, value) in self.config.initial_registers() {
            self.registers.store(register, Word::Int(value));
        }
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    fn check_register(&self, address: u16) -> Result<(), FaultKind> {
        if address < self.config.registers {
            Ok(())
        } else {
            Err(FaultKind::InvalidAddress {
                space: AddressSpace::Register,
                address: address as i64,
            })
        }
    }

    pub fn register(&mut self, address: u16) -> Result<Word, FaultKind> {
        self.check_register(address)?;
        Ok(self.registers.load(address))
    }

    /// Reads a register that must hold an integer.
    pub fn register_int(&mut self, address: u16) -> Result<i64, FaultKind> {
        self.register(address)?
            .as_int()
            .ok_or(FaultKind::NonIntegerOperand)
    }

    pub fn set_register(&mut self, address: u16, value: Word) -> Result<(), FaultKind> {
        self.check_register(address)?;
        self.registers.store(address, value);
        Ok(())
    }

    /// Checks that `address` is inside memory.
    pub fn memory_address(&self, address: i64) -> Result<u16, FaultKind> {
        if address >= 0 && address < self.config.memory as i64 {
            Ok(address as u16)
        } else {
            Err(FaultKind::InvalidAddress {
                space: AddressSpace::Memory,
                address,
            })
        }
    }

    /// Interprets a word as a memory address.
    pub fn word_address(&self, word: Word) -> Result<u16, FaultKind> {
        let address = word.as_int().ok_or(FaultKind::NonIntegerOperand)?;
        self.memory_address(address)
    }

    pub fn load(&mut self, address: i64) -> Result<Word, FaultKind> {
        let address = self.memory_address(address)?;
        Ok(self.memory.load(address))
    }

    pub fn store(&mut self, address: i64, value: Word) -> Result<(), FaultKind> {
        let address = self.memory_address(address)?;
        self.memory.store(address, value);
        Ok(())
    }

    /// Reads the value at an effective location.
    pub fn read(&mut self, location: Location) -> Result<Word, FaultKind> {
        match location {
            Location::Register(address) => self.register(address),
            Location::Memory(address) => self.load(address as i64),
            Location::Immediate(value) => Ok(Word::Int(value)),
        }
    }

    /// Writes a value to an effective location. Immediates are not writable.
    pub fn write(&mut self, location: Location, value: Word) -> Result<(), FaultKind> {
        match location {
            Location::Register(address) => self.set_register(address, value),
            Location::Memory(address) => self.store(address as i64, value),
            Location::Immediate(_) => Err(FaultKind::ImmediateNotWritable),
        }
    }

    /// Value of the program counter.
    pub fn pc(&mut self) -> Result<i64, FaultKind> {
        self.register_int(reg::PC)
    }

    pub fn set_pc(&mut self, address: i64) -> Result<(), FaultKind> {
        self.set_register(reg::PC, Word::Int(address))
    }

    pub fn registers(&self) -> &S {
        &self.registers
    }

    pub fn memory(&self) -> &S {
        &self.memory
    }
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(MachineConfig::default().validate(), Ok(()));
}

#[test]
fn test_invalid_configs() {
    let config = MachineConfig { memory: 300, ..Default::default() };
    assert_eq!(config.validate(), Err(ConfigError::MemorySize(300)));

    let config = MachineConfig { registers: 8, ..Default::default() };
    assert_eq!(config.validate(), Err(ConfigError::RegisterCount(8)));

    let config = MachineConfig { stack_base: 160, ..Default::default() };
    assert_eq!(
        config.validate(),
        Err(ConfigError::StackBounds { base: 160, limit: 152 }),
    );

    let config = MachineConfig {
        memory: 64,
        stack_base: 32,
        constants_base: 48,
        origin: 64,
        ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::Origin(64)));
}

#[test]
fn test_initial_registers() {
    let mut machine = Machine::new(MachineConfig::default()).unwrap();

    assert_eq!(machine.pc(), Ok(0));
    assert_eq!(machine.register(reg::SPR), Ok(Word::Int(112)));
    assert_eq!(machine.register(reg::TSP), Ok(Word::Int(111)));
    assert_eq!(machine.register(reg::VPR), Ok(Word::Int(200)));
    assert_eq!(machine.register(reg::NMP), Ok(Word::Int(215)));
    assert_eq!(machine.register(reg::R1), Ok(Word::Int(0)));
}

#[test]
fn test_bounds() {
    let mut machine = Machine::new(MachineConfig::default()).unwrap();

    assert_eq!(machine.load(255), Ok(Word::Int(0)));
    assert_eq!(
        machine.load(256),
        Err(FaultKind::InvalidAddress { space: AddressSpace::Memory, address: 256 }),
    );
    assert_eq!(
        machine.store(-1, Word::Int(1)),
        Err(FaultKind::InvalidAddress { space: AddressSpace::Memory, address: -1 }),
    );
    assert_eq!(
        machine.register(32),
        Err(FaultKind::InvalidAddress { space: AddressSpace::Register, address: 32 }),
    );
    assert_eq!(
        machine.write(Location::Immediate(3), Word::Int(1)),
        Err(FaultKind::ImmediateNotWritable),
    );
}

#[test]
fn test_sparse_machine() {
    use std::collections::HashMap;

    let mut machine: Machine<HashMap<u16, Word>> =
        Machine::with_storage(MachineConfig::default(), HashMap::new(), HashMap::new()).unwrap();

    machine.write(Location::Memory(200), Word::Int(7)).unwrap();
    assert_eq!(machine.read(Location::Memory(200)), Ok(Word::Int(7)));
    assert_eq!(machine.read(Location::Immediate(9)), Ok(Word::Int(9)));
}
