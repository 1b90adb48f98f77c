//! Mapping from names to addresses in the register and memory address spaces.

use std::collections::HashMap;
use std::fmt;

/// Addresses of the architectural registers.
pub mod reg {
    pub const R1: u16 = 1;
    pub const R2: u16 = 2;
    pub const R3: u16 = 3;
    pub const R4: u16 = 4;
    pub const R5: u16 = 5;
    pub const R6: u16 = 6;
    pub const R7: u16 = 7;

    /// Base register.
    pub const BR: u16 = 8;
    pub const DR1: u16 = 9;
    pub const DR2: u16 = 10;
    /// Flag register.
    pub const FR: u16 = 11;
    /// Instruction register. Holds the address of the instruction being executed.
    pub const IR: u16 = 12;
    /// Program counter. Holds the address of the next instruction.
    pub const PC: u16 = 13;
    /// Stack base pointer.
    pub const SPR: u16 = 14;
    /// Top-of-stack pointer.
    pub const TSP: u16 = 15;
    /// Constant region pointer and its "next" pointer.
    pub const CPR: u16 = 16;
    pub const NCP: u16 = 17;
    /// Block region pointer and its "next" pointer.
    pub const BPR: u16 = 18;
    pub const NBP: u16 = 19;
    /// Variable region pointer and its "next" pointer.
    pub const VPR: u16 = 20;
    pub const NVP: u16 = 21;
    /// Message region pointer and its "next" pointer.
    pub const MPR: u16 = 22;
    pub const NMP: u16 = 23;

    pub const A1: u16 = 24;
    pub const A2: u16 = 25;
    pub const A3: u16 = 26;
    pub const A4: u16 = 27;

    pub const I1: u16 = 28;
    pub const I2: u16 = 29;
}

/// Every named register and its address.
pub const ARCHITECTURAL_REGISTERS: [(&str, u16); 29] = [
    ("R1", reg::R1),
    ("R2", reg::R2),
    ("R3", reg::R3),
    ("R4", reg::R4),
    ("R5", reg::R5),
    ("R6", reg::R6),
    ("R7", reg::R7),
    ("BR", reg::BR),
    ("DR1", reg::DR1),
    ("DR2", reg::DR2),
    ("FR", reg::FR),
    ("IR", reg::IR),
    ("PC", reg::PC),
    ("SPR", reg::SPR),
    ("TSP", reg::TSP),
    ("CPR", reg::CPR),
    ("NCP", reg::NCP),
    ("BPR", reg::BPR),
    ("NBP", reg::NBP),
    ("VPR", reg::VPR),
    ("NVP", reg::NVP),
    ("MPR", reg::MPR),
    ("NMP", reg::NMP),
    ("A1", reg::A1),
    ("A2", reg::A2),
    ("A3", reg::A3),
    ("A4", reg::A4),
    ("I1", reg::I1),
    ("I2", reg::I2),
];

/// Number of predefined memory variables (`M1`..`M7`).
pub const MEMORY_VARIABLES: u16 = 7;

/// Returns the architectural name of a register address.
pub fn register_name(address: u16) -> Option<&'static str> {
    ARCHITECTURAL_REGISTERS
        .iter()
        .find(|(_, a)| *a == address)
        .map(|(name, _)| *name)
}

/// The address space a symbol lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A register address.
    Register,

    /// A data cell in memory.
    Memory,

    /// An instruction address in memory, defined by a `DEF`/`DEB` marker.
    Label,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolKind::Register => write!(f, "register"),
            SymbolKind::Memory => write!(f, "memory"),
            SymbolKind::Label => write!(f, "label"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub address: u16,
    pub kind: SymbolKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolError {
    /// The name is not bound.
    UndefinedSymbol(String),

    /// The name is already bound to a different address.
    DuplicateSymbol {
        name: String,
        existing: u16,
        requested: u16,
    },
}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SymbolError::UndefinedSymbol(name) => write!(f, "undefined symbol '{}'", name),
            SymbolError::DuplicateSymbol { name, existing, requested } => write!(
                f,
                "symbol '{}' is already defined at {} (redefined at {})",
                name, existing, requested,
            ),
        }
    }
}

impl std::error::Error for SymbolError {}

#[derive(Default, Debug, Clone)]
pub struct SymbolTable {
    inner: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    pub fn new() -> SymbolTable {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Creates a symbol table containing the architectural registers and the memory variables
    /// `M1`..`M7`, the latter starting at `variables_base`.
    pub fn with_architecture(variables_base: u16) -> SymbolTable {
        let mut table = SymbolTable::new();

        for (name, address) in ARCHITECTURAL_REGISTERS.iter() {
            table.insert(name, *address, SymbolKind::Register);
        }

        for i in 0..MEMORY_VARIABLES {
            table.insert(&format!("M{}", i + 1), variables_base + i, SymbolKind::Memory);
        }

        table
    }

    fn insert(&mut self, name: &str, address: u16, kind: SymbolKind) {
        self.inner.insert(name.to_string(), Symbol { address, kind });
    }

    /// Binds `name` to `address`.
    ///
    /// Defining a name again with the same address is allowed and keeps the original binding.
    pub fn define<S: Into<String>>(
        &mut self,
        name: S,
        address: u16,
        kind: SymbolKind,
    ) -> Result<Symbol, SymbolError> {
        let name = name.into();

        if let Some(existing) = self.inner.get(&name) {
            if existing.address != address {
                return Err(SymbolError::DuplicateSymbol {
                    name,
                    existing: existing.address,
                    requested: address,
                });
            }

            return Ok(*existing);
        }

        let symbol = Symbol { address, kind };
        self.inner.insert(name, symbol);

        Ok(symbol)
    }

    pub fn resolve<S: AsRef<str>>(&self, name: S) -> Result<Symbol, SymbolError> {
        self.get(name.as_ref())
            .ok_or_else(|| SymbolError::UndefinedSymbol(name.as_ref().to_string()))
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<Symbol> {
        self.inner.get(name.as_ref()).copied()
    }

    /// Iterates over all symbols of the given kind.
    pub fn iter_kind(&self, kind: SymbolKind) -> impl Iterator<Item = (&str, u16)> {
        self.inner
            .iter()
            .filter(move |(_, symbol)| symbol.kind == kind)
            .map(|(name, symbol)| (name.as_str(), symbol.address))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[test]
fn test_architecture_is_predefined() {
    let table = SymbolTable::with_architecture(200);

    assert_eq!(table.resolve("PC"), Ok(Symbol { address: reg::PC, kind: SymbolKind::Register }));
    assert_eq!(table.resolve("R7").map(|s| s.address), Ok(7));
    assert_eq!(table.resolve("M1"), Ok(Symbol { address: 200, kind: SymbolKind::Memory }));
    assert_eq!(table.resolve("M7").map(|s| s.address), Ok(206));
    assert_eq!(table.iter_kind(SymbolKind::Register).count(), ARCHITECTURAL_REGISTERS.len());
}

#[test]
fn test_register_addresses_are_distinct() {
    for (i, (a, address_a)) in ARCHITECTURAL_REGISTERS.iter().enumerate() {
        for (b, address_b) in &ARCHITECTURAL_REGISTERS[i + 1..] {
            assert_ne!(address_a, address_b, "{} and {} share an address", a, b);
        }
        assert!(*address_a < 32);
    }
}

#[test]
fn test_define_and_resolve() {
    let mut table = SymbolTable::new();

    assert_eq!(
        table.resolve("LOOP"),
        Err(SymbolError::UndefinedSymbol("LOOP".to_string())),
    );

    table.define("LOOP", 4, SymbolKind::Label).unwrap();
    assert_eq!(table.resolve("LOOP").map(|s| s.address), Ok(4));

    // Same address is fine.
    assert!(table.define("LOOP", 4, SymbolKind::Label).is_ok());

    assert_eq!(
        table.define("LOOP", 5, SymbolKind::Label),
        Err(SymbolError::DuplicateSymbol {
            name: "LOOP".to_string(),
            existing: 4,
            requested: 5,
        }),
    );
}
