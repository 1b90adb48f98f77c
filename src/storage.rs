//! Uniform cell storage backing both the register file and memory.

use std::collections::HashMap;
use std::fmt;

/// Value of a single storage cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Word {
    /// An integer, including instruction words.
    Int(i64),

    /// The IEEE-754 single precision bit pattern of a decimal value.
    Encoded(u32),
}

impl Default for Word {
    fn default() -> Word {
        Word::Int(0)
    }
}

impl Word {
    pub fn from_decimal(value: f32) -> Word {
        Word::Encoded(value.to_bits())
    }

    /// Returns the integer value, or `None` for an encoded decimal.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Word::Int(value) => Some(*value),
            Word::Encoded(_) => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f32> {
        match self {
            Word::Encoded(bits) => Some(f32::from_bits(*bits)),
            Word::Int(_) => None,
        }
    }

    pub fn is_encoded(&self) -> bool {
        match self {
            Word::Encoded(_) => true,
            Word::Int(_) => false,
        }
    }
}

impl From<i64> for Word {
    fn from(value: i64) -> Word {
        Word::Int(value)
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Word {
        Word::Int(value as i64)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Word::Int(value) => write!(f, "{}", value),
            Word::Encoded(bits) => write!(f, "{}", f32::from_bits(*bits)),
        }
    }
}

/// Interface of a cell array.
///
/// Cells that have never been stored to read as zero. Implementations are not responsible for
/// bounds; the [Machine](crate::machine::Machine) checks addresses against its configuration
/// before calling into storage.
pub trait Storage {
    /// Returns the value at `address`, zero-initializing the cell if needed.
    fn load(&mut self, address: u16) -> Word;

    /// Overwrites the value at `address`.
    fn store(&mut self, address: u16, value: Word);

    /// Makes room for at least `size` cells.
    fn grow(&mut self, size: usize);
}

/// Dense, vector backed storage.
#[derive(Clone, Debug, Default)]
pub struct Bank {
    cells: Vec<Word>,
}

impl Bank {
    pub fn new() -> Bank {
        Bank { cells: Vec::new() }
    }

    pub fn with_size(size: usize) -> Bank {
        Bank {
            cells: vec![Word::default(); size],
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn as_slice(&self) -> &[Word] {
        &self.cells[..]
    }
}

impl Storage for Bank {
    fn load(&mut self, address: u16) -> Word {
        let index = address as usize;

        if index >= self.cells.len() {
            self.grow(index + 1);
        }

        self.cells[index]
    }

    fn store(&mut self, address: u16, value: Word) {
        let index = address as usize;

        if index >= self.cells.len() {
            self.grow(index + 1);
        }

        self.cells[index] = value;
    }

    fn grow(&mut self, size: usize) {
        if size > self.cells.len() {
            self.cells.resize(size, Word::default());
        }
    }
}

/// Sparse storage. Only cells that have been touched take up space.
impl Storage for HashMap<u16, Word> {
    fn load(&mut self, address: u16) -> Word {
        *self.entry(address).or_insert_with(Word::default)
    }

    fn store(&mut self, address: u16, value: Word) {
        self.insert(address, value);
    }

    fn grow(&mut self, size: usize) {
        self.reserve(size.saturating_sub(self.len()));
    }
}

#[test]
fn test_bank_zero_initializes() {
    let mut bank = Bank::new();

    assert_eq!(bank.load(17), Word::Int(0));
    assert_eq!(bank.len(), 18);

    bank.store(3, Word::Int(-5));
    assert_eq!(bank.load(3), Word::Int(-5));

    bank.grow(4);
    assert_eq!(bank.len(), 18);
}

#[test]
fn test_sparse_storage() {
    let mut map: HashMap<u16, Word> = HashMap::new();

    assert_eq!(map.load(200), Word::Int(0));

    map.store(200, Word::from_decimal(2.5));
    assert_eq!(map.load(200).as_decimal(), Some(2.5));
    assert_eq!(map.load(200).as_int(), None);
}

#[test]
fn test_word_display() {
    assert_eq!(Word::Int(-12).to_string(), "-12");
    assert_eq!(Word::from_decimal(2.5).to_string(), "2.5");
}
