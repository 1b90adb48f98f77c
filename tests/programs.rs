use isa32::{
    assembler::{assemble, Assembly},
    emulator::{Emulator, TestIo},
    fault::{FaultKind, Stage},
    machine::{Machine, MachineConfig},
    storage::{Bank, Word},
    symbol_table::{reg, SymbolTable},
};

macro_rules! assert_register {
    ($emulator:expr, $register:expr, $value:expr) => {
        assert_eq!(
            $emulator.machine.register($register),
            Ok(Word::Int($value)),
            "register {}",
            $register,
        );
    };
}

macro_rules! assert_memory {
    ($emulator:expr, $address:expr, $value:expr) => {
        assert_eq!(
            $emulator.machine.load($address),
            Ok(Word::Int($value)),
            "memory address {}",
            $address,
        );
    };
}

fn load_with_config(
    source: &str,
    config: MachineConfig,
    io: TestIo,
) -> (Assembly, Emulator<Bank, TestIo>) {
    let mut machine = Machine::new(config).expect("invalid machine configuration");
    let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);

    let assembly = assemble(source, &mut symbols, &mut machine).expect("could not assemble");

    (assembly, Emulator::new(machine, io))
}

fn load(source: &str, io: TestIo) -> Emulator<Bank, TestIo> {
    load_with_config(source, MachineConfig::default(), io).1
}

fn ints(values: &[i64]) -> Vec<Word> {
    values.iter().map(|value| Word::Int(*value)).collect()
}

#[test]
fn test_sum() {
    let io = TestIo::with_input(ints(&[3, 4, 5, 0]));
    let mut e = load(include_str!("sum.asm"), io);

    e.run().unwrap();

    assert_eq!(e.io.into_output(), ints(&[12]));
}

#[test]
fn test_sum_of_nothing() {
    let mut e = load(include_str!("sum.asm"), TestIo::new());

    e.run().unwrap();

    assert_eq!(e.io.output(), &[Word::Int(0)]);
}

#[test]
fn test_factorial() {
    for (n, expected) in &[(0, 1), (1, 1), (5, 120), (10, 3_628_800)] {
        let io = TestIo::with_input(ints(&[*n]));
        let mut e = load(include_str!("factorial.asm"), io);

        e.run().unwrap();

        assert_eq!(e.io.output(), &[Word::Int(*expected)], "{}!", n);
        assert_register!(e, reg::TSP, 111);
    }
}

#[test]
fn test_squares() {
    let mut e = load(include_str!("squares.asm"), TestIo::new());

    e.run().unwrap();

    assert_eq!(e.io.output(), &[Word::Int(55)]);

    for (offset, square) in [1, 4, 9, 16, 25].iter().enumerate() {
        assert_memory!(e, 200 + offset as i64, *square);
    }

    assert_memory!(e, 205, 0);
}

#[test]
fn test_stepping() {
    let mut e = load("MOV 10 R1\nMOV 20 R2\nADD R1 R2\nPRNT R1\nEOP", TestIo::new());

    e.step().unwrap();
    assert_register!(e, reg::R1, 10);
    assert_register!(e, reg::PC, 1);

    e.step().unwrap();
    e.step().unwrap();
    assert_register!(e, reg::R1, 30);
    assert_register!(e, reg::R2, 20);
    assert!(e.io.output().is_empty());

    e.run().unwrap();
    assert_eq!(e.io.output(), &[Word::Int(30)]);
}

#[test]
fn test_run_for() {
    use isa32::fault::Outcome;

    let mut e = load("DEF LOOP\nADD R1 1\nJMP LOOP", TestIo::new());

    assert_eq!(e.run_for(10), Ok(Outcome::Continue));
    assert_register!(e, reg::R1, 5);
    assert!(!e.halted);
}

#[test]
fn test_origin() {
    let config = MachineConfig {
        origin: 40,
        ..Default::default()
    };

    let (assembly, mut e) = load_with_config("JMP END\nPRNT 1\nDEF END\nPRNT 2\nEOP", config, TestIo::new());

    assert_eq!(assembly.origin, 40);
    assert_eq!(assembly.source_map.get_source_line(42), Some(4));

    e.run().unwrap();

    assert_eq!(e.io.output(), &[Word::Int(2)]);
    assert_register!(e, reg::PC, 44);
}

#[test]
fn test_runaway_recursion() {
    let (assembly, mut e) =
        load_with_config("# never returns\nDEF LOOP\nCALL LOOP", MachineConfig::default(), TestIo::new());

    let fault = e.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::StackOverflow);
    assert_eq!(fault.stage, Stage::Decode);
    assert_eq!(fault.address, Some(0));
    assert_eq!(assembly.source_map.get_source_line(0), Some(3));
    assert_register!(e, reg::TSP, 151);
    assert_eq!(e.io.faults(), &[fault]);
}

#[test]
fn test_fault_keeps_committed_effects() {
    let mut e = load("MOV 7 R1\nPUSH R1\nPOP R2\nMOV I1+ R3\nDIV R1 0", TestIo::new());

    let fault = e.run().unwrap_err();

    assert_eq!(fault.kind, FaultKind::DivisionByZero);
    assert_register!(e, reg::R2, 7);
    assert_register!(e, reg::R3, 0);
    assert_register!(e, reg::I1, 1);
    assert_memory!(e, 112, 7);
    assert!(e.halted);
}

#[test]
fn test_sparse_memory() {
    use std::collections::HashMap;

    let mut machine: Machine<HashMap<u16, Word>> =
        Machine::with_storage(MachineConfig::default(), HashMap::new(), HashMap::new()).unwrap();
    let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);

    assemble("MOV 3 M7\nADD M7 M7\nPRNT M7\nEOP", &mut symbols, &mut machine).unwrap();

    let mut e = Emulator::new(machine, TestIo::new());
    e.run().unwrap();

    assert_eq!(e.io.output(), &[Word::Int(6)]);
    assert_memory!(e, 206, 6);
}

#[test]
fn test_decimal_output() {
    let io = TestIo::with_input(vec![Word::from_decimal(0.5)]);
    let mut e = load("SCAN M1\nPRNT M1\nEOP", io);

    e.run().unwrap();

    assert_eq!(e.io.output(), &[Word::from_decimal(0.5)]);
    assert_eq!(e.io.output()[0].to_string(), "0.5");
}
