use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use slog::{o, Drain, Logger};
use slog_term::{FullFormat, PlainSyncDecorator, TermDecorator};

use isa32::{
    assembler::assemble_with_logger,
    emulator::{Emulator, TestIo},
    fault::FaultKind,
    machine::Machine,
    storage::Word,
    symbol_table::SymbolTable,
};

/// Log sink shared between the drain and the test.
#[derive(Clone, Default)]
struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_terminal_logger() {
    let decorator = TermDecorator::new().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = Logger::root(drain, o!());

    let mut machine = Machine::new(Default::default()).unwrap();
    let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);

    let source = "MOV 3 R1\nDEF LOOP\nPRNT R1\nSUB R1 1\nJNE R1 0 LOOP\nEOP";
    assemble_with_logger(source, &mut symbols, &mut machine, logger.clone()).unwrap();

    let mut emulator = Emulator::with_logger(machine, TestIo::new(), logger);
    emulator.run().unwrap();

    assert_eq!(
        emulator.io.output(),
        &[Word::Int(3), Word::Int(2), Word::Int(1)],
    );
}

#[test]
fn test_fault_is_logged() {
    let buffer = Buffer::default();

    let decorator = PlainSyncDecorator::new(buffer.clone());
    let drain = FullFormat::new(decorator).build().fuse();
    let logger = Logger::root(drain, o!());

    let mut machine = Machine::new(Default::default()).unwrap();
    let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);

    assemble_with_logger("MOV 1 R1\nPOP R2", &mut symbols, &mut machine, logger.clone()).unwrap();

    let mut emulator = Emulator::new(machine, TestIo::new());
    emulator.set_logger(logger);

    let fault = emulator.run().unwrap_err();
    assert_eq!(fault.kind, FaultKind::StackUnderflow);

    let log = buffer.contents();

    assert!(log.contains("StackUnderflow"), "{}", log);
    assert!(log.contains("stage: execution"), "{}", log);
}
