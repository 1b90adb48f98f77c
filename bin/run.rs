use std::convert::TryFrom;

use clap::{App, Arg, ArgMatches};
use slog::{o, Discard, Drain, Level, Logger};
use slog_term::{FullFormat, TermDecorator};

use isa32::{
    assembler::{assemble_with_logger, Assembly},
    emulator::{Emulator, StdIo},
    error::AssemblyError,
    fault::Fault,
    machine::{ConfigError, Machine, MachineConfig},
    parsing::parse_integer,
    symbol_table::SymbolTable,
};

enum Error {
    IO(std::io::Error),
    Argument(&'static str, String),
    Config(ConfigError),
    Assembly(AssemblyError),
    Execution(Fault, Option<usize>),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::IO(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Error {
        Error::Config(e)
    }
}

impl From<AssemblyError> for Error {
    fn from(e: AssemblyError) -> Error {
        Error::Assembly(e)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("isa32run")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Utility for assembling and executing programs")
        .arg(Arg::with_name("source")
             .help("File containing assembly source")
             .value_name("SOURCE")
             .required(true)
             .index(1))
        .arg(Arg::with_name("origin")
             .help("Address of the first instruction")
             .long("origin")
             .value_name("ADDRESS")
             .takes_value(true))
        .arg(Arg::with_name("memory")
             .help("Number of memory cells")
             .long("memory")
             .value_name("CELLS")
             .takes_value(true))
        .arg(Arg::with_name("trace")
             .help("Logs every assembled word and executed instruction")
             .long("trace"))
        .get_matches()
}

fn numeric_argument(args: &ArgMatches, name: &'static str, default: u16) -> Result<u16, Error> {
    let value = match args.value_of(name) {
        Some(value) => value,
        None => return Ok(default),
    };

    parse_integer(value)
        .ok()
        .and_then(|number| u16::try_from(number).ok())
        .ok_or_else(|| Error::Argument(name, value.to_string()))
}

fn build_logger(trace: bool) -> Logger {
    if !trace {
        return Logger::root(Discard, o!());
    }

    let decorator = TermDecorator::new().stderr().build();
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(Level::Trace).fuse();

    Logger::root(drain, o!())
}

fn main() {
    let args = parse_arguments();

    match run(&args) {
        Ok(()) => (),
        Err(Error::IO(io)) => eprintln!("IO error: {}", io),
        Err(Error::Argument(name, value)) => eprintln!("Invalid value for --{}: {}", name, value),
        Err(Error::Config(err)) => eprintln!("Invalid machine configuration: {}", err),
        Err(Error::Assembly(err)) => eprintln!("Assembly error: {}", err),
        Err(Error::Execution(fault, Some(line))) => {
            eprintln!("Execution stopped by {} on line {}", fault.kind.name(), line)
        }
        Err(Error::Execution(fault, None)) => eprintln!("Execution stopped by {}", fault.kind.name()),
    }
}

fn run(args: &ArgMatches) -> Result<(), Error> {
    let file_path = args.value_of("source").unwrap_or_default();
    let source = std::fs::read_to_string(file_path)?;

    let defaults = MachineConfig::default();
    let config = MachineConfig {
        origin: numeric_argument(args, "origin", defaults.origin)?,
        memory: numeric_argument(args, "memory", defaults.memory)?,
        ..defaults
    };

    let logger = build_logger(args.is_present("trace"));

    let mut machine = Machine::new(config)?;
    let mut symbols = SymbolTable::with_architecture(machine.config().variables_base);

    let Assembly { source_map, .. } =
        assemble_with_logger(&source, &mut symbols, &mut machine, logger.clone())?;

    let mut emulator = Emulator::with_logger(machine, StdIo, logger);

    emulator.run().map_err(|fault| {
        let line = fault
            .address
            .and_then(|address| source_map.get_source_line(address));

        Error::Execution(fault, line)
    })
}
