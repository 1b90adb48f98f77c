//! Operand resolution.
//!
//! [resolve] turns an addressing mode and its operand field into an effective [Location].
//! Resolution itself only reads machine state; register updates that a mode implies are
//! returned as [SideEffect]s which the caller applies exactly once, right after resolving.

use crate::instruction::{Mode, Operand, StackOp, AUTO_DECREMENT_FLAG};
use crate::machine::{Location, Machine};
use crate::storage::{Storage, Word};
use crate::symbol_table::reg;
use crate::fault::FaultKind;

/// A register update implied by an addressing mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SideEffect {
    /// Add `delta` to an integer register. Index registers wrap like arithmetic; the stack
    /// pointer faults instead.
    AdjustRegister {
        register: u16,
        delta: i64,
    },
}

impl SideEffect {
    /// Applies the effect. Returns the changed register and its new value.
    pub fn apply<S: Storage>(&self, machine: &mut Machine<S>) -> Result<(u16, Word), FaultKind> {
        match *self {
            SideEffect::AdjustRegister { register, delta } => {
                let current = machine.register_int(register)?;

                let next = if register == reg::TSP {
                    current.checked_add(delta).ok_or(if delta > 0 {
                        FaultKind::StackOverflow
                    } else {
                        FaultKind::StackUnderflow
                    })?
                } else {
                    current.wrapping_add(delta)
                };

                let value = Word::Int(next);
                machine.set_register(register, value)?;
                Ok((register, value))
            }
        }
    }
}

/// The effective location of an operand and the side effects of resolving it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub location: Location,
    pub effects: Vec<SideEffect>,
}

impl Resolution {
    fn at(location: Location) -> Resolution {
        Resolution {
            location,
            effects: Vec::new(),
        }
    }

    fn with_effect(location: Location, register: u16, delta: i64) -> Resolution {
        Resolution {
            location,
            effects: vec![SideEffect::AdjustRegister { register, delta }],
        }
    }
}

/// Resolves `operand` against the current machine state.
///
/// | mode | location |
/// |---|---|
/// | register | the register |
/// | register indirect | memory at the register contents |
/// | immediate | the operand value |
/// | indirect | memory at the address stored in memory at the operand |
/// | indexed | memory at the register contents plus the configured displacement |
/// | auto-increment | the register contents as a value; the register is then incremented |
/// | auto-decrement | the register contents minus one; the register is decremented |
/// | direct | memory at the operand |
/// | stack | the new top for `PUSH`, the current top for `POP` and `TOP` |
pub fn resolve<S: Storage>(
    machine: &mut Machine<S>,
    operand: Operand,
) -> Result<Resolution, FaultKind> {
    let value = operand.value as u16;

    let resolution = match operand.mode {
        Mode::Register => {
            machine.register(value)?;
            Resolution::at(Location::Register(value))
        }
        Mode::RegisterIndirect => {
            let pointer = machine.register(value)?;
            Resolution::at(Location::Memory(machine.word_address(pointer)?))
        }
        Mode::Immediate => Resolution::at(Location::Immediate(value as i64)),
        Mode::Indirect => {
            let pointer = machine.load(value as i64)?;
            Resolution::at(Location::Memory(machine.word_address(pointer)?))
        }
        Mode::Indexed => {
            let base = machine.register_int(value)?;
            let address =
                machine.memory_address(base.saturating_add(machine.config().index_displacement))?;
            Resolution::at(Location::Memory(address))
        }
        Mode::AutoIncrement => {
            let register = (operand.value & !AUTO_DECREMENT_FLAG) as u16;
            let current = machine.register_int(register)?;

            if operand.value & AUTO_DECREMENT_FLAG != 0 {
                Resolution::with_effect(Location::Immediate(current.wrapping_sub(1)), register, -1)
            } else {
                Resolution::with_effect(Location::Immediate(current), register, 1)
            }
        }
        Mode::Direct => Resolution::at(Location::Memory(machine.memory_address(value as i64)?)),
        Mode::Stack => resolve_stack(machine, operand.value)?,
    };

    Ok(resolution)
}

fn resolve_stack<S: Storage>(
    machine: &mut Machine<S>,
    selector: u8,
) -> Result<Resolution, FaultKind> {
    let op = StackOp::from_byte(selector).ok_or(FaultKind::InvalidStackSelector(selector))?;

    let top = machine.register_int(reg::TSP)?;
    let base = machine.register_int(reg::SPR)?;

    match op {
        StackOp::Push => {
            let next = top.checked_add(1).ok_or(FaultKind::StackOverflow)?;

            if next >= machine.config().stack_limit() as i64 {
                return Err(FaultKind::StackOverflow);
            }

            let address = machine.memory_address(next)?;
            Ok(Resolution::with_effect(Location::Memory(address), reg::TSP, 1))
        }
        StackOp::Pop | StackOp::Top => {
            if top < base {
                return Err(FaultKind::StackUnderflow);
            }

            let address = machine.memory_address(top)?;

            if op == StackOp::Pop {
                Ok(Resolution::with_effect(Location::Memory(address), reg::TSP, -1))
            } else {
                Ok(Resolution::at(Location::Memory(address)))
            }
        }
    }
}

/// Resolves `operand` and applies its side effects.
pub fn resolve_and_apply<S: Storage>(
    machine: &mut Machine<S>,
    operand: Operand,
) -> Result<Location, FaultKind> {
    let resolution = resolve(machine, operand)?;

    for effect in &resolution.effects {
        effect.apply(machine)?;
    }

    Ok(resolution.location)
}

#[cfg(test)]
fn test_machine() -> Machine {
    Machine::new(crate::machine::MachineConfig::default()).unwrap()
}

#[test]
fn test_resolve_simple_modes() {
    let mut machine = test_machine();

    machine.set_register(reg::R3, Word::Int(210)).unwrap();
    machine.store(40, Word::Int(220)).unwrap();

    let cases = [
        (Operand::register(3), Location::Register(3)),
        (Operand::new(Mode::RegisterIndirect, 3), Location::Memory(210)),
        (Operand::immediate(77), Location::Immediate(77)),
        (Operand::new(Mode::Indirect, 40), Location::Memory(220)),
        (Operand::new(Mode::Indexed, 3), Location::Memory(210)),
        (Operand::direct(40), Location::Memory(40)),
    ];

    for (operand, location) in cases.iter() {
        let resolution = resolve(&mut machine, *operand).unwrap();
        assert_eq!(resolution.location, *location, "{}", operand);
        assert!(resolution.effects.is_empty());
    }
}

#[test]
fn test_resolve_indexed_displacement() {
    let config = crate::machine::MachineConfig {
        index_displacement: 5,
        ..Default::default()
    };
    let mut machine = Machine::new(config).unwrap();

    machine.set_register(reg::I1, Word::Int(100)).unwrap();

    let location = resolve_and_apply(&mut machine, Operand::new(Mode::Indexed, reg::I1 as u8));
    assert_eq!(location, Ok(Location::Memory(105)));
}

#[test]
fn test_resolve_invalid_addresses() {
    let mut machine = test_machine();

    machine.set_register(reg::R1, Word::Int(-1)).unwrap();
    assert!(match resolve(&mut machine, Operand::new(Mode::RegisterIndirect, 1)) {
        Err(FaultKind::InvalidAddress { address: -1, .. }) => true,
        _ => false,
    });

    machine.set_register(reg::R1, Word::from_decimal(1.5)).unwrap();
    assert_eq!(
        resolve(&mut machine, Operand::new(Mode::RegisterIndirect, 1)),
        Err(FaultKind::NonIntegerOperand),
    );
}

#[test]
fn test_auto_increment_returns_old_value() {
    let mut machine = test_machine();
    machine.set_register(reg::I1, Word::Int(41)).unwrap();

    let location = resolve_and_apply(&mut machine, Operand::auto(reg::I1 as u8, false)).unwrap();
    assert_eq!(machine.read(location), Ok(Word::Int(41)));
    assert_eq!(machine.register(reg::I1), Ok(Word::Int(42)));

    let location = resolve_and_apply(&mut machine, Operand::auto(reg::I1 as u8, true)).unwrap();
    assert_eq!(machine.read(location), Ok(Word::Int(41)));
    assert_eq!(machine.register(reg::I1), Ok(Word::Int(41)));
}

#[test]
fn test_resolution_has_no_effect_until_applied() {
    let mut machine = test_machine();

    let resolution = resolve(&mut machine, Operand::stack(StackOp::Push)).unwrap();
    assert_eq!(resolution.location, Location::Memory(112));
    assert_eq!(machine.register(reg::TSP), Ok(Word::Int(111)));

    resolution.effects[0].apply(&mut machine).unwrap();
    assert_eq!(machine.register(reg::TSP), Ok(Word::Int(112)));
}

#[test]
fn test_stack_is_lifo() {
    let mut machine = test_machine();

    for value in 1..=3 {
        let location = resolve_and_apply(&mut machine, Operand::stack(StackOp::Push)).unwrap();
        machine.write(location, Word::Int(value)).unwrap();
    }

    let location = resolve_and_apply(&mut machine, Operand::stack(StackOp::Top)).unwrap();
    assert_eq!(machine.read(location), Ok(Word::Int(3)));

    for value in (1..=3).rev() {
        let location = resolve_and_apply(&mut machine, Operand::stack(StackOp::Pop)).unwrap();
        assert_eq!(machine.read(location), Ok(Word::Int(value)));
    }

    assert_eq!(
        resolve(&mut machine, Operand::stack(StackOp::Pop)),
        Err(FaultKind::StackUnderflow),
    );
    assert_eq!(
        resolve(&mut machine, Operand::stack(StackOp::Top)),
        Err(FaultKind::StackUnderflow),
    );
}

#[test]
fn test_stack_overflow() {
    let mut machine = test_machine();
    let limit = machine.config().stack_limit() as i64;

    machine.set_register(reg::TSP, Word::Int(limit - 2)).unwrap();
    assert!(resolve_and_apply(&mut machine, Operand::stack(StackOp::Push)).is_ok());
    assert_eq!(
        resolve(&mut machine, Operand::stack(StackOp::Push)),
        Err(FaultKind::StackOverflow),
    );
}

#[test]
fn test_extreme_register_values() {
    let mut machine = test_machine();

    machine.set_register(reg::TSP, Word::Int(i64::max_value())).unwrap();
    assert_eq!(
        resolve(&mut machine, Operand::stack(StackOp::Push)),
        Err(FaultKind::StackOverflow),
    );

    machine.set_register(reg::TSP, Word::Int(i64::min_value())).unwrap();
    assert_eq!(
        SideEffect::AdjustRegister { register: reg::TSP, delta: -1 }.apply(&mut machine),
        Err(FaultKind::StackUnderflow),
    );

    machine.set_register(reg::A1, Word::Int(i64::max_value())).unwrap();
    assert!(match resolve(&mut machine, Operand::new(Mode::Indexed, reg::A1 as u8)) {
        Err(FaultKind::InvalidAddress { .. }) => true,
        _ => false,
    });

    machine.set_register(reg::I1, Word::Int(i64::max_value())).unwrap();
    let location = resolve_and_apply(&mut machine, Operand::auto(reg::I1 as u8, false)).unwrap();
    assert_eq!(machine.read(location), Ok(Word::Int(i64::max_value())));
    assert_eq!(machine.register(reg::I1), Ok(Word::Int(i64::min_value())));
}

#[test]
fn test_invalid_stack_selector() {
    let mut machine = test_machine();

    assert_eq!(
        resolve(&mut machine, Operand::new(Mode::Stack, 7)),
        Err(FaultKind::InvalidStackSelector(7)),
    );
}
