use crate::error::AssemblyError;
use crate::instruction::{JumpCondition, OpCode};

use super::ast::{Line, LineKind, Operand, Statement};
use super::parser::parse_line;

/// A parsed assembly program. Blank and comment lines are dropped; every remaining line keeps
/// its source line number.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Program {
    pub lines: Vec<Line>,
}

impl Program {
    /// Parses a whole source text, one instruction per line.
    pub fn parse(source: &str) -> Result<Program, AssemblyError> {
        Program::parse_lines(source.lines())
    }

    /// Parses a program given as separate lines.
    pub fn parse_lines<I, S>(lines: I) -> Result<Program, AssemblyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut program = Program::default();

        for (index, text) in lines.into_iter().enumerate() {
            if let Some(line) = parse_line(index + 1, text.as_ref())? {
                program.lines.push(line);
            }
        }

        Ok(program)
    }

    /// Iterates over the statements and their line numbers, skipping labels.
    pub fn statements(&self) -> impl Iterator<Item = (usize, &Statement)> {
        self.lines.iter().filter_map(|line| match line.kind {
            LineKind::Statement(ref statement) => Some((line.number, statement)),
            LineKind::Label(_) => None,
        })
    }
}

/// Rewrites a statement into the machine instructions it stands for, the first of which is
/// placed at `address`.
///
/// Conditional jumps with two or three operands compare by subtraction:
/// `Jcc a b t` becomes `SUB a b` and `Jcc a t`. A conditional jump without a target skips the
/// instruction that follows it. Every other statement is emitted as is.
pub fn expand(statement: &Statement, address: i64) -> Vec<Statement> {
    let condition = match statement.opcode {
        OpCode::Jump { condition } if condition != JumpCondition::Unconditional => condition,
        _ => return vec![statement.clone()],
    };

    let jump = OpCode::Jump { condition };
    let skip = |jump_address: i64| Operand::Immediate(jump_address + 2);

    match statement.operands.as_slice() {
        [a] => vec![Statement::new(jump, vec![a.clone(), skip(address)])],
        [a, b] => vec![
            Statement::new(OpCode::Subtract, vec![a.clone(), b.clone()]),
            Statement::new(jump, vec![a.clone(), skip(address + 1)]),
        ],
        [a, b, target] => vec![
            Statement::new(OpCode::Subtract, vec![a.clone(), b.clone()]),
            Statement::new(jump, vec![a.clone(), target.clone()]),
        ],
        _ => vec![statement.clone()],
    }
}

/// Target of a conditional jump written without one, given the address of its first word.
pub fn skip_target(statement: &Statement, address: i64) -> Option<i64> {
    match statement.opcode {
        OpCode::Jump { condition } if condition != JumpCondition::Unconditional => {
            match statement.operands.len() {
                1 | 2 => Some(address + width(statement) as i64 + 1),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Number of words a statement occupies once expanded.
pub fn width(statement: &Statement) -> usize {
    expand(statement, 0).len()
}

#[test]
fn test_parse_keeps_line_numbers() {
    let program = Program::parse("DEF START\n\n# comment\nMOV 10 R1\nEOP\n").unwrap();

    let numbers: Vec<usize> = program.lines.iter().map(|line| line.number).collect();
    assert_eq!(numbers, vec![1, 4, 5]);
    assert_eq!(program.statements().count(), 2);
}

#[test]
fn test_parse_reports_line() {
    let err = Program::parse_lines(vec!["MOV 1 R1", "", "FOO"]).unwrap_err();
    assert_eq!(err.line, 3);
}

#[test]
fn test_expand_conditional_jumps() {
    let jeq = OpCode::Jump { condition: JumpCondition::Equal };
    let r1 = Operand::Name("R1".to_string());
    let r2 = Operand::Name("R2".to_string());
    let target = Operand::Name("LOOP".to_string());

    let compare = Statement::new(jeq, vec![r1.clone(), r2.clone()]);
    assert_eq!(
        expand(&compare, 10),
        vec![
            Statement::new(OpCode::Subtract, vec![r1.clone(), r2.clone()]),
            Statement::new(jeq, vec![r1.clone(), Operand::Immediate(13)]),
        ],
    );

    let full = Statement::new(jeq, vec![r1.clone(), r2.clone(), target.clone()]);
    assert_eq!(width(&full), 2);
    assert_eq!(expand(&full, 0)[1], Statement::new(jeq, vec![r1.clone(), target]));

    let single = Statement::new(jeq, vec![r1.clone()]);
    assert_eq!(expand(&single, 4), vec![Statement::new(jeq, vec![r1, Operand::Immediate(6)])]);

    assert_eq!(skip_target(&single, 4), Some(6));
    assert_eq!(skip_target(&compare, 10), Some(13));
    assert_eq!(skip_target(&full, 10), None);
}

#[test]
fn test_expand_leaves_other_statements() {
    let jmp = Statement::new(
        OpCode::Jump { condition: JumpCondition::Unconditional },
        vec![Operand::Name("LOOP".to_string())],
    );
    assert_eq!(expand(&jmp, 0), vec![jmp.clone()]);

    let mov = Statement::new(OpCode::Move, vec![Operand::Immediate(1), Operand::Name("R1".to_string())]);
    assert_eq!(width(&mov), 1);
}
