//! Parser from a source line into a [Line].
//!
//! Each line is tokenized as a whole and then consumed by a small backtracking cursor.
//! Operand sub-parsers run through [LineParser::apply], which rewinds the cursor when they fail.

use std::fmt;
use std::ops::Range;

use itertools::Itertools;

use crate::error::{AssemblyError, AssemblyErrorKind};
use crate::instruction::OpCode;

use super::ast::{Line, LineKind, Operand, Statement, Value};
use super::token::{tokenize, Token};

pub type Span = Range<usize>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    EndOfLine,
    UnexpectedToken { span: Span },
}

/// Error raised while structuring the tokens of a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: ErrorKind,

    /// What was being parsed, innermost first.
    pub context: Vec<&'static str>,
}

impl SyntaxError {
    fn end_of_line() -> SyntaxError {
        SyntaxError {
            kind: ErrorKind::EndOfLine,
            context: Vec::new(),
        }
    }

    fn unexpected(span: Span) -> SyntaxError {
        SyntaxError {
            kind: ErrorKind::UnexpectedToken { span },
            context: Vec::new(),
        }
    }
}

trait ErrorExt {
    fn context(self, ctx: &'static str) -> Self;
}

impl<T> ErrorExt for Result<T, SyntaxError> {
    fn context(mut self, ctx: &'static str) -> Self {
        if let Err(ref mut err) = self {
            err.context.push(ctx);
        }

        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ctx = self.context.iter().rev().join(": ");

        match self.kind {
            ErrorKind::EndOfLine => write!(f, "{}: unexpected end of line", ctx),
            ErrorKind::UnexpectedToken { ref span } => write!(
                f,
                "{}: unexpected token at column {}",
                ctx,
                span.start + 1,
            ),
        }
    }
}

/// Cursor over the tokens of one line.
struct LineParser<'a> {
    tokens: Vec<(Token<'a>, Span)>,
    position: usize,
}

impl<'a> LineParser<'a> {
    fn new(tokens: Vec<(Token<'a>, Span)>) -> LineParser<'a> {
        LineParser {
            tokens,
            position: 0,
        }
    }

    fn next(&mut self) -> Option<(Token<'a>, Span)> {
        let item = self.tokens.get(self.position).cloned();

        if item.is_some() {
            self.position += 1;
        }

        item
    }

    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.position).map(|(token, _)| token)
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    /// Runs `op`, restoring the cursor if it fails.
    fn apply<O, F>(&mut self, op: F) -> Result<O, SyntaxError>
    where
        F: FnOnce(&mut LineParser<'a>) -> Result<O, SyntaxError>,
    {
        let position = self.position;
        let result = op(self);

        if result.is_err() {
            self.position = position;
        }

        result
    }

    fn take_word(&mut self) -> Result<&'a str, SyntaxError> {
        match self.next() {
            Some((Token::Word(word), _)) => Ok(word),
            Some((_, span)) => Err(SyntaxError::unexpected(span)),
            None => Err(SyntaxError::end_of_line()),
        }
    }

    fn assert_token(&mut self, expected: Token<'a>) -> Result<(), SyntaxError> {
        match self.next() {
            Some((token, _)) if token == expected => Ok(()),
            Some((_, span)) => Err(SyntaxError::unexpected(span)),
            None => Err(SyntaxError::end_of_line()),
        }
    }

    /// A number with an optional leading minus sign.
    fn number(&mut self) -> Result<i64, SyntaxError> {
        self.apply(|parser| {
            let negative = parser.peek() == Some(&Token::Minus);

            if negative {
                parser.next();
            }

            match parser.next() {
                Some((Token::Number(n), _)) => Ok(if negative { -n } else { n }),
                Some((_, span)) => Err(SyntaxError::unexpected(span)),
                None => Err(SyntaxError::end_of_line()),
            }
        })
    }

    fn value(&mut self) -> Result<Value, SyntaxError> {
        if let Ok(n) = self.number() {
            return Ok(Value::Number(n));
        }

        self.take_word()
            .map(|word| Value::Name(word.to_string()))
            .context("address")
    }

    fn operand(&mut self) -> Result<Operand, SyntaxError> {
        let (token, span) = self.next().ok_or_else(SyntaxError::end_of_line)?;

        let operand = match token {
            Token::Hash => Operand::Immediate(self.number().context("immediate")?),
            Token::Number(n) => Operand::Immediate(n),
            Token::Minus => match self.next() {
                Some((Token::Number(n), _)) => Operand::Immediate(-n),
                Some((Token::Word(word), _)) => Operand::PreDecrement(word.to_string()),
                Some((_, span)) => return Err(SyntaxError::unexpected(span)),
                None => return Err(SyntaxError::end_of_line()),
            },
            Token::Star => Operand::Deref(self.take_word().context("register")?.to_string()),
            Token::OpenBracket => {
                let value = self.value()?;
                self.assert_token(Token::CloseBracket).context("indirect")?;
                Operand::Indirect(value)
            }
            Token::At => Operand::Direct(self.value().context("direct")?),
            Token::Word(word) => {
                if self.peek() == Some(&Token::Plus) {
                    self.next();
                    Operand::PostIncrement(word.to_string())
                } else {
                    Operand::Name(word.to_string())
                }
            }
            _ => return Err(SyntaxError::unexpected(span)),
        };

        Ok(operand)
    }

    fn operands(&mut self) -> Result<Vec<Operand>, SyntaxError> {
        let mut operands = Vec::new();

        while !self.at_end() {
            operands.push(self.apply(LineParser::operand).context("operand")?);
        }

        Ok(operands)
    }
}

/// Accepted operand counts of an opcode, and their description for error messages.
pub fn arity(opcode: OpCode) -> (Range<usize>, &'static str) {
    use crate::instruction::JumpCondition;

    match opcode {
        OpCode::EndOfProgram | OpCode::Return => (0..1, "no"),
        OpCode::Print
        | OpCode::Push
        | OpCode::Pop
        | OpCode::Top
        | OpCode::Call
        | OpCode::Scan
        | OpCode::Define
        | OpCode::Jump { condition: JumpCondition::Unconditional } => (1..2, "1"),
        OpCode::Jump { .. } => (1..4, "1 to 3"),
        OpCode::Move
        | OpCode::Modulo
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide => (2..3, "2"),
    }
}

/// Returns true for lines the assembler skips: blank lines and `#` comments.
pub fn is_ignored(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// Parses one source line. Blank and comment lines yield `None`.
pub fn parse_line(number: usize, text: &str) -> Result<Option<Line>, AssemblyError> {
    if is_ignored(text) {
        return Ok(None);
    }

    let syntax = |message: String| AssemblyError::new(number, AssemblyErrorKind::Syntax(message));

    let tokens = tokenize(text);

    if let Some((_, span)) = tokens.iter().find(|(token, _)| *token == Token::Error) {
        return Err(syntax(format!(
            "unrecognized input '{}' at column {}",
            &text[span.clone()],
            span.start + 1,
        )));
    }

    let mut parser = LineParser::new(tokens);

    let mnemonic = parser
        .take_word()
        .context("mnemonic")
        .map_err(|err| syntax(err.to_string()))?;

    let upper = mnemonic.to_uppercase();

    if upper == "DEF" || upper == "DEB" {
        let operands = parser.operands().map_err(|err| syntax(err.to_string()))?;

        return match operands.as_slice() {
            [Operand::Name(name)] => Ok(Some(Line {
                number,
                kind: LineKind::Label(name.clone()),
            })),
            [other] => Err(AssemblyError::new(
                number,
                AssemblyErrorKind::InvalidOperand(other.to_string()),
            )),
            _ => Err(AssemblyError::new(
                number,
                AssemblyErrorKind::OperandCount {
                    mnemonic: if upper == "DEF" { "DEF" } else { "DEB" },
                    expected: "1",
                    found: operands.len(),
                },
            )),
        };
    }

    let opcode = OpCode::from_mnemonic(&upper).ok_or_else(|| {
        AssemblyError::new(
            number,
            AssemblyErrorKind::UnknownOpcode {
                mnemonic: mnemonic.to_string(),
                suggestion: OpCode::suggest(mnemonic),
            },
        )
    })?;

    let operands = parser.operands().map_err(|err| syntax(err.to_string()))?;

    let (accepted, expected) = arity(opcode);

    if !accepted.contains(&operands.len()) {
        return Err(AssemblyError::new(
            number,
            AssemblyErrorKind::OperandCount {
                mnemonic: opcode.mnemonic(),
                expected,
                found: operands.len(),
            },
        ));
    }

    Ok(Some(Line {
        number,
        kind: LineKind::Statement(Statement::new(opcode, operands)),
    }))
}

#[cfg(test)]
fn statement(text: &str) -> Statement {
    match parse_line(1, text) {
        Ok(Some(Line { kind: LineKind::Statement(statement), .. })) => statement,
        other => panic!("'{}' did not parse into a statement: {:?}", text, other),
    }
}

#[test]
fn test_parse_operand_forms() {
    let s = statement("mov #10, R1");
    assert_eq!(s.opcode, OpCode::Move);
    assert_eq!(s.operands, vec![Operand::Immediate(10), Operand::Name("R1".to_string())]);

    let s = statement("ADD *R2 [M1]");
    assert_eq!(
        s.operands,
        vec![
            Operand::Deref("R2".to_string()),
            Operand::Indirect(Value::Name("M1".to_string())),
        ],
    );

    let s = statement("MOV -I1 I2+");
    assert_eq!(
        s.operands,
        vec![
            Operand::PreDecrement("I1".to_string()),
            Operand::PostIncrement("I2".to_string()),
        ],
    );

    let s = statement("MOV @200 [0x10]");
    assert_eq!(
        s.operands,
        vec![
            Operand::Direct(Value::Number(200)),
            Operand::Indirect(Value::Number(16)),
        ],
    );

    let s = statement("SUB R1 -3");
    assert_eq!(s.operands[1], Operand::Immediate(-3));

    let s = statement("  EOP  ");
    assert!(s.operands.is_empty());
}

#[test]
fn test_parse_ignored_lines() {
    assert_eq!(parse_line(1, ""), Ok(None));
    assert_eq!(parse_line(2, "   \t"), Ok(None));
    assert_eq!(parse_line(3, "  # MOV 1 R1"), Ok(None));
}

#[test]
fn test_parse_labels() {
    assert_eq!(
        parse_line(4, "DEF START"),
        Ok(Some(Line { number: 4, kind: LineKind::Label("START".to_string()) })),
    );
    assert_eq!(
        parse_line(5, "deb loop"),
        Ok(Some(Line { number: 5, kind: LineKind::Label("loop".to_string()) })),
    );

    let err = parse_line(6, "DEF").unwrap_err();
    assert_eq!(
        err.kind,
        AssemblyErrorKind::OperandCount { mnemonic: "DEF", expected: "1", found: 0 },
    );
}

#[test]
fn test_parse_unknown_opcode() {
    let err = parse_line(7, "MOVE 1 R1").unwrap_err();

    assert_eq!(err.line, 7);
    assert_eq!(
        err.kind,
        AssemblyErrorKind::UnknownOpcode {
            mnemonic: "MOVE".to_string(),
            suggestion: Some("MOV"),
        },
    );
}

#[test]
fn test_parse_operand_count() {
    let err = parse_line(1, "ADD R1").unwrap_err();
    assert_eq!(
        err.kind,
        AssemblyErrorKind::OperandCount { mnemonic: "ADD", expected: "2", found: 1 },
    );

    assert!(parse_line(1, "JEQ R1 R2 LOOP").is_ok());
    assert!(parse_line(1, "JEQ R1 R2 LOOP R3").is_err());
    assert!(parse_line(1, "RET R1").is_err());
}

#[test]
fn test_parse_syntax_errors() {
    match parse_line(1, "MOV $1 R1") {
        Err(AssemblyError { kind: AssemblyErrorKind::Syntax(message), .. }) => {
            assert!(message.contains("'$'"), "{}", message);
        }
        other => panic!("unexpected result {:?}", other),
    }

    match parse_line(1, "MOV [M1 R1") {
        Err(AssemblyError { kind: AssemblyErrorKind::Syntax(_), .. }) => (),
        other => panic!("unexpected result {:?}", other),
    }

    match parse_line(1, "#5 MOV") {
        Ok(None) => (),
        other => panic!("comment line parsed as {:?}", other),
    }
}
