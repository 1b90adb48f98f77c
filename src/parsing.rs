//! Grammar of numeric literals.
//!
//! Integers are decimal, hexadecimal (`0x2A`) or binary (`0b101`), with an optional sign.
//! Decimals have digits on both sides of the point (`2.5`, `-0.25`).

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char, digit1, hex_digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::context,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::{LiteralError, ParseError};
use crate::storage::Word;

type LiteralResult<'a, O> = IResult<&'a str, O, ParseError<LiteralError>>;

fn sign(input: &str) -> LiteralResult<i64> {
    map(opt(one_of("+-")), |sign| match sign {
        Some('-') => -1,
        _ => 1,
    })(input)
}

fn magnitude(input: &str) -> LiteralResult<i64> {
    alt((
        map_res(preceded(tag_no_case("0x"), hex_digit1), |digits: &str| {
            i64::from_str_radix(digits, 16)
        }),
        map_res(
            preceded(tag_no_case("0b"), take_while1(|c: char| c == '0' || c == '1')),
            |digits: &str| i64::from_str_radix(digits, 2),
        ),
        map_res(digit1, |digits: &str| digits.parse::<i64>()),
    ))(input)
}

/// Parses a signed integer literal.
pub fn integer(input: &str) -> LiteralResult<i64> {
    context(
        "integer",
        map(tuple((sign, magnitude)), |(sign, magnitude)| sign * magnitude),
    )(input)
}

/// Parses a decimal literal.
pub fn decimal(input: &str) -> LiteralResult<f32> {
    context(
        "decimal",
        map_res(
            recognize(tuple((opt(one_of("+-")), digit1, char('.'), digit1))),
            |literal: &str| literal.parse::<f32>(),
        ),
    )(input)
}

fn finish<O>(result: LiteralResult<O>) -> Result<O, ParseError<LiteralError>> {
    match result {
        Ok((_, output)) => Ok(output),
        Err(nom::Err::Error(err)) | Err(nom::Err::Failure(err)) => Err(err),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::incomplete()),
    }
}

fn check_range(input: &str, value: i64) -> Result<i64, ParseError<LiteralError>> {
    if value < i32::min_value() as i64 || value > u32::max_value() as i64 {
        Err(ParseError::from_kind(input, LiteralError::OutOfRange(value)))
    } else {
        Ok(value)
    }
}

/// Parses a whole string as an integer that fits in a 32-bit word, signed or unsigned.
pub fn parse_integer(input: &str) -> Result<i64, ParseError<LiteralError>> {
    let input = input.trim();
    let value = finish(all_consuming(integer)(input))?;
    check_range(input, value)
}

/// Parses a whole string as a storage [Word]: an encoded decimal if it has a fractional part,
/// an integer otherwise.
pub fn parse_word(input: &str) -> Result<Word, ParseError<LiteralError>> {
    let input = input.trim();

    let word = finish(
        all_consuming(alt((
            map(decimal, Word::from_decimal),
            map(integer, Word::Int),
        )))(input),
    )?;

    match word {
        Word::Int(value) => check_range(input, value).map(Word::Int),
        encoded => Ok(encoded),
    }
}

#[test]
fn test_parse_integer() {
    assert_eq!(parse_integer("42"), Ok(42));
    assert_eq!(parse_integer("-7"), Ok(-7));
    assert_eq!(parse_integer("+7"), Ok(7));
    assert_eq!(parse_integer("0x2A"), Ok(42));
    assert_eq!(parse_integer("0X2a"), Ok(42));
    assert_eq!(parse_integer("-0x10"), Ok(-16));
    assert_eq!(parse_integer("0b101"), Ok(5));
    assert_eq!(parse_integer("0"), Ok(0));
    assert_eq!(parse_integer(" 12 \n"), Ok(12));
}

#[test]
fn test_parse_integer_errors() {
    assert!(parse_integer("").is_err());
    assert!(parse_integer("0x").is_err());
    assert!(parse_integer("12a").is_err());
    assert!(parse_integer("2.5").is_err());
    assert_eq!(parse_integer("x").unwrap_err().context(), Some("integer"));

    let err = parse_integer("4294967296").unwrap_err();
    assert_eq!(err.kind(), Some(&LiteralError::OutOfRange(4294967296)));
}

#[test]
fn test_parse_word() {
    assert_eq!(parse_word("2.5"), Ok(Word::from_decimal(2.5)));
    assert_eq!(parse_word("-0.25"), Ok(Word::from_decimal(-0.25)));
    assert_eq!(parse_word("0b11"), Ok(Word::Int(3)));
    assert_eq!(parse_word("-3"), Ok(Word::Int(-3)));
    assert!(parse_word("2.").is_err());
    assert!(parse_word("abc").is_err());
}
