//! Tokens and a tokenizer for assembly source lines.

use logos::{Lexer, Logos};

use std::fmt;

use crate::parsing::parse_integer;

/// Enumeration of all tokens of the assembly language.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token<'a> {
    /// Erroneous token that could not be interpreted as any of the other variants.
    #[error]
    #[regex(r"[ \t\r\f,]+", logos::skip)]
    Error,

    /// A mnemonic, a register name or a symbol.
    #[regex("[A-Za-z_][A-Za-z0-9_]*", Lexer::slice)]
    Word(&'a str),

    /// An unsigned number literal. Signs are separate [Minus](Token::Minus) and
    /// [Plus](Token::Plus) tokens.
    #[regex("[0-9]+|0[xX][0-9A-Fa-f]+|0[bB][01]+", literal_callback)]
    Number(i64),

    /// Marks an immediate operand. (`#5`)
    #[token("#")]
    Hash,

    /// Marks a register indirect operand. (`*R1`)
    #[token("*")]
    Star,

    /// Marks a direct operand. (`@200`)
    #[token("@")]
    At,

    /// Opens an indirect operand. (`[M1]`)
    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    /// Auto-decrement prefix or a negative sign.
    #[token("-")]
    Minus,

    /// Auto-increment suffix.
    #[token("+")]
    Plus,
}

fn literal_callback<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Result<i64, ()> {
    parse_integer(lex.slice()).map_err(|_| ())
}

/// Splits a line into tokens, paired with their byte ranges.
pub fn tokenize(line: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    Token::lexer(line).spanned().collect()
}

impl<'t> fmt::Display for Token<'t> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Word(word) => write!(f, "{}", word),
            Token::Number(num) => write!(f, "{}", num),
            Token::Hash => write!(f, "#"),
            Token::Star => write!(f, "*"),
            Token::At => write!(f, "@"),
            Token::OpenBracket => write!(f, "["),
            Token::CloseBracket => write!(f, "]"),
            Token::Minus => write!(f, "-"),
            Token::Plus => write!(f, "+"),
        }
    }
}

#[test]
fn test_tokenize_statement() {
    let tokens: Vec<Token> = tokenize("MOV #0x1F, *R2").into_iter().map(|(t, _)| t).collect();

    assert_eq!(
        tokens,
        vec![
            Token::Word("MOV"),
            Token::Hash,
            Token::Number(31),
            Token::Star,
            Token::Word("R2"),
        ],
    );
}

#[test]
fn test_tokenize_auto_modes() {
    let tokens: Vec<Token> = tokenize("PUSH -I1 I2+ [M1] 0b11")
        .into_iter()
        .map(|(t, _)| t)
        .collect();

    assert_eq!(
        tokens,
        vec![
            Token::Word("PUSH"),
            Token::Minus,
            Token::Word("I1"),
            Token::Word("I2"),
            Token::Plus,
            Token::OpenBracket,
            Token::Word("M1"),
            Token::CloseBracket,
            Token::Number(3),
        ],
    );
}

#[test]
fn test_tokenize_error() {
    let tokens = tokenize("MOV $5 R1");
    assert_eq!(tokens[1], (Token::Error, 4..5));
}
