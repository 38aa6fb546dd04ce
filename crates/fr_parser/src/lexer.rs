//! Tokeniser: a `nom`-based scanner producing a flat token stream, each
//! tagged with its source [`Span`]. The parser never looks at source text
//! directly; it only ever sees [`Token`]s.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace1};
use nom::combinator::{map, recognize, value};
use nom::multi::many0_count;
use nom::sequence::pair;
use nom::IResult;

use fr_syntax::Span;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Lifetime(String),
    Int(i64),
    Let,
    Mut,
    Box,
    If,
    Else,
    Fn,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semi,
    Colon,
    Dot,
    Star,
    Amp,
    Eq,
    EqEq,
    Ne,
    Bang,
    Question,
    Arrow,
    ColonColon,
    Lt,
    Gt,
}

/// A token plus the span of source text it was scanned from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

fn ident_or_keyword(input: &str) -> IResult<&str, Token> {
    map(recognize(pair(alpha1, many0_count(alt((alphanumeric1, tag("_")))))), |s: &str| {
        match s {
            "let" => Token::Let,
            "mut" => Token::Mut,
            "box" => Token::Box,
            "if" => Token::If,
            "else" => Token::Else,
            "fn" => Token::Fn,
            other => Token::Ident(other.to_string()),
        }
    })(input)
}

fn lifetime(input: &str) -> IResult<&str, Token> {
    map(
        nom::sequence::preceded(char('\''), recognize(pair(alpha1, many0_count(alphanumeric1)))),
        |s: &str| Token::Lifetime(s.to_string()),
    )(input)
}

fn int_literal(input: &str) -> IResult<&str, Token> {
    map(digit1, |s: &str| Token::Int(s.parse().expect("digit1 only matches valid digits")))(input)
}

/// Multi-character punctuation must be tried before the single-character
/// alternatives that are their prefixes (`::` before `:`, `->` before `-`
/// which does not otherwise exist in this grammar, `==`/`!=` before `=`/`!`).
fn punctuation(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::ColonColon, tag("::")),
        value(Token::Arrow, tag("->")),
        value(Token::EqEq, tag("==")),
        value(Token::Ne, tag("!=")),
        value(Token::LBrace, char('{')),
        value(Token::RBrace, char('}')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
        value(Token::Comma, char(',')),
        value(Token::Semi, char(';')),
        value(Token::Colon, char(':')),
        value(Token::Dot, char('.')),
        value(Token::Star, char('*')),
        value(Token::Amp, char('&')),
        value(Token::Eq, char('=')),
        value(Token::Bang, char('!')),
        value(Token::Question, char('?')),
        value(Token::Lt, char('<')),
        value(Token::Gt, char('>')),
    ))(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((lifetime, ident_or_keyword, int_literal, punctuation))(input)
}

/// Tokenise `src` in full, tracking byte offsets for each token's [`Span`].
/// Whitespace is skipped; there is no comment syntax in the core grammar.
pub fn lex(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = src;
    let mut offset = 0usize;
    loop {
        if let Ok((after_ws, _)) = multispace1::<_, nom::error::Error<&str>>(rest) {
            offset += rest.len() - after_ws.len();
            rest = after_ws;
        }
        if rest.is_empty() {
            break;
        }
        match token(rest) {
            Ok((remaining, tok)) => {
                let consumed = rest.len() - remaining.len();
                let span = Span::new(offset, offset + consumed);
                tokens.push(Spanned { token: tok, span });
                offset += consumed;
                rest = remaining;
            }
            Err(_) => {
                return Err(ParseError::UnexpectedChar {
                    span: Span::new(offset, offset + 1),
                    found: rest.chars().next().unwrap_or('\0'),
                });
            }
        }
    }
    Ok(tokens)
}
