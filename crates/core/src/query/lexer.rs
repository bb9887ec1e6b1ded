//! Tokenizer for the filter query language.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::storage::{RepositoryError, Result};

use super::ast::CompareOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident(String),
    Str(String),
    Number(String),
    Positional(usize),
    Named(String),
    Op(CompareOp),
    And,
    Or,
    Null,
    True,
    False,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Comma,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Number(n) => format!("number {n}"),
            TokenKind::Positional(i) => format!("parameter ?{i}"),
            TokenKind::Named(name) => format!("parameter :{name}"),
            TokenKind::Op(op) => format!("operator '{op}'"),
            TokenKind::And => "AND".to_string(),
            TokenKind::Or => "OR".to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::True => "true".to_string(),
            TokenKind::False => "false".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::Comma => "','".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub position: usize,
}

pub(crate) fn syntax_error(position: usize, message: impl Into<String>) -> RepositoryError {
    RepositoryError::Syntax {
        position,
        message: message.into(),
    }
}

/// Splits query text into tokens.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut chars = text.char_indices().peekable();
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth = 0usize;

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = match c {
            '(' | ')' | '{' | '}' | ',' => {
                chars.next();
                match c {
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    '{' => {
                        depth += 1;
                        TokenKind::LBrace
                    }
                    '}' => {
                        depth = depth.saturating_sub(1);
                        TokenKind::RBrace
                    }
                    _ => TokenKind::Comma,
                }
            }
            '=' => {
                chars.next();
                TokenKind::Op(CompareOp::Eq)
            }
            '!' => {
                chars.next();
                if next_is(&mut chars, '=') {
                    TokenKind::Op(CompareOp::Ne)
                } else {
                    return Err(syntax_error(position, "expected '=' after '!'"));
                }
            }
            '<' => {
                chars.next();
                if next_is(&mut chars, '=') {
                    TokenKind::Op(CompareOp::Le)
                } else if next_is(&mut chars, '>') {
                    TokenKind::Op(CompareOp::Ne)
                } else {
                    TokenKind::Op(CompareOp::Lt)
                }
            }
            '>' => {
                chars.next();
                if next_is(&mut chars, '=') {
                    TokenKind::Op(CompareOp::Ge)
                } else {
                    TokenKind::Op(CompareOp::Gt)
                }
            }
            '?' => {
                chars.next();
                let digits = take_while(&mut chars, |c| c.is_ascii_digit());
                match digits.parse::<usize>() {
                    Ok(index) if index >= 1 => TokenKind::Positional(index),
                    _ => {
                        return Err(syntax_error(
                            position,
                            "positional parameter needs an index starting at 1",
                        ))
                    }
                }
            }
            ':' => {
                chars.next();
                // Inside a map, the colon after a key separates it from the value.
                let after_key = depth > 0
                    && matches!(
                        tokens.last().map(|t| &t.kind),
                        Some(TokenKind::Str(_) | TokenKind::Ident(_))
                    );
                match chars.peek() {
                    _ if after_key => TokenKind::Colon,
                    Some(&(_, n)) if is_ident_start(n) => {
                        TokenKind::Named(take_while(&mut chars, is_ident_char))
                    }
                    _ => TokenKind::Colon,
                }
            }
            '\'' | '"' => TokenKind::Str(read_string(&mut chars, position, c)?),
            '-' | '0'..='9' => TokenKind::Number(read_number(&mut chars, position)?),
            c if is_ident_start(c) => {
                let word = take_while(&mut chars, is_ident_char);
                match word.to_ascii_lowercase().as_str() {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "null" => TokenKind::Null,
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Ident(word),
                }
            }
            other => {
                return Err(syntax_error(
                    position,
                    format!("unexpected character '{other}'"),
                ))
            }
        };

        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn next_is(chars: &mut Peekable<CharIndices<'_>>, expected: char) -> bool {
    if matches!(chars.peek(), Some(&(_, c)) if c == expected) {
        chars.next();
        true
    } else {
        false
    }
}

fn take_while(chars: &mut Peekable<CharIndices<'_>>, pred: impl Fn(char) -> bool) -> String {
    let mut out = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !pred(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

/// Reads a quoted literal. A doubled quote character stands for itself.
fn read_string(
    chars: &mut Peekable<CharIndices<'_>>,
    position: usize,
    quote: char,
) -> Result<String> {
    chars.next();
    let mut out = String::new();
    loop {
        match chars.next() {
            Some((_, c)) if c == quote => {
                if next_is(chars, quote) {
                    out.push(quote);
                } else {
                    return Ok(out);
                }
            }
            Some((_, c)) => out.push(c),
            None => return Err(syntax_error(position, "unterminated string literal")),
        }
    }
}

fn read_number(chars: &mut Peekable<CharIndices<'_>>, position: usize) -> Result<String> {
    let mut out = String::new();
    if next_is(chars, '-') {
        out.push('-');
    }

    let int_part = take_while(chars, |c| c.is_ascii_digit());
    if int_part.is_empty() {
        return Err(syntax_error(position, "expected digits"));
    }
    out.push_str(&int_part);

    if next_is(chars, '.') {
        let frac = take_while(chars, |c| c.is_ascii_digit());
        if frac.is_empty() {
            return Err(syntax_error(position, "expected digits after '.'"));
        }
        out.push('.');
        out.push_str(&frac);
    }

    if matches!(chars.peek(), Some(&(_, 'e' | 'E'))) {
        chars.next();
        out.push('e');
        if next_is(chars, '-') {
            out.push('-');
        } else {
            next_is(chars, '+');
        }
        let exp = take_while(chars, |c| c.is_ascii_digit());
        if exp.is_empty() {
            return Err(syntax_error(position, "expected exponent digits"));
        }
        out.push_str(&exp);
    }

    Ok(out)
}
