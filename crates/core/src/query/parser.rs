//! Recursive-descent parser for filter queries.
//!
//! ```text
//! query      := or
//! or         := and ( OR and )*
//! and        := primary ( AND primary )*
//! primary    := '(' or ')' | map | comparison
//! map        := '{' entry ( ',' entry )* '}'
//! entry      := ( string | ident ) ':' operand
//! comparison := ident op operand
//! ```

use crate::storage::Result;
use crate::value::Value;

use super::ast::{Comparison, CompareOp, Operand, Placeholder, Predicate};
use super::lexer::{syntax_error, tokenize, Token, TokenKind};

/// Parses query text into a predicate tree.
pub fn parse(text: &str) -> Result<Predicate> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(syntax_error(0, "empty query"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
    };
    let predicate = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        return Err(syntax_error(
            token.position,
            format!("unexpected {} after end of condition", token.kind.describe()),
        ));
    }

    Ok(predicate)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        match self.next() {
            Some(token) if token.kind == kind => Ok(()),
            Some(token) => Err(syntax_error(
                token.position,
                format!("expected {what}, found {}", token.kind.describe()),
            )),
            None => Err(syntax_error(self.end, format!("expected {what}"))),
        }
    }

    fn parse_or(&mut self) -> Result<Predicate> {
        let mut parts = vec![self.parse_and()?];
        while self.eat(&TokenKind::Or) {
            parts.push(self.parse_and()?);
        }
        Ok(Predicate::or(parts))
    }

    fn parse_and(&mut self) -> Result<Predicate> {
        let mut parts = vec![self.parse_primary()?];
        while self.eat(&TokenKind::And) {
            parts.push(self.parse_primary()?);
        }
        Ok(Predicate::and(parts))
    }

    fn parse_primary(&mut self) -> Result<Predicate> {
        let token = self
            .next()
            .ok_or_else(|| syntax_error(self.end, "expected a condition"))?;

        match token.kind {
            TokenKind::LParen => {
                let inner = self.parse_or()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Ident(field) => {
                let op = self.parse_op()?;
                let operand = self.parse_operand()?;
                Ok(Predicate::Compare(Comparison::new(field, op, operand)))
            }
            other => Err(syntax_error(
                token.position,
                format!("expected a field name, found {}", other.describe()),
            )),
        }
    }

    fn parse_map(&mut self) -> Result<Predicate> {
        let mut parts = Vec::new();
        loop {
            let token = self
                .next()
                .ok_or_else(|| syntax_error(self.end, "unterminated '{'"))?;
            let field = match token.kind {
                TokenKind::Str(name) | TokenKind::Ident(name) => name,
                TokenKind::RBrace if parts.is_empty() => {
                    return Err(syntax_error(token.position, "empty condition map"))
                }
                other => {
                    return Err(syntax_error(
                        token.position,
                        format!("expected a field name, found {}", other.describe()),
                    ))
                }
            };
            self.expect(TokenKind::Colon, "':'")?;
            let operand = self.parse_operand()?;
            parts.push(Predicate::Compare(Comparison::new(
                field,
                CompareOp::Eq,
                operand,
            )));

            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RBrace, "',' or '}'")?;
            return Ok(Predicate::and(parts));
        }
    }

    fn parse_op(&mut self) -> Result<CompareOp> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Op(op),
                ..
            }) => Ok(op),
            Some(token) => Err(syntax_error(
                token.position,
                format!("expected a comparison operator, found {}", token.kind.describe()),
            )),
            None => Err(syntax_error(self.end, "expected a comparison operator")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        let token = self
            .next()
            .ok_or_else(|| syntax_error(self.end, "expected a value or parameter"))?;

        Ok(match token.kind {
            TokenKind::Positional(index) => Operand::Placeholder(Placeholder::Positional(index)),
            TokenKind::Named(name) => Operand::Placeholder(Placeholder::Named(name)),
            TokenKind::Str(s) => Operand::Literal(Value::S(s)),
            TokenKind::Number(n) => Operand::Literal(Value::N(n)),
            TokenKind::Null => Operand::Literal(Value::Null),
            TokenKind::True => Operand::Literal(Value::Bool(true)),
            TokenKind::False => Operand::Literal(Value::Bool(false)),
            other => {
                return Err(syntax_error(
                    token.position,
                    format!("expected a value or parameter, found {}", other.describe()),
                ))
            }
        })
    }
}
