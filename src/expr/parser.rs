//! Recursive-descent parser producing the expression tree.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | ident | '(' expr ')'
//! ```

use super::lexer::{Token, TokenKind};
use super::ParseError;

const MAX_DEPTH: usize = 64;
/// Each binary operator adds a tree level, so flat chains are capped too.
const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Ident(String),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Visit every identifier in the tree.
    pub fn for_each_ident<'a>(&'a self, f: &mut impl FnMut(&'a str)) {
        match self {
            Expr::Number(_) => {}
            Expr::Ident(name) => f(name),
            Expr::Neg(inner) => inner.for_each_ident(f),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.for_each_ident(f);
                rhs.for_each_ident(f);
            }
        }
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
    end: usize,
}

impl Parser {
    /// `end` is the input length, used as the offset for end-of-input errors.
    pub fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
            end,
        }
    }

    pub fn parse(mut self) -> Result<Expr, ParseError> {
        if self.tokens.is_empty() {
            return Err(ParseError::new("empty expression", 0));
        }
        let expr = self.expr()?;
        if let Some(tok) = self.peek() {
            return Err(ParseError::new(
                format!("unexpected {}", describe(&tok.kind)),
                tok.position,
            ));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.operator()?;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(lhs),
            };
            self.operator()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let inner = self.nested(Self::unary)?;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let Some(tok) = self.next() else {
            return Err(ParseError::new("unexpected end of expression", self.end));
        };
        match tok.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Ident(name) => Ok(Expr::Ident(name)),
            TokenKind::LParen => {
                let inner = self.nested(Self::expr)?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(ParseError::new(
                        format!("expected ')' but found {}", describe(&other.kind)),
                        other.position,
                    )),
                    None => Err(ParseError::new(
                        format!("unclosed '(' opened at {}", tok.position),
                        self.end,
                    )),
                }
            }
            other => Err(ParseError::new(
                format!("unexpected {}", describe(&other)),
                tok.position,
            )),
        }
    }

    /// Consume a binary operator token, counting it against the limit.
    fn operator(&mut self) -> Result<(), ParseError> {
        if self.operators >= MAX_OPERATORS {
            let position = self.peek().map_or(self.end, |t| t.position);
            return Err(ParseError::new("expression has too many operators", position));
        }
        self.operators += 1;
        self.pos += 1;
        Ok(())
    }

    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        if self.depth >= MAX_DEPTH {
            let position = self.peek().map_or(self.end, |t| t.position);
            return Err(ParseError::new("expression nested too deeply", position));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {n}"),
        TokenKind::Ident(name) => format!("identifier '{name}'"),
        TokenKind::Plus => "'+'".into(),
        TokenKind::Minus => "'-'".into(),
        TokenKind::Star => "'*'".into(),
        TokenKind::Slash => "'/'".into(),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
    }
}
