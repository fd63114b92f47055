//! Tokenizer for price expressions.

use super::references::is_name_char;
use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the rewritten expression.
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || (is_name_char(c) && !c.is_ascii_digit())
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || is_name_char(c)
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let end = scan_number(input, pos);
                let text = &input[pos..end];
                let value = text.parse::<f64>().map_err(|_| {
                    ParseError::new(format!("invalid number '{text}'"), pos)
                })?;
                while chars.peek().is_some_and(|&(p, _)| p < end) {
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    position: pos,
                });
                continue;
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_continue(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(name),
                    position: pos,
                });
                continue;
            }
            other => {
                return Err(ParseError::new(
                    format!("unexpected character '{other}'"),
                    pos,
                ))
            }
        };
        chars.next();
        tokens.push(Token {
            kind,
            position: pos,
        });
    }

    Ok(tokens)
}

/// End offset of the numeric literal starting at `start`:
/// `digits [. digits] [(e|E) [+|-] digits]`.
fn scan_number(input: &str, start: usize) -> usize {
    let bytes = input.as_bytes();
    let mut i = start;
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    i = digits(i);
    if i < bytes.len() && bytes[i] == b'.' {
        i = digits(i + 1);
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let end = digits(j);
        if end > j {
            i = end;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers_with_fraction_and_exponent() {
        assert_eq!(
            kinds("1.5 .25 2e3 4E-1"),
            vec![
                TokenKind::Number(1.5),
                TokenKind::Number(0.25),
                TokenKind::Number(2000.0),
                TokenKind::Number(0.4),
            ]
        );
    }

    #[test]
    fn hangul_identifiers() {
        assert_eq!(
            kinds("어떤_템_*2"),
            vec![
                TokenKind::Ident("어떤_템_".into()),
                TokenKind::Star,
                TokenKind::Number(2.0),
            ]
        );
    }

    #[test]
    fn lone_dot_is_rejected() {
        let err = tokenize("1 + .").unwrap_err();
        assert_eq!(err.position, 4);
    }

    #[test]
    fn unknown_character_reports_offset() {
        let err = tokenize("avg25 % 2").unwrap_err();
        assert_eq!(err.position, 6);
    }
}
