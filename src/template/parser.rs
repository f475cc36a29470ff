//! Relaxed Document Syntax Parser
//!
//! This module parses the document literal syntax used in templates. It is
//! the syntax of the engine's interactive shell rather than strict JSON:
//!
//! - keys may be bare identifiers: `{ count: 1 }`
//! - strings may use single or double quotes: `{ geoNear: 'friends' }`
//! - numbers keep the integer/double distinction: `1` vs `1.0`
//! - `NaN`, `Infinity`, `-Infinity` and `HexData(0, "0aff")` are literals
//!
//! The parser runs on the fully substituted text, so every error position
//! refers to that text.

use crate::document::{Document, Value};
use crate::template::binder::BindError;
use bytes::Bytes;

/// Maximum nesting depth of documents and arrays (prevents stack overflow)
pub const MAX_NESTING_DEPTH: usize = 64;

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, BindError>;

/// Parser over a single document literal.
#[derive(Debug)]
pub struct DocumentParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> DocumentParser<'a> {
    /// Creates a parser positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    /// Parses the whole input as one top-level document.
    pub fn parse(mut self) -> ParseResult<Document> {
        self.skip_whitespace();
        if self.peek() != Some(b'{') {
            return Err(self.error("expected '{' at start of document"));
        }
        let doc = self.parse_document()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(doc)
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn error(&self, message: impl Into<String>) -> BindError {
        BindError::Syntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> ParseResult<()> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", byte as char)))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(format!(
                "maximum nesting depth exceeded: {}",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    /// Parses a value at the current position.
    fn parse_value(&mut self) -> ParseResult<Value> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error("unexpected end of input")),
            Some(b'{') => Ok(Value::Document(self.parse_document()?)),
            Some(b'[') => self.parse_array(),
            Some(b'"') | Some(b'\'') => Ok(Value::String(self.parse_string()?)),
            Some(b'-') | Some(b'+') | Some(b'0'..=b'9') | Some(b'.') => self.parse_number(),
            Some(b) if is_word_byte(b) => self.parse_word(),
            Some(b) => Err(self.error(format!("unexpected character '{}'", b as char))),
        }
    }

    /// Parses `{ key: value, ... }`.
    fn parse_document(&mut self) -> ParseResult<Document> {
        self.expect(b'{')?;
        self.enter()?;

        let mut doc = Document::new();
        self.skip_whitespace();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(doc);
        }

        loop {
            let key = self.parse_key()?;
            self.expect(b':')?;
            let value = self.parse_value()?;
            doc.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b'}') {
                        return Err(self.error("trailing comma in document"));
                    }
                }
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated document")),
                Some(_) => return Err(self.error("expected ',' or '}'")),
            }
        }

        self.depth -= 1;
        Ok(doc)
    }

    /// Parses `[ value, ... ]`.
    fn parse_array(&mut self) -> ParseResult<Value> {
        self.expect(b'[')?;
        self.enter()?;

        let mut values = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Array(values));
        }

        loop {
            values.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.peek() == Some(b']') {
                        return Err(self.error("trailing comma in array"));
                    }
                }
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(self.error("unterminated array")),
                Some(_) => return Err(self.error("expected ',' or ']'")),
            }
        }

        self.depth -= 1;
        Ok(Value::Array(values))
    }

    /// Parses a key: a quoted string or a bare identifier.
    fn parse_key(&mut self) -> ParseResult<String> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.parse_string(),
            Some(b) if is_key_byte(b) => {
                let start = self.pos;
                while matches!(self.peek(), Some(b) if is_key_byte(b)) {
                    self.pos += 1;
                }
                Ok(self.input[start..self.pos].to_string())
            }
            None => Err(self.error("unterminated document")),
            Some(_) => Err(self.error("expected key")),
        }
    }

    /// Parses a single- or double-quoted string with escapes.
    fn parse_string(&mut self) -> ParseResult<String> {
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q as char,
            _ => return Err(self.error("expected string")),
        };
        let start = self.pos;
        self.pos += 1;

        let input: &'a str = self.input;
        let mut out = String::new();
        let mut chars = input[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                c if c == quote => {
                    self.pos += offset + c.len_utf8();
                    return Ok(out);
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, e)) => e,
                        None => break,
                    };
                    match escaped {
                        '"' => out.push('"'),
                        '\'' => out.push('\''),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => {
                            let code = read_hex4(&mut chars).ok_or_else(|| {
                                self.error_at(self.pos + offset, "invalid unicode escape")
                            })?;
                            let c = if (0xD800..0xDC00).contains(&code) {
                                // High surrogate: a low surrogate escape must follow
                                let low = match (chars.next(), chars.next()) {
                                    (Some((_, '\\')), Some((_, 'u'))) => read_hex4(&mut chars),
                                    _ => None,
                                };
                                low.filter(|low| (0xDC00..0xE000).contains(low))
                                    .and_then(|low| {
                                        char::from_u32(
                                            0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00),
                                        )
                                    })
                            } else {
                                char::from_u32(code)
                            };
                            match c {
                                Some(c) => out.push(c),
                                None => {
                                    return Err(self.error_at(
                                        self.pos + offset,
                                        "invalid unicode escape",
                                    ))
                                }
                            }
                        }
                        other => {
                            return Err(self.error_at(
                                self.pos + offset,
                                format!("invalid escape '\\{}'", other),
                            ))
                        }
                    }
                }
                c => out.push(c),
            }
        }

        Err(self.error_at(start, "unterminated string"))
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> BindError {
        BindError::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Parses an integer or a double. `-Infinity` is handled here too.
    fn parse_number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        if self.input[self.pos..].starts_with("-Infinity") {
            self.pos += "-Infinity".len();
            return Ok(Value::Double(f64::NEG_INFINITY));
        }

        let mut is_double = false;
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => {}
                b'-' | b'+' => {}
                b'.' | b'e' | b'E' => is_double = true,
                _ => break,
            }
            self.pos += 1;
        }

        let text = &self.input[start..self.pos];
        let text = text.strip_prefix('+').unwrap_or(text);
        if !is_double {
            if let Ok(n) = text.parse::<i64>() {
                return Ok(Value::Int(n));
            }
        }
        // Integers that overflow i64 fall back to doubles
        text.parse::<f64>()
            .map(Value::Double)
            .map_err(|_| self.error_at(start, format!("invalid number '{}'", text)))
    }

    /// Parses a bare word: `true`, `false`, `null`, `NaN`, `Infinity`, `HexData(..)`.
    fn parse_word(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if is_word_byte(b)) {
            self.pos += 1;
        }

        match &self.input[start..self.pos] {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "NaN" => Ok(Value::Double(f64::NAN)),
            "Infinity" => Ok(Value::Double(f64::INFINITY)),
            "HexData" => self.parse_hex_data(),
            word => Err(self.error_at(start, format!("unexpected token '{}'", word))),
        }
    }

    /// Parses the argument list of `HexData(<subtype>, "<hex>")`.
    fn parse_hex_data(&mut self) -> ParseResult<Value> {
        self.expect(b'(')?;
        self.skip_whitespace();
        match self.parse_number()? {
            Value::Int(subtype) if (0..=255).contains(&subtype) => {}
            _ => return Err(self.error("HexData subtype must be an integer in 0..=255")),
        }
        self.expect(b',')?;
        self.skip_whitespace();
        let start = self.pos;
        let hex = self.parse_string()?;
        self.expect(b')')?;

        decode_hex(&hex)
            .map(|data| Value::Binary(Bytes::from(data)))
            .ok_or_else(|| self.error_at(start, "invalid hex string"))
    }
}

fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'.')
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn read_hex4(chars: &mut std::str::CharIndices<'_>) -> Option<u32> {
    let mut code = 0;
    for _ in 0..4 {
        let (_, c) = chars.next()?;
        code = code * 16 + c.to_digit(16)?;
    }
    Some(code)
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

/// Parses a complete document literal.
pub fn parse_document(input: &str) -> ParseResult<Document> {
    DocumentParser::new(input).parse()
}
