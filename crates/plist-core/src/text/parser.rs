//! Recursive-descent parser for ASCII property lists.
//!
//! Grammar, shared by both dialects unless marked:
//!
//! ```text
//! value  := dict | array | set | quoted | bare | data | typed
//! dict   := '{' (string '=' value ';')* '}'
//! array  := '(' (value (',' value)* ','?)? ')'
//! set    := '[' (value (',' value)* ','?)? ']'          GnuStep
//! data   := '<' (hex hex ws*)* '>'
//! typed  := '<*' ('BY' | 'BN' | 'I' int | 'R' real | 'D' date) '>'
//! ```
//!
//! Whitespace, `// line` and `/* block */` comments may appear between any
//! two tokens. Bare tokens are always strings: `42` and `YES` parse as the
//! strings `"42"` and `"YES"`; typed values need a `<*...>` literal.
//!
//! Parsing is all-or-nothing. The first violation is returned with a 1-based
//! line and column; nothing is recovered. Containers nested deeper than
//! [`MAX_DEPTH`] are a syntax error.

use crate::error::{PlistError, Result};
use crate::text::is_bare_char;
use crate::value::{Date, Dictionary, Integer, Real, Value, MAX_DEPTH};

/// Parse an ASCII property list held in a string.
///
/// The root may be any value; trailing non-whitespace, non-comment content
/// after it is an error.
pub fn from_str(text: &str) -> Result<Value> {
    let mut parser = Parser::new(text);
    parser.skip_trivia()?;
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if parser.peek().is_some() {
        return Err(parser.syntax_error(parser.pos, "unexpected content after the root value"));
    }
    Ok(value)
}

/// Parse an ASCII property list from raw bytes.
///
/// UTF-8 (with or without a byte order mark) and UTF-16 with a byte order
/// mark are accepted.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    let text = match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => decode_utf8(rest)?,
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes)?,
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes)?,
        _ => decode_utf8(bytes)?,
    };
    from_str(&text)
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(err) => {
            let prefix = std::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or_default();
            let (line, column) = line_column(prefix, prefix.len());
            Err(PlistError::Lexical {
                line,
                column,
                message: "invalid UTF-8 sequence".to_string(),
            })
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(PlistError::Lexical {
            line: 1,
            column: 1,
            message: "UTF-16 text ends with a lone byte".to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| PlistError::Lexical {
        line: 1,
        column: 1,
        message: "invalid UTF-16 text".to_string(),
    })
}

/// 1-based line and column (in characters) of byte offset `at`.
fn line_column(src: &str, at: usize) -> (usize, usize) {
    let before = &src[..at];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

struct Parser<'a> {
    src: &'a str,
    /// Byte offset of the next unread character.
    pos: usize,
    /// Containers currently open.
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0, depth: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char, context: &str) -> Result<()> {
        if self.eat(expected) {
            return Ok(());
        }
        let message = match self.peek() {
            Some(found) => format!("expected '{expected}' {context}, found '{found}'"),
            None => format!("expected '{expected}' {context}, found end of input"),
        };
        Err(self.syntax_error(self.pos, message))
    }

    fn lexical_error(&self, at: usize, message: impl Into<String>) -> PlistError {
        let (line, column) = line_column(self.src, at);
        PlistError::Lexical {
            line,
            column,
            message: message.into(),
        }
    }

    fn syntax_error(&self, at: usize, message: impl Into<String>) -> PlistError {
        let (line, column) = line_column(self.src, at);
        PlistError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Enter a container opening at `open`.
    fn descend(&mut self, open: usize) -> Result<()> {
        if self.depth >= MAX_DEPTH {
            return Err(self.syntax_error(
                open,
                format!("containers nested deeper than {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => match self.src[self.pos..].find('\n') {
                    Some(end) => self.pos += end + 1,
                    None => self.pos = self.src.len(),
                },
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    match self.src[start + 2..].find("*/") {
                        Some(end) => self.pos = start + 2 + end + 2,
                        None => return Err(self.lexical_error(start, "unterminated comment")),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek() {
            Some('{') => self.parse_dictionary(),
            Some('(') => self.parse_sequence(')').map(Value::Array),
            Some('[') => self.parse_sequence(']').map(Value::Set),
            Some('"') => self.parse_quoted().map(Value::String),
            Some('<') if self.peek_second() == Some('*') => self.parse_typed_literal(),
            Some('<') => self.parse_data(),
            Some(c) if is_bare_char(c) => Ok(Value::String(self.parse_bare())),
            Some(c) => Err(self.syntax_error(self.pos, format!("unexpected character '{c}'"))),
            None => Err(self.syntax_error(self.pos, "unexpected end of input, expected a value")),
        }
    }

    fn parse_dictionary(&mut self) -> Result<Value> {
        let open = self.pos;
        self.descend(open)?;
        self.bump();
        let mut dict = Dictionary::new();
        loop {
            self.skip_trivia()?;
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    self.depth -= 1;
                    return Ok(Value::Dictionary(dict));
                }
                Some('"') => self.parse_quoted()?,
                Some(c) if is_bare_char(c) => self.parse_bare(),
                Some(c) => {
                    return Err(self.syntax_error(
                        self.pos,
                        format!("expected a dictionary key or '}}', found '{c}'"),
                    ))
                }
                None => {
                    return Err(self.syntax_error(open, "unterminated dictionary, missing '}'"))
                }
            };
            self.skip_trivia()?;
            self.expect('=', "after dictionary key")?;
            self.skip_trivia()?;
            let value = self.parse_value()?;
            self.skip_trivia()?;
            self.expect(';', "after dictionary value")?;
            dict.insert(key, value);
        }
    }

    /// Array or set body; `close` is `)` or `]`.
    fn parse_sequence(&mut self, close: char) -> Result<Vec<Value>> {
        let open = self.pos;
        self.descend(open)?;
        self.bump();
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.eat(close) {
                self.depth -= 1;
                return Ok(items);
            }
            if self.peek().is_none() {
                return Err(self.syntax_error(open, format!("unterminated list, missing '{close}'")));
            }
            items.push(self.parse_value()?);
            self.skip_trivia()?;
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                self.depth -= 1;
                return Ok(items);
            }
            return Err(match self.peek() {
                Some(found) => self.syntax_error(
                    self.pos,
                    format!("expected ',' or '{close}', found '{found}'"),
                ),
                None => self.syntax_error(open, format!("unterminated list, missing '{close}'")),
            });
        }
    }

    fn parse_bare(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_char) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let open = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => self.parse_escape(open, &mut out)?,
                Some(c) => out.push(c),
                None => return Err(self.lexical_error(open, "unterminated string")),
            }
        }
    }

    /// Decode one escape sequence; the backslash is already consumed.
    fn parse_escape(&mut self, open: usize, out: &mut String) -> Result<()> {
        let start = self.pos - 1;
        let c = match self.bump() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('"') => '"',
            Some('\\') => '\\',
            Some('a') => '\u{07}',
            Some('b') => '\u{08}',
            Some('f') => '\u{0C}',
            Some('v') => '\u{0B}',
            Some('x') => {
                let code = self.read_digits(start, 2, 16)?;
                char::from_u32(code).ok_or_else(|| self.invalid_escape(start))?
            }
            Some('u' | 'U') => self.parse_unicode_escape(start)?,
            Some(d @ '0'..='7') => {
                let rest = self.read_digits(start, 2, 8)?;
                let code = (d as u32 - '0' as u32) * 64 + rest;
                char::from_u32(code).ok_or_else(|| self.invalid_escape(start))?
            }
            Some(_) => return Err(self.invalid_escape(start)),
            None => return Err(self.lexical_error(open, "unterminated string")),
        };
        out.push(c);
        Ok(())
    }

    /// `\uXXXX`, combining a high surrogate with a following `\uXXXX` low one.
    fn parse_unicode_escape(&mut self, start: usize) -> Result<char> {
        let high = self.read_digits(start, 4, 16)?;
        if !(0xD800..0xDC00).contains(&high) {
            return char::from_u32(high).ok_or_else(|| self.invalid_escape(start));
        }
        if !(self.eat('\\') && (self.eat('u') || self.eat('U'))) {
            return Err(self.invalid_escape(start));
        }
        let low = self.read_digits(start, 4, 16)?;
        if !(0xDC00..0xE000).contains(&low) {
            return Err(self.invalid_escape(start));
        }
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code).ok_or_else(|| self.invalid_escape(start))
    }

    fn read_digits(&mut self, start: usize, count: usize, radix: u32) -> Result<u32> {
        let mut value = 0;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(radix)) {
                Some(digit) => {
                    self.bump();
                    value = value * radix + digit;
                }
                None => return Err(self.invalid_escape(start)),
            }
        }
        Ok(value)
    }

    fn invalid_escape(&self, start: usize) -> PlistError {
        let seq: String = self.src[start..].chars().take(2).collect();
        self.lexical_error(start, format!("invalid escape sequence '{seq}'"))
    }

    fn parse_data(&mut self) -> Result<Value> {
        let open = self.pos;
        self.bump();
        let mut bytes = Vec::new();
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            let at = self.pos;
            match self.bump() {
                Some('>') => return Ok(Value::Data(bytes)),
                Some(c) if c.is_ascii_hexdigit() => {
                    let low = self.peek().and_then(|l| l.to_digit(16));
                    let (Some(high), Some(low)) = (c.to_digit(16), low) else {
                        return Err(self.lexical_error(at, "malformed hex pair in data block"));
                    };
                    self.bump();
                    bytes.push((high * 16 + low) as u8);
                }
                Some(c) => {
                    return Err(
                        self.lexical_error(at, format!("invalid character '{c}' in data block"))
                    )
                }
                None => return Err(self.lexical_error(open, "unterminated data block")),
            }
        }
    }

    /// GnuStep `<*Tpayload>`; the date form `<*D...>` is also used by Apple.
    fn parse_typed_literal(&mut self) -> Result<Value> {
        let src = self.src;
        let open = self.pos;
        self.pos += 2;
        let Some(end) = src[self.pos..].find('>') else {
            return Err(self.lexical_error(open, "unterminated typed literal"));
        };
        let body = &src[self.pos..self.pos + end];
        self.pos += end + 1;

        let mut chars = body.chars();
        let tag = chars.next();
        let payload = chars.as_str();
        match tag {
            Some('B') => match payload {
                "Y" => Ok(Value::Boolean(true)),
                "N" => Ok(Value::Boolean(false)),
                _ => Err(self.lexical_error(open, format!("invalid boolean literal '<*{body}>'"))),
            },
            Some('I') => self.parse_integer_literal(open, payload.trim()),
            Some('R') => payload
                .trim()
                .parse::<f64>()
                .map(|r| Value::Real(Real::double(r)))
                .map_err(|_| self.lexical_error(open, format!("invalid real literal '<*{body}>'"))),
            Some('D') => Date::parse(payload)
                .map(Value::Date)
                .ok_or_else(|| self.lexical_error(open, format!("invalid date literal '<*{body}>'"))),
            _ => Err(self.lexical_error(open, format!("unknown typed literal '<*{body}>'"))),
        }
    }

    fn parse_integer_literal(&self, open: usize, digits: &str) -> Result<Value> {
        let unsigned = digits.strip_prefix('-').unwrap_or(digits);
        if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.lexical_error(open, format!("invalid integer literal '{digits}'")));
        }
        digits
            .parse::<i128>()
            .ok()
            .and_then(Integer::new)
            .map(Value::Integer)
            .ok_or_else(|| {
                let (line, column) = line_column(self.src, open);
                PlistError::IntegerOverflow {
                    position: open,
                    message: format!(
                        "{digits} at line {line}, column {column} is outside the 64-bit range"
                    ),
                }
            })
    }
}
