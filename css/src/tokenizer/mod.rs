// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The CSS Syntax Module tokenizer.
//!
//! Lexes the full token set of CSS Syntax §4: idents, functions,
//! at-keywords, hashes, strings, urls, numbers, dimensions, delims,
//! bracket pairs, CDO/CDC and comments (kept as trivia tokens).
//! Input arrives in chunks; a token that may still grow at the end of
//! the available input is not emitted until more input arrives or the
//! caller marks the input complete.

use crate::error::{ErrorId, ParseError};
use tendril::StrTendril;

/// A lexed token together with the byte range it was lexed from.
/// The range indexes the accumulated input and is used for error
/// offsets and verbatim prelude capture.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub value: TokenValue,
    pub begin: usize,
    pub end: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenValue {
    Ident(StrTendril),
    Function(StrTendril),
    AtKeyword(StrTendril),
    Hash { value: StrTendril, id: bool },
    QuotedString(StrTendril),
    BadString,
    Url(StrTendril),
    BadUrl,
    Delim(char),
    Number { value: f64, is_integer: bool },
    Percentage(f64),
    Dimension { value: f64, is_integer: bool, unit: StrTendril },
    Whitespace,
    Cdo,
    Cdc,
    Colon,
    Semicolon,
    Comma,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comment(StrTendril),
    Eof,
}

impl TokenValue {
    /// Whitespace and comments, which most grammar productions skip.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenValue::Whitespace | TokenValue::Comment(_))
    }

    /// Append this token's canonical text form, used to rebuild
    /// declaration values and preludes from consumed tokens.
    pub fn serialize_to(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            TokenValue::Ident(s) => out.push_str(s),
            TokenValue::Function(s) => {
                out.push_str(s);
                out.push('(');
            },
            TokenValue::AtKeyword(s) => {
                out.push('@');
                out.push_str(s);
            },
            TokenValue::Hash { value, .. } => {
                out.push('#');
                out.push_str(value);
            },
            TokenValue::QuotedString(s) => {
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            },
            TokenValue::Url(s) => {
                out.push_str("url(");
                out.push_str(s);
                out.push(')');
            },
            TokenValue::Delim(c) => out.push(*c),
            TokenValue::Number { value, .. } => {
                let _ = write!(out, "{value}");
            },
            TokenValue::Percentage(value) => {
                let _ = write!(out, "{value}%");
            },
            TokenValue::Dimension { value, unit, .. } => {
                let _ = write!(out, "{value}{unit}");
            },
            TokenValue::Whitespace => out.push(' '),
            TokenValue::Cdo => out.push_str("<!--"),
            TokenValue::Cdc => out.push_str("-->"),
            TokenValue::Colon => out.push(':'),
            TokenValue::Semicolon => out.push(';'),
            TokenValue::Comma => out.push(','),
            TokenValue::LeftBracket => out.push('['),
            TokenValue::RightBracket => out.push(']'),
            TokenValue::LeftParen => out.push('('),
            TokenValue::RightParen => out.push(')'),
            TokenValue::LeftBrace => out.push('{'),
            TokenValue::RightBrace => out.push('}'),
            TokenValue::Comment(s) => {
                out.push_str("/*");
                out.push_str(s);
                out.push_str("*/");
            },
            TokenValue::BadString | TokenValue::BadUrl | TokenValue::Eof => {},
        }
    }
}

/// Signals that the current token runs past the available input and
/// cannot be finished until the next chunk arrives.
struct Incomplete;

fn is_ident_start_byte(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 || b == 0
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start_byte(b) || b.is_ascii_digit() || b == b'-'
}

fn is_whitespace_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')
}

fn is_newline_byte(b: u8) -> bool {
    matches!(b, b'\n' | b'\r' | b'\x0C')
}

fn hex_value(b: u8) -> u32 {
    match b {
        b'0'..=b'9' => (b - b'0') as u32,
        b'a'..=b'f' => (b - b'a' + 10) as u32,
        _ => (b - b'A' + 10) as u32,
    }
}

pub struct Tokenizer {
    input: StrTendril,
    pos: usize,
    last: bool,
    errors: Vec<ParseError>,
}

impl Tokenizer {
    pub fn new() -> Tokenizer {
        Tokenizer {
            input: StrTendril::new(),
            pos: 0,
            last: false,
            errors: Vec::new(),
        }
    }

    /// Append the next input chunk.
    pub fn push(&mut self, chunk: StrTendril) {
        self.input.push_tendril(&chunk);
    }

    /// Mark the input as complete. Further `next` calls may return
    /// `Eof` instead of suspending.
    pub fn set_last(&mut self) {
        self.last = true;
    }

    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Verbatim slice of the accumulated input, for prelude capture.
    pub fn slice(&self, begin: usize, end: usize) -> StrTendril {
        self.input.subtendril(begin as u32, (end - begin) as u32)
    }

    /// Like `slice`, but with surrounding whitespace removed.
    pub fn slice_trimmed(&self, begin: usize, end: usize) -> StrTendril {
        let raw = &self.input[begin..end];
        let trimmed = raw.trim_matches(|c: char| c.is_ascii_whitespace());
        let front = raw.len() - raw.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
        self.input
            .subtendril((begin + front) as u32, trimmed.len() as u32)
    }

    pub fn take_errors(&mut self) -> Vec<ParseError> {
        std::mem::take(&mut self.errors)
    }

    /// Lex the next token. `None` means the available input ends in
    /// the middle of a token; feed more input (or `set_last`) and call
    /// again. Once the input is complete, returns `Eof` forever.
    pub fn next(&mut self) -> Option<Token> {
        let begin = self.pos;
        let errors_mark = self.errors.len();
        match self.lex() {
            Ok(value) => Some(Token {
                value,
                begin,
                end: self.pos,
            }),
            Err(Incomplete) => {
                // The aborted scan restarts from the token head on the
                // next chunk, so anything it logged would be logged
                // twice. Roll the error log back together with `pos`.
                self.pos = begin;
                self.errors.truncate(errors_mark);
                None
            },
        }
    }

    fn error(&mut self, id: ErrorId) {
        self.errors.push(ParseError {
            id,
            offset: self.pos as u64,
        });
    }

    fn byte_at(&self, i: usize) -> Result<Option<u8>, Incomplete> {
        match self.input.as_bytes().get(self.pos + i) {
            Some(&b) => Ok(Some(b)),
            None if self.last => Ok(None),
            None => Err(Incomplete),
        }
    }

    fn char_at(&self) -> Result<char, Incomplete> {
        match self.input[self.pos..].chars().next() {
            Some(c) => Ok(c),
            None => Err(Incomplete),
        }
    }

    fn subtendril(&self, begin: usize, end: usize) -> StrTendril {
        self.input.subtendril(begin as u32, (end - begin) as u32)
    }

    fn lex(&mut self) -> Result<TokenValue, Incomplete> {
        let Some(b) = self.byte_at(0)? else {
            return Ok(TokenValue::Eof);
        };

        match b {
            b if is_whitespace_byte(b) => {
                while matches!(self.byte_at(0)?, Some(b) if is_whitespace_byte(b)) {
                    self.pos += 1;
                }
                Ok(TokenValue::Whitespace)
            },

            b'"' | b'\'' => self.consume_string(b),

            b'#' => {
                self.pos += 1;
                let named = matches!(self.byte_at(0)?, Some(b) if is_ident_byte(b))
                    || self.valid_escape(0)?;
                if named {
                    let id = self.would_start_ident(0)?;
                    let value = self.consume_name()?;
                    Ok(TokenValue::Hash { value, id })
                } else {
                    Ok(TokenValue::Delim('#'))
                }
            },

            b'(' => {
                self.pos += 1;
                Ok(TokenValue::LeftParen)
            },
            b')' => {
                self.pos += 1;
                Ok(TokenValue::RightParen)
            },
            b'[' => {
                self.pos += 1;
                Ok(TokenValue::LeftBracket)
            },
            b']' => {
                self.pos += 1;
                Ok(TokenValue::RightBracket)
            },
            b'{' => {
                self.pos += 1;
                Ok(TokenValue::LeftBrace)
            },
            b'}' => {
                self.pos += 1;
                Ok(TokenValue::RightBrace)
            },
            b',' => {
                self.pos += 1;
                Ok(TokenValue::Comma)
            },
            b':' => {
                self.pos += 1;
                Ok(TokenValue::Colon)
            },
            b';' => {
                self.pos += 1;
                Ok(TokenValue::Semicolon)
            },

            b'+' | b'.' => {
                if self.would_start_number(0)? {
                    self.consume_numeric()
                } else {
                    self.pos += 1;
                    Ok(TokenValue::Delim(b as char))
                }
            },

            b'-' => {
                if self.would_start_number(0)? {
                    self.consume_numeric()
                } else if self.byte_at(1)? == Some(b'-') && self.byte_at(2)? == Some(b'>') {
                    self.pos += 3;
                    Ok(TokenValue::Cdc)
                } else if self.would_start_ident(0)? {
                    self.consume_ident_like()
                } else {
                    self.pos += 1;
                    Ok(TokenValue::Delim('-'))
                }
            },

            b'<' => {
                if self.byte_at(1)? == Some(b'!')
                    && self.byte_at(2)? == Some(b'-')
                    && self.byte_at(3)? == Some(b'-')
                {
                    self.pos += 4;
                    Ok(TokenValue::Cdo)
                } else {
                    self.pos += 1;
                    Ok(TokenValue::Delim('<'))
                }
            },

            b'@' => {
                if self.would_start_ident(1)? {
                    self.pos += 1;
                    let name = self.consume_name()?;
                    Ok(TokenValue::AtKeyword(name))
                } else {
                    self.pos += 1;
                    Ok(TokenValue::Delim('@'))
                }
            },

            b'\\' => {
                if self.valid_escape(0)? {
                    self.consume_ident_like()
                } else {
                    self.error(ErrorId::InvalidEscape);
                    self.pos += 1;
                    Ok(TokenValue::Delim('\\'))
                }
            },

            b'/' => {
                if self.byte_at(1)? == Some(b'*') {
                    self.consume_comment()
                } else {
                    self.pos += 1;
                    Ok(TokenValue::Delim('/'))
                }
            },

            b'0'..=b'9' => self.consume_numeric(),

            b if is_ident_start_byte(b) => self.consume_ident_like(),

            _ => {
                let c = self.char_at()?;
                self.pos += c.len_utf8();
                Ok(TokenValue::Delim(c))
            },
        }
    }

    fn valid_escape(&self, i: usize) -> Result<bool, Incomplete> {
        if self.byte_at(i)? != Some(b'\\') {
            return Ok(false);
        }
        Ok(!matches!(self.byte_at(i + 1)?, Some(b) if is_newline_byte(b)) &&
            self.byte_at(i + 1)?.is_some())
    }

    fn would_start_ident(&self, i: usize) -> Result<bool, Incomplete> {
        match self.byte_at(i)? {
            Some(b'-') => Ok(matches!(self.byte_at(i + 1)?, Some(b) if is_ident_start_byte(b))
                || self.byte_at(i + 1)? == Some(b'-')
                || self.valid_escape(i + 1)?),
            Some(b'\\') => self.valid_escape(i),
            Some(b) if is_ident_start_byte(b) => Ok(true),
            _ => Ok(false),
        }
    }

    fn would_start_number(&self, i: usize) -> Result<bool, Incomplete> {
        match self.byte_at(i)? {
            Some(b'+') | Some(b'-') => match self.byte_at(i + 1)? {
                Some(b) if b.is_ascii_digit() => Ok(true),
                Some(b'.') => Ok(matches!(self.byte_at(i + 2)?, Some(b) if b.is_ascii_digit())),
                _ => Ok(false),
            },
            Some(b'.') => Ok(matches!(self.byte_at(i + 1)?, Some(b) if b.is_ascii_digit())),
            Some(b) if b.is_ascii_digit() => Ok(true),
            _ => Ok(false),
        }
    }

    /// Consume an escaped code point; `pos` is at the backslash.
    fn consume_escape(&mut self) -> Result<char, Incomplete> {
        self.pos += 1;
        let Some(b) = self.byte_at(0)? else {
            self.error(ErrorId::InvalidEscape);
            return Ok('\u{fffd}');
        };
        if b.is_ascii_hexdigit() {
            let mut value: u32 = 0;
            let mut digits = 0;
            while digits < 6 {
                match self.byte_at(0)? {
                    Some(b) if b.is_ascii_hexdigit() => {
                        value = value * 16 + hex_value(b);
                        self.pos += 1;
                        digits += 1;
                    },
                    _ => break,
                }
            }
            // A single whitespace after the hex digits belongs to the escape.
            match self.byte_at(0)? {
                Some(b'\r') => {
                    self.pos += 1;
                    if self.byte_at(0)? == Some(b'\n') {
                        self.pos += 1;
                    }
                },
                Some(b) if is_whitespace_byte(b) => self.pos += 1,
                _ => {},
            }
            match char::from_u32(value) {
                Some(c) if value != 0 => Ok(c),
                _ => Ok('\u{fffd}'),
            }
        } else {
            let c = self.char_at()?;
            self.pos += c.len_utf8();
            Ok(if c == '\0' { '\u{fffd}' } else { c })
        }
    }

    /// Consume an ident sequence, decoding escapes and replacing NULs.
    /// The common escape-free case stays a zero-copy subtendril.
    fn consume_name(&mut self) -> Result<StrTendril, Incomplete> {
        let start = self.pos;
        let mut decoded: Option<String> = None;
        loop {
            match self.byte_at(0)? {
                Some(0) => {
                    if decoded.is_none() {
                        decoded = Some(self.input[start..self.pos].to_owned());
                    }
                    if let Some(s) = decoded.as_mut() {
                        s.push('\u{fffd}');
                    }
                    self.pos += 1;
                },
                Some(b) if b < 0x80 && is_ident_byte(b) => {
                    if let Some(s) = decoded.as_mut() {
                        s.push(b as char);
                    }
                    self.pos += 1;
                },
                Some(b) if b >= 0x80 => {
                    let c = self.char_at()?;
                    if let Some(s) = decoded.as_mut() {
                        s.push(c);
                    }
                    self.pos += c.len_utf8();
                },
                Some(b'\\') if self.valid_escape(0)? => {
                    if decoded.is_none() {
                        decoded = Some(self.input[start..self.pos].to_owned());
                    }
                    let c = self.consume_escape()?;
                    if let Some(s) = decoded.as_mut() {
                        s.push(c);
                    }
                },
                _ => break,
            }
        }
        Ok(match decoded {
            Some(s) => StrTendril::from_slice(&s),
            None => self.subtendril(start, self.pos),
        })
    }

    fn digits(&mut self) -> Result<(), Incomplete> {
        while matches!(self.byte_at(0)?, Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        Ok(())
    }

    fn consume_number(&mut self) -> Result<(f64, bool), Incomplete> {
        let start = self.pos;
        let mut is_integer = true;
        if matches!(self.byte_at(0)?, Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        self.digits()?;
        if self.byte_at(0)? == Some(b'.')
            && matches!(self.byte_at(1)?, Some(b) if b.is_ascii_digit())
        {
            self.pos += 1;
            self.digits()?;
            is_integer = false;
        }
        if matches!(self.byte_at(0)?, Some(b'e') | Some(b'E')) {
            let i = if matches!(self.byte_at(1)?, Some(b'+') | Some(b'-')) {
                2
            } else {
                1
            };
            if matches!(self.byte_at(i)?, Some(b) if b.is_ascii_digit()) {
                self.pos += i;
                self.digits()?;
                is_integer = false;
            }
        }
        let value = self.input[start..self.pos].parse().unwrap_or(0.0);
        Ok((value, is_integer))
    }

    fn consume_numeric(&mut self) -> Result<TokenValue, Incomplete> {
        let (value, is_integer) = self.consume_number()?;
        if self.would_start_ident(0)? {
            let unit = self.consume_name()?;
            Ok(TokenValue::Dimension {
                value,
                is_integer,
                unit,
            })
        } else if self.byte_at(0)? == Some(b'%') {
            self.pos += 1;
            Ok(TokenValue::Percentage(value))
        } else {
            Ok(TokenValue::Number { value, is_integer })
        }
    }

    fn consume_ident_like(&mut self) -> Result<TokenValue, Incomplete> {
        let name = self.consume_name()?;
        if self.byte_at(0)? != Some(b'(') {
            return Ok(TokenValue::Ident(name));
        }
        if !name.eq_ignore_ascii_case("url") {
            self.pos += 1;
            return Ok(TokenValue::Function(name));
        }

        // url( followed by an optionally whitespace-separated quote is a
        // plain function token; anything else is the unquoted url form.
        let mut i = 1;
        while matches!(self.byte_at(i)?, Some(b) if is_whitespace_byte(b)) {
            i += 1;
        }
        if matches!(self.byte_at(i)?, Some(b'"') | Some(b'\'')) {
            self.pos += 1;
            return Ok(TokenValue::Function(name));
        }
        self.pos += 1;
        self.consume_url()
    }

    fn consume_url(&mut self) -> Result<TokenValue, Incomplete> {
        while matches!(self.byte_at(0)?, Some(b) if is_whitespace_byte(b)) {
            self.pos += 1;
        }
        let start = self.pos;
        let mut content_end = None;
        let mut decoded: Option<String> = None;
        loop {
            match self.byte_at(0)? {
                None => {
                    self.error(ErrorId::EofInUrl);
                    break;
                },
                Some(b')') => {
                    let end = content_end.unwrap_or(self.pos);
                    let value = match decoded {
                        Some(s) => StrTendril::from_slice(&s),
                        None => self.subtendril(start, end),
                    };
                    self.pos += 1;
                    return Ok(TokenValue::Url(value));
                },
                Some(b) if is_whitespace_byte(b) => {
                    let ws_start = self.pos;
                    while matches!(self.byte_at(0)?, Some(b) if is_whitespace_byte(b)) {
                        self.pos += 1;
                    }
                    match self.byte_at(0)? {
                        Some(b')') | None => {
                            content_end = Some(ws_start);
                            continue;
                        },
                        _ => {
                            self.pos = ws_start;
                            return self.consume_bad_url();
                        },
                    }
                },
                Some(b'"') | Some(b'\'') | Some(b'(') => return self.consume_bad_url(),
                Some(b) if b < 0x20 && !is_whitespace_byte(b) && b != 0 => {
                    return self.consume_bad_url()
                },
                Some(0x7F) => return self.consume_bad_url(),
                Some(0) => {
                    if decoded.is_none() {
                        decoded = Some(self.input[start..self.pos].to_owned());
                    }
                    if let Some(s) = decoded.as_mut() {
                        s.push('\u{fffd}');
                    }
                    self.pos += 1;
                },
                Some(b'\\') => {
                    if self.valid_escape(0)? {
                        if decoded.is_none() {
                            decoded = Some(self.input[start..self.pos].to_owned());
                        }
                        let c = self.consume_escape()?;
                        if let Some(s) = decoded.as_mut() {
                            s.push(c);
                        }
                    } else {
                        return self.consume_bad_url();
                    }
                },
                Some(b) if b < 0x80 => {
                    if let Some(s) = decoded.as_mut() {
                        s.push(b as char);
                    }
                    self.pos += 1;
                },
                Some(_) => {
                    let c = self.char_at()?;
                    if let Some(s) = decoded.as_mut() {
                        s.push(c);
                    }
                    self.pos += c.len_utf8();
                },
            }
        }
        let end = content_end.unwrap_or(self.pos);
        Ok(TokenValue::Url(match decoded {
            Some(s) => StrTendril::from_slice(&s),
            None => self.subtendril(start, end),
        }))
    }

    /// Swallow the remnants of a bad url, then emit `BadUrl`.
    fn consume_bad_url(&mut self) -> Result<TokenValue, Incomplete> {
        self.error(ErrorId::BadUrl);
        loop {
            match self.byte_at(0)? {
                None => break,
                Some(b')') => {
                    self.pos += 1;
                    break;
                },
                Some(b'\\') if self.valid_escape(0)? => {
                    self.consume_escape()?;
                },
                Some(b) if b < 0x80 => self.pos += 1,
                Some(_) => {
                    let c = self.char_at()?;
                    self.pos += c.len_utf8();
                },
            }
        }
        Ok(TokenValue::BadUrl)
    }

    fn consume_string(&mut self, quote: u8) -> Result<TokenValue, Incomplete> {
        self.pos += 1;
        let start = self.pos;
        let mut decoded: Option<String> = None;
        loop {
            match self.byte_at(0)? {
                None => {
                    self.error(ErrorId::EofInString);
                    break;
                },
                Some(b) if b == quote => {
                    let value = match decoded {
                        Some(s) => StrTendril::from_slice(&s),
                        None => self.subtendril(start, self.pos),
                    };
                    self.pos += 1;
                    return Ok(TokenValue::QuotedString(value));
                },
                Some(b) if is_newline_byte(b) => {
                    // The newline stays in the input for the next token.
                    self.error(ErrorId::BadString);
                    return Ok(TokenValue::BadString);
                },
                Some(0) => {
                    if decoded.is_none() {
                        decoded = Some(self.input[start..self.pos].to_owned());
                    }
                    if let Some(s) = decoded.as_mut() {
                        s.push('\u{fffd}');
                    }
                    self.pos += 1;
                },
                Some(b'\\') => match self.byte_at(1)? {
                    None => {
                        // An escape truncated by EOF decodes to U+FFFD.
                        if decoded.is_none() {
                            decoded = Some(self.input[start..self.pos].to_owned());
                        }
                        if let Some(s) = decoded.as_mut() {
                            s.push('\u{fffd}');
                        }
                        self.pos += 1;
                    },
                    Some(b'\r') => {
                        if decoded.is_none() {
                            decoded = Some(self.input[start..self.pos].to_owned());
                        }
                        self.pos += 2;
                        if self.byte_at(0)? == Some(b'\n') {
                            self.pos += 1;
                        }
                    },
                    Some(b) if is_newline_byte(b) => {
                        if decoded.is_none() {
                            decoded = Some(self.input[start..self.pos].to_owned());
                        }
                        self.pos += 2;
                    },
                    Some(_) => {
                        if decoded.is_none() {
                            decoded = Some(self.input[start..self.pos].to_owned());
                        }
                        let c = self.consume_escape()?;
                        if let Some(s) = decoded.as_mut() {
                            s.push(c);
                        }
                    },
                },
                Some(b) if b < 0x80 => {
                    if let Some(s) = decoded.as_mut() {
                        s.push(b as char);
                    }
                    self.pos += 1;
                },
                Some(_) => {
                    let c = self.char_at()?;
                    if let Some(s) = decoded.as_mut() {
                        s.push(c);
                    }
                    self.pos += c.len_utf8();
                },
            }
        }
        Ok(TokenValue::QuotedString(match decoded {
            Some(s) => StrTendril::from_slice(&s),
            None => self.subtendril(start, self.pos),
        }))
    }

    fn consume_comment(&mut self) -> Result<TokenValue, Incomplete> {
        self.pos += 2;
        let start = self.pos;
        loop {
            match self.byte_at(0)? {
                None => {
                    self.error(ErrorId::EofInComment);
                    return Ok(TokenValue::Comment(self.subtendril(start, self.pos)));
                },
                Some(b'*') if self.byte_at(1)? == Some(b'/') => {
                    let value = self.subtendril(start, self.pos);
                    self.pos += 2;
                    return Ok(TokenValue::Comment(value));
                },
                Some(_) => self.pos += 1,
            }
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new()
    }
}

#[cfg(test)]
mod test {
    use super::{Token, TokenValue, Tokenizer};
    use tendril::StrTendril;

    fn lex_all(input: &str) -> Vec<TokenValue> {
        let mut tkz = Tokenizer::new();
        tkz.push(StrTendril::from(input));
        tkz.set_last();
        let mut out = vec![];
        loop {
            let Token { value, .. } = tkz.next().expect("complete input never suspends");
            if value == TokenValue::Eof {
                return out;
            }
            out.push(value);
        }
    }

    fn tendril(s: &str) -> StrTendril {
        StrTendril::from(s)
    }

    #[test]
    fn idents_and_functions() {
        assert_eq!(
            lex_all("foo bar("),
            vec![
                TokenValue::Ident(tendril("foo")),
                TokenValue::Whitespace,
                TokenValue::Function(tendril("bar")),
            ]
        );
    }

    #[test]
    fn ident_with_escape() {
        assert_eq!(
            lex_all("\\66 oo"),
            vec![TokenValue::Ident(tendril("foo"))]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            lex_all("12 -4.5 +.5e2 6e-1 10px 50%"),
            vec![
                TokenValue::Number {
                    value: 12.0,
                    is_integer: true
                },
                TokenValue::Whitespace,
                TokenValue::Number {
                    value: -4.5,
                    is_integer: false
                },
                TokenValue::Whitespace,
                TokenValue::Number {
                    value: 50.0,
                    is_integer: false
                },
                TokenValue::Whitespace,
                TokenValue::Number {
                    value: 0.6,
                    is_integer: false
                },
                TokenValue::Whitespace,
                TokenValue::Dimension {
                    value: 10.0,
                    is_integer: true,
                    unit: tendril("px")
                },
                TokenValue::Whitespace,
                TokenValue::Percentage(50.0),
            ]
        );
    }

    #[test]
    fn hash_id_flag() {
        assert_eq!(
            lex_all("#main #2col"),
            vec![
                TokenValue::Hash {
                    value: tendril("main"),
                    id: true
                },
                TokenValue::Whitespace,
                TokenValue::Hash {
                    value: tendril("2col"),
                    id: false
                },
            ]
        );
    }

    #[test]
    fn at_keyword_and_cdo_cdc() {
        assert_eq!(
            lex_all("@media <!-- -->"),
            vec![
                TokenValue::AtKeyword(tendril("media")),
                TokenValue::Whitespace,
                TokenValue::Cdo,
                TokenValue::Whitespace,
                TokenValue::Cdc,
            ]
        );
    }

    #[test]
    fn strings() {
        assert_eq!(
            lex_all("\"a\\\"b\" 'x'"),
            vec![
                TokenValue::QuotedString(tendril("a\"b")),
                TokenValue::Whitespace,
                TokenValue::QuotedString(tendril("x")),
            ]
        );
    }

    #[test]
    fn unterminated_string_hits_newline() {
        assert_eq!(
            lex_all("\"abc\ndef"),
            vec![
                TokenValue::BadString,
                TokenValue::Whitespace,
                TokenValue::Ident(tendril("def")),
            ]
        );
    }

    #[test]
    fn urls() {
        assert_eq!(
            lex_all("url( /a.png ) url(\"q\")"),
            vec![
                TokenValue::Url(tendril("/a.png")),
                TokenValue::Whitespace,
                TokenValue::Function(tendril("url")),
                TokenValue::QuotedString(tendril("q")),
                TokenValue::RightParen,
            ]
        );
    }

    #[test]
    fn bad_url_recovers_at_paren() {
        assert_eq!(
            lex_all("url(a b) x"),
            vec![
                TokenValue::BadUrl,
                TokenValue::Whitespace,
                TokenValue::Ident(tendril("x")),
            ]
        );
    }

    #[test]
    fn comment_token() {
        assert_eq!(
            lex_all("/* hi */x"),
            vec![
                TokenValue::Comment(tendril(" hi ")),
                TokenValue::Ident(tendril("x")),
            ]
        );
    }

    #[test]
    fn string_ending_in_escape_at_eof_decodes_to_replacement() {
        let mut tkz = Tokenizer::new();
        tkz.push(tendril("'ab\\"));
        tkz.set_last();
        let tok = tkz.next().expect("input is complete");
        assert_eq!(tok.value, TokenValue::QuotedString(tendril("ab\u{fffd}")));
        assert_eq!(tkz.take_errors().len(), 1);
    }

    #[test]
    fn rescanned_token_logs_its_error_once() {
        // A bad url split across chunks is scanned twice; only the
        // scan that completes may leave an error behind.
        let mut tkz = Tokenizer::new();
        tkz.push(tendril("url(bad u"));
        assert!(tkz.next().is_none());
        tkz.push(tendril("rl) x"));
        tkz.set_last();
        assert_eq!(tkz.next().map(|t| t.value), Some(TokenValue::BadUrl));
        assert_eq!(tkz.take_errors().len(), 1);
    }

    #[test]
    fn suspends_on_possibly_unfinished_token() {
        let mut tkz = Tokenizer::new();
        tkz.push(tendril("12"));
        assert!(tkz.next().is_none());
        tkz.push(tendril("px;"));
        let tok = tkz.next().expect("dimension is terminated by semicolon");
        assert_eq!(
            tok.value,
            TokenValue::Dimension {
                value: 12.0,
                is_integer: true,
                unit: tendril("px")
            }
        );
        assert_eq!((tok.begin, tok.end), (0, 4));
        tkz.set_last();
        assert_eq!(tkz.next().map(|t| t.value), Some(TokenValue::Semicolon));
        assert_eq!(tkz.next().map(|t| t.value), Some(TokenValue::Eof));
    }
}
