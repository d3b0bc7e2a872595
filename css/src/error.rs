// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The parse-error log. Syntax errors are recoverable by specification:
//! the parser records them here and keeps going. Only misuse of the
//! incremental API is reported through `Result`.

use std::fmt;

/// Stable identifiers for recoverable syntax errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorId {
    EofInAtRule,
    EofInQualifiedRule,
    EofInSimpleBlock,
    EofInFunction,
    EofInString,
    EofInComment,
    EofInUrl,
    BadUrl,
    BadString,
    InvalidEscape,
    UnexpectedToken,
    UnexpectedTokenInDeclaration,
    MissingDeclarationColon,
}

impl ErrorId {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorId::EofInAtRule => "eof-in-at-rule",
            ErrorId::EofInQualifiedRule => "eof-in-qualified-rule",
            ErrorId::EofInSimpleBlock => "eof-in-simple-block",
            ErrorId::EofInFunction => "eof-in-function",
            ErrorId::EofInString => "eof-in-string",
            ErrorId::EofInComment => "eof-in-comment",
            ErrorId::EofInUrl => "eof-in-url",
            ErrorId::BadUrl => "bad-url",
            ErrorId::BadString => "bad-string",
            ErrorId::InvalidEscape => "invalid-escape",
            ErrorId::UnexpectedToken => "unexpected-token",
            ErrorId::UnexpectedTokenInDeclaration => "unexpected-token-in-declaration",
            ErrorId::MissingDeclarationColon => "missing-declaration-colon",
        }
    }
}

/// One recorded syntax error: a stable identifier plus the byte offset
/// into the input at which it was noticed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub id: ErrorId,
    pub offset: u64,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at byte {}", self.id.message(), self.offset)
    }
}

/// Where an incremental parse currently stands.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Ready,
    Parsing,
    Finished,
}

/// Returned when the incremental API is called out of sequence,
/// for example feeding another chunk after `end`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WrongStage {
    pub expected: Stage,
    pub actual: Stage,
}

impl fmt::Display for WrongStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parser is in stage {:?}, operation requires {:?}",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for WrongStage {}
