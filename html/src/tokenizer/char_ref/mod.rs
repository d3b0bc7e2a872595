// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Character reference decoding.
//!
//! On `&` in a decoding state the main tokenizer parks itself and steps
//! a [`CharRefDecoder`] instead, one input character per step, until the
//! reference resolves or is rejected. Every bit of progress lives in the
//! decoder, so a chunk boundary can fall anywhere inside a reference.
//!
//! Named references are matched against the DAFSA shipped by the
//! `html_named_entities` crate. This module owns the numeric forms and
//! the un-consume bookkeeping for rejected prefixes.

use std::borrow::Cow::{self, Borrowed};
use std::char::from_u32;
use std::mem;

use html_named_entities::{format_name_error, NamedReferenceTokenizationResult};
pub use html_named_entities::{CharRef, NamedReferenceTokenizerState};
use log::debug;
use shrike_markup::BufferQueue;
use tendril::StrTendril;

use super::{TokenSink, Tokenizer};

/// What a single decoder step achieved.
pub(super) enum Outcome {
    /// Out of input; retry the same step with the next chunk.
    Stalled,
    /// Made progress, not finished yet.
    Stepped,
    /// The reference is resolved (possibly to nothing).
    Done(CharRef),
}

#[derive(Debug)]
enum Phase {
    /// Just after the `&`.
    Start,
    /// Just after `&#`.
    NumberSign,
    /// Accumulating digits in the given base.
    Digits(u32),
    /// After the digits, looking for the terminating semicolon.
    AfterDigits,
    /// Walking the named reference table.
    Named(NamedReferenceTokenizerState),
    /// `&` followed by alphanumerics that match no named reference.
    Bogus(StrTendril),
}

pub(super) struct CharRefDecoder {
    phase: Phase,
    in_attribute: bool,

    value: u32,
    overflow: bool,
    any_digits: bool,
    hex_prefix: Option<char>,
}

/// Replacements for the C1 control range per the numeric character
/// reference end state; zero entries keep the original code point.
/// <https://html.spec.whatwg.org/#numeric-character-reference-end-state>
static C1_REPLACEMENTS: [u32; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0, 0x017D, 0, //
    0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

fn report_bad_name<Sink: TokenSink>(name: &str, tokenizer: &Tokenizer<Sink>) {
    tokenizer.emit_error(Cow::from(format_name_error(name)));
}

impl CharRefDecoder {
    pub(super) fn new(in_attribute: bool) -> CharRefDecoder {
        CharRefDecoder {
            phase: Phase::Start,
            in_attribute,
            value: 0,
            overflow: false,
            any_digits: false,
            hex_prefix: None,
        }
    }

    pub(super) fn step<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Outcome {
        debug!("char ref decoder stepping in phase {:?}", self.phase);
        match self.phase {
            Phase::Start => match tokenizer.peek(input) {
                Some('a'..='z' | 'A'..='Z' | '0'..='9') => {
                    self.phase =
                        Phase::Named(NamedReferenceTokenizerState::new(self.in_attribute));
                    Outcome::Stepped
                },
                Some('#') => {
                    tokenizer.discard_char(input);
                    self.phase = Phase::NumberSign;
                    Outcome::Stepped
                },
                Some(_) => Outcome::Done(CharRef::EMPTY),
                None => Outcome::Stalled,
            },

            Phase::NumberSign => match tokenizer.peek(input) {
                Some(c @ ('x' | 'X')) => {
                    tokenizer.discard_char(input);
                    self.hex_prefix = Some(c);
                    self.phase = Phase::Digits(16);
                    Outcome::Stepped
                },
                Some(_) => {
                    self.hex_prefix = None;
                    self.phase = Phase::Digits(10);
                    Outcome::Stepped
                },
                None => Outcome::Stalled,
            },

            Phase::Digits(base) => {
                let Some(c) = tokenizer.peek(input) else {
                    return Outcome::Stalled;
                };
                match c.to_digit(base) {
                    Some(digit) => {
                        tokenizer.discard_char(input);
                        self.value = self.value.wrapping_mul(base);
                        if self.value > 0x10FFFF {
                            // Already past the last code point; keep
                            // consuming digits but pin the result.
                            self.overflow = true;
                        }
                        self.value = self.value.wrapping_add(digit);
                        self.any_digits = true;
                        Outcome::Stepped
                    },
                    None if !self.any_digits => self.abandon_number(tokenizer, input),
                    None => {
                        self.phase = Phase::AfterDigits;
                        Outcome::Stepped
                    },
                }
            },

            Phase::AfterDigits => {
                match tokenizer.peek(input) {
                    Some(';') => tokenizer.discard_char(input),
                    Some(_) => tokenizer.emit_error(Borrowed(
                        "Semicolon missing after numeric character reference",
                    )),
                    None => return Outcome::Stalled,
                };
                self.resolve_number(tokenizer)
            },

            Phase::Named(ref mut named) => {
                let Some(c) = tokenizer.peek(input) else {
                    return Outcome::Stalled;
                };
                tokenizer.discard_char(input);
                match named.feed_character(c, input, |msg| tokenizer.emit_error(msg)) {
                    NamedReferenceTokenizationResult::Success(char_ref) => Outcome::Done(char_ref),
                    NamedReferenceTokenizationResult::Continue => Outcome::Stepped,
                    NamedReferenceTokenizationResult::Failed(name) => {
                        self.phase = Phase::Bogus(StrTendril::from(name));
                        Outcome::Stepped
                    },
                }
            },

            Phase::Bogus(ref mut name) => {
                let Some(c) = tokenizer.peek(input) else {
                    return Outcome::Stalled;
                };
                tokenizer.discard_char(input);
                name.push_char(c);
                match c {
                    _ if c.is_ascii_alphanumeric() => return Outcome::Stepped,
                    ';' => report_bad_name(name, tokenizer),
                    _ => (),
                }
                input.push_front(mem::take(name));
                Outcome::Done(CharRef::EMPTY)
            },
        }
    }

    // `&#` (or `&#x`) with no digits at all: put the consumed prefix
    // back and emit nothing.
    fn abandon_number<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> Outcome {
        let mut unconsumed = StrTendril::from_char('#');
        if let Some(c) = self.hex_prefix {
            unconsumed.push_char(c);
        }
        input.push_front(unconsumed);
        tokenizer.emit_error(Borrowed("Numeric character reference without digits"));
        Outcome::Done(CharRef::EMPTY)
    }

    fn resolve_number<Sink: TokenSink>(&mut self, tokenizer: &Tokenizer<Sink>) -> Outcome {
        fn conv(v: u32) -> char {
            from_u32(v).expect("invalid char missed by error handling cases")
        }

        let (c, error) = match self.value {
            v if v > 0x10FFFF || self.overflow => ('\u{fffd}', true),
            0x00 | 0xD800..=0xDFFF => ('\u{fffd}', true),

            v @ 0x80..=0x9F => match C1_REPLACEMENTS[(v - 0x80) as usize] {
                0 => (conv(v), true),
                replacement => (conv(replacement), true),
            },

            v @ (0x01..=0x08 | 0x0B | 0x0D..=0x1F | 0x7F | 0xFDD0..=0xFDEF) => (conv(v), true),

            v if (v & 0xFFFE) == 0xFFFE => (conv(v), true),

            v => (conv(v), false),
        };

        if error {
            let msg = if tokenizer.opts.exact_errors {
                Cow::from(format!(
                    "Invalid numeric character reference value 0x{:06X}",
                    self.value
                ))
            } else {
                Cow::from("Invalid numeric character reference")
            };
            tokenizer.emit_error(msg);
        }

        Outcome::Done(CharRef {
            chars: [c, '\0'],
            num_chars: 1,
        })
    }

    /// Resolve whatever is pending with no more input coming.
    pub(super) fn end_of_input<Sink: TokenSink>(
        &mut self,
        tokenizer: &Tokenizer<Sink>,
        input: &BufferQueue,
    ) -> CharRef {
        loop {
            let outcome = match &mut self.phase {
                Phase::Start => Outcome::Done(CharRef::EMPTY),
                Phase::Digits(_) if !self.any_digits => self.abandon_number(tokenizer, input),
                Phase::Digits(_) | Phase::AfterDigits => {
                    tokenizer.emit_error(Borrowed("EOF in numeric character reference"));
                    self.resolve_number(tokenizer)
                },
                Phase::Named(named) => {
                    return named
                        .notify_end_of_file(input, |msg| tokenizer.emit_error(msg))
                        .unwrap_or(CharRef::EMPTY);
                },
                Phase::NumberSign => {
                    input.push_front(StrTendril::from_slice("#"));
                    tokenizer.emit_error(Borrowed("EOF after '#' in character reference"));
                    Outcome::Done(CharRef::EMPTY)
                },
                Phase::Bogus(name) => {
                    input.push_front(name.clone());
                    if name.ends_with(';') {
                        report_bad_name(name, tokenizer);
                    }
                    Outcome::Done(CharRef::EMPTY)
                },
            };

            match outcome {
                Outcome::Done(char_ref) => return char_ref,
                Outcome::Stalled => return CharRef::EMPTY,
                Outcome::Stepped => {},
            }
        }
    }
}
