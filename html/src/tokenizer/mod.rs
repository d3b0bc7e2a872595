// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The HTML5 tokenizer.
//!
//! The tokenizer consumes input a chunk at a time from a [`BufferQueue`]
//! shared with the caller. When the queue runs dry mid-token, every bit of
//! progress is kept in the `Tokenizer` itself, so the caller can push more
//! input and resume exactly where it left off.

pub use self::interface::{Doctype, Tag, TagKind, Token, TokenSink, TokenSinkResult};
pub use self::interface::{EndTag, StartTag};

use self::char_ref::{CharRef, CharRefDecoder, Outcome};
use self::states::{DoubleEscaped, Escaped};
use self::states::{DoubleQuoted, SingleQuoted, Unquoted};
use self::states::{Rawtext, Rcdata, ScriptData, ScriptDataEscaped};

use std::borrow::Cow::{self, Borrowed};
use std::cell::{Cell, RefCell};
use std::mem;

use log::{debug, trace};
use shrike_markup::buffer_queue::SetResult::{FromSet, NotFromSet};
use shrike_markup::buffer_queue::SetResult;
use shrike_markup::interface::{Attribute, QualName};
use shrike_markup::{small_char_set, BufferQueue, SmallCharSet};
use tendril::StrTendril;
use web_atoms::{namespace_url, ns, LocalName};

pub mod states;

mod char_ref;
mod interface;

/// The result of a single tokenization pass over the pending input.
#[derive(Debug)]
#[must_use]
pub enum TokenizerResult<Handle> {
    /// The pending input was exhausted (or tokenization was suspended
    /// waiting for lookahead that a later chunk may satisfy).
    Done,
    /// A script element was encountered that must be executed before
    /// tokenization can continue.
    Script(Handle),
}

/// What happened after a single state machine step.
#[must_use]
enum ProcessResult<Handle> {
    Continue,
    Suspend,
    Script(Handle),
}

fn option_push(opt_str: &mut Option<StrTendril>, c: char) {
    match *opt_str {
        Some(ref mut s) => s.push_char(c),
        None => *opt_str = Some(StrTendril::from_char(c)),
    }
}

fn lower_ascii_letter(c: char) -> Option<char> {
    match c {
        'a'..='z' => Some(c),
        'A'..='Z' => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

/// Tokenizer options, with an impl for `Default`.
#[derive(Clone)]
pub struct TokenizerOpts {
    /// Report all parse errors described in the HTML standard, at some
    /// performance penalty?  Default: false
    pub exact_errors: bool,

    /// Discard a `U+FEFF BYTE ORDER MARK` if we see one at the beginning
    /// of the stream?  Default: true
    pub discard_bom: bool,

    /// Initial state override.  Only the fragment parsing algorithm
    /// should use this.  Default: None
    pub initial_state: Option<states::State>,

    /// Last start tag.  Only the fragment parsing algorithm should use
    /// this.  Default: None
    pub last_start_tag_name: Option<String>,
}

impl Default for TokenizerOpts {
    fn default() -> TokenizerOpts {
        TokenizerOpts {
            exact_errors: false,
            discard_bom: true,
            initial_state: None,
            last_start_tag_name: None,
        }
    }
}

/// The HTML tokenizer.
pub struct Tokenizer<Sink> {
    /// Options controlling the behavior of the tokenizer.
    opts: TokenizerOpts,

    /// Destination for tokens we emit.
    pub sink: Sink,

    /// The abstract machine state as described in the HTML standard.
    state: Cell<states::State>,

    /// Are we at the end of the file, once buffers have been processed
    /// completely? This affects whether we will wait for lookahead or not.
    at_eof: Cell<bool>,

    /// Decoder for the character reference being consumed, if any.
    char_ref_decoder: RefCell<Option<Box<CharRefDecoder>>>,

    /// Current input character.  Just consumed, may reconsume.
    current_char: Cell<char>,

    /// Should we reconsume the current input character?
    reconsume: Cell<bool>,

    /// Did we just consume \r, translating it to \n?  In that case we need
    /// to ignore the next character if it's \n.
    ignore_lf: Cell<bool>,

    /// Discard a U+FEFF BYTE ORDER MARK if we see one?  Only done at the
    /// beginning of the stream.
    discard_bom: Cell<bool>,

    /// Current tag kind.
    current_tag_kind: Cell<TagKind>,

    /// Current tag name.
    current_tag_name: RefCell<StrTendril>,

    /// Current tag is self-closing?
    current_tag_self_closing: Cell<bool>,

    /// Current tag attributes.
    current_tag_attrs: RefCell<Vec<Attribute>>,

    /// Current attribute name.
    current_attr_name: RefCell<StrTendril>,

    /// Current attribute value.
    current_attr_value: RefCell<StrTendril>,

    /// Current comment.
    current_comment: RefCell<StrTendril>,

    /// Current doctype token.
    current_doctype: RefCell<Doctype>,

    /// Last start tag name, for use in checking "appropriate end tag".
    last_start_tag_name: RefCell<Option<LocalName>>,

    /// The "temporary buffer" of the tokenization algorithm.
    temp_buf: RefCell<StrTendril>,

    /// Current line number.
    current_line: Cell<u64>,
}

impl<Sink: TokenSink> Tokenizer<Sink> {
    /// Create a new tokenizer which feeds tokens to a particular `TokenSink`.
    pub fn new(sink: Sink, mut opts: TokenizerOpts) -> Tokenizer<Sink> {
        let start_tag_name = opts
            .last_start_tag_name
            .take()
            .map(|s| LocalName::from(&*s));
        let state = opts.initial_state.unwrap_or(states::Data);
        let discard_bom = opts.discard_bom;
        Tokenizer {
            opts,
            sink,
            state: Cell::new(state),
            char_ref_decoder: RefCell::new(None),
            at_eof: Cell::new(false),
            current_char: Cell::new('\0'),
            reconsume: Cell::new(false),
            ignore_lf: Cell::new(false),
            discard_bom: Cell::new(discard_bom),
            current_tag_kind: Cell::new(StartTag),
            current_tag_name: RefCell::new(StrTendril::new()),
            current_tag_self_closing: Cell::new(false),
            current_tag_attrs: RefCell::new(vec![]),
            current_attr_name: RefCell::new(StrTendril::new()),
            current_attr_value: RefCell::new(StrTendril::new()),
            current_comment: RefCell::new(StrTendril::new()),
            current_doctype: RefCell::new(Doctype::default()),
            last_start_tag_name: RefCell::new(start_tag_name),
            temp_buf: RefCell::new(StrTendril::new()),
            current_line: Cell::new(1),
        }
    }

    /// Feed an input string into the tokenizer.
    pub fn feed(&self, input: &BufferQueue) -> TokenizerResult<Sink::Handle> {
        debug!("feeding input");

        if input.is_empty() {
            return TokenizerResult::Done;
        }

        if self.discard_bom.get() {
            if let Some(c) = input.peek() {
                if c == '\u{feff}' {
                    input.next();
                }
            } else {
                return TokenizerResult::Done;
            }
            self.discard_bom.set(false);
        }

        self.run(input)
    }

    pub fn set_plaintext_state(&self) {
        self.state.set(states::Plaintext);
    }

    fn process_token(&self, token: Token) -> TokenSinkResult<Sink::Handle> {
        self.sink.process_token(token, self.current_line.get())
    }

    fn process_token_and_continue(&self, token: Token) {
        assert!(matches!(
            self.process_token(token),
            TokenSinkResult::Continue
        ));
    }

    //§ preprocessing-the-input-stream
    // Get the next input character, which might be the character
    // 'c' that we already consumed from the buffers.
    fn get_preprocessed_char(&self, mut c: char, input: &BufferQueue) -> Option<char> {
        if self.ignore_lf.get() {
            self.ignore_lf.set(false);
            if c == '\n' {
                c = input.next()?;
            }
        }

        if c == '\r' {
            self.ignore_lf.set(true);
            c = '\n';
        }

        if c == '\n' {
            self.current_line.set(self.current_line.get() + 1);
        }

        if self.opts.exact_errors
            && match c as u32 {
                0x01..=0x08 | 0x0B | 0x0E..=0x1F | 0x7F..=0x9F | 0xFDD0..=0xFDEF => true,
                n if (n & 0xFFFE) == 0xFFFE => true,
                _ => false,
            }
        {
            let msg = format!("Bad character {c}");
            self.emit_error(Cow::Owned(msg));
        }

        trace!("got character {c}");
        self.current_char.set(c);
        Some(c)
    }

    //§ tokenization
    // Get the next input character, if one is available.
    fn get_char(&self, input: &BufferQueue) -> Option<char> {
        if self.reconsume.get() {
            self.reconsume.set(false);
            Some(self.current_char.get())
        } else {
            input
                .next()
                .and_then(|c| self.get_preprocessed_char(c, input))
        }
    }

    // Get the next characters, as either a single character from the given
    // small set or a run of characters outside the set.
    fn pop_except_from(&self, input: &BufferQueue, set: SmallCharSet) -> Option<SetResult> {
        // Bail to the slow path for various corner cases.
        // This means that `FromSet` can contain characters not in the set!
        // It shouldn't matter because the fallback `FromSet` case should
        // always do the same thing as the `NotFromSet` case.
        if self.opts.exact_errors || self.reconsume.get() || self.ignore_lf.get() {
            return self.get_char(input).map(FromSet);
        }

        let d = input.pop_except_from(set);
        trace!("got characters {d:?}");
        match d {
            Some(FromSet(c)) => self.get_preprocessed_char(c, input).map(FromSet),

            // NB: We don't set self.current_char for a run of characters not
            // in the set.  It shouldn't matter for the codepaths that use
            // this.
            _ => d,
        }
    }

    // Check if the next characters are an ASCII case-insensitive match.
    // See BufferQueue::eat.
    //
    // NB: this doesn't set the current input character.
    fn eat(&self, input: &BufferQueue, pat: &str, eq: fn(&u8, &u8) -> bool) -> Option<bool> {
        if self.ignore_lf.get() {
            self.ignore_lf.set(false);
            if self.peek(input) == Some('\n') {
                self.discard_char(input);
            }
        }

        input.push_front(mem::take(&mut self.temp_buf.borrow_mut()));
        match input.eat(pat, eq) {
            None if self.at_eof.get() => Some(false),
            None => {
                while let Some(data) = input.next() {
                    self.temp_buf.borrow_mut().push_char(data);
                }
                None
            },
            Some(matched) => Some(matched),
        }
    }

    /// Run the state machine for as long as we can.
    fn run(&self, input: &BufferQueue) -> TokenizerResult<Sink::Handle> {
        loop {
            match self.step(input) {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => break,
                ProcessResult::Script(node) => return TokenizerResult::Script(node),
            }
        }
        TokenizerResult::Done
    }

    fn bad_char_error(&self) {
        let msg = if self.opts.exact_errors {
            let c = self.current_char.get();
            let state = self.state.get();
            Cow::Owned(format!("Saw {c} in state {state:?}"))
        } else {
            Borrowed("Bad character")
        };
        self.emit_error(msg);
    }

    fn bad_eof_error(&self) {
        let msg = if self.opts.exact_errors {
            let state = self.state.get();
            Cow::Owned(format!("Saw EOF in state {state:?}"))
        } else {
            Borrowed("Unexpected EOF")
        };
        self.emit_error(msg);
    }

    fn emit_char(&self, c: char) {
        self.process_token_and_continue(match c {
            '\0' => Token::NullCharacter,
            c => Token::Characters(StrTendril::from_char(c)),
        });
    }

    // The string must not contain '\0'!
    fn emit_chars(&self, b: StrTendril) {
        self.process_token_and_continue(Token::Characters(b));
    }

    fn emit_current_tag(&self) -> ProcessResult<Sink::Handle> {
        self.finish_attribute();

        let name = LocalName::from(&**self.current_tag_name.borrow());
        self.current_tag_name.borrow_mut().clear();

        match self.current_tag_kind.get() {
            StartTag => {
                *self.last_start_tag_name.borrow_mut() = Some(name.clone());
            },
            EndTag => {
                if !self.current_tag_attrs.borrow().is_empty() {
                    self.emit_error(Borrowed("Attributes on an end tag"));
                }
                if self.current_tag_self_closing.get() {
                    self.emit_error(Borrowed("Self-closing end tag"));
                }
            },
        }

        let token = Token::Tag(Tag {
            kind: self.current_tag_kind.get(),
            name,
            self_closing: self.current_tag_self_closing.get(),
            attrs: self.current_tag_attrs.take(),
        });

        match self.process_token(token) {
            TokenSinkResult::Continue => ProcessResult::Continue,
            TokenSinkResult::Plaintext => {
                self.state.set(states::Plaintext);
                ProcessResult::Continue
            },
            TokenSinkResult::Script(node) => {
                self.state.set(states::Data);
                ProcessResult::Script(node)
            },
            TokenSinkResult::RawData(kind) => {
                self.state.set(states::RawData(kind));
                ProcessResult::Continue
            },
        }
    }

    fn emit_temp_buf(&self) {
        let buf = self.temp_buf.take();
        self.emit_chars(buf);
    }

    fn clear_temp_buf(&self) {
        // Do this without a new allocation.
        self.temp_buf.borrow_mut().clear();
    }

    fn emit_current_comment(&self) {
        let comment = self.current_comment.take();
        self.process_token_and_continue(Token::Comment(comment));
    }

    fn discard_tag(&self) {
        self.current_tag_name.borrow_mut().clear();
        self.current_tag_self_closing.set(false);
        *self.current_tag_attrs.borrow_mut() = vec![];
    }

    fn create_tag(&self, kind: TagKind, c: char) {
        self.discard_tag();
        self.current_tag_name.borrow_mut().push_char(c);
        self.current_tag_kind.set(kind);
    }

    fn have_appropriate_end_tag(&self) -> bool {
        match self.last_start_tag_name.borrow().as_ref() {
            Some(last) => {
                (self.current_tag_kind.get() == EndTag)
                    && (**self.current_tag_name.borrow() == **last)
            },
            None => false,
        }
    }

    fn create_attribute(&self, c: char) {
        self.finish_attribute();

        self.current_attr_name.borrow_mut().push_char(c);
    }

    fn finish_attribute(&self) {
        if self.current_attr_name.borrow().is_empty() {
            return;
        }

        // Drop a duplicate attribute, keeping the first occurrence.
        let dup = {
            let name = &*self.current_attr_name.borrow();
            self.current_tag_attrs
                .borrow()
                .iter()
                .any(|a| &*a.name.local == &**name)
        };

        if dup {
            self.emit_error(Borrowed("Duplicate attribute"));
            self.current_attr_name.borrow_mut().clear();
            self.current_attr_value.borrow_mut().clear();
        } else {
            let name = LocalName::from(&**self.current_attr_name.borrow());
            self.current_attr_name.borrow_mut().clear();
            self.current_tag_attrs.borrow_mut().push(Attribute {
                // The tree builder will adjust the namespace if necessary.
                // This only happens in foreign elements.
                name: QualName::new(None, ns!(), name),
                value: self.current_attr_value.take(),
            });
        }
    }

    fn emit_current_doctype(&self) {
        let doctype = self.current_doctype.take();
        self.process_token_and_continue(Token::Doctype(doctype));
    }

    fn doctype_id(&self, kind: states::DoctypeIdKind) -> std::cell::RefMut<Option<StrTendril>> {
        let doctype = self.current_doctype.borrow_mut();
        match kind {
            states::Public => std::cell::RefMut::map(doctype, |d| &mut d.public_id),
            states::System => std::cell::RefMut::map(doctype, |d| &mut d.system_id),
        }
    }

    fn clear_doctype_id(&self, kind: states::DoctypeIdKind) {
        let mut id = self.doctype_id(kind);
        match *id {
            Some(ref mut s) => s.clear(),
            None => *id = Some(StrTendril::new()),
        }
    }

    fn push_doctype_id(&self, kind: states::DoctypeIdKind, c: char) {
        option_push(&mut self.doctype_id(kind), c);
    }

    fn consume_char_ref(&self) {
        // NB: The decoder assumes we have an additional allocation
        // for a partially consumed input.
        *self.char_ref_decoder.borrow_mut() = Some(Box::new(CharRefDecoder::new(matches!(
            self.state.get(),
            states::AttributeValue(_)
        ))));
    }

    fn emit_eof(&self) {
        self.process_token_and_continue(Token::Eof);
    }

    pub(crate) fn peek(&self, input: &BufferQueue) -> Option<char> {
        if self.reconsume.get() {
            Some(self.current_char.get())
        } else {
            input.peek()
        }
    }

    pub(crate) fn discard_char(&self, input: &BufferQueue) {
        // peek() deals in un-processed characters (no newline normalization),
        // while get_char() does.
        //
        // since discard_char is supposed to be used in combination with
        // peek(), discard_char discards a single raw input character.
        if self.reconsume.get() {
            self.reconsume.set(false);
        } else {
            input.next();
        }
    }

    pub(crate) fn emit_error(&self, error: Cow<'static, str>) {
        self.process_token_and_continue(Token::ParseError(error));
    }
}

// Shorthand for valid-input helpers used inside `step`.  Each suspends the
// state machine if the input is exhausted.
macro_rules! get_char ( ($me:expr, $input:expr) => (
    unwrap_or_return!($me.get_char($input), ProcessResult::Suspend)
));

macro_rules! peek ( ($me:expr, $input:expr) => (
    unwrap_or_return!($me.peek($input), ProcessResult::Suspend)
));

macro_rules! pop_except_from ( ($me:expr, $input:expr, $set:expr) => (
    unwrap_or_return!($me.pop_except_from($input, $set), ProcessResult::Suspend)
));

macro_rules! eat ( ($me:expr, $input:expr, $pat:expr) => (
    unwrap_or_return!($me.eat($input, $pat, u8::eq_ignore_ascii_case), ProcessResult::Suspend)
));

macro_rules! eat_exact ( ($me:expr, $input:expr, $pat:expr) => (
    unwrap_or_return!($me.eat($input, $pat, u8::eq), ProcessResult::Suspend)
));

impl<Sink: TokenSink> Tokenizer<Sink> {
    // Transition to a new state, continuing the state machine.
    fn go_to(&self, state: states::State) -> ProcessResult<Sink::Handle> {
        self.state.set(state);
        ProcessResult::Continue
    }

    // Transition to a new state, reprocessing the current input character.
    fn reconsume_in(&self, state: states::State) -> ProcessResult<Sink::Handle> {
        self.reconsume.set(true);
        self.go_to(state)
    }

    // Emit the current tag and transition to whatever state the sink asked
    // for, falling back to `fallback` when the sink just continues.
    fn emit_tag_and_go_to(&self, fallback: states::State) -> ProcessResult<Sink::Handle> {
        self.state.set(fallback);
        self.emit_current_tag()
    }

    // Run the state machine for one "step".
    //
    // A step either consumes input until a state transition (or a suspend),
    // or delegates to the active character reference sub-tokenizer.
    fn step(&self, input: &BufferQueue) -> ProcessResult<Sink::Handle> {
        if self.char_ref_decoder.borrow().is_some() {
            return self.step_char_ref_decoder(input);
        }

        trace!("processing in state {:?}", self.state.get());
        match self.state.get() {
            //§ data-state
            states::Data => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\0');
                    },
                    FromSet('&') => {
                        self.consume_char_ref();
                        return ProcessResult::Continue;
                    },
                    FromSet('<') => return self.go_to(states::TagOpen),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ rcdata-state
            states::RawData(Rcdata) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '&' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('&') => {
                        self.consume_char_ref();
                        return ProcessResult::Continue;
                    },
                    FromSet('<') => return self.go_to(states::RawLessThanSign(Rcdata)),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ rawtext-state script-data-state
            states::RawData(kind @ (Rawtext | ScriptData)) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('<') => return self.go_to(states::RawLessThanSign(kind)),
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ script-data-escaped-state script-data-double-escaped-state
            states::RawData(ScriptDataEscaped(escape_kind)) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '-' '<' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    },
                    FromSet('-') => {
                        self.emit_char('-');
                        return self.go_to(states::ScriptDataEscapedDash(escape_kind));
                    },
                    FromSet('<') => {
                        if escape_kind == DoubleEscaped {
                            self.emit_char('<');
                        }
                        return self.go_to(states::RawLessThanSign(ScriptDataEscaped(escape_kind)));
                    },
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ plaintext-state
            states::Plaintext => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\0' '\n')) {
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                    },
                    FromSet(c) => self.emit_char(c),
                    NotFromSet(b) => self.emit_chars(b),
                }
            },

            //§ tag-open-state
            states::TagOpen => loop {
                let c = get_char!(self, input);
                return match c {
                    '!' => self.go_to(states::MarkupDeclarationOpen),
                    '/' => self.go_to(states::EndTagOpen),
                    '?' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().clear();
                        self.reconsume_in(states::BogusComment)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.create_tag(StartTag, cl);
                            self.go_to(states::TagName)
                        },
                        None => {
                            self.bad_char_error();
                            self.emit_char('<');
                            self.reconsume_in(states::Data)
                        },
                    },
                };
            },

            //§ end-tag-open-state
            states::EndTagOpen => loop {
                let c = get_char!(self, input);
                return match c {
                    '>' => {
                        self.bad_char_error();
                        self.go_to(states::Data)
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.create_tag(EndTag, cl);
                            self.go_to(states::TagName)
                        },
                        None => {
                            self.bad_char_error();
                            self.current_comment.borrow_mut().clear();
                            self.reconsume_in(states::BogusComment)
                        },
                    },
                };
            },

            //§ tag-name-state
            states::TagName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => return self.go_to(states::BeforeAttributeName),
                    '/' => return self.go_to(states::SelfClosingStartTag),
                    '>' => return self.emit_tag_and_go_to(states::Data),
                    '\0' => {
                        self.bad_char_error();
                        self.current_tag_name.borrow_mut().push_char('\u{fffd}');
                    },
                    c => self
                        .current_tag_name
                        .borrow_mut()
                        .push_char(c.to_ascii_lowercase()),
                }
            },

            //§ script-data-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(Escaped)) => loop {
                let c = get_char!(self, input);
                return match c {
                    '/' => {
                        self.clear_temp_buf();
                        self.go_to(states::RawEndTagOpen(ScriptDataEscaped(Escaped)))
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.clear_temp_buf();
                            self.temp_buf.borrow_mut().push_char(cl);
                            self.emit_char('<');
                            self.emit_char(c);
                            self.go_to(states::ScriptDataEscapeStart(DoubleEscaped))
                        },
                        None => {
                            self.emit_char('<');
                            self.reconsume_in(states::RawData(ScriptDataEscaped(Escaped)))
                        },
                    },
                };
            },

            //§ script-data-double-escaped-less-than-sign-state
            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => loop {
                return match get_char!(self, input) {
                    '/' => {
                        self.clear_temp_buf();
                        self.emit_char('/');
                        self.go_to(states::ScriptDataDoubleEscapeEnd)
                    },
                    _ => self.reconsume_in(states::RawData(ScriptDataEscaped(DoubleEscaped))),
                };
            },

            //§ rcdata-less-than-sign-state rawtext-less-than-sign-state script-data-less-than-sign-state
            states::RawLessThanSign(kind) => loop {
                return match get_char!(self, input) {
                    '/' => {
                        self.clear_temp_buf();
                        self.go_to(states::RawEndTagOpen(kind))
                    },
                    '!' if kind == ScriptData => {
                        self.emit_char('<');
                        self.emit_char('!');
                        self.go_to(states::ScriptDataEscapeStart(Escaped))
                    },
                    _ => {
                        self.emit_char('<');
                        self.reconsume_in(states::RawData(kind))
                    },
                };
            },

            //§ rcdata-end-tag-open-state rawtext-end-tag-open-state script-data-end-tag-open-state script-data-escaped-end-tag-open-state
            states::RawEndTagOpen(kind) => loop {
                let c = get_char!(self, input);
                return match lower_ascii_letter(c) {
                    Some(cl) => {
                        self.create_tag(EndTag, cl);
                        self.temp_buf.borrow_mut().push_char(c);
                        self.go_to(states::RawEndTagName(kind))
                    },
                    None => {
                        self.emit_char('<');
                        self.emit_char('/');
                        self.reconsume_in(states::RawData(kind))
                    },
                };
            },

            //§ rcdata-end-tag-name-state rawtext-end-tag-name-state script-data-end-tag-name-state script-data-escaped-end-tag-name-state
            states::RawEndTagName(kind) => loop {
                let c = get_char!(self, input);
                if self.have_appropriate_end_tag() {
                    match c {
                        '\t' | '\n' | '\x0C' | ' ' => {
                            return self.go_to(states::BeforeAttributeName)
                        },
                        '/' => return self.go_to(states::SelfClosingStartTag),
                        '>' => return self.emit_tag_and_go_to(states::Data),
                        _ => (),
                    }
                }

                match lower_ascii_letter(c) {
                    Some(cl) => {
                        self.current_tag_name.borrow_mut().push_char(cl);
                        self.temp_buf.borrow_mut().push_char(c);
                    },
                    None => {
                        self.discard_tag();
                        self.emit_char('<');
                        self.emit_char('/');
                        self.emit_temp_buf();
                        return self.reconsume_in(states::RawData(kind));
                    },
                }
            },

            //§ script-data-double-escape-start-state
            states::ScriptDataEscapeStart(DoubleEscaped) => loop {
                let c = get_char!(self, input);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            DoubleEscaped
                        } else {
                            Escaped
                        };
                        self.emit_char(c);
                        return self.go_to(states::RawData(ScriptDataEscaped(esc)));
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.temp_buf.borrow_mut().push_char(cl);
                            self.emit_char(c);
                        },
                        None => {
                            return self.reconsume_in(states::RawData(ScriptDataEscaped(Escaped)))
                        },
                    },
                }
            },

            //§ script-data-escape-start-state
            states::ScriptDataEscapeStart(Escaped) => loop {
                return match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        self.go_to(states::ScriptDataEscapeStartDash)
                    },
                    _ => self.reconsume_in(states::RawData(ScriptData)),
                };
            },

            //§ script-data-escape-start-dash-state
            states::ScriptDataEscapeStartDash => loop {
                return match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        self.go_to(states::ScriptDataEscapedDashDash(Escaped))
                    },
                    _ => self.reconsume_in(states::RawData(ScriptData)),
                };
            },

            //§ script-data-escaped-dash-state script-data-double-escaped-dash-state
            states::ScriptDataEscapedDash(kind) => loop {
                return match get_char!(self, input) {
                    '-' => {
                        self.emit_char('-');
                        self.go_to(states::ScriptDataEscapedDashDash(kind))
                    },
                    '<' => {
                        if kind == DoubleEscaped {
                            self.emit_char('<');
                        }
                        self.go_to(states::RawLessThanSign(ScriptDataEscaped(kind)))
                    },
                    '\0' => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                        self.go_to(states::RawData(ScriptDataEscaped(kind)))
                    },
                    c => {
                        self.emit_char(c);
                        self.go_to(states::RawData(ScriptDataEscaped(kind)))
                    },
                };
            },

            //§ script-data-escaped-dash-dash-state script-data-double-escaped-dash-dash-state
            states::ScriptDataEscapedDashDash(kind) => loop {
                match get_char!(self, input) {
                    '-' => self.emit_char('-'),
                    '<' => {
                        if kind == DoubleEscaped {
                            self.emit_char('<');
                        }
                        return self.go_to(states::RawLessThanSign(ScriptDataEscaped(kind)));
                    },
                    '>' => {
                        self.emit_char('>');
                        return self.go_to(states::RawData(ScriptData));
                    },
                    '\0' => {
                        self.bad_char_error();
                        self.emit_char('\u{fffd}');
                        return self.go_to(states::RawData(ScriptDataEscaped(kind)));
                    },
                    c => {
                        self.emit_char(c);
                        return self.go_to(states::RawData(ScriptDataEscaped(kind)));
                    },
                }
            },

            //§ script-data-double-escape-end-state
            states::ScriptDataDoubleEscapeEnd => loop {
                let c = get_char!(self, input);
                match c {
                    '\t' | '\n' | '\x0C' | ' ' | '/' | '>' => {
                        let esc = if &**self.temp_buf.borrow() == "script" {
                            Escaped
                        } else {
                            DoubleEscaped
                        };
                        self.emit_char(c);
                        return self.go_to(states::RawData(ScriptDataEscaped(esc)));
                    },
                    _ => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.temp_buf.borrow_mut().push_char(cl);
                            self.emit_char(c);
                        },
                        None => {
                            return self
                                .reconsume_in(states::RawData(ScriptDataEscaped(DoubleEscaped)))
                        },
                    },
                }
            },

            //§ before-attribute-name-state
            states::BeforeAttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => return self.go_to(states::SelfClosingStartTag),
                    '>' => return self.emit_tag_and_go_to(states::Data),
                    '\0' => {
                        self.bad_char_error();
                        self.create_attribute('\u{fffd}');
                        return self.go_to(states::AttributeName);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.create_attribute(cl);
                            return self.go_to(states::AttributeName);
                        },
                        None => {
                            if matches!(c, '"' | '\'' | '<' | '=') {
                                self.bad_char_error();
                            }
                            self.create_attribute(c);
                            return self.go_to(states::AttributeName);
                        },
                    },
                }
            },

            //§ attribute-name-state
            states::AttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => return self.go_to(states::AfterAttributeName),
                    '/' => return self.go_to(states::SelfClosingStartTag),
                    '=' => return self.go_to(states::BeforeAttributeValue),
                    '>' => return self.emit_tag_and_go_to(states::Data),
                    '\0' => {
                        self.bad_char_error();
                        self.current_attr_name.borrow_mut().push_char('\u{fffd}');
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => self.current_attr_name.borrow_mut().push_char(cl),
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                self.bad_char_error();
                            }
                            self.current_attr_name.borrow_mut().push_char(c);
                        },
                    },
                }
            },

            //§ after-attribute-name-state
            states::AfterAttributeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '/' => return self.go_to(states::SelfClosingStartTag),
                    '=' => return self.go_to(states::BeforeAttributeValue),
                    '>' => return self.emit_tag_and_go_to(states::Data),
                    '\0' => {
                        self.bad_char_error();
                        self.create_attribute('\u{fffd}');
                        return self.go_to(states::AttributeName);
                    },
                    c => match lower_ascii_letter(c) {
                        Some(cl) => {
                            self.create_attribute(cl);
                            return self.go_to(states::AttributeName);
                        },
                        None => {
                            if matches!(c, '"' | '\'' | '<') {
                                self.bad_char_error();
                            }
                            self.create_attribute(c);
                            return self.go_to(states::AttributeName);
                        },
                    },
                }
            },

            //§ before-attribute-value-state
            // Use peek so we can handle the first attr character along with the rest,
            // hopefully in the same zero-copy buffer.
            states::BeforeAttributeValue => loop {
                return match peek!(self, input) {
                    '\t' | '\n' | '\r' | '\x0C' | ' ' => {
                        self.discard_char(input);
                        ProcessResult::Continue
                    },
                    '"' => {
                        self.discard_char(input);
                        self.go_to(states::AttributeValue(DoubleQuoted))
                    },
                    '\'' => {
                        self.discard_char(input);
                        self.go_to(states::AttributeValue(SingleQuoted))
                    },
                    '>' => {
                        self.bad_char_error();
                        self.discard_char(input);
                        self.emit_tag_and_go_to(states::Data)
                    },
                    _ => self.go_to(states::AttributeValue(Unquoted)),
                };
            },

            //§ attribute-value-(double-quoted)-state
            states::AttributeValue(DoubleQuoted) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '"' '&' '\0' '\n')) {
                    FromSet('"') => return self.go_to(states::AfterAttributeValueQuoted),
                    FromSet('&') => {
                        self.consume_char_ref();
                        return ProcessResult::Continue;
                    },
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.current_attr_value.borrow_mut().push_char('\u{fffd}');
                    },
                    FromSet(c) => self.current_attr_value.borrow_mut().push_char(c),
                    NotFromSet(ref b) => self.current_attr_value.borrow_mut().push_tendril(b),
                }
            },

            //§ attribute-value-(single-quoted)-state
            states::AttributeValue(SingleQuoted) => loop {
                match pop_except_from!(self, input, small_char_set!('\r' '\'' '&' '\0' '\n')) {
                    FromSet('\'') => return self.go_to(states::AfterAttributeValueQuoted),
                    FromSet('&') => {
                        self.consume_char_ref();
                        return ProcessResult::Continue;
                    },
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.current_attr_value.borrow_mut().push_char('\u{fffd}');
                    },
                    FromSet(c) => self.current_attr_value.borrow_mut().push_char(c),
                    NotFromSet(ref b) => self.current_attr_value.borrow_mut().push_tendril(b),
                }
            },

            //§ attribute-value-(unquoted)-state
            states::AttributeValue(Unquoted) => loop {
                match pop_except_from!(
                    self,
                    input,
                    small_char_set!('\r' '\t' '\n' '\x0C' ' ' '&' '>' '\0')
                ) {
                    FromSet('\t' | '\n' | '\x0C' | ' ') => {
                        return self.go_to(states::BeforeAttributeName)
                    },
                    FromSet('&') => {
                        self.consume_char_ref();
                        return ProcessResult::Continue;
                    },
                    FromSet('>') => return self.emit_tag_and_go_to(states::Data),
                    FromSet('\0') => {
                        self.bad_char_error();
                        self.current_attr_value.borrow_mut().push_char('\u{fffd}');
                    },
                    FromSet(c) => {
                        if matches!(c, '"' | '\'' | '<' | '=' | '`') {
                            self.bad_char_error();
                        }
                        self.current_attr_value.borrow_mut().push_char(c);
                    },
                    NotFromSet(ref b) => self.current_attr_value.borrow_mut().push_tendril(b),
                }
            },

            //§ after-attribute-value-(quoted)-state
            states::AfterAttributeValueQuoted => loop {
                return match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => self.go_to(states::BeforeAttributeName),
                    '/' => self.go_to(states::SelfClosingStartTag),
                    '>' => self.emit_tag_and_go_to(states::Data),
                    _ => {
                        self.bad_char_error();
                        self.reconsume_in(states::BeforeAttributeName)
                    },
                };
            },

            //§ self-closing-start-tag-state
            states::SelfClosingStartTag => loop {
                return match get_char!(self, input) {
                    '>' => {
                        self.current_tag_self_closing.set(true);
                        self.emit_tag_and_go_to(states::Data)
                    },
                    _ => {
                        self.bad_char_error();
                        self.reconsume_in(states::BeforeAttributeName)
                    },
                };
            },

            //§ comment-start-state
            states::CommentStart => loop {
                return match get_char!(self, input) {
                    '-' => self.go_to(states::CommentStartDash),
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_char('\u{fffd}');
                        self.go_to(states::Comment)
                    },
                    '>' => {
                        self.bad_char_error();
                        self.emit_current_comment();
                        self.go_to(states::Data)
                    },
                    _ => self.reconsume_in(states::Comment),
                };
            },

            //§ comment-start-dash-state
            states::CommentStartDash => loop {
                return match get_char!(self, input) {
                    '-' => self.go_to(states::CommentEnd),
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_slice("-\u{fffd}");
                        self.go_to(states::Comment)
                    },
                    '>' => {
                        self.bad_char_error();
                        self.emit_current_comment();
                        self.go_to(states::Data)
                    },
                    _ => {
                        self.current_comment.borrow_mut().push_char('-');
                        self.reconsume_in(states::Comment)
                    },
                };
            },

            //§ comment-state
            states::Comment => loop {
                match get_char!(self, input) {
                    c @ '<' => {
                        self.current_comment.borrow_mut().push_char(c);
                        return self.go_to(states::CommentLessThanSign);
                    },
                    '-' => return self.go_to(states::CommentEndDash),
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_char('\u{fffd}');
                    },
                    c => self.current_comment.borrow_mut().push_char(c),
                }
            },

            //§ comment-less-than-sign-state
            states::CommentLessThanSign => loop {
                return match get_char!(self, input) {
                    c @ '!' => {
                        self.current_comment.borrow_mut().push_char(c);
                        self.go_to(states::CommentLessThanSignBang)
                    },
                    c @ '<' => {
                        self.current_comment.borrow_mut().push_char(c);
                        ProcessResult::Continue
                    },
                    _ => self.reconsume_in(states::Comment),
                };
            },

            //§ comment-less-than-sign-bang-state
            states::CommentLessThanSignBang => loop {
                return match get_char!(self, input) {
                    '-' => self.go_to(states::CommentLessThanSignBangDash),
                    _ => self.reconsume_in(states::Comment),
                };
            },

            //§ comment-less-than-sign-bang-dash-state
            states::CommentLessThanSignBangDash => loop {
                return match get_char!(self, input) {
                    '-' => self.go_to(states::CommentLessThanSignBangDashDash),
                    _ => self.reconsume_in(states::CommentEndDash),
                };
            },

            //§ comment-less-than-sign-bang-dash-dash-state
            states::CommentLessThanSignBangDashDash => loop {
                return match get_char!(self, input) {
                    '>' => self.reconsume_in(states::CommentEnd),
                    _ => {
                        self.bad_char_error();
                        self.reconsume_in(states::CommentEnd)
                    },
                };
            },

            //§ comment-end-dash-state
            states::CommentEndDash => loop {
                return match get_char!(self, input) {
                    '-' => self.go_to(states::CommentEnd),
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_slice("-\u{fffd}");
                        self.go_to(states::Comment)
                    },
                    _ => {
                        self.current_comment.borrow_mut().push_char('-');
                        self.reconsume_in(states::Comment)
                    },
                };
            },

            //§ comment-end-state
            states::CommentEnd => loop {
                match get_char!(self, input) {
                    '>' => {
                        self.emit_current_comment();
                        return self.go_to(states::Data);
                    },
                    '!' => return self.go_to(states::CommentEndBang),
                    '-' => self.current_comment.borrow_mut().push_char('-'),
                    _ => {
                        self.current_comment.borrow_mut().push_slice("--");
                        return self.reconsume_in(states::Comment);
                    },
                }
            },

            //§ comment-end-bang-state
            states::CommentEndBang => loop {
                return match get_char!(self, input) {
                    '-' => {
                        self.current_comment.borrow_mut().push_slice("--!");
                        self.go_to(states::CommentEndDash)
                    },
                    '>' => {
                        self.bad_char_error();
                        self.emit_current_comment();
                        self.go_to(states::Data)
                    },
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_slice("--!\u{fffd}");
                        self.go_to(states::Comment)
                    },
                    _ => {
                        self.current_comment.borrow_mut().push_slice("--!");
                        self.reconsume_in(states::Comment)
                    },
                };
            },

            //§ doctype-state
            states::Doctype => loop {
                return match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => self.go_to(states::BeforeDoctypeName),
                    _ => {
                        self.bad_char_error();
                        self.reconsume_in(states::BeforeDoctypeName)
                    },
                };
            },

            //§ before-doctype-name-state
            states::BeforeDoctypeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '\0' => {
                        self.bad_char_error();
                        *self.current_doctype.borrow_mut() = Doctype::default();
                        self.current_doctype.borrow_mut().name = Some("\u{fffd}".into());
                        return self.go_to(states::DoctypeName);
                    },
                    '>' => {
                        self.bad_char_error();
                        *self.current_doctype.borrow_mut() = Doctype::default();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    c => {
                        *self.current_doctype.borrow_mut() = Doctype::default();
                        self.current_doctype.borrow_mut().name =
                            Some(StrTendril::from_char(c.to_ascii_lowercase()));
                        return self.go_to(states::DoctypeName);
                    },
                }
            },

            //§ doctype-name-state
            states::DoctypeName => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        self.clear_temp_buf();
                        return self.go_to(states::AfterDoctypeName);
                    },
                    '>' => {
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    '\0' => {
                        self.bad_char_error();
                        option_push(&mut self.current_doctype.borrow_mut().name, '\u{fffd}');
                    },
                    c => option_push(
                        &mut self.current_doctype.borrow_mut().name,
                        c.to_ascii_lowercase(),
                    ),
                }
            },

            //§ after-doctype-name-state
            states::AfterDoctypeName => loop {
                if eat!(self, input, "public") {
                    return self.go_to(states::AfterDoctypeKeyword(states::Public));
                }
                if eat!(self, input, "system") {
                    return self.go_to(states::AfterDoctypeKeyword(states::System));
                }
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => {
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    _ => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        return self.reconsume_in(states::BogusDoctype);
                    },
                }
            },

            //§ after-doctype-public-keyword-state after-doctype-system-keyword-state
            states::AfterDoctypeKeyword(kind) => loop {
                return match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        self.go_to(states::BeforeDoctypeIdentifier(kind))
                    },
                    '"' => {
                        self.bad_char_error();
                        self.clear_doctype_id(kind);
                        self.go_to(states::DoctypeIdentifierDoubleQuoted(kind))
                    },
                    '\'' => {
                        self.bad_char_error();
                        self.clear_doctype_id(kind);
                        self.go_to(states::DoctypeIdentifierSingleQuoted(kind))
                    },
                    '>' => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.emit_current_doctype();
                        self.go_to(states::Data)
                    },
                    _ => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.reconsume_in(states::BogusDoctype)
                    },
                };
            },

            //§ before-doctype-public-identifier-state before-doctype-system-identifier-state
            states::BeforeDoctypeIdentifier(kind) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '"' => {
                        self.clear_doctype_id(kind);
                        return self.go_to(states::DoctypeIdentifierDoubleQuoted(kind));
                    },
                    '\'' => {
                        self.clear_doctype_id(kind);
                        return self.go_to(states::DoctypeIdentifierSingleQuoted(kind));
                    },
                    '>' => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    _ => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        return self.reconsume_in(states::BogusDoctype);
                    },
                }
            },

            //§ doctype-public-identifier-(double-quoted)-state doctype-system-identifier-(double-quoted)-state
            states::DoctypeIdentifierDoubleQuoted(kind) => loop {
                match get_char!(self, input) {
                    '"' => return self.go_to(states::AfterDoctypeIdentifier(kind)),
                    '\0' => {
                        self.bad_char_error();
                        self.push_doctype_id(kind, '\u{fffd}');
                    },
                    '>' => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    c => self.push_doctype_id(kind, c),
                }
            },

            //§ doctype-public-identifier-(single-quoted)-state doctype-system-identifier-(single-quoted)-state
            states::DoctypeIdentifierSingleQuoted(kind) => loop {
                match get_char!(self, input) {
                    '\'' => return self.go_to(states::AfterDoctypeIdentifier(kind)),
                    '\0' => {
                        self.bad_char_error();
                        self.push_doctype_id(kind, '\u{fffd}');
                    },
                    '>' => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    c => self.push_doctype_id(kind, c),
                }
            },

            //§ after-doctype-public-identifier-state
            states::AfterDoctypeIdentifier(states::Public) => loop {
                return match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => {
                        self.go_to(states::BetweenDoctypePublicAndSystemIdentifiers)
                    },
                    '>' => {
                        self.emit_current_doctype();
                        self.go_to(states::Data)
                    },
                    '"' => {
                        self.bad_char_error();
                        self.clear_doctype_id(states::System);
                        self.go_to(states::DoctypeIdentifierDoubleQuoted(states::System))
                    },
                    '\'' => {
                        self.bad_char_error();
                        self.clear_doctype_id(states::System);
                        self.go_to(states::DoctypeIdentifierSingleQuoted(states::System))
                    },
                    _ => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        self.reconsume_in(states::BogusDoctype)
                    },
                };
            },

            //§ after-doctype-system-identifier-state
            states::AfterDoctypeIdentifier(states::System) => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => {
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    _ => {
                        self.bad_char_error();
                        return self.reconsume_in(states::BogusDoctype);
                    },
                }
            },

            //§ between-doctype-public-and-system-identifiers-state
            states::BetweenDoctypePublicAndSystemIdentifiers => loop {
                match get_char!(self, input) {
                    '\t' | '\n' | '\x0C' | ' ' => (),
                    '>' => {
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    '"' => {
                        self.clear_doctype_id(states::System);
                        return self.go_to(states::DoctypeIdentifierDoubleQuoted(states::System));
                    },
                    '\'' => {
                        self.clear_doctype_id(states::System);
                        return self.go_to(states::DoctypeIdentifierSingleQuoted(states::System));
                    },
                    _ => {
                        self.bad_char_error();
                        self.current_doctype.borrow_mut().force_quirks = true;
                        return self.reconsume_in(states::BogusDoctype);
                    },
                }
            },

            //§ bogus-doctype-state
            states::BogusDoctype => loop {
                match get_char!(self, input) {
                    '>' => {
                        self.emit_current_doctype();
                        return self.go_to(states::Data);
                    },
                    '\0' => self.bad_char_error(),
                    _ => (),
                }
            },

            //§ bogus-comment-state
            states::BogusComment => loop {
                match get_char!(self, input) {
                    '>' => {
                        self.emit_current_comment();
                        return self.go_to(states::Data);
                    },
                    '\0' => {
                        self.bad_char_error();
                        self.current_comment.borrow_mut().push_char('\u{fffd}');
                    },
                    c => self.current_comment.borrow_mut().push_char(c),
                }
            },

            //§ markup-declaration-open-state
            states::MarkupDeclarationOpen => loop {
                if eat_exact!(self, input, "--") {
                    self.current_comment.borrow_mut().clear();
                    return self.go_to(states::CommentStart);
                }
                if eat!(self, input, "doctype") {
                    return self.go_to(states::Doctype);
                }
                if self
                    .sink
                    .adjusted_current_node_present_but_not_in_html_namespace()
                    && eat_exact!(self, input, "[CDATA[")
                {
                    self.clear_temp_buf();
                    return self.go_to(states::CdataSection);
                }
                self.bad_char_error();
                self.current_comment.borrow_mut().clear();
                return self.go_to(states::BogusComment);
            },

            //§ cdata-section-state
            states::CdataSection => loop {
                match get_char!(self, input) {
                    ']' => return self.go_to(states::CdataSectionBracket),
                    '\0' => {
                        self.emit_temp_buf();
                        self.emit_char('\0');
                    },
                    c => self.temp_buf.borrow_mut().push_char(c),
                }
            },

            //§ cdata-section-bracket
            states::CdataSectionBracket => match get_char!(self, input) {
                ']' => self.go_to(states::CdataSectionEnd),
                _ => {
                    self.temp_buf.borrow_mut().push_char(']');
                    self.reconsume_in(states::CdataSection)
                },
            },

            //§ cdata-section-end
            states::CdataSectionEnd => loop {
                match get_char!(self, input) {
                    ']' => self.temp_buf.borrow_mut().push_char(']'),
                    '>' => {
                        self.emit_temp_buf();
                        return self.go_to(states::Data);
                    },
                    _ => {
                        self.temp_buf.borrow_mut().push_slice("]]");
                        return self.reconsume_in(states::CdataSection);
                    },
                }
            },
            //§ END
        }
    }

    fn step_char_ref_decoder(&self, input: &BufferQueue) -> ProcessResult<Sink::Handle> {
        // Take and replace the decoder so we don't double-mut-borrow self.
        let mut decoder = unwrap_or_return!(self.char_ref_decoder.take(), ProcessResult::Continue);
        let outcome = decoder.step(self, input);

        let progress = match outcome {
            Outcome::Done(char_ref) => {
                self.process_char_ref(char_ref);
                return ProcessResult::Continue;
            },

            Outcome::Stalled => ProcessResult::Suspend,
            Outcome::Stepped => ProcessResult::Continue,
        };

        *self.char_ref_decoder.borrow_mut() = Some(decoder);
        progress
    }

    fn process_char_ref(&self, char_ref: CharRef) {
        let CharRef {
            mut chars,
            mut num_chars,
        } = char_ref;

        if num_chars == 0 {
            chars[0] = '&';
            num_chars = 1;
        }

        for i in 0..num_chars {
            let c = chars[i as usize];
            match self.state.get() {
                states::Data | states::RawData(states::Rcdata) => self.emit_char(c),

                states::AttributeValue(_) => {
                    self.current_attr_value.borrow_mut().push_char(c);
                },

                _ => panic!(
                    "state {:?} should not be reachable in process_char_ref",
                    self.state.get()
                ),
            }
        }
    }

    /// Indicate that we have reached the end of the input.
    pub fn end(&self) {
        // Resolve any half-consumed character reference first, because
        // doing so might un-consume stuff.
        let input = BufferQueue::default();
        match self.char_ref_decoder.take() {
            None => (),
            Some(mut decoder) => {
                let char_ref = decoder.end_of_input(self, &input);
                self.process_char_ref(char_ref);
            },
        }

        // Process all remaining buffered input.
        // If we're waiting for lookahead, we're not gonna get it.
        self.at_eof.set(true);
        assert!(matches!(self.run(&input), TokenizerResult::Done));
        assert!(input.is_empty());

        loop {
            match self.eof_step() {
                ProcessResult::Continue => (),
                ProcessResult::Suspend => break,
                ProcessResult::Script(_) => unreachable!(),
            }
        }

        self.sink.end();
    }

    fn eof_step(&self) -> ProcessResult<Sink::Handle> {
        debug!("processing EOF in state {:?}", self.state.get());
        match self.state.get() {
            states::Data
            | states::RawData(Rcdata)
            | states::RawData(Rawtext)
            | states::RawData(ScriptData)
            | states::Plaintext => {
                self.emit_eof();
                ProcessResult::Suspend
            },

            states::TagName
            | states::RawData(ScriptDataEscaped(_))
            | states::BeforeAttributeName
            | states::AttributeName
            | states::AfterAttributeName
            | states::AttributeValue(_)
            | states::AfterAttributeValueQuoted
            | states::SelfClosingStartTag
            | states::ScriptDataEscapedDash(_)
            | states::ScriptDataEscapedDashDash(_) => {
                self.bad_eof_error();
                self.go_to(states::Data)
            },

            states::BeforeAttributeValue => self.reconsume_in(states::AttributeValue(Unquoted)),

            states::TagOpen => {
                self.bad_eof_error();
                self.emit_char('<');
                self.go_to(states::Data)
            },

            states::EndTagOpen => {
                self.bad_eof_error();
                self.emit_char('<');
                self.emit_char('/');
                self.go_to(states::Data)
            },

            states::RawLessThanSign(ScriptDataEscaped(DoubleEscaped)) => {
                self.go_to(states::RawData(ScriptDataEscaped(DoubleEscaped)))
            },

            states::RawLessThanSign(kind) => {
                self.emit_char('<');
                self.go_to(states::RawData(kind))
            },

            states::RawEndTagOpen(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                self.go_to(states::RawData(kind))
            },

            states::RawEndTagName(kind) => {
                self.emit_char('<');
                self.emit_char('/');
                self.emit_temp_buf();
                self.go_to(states::RawData(kind))
            },

            states::ScriptDataEscapeStart(kind) => {
                self.go_to(states::RawData(ScriptDataEscaped(kind)))
            },

            states::ScriptDataEscapeStartDash => self.go_to(states::RawData(ScriptData)),

            states::ScriptDataDoubleEscapeEnd => {
                self.go_to(states::RawData(ScriptDataEscaped(DoubleEscaped)))
            },

            states::CommentStart
            | states::CommentStartDash
            | states::Comment
            | states::CommentEndDash
            | states::CommentEnd
            | states::CommentEndBang => {
                self.bad_eof_error();
                self.emit_current_comment();
                self.go_to(states::Data)
            },

            states::CommentLessThanSign | states::CommentLessThanSignBang => {
                self.reconsume_in(states::Comment)
            },

            states::CommentLessThanSignBangDash => self.reconsume_in(states::CommentEndDash),

            states::CommentLessThanSignBangDashDash => self.reconsume_in(states::CommentEnd),

            states::Doctype | states::BeforeDoctypeName => {
                self.bad_eof_error();
                *self.current_doctype.borrow_mut() = Doctype::default();
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.go_to(states::Data)
            },

            states::DoctypeName
            | states::AfterDoctypeName
            | states::AfterDoctypeKeyword(_)
            | states::BeforeDoctypeIdentifier(_)
            | states::DoctypeIdentifierDoubleQuoted(_)
            | states::DoctypeIdentifierSingleQuoted(_)
            | states::AfterDoctypeIdentifier(_)
            | states::BetweenDoctypePublicAndSystemIdentifiers => {
                self.bad_eof_error();
                self.current_doctype.borrow_mut().force_quirks = true;
                self.emit_current_doctype();
                self.go_to(states::Data)
            },

            states::BogusDoctype => {
                self.emit_current_doctype();
                self.go_to(states::Data)
            },

            states::BogusComment => {
                self.emit_current_comment();
                self.go_to(states::Data)
            },

            states::MarkupDeclarationOpen => {
                self.bad_char_error();
                self.go_to(states::BogusComment)
            },

            states::CdataSection => {
                self.emit_temp_buf();
                self.bad_eof_error();
                self.go_to(states::Data)
            },

            states::CdataSectionBracket => {
                self.temp_buf.borrow_mut().push_char(']');
                self.go_to(states::CdataSection)
            },

            states::CdataSectionEnd => {
                self.temp_buf.borrow_mut().push_slice("]]");
                self.go_to(states::CdataSection)
            },
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod test {
    use super::option_push; // private items
    use tendril::{SliceExt, StrTendril};

    use super::{TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts};

    use super::interface::{EndTag, StartTag, Tag, TagKind, Token};

    use shrike_markup::BufferQueue;
    use std::cell::RefCell;

    use web_atoms::LocalName;

    // LinesMatch implements the TokenSink trait. It is used for testing to see
    // if current_line is being updated when process_token is called. The lines
    // vector is a collection of the line numbers that each token is on.
    struct LinesMatch {
        tokens: RefCell<Vec<Token>>,
        current_str: RefCell<StrTendril>,
        lines: RefCell<Vec<(Token, u64)>>,
    }

    impl LinesMatch {
        fn new() -> LinesMatch {
            LinesMatch {
                tokens: RefCell::new(vec![]),
                current_str: RefCell::new(StrTendril::new()),
                lines: RefCell::new(vec![]),
            }
        }

        fn push(&self, token: Token, line_number: u64) {
            self.finish_str();
            self.lines.borrow_mut().push((token, line_number));
        }

        fn finish_str(&self) {
            if !self.current_str.borrow().is_empty() {
                let s = self.current_str.take();
                self.tokens.borrow_mut().push(Token::Characters(s));
            }
        }
    }

    impl TokenSink for LinesMatch {
        type Handle = ();

        fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<Self::Handle> {
            match token {
                Token::Characters(b) => {
                    self.current_str.borrow_mut().push_slice(&b);
                },

                Token::NullCharacter => {
                    self.current_str.borrow_mut().push_char('\0');
                },

                Token::ParseError(_) => {
                    panic!("unexpected parse error");
                },

                Token::Tag(mut t) => {
                    match t.kind {
                        EndTag => {
                            t.self_closing = false;
                            t.attrs = vec![];
                        },
                        _ => t.attrs.sort_by(|a1, a2| a1.name.cmp(&a2.name)),
                    }
                    self.push(Token::Tag(t), line_number);
                },

                Token::Eof => (),

                _ => self.push(token, line_number),
            }
            TokenSinkResult::Continue
        }
    }

    // Take in tokens, process them, and return vector with line
    // numbers that each token is on
    fn tokenize(input: Vec<StrTendril>, opts: TokenizerOpts) -> Vec<(Token, u64)> {
        let sink = LinesMatch::new();
        let tok = Tokenizer::new(sink, opts);
        let buffer = BufferQueue::default();
        for chunk in input.into_iter() {
            buffer.push_back(chunk);
            let _ = tok.feed(&buffer);
        }
        tok.end();
        tok.sink.lines.take()
    }

    // Create a tag token
    fn create_tag(token: StrTendril, tagkind: TagKind) -> Token {
        let name = LocalName::from(&*token);

        Token::Tag(Tag {
            kind: tagkind,
            name,
            self_closing: false,
            attrs: vec![],
        })
    }

    #[test]
    fn push_to_None_gives_singleton() {
        let mut s: Option<StrTendril> = None;
        option_push(&mut s, 'x');
        assert_eq!(s, Some("x".to_tendril()));
    }

    #[test]
    fn push_to_empty_appends() {
        let mut s: Option<StrTendril> = Some(StrTendril::new());
        option_push(&mut s, 'x');
        assert_eq!(s, Some("x".to_tendril()));
    }

    #[test]
    fn push_to_nonempty_appends() {
        let mut s: Option<StrTendril> = Some(StrTendril::from_slice("y"));
        option_push(&mut s, 'x');
        assert_eq!(s, Some("yx".to_tendril()));
    }

    #[test]
    fn check_lines() {
        let opts = TokenizerOpts::default();
        let vector = vec![
            StrTendril::from("<a>\n"),
            StrTendril::from("<b>\n"),
            StrTendril::from("</b>\n"),
            StrTendril::from("</a>\n"),
        ];
        let expected = vec![
            (create_tag(StrTendril::from("a"), StartTag), 1),
            (create_tag(StrTendril::from("b"), StartTag), 2),
            (create_tag(StrTendril::from("b"), EndTag), 3),
            (create_tag(StrTendril::from("a"), EndTag), 4),
        ];
        let results = tokenize(vector, opts);
        assert_eq!(results, expected);
    }

    #[test]
    fn check_lines_with_new_line() {
        let opts = TokenizerOpts::default();
        let vector = vec![
            StrTendril::from("<a>\r\n"),
            StrTendril::from("<b>\r\n"),
            StrTendril::from("</b>\r\n"),
            StrTendril::from("</a>\r\n"),
        ];
        let expected = vec![
            (create_tag(StrTendril::from("a"), StartTag), 1),
            (create_tag(StrTendril::from("b"), StartTag), 2),
            (create_tag(StrTendril::from("b"), EndTag), 3),
            (create_tag(StrTendril::from("a"), EndTag), 4),
        ];
        let results = tokenize(vector, opts);
        assert_eq!(results, expected);
    }

    #[test]
    fn named_reference_spread_over_chunks() {
        let opts = TokenizerOpts::default();
        let vector = vec![StrTendril::from("&no"), StrTendril::from("t;x")];
        let results = tokenize(vector, opts);
        assert_eq!(
            results,
            vec![(Token::Characters(StrTendril::from("\u{ac}x")), 1)]
        );
    }

    #[test]
    fn ambiguous_ampersand_in_attribute_keeps_text() {
        let opts = TokenizerOpts::default();
        let results = tokenize(vec![StrTendril::from("<a href=\"?a=b&copy=1\">")], opts);
        match &results[0].0 {
            Token::Tag(tag) => {
                assert_eq!(tag.attrs.len(), 1);
                assert_eq!(&*tag.attrs[0].value, "?a=b&copy=1");
            },
            other => panic!("expected tag token, got {other:?}"),
        }
    }

    #[test]
    fn copy_without_semicolon_in_text_is_decoded() {
        let opts = TokenizerOpts::default();
        let results = tokenize(vec![StrTendril::from("x &copy y")], opts);
        assert_eq!(
            results,
            vec![(Token::Characters(StrTendril::from("x \u{a9} y")), 1)]
        );
    }
}
