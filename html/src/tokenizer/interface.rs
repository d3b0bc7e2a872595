// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The boundary between the tokenizer and whatever consumes its
//! tokens: the [`Token`] type and the [`TokenSink`] trait.

use std::borrow::Cow;

use shrike_markup::interface::Attribute;
use tendril::StrTendril;
use web_atoms::LocalName;

use crate::tokenizer::states::RawTextKind;

pub use self::TagKind::{EndTag, StartTag};

/// What the tokenizer emits. `ParseError` tokens carry the error
/// message; everything else maps onto a spec token.
#[derive(PartialEq, Eq, Debug)]
pub enum Token {
    Doctype(Doctype),
    Tag(Tag),
    Comment(StrTendril),
    Characters(StrTendril),
    NullCharacter,
    Eof,
    ParseError(Cow<'static, str>),
}

/// The contents of a `<!DOCTYPE>` token.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct Doctype {
    pub name: Option<StrTendril>,
    pub public_id: Option<StrTendril>,
    pub system_id: Option<StrTendril>,
    pub force_quirks: bool,
}

#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum TagKind {
    StartTag,
    EndTag,
}

/// A start or end tag token, with its attributes in source order.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Tag {
    pub kind: TagKind,
    pub name: LocalName,
    pub self_closing: bool,
    pub attrs: Vec<Attribute>,
}

impl Tag {
    /// Same kind, name, and attribute set, where attribute order (and
    /// the self-closing flag) is not significant. This is the notion of
    /// equality the active formatting element list uses.
    pub fn matches_ignoring_attr_order(&self, other: &Tag) -> bool {
        if self.kind != other.kind || self.name != other.name {
            return false;
        }
        let mut mine = self.attrs.clone();
        let mut theirs = other.attrs.clone();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

/// What the sink wants the tokenizer to do after a token. Raw-data and
/// plaintext switches must come from the sink because only the tree
/// stage knows which elements take raw content.
#[derive(Debug, PartialEq)]
#[must_use]
pub enum TokenSinkResult<Handle> {
    Continue,
    Script(Handle),
    Plaintext,
    RawData(RawTextKind),
}

/// A consumer of tokens.
pub trait TokenSink {
    type Handle;

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<Self::Handle>;

    /// The tokenizer has reached the end of the input.
    fn end(&self) {}

    /// Whether the adjusted current node is a non-HTML element. Decides
    /// if `<![CDATA[` opens a CDATA section or a bogus comment; sinks
    /// with no tree state can leave the default, which treats every
    /// CDATA section as a bogus comment.
    /// <https://html.spec.whatwg.org/multipage/#markup-declaration-open-state>
    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        false
    }
}
