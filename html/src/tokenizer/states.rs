// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The states of the tokenizer state machine, one variant per state of
//! the tokenization section of the WHATWG standard. The related states
//! it spells out longhand (the four raw-data families, the quoted
//! attribute values, the public/system doctype identifiers) are folded
//! into parameterized variants here.
//!
//! Public so the tokenizer tests can set an initial state; not useful
//! to ordinary users of the crate.

pub use self::AttrQuoteKind::*;
pub use self::DoctypeIdKind::*;
pub use self::EscapeKind::*;
pub use self::RawTextKind::*;
pub use self::State::*;

/// Which flavor of escaping a script-data state is in.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum EscapeKind {
    Escaped,
    DoubleEscaped,
}

/// Which doctype identifier a doctype state is collecting.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum DoctypeIdKind {
    Public,
    System,
}

/// The four content models that suppress tag tokenization, per
/// <https://html.spec.whatwg.org/#data-state> and friends.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum RawTextKind {
    Rcdata,
    Rawtext,
    ScriptData,
    ScriptDataEscaped(EscapeKind),
}

/// How the attribute value being collected is delimited.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum AttrQuoteKind {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

/// A tokenizer state. Variant names follow the standard's state names,
/// <https://html.spec.whatwg.org/#tokenization>.
#[derive(PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash, Debug)]
pub enum State {
    // Document text and tag dispatch.
    Data,
    Plaintext,
    TagOpen,
    EndTagOpen,
    TagName,

    // Raw-data content models, including the script-data escape dance.
    RawData(RawTextKind),
    RawLessThanSign(RawTextKind),
    RawEndTagOpen(RawTextKind),
    RawEndTagName(RawTextKind),
    ScriptDataEscapeStart(EscapeKind),
    ScriptDataEscapeStartDash,
    ScriptDataEscapedDash(EscapeKind),
    ScriptDataEscapedDashDash(EscapeKind),
    ScriptDataDoubleEscapeEnd,

    // Attributes.
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValue(AttrQuoteKind),
    AfterAttributeValueQuoted,
    SelfClosingStartTag,

    // Comments and the markup declaration that introduces them.
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentLessThanSign,
    CommentLessThanSignBang,
    CommentLessThanSignBangDash,
    CommentLessThanSignBangDashDash,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,

    // Doctypes.
    Doctype,
    BeforeDoctypeName,
    DoctypeName,
    AfterDoctypeName,
    AfterDoctypeKeyword(DoctypeIdKind),
    BeforeDoctypeIdentifier(DoctypeIdKind),
    DoctypeIdentifierDoubleQuoted(DoctypeIdKind),
    DoctypeIdentifierSingleQuoted(DoctypeIdKind),
    AfterDoctypeIdentifier(DoctypeIdKind),
    BetweenDoctypePublicAndSystemIdentifiers,
    BogusDoctype,

    // CDATA sections, reachable only in foreign content.
    CdataSection,
    CdataSectionBracket,
    CdataSectionEnd,
}
