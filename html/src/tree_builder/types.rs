// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types private to the tree builder.

use crate::tokenizer::states::RawTextKind;
use crate::tokenizer::Tag;

use tendril::StrTendril;

/// The insertion modes of the tree construction stage,
/// <https://html.spec.whatwg.org/multipage/parsing.html#insertion-mode>.
/// `Text` covers both the text mode and raw-data content.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum InsertionMode {
    Initial,
    BeforeHtml,
    BeforeHead,
    InHead,
    InHeadNoscript,
    AfterHead,
    InBody,
    Text,
    InTable,
    InTableText,
    InCaption,
    InColumnGroup,
    InTableBody,
    InRow,
    InCell,
    InSelect,
    InSelectInTable,
    InTemplate,
    AfterBody,
    InFrameset,
    AfterFrameset,
    AfterAfterBody,
    AfterAfterFrameset,
}

/// What is known about a text token's contents. Freshly converted
/// tokens are `Unexamined`; modes that care about leading whitespace
/// ask for a split and get back classified runs.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub(crate) enum TextStatus {
    Unexamined,
    Whitespace,
    NotWhitespace,
}

/// The token type the insertion mode rules consume. Doctypes and
/// errors never reach the rules; `process_token` handles those.
#[derive(PartialEq, Eq, Clone, Debug)]
pub(crate) enum Token {
    Tag(Tag),
    Comment(StrTendril),
    Text(TextStatus, StrTendril),
    Null,
    Eof,
}

/// What a single rule application decided.
pub(crate) enum StepOutcome<Handle> {
    /// Token consumed.
    Consumed,
    /// Token consumed, and its self-closing flag (if any) is legal.
    ConsumedAckSelfClosing,
    /// Split the leading whitespace off this text and re-run.
    SplitLeading(StrTendril),
    /// Switch mode and process the token again.
    Reprocess(InsertionMode, Token),
    /// A `</script>` closed this element; the caller must run it.
    Script(Handle),
    /// Put the tokenizer into the plaintext state.
    SwitchToPlaintext,
    /// Put the tokenizer into the given raw-data state.
    SwitchToRawText(RawTextKind),
}

/// An entry in the list of active formatting elements.
pub(crate) enum FormattingEntry<Handle> {
    /// An element, with the tag that created it.
    Element(Handle, Tag),
    /// A scope marker.
    Marker,
}

/// Where a new node goes.
pub(crate) enum InsertLocation<Handle> {
    /// As the last child of this parent.
    AppendTo(Handle),
    /// Foster parenting: before the table if the table has a parent,
    /// otherwise appended to the element just under it on the stack.
    FosterBeside { table: Handle, fallback: Handle },
}
