// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An incremental CSS Syntax Module parser: tokenizer and rule-grammar
//! engine, building an arena rule tree or driving a custom
//! [`GrammarSink`].
//!
//! The convenience entry points here parse a complete source string in
//! one call; [`RuleParser`] underneath accepts input in arbitrary
//! chunks and suspends cleanly at chunk boundaries.

pub use error::{ErrorId, ParseError, Stage, WrongStage};
pub use parser::RuleParser;
pub use sink::{GrammarSink, StylesheetSink};
pub use tree::{RuleArena, RuleData, RuleId};

pub mod at_rule;
pub mod error;
pub mod parser;
pub mod sink;
pub mod tokenizer;
pub mod tree;

use shrike_markup::BufferQueue;
use tendril::StrTendril;

/// A parsed stylesheet or declaration list: the rule tree plus every
/// parse error encountered, in source order.
pub struct Stylesheet {
    pub arena: RuleArena,
    pub root: RuleId,
    pub errors: Vec<ParseError>,
}

impl Stylesheet {
    /// The children of the root list node.
    pub fn rules(&self) -> tree::Children<'_> {
        self.arena.children(self.root)
    }
}

/// Run a top-level list-of-rules parse over a complete source,
/// driving the given sink.
pub fn parse_list_of_rules<S: GrammarSink>(sink: S, input: StrTendril) -> (S, Vec<ParseError>) {
    drive(RuleParser::new(sink), input)
}

/// Run a bare declaration-list parse over a complete source, driving
/// the given sink.
pub fn parse_list_of_declarations<S: GrammarSink>(
    sink: S,
    input: StrTendril,
) -> (S, Vec<ParseError>) {
    drive(RuleParser::new_declaration_list(sink), input)
}

/// Parse a complete stylesheet source into a rule tree.
pub fn parse_stylesheet(input: StrTendril) -> Stylesheet {
    let (sink, errors) = parse_list_of_rules(StylesheetSink::new(), input);
    Stylesheet {
        arena: sink.arena,
        root: sink.root,
        errors,
    }
}

/// Parse a bare declaration list, as found in a `style` attribute.
pub fn parse_declaration_list(input: StrTendril) -> Stylesheet {
    let (sink, errors) =
        parse_list_of_declarations(StylesheetSink::new_declaration_list(), input);
    Stylesheet {
        arena: sink.arena,
        root: sink.root,
        errors,
    }
}

fn drive<S: GrammarSink>(mut parser: RuleParser<S>, input: StrTendril) -> (S, Vec<ParseError>) {
    let buf = BufferQueue::default();
    buf.push_back(input);
    parser.feed(&buf).expect("fresh parser accepts input");
    parser.end().expect("fresh parser ends once");
    parser.into_parts()
}
