// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The dialect seam of the grammar parser.
//!
//! The engine in [`crate::parser`] is grammar-generic: it drives one of
//! these callback tables per dialect. [`StylesheetSink`] is the default
//! dialect and builds the arena rule tree; embedders with their own
//! output (selector engines, inline-style consumers) implement
//! [`GrammarSink`] themselves.

use crate::at_rule::{self, AtRuleBody};
use crate::tokenizer::Token;
use crate::tree::{RuleArena, RuleData, RuleId};
use tendril::StrTendril;

/// Callbacks the grammar engine drives while consuming productions.
///
/// Events arrive strictly nested: a rule opens with `at_rule_start` or
/// `style_rule_start` and closes with exactly one of `rule_end` or
/// `rule_failed`; `block_start`/`block_end` pair up inside a rule;
/// declaration events only occur between a block's start and end (or at
/// the top level when parsing a bare declaration list).
pub trait GrammarSink {
    fn at_rule_start(&mut self, name: StrTendril);
    fn style_rule_start(&mut self);

    /// One raw component-value token of the current prelude. The
    /// verbatim prelude text follows in `prelude_end`.
    fn prelude_token(&mut self, _token: &Token) {}
    fn prelude_end(&mut self, prelude: StrTendril);

    fn block_start(&mut self);
    /// One raw token inside a generically consumed block or component
    /// sequence.
    fn block_token(&mut self, _token: &Token) {}
    fn block_end(&mut self);

    fn declaration_name(&mut self, name: StrTendril);
    fn declaration_value_token(&mut self, token: &Token);
    fn declaration_end(&mut self, important: bool);
    /// A declaration that failed to parse, carrying its raw text. No
    /// declaration is ever silently dropped; it degrades to this.
    fn declaration_undefined(&mut self, raw: StrTendril);

    fn rule_failed(&mut self, raw: StrTendril);
    fn rule_end(&mut self);
}

/// Builds the [`RuleArena`] tree out of grammar events.
pub struct StylesheetSink {
    pub arena: RuleArena,
    pub root: RuleId,
    lists: Vec<RuleId>,
    rules: Vec<(RuleId, AtRuleBody)>,
    decl_name: StrTendril,
    value_buf: String,
}

impl StylesheetSink {
    pub fn new() -> StylesheetSink {
        let mut arena = RuleArena::new();
        let root = arena.alloc(RuleData::RuleList);
        StylesheetSink {
            arena,
            root,
            lists: vec![root],
            rules: vec![],
            decl_name: StrTendril::new(),
            value_buf: String::new(),
        }
    }

    /// For parsing a bare declaration list, where declarations attach
    /// directly to a `DeclarationList` root instead of a rule list.
    pub fn new_declaration_list() -> StylesheetSink {
        let mut arena = RuleArena::new();
        let root = arena.alloc(RuleData::DeclarationList);
        StylesheetSink {
            arena,
            root,
            lists: vec![root],
            rules: vec![],
            decl_name: StrTendril::new(),
            value_buf: String::new(),
        }
    }

    fn current_list(&self) -> RuleId {
        *self.lists.last().expect("list stack never empties")
    }

    fn append(&mut self, data: RuleData) {
        let id = self.arena.alloc(data);
        self.arena.append_child(self.current_list(), id);
    }
}

impl Default for StylesheetSink {
    fn default() -> Self {
        StylesheetSink::new()
    }
}

impl GrammarSink for StylesheetSink {
    fn at_rule_start(&mut self, name: StrTendril) {
        let (kind, body) = at_rule::lookup(&name);
        let id = self.arena.alloc(RuleData::AtRule {
            kind,
            name,
            prelude: StrTendril::new(),
        });
        self.rules.push((id, body));
    }

    fn style_rule_start(&mut self) {
        let id = self.arena.alloc(RuleData::StyleRule {
            prelude: StrTendril::new(),
        });
        self.rules.push((id, AtRuleBody::Declarations));
    }

    fn prelude_end(&mut self, text: StrTendril) {
        let &(id, _) = self.rules.last().expect("prelude outside a rule");
        match &mut self.arena.get_mut(id).data {
            RuleData::AtRule { prelude, .. } | RuleData::StyleRule { prelude } => *prelude = text,
            _ => {},
        }
    }

    fn block_start(&mut self) {
        let &(rule, body) = self.rules.last().expect("block outside a rule");
        let list = self.arena.alloc(match body {
            AtRuleBody::Rules => RuleData::RuleList,
            _ => RuleData::DeclarationList,
        });
        self.arena.append_child(rule, list);
        self.lists.push(list);
    }

    fn block_end(&mut self) {
        self.lists.pop();
    }

    fn declaration_name(&mut self, name: StrTendril) {
        self.decl_name = name;
    }

    fn declaration_value_token(&mut self, token: &Token) {
        token.value.serialize_to(&mut self.value_buf);
    }

    fn declaration_end(&mut self, important: bool) {
        let name = std::mem::take(&mut self.decl_name);
        let value = StrTendril::from_slice(self.value_buf.trim());
        self.value_buf.clear();
        self.append(RuleData::Declaration {
            name,
            value,
            important,
            undefined: false,
        });
    }

    fn declaration_undefined(&mut self, raw: StrTendril) {
        self.decl_name.clear();
        self.value_buf.clear();
        self.append(RuleData::Declaration {
            name: StrTendril::new(),
            value: raw,
            important: false,
            undefined: true,
        });
    }

    fn rule_failed(&mut self, raw: StrTendril) {
        // The half-built rule node stays orphaned in the arena.
        self.rules.pop();
        self.append(RuleData::BadStyleRule { raw });
    }

    fn rule_end(&mut self) {
        let (rule, _) = self.rules.pop().expect("rule_end outside a rule");
        self.arena.append_child(self.current_list(), rule);
    }
}
