// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The generic rule-grammar engine of CSS Syntax §5.
//!
//! Grammar productions live on an explicit frame stack instead of the
//! native call stack: descending into a nested production pushes a
//! frame, finishing one pops it and resumes the parent, so native
//! stack usage stays constant in CSS nesting depth and the parser can
//! suspend mid-production between input chunks. Output goes through a
//! per-dialect [`GrammarSink`] callback table.

use std::collections::VecDeque;

use log::debug;
use shrike_markup::BufferQueue;
use tendril::StrTendril;

use crate::at_rule::{self, AtRuleBody};
use crate::error::{ErrorId, ParseError, Stage, WrongStage};
use crate::sink::GrammarSink;
use crate::tokenizer::{Token, TokenValue, Tokenizer};

/// A bracket pair the component-value consumer is currently inside.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Group {
    Paren,
    Bracket,
    Brace,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    ListOfRules { top_level: bool },
    AtRulePrelude,
    QualifiedPrelude,
    /// A rule whose block just finished; emits `rule_end` and pops
    /// without looking at a token.
    RuleTail,
    Declarations,
    DeclarationColon,
    DeclarationValue,
    /// Error recovery: swallow a malformed declaration up to the next
    /// `;` or block end, then emit it as undefined.
    DeclarationDrop,
    /// Generic component-value capture for the `consume_*` entry
    /// points.
    Components,
}

/// One grammar production in flight.
struct Frame {
    state: State,
    /// The group that terminates this production, if any.
    block_end: Option<Group>,
    /// How the block of this at-rule is parsed once its `{` arrives.
    body: AtRuleBody,
    /// Open groups this frame is currently inside.
    deep: u32,
    /// Input offset where this production's verbatim capture begins.
    mark: usize,
    important: bool,
}

pub struct RuleParser<S: GrammarSink> {
    pub sink: S,
    tokenizer: Tokenizer,
    lookahead: VecDeque<Token>,
    frames: Vec<Frame>,
    closers: Vec<Group>,
    errors: Vec<ParseError>,
    stage: Stage,
    /// Set when a step needs lookahead input that has not arrived yet
    /// and must retry on the next feed.
    starved: bool,
}

impl<S: GrammarSink> RuleParser<S> {
    /// A parser for a top-level list of rules (a stylesheet).
    pub fn new(sink: S) -> RuleParser<S> {
        let mut parser = RuleParser::empty(sink);
        parser.frames.push(Frame {
            state: State::ListOfRules { top_level: true },
            block_end: None,
            body: AtRuleBody::None,
            deep: 0,
            mark: 0,
            important: false,
        });
        parser
    }

    /// A parser for a bare declaration list, as found in `style="..."`
    /// attributes.
    pub fn new_declaration_list(sink: S) -> RuleParser<S> {
        let mut parser = RuleParser::empty(sink);
        parser.frames.push(Frame {
            state: State::Declarations,
            block_end: None,
            body: AtRuleBody::None,
            deep: 0,
            mark: 0,
            important: false,
        });
        parser
    }

    fn empty(sink: S) -> RuleParser<S> {
        RuleParser {
            sink,
            tokenizer: Tokenizer::new(),
            lookahead: VecDeque::new(),
            frames: Vec::new(),
            closers: Vec::new(),
            errors: Vec::new(),
            stage: Stage::Ready,
            starved: false,
        }
    }

    /// Feed the next chunk of input and drive the grammar as far as
    /// the input allows.
    pub fn feed(&mut self, input: &BufferQueue) -> Result<(), WrongStage> {
        if self.stage == Stage::Finished {
            return Err(WrongStage {
                expected: Stage::Parsing,
                actual: self.stage,
            });
        }
        self.stage = Stage::Parsing;
        self.feed_inner(input);
        Ok(())
    }

    /// Signal end of input and flush everything that was suspended on
    /// a chunk boundary.
    pub fn end(&mut self) -> Result<(), WrongStage> {
        if self.stage == Stage::Finished {
            return Err(WrongStage {
                expected: Stage::Parsing,
                actual: self.stage,
            });
        }
        self.end_inner();
        Ok(())
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_parts(self) -> (S, Vec<ParseError>) {
        (self.sink, self.errors)
    }

    /// Open groups left unclosed so far. Zero at the end of any
    /// complete, balanced input.
    pub fn open_group_depth(&self) -> usize {
        self.closers.len()
    }

    fn feed_inner(&mut self, input: &BufferQueue) {
        while let Some(chunk) = input.pop_front() {
            self.tokenizer.push(chunk);
        }
        self.run();
    }

    fn end_inner(&mut self) {
        self.tokenizer.set_last();
        self.run();
        debug_assert!(self.frames.is_empty());
        self.errors.extend(self.tokenizer.take_errors());
        self.errors.sort_by_key(|e| e.offset);
        self.stage = Stage::Finished;
    }

    // Mid-production entry points for embedding grammars that share
    // this parser's token stream and frame stack.

    /// Continue with an at-rule whose `@name` token the caller already
    /// consumed.
    pub fn consume_at_rule(&mut self, name: StrTendril) {
        let (_, body) = at_rule::lookup(&name);
        self.sink.at_rule_start(name);
        let mark = self.next_offset();
        self.push_frame(State::AtRulePrelude, body, None, mark);
    }

    /// Continue with a qualified rule starting at the next token.
    pub fn consume_qualified_rule(&mut self) {
        self.sink.style_rule_start();
        let mark = self.next_offset();
        self.push_frame(State::QualifiedPrelude, AtRuleBody::Declarations, None, mark);
    }

    /// Generically consume a `{}` block whose opening brace the caller
    /// already consumed, reporting tokens through `block_token`.
    pub fn consume_block(&mut self) {
        self.sink.block_start();
        let mark = self.next_offset();
        self.push_frame(State::Components, AtRuleBody::None, Some(Group::Brace), mark);
    }

    /// Generically consume a function's arguments up to the matching
    /// closing parenthesis.
    pub fn consume_function(&mut self) {
        self.sink.block_start();
        let mark = self.next_offset();
        self.push_frame(State::Components, AtRuleBody::None, Some(Group::Paren), mark);
    }

    /// Consume component values until end of input.
    pub fn consume_components(&mut self) {
        self.sink.block_start();
        let mark = self.next_offset();
        self.push_frame(State::Components, AtRuleBody::None, None, mark);
    }

    /// Consume a declaration list; `in_block` says whether a closing
    /// `}` terminates it.
    pub fn consume_declarations(&mut self, in_block: bool) {
        if in_block {
            self.sink.block_start();
        }
        let mark = self.next_offset();
        let block_end = if in_block { Some(Group::Brace) } else { None };
        self.push_frame(State::Declarations, AtRuleBody::None, block_end, mark);
    }

    fn push_frame(
        &mut self,
        state: State,
        body: AtRuleBody,
        block_end: Option<Group>,
        mark: usize,
    ) {
        self.frames.push(Frame {
            state,
            block_end,
            body,
            deep: 0,
            mark,
            important: false,
        });
    }

    fn top(&mut self) -> &mut Frame {
        self.frames
            .last_mut()
            .expect("frame stack never empties mid-step")
    }

    fn next_offset(&self) -> usize {
        match self.lookahead.front() {
            Some(token) => token.begin,
            None => self.tokenizer.offset(),
        }
    }

    fn error_at(&mut self, id: ErrorId, offset: usize) {
        debug!("css parse error: {} at {}", id.message(), offset);
        self.errors.push(ParseError {
            id,
            offset: offset as u64,
        });
    }

    fn fill_lookahead(&mut self, n: usize) -> Option<()> {
        while self.lookahead.len() < n {
            let token = self.tokenizer.next()?;
            self.lookahead.push_back(token);
        }
        Some(())
    }

    fn peek_clone(&mut self) -> Option<Token> {
        self.fill_lookahead(1)?;
        self.lookahead.front().cloned()
    }

    fn bump(&mut self) {
        self.lookahead.pop_front();
    }

    fn open_group(&mut self, group: Group) {
        self.closers.push(group);
        self.top().deep += 1;
    }

    fn close_group(&mut self, group: Group) {
        if self.top().deep > 0 && self.closers.last() == Some(&group) {
            self.closers.pop();
            self.top().deep -= 1;
        }
    }

    fn track_nesting(&mut self, value: &TokenValue) {
        match value {
            TokenValue::LeftParen | TokenValue::Function(_) => self.open_group(Group::Paren),
            TokenValue::LeftBracket => self.open_group(Group::Bracket),
            TokenValue::LeftBrace => self.open_group(Group::Brace),
            TokenValue::RightParen => self.close_group(Group::Paren),
            TokenValue::RightBracket => self.close_group(Group::Bracket),
            TokenValue::RightBrace => self.close_group(Group::Brace),
            _ => {},
        }
    }

    /// Undo any group tracking the terminating frame leaves behind, so
    /// truncated input cannot skew the balance for later rules.
    fn reset_nesting(&mut self) {
        let deep = self.top().deep;
        let keep = self.closers.len().saturating_sub(deep as usize);
        self.closers.truncate(keep);
        self.top().deep = 0;
    }

    /// Is some enclosing production a `{}` block? Decides whether a
    /// stray `}` ends the current rule or is just a component value.
    fn enclosing_brace(&self) -> bool {
        self.frames
            .iter()
            .rev()
            .skip(1)
            .any(|f| f.block_end == Some(Group::Brace))
    }

    /// The trampoline. Steps the topmost frame until the frame stack
    /// drains (parse complete) or the input runs dry (suspend).
    fn run(&mut self) {
        loop {
            let (state, block_end, deep) = match self.frames.last() {
                Some(f) => (f.state, f.block_end, f.deep),
                None => return,
            };
            if let State::RuleTail = state {
                self.sink.rule_end();
                self.frames.pop();
                continue;
            }

            let Some(token) = self.peek_clone() else {
                return;
            };

            match state {
                State::ListOfRules { top_level } => {
                    self.step_list_of_rules(token, top_level, block_end.is_some())
                },
                State::AtRulePrelude => self.step_at_rule_prelude(token, deep),
                State::QualifiedPrelude => self.step_qualified_prelude(token, deep),
                State::Declarations => self.step_declarations(token, block_end.is_some()),
                State::DeclarationColon => self.step_declaration_colon(token),
                State::DeclarationValue => {
                    self.step_declaration_value(token, deep, block_end.is_some())
                },
                State::DeclarationDrop => {
                    self.step_declaration_drop(token, deep, block_end.is_some())
                },
                State::Components => self.step_components(token, deep, block_end),
                State::RuleTail => unreachable!("handled above"),
            }
            if std::mem::take(&mut self.starved) {
                return;
            }
        }
    }

    fn step_list_of_rules(&mut self, token: Token, top_level: bool, in_block: bool) {
        match token.value {
            TokenValue::Whitespace | TokenValue::Comment(_) => self.bump(),

            TokenValue::Cdo | TokenValue::Cdc if top_level => self.bump(),

            TokenValue::Eof => {
                if in_block {
                    self.error_at(ErrorId::EofInSimpleBlock, token.begin);
                    self.sink.block_end();
                }
                self.frames.pop();
            },

            TokenValue::RightBrace if in_block => {
                self.bump();
                self.sink.block_end();
                self.frames.pop();
            },

            TokenValue::RightBrace => {
                self.error_at(ErrorId::UnexpectedToken, token.begin);
                self.bump();
            },

            TokenValue::AtKeyword(ref name) => {
                let name = name.clone();
                self.bump();
                let (_, body) = at_rule::lookup(&name);
                self.sink.at_rule_start(name);
                self.push_frame(State::AtRulePrelude, body, None, token.end);
            },

            _ => {
                self.sink.style_rule_start();
                self.push_frame(
                    State::QualifiedPrelude,
                    AtRuleBody::Declarations,
                    None,
                    token.begin,
                );
            },
        }
    }

    fn step_at_rule_prelude(&mut self, token: Token, deep: u32) {
        let mark = self.top().mark;
        match token.value {
            TokenValue::Semicolon if deep == 0 => {
                self.bump();
                let prelude = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.prelude_end(prelude);
                self.sink.rule_end();
                self.frames.pop();
            },

            TokenValue::LeftBrace if deep == 0 => {
                self.bump();
                let prelude = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.prelude_end(prelude);
                self.sink.block_start();
                let body = self.top().body;
                self.top().state = State::RuleTail;
                match body {
                    AtRuleBody::Rules => self.push_frame(
                        State::ListOfRules { top_level: false },
                        AtRuleBody::None,
                        Some(Group::Brace),
                        token.end,
                    ),
                    _ => self.push_frame(
                        State::Declarations,
                        AtRuleBody::None,
                        Some(Group::Brace),
                        token.end,
                    ),
                }
            },

            TokenValue::Eof => {
                self.error_at(ErrorId::EofInAtRule, token.begin);
                self.reset_nesting();
                let prelude = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.prelude_end(prelude);
                self.sink.rule_end();
                self.frames.pop();
            },

            TokenValue::RightBrace if deep == 0 && self.enclosing_brace() => {
                // Stray close of an enclosing block; the rule ends
                // here and the `}` is left for the parent.
                self.error_at(ErrorId::UnexpectedToken, token.begin);
                let prelude = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.prelude_end(prelude);
                self.sink.rule_end();
                self.frames.pop();
            },

            _ => {
                self.bump();
                self.track_nesting(&token.value);
                self.sink.prelude_token(&token);
            },
        }
    }

    fn step_qualified_prelude(&mut self, token: Token, deep: u32) {
        let mark = self.top().mark;
        match token.value {
            TokenValue::LeftBrace if deep == 0 => {
                self.bump();
                let prelude = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.prelude_end(prelude);
                self.sink.block_start();
                self.top().state = State::RuleTail;
                self.push_frame(
                    State::Declarations,
                    AtRuleBody::None,
                    Some(Group::Brace),
                    token.end,
                );
            },

            TokenValue::Eof => {
                self.error_at(ErrorId::EofInQualifiedRule, token.begin);
                self.reset_nesting();
                let raw = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.rule_failed(raw);
                self.frames.pop();
            },

            TokenValue::RightBrace if deep == 0 && self.enclosing_brace() => {
                self.error_at(ErrorId::UnexpectedToken, token.begin);
                let raw = self.tokenizer.slice_trimmed(mark, token.begin);
                self.sink.rule_failed(raw);
                self.frames.pop();
            },

            _ => {
                self.bump();
                self.track_nesting(&token.value);
                self.sink.prelude_token(&token);
            },
        }
    }

    fn step_declarations(&mut self, token: Token, in_block: bool) {
        match token.value {
            TokenValue::Whitespace | TokenValue::Comment(_) | TokenValue::Semicolon => self.bump(),

            TokenValue::Eof => {
                if in_block {
                    self.error_at(ErrorId::EofInSimpleBlock, token.begin);
                    self.sink.block_end();
                }
                self.frames.pop();
            },

            TokenValue::RightBrace if in_block => {
                self.bump();
                self.sink.block_end();
                self.frames.pop();
            },

            TokenValue::Ident(ref name) => {
                let name = name.clone();
                self.bump();
                self.sink.declaration_name(name);
                let top = self.top();
                top.mark = token.begin;
                top.important = false;
                top.state = State::DeclarationColon;
            },

            // At-rules may appear between declarations, e.g. inside
            // `@media` bodies nested in other at-rules.
            TokenValue::AtKeyword(ref name) => {
                let name = name.clone();
                self.bump();
                let (_, body) = at_rule::lookup(&name);
                self.sink.at_rule_start(name);
                self.push_frame(State::AtRulePrelude, body, None, token.end);
            },

            _ => {
                self.error_at(ErrorId::UnexpectedTokenInDeclaration, token.begin);
                let top = self.top();
                top.mark = token.begin;
                top.state = State::DeclarationDrop;
            },
        }
    }

    fn step_declaration_colon(&mut self, token: Token) {
        match token.value {
            TokenValue::Whitespace | TokenValue::Comment(_) => self.bump(),

            TokenValue::Colon => {
                self.bump();
                self.top().state = State::DeclarationValue;
            },

            TokenValue::Eof => {
                self.error_at(ErrorId::MissingDeclarationColon, token.begin);
                self.emit_undefined(token.begin);
                self.top().state = State::Declarations;
            },

            _ => {
                self.error_at(ErrorId::MissingDeclarationColon, token.begin);
                self.top().state = State::DeclarationDrop;
            },
        }
    }

    fn step_declaration_value(&mut self, token: Token, deep: u32, in_block: bool) {
        match token.value {
            TokenValue::Semicolon if deep == 0 => {
                self.bump();
                let important = self.top().important;
                self.sink.declaration_end(important);
                self.top().state = State::Declarations;
            },

            TokenValue::RightBrace if deep == 0 && in_block => {
                let important = self.top().important;
                self.sink.declaration_end(important);
                self.top().state = State::Declarations;
            },

            TokenValue::Eof => {
                self.reset_nesting();
                let important = self.top().important;
                self.sink.declaration_end(important);
                self.top().state = State::Declarations;
            },

            TokenValue::Delim('!') if deep == 0 => match self.lookahead_important(in_block) {
                None => {
                    // Ran out of lookahead input mid-decision; leave
                    // the `!` unconsumed and retry on the next feed.
                    self.starved = true;
                },
                Some(true) => self.top().important = true,
                Some(false) => {
                    self.bump();
                    self.sink.declaration_value_token(&token);
                },
            },

            _ => {
                self.bump();
                self.track_nesting(&token.value);
                self.sink.declaration_value_token(&token);
            },
        }
    }

    fn step_declaration_drop(&mut self, token: Token, deep: u32, in_block: bool) {
        match token.value {
            TokenValue::Semicolon if deep == 0 => {
                self.bump();
                self.emit_undefined(token.begin);
                self.top().state = State::Declarations;
            },

            TokenValue::RightBrace if deep == 0 && in_block => {
                self.emit_undefined(token.begin);
                self.top().state = State::Declarations;
            },

            TokenValue::Eof => {
                self.reset_nesting();
                self.emit_undefined(token.begin);
                self.top().state = State::Declarations;
            },

            _ => {
                self.bump();
                self.track_nesting(&token.value);
            },
        }
    }

    fn emit_undefined(&mut self, end: usize) {
        let mark = self.top().mark;
        let raw = self.tokenizer.slice_trimmed(mark, end);
        if !raw.is_empty() {
            self.sink.declaration_undefined(raw);
        }
    }

    fn step_components(&mut self, token: Token, deep: u32, block_end: Option<Group>) {
        match token.value {
            TokenValue::Eof => {
                match block_end {
                    Some(Group::Paren) => self.error_at(ErrorId::EofInFunction, token.begin),
                    Some(_) => self.error_at(ErrorId::EofInSimpleBlock, token.begin),
                    None => {},
                }
                self.reset_nesting();
                self.sink.block_end();
                self.frames.pop();
            },

            TokenValue::RightBrace if deep == 0 && block_end == Some(Group::Brace) => {
                self.bump();
                self.sink.block_end();
                self.frames.pop();
            },

            TokenValue::RightParen if deep == 0 && block_end == Some(Group::Paren) => {
                self.bump();
                self.sink.block_end();
                self.frames.pop();
            },

            TokenValue::RightBracket if deep == 0 && block_end == Some(Group::Bracket) => {
                self.bump();
                self.sink.block_end();
                self.frames.pop();
            },

            _ => {
                self.bump();
                self.track_nesting(&token.value);
                self.sink.block_token(&token);
            },
        }
    }

    /// The one place `!important` is decided. Peeks past whitespace
    /// and comments for an `important` ident followed (again past
    /// trivia) by something that ends the declaration, consuming up to
    /// the ident only on a match. Returns `None` when the answer needs
    /// input that has not arrived yet.
    fn lookahead_important(&mut self, in_block: bool) -> Option<bool> {
        let mut i = 1;
        let ident_at = loop {
            self.fill_lookahead(i + 1)?;
            match &self.lookahead[i].value {
                TokenValue::Whitespace | TokenValue::Comment(_) => i += 1,
                TokenValue::Ident(name) if name.eq_ignore_ascii_case("important") => break i,
                _ => return Some(false),
            }
        };

        let mut j = ident_at + 1;
        loop {
            self.fill_lookahead(j + 1)?;
            match &self.lookahead[j].value {
                TokenValue::Whitespace | TokenValue::Comment(_) => j += 1,
                TokenValue::Semicolon | TokenValue::Eof => break,
                TokenValue::RightBrace if in_block => break,
                _ => return Some(false),
            }
        }

        // Swallow `!` through `important`; the terminator is left for
        // the value state to see.
        for _ in 0..=ident_at {
            self.lookahead.pop_front();
        }
        Some(true)
    }
}

#[cfg(test)]
mod test {
    use super::RuleParser;
    use crate::sink::StylesheetSink;
    use crate::tree::RuleData;
    use shrike_markup::BufferQueue;
    use tendril::StrTendril;

    fn parse(input: &str) -> RuleParser<StylesheetSink> {
        let mut parser = RuleParser::new(StylesheetSink::new());
        let buf = BufferQueue::default();
        buf.push_back(StrTendril::from(input));
        parser.feed(&buf).expect("fresh parser accepts input");
        parser.end().expect("single end");
        parser
    }

    fn collect_declarations(
        arena: &crate::tree::RuleArena,
        id: crate::tree::RuleId,
        out: &mut Vec<RuleData>,
    ) {
        for child in arena.children(id) {
            if matches!(arena.get(child).data, RuleData::Declaration { .. }) {
                out.push(arena.get(child).data.clone());
            }
            collect_declarations(arena, child, out);
        }
    }

    fn declarations(parser: &RuleParser<StylesheetSink>) -> Vec<RuleData> {
        let mut out = vec![];
        collect_declarations(&parser.sink.arena, parser.sink.root, &mut out);
        out
    }

    #[test]
    fn important_and_undefined_declarations() {
        let parser = parse("a { color: red !important; invalid-no-colon }");
        let decls = declarations(&parser);
        assert_eq!(decls.len(), 2);
        assert_eq!(
            decls[0],
            RuleData::Declaration {
                name: "color".into(),
                value: "red".into(),
                important: true,
                undefined: false,
            }
        );
        assert_eq!(
            decls[1],
            RuleData::Declaration {
                name: "".into(),
                value: "invalid-no-colon".into(),
                important: false,
                undefined: true,
            }
        );
    }

    #[test]
    fn bang_without_important_stays_in_value() {
        let parser = parse("a { x: yes !maybe; }");
        let decls = declarations(&parser);
        assert_eq!(
            decls[0],
            RuleData::Declaration {
                name: "x".into(),
                value: "yes !maybe".into(),
                important: false,
                undefined: false,
            }
        );
    }

    #[test]
    fn balance_is_restored_on_complete_input() {
        let parser = parse("a { x: f(1, [2, {3: 4}]) }");
        assert_eq!(parser.open_group_depth(), 0);
        let decls = declarations(&parser);
        assert_eq!(decls.len(), 1);
    }

    #[test]
    fn semicolons_inside_groups_do_not_end_the_declaration() {
        let parser = parse("a { x: f(1;2); y: 3 }");
        let decls = declarations(&parser);
        assert_eq!(decls.len(), 2);
        assert_eq!(
            decls[0],
            RuleData::Declaration {
                name: "x".into(),
                value: "f(1;2)".into(),
                important: false,
                undefined: false,
            }
        );
    }

    #[test]
    fn feeding_after_end_is_a_stage_error() {
        let mut parser = RuleParser::new(StylesheetSink::new());
        let buf = BufferQueue::default();
        buf.push_back(StrTendril::from("a{}"));
        parser.feed(&buf).expect("fresh parser accepts input");
        parser.end().expect("single end");
        assert!(parser.feed(&buf).is_err());
        assert!(parser.end().is_err());
    }
}
