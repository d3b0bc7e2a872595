// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tree construction: consumes the tokenizer's output and drives a
//! [`TreeSink`]. The insertion mode rules themselves live in `rules`;
//! this module holds the builder state and the shared machinery the
//! rules call into.

pub use crate::interface::{create_element, ElemName, ElementFlags, Tracer, TreeSink};
pub use crate::interface::{AppendNode, AppendText, Attribute, NodeOrText};
pub use crate::interface::{LimitedQuirks, NoQuirks, Quirks, QuirksMode};

use self::foreign::{adjust_foreign_attributes, adjust_mathml_attributes, adjust_svg_attributes};
use self::types::*;

use crate::tokenizer::states::{self as tok_state, RawTextKind};
use crate::tokenizer::{self, Doctype, EndTag, StartTag, Tag, TokenSink, TokenSinkResult};
use crate::tree_builder::tag_sets::*;
use crate::util::str::to_escaped_string;
use crate::{ExpandedName, LocalName, Namespace, QualName};

use std::borrow::Cow::{self, Borrowed};
use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::fmt;

use log::{debug, log_enabled, Level};
use shrike_markup::{expanded_name, local_name, ns};
use tendril::StrTendril;

#[macro_use]
mod tag_sets;

mod data;
mod foreign;
mod rules;
mod types;

/// Options for the tree builder.
#[derive(Copy, Clone)]
pub struct TreeBuilderOpts {
    /// Report every parse error with full detail. Costs some string
    /// formatting on malformed input. Default: false.
    pub exact_errors: bool,

    /// Parse as if scripting were enabled. Among other things this
    /// decides whether `<noscript>` contents are raw text or a normal
    /// subtree. Default: true.
    pub scripting_enabled: bool,

    /// The document comes from an `<iframe srcdoc>` attribute, which
    /// exempts it from the quirks-mode doctype sniffing.
    pub iframe_srcdoc: bool,

    /// Discard the doctype instead of forwarding it to the sink.
    pub drop_doctype: bool,

    /// Quirks mode to start in. Default: NoQuirks.
    pub quirks_mode: QuirksMode,
}

impl Default for TreeBuilderOpts {
    fn default() -> TreeBuilderOpts {
        TreeBuilderOpts {
            exact_errors: false,
            scripting_enabled: true,
            iframe_srcdoc: false,
            drop_doctype: false,
            quirks_mode: NoQuirks,
        }
    }
}

/// The tree construction stage. Implements [`TokenSink`] so it can sit
/// directly behind a tokenizer.
pub struct TreeBuilder<Handle, Sink> {
    opts: TreeBuilderOpts,

    /// Receiver of tree mutations.
    pub sink: Sink,

    /// The current insertion mode.
    mode: Cell<InsertionMode>,

    /// Mode to return to when `Text` or `InTableText` finishes.
    saved_mode: Cell<Option<InsertionMode>>,

    /// Stack of template insertion modes.
    template_modes: RefCell<Vec<InsertionMode>>,

    /// Character tokens accumulated by `InTableText`.
    pending_text: RefCell<Vec<(TextStatus, StrTendril)>>,

    quirks_mode: Cell<QuirksMode>,

    /// The document node, obtained from the sink at construction.
    document: Handle,

    /// The stack of open elements, current node last.
    stack: RefCell<Vec<Handle>>,

    /// The list of active formatting elements.
    format_list: RefCell<Vec<FormattingEntry<Handle>>>,

    /// The head element pointer.
    head_ptr: RefCell<Option<Handle>>,

    /// The form element pointer.
    form_ptr: RefCell<Option<Handle>>,

    frameset_ok: Cell<bool>,

    /// Drop a U+000A immediately following a `<pre>`/`<textarea>`.
    suppress_lf: Cell<bool>,

    /// Foster parenting in effect for the token being processed.
    fostering: Cell<bool>,

    /// Context element when parsing a fragment.
    fragment_ctx: RefCell<Option<Handle>>,

    line: Cell<u64>,
    // Any new field that holds Handles must also be visited by
    // trace_handles() below.
}

impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Create a tree builder that feeds the given sink.
    pub fn new(sink: Sink, opts: TreeBuilderOpts) -> TreeBuilder<Handle, Sink> {
        let document = sink.get_document();
        TreeBuilder {
            opts,
            sink,
            mode: Cell::new(InsertionMode::Initial),
            saved_mode: Cell::new(None),
            template_modes: Default::default(),
            pending_text: Default::default(),
            quirks_mode: Cell::new(opts.quirks_mode),
            document,
            stack: Default::default(),
            format_list: Default::default(),
            head_ptr: Default::default(),
            form_ptr: Default::default(),
            frameset_ok: Cell::new(true),
            suppress_lf: Default::default(),
            fostering: Default::default(),
            fragment_ctx: Default::default(),
            line: Cell::new(1),
        }
    }

    /// Create a tree builder for the fragment parsing algorithm,
    /// <https://html.spec.whatwg.org/multipage/#parsing-html-fragments>.
    /// Seeds the stack with a root `<html>` element and resets the
    /// insertion mode against the context element.
    pub fn new_for_fragment(
        sink: Sink,
        context: Handle,
        form: Option<Handle>,
        opts: TreeBuilderOpts,
    ) -> TreeBuilder<Handle, Sink> {
        let document = sink.get_document();
        let context_is_template =
            sink.elem_name(&context).expanded() == expanded_name!(html "template");
        let template_modes = if context_is_template {
            RefCell::new(vec![InsertionMode::InTemplate])
        } else {
            RefCell::new(vec![])
        };

        let tb = TreeBuilder {
            opts,
            sink,
            mode: Cell::new(InsertionMode::Initial),
            saved_mode: Cell::new(None),
            template_modes,
            pending_text: Default::default(),
            quirks_mode: Cell::new(opts.quirks_mode),
            document,
            stack: Default::default(),
            format_list: Default::default(),
            head_ptr: Default::default(),
            form_ptr: RefCell::new(form),
            frameset_ok: Cell::new(true),
            suppress_lf: Default::default(),
            fostering: Default::default(),
            fragment_ctx: RefCell::new(Some(context)),
            line: Cell::new(1),
        };

        tb.create_root(vec![]);
        let mode = tb.reset_insertion_mode();
        tb.mode.set(mode);

        tb
    }

    /// Tokenizer state the fragment algorithm prescribes for the
    /// context element,
    /// <https://html.spec.whatwg.org/multipage/#concept-frag-parse-context>.
    pub fn initial_tokenizer_state(
        &self,
        context_element_allows_scripting: bool,
    ) -> tok_state::State {
        let fragment_ctx = self.fragment_ctx.borrow();
        let context = fragment_ctx.as_ref().expect("no context element");
        let elem_name = self.sink.elem_name(context);
        let name = match elem_name.expanded() {
            ExpandedName {
                ns: &ns!(html),
                local,
            } => local,
            _ => return tok_state::Data,
        };
        match *name {
            local_name!("title") | local_name!("textarea") => tok_state::RawData(tok_state::Rcdata),

            local_name!("style")
            | local_name!("xmp")
            | local_name!("iframe")
            | local_name!("noembed")
            | local_name!("noframes") => tok_state::RawData(tok_state::Rawtext),

            local_name!("script") => tok_state::RawData(tok_state::ScriptData),

            local_name!("noscript") if context_element_allows_scripting => {
                tok_state::RawData(tok_state::Rawtext)
            },

            local_name!("plaintext") => tok_state::Plaintext,

            _ => tok_state::Data,
        }
    }

    /// Visit every `Handle` held by the builder. Supports sinks backed
    /// by a garbage-collected DOM.
    pub fn trace_handles(&self, tracer: &dyn Tracer<Handle = Handle>) {
        tracer.trace_handle(&self.document);
        for e in &*self.stack.borrow() {
            tracer.trace_handle(e);
        }

        for entry in &*self.format_list.borrow() {
            if let FormattingEntry::Element(handle, _) = entry {
                tracer.trace_handle(handle);
            }
        }

        if let Some(head) = self.head_ptr.borrow().as_ref() {
            tracer.trace_handle(head);
        }

        if let Some(form) = self.form_ptr.borrow().as_ref() {
            tracer.trace_handle(form);
        }

        if let Some(context) = self.fragment_ctx.borrow().as_ref() {
            tracer.trace_handle(context);
        }
    }

    fn log_step(&self, mode: InsertionMode, token: &Token) {
        if log_enabled!(Level::Debug) {
            debug!(
                "processing {} in insertion mode {:?}",
                to_escaped_string(token),
                mode
            );
        }
    }

    /// Run the rules until the token (and everything it spawned) has
    /// been consumed, or control has to return to the tokenizer.
    fn drive(&self, mut token: Token) -> TokenSinkResult<Handle> {
        // Trailing runs from a whitespace split wait here; the queue
        // stays empty unless a mode asked for a split.
        let mut queued = VecDeque::new();

        loop {
            let expects_ack = matches!(
                token,
                Token::Tag(Tag {
                    self_closing: true,
                    kind: StartTag,
                    ..
                })
            );
            let outcome = if self.needs_foreign_rules(&token) {
                self.step_foreign(token)
            } else {
                self.step(self.mode.get(), token)
            };
            match outcome {
                StepOutcome::Consumed => {
                    if expects_ack {
                        self.sink
                            .parse_error(Borrowed("Unacknowledged self-closing tag"));
                    }
                    let Some(next) = queued.pop_front() else {
                        return TokenSinkResult::Continue;
                    };
                    token = next;
                },
                StepOutcome::ConsumedAckSelfClosing => {
                    let Some(next) = queued.pop_front() else {
                        return TokenSinkResult::Continue;
                    };
                    token = next;
                },
                StepOutcome::Reprocess(mode, t) => {
                    self.mode.set(mode);
                    token = t;
                },
                StepOutcome::SplitLeading(mut buf) => {
                    let run = buf.pop_front_char_run(|c| c.is_ascii_whitespace());
                    let Some((run, is_whitespace)) = run else {
                        return TokenSinkResult::Continue;
                    };
                    let status = if is_whitespace {
                        TextStatus::Whitespace
                    } else {
                        TextStatus::NotWhitespace
                    };
                    token = Token::Text(status, run);

                    if buf.len32() > 0 {
                        queued.push_back(Token::Text(TextStatus::Unexamined, buf));
                    }
                },
                StepOutcome::Script(node) => {
                    assert!(queued.is_empty());
                    return TokenSinkResult::Script(node);
                },
                StepOutcome::SwitchToPlaintext => {
                    assert!(queued.is_empty());
                    return TokenSinkResult::Plaintext;
                },
                StepOutcome::SwitchToRawText(kind) => {
                    assert!(queued.is_empty());
                    return TokenSinkResult::RawData(kind);
                },
            }
        }
    }

    /// Whether this builder runs the fragment parsing algorithm.
    pub fn is_fragment(&self) -> bool {
        self.fragment_ctx.borrow().is_some()
    }

    /// <https://html.spec.whatwg.org/multipage/#appropriate-place-for-inserting-a-node>
    fn insertion_location(&self, override_target: Option<Handle>) -> InsertLocation<Handle> {
        declare_tag_set!(fosterable = "table" "tbody" "tfoot" "thead" "tr");

        let target = override_target.unwrap_or_else(|| self.current().clone());
        if !(self.fostering.get() && self.elem_matches(&target, fosterable)) {
            if self.is_html_element(&target, local_name!("template")) {
                let contents = self.sink.get_template_contents(&target);
                return InsertLocation::AppendTo(contents);
            }
            return InsertLocation::AppendTo(target);
        }

        // Foster parenting: find the lowest table, or a template
        // content above it.
        let stack = self.stack.borrow();
        let mut above = stack.iter().rev().peekable();
        while let Some(elem) = above.next() {
            if self.is_html_element(elem, local_name!("template")) {
                let contents = self.sink.get_template_contents(elem);
                return InsertLocation::AppendTo(contents);
            }
            if self.is_html_element(elem, local_name!("table")) {
                return InsertLocation::FosterBeside {
                    table: elem.clone(),
                    fallback: (*above.peek().expect("open <table> with nothing beneath it"))
                        .clone(),
                };
            }
        }
        InsertLocation::AppendTo(stack[0].clone())
    }

    fn insert_node(&self, location: InsertLocation<Handle>, child: NodeOrText<Handle>) {
        match location {
            InsertLocation::AppendTo(parent) => self.sink.append(&parent, child),
            InsertLocation::FosterBeside { table, fallback } => {
                self.sink.append_based_on_parent_node(&table, &fallback, child)
            },
        }
    }
}

impl<Handle, Sink> TokenSink for TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    type Handle = Handle;

    fn process_token(&self, token: tokenizer::Token, line_number: u64) -> TokenSinkResult<Handle> {
        if line_number != self.line.get() {
            self.line.set(line_number);
            self.sink.set_current_line(line_number);
        }
        let suppress_lf = self.suppress_lf.take();

        // Errors and doctypes never reach the rules; everything else
        // converts to the rules' own token type.
        let token = match token {
            tokenizer::Token::ParseError(e) => {
                self.sink.parse_error(e);
                return TokenSinkResult::Continue;
            },

            tokenizer::Token::Doctype(dt) => {
                if self.mode.get() == InsertionMode::Initial {
                    let (err, quirk) = data::doctype_error_and_quirks(&dt, self.opts.iframe_srcdoc);
                    if err {
                        self.sink.parse_error(if self.opts.exact_errors {
                            Cow::from(format!("Bad DOCTYPE: {dt:?}"))
                        } else {
                            Cow::from("Bad DOCTYPE")
                        });
                    }
                    let Doctype {
                        name,
                        public_id,
                        system_id,
                        force_quirks: _,
                    } = dt;
                    if !self.opts.drop_doctype {
                        self.sink.append_doctype_to_document(
                            name.unwrap_or_default(),
                            public_id.unwrap_or_default(),
                            system_id.unwrap_or_default(),
                        );
                    }
                    self.set_quirks_mode(quirk);

                    self.mode.set(InsertionMode::BeforeHtml);
                } else {
                    self.sink.parse_error(if self.opts.exact_errors {
                        Cow::from(format!("DOCTYPE in insertion mode {:?}", self.mode.get()))
                    } else {
                        Cow::from("DOCTYPE in body")
                    });
                }
                return TokenSinkResult::Continue;
            },

            tokenizer::Token::Tag(tag) => Token::Tag(tag),
            tokenizer::Token::Comment(text) => Token::Comment(text),
            tokenizer::Token::NullCharacter => Token::Null,
            tokenizer::Token::Eof => Token::Eof,

            tokenizer::Token::Characters(mut text) => {
                if suppress_lf && text.starts_with("\n") {
                    text.pop_front(1);
                }
                if text.is_empty() {
                    return TokenSinkResult::Continue;
                }
                Token::Text(TextStatus::Unexamined, text)
            },
        };

        self.drive(token)
    }

    fn end(&self) {
        for elem in self.stack.borrow_mut().drain(..).rev() {
            self.sink.pop(&elem);
        }
    }

    fn adjusted_current_node_present_but_not_in_html_namespace(&self) -> bool {
        !self.stack.borrow().is_empty()
            && *self.sink.elem_name(&self.adjusted_current()).ns() != ns!(html)
    }
}

/// Where to reinsert the new formatting element in the list during the
/// adoption agency algorithm.
enum Bookmark<Handle> {
    Replace(Handle),
    InsertAfter(Handle),
}

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    fn unexpected<T: fmt::Debug>(&self, _thing: &T) -> StepOutcome<Handle> {
        self.sink.parse_error(if self.opts.exact_errors {
            Cow::from(format!(
                "Unexpected token {} in insertion mode {:?}",
                to_escaped_string(_thing),
                self.mode.get()
            ))
        } else {
            Cow::from("Unexpected token")
        });
        StepOutcome::Consumed
    }

    fn assert_named(&self, node: &Handle, name: LocalName) {
        assert!(self.is_html_element(node, name));
    }

    /// The active formatting entries from the end of the list back to
    /// the nearest marker, cloned out so the caller holds no borrow.
    /// Each item carries the entry's index in the list.
    fn formatting_entries_back_to_marker(&self) -> Vec<(usize, Handle, Tag)> {
        self.format_list
            .borrow()
            .iter()
            .enumerate()
            .rev()
            .map_while(|(i, entry)| match entry {
                FormattingEntry::Marker => None,
                FormattingEntry::Element(h, t) => Some((i, h.clone(), t.clone())),
            })
            .collect()
    }

    fn formatting_index_of(&self, element: &Handle) -> Option<usize> {
        self.format_list.borrow().iter().position(|entry| match entry {
            FormattingEntry::Marker => false,
            FormattingEntry::Element(handle, _) => self.sink.same_node(handle, element),
        })
    }

    fn set_quirks_mode(&self, mode: QuirksMode) {
        self.quirks_mode.set(mode);
        self.sink.set_quirks_mode(mode);
    }

    fn stop_parsing(&self) -> StepOutcome<Handle> {
        StepOutcome::Consumed
    }

    // Switch to the Text insertion mode, remembering the current one,
    // and ask the tokenizer for the given raw-data state. The switch
    // takes effect once the current `process_token` returns.
    fn switch_to_raw_text(&self, kind: RawTextKind) -> StepOutcome<Handle> {
        self.saved_mode.set(Some(self.mode.get()));
        self.mode.set(InsertionMode::Text);
        StepOutcome::SwitchToRawText(kind)
    }

    /// The generic raw text / RCDATA element parsing algorithm.
    fn raw_text_element(&self, tag: Tag, kind: RawTextKind) -> StepOutcome<Handle> {
        self.insert_element_for(tag);
        self.switch_to_raw_text(kind)
    }

    fn current(&self) -> Ref<'_, Handle> {
        Ref::map(self.stack.borrow(), |stack| {
            stack.last().expect("no current element")
        })
    }

    /// The adjusted current node: the context element when only the
    /// root is open in a fragment parse, the current node otherwise.
    fn adjusted_current(&self) -> Ref<'_, Handle> {
        if self.stack.borrow().len() == 1 {
            let fragment_ctx = self.fragment_ctx.borrow();
            if let Ok(ctx) = Ref::filter_map(fragment_ctx, |e| e.as_ref()) {
                return ctx;
            }
        }
        self.current()
    }

    fn current_in<TagSet>(&self, set: TagSet) -> bool
    where
        TagSet: Fn(ExpandedName) -> bool,
    {
        set(self.sink.elem_name(&self.current()).expanded())
    }

    fn append_at_insertion_point(&self, child: NodeOrText<Handle>, override_target: Option<Handle>) {
        let location = self.insertion_location(override_target);
        self.insert_node(location, child);
    }

    /// The adoption agency algorithm,
    /// <https://html.spec.whatwg.org/multipage/#adoption-agency-algorithm>.
    /// The numbered comments follow the algorithm's steps.
    fn adoption_agency(&self, subject: LocalName) {
        // 1. The common case: the subject is the current node and not
        //    an active formatting element.
        if self.current_is(subject.clone())
            && self.formatting_index_of(&self.current()).is_none()
        {
            self.pop();
            return;
        }

        // 2.-4. Outer loop, at most eight runs.
        for _ in 0..8 {
            // 5. The entries are cloned out so the list can be edited.
            let formatting_entry = self
                .formatting_entries_back_to_marker()
                .into_iter()
                .find(|(_, _, tag)| tag.name == subject);

            let Some((list_index, elem, elem_tag)) = formatting_entry else {
                return self.any_other_end_tag_in_body(Tag {
                    kind: EndTag,
                    name: subject,
                    self_closing: false,
                    attrs: vec![],
                });
            };

            let Some(stack_index) = self
                .stack
                .borrow()
                .iter()
                .rposition(|n| self.sink.same_node(n, &elem))
            else {
                self.sink
                    .parse_error(Borrowed("Formatting element not open"));
                self.format_list.borrow_mut().remove(list_index);
                return;
            };

            // 7.
            if !self.in_scope(default_scope, |n| self.sink.same_node(&n, &elem)) {
                self.sink
                    .parse_error(Borrowed("Formatting element not in scope"));
                return;
            }

            // 8.
            if !self.sink.same_node(&self.current(), &elem) {
                self.sink
                    .parse_error(Borrowed("Formatting element not current node"));
            }

            // 9. The furthest block: lowest special element above the
            //    formatting element on the stack.
            let furthest = self
                .stack
                .borrow()
                .iter()
                .enumerate()
                .skip(stack_index)
                .find(|&(_, open)| self.elem_matches(open, special_tag))
                .map(|(i, h)| (i, h.clone()));

            let Some((furthest_index, furthest_block)) = furthest else {
                // 10.
                self.stack.borrow_mut().truncate(stack_index);
                self.format_list.borrow_mut().remove(list_index);
                return;
            };

            // 11.
            let common_ancestor = self.stack.borrow()[stack_index - 1].clone();

            // 12.
            let mut bookmark = Bookmark::Replace(elem.clone());

            // 13. Inner loop, walking up from the furthest block.
            let mut node;
            let mut node_index = furthest_index;
            let mut last_node = furthest_block.clone();

            let mut inner_counter = 0;
            loop {
                // 13.2.
                inner_counter += 1;

                // 13.3.
                node_index -= 1;
                node = self.stack.borrow()[node_index].clone();

                // 13.4.
                if self.sink.same_node(&node, &elem) {
                    break;
                }

                // 13.5.
                if inner_counter > 3 {
                    if let Some(position) = self.formatting_index_of(&node) {
                        self.format_list.borrow_mut().remove(position);
                    }
                    self.stack.borrow_mut().remove(node_index);
                    continue;
                }

                let Some(node_list_index) = self.formatting_index_of(&node) else {
                    // 13.6.
                    self.stack.borrow_mut().remove(node_index);
                    continue;
                };

                // 13.7. Replace the entry and the stack slot with a
                //       fresh element made from the entry's tag.
                let tag = match self.format_list.borrow()[node_list_index] {
                    FormattingEntry::Element(ref h, ref t) => {
                        assert!(self.sink.same_node(h, &node));
                        t.clone()
                    },
                    FormattingEntry::Marker => panic!("marker above the formatting element"),
                };
                let replacement = create_element(
                    &self.sink,
                    QualName::new(None, ns!(html), tag.name.clone()),
                    tag.attrs.clone(),
                );
                self.stack.borrow_mut()[node_index] = replacement.clone();
                self.format_list.borrow_mut()[node_list_index] =
                    FormattingEntry::Element(replacement.clone(), tag);
                node = replacement;

                // 13.8.
                if self.sink.same_node(&last_node, &furthest_block) {
                    bookmark = Bookmark::InsertAfter(node.clone());
                }

                // 13.9.
                self.sink.remove_from_parent(&last_node);
                self.sink.append(&node, AppendNode(last_node.clone()));

                // 13.10.
                last_node = node.clone();
            }

            // 14.
            self.sink.remove_from_parent(&last_node);
            self.append_at_insertion_point(AppendNode(last_node.clone()), Some(common_ancestor));

            // 15.
            let new_element = create_element(
                &self.sink,
                QualName::new(None, ns!(html), elem_tag.name.clone()),
                elem_tag.attrs.clone(),
            );
            let new_entry = FormattingEntry::Element(new_element.clone(), elem_tag);

            // 16.
            self.sink.reparent_children(&furthest_block, &new_element);

            // 17.
            self.sink
                .append(&furthest_block, AppendNode(new_element.clone()));

            // 18.
            match bookmark {
                Bookmark::Replace(to_replace) => {
                    let index = self
                        .formatting_index_of(&to_replace)
                        .expect("bookmark not in the formatting list");
                    self.format_list.borrow_mut()[index] = new_entry;
                },
                Bookmark::InsertAfter(previous) => {
                    let index = self
                        .formatting_index_of(&previous)
                        .expect("bookmark not in the formatting list")
                        + 1;
                    self.format_list.borrow_mut().insert(index, new_entry);
                    let old_index = self
                        .formatting_index_of(&elem)
                        .expect("formatting element vanished from the list");
                    self.format_list.borrow_mut().remove(old_index);
                },
            }

            // 19.
            self.remove_from_stack(&elem);
            let below_furthest_block = self
                .stack
                .borrow()
                .iter()
                .position(|n| self.sink.same_node(n, &furthest_block))
                .expect("furthest block vanished from the stack")
                + 1;
            self.stack.borrow_mut().insert(below_furthest_block, new_element);

            // 20. Loop.
        }
    }

    fn push(&self, elem: &Handle) {
        self.stack.borrow_mut().push(elem.clone());
    }

    fn pop(&self) -> Handle {
        let elem = self.stack.borrow_mut().pop().expect("no current element");
        self.sink.pop(&elem);
        elem
    }

    fn remove_from_stack(&self, elem: &Handle) {
        let position = self
            .stack
            .borrow()
            .iter()
            .rposition(|x| self.sink.same_node(elem, x));
        if let Some(position) = position {
            self.stack.borrow_mut().remove(position);
            self.sink.pop(elem);
        }
    }

    fn entry_is_marker_or_open(&self, entry: &FormattingEntry<Handle>) -> bool {
        match entry {
            FormattingEntry::Marker => true,
            FormattingEntry::Element(node, _) => self
                .stack
                .borrow()
                .iter()
                .rev()
                .any(|n| self.sink.same_node(n, node)),
        }
    }

    /// <https://html.spec.whatwg.org/#reconstruct-the-active-formatting-elements>
    fn reconstruct_active_formatting_elements(&self) {
        let first_to_reopen = {
            let format_list = self.format_list.borrow();

            // Nothing to do if the list is empty or its last entry is
            // a marker or still open.
            let Some(last) = format_list.last() else {
                return;
            };
            if self.entry_is_marker_or_open(last) {
                return;
            }

            // Everything past the last marker or open element gets
            // reopened.
            format_list
                .iter()
                .rposition(|entry| self.entry_is_marker_or_open(entry))
                .map_or(0, |i| i + 1)
        };

        // Reinsert an element for each entry from there to the end,
        // replacing the entry with one for the new element.
        let mut index = first_to_reopen;
        loop {
            let tag = match self.format_list.borrow()[index] {
                FormattingEntry::Element(_, ref t) => t.clone(),
                FormattingEntry::Marker => {
                    panic!("marker past the reconstruction start point")
                },
            };

            let new_element = self.insert_element(ns!(html), tag.name.clone(), tag.attrs.clone());
            self.format_list.borrow_mut()[index] = FormattingEntry::Element(new_element, tag);

            index += 1;
            if index == self.format_list.borrow().len() {
                break;
            }
        }
    }

    /// The first element on the stack, always the root `<html>`.
    fn root_element(&self) -> Ref<'_, Handle> {
        Ref::map(self.stack.borrow(), |stack| &stack[0])
    }

    /// The second element on the stack, if it is an HTML `<body>`.
    fn body_element(&self) -> Option<Ref<'_, Handle>> {
        if self.stack.borrow().len() <= 1 {
            return None;
        }

        let node = Ref::map(self.stack.borrow(), |stack| &stack[1]);
        if self.is_html_element(&node, local_name!("body")) {
            Some(node)
        } else {
            None
        }
    }

    /// Report elements still open when the body ends, except the ones
    /// the standard allows.
    fn audit_body_end(&self) {
        declare_tag_set!(body_end_ok =
            "dd" "dt" "li" "optgroup" "option" "p" "rp" "rt" "tbody" "td" "tfoot" "th"
            "thead" "tr" "body" "html");

        for elem in self.stack.borrow().iter() {
            let error = {
                let elem_name = self.sink.elem_name(elem);
                let name = elem_name.expanded();
                if body_end_ok(name) {
                    continue;
                }

                if self.opts.exact_errors {
                    Cow::from(format!("Unexpected open tag {name:?} at end of body"))
                } else {
                    Cow::from("Unexpected open tag at end of body")
                }
            };
            self.sink.parse_error(error);
            // One error suffices.
            return;
        }
    }

    fn in_scope<TagSet, Pred>(&self, scope: TagSet, pred: Pred) -> bool
    where
        TagSet: Fn(ExpandedName) -> bool,
        Pred: Fn(Handle) -> bool,
    {
        for node in self.stack.borrow().iter().rev() {
            if pred(node.clone()) {
                return true;
            }
            if scope(self.sink.elem_name(node).expanded()) {
                return false;
            }
        }

        // Unreachable: <html> terminates every scope.
        false
    }

    fn elem_matches<TagSet>(&self, elem: &Handle, set: TagSet) -> bool
    where
        TagSet: Fn(ExpandedName) -> bool,
    {
        set(self.sink.elem_name(elem).expanded())
    }

    fn is_html_element(&self, elem: &Handle, name: LocalName) -> bool {
        let elem_name = self.sink.elem_name(elem);
        *elem_name.ns() == ns!(html) && *elem_name.local_name() == name
    }

    fn has_open_html_element(&self, name: LocalName) -> bool {
        self.stack
            .borrow()
            .iter()
            .any(|elem| self.is_html_element(elem, name.clone()))
    }

    fn current_is(&self, name: LocalName) -> bool {
        self.is_html_element(&self.current(), name)
    }

    fn scope_contains<TagSet>(&self, scope: TagSet, name: LocalName) -> bool
    where
        TagSet: Fn(ExpandedName) -> bool,
    {
        self.in_scope(scope, |elem| self.is_html_element(&elem, name.clone()))
    }

    /// <https://html.spec.whatwg.org/#generate-implied-end-tags>
    fn generate_implied_end_tags<TagSet>(&self, set: TagSet)
    where
        TagSet: Fn(ExpandedName) -> bool,
    {
        loop {
            {
                let stack = self.stack.borrow();
                let Some(elem) = stack.last() else {
                    return;
                };
                let elem_name = self.sink.elem_name(elem);
                if !set(elem_name.expanded()) {
                    return;
                }
            }
            self.pop();
        }
    }

    fn generate_implied_end_tags_except(&self, except: LocalName) {
        self.generate_implied_end_tags(|p| {
            if *p.ns == ns!(html) && *p.local == except {
                false
            } else {
                cursory_implied_end(p)
            }
        });
    }

    // Pop elements until the current element is in the set. Nothing is
    // reported to the sink.
    fn pop_to_set<TagSet>(&self, tag_set: TagSet)
    where
        TagSet: Fn(ExpandedName) -> bool,
    {
        while !self.current_in(&tag_set) {
            self.stack.borrow_mut().pop();
        }
    }

    // Pop elements until one matching the predicate has been popped.
    // Returns how many were popped.
    fn pop_through<P>(&self, pred: P) -> usize
    where
        P: Fn(ExpandedName) -> bool,
    {
        let mut n = 0;
        loop {
            n += 1;
            match self.stack.borrow_mut().pop() {
                None => break,
                Some(elem) => {
                    if pred(self.sink.elem_name(&elem).expanded()) {
                        break;
                    }
                },
            }
        }
        n
    }

    fn pop_through_named(&self, name: LocalName) -> usize {
        self.pop_through(|p| *p.ns == ns!(html) && *p.local == name)
    }

    /// Pop up to and including the named element, reporting an error
    /// if anything else had to be popped on the way.
    fn expect_to_close(&self, name: LocalName) {
        if self.pop_through_named(name.clone()) != 1 {
            self.sink.parse_error(if self.opts.exact_errors {
                Cow::from(format!("Unexpected open element while closing {name:?}"))
            } else {
                Cow::from("Unexpected open element")
            });
        }
    }

    fn close_p_element(&self) {
        declare_tag_set!(implied = [cursory_implied_end] - "p");
        self.generate_implied_end_tags(implied);
        self.expect_to_close(local_name!("p"));
    }

    fn close_p_element_in_button_scope(&self) {
        if self.scope_contains(button_scope, local_name!("p")) {
            self.close_p_element();
        }
    }

    /// Whether an `<input>` tag carries `type=hidden`.
    fn input_is_hidden(&self, tag: &Tag) -> bool {
        tag.attrs
            .iter()
            .find(|at| at.name.expanded() == expanded_name!("", "type"))
            .is_some_and(|at| at.value.eq_ignore_ascii_case("hidden"))
    }

    fn with_fostering_in_body(&self, token: Token) -> StepOutcome<Handle> {
        self.fostering.set(true);
        let result = self.step(InsertionMode::InBody, token);
        self.fostering.set(false);
        result
    }

    fn characters_in_table(&self, token: Token) -> StepOutcome<Handle> {
        declare_tag_set!(table_outer = "table" "tbody" "tfoot" "thead" "tr");
        if self.current_in(table_outer) {
            assert!(self.pending_text.borrow().is_empty());
            self.saved_mode.set(Some(self.mode.get()));
            StepOutcome::Reprocess(InsertionMode::InTableText, token)
        } else {
            self.sink.parse_error(if self.opts.exact_errors {
                Cow::from(format!(
                    "Unexpected characters {} in table",
                    to_escaped_string(&token)
                ))
            } else {
                Cow::from("Unexpected characters in table")
            });
            self.with_fostering_in_body(token)
        }
    }

    /// <https://html.spec.whatwg.org/multipage/#reset-the-insertion-mode-appropriately>
    fn reset_insertion_mode(&self) -> InsertionMode {
        let stack = self.stack.borrow();
        for (i, mut node) in stack.iter().enumerate().rev() {
            let last = i == 0usize;
            let fragment_ctx = self.fragment_ctx.borrow();
            if let (true, Some(ctx)) = (last, fragment_ctx.as_ref()) {
                node = ctx;
            }
            let elem_name = self.sink.elem_name(node);
            let name = match elem_name.expanded() {
                ExpandedName {
                    ns: &ns!(html),
                    local,
                } => local,
                _ => continue,
            };
            match *name {
                local_name!("select") => {
                    for ancestor in self.stack.borrow()[0..i].iter().rev() {
                        if self.is_html_element(ancestor, local_name!("template")) {
                            return InsertionMode::InSelect;
                        } else if self.is_html_element(ancestor, local_name!("table")) {
                            return InsertionMode::InSelectInTable;
                        }
                    }
                    return InsertionMode::InSelect;
                },
                local_name!("td") | local_name!("th") => {
                    if !last {
                        return InsertionMode::InCell;
                    }
                },
                local_name!("tr") => return InsertionMode::InRow,
                local_name!("tbody") | local_name!("thead") | local_name!("tfoot") => {
                    return InsertionMode::InTableBody;
                },
                local_name!("caption") => return InsertionMode::InCaption,
                local_name!("colgroup") => return InsertionMode::InColumnGroup,
                local_name!("table") => return InsertionMode::InTable,
                local_name!("template") => {
                    return *self
                        .template_modes
                        .borrow()
                        .last()
                        .expect("open template without a template mode");
                },
                local_name!("head") => {
                    if !last {
                        return InsertionMode::InHead;
                    }
                },
                local_name!("body") => return InsertionMode::InBody,
                local_name!("frameset") => return InsertionMode::InFrameset,
                local_name!("html") => match *self.head_ptr.borrow() {
                    None => return InsertionMode::BeforeHead,
                    Some(_) => return InsertionMode::AfterHead,
                },

                _ => (),
            }
        }
        InsertionMode::InBody
    }

    fn close_cell(&self) {
        self.generate_implied_end_tags(cursory_implied_end);
        if self.pop_through(td_th) != 1 {
            self.sink
                .parse_error(Borrowed("expected to close <td> or <th> with cell"));
        }
        self.clear_formatting_to_marker();
    }

    fn append_text(&self, text: StrTendril) -> StepOutcome<Handle> {
        self.append_at_insertion_point(AppendText(text), None);
        StepOutcome::Consumed
    }

    fn append_comment(&self, text: StrTendril) -> StepOutcome<Handle> {
        let comment = self.sink.create_comment(text);
        self.append_at_insertion_point(AppendNode(comment), None);
        StepOutcome::Consumed
    }

    fn append_comment_to_document(&self, text: StrTendril) -> StepOutcome<Handle> {
        let comment = self.sink.create_comment(text);
        self.sink.append(&self.document, AppendNode(comment));
        StepOutcome::Consumed
    }

    fn append_comment_to_root(&self, text: StrTendril) -> StepOutcome<Handle> {
        let comment = self.sink.create_comment(text);
        self.sink.append(&self.root_element(), AppendNode(comment));
        StepOutcome::Consumed
    }

    fn create_root(&self, attrs: Vec<Attribute>) {
        let elem = create_element(
            &self.sink,
            QualName::new(None, ns!(html), local_name!("html")),
            attrs,
        );
        self.push(&elem);
        self.sink.append(&self.document, AppendNode(elem));
    }

    /// Create an element for a token and insert it at the appropriate
    /// place, <https://html.spec.whatwg.org/multipage/#create-an-element-for-the-token>.
    /// Pushes it on the stack of open elements when `push` is set.
    fn materialize_element(
        &self,
        push: bool,
        ns: Namespace,
        name: LocalName,
        attrs: Vec<Attribute>,
    ) -> Handle {
        declare_tag_set!(form_associatable =
            "button" "fieldset" "input" "object"
            "output" "select" "textarea" "img");

        declare_tag_set!(listed = [form_associatable] - "img");

        let qname = QualName::new(None, ns, name);
        let elem = create_element(&self.sink, qname.clone(), attrs.clone());

        let location = self.insertion_location(None);
        let (parent, beside) = match location {
            InsertLocation::AppendTo(ref p) => (p.clone(), None),
            InsertLocation::FosterBeside {
                ref table,
                ref fallback,
            } => (table.clone(), Some(fallback.clone())),
        };

        // Form association, step 12 of the algorithm.
        let form = self.form_ptr.borrow().clone();
        if let Some(form) = form {
            let associatable = form_associatable(qname.expanded())
                && !self.has_open_html_element(local_name!("template"))
                && !(listed(qname.expanded())
                    && attrs
                        .iter()
                        .any(|a| a.name.expanded() == expanded_name!("", "form")));
            if associatable {
                self.sink
                    .associate_with_form(&elem, &form, (&parent, beside.as_ref()));
            }
        }

        self.insert_node(location, AppendNode(elem.clone()));

        if push {
            self.push(&elem);
        }
        elem
    }

    fn insert_element(&self, ns: Namespace, name: LocalName, attrs: Vec<Attribute>) -> Handle {
        self.materialize_element(true, ns, name, attrs)
    }

    fn insert_element_unpushed(
        &self,
        ns: Namespace,
        name: LocalName,
        attrs: Vec<Attribute>,
    ) -> Handle {
        self.materialize_element(false, ns, name, attrs)
    }

    fn insert_element_for(&self, tag: Tag) -> Handle {
        self.insert_element(ns!(html), tag.name, tag.attrs)
    }

    /// Insert an element that is closed on the spot, like `<br>`.
    fn insert_void_element_for(&self, tag: Tag) -> Handle {
        self.insert_element_unpushed(ns!(html), tag.name, tag.attrs)
    }

    /// Insert an element the markup never spelled out, like the
    /// `<html>` or `<body>` implied by their omission.
    fn insert_synthetic(&self, name: LocalName) -> Handle {
        self.insert_element(ns!(html), name, vec![])
    }

    /// Insert a formatting element and put it on the formatting list,
    /// evicting the earliest of three or more equal entries first.
    fn insert_formatting_element_for(&self, tag: Tag) -> Handle {
        let mut earliest_match = None;
        let mut matches = 0usize;
        for (i, _, old_tag) in self.formatting_entries_back_to_marker() {
            if tag.matches_ignoring_attr_order(&old_tag) {
                earliest_match = Some(i);
                matches += 1;
            }
        }

        if matches >= 3 {
            self.format_list
                .borrow_mut()
                .remove(earliest_match.expect("matches counted without an index"));
        }

        let elem = self.insert_element(ns!(html), tag.name.clone(), tag.attrs.clone());
        self.format_list
            .borrow_mut()
            .push(FormattingEntry::Element(elem.clone(), tag));
        elem
    }

    fn clear_formatting_to_marker(&self) {
        loop {
            match self.format_list.borrow_mut().pop() {
                None | Some(FormattingEntry::Marker) => break,
                _ => (),
            }
        }
    }

    /// "Any other end tag" in the InBody mode: close the matching open
    /// element, or drop the token at the first special element.
    fn any_other_end_tag_in_body(&self, tag: Tag) {
        let mut match_index = None;
        for (i, elem) in self.stack.borrow().iter().enumerate().rev() {
            if self.is_html_element(elem, tag.name.clone()) {
                match_index = Some(i);
                break;
            }

            if self.elem_matches(elem, special_tag) {
                self.sink
                    .parse_error(Borrowed("Found special tag while closing generic tag"));
                return;
            }
        }

        let Some(match_index) = match_index else {
            // Unreachable: the root <html> element is special.
            self.unexpected(&tag);
            return;
        };

        self.generate_implied_end_tags_except(tag.name.clone());

        if match_index != self.stack.borrow().len() - 1 {
            // Mis-nested tags.
            self.unexpected(&tag);
        }
        self.stack.borrow_mut().truncate(match_index);
    }

    /// An `<a>` start tag with an `<a>` still on the formatting list
    /// runs the adoption agency first.
    fn close_open_anchor(&self, tag: &Tag) {
        let Some(node) = self
            .formatting_entries_back_to_marker()
            .into_iter()
            .find(|(_, n, _)| self.is_html_element(n, local_name!("a")))
            .map(|(_, n, _)| n)
        else {
            return;
        };

        self.unexpected(tag);
        self.adoption_agency(local_name!("a"));
        if let Some(index) = self.formatting_index_of(&node) {
            self.format_list.borrow_mut().remove(index);
        }
        self.remove_from_stack(&node);
    }

    /// Whether this token is dispatched to the foreign content rules,
    /// <https://html.spec.whatwg.org/multipage/#tree-construction-dispatcher>.
    fn needs_foreign_rules(&self, token: &Token) -> bool {
        if let Token::Eof = *token {
            return false;
        }

        if self.stack.borrow().is_empty() {
            return false;
        }

        let current = self.adjusted_current();
        let elem_name = self.sink.elem_name(&current);
        let name = elem_name.expanded();
        if let ns!(html) = *name.ns {
            return false;
        }

        if mathml_text_integration_point(name) {
            match *token {
                Token::Text(..) | Token::Null => return false,
                Token::Tag(Tag {
                    kind: StartTag,
                    ref name,
                    ..
                }) if !matches!(*name, local_name!("mglyph") | local_name!("malignmark")) => {
                    return false;
                },
                _ => (),
            }
        }

        if svg_html_integration_point(name) {
            match *token {
                Token::Text(..) | Token::Null => return false,
                Token::Tag(Tag { kind: StartTag, .. }) => return false,
                _ => (),
            }
        }

        if let expanded_name!(mathml "annotation-xml") = name {
            match *token {
                Token::Tag(Tag {
                    kind: StartTag,
                    name: local_name!("svg"),
                    ..
                }) => return false,
                Token::Text(..) | Token::Null | Token::Tag(Tag { kind: StartTag, .. }) => {
                    return !self
                        .sink
                        .is_mathml_annotation_xml_integration_point(&self.adjusted_current());
                },
                _ => {},
            };
        }

        true
    }

    /// Open a MathML or SVG subtree from HTML content.
    fn open_foreign_element(&self, mut tag: Tag, ns: Namespace) -> StepOutcome<Handle> {
        match ns {
            ns!(mathml) => adjust_mathml_attributes(&mut tag),
            ns!(svg) => adjust_svg_attributes(&mut tag),
            _ => (),
        }
        adjust_foreign_attributes(&mut tag);

        if tag.self_closing {
            self.insert_element_unpushed(ns, tag.name, tag.attrs);
            StepOutcome::ConsumedAckSelfClosing
        } else {
            self.insert_element(ns, tag.name, tag.attrs);
            StepOutcome::Consumed
        }
    }

    fn foreign_start_tag(&self, mut tag: Tag) -> StepOutcome<Handle> {
        let current_ns = self.sink.elem_name(&self.adjusted_current()).ns().clone();
        match current_ns {
            ns!(mathml) => adjust_mathml_attributes(&mut tag),
            ns!(svg) => {
                foreign::adjust_svg_tag_name(&mut tag);
                adjust_svg_attributes(&mut tag);
            },
            _ => (),
        }
        adjust_foreign_attributes(&mut tag);
        if tag.self_closing {
            self.insert_element_unpushed(current_ns, tag.name, tag.attrs);
            StepOutcome::ConsumedAckSelfClosing
        } else {
            self.insert_element(current_ns, tag.name, tag.attrs);
            StepOutcome::Consumed
        }
    }

    /// An HTML breakout tag inside foreign content: pop back to HTML
    /// territory and reprocess.
    fn escape_foreign_content(&self, tag: Tag) -> StepOutcome<Handle> {
        self.unexpected(&tag);
        while !self.current_in(|n| {
            *n.ns == ns!(html) || mathml_text_integration_point(n) || svg_html_integration_point(n)
        }) {
            self.pop();
        }
        self.step(self.mode.get(), Token::Tag(tag))
    }
}
