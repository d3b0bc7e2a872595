// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The insertion mode rules, one method per mode, dispatched from
//! [`TreeBuilder::step`]. Tags branch on kind first and then on name,
//! so each method reads like the corresponding section of the
//! standard.

use std::borrow::Cow::Borrowed;

use shrike_markup::{expanded_name, local_name, ns};
use tendril::{SliceExt, StrTendril};

use crate::interface::Quirks;
use crate::tokenizer::states::{Rawtext, Rcdata, ScriptData};
use crate::tokenizer::{EndTag, StartTag, Tag};
use crate::tree_builder::tag_sets::*;
use crate::tree_builder::types::*;
use crate::tree_builder::{
    create_element, ElemName, NodeOrText::AppendNode, TreeBuilder, TreeSink,
};
use crate::QualName;

fn has_non_whitespace(text: &StrTendril) -> bool {
    text.chars().any(|c| !c.is_ascii_whitespace())
}

#[doc(hidden)]
impl<Handle, Sink> TreeBuilder<Handle, Sink>
where
    Handle: Clone,
    Sink: TreeSink<Handle = Handle>,
{
    /// Apply the current insertion mode's rules to one token,
    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhtml>.
    pub(crate) fn step(&self, mode: InsertionMode, token: Token) -> StepOutcome<Handle> {
        self.log_step(mode, &token);

        match mode {
            InsertionMode::Initial => self.step_initial(token),
            InsertionMode::BeforeHtml => self.step_before_html(token),
            InsertionMode::BeforeHead => self.step_before_head(token),
            InsertionMode::InHead => self.step_in_head(token),
            InsertionMode::InHeadNoscript => self.step_in_head_noscript(token),
            InsertionMode::AfterHead => self.step_after_head(token),
            InsertionMode::InBody => self.step_in_body(token),
            InsertionMode::Text => self.step_text(token),
            InsertionMode::InTable => self.step_in_table(token),
            InsertionMode::InTableText => self.step_in_table_text(token),
            InsertionMode::InCaption => self.step_in_caption(token),
            InsertionMode::InColumnGroup => self.step_in_column_group(token),
            InsertionMode::InTableBody => self.step_in_table_body(token),
            InsertionMode::InRow => self.step_in_row(token),
            InsertionMode::InCell => self.step_in_cell(token),
            InsertionMode::InSelect => self.step_in_select(token),
            InsertionMode::InSelectInTable => self.step_in_select_in_table(token),
            InsertionMode::InTemplate => self.step_in_template(token),
            InsertionMode::AfterBody => self.step_after_body(token),
            InsertionMode::InFrameset => self.step_in_frameset(token),
            InsertionMode::AfterFrameset => self.step_after_frameset(token),
            InsertionMode::AfterAfterBody => self.step_after_after_body(token),
            InsertionMode::AfterAfterFrameset => self.step_after_after_frameset(token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode>
    fn step_initial(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, _) => StepOutcome::Consumed,
            Token::Comment(text) => self.append_comment_to_document(text),
            token => {
                if !self.opts.iframe_srcdoc {
                    self.unexpected(&token);
                    self.set_quirks_mode(Quirks);
                }
                StepOutcome::Reprocess(InsertionMode::BeforeHtml, token)
            },
        }
    }

    fn before_html_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        self.create_root(vec![]);
        StepOutcome::Reprocess(InsertionMode::BeforeHead, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode>
    fn step_before_html(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Comment(text) => self.append_comment_to_document(text),
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, _) => StepOutcome::Consumed,

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => {
                        self.create_root(tag.attrs);
                        self.mode.set(InsertionMode::BeforeHead);
                        StepOutcome::Consumed
                    },
                    _ => self.before_html_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("head")
                    | local_name!("body")
                    | local_name!("html")
                    | local_name!("br") => self.before_html_anything_else(Token::Tag(tag)),
                    _ => self.unexpected(&tag),
                },
            },

            token => self.before_html_anything_else(token),
        }
    }

    fn before_head_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        *self.head_ptr.borrow_mut() = Some(self.insert_synthetic(local_name!("head")));
        StepOutcome::Reprocess(InsertionMode::InHead, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-before-head-insertion-mode>
    fn step_before_head(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, _) => StepOutcome::Consumed,
            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),
                    local_name!("head") => {
                        *self.head_ptr.borrow_mut() = Some(self.insert_element_for(tag));
                        self.mode.set(InsertionMode::InHead);
                        StepOutcome::Consumed
                    },
                    _ => self.before_head_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("head")
                    | local_name!("body")
                    | local_name!("html")
                    | local_name!("br") => self.before_head_anything_else(Token::Tag(tag)),
                    _ => self.unexpected(&tag),
                },
            },

            token => self.before_head_anything_else(token),
        }
    }

    fn in_head_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        self.pop();
        StepOutcome::Reprocess(InsertionMode::AfterHead, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead>
    fn step_in_head(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("base")
                    | local_name!("basefont")
                    | local_name!("bgsound")
                    | local_name!("link")
                    | local_name!("meta") => {
                        self.insert_void_element_for(tag);
                        StepOutcome::ConsumedAckSelfClosing
                    },

                    local_name!("title") => self.raw_text_element(tag, Rcdata),

                    local_name!("noscript") if !self.opts.scripting_enabled => {
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InHeadNoscript);
                        StepOutcome::Consumed
                    },
                    local_name!("noframes") | local_name!("style") | local_name!("noscript") => {
                        self.raw_text_element(tag, Rawtext)
                    },

                    local_name!("script") => {
                        // Scripts are created directly so a fragment
                        // parse can mark them already started.
                        let elem = create_element(
                            &self.sink,
                            QualName::new(None, ns!(html), local_name!("script")),
                            tag.attrs,
                        );
                        if self.is_fragment() {
                            self.sink.mark_script_already_started(&elem);
                        }
                        self.append_at_insertion_point(AppendNode(elem.clone()), None);
                        self.stack.borrow_mut().push(elem);
                        self.switch_to_raw_text(ScriptData)
                    },

                    local_name!("template") => {
                        self.format_list.borrow_mut().push(FormattingEntry::Marker);
                        self.frameset_ok.set(false);
                        self.mode.set(InsertionMode::InTemplate);
                        self.template_modes
                            .borrow_mut()
                            .push(InsertionMode::InTemplate);
                        self.insert_element_for(tag);
                        StepOutcome::Consumed
                    },

                    local_name!("head") => self.unexpected(&tag),

                    _ => self.in_head_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("head") => {
                        self.pop();
                        self.mode.set(InsertionMode::AfterHead);
                        StepOutcome::Consumed
                    },

                    local_name!("body") | local_name!("html") | local_name!("br") => {
                        self.in_head_anything_else(Token::Tag(tag))
                    },

                    local_name!("template") => {
                        if !self.has_open_html_element(local_name!("template")) {
                            self.unexpected(&tag);
                        } else {
                            self.generate_implied_end_tags(thorough_implied_end);
                            self.expect_to_close(local_name!("template"));
                            self.clear_formatting_to_marker();
                            self.template_modes.borrow_mut().pop();
                            self.mode.set(self.reset_insertion_mode());
                        }
                        StepOutcome::Consumed
                    },

                    _ => self.unexpected(&tag),
                },
            },

            token => self.in_head_anything_else(token),
        }
    }

    fn in_head_noscript_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        self.unexpected(&token);
        self.pop();
        StepOutcome::Reprocess(InsertionMode::InHead, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inheadnoscript>
    fn step_in_head_noscript(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            token @ Token::Text(TextStatus::Whitespace, _) => {
                self.step(InsertionMode::InHead, token)
            },
            token @ Token::Comment(_) => self.step(InsertionMode::InHead, token),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("basefont")
                    | local_name!("bgsound")
                    | local_name!("link")
                    | local_name!("meta")
                    | local_name!("noframes")
                    | local_name!("style") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    local_name!("head") | local_name!("noscript") => self.unexpected(&tag),

                    _ => self.in_head_noscript_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("noscript") => {
                        self.pop();
                        self.mode.set(InsertionMode::InHead);
                        StepOutcome::Consumed
                    },

                    local_name!("br") => self.in_head_noscript_anything_else(Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },
            },

            token => self.in_head_noscript_anything_else(token),
        }
    }

    fn after_head_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        self.insert_synthetic(local_name!("body"));
        StepOutcome::Reprocess(InsertionMode::InBody, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-after-head-insertion-mode>
    fn step_after_head(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("body") => {
                        self.insert_element_for(tag);
                        self.frameset_ok.set(false);
                        self.mode.set(InsertionMode::InBody);
                        StepOutcome::Consumed
                    },

                    local_name!("frameset") => {
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InFrameset);
                        StepOutcome::Consumed
                    },

                    // These belong in the head; reopen it briefly.
                    local_name!("base")
                    | local_name!("basefont")
                    | local_name!("bgsound")
                    | local_name!("link")
                    | local_name!("meta")
                    | local_name!("noframes")
                    | local_name!("script")
                    | local_name!("style")
                    | local_name!("template")
                    | local_name!("title") => {
                        self.unexpected(&tag);
                        let head = self
                            .head_ptr
                            .borrow()
                            .as_ref()
                            .expect("no head element")
                            .clone();
                        self.push(&head);
                        let result = self.step(InsertionMode::InHead, Token::Tag(tag));
                        self.remove_from_stack(&head);
                        result
                    },

                    local_name!("head") => self.unexpected(&tag),

                    _ => self.after_head_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    local_name!("body") | local_name!("html") | local_name!("br") => {
                        self.after_head_anything_else(Token::Tag(tag))
                    },

                    _ => self.unexpected(&tag),
                },
            },

            token => self.after_head_anything_else(token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody>
    fn step_in_body(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Null => self.unexpected(&token),

            Token::Text(_, text) => {
                self.reconstruct_active_formatting_elements();
                if has_non_whitespace(&text) {
                    self.frameset_ok.set(false);
                }
                self.append_text(text)
            },

            Token::Comment(text) => self.append_comment(text),

            Token::Eof => {
                if !self.template_modes.borrow().is_empty() {
                    self.step(InsertionMode::InTemplate, token)
                } else {
                    self.audit_body_end();
                    self.stop_parsing()
                }
            },

            Token::Tag(tag) => match tag.kind {
                StartTag => self.in_body_start_tag(tag),
                EndTag => self.in_body_end_tag(tag),
            },
        }
    }

    fn in_body_start_tag(&self, tag: Tag) -> StepOutcome<Handle> {
        match tag.name {
            local_name!("html") => {
                self.unexpected(&tag);
                if !self.has_open_html_element(local_name!("template")) {
                    self.sink
                        .add_attrs_if_missing(&self.root_element(), tag.attrs);
                }
                StepOutcome::Consumed
            },

            local_name!("base")
            | local_name!("basefont")
            | local_name!("bgsound")
            | local_name!("link")
            | local_name!("meta")
            | local_name!("noframes")
            | local_name!("script")
            | local_name!("style")
            | local_name!("template")
            | local_name!("title") => self.step(InsertionMode::InHead, Token::Tag(tag)),

            local_name!("body") => {
                self.unexpected(&tag);
                let body = self.body_element().as_deref().cloned();
                if let Some(ref node) = body {
                    if self.stack.borrow().len() != 1
                        && !self.has_open_html_element(local_name!("template"))
                    {
                        self.frameset_ok.set(false);
                        self.sink.add_attrs_if_missing(node, tag.attrs);
                    }
                }
                StepOutcome::Consumed
            },

            local_name!("frameset") => {
                self.unexpected(&tag);
                if !self.frameset_ok.get() {
                    return StepOutcome::Consumed;
                }

                let Some(body) = self.body_element().map(|b| b.clone()) else {
                    return StepOutcome::Consumed;
                };
                self.sink.remove_from_parent(&body);

                self.stack.borrow_mut().truncate(1);
                self.insert_element_for(tag);
                self.mode.set(InsertionMode::InFrameset);
                StepOutcome::Consumed
            },

            local_name!("address")
            | local_name!("article")
            | local_name!("aside")
            | local_name!("blockquote")
            | local_name!("center")
            | local_name!("details")
            | local_name!("dialog")
            | local_name!("dir")
            | local_name!("div")
            | local_name!("dl")
            | local_name!("fieldset")
            | local_name!("figcaption")
            | local_name!("figure")
            | local_name!("footer")
            | local_name!("header")
            | local_name!("hgroup")
            | local_name!("main")
            | local_name!("menu")
            | local_name!("nav")
            | local_name!("ol")
            | local_name!("p")
            | local_name!("search")
            | local_name!("section")
            | local_name!("summary")
            | local_name!("ul") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("h1")
            | local_name!("h2")
            | local_name!("h3")
            | local_name!("h4")
            | local_name!("h5")
            | local_name!("h6") => {
                self.close_p_element_in_button_scope();
                if self.current_in(heading_tag) {
                    self.sink.parse_error(Borrowed("nested heading tags"));
                    self.pop();
                }
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("pre") | local_name!("listing") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                self.suppress_lf.set(true);
                self.frameset_ok.set(false);
                StepOutcome::Consumed
            },

            local_name!("form") => {
                if self.form_ptr.borrow().is_some()
                    && !self.has_open_html_element(local_name!("template"))
                {
                    self.sink.parse_error(Borrowed("nested forms"));
                } else {
                    self.close_p_element_in_button_scope();
                    let elem = self.insert_element_for(tag);
                    if !self.has_open_html_element(local_name!("template")) {
                        *self.form_ptr.borrow_mut() = Some(elem);
                    }
                }
                StepOutcome::Consumed
            },

            local_name!("li") | local_name!("dd") | local_name!("dt") => {
                declare_tag_set!(close_list = "li");
                declare_tag_set!(close_defn = "dd" "dt");
                declare_tag_set!(extra_special = [special_tag] - "address" "div" "p");
                let is_list_item = tag.name == local_name!("li");

                self.frameset_ok.set(false);

                let mut to_close = None;
                for node in self.stack.borrow().iter().rev() {
                    let elem_name = self.sink.elem_name(node);
                    let name = elem_name.expanded();
                    let closes = if is_list_item {
                        close_list(name)
                    } else {
                        close_defn(name)
                    };
                    if closes {
                        to_close = Some(name.local.clone());
                        break;
                    }
                    if extra_special(name) {
                        break;
                    }
                }

                if let Some(name) = to_close {
                    self.generate_implied_end_tags_except(name.clone());
                    self.expect_to_close(name);
                }

                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("plaintext") => {
                self.close_p_element_in_button_scope();
                self.insert_element_for(tag);
                StepOutcome::SwitchToPlaintext
            },

            local_name!("button") => {
                if self.scope_contains(default_scope, local_name!("button")) {
                    self.sink.parse_error(Borrowed("nested buttons"));
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.pop_through_named(local_name!("button"));
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                StepOutcome::Consumed
            },

            local_name!("a") => {
                self.close_open_anchor(&tag);
                self.reconstruct_active_formatting_elements();
                self.insert_formatting_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("b")
            | local_name!("big")
            | local_name!("code")
            | local_name!("em")
            | local_name!("font")
            | local_name!("i")
            | local_name!("s")
            | local_name!("small")
            | local_name!("strike")
            | local_name!("strong")
            | local_name!("tt")
            | local_name!("u") => {
                self.reconstruct_active_formatting_elements();
                self.insert_formatting_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("nobr") => {
                self.reconstruct_active_formatting_elements();
                if self.scope_contains(default_scope, local_name!("nobr")) {
                    self.sink.parse_error(Borrowed("Nested <nobr>"));
                    self.adoption_agency(local_name!("nobr"));
                    self.reconstruct_active_formatting_elements();
                }
                self.insert_formatting_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("applet") | local_name!("marquee") | local_name!("object") => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.format_list.borrow_mut().push(FormattingEntry::Marker);
                self.frameset_ok.set(false);
                StepOutcome::Consumed
            },

            local_name!("table") => {
                if self.quirks_mode.get() != Quirks {
                    self.close_p_element_in_button_scope();
                }
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                self.mode.set(InsertionMode::InTable);
                StepOutcome::Consumed
            },

            local_name!("area")
            | local_name!("br")
            | local_name!("embed")
            | local_name!("img")
            | local_name!("keygen")
            | local_name!("wbr")
            | local_name!("input") => {
                let keep_frameset_ok = match tag.name {
                    local_name!("input") => self.input_is_hidden(&tag),
                    _ => false,
                };
                self.reconstruct_active_formatting_elements();
                self.insert_void_element_for(tag);
                if !keep_frameset_ok {
                    self.frameset_ok.set(false);
                }
                StepOutcome::ConsumedAckSelfClosing
            },

            local_name!("param") | local_name!("source") | local_name!("track") => {
                self.insert_void_element_for(tag);
                StepOutcome::ConsumedAckSelfClosing
            },

            local_name!("hr") => {
                self.close_p_element_in_button_scope();
                self.insert_void_element_for(tag);
                self.frameset_ok.set(false);
                StepOutcome::ConsumedAckSelfClosing
            },

            local_name!("image") => {
                self.unexpected(&tag);
                self.step(
                    InsertionMode::InBody,
                    Token::Tag(Tag {
                        name: local_name!("img"),
                        ..tag
                    }),
                )
            },

            local_name!("textarea") => {
                self.suppress_lf.set(true);
                self.frameset_ok.set(false);
                self.raw_text_element(tag, Rcdata)
            },

            local_name!("xmp") => {
                self.close_p_element_in_button_scope();
                self.reconstruct_active_formatting_elements();
                self.frameset_ok.set(false);
                self.raw_text_element(tag, Rawtext)
            },

            local_name!("iframe") => {
                self.frameset_ok.set(false);
                self.raw_text_element(tag, Rawtext)
            },

            local_name!("noembed") => self.raw_text_element(tag, Rawtext),

            local_name!("select") => {
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                self.frameset_ok.set(false);
                // These rules may run on behalf of a table mode, in
                // which case self.mode is not InBody.
                self.mode.set(match self.mode.get() {
                    InsertionMode::InTable
                    | InsertionMode::InCaption
                    | InsertionMode::InTableBody
                    | InsertionMode::InRow
                    | InsertionMode::InCell => InsertionMode::InSelectInTable,
                    _ => InsertionMode::InSelect,
                });
                StepOutcome::Consumed
            },

            local_name!("optgroup") | local_name!("option") => {
                if self.current_is(local_name!("option")) {
                    self.pop();
                }
                self.reconstruct_active_formatting_elements();
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("rb") | local_name!("rtc") => {
                if self.scope_contains(default_scope, local_name!("ruby")) {
                    self.generate_implied_end_tags(cursory_implied_end);
                }
                if !self.current_is(local_name!("ruby")) {
                    self.unexpected(&tag);
                }
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("rp") | local_name!("rt") => {
                if self.scope_contains(default_scope, local_name!("ruby")) {
                    self.generate_implied_end_tags_except(local_name!("rtc"));
                }
                if !self.current_is(local_name!("rtc")) && !self.current_is(local_name!("ruby")) {
                    self.unexpected(&tag);
                }
                self.insert_element_for(tag);
                StepOutcome::Consumed
            },

            local_name!("math") => self.open_foreign_element(tag, ns!(mathml)),

            local_name!("svg") => self.open_foreign_element(tag, ns!(svg)),

            local_name!("caption")
            | local_name!("col")
            | local_name!("colgroup")
            | local_name!("frame")
            | local_name!("head")
            | local_name!("tbody")
            | local_name!("td")
            | local_name!("tfoot")
            | local_name!("th")
            | local_name!("thead")
            | local_name!("tr") => self.unexpected(&tag),

            _ => {
                if self.opts.scripting_enabled && tag.name == local_name!("noscript") {
                    self.raw_text_element(tag, Rawtext)
                } else {
                    self.reconstruct_active_formatting_elements();
                    self.insert_element_for(tag);
                    StepOutcome::Consumed
                }
            },
        }
    }

    fn in_body_end_tag(&self, tag: Tag) -> StepOutcome<Handle> {
        match tag.name {
            local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

            local_name!("body") => {
                if self.scope_contains(default_scope, local_name!("body")) {
                    self.audit_body_end();
                    self.mode.set(InsertionMode::AfterBody);
                } else {
                    self.sink
                        .parse_error(Borrowed("</body> with no <body> in scope"));
                }
                StepOutcome::Consumed
            },

            local_name!("html") => {
                if self.scope_contains(default_scope, local_name!("body")) {
                    self.audit_body_end();
                    StepOutcome::Reprocess(InsertionMode::AfterBody, Token::Tag(tag))
                } else {
                    self.sink
                        .parse_error(Borrowed("</html> with no <body> in scope"));
                    StepOutcome::Consumed
                }
            },

            local_name!("address")
            | local_name!("article")
            | local_name!("aside")
            | local_name!("blockquote")
            | local_name!("button")
            | local_name!("center")
            | local_name!("details")
            | local_name!("dialog")
            | local_name!("dir")
            | local_name!("div")
            | local_name!("dl")
            | local_name!("fieldset")
            | local_name!("figcaption")
            | local_name!("figure")
            | local_name!("footer")
            | local_name!("header")
            | local_name!("hgroup")
            | local_name!("listing")
            | local_name!("main")
            | local_name!("menu")
            | local_name!("nav")
            | local_name!("ol")
            | local_name!("pre")
            | local_name!("search")
            | local_name!("section")
            | local_name!("summary")
            | local_name!("ul") => {
                if !self.scope_contains(default_scope, tag.name.clone()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.expect_to_close(tag.name);
                }
                StepOutcome::Consumed
            },

            local_name!("form") => {
                if !self.has_open_html_element(local_name!("template")) {
                    let Some(node) = self.form_ptr.take() else {
                        self.sink
                            .parse_error(Borrowed("Null form element pointer on </form>"));
                        return StepOutcome::Consumed;
                    };
                    if !self.in_scope(default_scope, |n| self.sink.same_node(&node, &n)) {
                        self.sink
                            .parse_error(Borrowed("Form element not in scope on </form>"));
                        return StepOutcome::Consumed;
                    }
                    self.generate_implied_end_tags(cursory_implied_end);
                    let current = self.current().clone();
                    self.remove_from_stack(&node);
                    if !self.sink.same_node(&current, &node) {
                        self.sink.parse_error(Borrowed("Bad open element on </form>"));
                    }
                } else {
                    if !self.scope_contains(default_scope, local_name!("form")) {
                        self.sink
                            .parse_error(Borrowed("Form element not in scope on </form>"));
                        return StepOutcome::Consumed;
                    }
                    self.generate_implied_end_tags(cursory_implied_end);
                    if !self.current_is(local_name!("form")) {
                        self.sink.parse_error(Borrowed("Bad open element on </form>"));
                    }
                    self.pop_through_named(local_name!("form"));
                }
                StepOutcome::Consumed
            },

            local_name!("p") => {
                if !self.scope_contains(button_scope, local_name!("p")) {
                    self.sink.parse_error(Borrowed("No <p> tag to close"));
                    self.insert_synthetic(local_name!("p"));
                }
                self.close_p_element();
                StepOutcome::Consumed
            },

            local_name!("li") | local_name!("dd") | local_name!("dt") => {
                let in_scope = if tag.name == local_name!("li") {
                    self.scope_contains(list_item_scope, tag.name.clone())
                } else {
                    self.scope_contains(default_scope, tag.name.clone())
                };
                if in_scope {
                    self.generate_implied_end_tags_except(tag.name.clone());
                    self.expect_to_close(tag.name);
                } else {
                    self.sink.parse_error(Borrowed("No matching tag to close"));
                }
                StepOutcome::Consumed
            },

            local_name!("h1")
            | local_name!("h2")
            | local_name!("h3")
            | local_name!("h4")
            | local_name!("h5")
            | local_name!("h6") => {
                if self.in_scope(default_scope, |n| self.elem_matches(&n, heading_tag)) {
                    self.generate_implied_end_tags(cursory_implied_end);
                    if !self.current_is(tag.name) {
                        self.sink.parse_error(Borrowed("Closing wrong heading tag"));
                    }
                    self.pop_through(heading_tag);
                } else {
                    self.sink.parse_error(Borrowed("No heading tag to close"));
                }
                StepOutcome::Consumed
            },

            local_name!("a")
            | local_name!("b")
            | local_name!("big")
            | local_name!("code")
            | local_name!("em")
            | local_name!("font")
            | local_name!("i")
            | local_name!("nobr")
            | local_name!("s")
            | local_name!("small")
            | local_name!("strike")
            | local_name!("strong")
            | local_name!("tt")
            | local_name!("u") => {
                self.adoption_agency(tag.name);
                StepOutcome::Consumed
            },

            local_name!("applet") | local_name!("marquee") | local_name!("object") => {
                if !self.scope_contains(default_scope, tag.name.clone()) {
                    self.unexpected(&tag);
                } else {
                    self.generate_implied_end_tags(cursory_implied_end);
                    self.expect_to_close(tag.name);
                    self.clear_formatting_to_marker();
                }
                StepOutcome::Consumed
            },

            local_name!("br") => {
                self.unexpected(&tag);
                self.step(
                    InsertionMode::InBody,
                    Token::Tag(Tag {
                        kind: StartTag,
                        attrs: vec![],
                        ..tag
                    }),
                )
            },

            _ => {
                self.any_other_end_tag_in_body(tag);
                StepOutcome::Consumed
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incdata>
    fn step_text(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(_, text) => self.append_text(text),

            Token::Eof => {
                self.unexpected(&token);
                if self.current_is(local_name!("script")) {
                    self.sink.mark_script_already_started(&self.current());
                }
                self.pop();
                StepOutcome::Reprocess(
                    self.saved_mode.take().expect("no saved insertion mode"),
                    token,
                )
            },

            Token::Tag(tag) if tag.kind == EndTag => {
                let node = self.pop();
                self.mode
                    .set(self.saved_mode.take().expect("no saved insertion mode"));
                if tag.name == local_name!("script") {
                    return StepOutcome::Script(node);
                }
                StepOutcome::Consumed
            },

            // The tokenizer emits only text and an end tag in a
            // raw-data state.
            _ => unreachable!("impossible token in Text mode"),
        }
    }

    fn in_table_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        self.unexpected(&token);
        self.with_fostering_in_body(token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intable>
    fn step_in_table(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            token @ (Token::Null | Token::Text(..)) => self.characters_in_table(token),

            Token::Comment(text) => self.append_comment(text),

            Token::Eof => self.step(InsertionMode::InBody, token),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("caption") => {
                        self.pop_to_set(table_scope);
                        self.format_list.borrow_mut().push(FormattingEntry::Marker);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InCaption);
                        StepOutcome::Consumed
                    },

                    local_name!("colgroup") => {
                        self.pop_to_set(table_scope);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InColumnGroup);
                        StepOutcome::Consumed
                    },

                    local_name!("col") => {
                        self.pop_to_set(table_scope);
                        self.insert_synthetic(local_name!("colgroup"));
                        StepOutcome::Reprocess(InsertionMode::InColumnGroup, Token::Tag(tag))
                    },

                    local_name!("tbody") | local_name!("tfoot") | local_name!("thead") => {
                        self.pop_to_set(table_scope);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InTableBody);
                        StepOutcome::Consumed
                    },

                    local_name!("td") | local_name!("th") | local_name!("tr") => {
                        self.pop_to_set(table_scope);
                        self.insert_synthetic(local_name!("tbody"));
                        StepOutcome::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
                    },

                    local_name!("table") => {
                        self.unexpected(&tag);
                        if self.scope_contains(table_scope, local_name!("table")) {
                            self.pop_through_named(local_name!("table"));
                            StepOutcome::Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                        } else {
                            StepOutcome::Consumed
                        }
                    },

                    local_name!("style") | local_name!("script") | local_name!("template") => {
                        self.step(InsertionMode::InHead, Token::Tag(tag))
                    },

                    local_name!("input") => {
                        self.unexpected(&tag);
                        if self.input_is_hidden(&tag) {
                            self.insert_void_element_for(tag);
                            StepOutcome::ConsumedAckSelfClosing
                        } else {
                            self.with_fostering_in_body(Token::Tag(tag))
                        }
                    },

                    local_name!("form") => {
                        self.unexpected(&tag);
                        if !self.has_open_html_element(local_name!("template"))
                            && self.form_ptr.borrow().is_none()
                        {
                            *self.form_ptr.borrow_mut() =
                                Some(self.insert_void_element_for(tag));
                        }
                        StepOutcome::Consumed
                    },

                    _ => self.in_table_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("table") => {
                        if self.scope_contains(table_scope, local_name!("table")) {
                            self.pop_through_named(local_name!("table"));
                            self.mode.set(self.reset_insertion_mode());
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("body")
                    | local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("html")
                    | local_name!("tbody")
                    | local_name!("td")
                    | local_name!("tfoot")
                    | local_name!("th")
                    | local_name!("thead")
                    | local_name!("tr") => self.unexpected(&tag),

                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.in_table_anything_else(Token::Tag(tag)),
                },
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext>
    fn step_in_table_text(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Null => self.unexpected(&token),

            Token::Text(status, text) => {
                self.pending_text.borrow_mut().push((status, text));
                StepOutcome::Consumed
            },

            token => {
                let pending = self.pending_text.take();
                let has_nonspace = pending.iter().any(|&(status, ref text)| match status {
                    TextStatus::Whitespace => false,
                    TextStatus::NotWhitespace => true,
                    TextStatus::Unexamined => has_non_whitespace(text),
                });

                if has_nonspace {
                    self.sink.parse_error(Borrowed("Non-space table text"));
                    for (status, text) in pending {
                        match self.with_fostering_in_body(Token::Text(status, text)) {
                            StepOutcome::Consumed => (),
                            _ => panic!("fostered table text was not consumed"),
                        }
                    }
                } else {
                    for (_, text) in pending {
                        self.append_text(text);
                    }
                }

                StepOutcome::Reprocess(
                    self.saved_mode.take().expect("no saved insertion mode"),
                    token,
                )
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incaption>
    fn step_in_caption(&self, token: Token) -> StepOutcome<Handle> {
        let tag = match token {
            Token::Tag(tag) => tag,
            token => return self.step(InsertionMode::InBody, token),
        };

        // Tags that terminate the caption and hand the token back to
        // the table.
        let closes_caption = match tag.kind {
            StartTag => matches!(
                tag.name,
                local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("tbody")
                    | local_name!("td")
                    | local_name!("tfoot")
                    | local_name!("th")
                    | local_name!("thead")
                    | local_name!("tr")
            ),
            EndTag => matches!(tag.name, local_name!("table") | local_name!("caption")),
        };

        if closes_caption {
            if !self.scope_contains(table_scope, local_name!("caption")) {
                return self.unexpected(&tag);
            }
            self.generate_implied_end_tags(cursory_implied_end);
            self.expect_to_close(local_name!("caption"));
            self.clear_formatting_to_marker();
            if tag.kind == EndTag && tag.name == local_name!("caption") {
                self.mode.set(InsertionMode::InTable);
                StepOutcome::Consumed
            } else {
                StepOutcome::Reprocess(InsertionMode::InTable, Token::Tag(tag))
            }
        } else if tag.kind == EndTag
            && matches!(
                tag.name,
                local_name!("body")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("html")
                    | local_name!("tbody")
                    | local_name!("td")
                    | local_name!("tfoot")
                    | local_name!("th")
                    | local_name!("thead")
                    | local_name!("tr")
            )
        {
            self.unexpected(&tag)
        } else {
            self.step(InsertionMode::InBody, Token::Tag(tag))
        }
    }

    fn in_column_group_anything_else(&self, token: Token) -> StepOutcome<Handle> {
        if self.current_is(local_name!("colgroup")) {
            self.pop();
            StepOutcome::Reprocess(InsertionMode::InTable, token)
        } else {
            self.unexpected(&token)
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incolgroup>
    fn step_in_column_group(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Eof => self.step(InsertionMode::InBody, token),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("col") => {
                        self.insert_void_element_for(tag);
                        StepOutcome::ConsumedAckSelfClosing
                    },

                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.in_column_group_anything_else(Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("colgroup") => {
                        if self.current_is(local_name!("colgroup")) {
                            self.pop();
                            self.mode.set(InsertionMode::InTable);
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("col") => self.unexpected(&tag),

                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.in_column_group_anything_else(Token::Tag(tag)),
                },
            },

            token => self.in_column_group_anything_else(token),
        }
    }

    // Close the current row group and hand the token back to InTable.
    fn close_table_body_section(&self, tag: Tag) -> StepOutcome<Handle> {
        declare_tag_set!(table_outer = "table" "tbody" "tfoot");
        if self.in_scope(table_scope, |e| self.elem_matches(&e, table_outer)) {
            self.pop_to_set(table_body_context);
            self.pop();
            StepOutcome::Reprocess(InsertionMode::InTable, Token::Tag(tag))
        } else {
            self.unexpected(&tag)
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intbody>
    fn step_in_table_body(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("tr") => {
                        self.pop_to_set(table_body_context);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InRow);
                        StepOutcome::Consumed
                    },

                    local_name!("th") | local_name!("td") => {
                        self.unexpected(&tag);
                        self.pop_to_set(table_body_context);
                        self.insert_synthetic(local_name!("tr"));
                        StepOutcome::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                    },

                    local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("tbody")
                    | local_name!("tfoot")
                    | local_name!("thead") => self.close_table_body_section(tag),

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("tbody") | local_name!("tfoot") | local_name!("thead") => {
                        if self.scope_contains(table_scope, tag.name.clone()) {
                            self.pop_to_set(table_body_context);
                            self.pop();
                            self.mode.set(InsertionMode::InTable);
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("table") => self.close_table_body_section(tag),

                    local_name!("body")
                    | local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("html")
                    | local_name!("td")
                    | local_name!("th")
                    | local_name!("tr") => self.unexpected(&tag),

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },
            },

            token => self.step(InsertionMode::InTable, token),
        }
    }

    // End the current row and hand the token back to InTableBody.
    fn close_table_row(&self, tag: Tag) -> StepOutcome<Handle> {
        self.pop_to_set(table_row_context);
        let node = self.pop();
        self.assert_named(&node, local_name!("tr"));
        StepOutcome::Reprocess(InsertionMode::InTableBody, Token::Tag(tag))
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intr>
    fn step_in_row(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("th") | local_name!("td") => {
                        self.pop_to_set(table_row_context);
                        self.insert_element_for(tag);
                        self.mode.set(InsertionMode::InCell);
                        self.format_list.borrow_mut().push(FormattingEntry::Marker);
                        StepOutcome::Consumed
                    },

                    local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("tbody")
                    | local_name!("tfoot")
                    | local_name!("thead")
                    | local_name!("tr") => {
                        if self.scope_contains(table_scope, local_name!("tr")) {
                            self.close_table_row(tag)
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("tr") => {
                        if self.scope_contains(table_scope, local_name!("tr")) {
                            self.pop_to_set(table_row_context);
                            let node = self.pop();
                            self.assert_named(&node, local_name!("tr"));
                            self.mode.set(InsertionMode::InTableBody);
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("table") => {
                        if self.scope_contains(table_scope, local_name!("tr")) {
                            self.close_table_row(tag)
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    local_name!("tbody") | local_name!("tfoot") | local_name!("thead") => {
                        if self.scope_contains(table_scope, tag.name.clone()) {
                            if self.scope_contains(table_scope, local_name!("tr")) {
                                self.close_table_row(tag)
                            } else {
                                StepOutcome::Consumed
                            }
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    local_name!("body")
                    | local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("html")
                    | local_name!("td")
                    | local_name!("th") => self.unexpected(&tag),

                    _ => self.step(InsertionMode::InTable, Token::Tag(tag)),
                },
            },

            token => self.step(InsertionMode::InTable, token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intd>
    fn step_in_cell(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("tbody")
                    | local_name!("td")
                    | local_name!("tfoot")
                    | local_name!("th")
                    | local_name!("thead")
                    | local_name!("tr") => {
                        if self.in_scope(table_scope, |n| self.elem_matches(&n, td_th)) {
                            self.close_cell();
                            StepOutcome::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("td") | local_name!("th") => {
                        if self.scope_contains(table_scope, tag.name.clone()) {
                            self.generate_implied_end_tags(cursory_implied_end);
                            self.expect_to_close(tag.name);
                            self.clear_formatting_to_marker();
                            self.mode.set(InsertionMode::InRow);
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("body")
                    | local_name!("caption")
                    | local_name!("col")
                    | local_name!("colgroup")
                    | local_name!("html") => self.unexpected(&tag),

                    local_name!("table")
                    | local_name!("tbody")
                    | local_name!("tfoot")
                    | local_name!("thead")
                    | local_name!("tr") => {
                        if self.scope_contains(table_scope, tag.name.clone()) {
                            self.close_cell();
                            StepOutcome::Reprocess(InsertionMode::InRow, Token::Tag(tag))
                        } else {
                            self.unexpected(&tag)
                        }
                    },

                    _ => self.step(InsertionMode::InBody, Token::Tag(tag)),
                },
            },

            token => self.step(InsertionMode::InBody, token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect>
    fn step_in_select(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Null => self.unexpected(&token),
            Token::Text(_, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Eof => self.step(InsertionMode::InBody, token),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("option") => {
                        if self.current_is(local_name!("option")) {
                            self.pop();
                        }
                        self.insert_element_for(tag);
                        StepOutcome::Consumed
                    },

                    local_name!("optgroup") => {
                        if self.current_is(local_name!("option")) {
                            self.pop();
                        }
                        if self.current_is(local_name!("optgroup")) {
                            self.pop();
                        }
                        self.insert_element_for(tag);
                        StepOutcome::Consumed
                    },

                    local_name!("hr") => {
                        if self.current_is(local_name!("option")) {
                            self.pop();
                        }
                        if self.current_is(local_name!("optgroup")) {
                            self.pop();
                        }
                        self.insert_element_for(tag);
                        self.pop();
                        StepOutcome::ConsumedAckSelfClosing
                    },

                    local_name!("select") => {
                        self.unexpected(&tag);
                        if self.scope_contains(select_scope, local_name!("select")) {
                            self.pop_through_named(local_name!("select"));
                            self.mode.set(self.reset_insertion_mode());
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("input") | local_name!("keygen") | local_name!("textarea") => {
                        self.unexpected(&tag);
                        if self.scope_contains(select_scope, local_name!("select")) {
                            self.pop_through_named(local_name!("select"));
                            StepOutcome::Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                        } else {
                            StepOutcome::Consumed
                        }
                    },

                    local_name!("script") | local_name!("template") => {
                        self.step(InsertionMode::InHead, Token::Tag(tag))
                    },

                    _ => self.unexpected(&tag),
                },
                EndTag => match tag.name {
                    local_name!("optgroup") => {
                        let stack_len = self.stack.borrow().len();
                        if stack_len >= 2
                            && self.current_is(local_name!("option"))
                            && self.is_html_element(
                                &self.stack.borrow()[stack_len - 2],
                                local_name!("optgroup"),
                            )
                        {
                            self.pop();
                        }
                        if self.current_is(local_name!("optgroup")) {
                            self.pop();
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("option") => {
                        if self.current_is(local_name!("option")) {
                            self.pop();
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("select") => {
                        if self.scope_contains(select_scope, local_name!("select")) {
                            self.pop_through_named(local_name!("select"));
                            self.mode.set(self.reset_insertion_mode());
                        } else {
                            self.unexpected(&tag);
                        }
                        StepOutcome::Consumed
                    },

                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselectintable>
    fn step_in_select_in_table(&self, token: Token) -> StepOutcome<Handle> {
        let tag = match token {
            Token::Tag(tag) => tag,
            token => return self.step(InsertionMode::InSelect, token),
        };

        let table_related = matches!(
            tag.name,
            local_name!("caption")
                | local_name!("table")
                | local_name!("tbody")
                | local_name!("tfoot")
                | local_name!("thead")
                | local_name!("tr")
                | local_name!("td")
                | local_name!("th")
        );
        if !table_related {
            return self.step(InsertionMode::InSelect, Token::Tag(tag));
        }

        self.unexpected(&tag);
        match tag.kind {
            StartTag => {
                self.pop_through_named(local_name!("select"));
                StepOutcome::Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
            },
            EndTag => {
                if self.scope_contains(table_scope, tag.name.clone()) {
                    self.pop_through_named(local_name!("select"));
                    StepOutcome::Reprocess(self.reset_insertion_mode(), Token::Tag(tag))
                } else {
                    StepOutcome::Consumed
                }
            },
        }
    }

    // Replace the current template insertion mode and reprocess there.
    fn template_retarget(&self, mode: InsertionMode, token: Token) -> StepOutcome<Handle> {
        self.template_modes.borrow_mut().pop();
        self.template_modes.borrow_mut().push(mode);
        StepOutcome::Reprocess(mode, token)
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intemplate>
    fn step_in_template(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            token @ (Token::Text(..) | Token::Comment(_)) => {
                self.step(InsertionMode::InBody, token)
            },

            Token::Eof => {
                if !self.has_open_html_element(local_name!("template")) {
                    self.stop_parsing()
                } else {
                    self.unexpected(&token);
                    self.pop_through_named(local_name!("template"));
                    self.clear_formatting_to_marker();
                    self.template_modes.borrow_mut().pop();
                    let mode = self.reset_insertion_mode();
                    self.mode.set(mode);
                    StepOutcome::Reprocess(mode, token)
                }
            },

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("base")
                    | local_name!("basefont")
                    | local_name!("bgsound")
                    | local_name!("link")
                    | local_name!("meta")
                    | local_name!("noframes")
                    | local_name!("script")
                    | local_name!("style")
                    | local_name!("template")
                    | local_name!("title") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    local_name!("caption")
                    | local_name!("colgroup")
                    | local_name!("tbody")
                    | local_name!("tfoot")
                    | local_name!("thead") => {
                        self.template_retarget(InsertionMode::InTable, Token::Tag(tag))
                    },

                    local_name!("col") => {
                        self.template_retarget(InsertionMode::InColumnGroup, Token::Tag(tag))
                    },

                    local_name!("tr") => {
                        self.template_retarget(InsertionMode::InTableBody, Token::Tag(tag))
                    },

                    local_name!("td") | local_name!("th") => {
                        self.template_retarget(InsertionMode::InRow, Token::Tag(tag))
                    },

                    _ => self.template_retarget(InsertionMode::InBody, Token::Tag(tag)),
                },
                EndTag => match tag.name {
                    local_name!("template") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },
            },

            token => self.unexpected(&token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterbody>
    fn step_after_body(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            token @ Token::Text(TextStatus::Whitespace, _) => {
                self.step(InsertionMode::InBody, token)
            },
            Token::Comment(text) => self.append_comment_to_root(text),

            Token::Tag(tag) => match (tag.kind, &tag.name) {
                (StartTag, &local_name!("html")) => {
                    self.step(InsertionMode::InBody, Token::Tag(tag))
                },
                (EndTag, &local_name!("html")) => {
                    if self.is_fragment() {
                        self.unexpected(&tag);
                    } else {
                        self.mode.set(InsertionMode::AfterAfterBody);
                    }
                    StepOutcome::Consumed
                },
                _ => {
                    self.unexpected(&tag);
                    StepOutcome::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                },
            },

            Token::Eof => self.stop_parsing(),

            token => {
                self.unexpected(&token);
                StepOutcome::Reprocess(InsertionMode::InBody, token)
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inframeset>
    fn step_in_frameset(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Eof => {
                if self.stack.borrow().len() != 1 {
                    self.unexpected(&token);
                }
                self.stop_parsing()
            },

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("html") => self.step(InsertionMode::InBody, Token::Tag(tag)),

                    local_name!("frameset") => {
                        self.insert_element_for(tag);
                        StepOutcome::Consumed
                    },

                    local_name!("frame") => {
                        self.insert_void_element_for(tag);
                        StepOutcome::ConsumedAckSelfClosing
                    },

                    local_name!("noframes") => self.step(InsertionMode::InHead, Token::Tag(tag)),

                    _ => self.unexpected(&tag),
                },
                EndTag => match tag.name {
                    local_name!("frameset") => {
                        if self.stack.borrow().len() == 1 {
                            self.unexpected(&tag);
                        } else {
                            self.pop();
                            if !self.is_fragment() && !self.current_is(local_name!("frameset")) {
                                self.mode.set(InsertionMode::AfterFrameset);
                            }
                        }
                        StepOutcome::Consumed
                    },

                    _ => self.unexpected(&tag),
                },
            },

            token => self.unexpected(&token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterframeset>
    fn step_after_frameset(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            Token::Text(TextStatus::Whitespace, text) => self.append_text(text),
            Token::Comment(text) => self.append_comment(text),

            Token::Eof => self.stop_parsing(),

            Token::Tag(tag) => match (tag.kind, &tag.name) {
                (StartTag, &local_name!("html")) => {
                    self.step(InsertionMode::InBody, Token::Tag(tag))
                },
                (StartTag, &local_name!("noframes")) => {
                    self.step(InsertionMode::InHead, Token::Tag(tag))
                },
                (EndTag, &local_name!("html")) => {
                    self.mode.set(InsertionMode::AfterAfterFrameset);
                    StepOutcome::Consumed
                },
                _ => self.unexpected(&tag),
            },

            token => self.unexpected(&token),
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-body-insertion-mode>
    fn step_after_after_body(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            token @ Token::Text(TextStatus::Whitespace, _) => {
                self.step(InsertionMode::InBody, token)
            },
            Token::Comment(text) => self.append_comment_to_document(text),

            Token::Tag(tag) => match (tag.kind, &tag.name) {
                (StartTag, &local_name!("html")) => {
                    self.step(InsertionMode::InBody, Token::Tag(tag))
                },
                _ => {
                    self.unexpected(&tag);
                    StepOutcome::Reprocess(InsertionMode::InBody, Token::Tag(tag))
                },
            },

            Token::Eof => self.stop_parsing(),

            token => {
                self.unexpected(&token);
                StepOutcome::Reprocess(InsertionMode::InBody, token)
            },
        }
    }

    /// <https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-frameset-insertion-mode>
    fn step_after_after_frameset(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Text(TextStatus::Unexamined, text) => StepOutcome::SplitLeading(text),
            token @ Token::Text(TextStatus::Whitespace, _) => {
                self.step(InsertionMode::InBody, token)
            },
            Token::Comment(text) => self.append_comment_to_document(text),

            Token::Eof => self.stop_parsing(),

            Token::Tag(tag) => match (tag.kind, &tag.name) {
                (StartTag, &local_name!("html")) => {
                    self.step(InsertionMode::InBody, Token::Tag(tag))
                },
                (StartTag, &local_name!("noframes")) => {
                    self.step(InsertionMode::InHead, Token::Tag(tag))
                },
                _ => self.unexpected(&tag),
            },

            token => self.unexpected(&token),
        }
    }

    /// The rules for parsing tokens in foreign content,
    /// <https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inforeign>.
    pub(crate) fn step_foreign(&self, token: Token) -> StepOutcome<Handle> {
        match token {
            Token::Null => {
                self.unexpected(&token);
                self.append_text("\u{fffd}".to_tendril())
            },

            Token::Text(_, text) => {
                if has_non_whitespace(&text) {
                    self.frameset_ok.set(false);
                }
                self.append_text(text)
            },

            Token::Comment(text) => self.append_comment(text),

            Token::Tag(tag) => match tag.kind {
                StartTag => match tag.name {
                    local_name!("b")
                    | local_name!("big")
                    | local_name!("blockquote")
                    | local_name!("body")
                    | local_name!("br")
                    | local_name!("center")
                    | local_name!("code")
                    | local_name!("dd")
                    | local_name!("div")
                    | local_name!("dl")
                    | local_name!("dt")
                    | local_name!("em")
                    | local_name!("embed")
                    | local_name!("h1")
                    | local_name!("h2")
                    | local_name!("h3")
                    | local_name!("h4")
                    | local_name!("h5")
                    | local_name!("h6")
                    | local_name!("head")
                    | local_name!("hr")
                    | local_name!("i")
                    | local_name!("img")
                    | local_name!("li")
                    | local_name!("listing")
                    | local_name!("menu")
                    | local_name!("meta")
                    | local_name!("nobr")
                    | local_name!("ol")
                    | local_name!("p")
                    | local_name!("pre")
                    | local_name!("ruby")
                    | local_name!("s")
                    | local_name!("small")
                    | local_name!("span")
                    | local_name!("strong")
                    | local_name!("strike")
                    | local_name!("sub")
                    | local_name!("sup")
                    | local_name!("table")
                    | local_name!("tt")
                    | local_name!("u")
                    | local_name!("ul")
                    | local_name!("var") => self.escape_foreign_content(tag),

                    local_name!("font") => {
                        let html_font = tag.attrs.iter().any(|attr| {
                            matches!(
                                attr.name.expanded(),
                                expanded_name!("", "color")
                                    | expanded_name!("", "face")
                                    | expanded_name!("", "size")
                            )
                        });
                        if html_font {
                            self.escape_foreign_content(tag)
                        } else {
                            self.foreign_start_tag(tag)
                        }
                    },

                    _ => self.foreign_start_tag(tag),
                },
                EndTag => match tag.name {
                    local_name!("br") | local_name!("p") => self.escape_foreign_content(tag),

                    _ => {
                        // Generic foreign end tag: close the first
                        // case-insensitive match, or fall back to the
                        // HTML rules at the first HTML element.
                        let mut reported = false;
                        let mut stack_index = self.stack.borrow().len() - 1;
                        loop {
                            if stack_index == 0 {
                                return StepOutcome::Consumed;
                            }

                            let (is_html, name_matches) = {
                                let stack = self.stack.borrow();
                                let node_name = self.sink.elem_name(&stack[stack_index]);
                                (
                                    *node_name.ns() == ns!(html),
                                    node_name.local_name().eq_ignore_ascii_case(&tag.name),
                                )
                            };
                            if reported && is_html {
                                let mode = self.mode.get();
                                return self.step(mode, Token::Tag(tag));
                            }

                            if name_matches {
                                self.stack.borrow_mut().truncate(stack_index);
                                return StepOutcome::Consumed;
                            }

                            if !reported {
                                self.unexpected(&tag);
                                reported = true;
                            }
                            stack_index -= 1;
                        }
                    },
                },
            },

            // The dispatcher never sends EOF to foreign content.
            Token::Eof => unreachable!("EOF dispatched to foreign content"),
        }
    }
}
