// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use shrike_css::at_rule::AtRuleName;
use shrike_css::{
    parse_declaration_list, parse_stylesheet, RuleArena, RuleData, RuleId, RuleParser, Stylesheet,
    StylesheetSink,
};
use shrike_markup::BufferQueue;
use tendril::StrTendril;

fn dump(arena: &RuleArena, id: RuleId, depth: usize, out: &mut Vec<String>) {
    out.push(format!("{}{:?}", "  ".repeat(depth), arena.get(id).data));
    for child in arena.children(id) {
        dump(arena, child, depth + 1, out);
    }
}

fn tree_lines(sheet: &Stylesheet) -> Vec<String> {
    let mut out = vec![];
    dump(&sheet.arena, sheet.root, 0, &mut out);
    out
}

#[test]
fn nested_media_rule() {
    let sheet = parse_stylesheet("@media screen { a { color: red } } b { x: 1 }".into());
    assert!(sheet.errors.is_empty(), "{:?}", sheet.errors);

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 2);

    match &sheet.arena.get(rules[0]).data {
        RuleData::AtRule {
            kind,
            name,
            prelude,
        } => {
            assert_eq!(*kind, AtRuleName::Media);
            assert_eq!(&**name, "media");
            assert_eq!(&**prelude, "screen");
        },
        other => panic!("expected @media, got {other:?}"),
    }

    // @media body: a RuleList holding the nested style rule.
    let body: Vec<_> = sheet.arena.children(rules[0]).collect();
    assert_eq!(body.len(), 1);
    assert_eq!(sheet.arena.get(body[0]).data, RuleData::RuleList);
    let nested: Vec<_> = sheet.arena.children(body[0]).collect();
    assert_eq!(nested.len(), 1);
    match &sheet.arena.get(nested[0]).data {
        RuleData::StyleRule { prelude } => assert_eq!(&**prelude, "a"),
        other => panic!("expected style rule, got {other:?}"),
    }

    match &sheet.arena.get(rules[1]).data {
        RuleData::StyleRule { prelude } => assert_eq!(&**prelude, "b"),
        other => panic!("expected style rule, got {other:?}"),
    }
}

#[test]
fn unknown_at_rule_keeps_prelude_and_declarations() {
    let sheet = parse_stylesheet("@foo (bar) { x: 1 }".into());

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 1);
    match &sheet.arena.get(rules[0]).data {
        RuleData::AtRule {
            kind,
            name,
            prelude,
        } => {
            assert_eq!(*kind, AtRuleName::Custom);
            assert_eq!(&**name, "foo");
            assert_eq!(&**prelude, "(bar)");
        },
        other => panic!("expected at-rule, got {other:?}"),
    }

    let body: Vec<_> = sheet.arena.children(rules[0]).collect();
    assert_eq!(sheet.arena.get(body[0]).data, RuleData::DeclarationList);
    let decls: Vec<_> = sheet.arena.children(body[0]).collect();
    assert_eq!(
        sheet.arena.get(decls[0]).data,
        RuleData::Declaration {
            name: "x".into(),
            value: "1".into(),
            important: false,
            undefined: false,
        }
    );
}

#[test]
fn blockless_at_rule_ends_at_semicolon() {
    let sheet = parse_stylesheet("@import url(a.css); a { x: 1 }".into());
    assert!(sheet.errors.is_empty(), "{:?}", sheet.errors);

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 2);
    match &sheet.arena.get(rules[0]).data {
        RuleData::AtRule { kind, prelude, .. } => {
            assert_eq!(*kind, AtRuleName::Import);
            assert_eq!(&**prelude, "url(a.css)");
        },
        other => panic!("expected @import, got {other:?}"),
    }
}

#[test]
fn chunked_input_matches_whole_input() {
    // The unquoted bad url produces a tokenizer error; it must be
    // recorded exactly once however the input is chunked.
    let source = "@media screen and (min-width: 10px) {\n  a.cls { color: red !important }\n}\np { margin: 0; padding: url(\"x)y\") }\nq { z: url(bad url) }\n";

    let whole = parse_stylesheet(source.into());

    let mut parser = RuleParser::new(StylesheetSink::new());
    for chunk in source.as_bytes().chunks(3) {
        let buf = BufferQueue::default();
        buf.push_back(StrTendril::from(std::str::from_utf8(chunk).unwrap()));
        parser.feed(&buf).unwrap();
    }
    parser.end().unwrap();
    let (sink, errors) = parser.into_parts();
    let chunked = Stylesheet {
        arena: sink.arena,
        root: sink.root,
        errors,
    };

    assert_eq!(tree_lines(&whole), tree_lines(&chunked));
    assert_eq!(whole.errors, chunked.errors);
}

#[test]
fn stray_close_brace_is_skipped() {
    let sheet = parse_stylesheet("} a { x: 1 }".into());
    assert_eq!(sheet.errors.len(), 1);

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 1);
    match &sheet.arena.get(rules[0]).data {
        RuleData::StyleRule { prelude } => assert_eq!(&**prelude, "a"),
        other => panic!("expected style rule, got {other:?}"),
    }
}

#[test]
fn malformed_declaration_degrades_to_undefined() {
    let sheet = parse_declaration_list("color red; margin: 0".into());
    assert!(!sheet.errors.is_empty());

    let decls: Vec<_> = sheet.rules().collect();
    assert_eq!(decls.len(), 2);
    match &sheet.arena.get(decls[0]).data {
        RuleData::Declaration {
            value, undefined, ..
        } => {
            assert!(*undefined);
            assert_eq!(&**value, "color red");
        },
        other => panic!("expected undefined declaration, got {other:?}"),
    }
    assert_eq!(
        sheet.arena.get(decls[1]).data,
        RuleData::Declaration {
            name: "margin".into(),
            value: "0".into(),
            important: false,
            undefined: false,
        }
    );
}

#[test]
fn no_declaration_is_silently_lost() {
    // Every non-empty `;`-separated segment must surface as exactly
    // one list entry, valid or undefined.
    let input = "color: red; b 2; : c; d: e(f); ; x 'y";
    let sheet = parse_declaration_list(input.into());

    let segments = input
        .split(';')
        .filter(|s| !s.trim().is_empty())
        .count();
    let entries = sheet
        .rules()
        .filter(|&id| matches!(sheet.arena.get(id).data, RuleData::Declaration { .. }))
        .count();
    assert_eq!(entries, segments);
}

#[test]
fn truncated_rule_is_kept_as_failed() {
    let sheet = parse_stylesheet("a { x: 1 } div.cls > p".into());
    assert!(!sheet.errors.is_empty());

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 2);
    match &sheet.arena.get(rules[1]).data {
        RuleData::BadStyleRule { raw } => assert_eq!(&**raw, "div.cls > p"),
        other => panic!("expected failed rule, got {other:?}"),
    }
}

#[test]
fn errors_come_out_in_source_order() {
    // A grammar error early (missing colon) and a tokenizer error
    // late (unterminated string).
    let sheet = parse_stylesheet("a { color red } b { x: 'oops".into());
    assert!(sheet.errors.len() >= 2);
    for pair in sheet.errors.windows(2) {
        assert!(pair[0].offset <= pair[1].offset);
    }
}

#[test]
fn unclosed_block_recovers_at_eof() {
    let sheet = parse_stylesheet("@media screen { a { x: 1 }".into());
    assert!(!sheet.errors.is_empty());

    let rules: Vec<_> = sheet.rules().collect();
    assert_eq!(rules.len(), 1);
    let body: Vec<_> = sheet.arena.children(rules[0]).collect();
    let nested: Vec<_> = sheet.arena.children(body[0]).collect();
    assert_eq!(nested.len(), 1);
    match &sheet.arena.get(nested[0]).data {
        RuleData::StyleRule { prelude } => assert_eq!(&**prelude, "a"),
        other => panic!("expected style rule, got {other:?}"),
    }
}
