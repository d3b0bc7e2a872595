// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use shrike_html::tendril::TendrilSink;
use shrike_html::{driver, local_name, ns, serialize, QualName};
use shrike_rcdom::{RcDom, SerializableHandle};

fn parse(input: &str) -> RcDom {
    driver::parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .one(input.as_bytes())
}

fn to_html(dom: &RcDom) -> String {
    let mut serialized = Vec::new();
    let document: SerializableHandle = dom.document.clone().into();
    serialize::serialize(&mut serialized, &document, Default::default()).unwrap();
    String::from_utf8(serialized).unwrap()
}

#[test]
fn from_utf8() {
    let dom = parse("<title>Test");
    assert_eq!(
        to_html(&dom).replace(' ', ""),
        "<html><head><title>Test</title></head><body></body></html>"
    );
}

#[test]
fn chunked_feed_matches_single_feed() {
    let whole = parse("<div>hi</div>");

    let mut chunked = driver::parse_document(RcDom::default(), Default::default()).from_utf8();
    chunked.process("<di".as_bytes().into());
    chunked.process("v>hi</div>".as_bytes().into());
    let chunked = chunked.finish();

    assert_eq!(to_html(&whole), to_html(&chunked));
}

#[test]
fn reparse_of_serialized_output_is_stable() {
    let source = "<!DOCTYPE html><p class=a>one<b>two</b><table><tr><td>3</td></tr></table>";
    let first = to_html(&parse(source));
    let second = to_html(&parse(&first));
    assert_eq!(first, second);
}

#[test]
fn named_entity_and_unquoted_attributes() {
    let dom = parse("<div id=one-id class=silent ref='some &copy; a'><option-one enabled></div>");
    assert_eq!(
        to_html(&dom),
        "<html><head></head><body>\
         <div id=\"one-id\" class=\"silent\" ref=\"some \u{a9} a\">\
         <option-one enabled=\"\"></option-one></div></body></html>"
    );
}

#[test]
fn ambiguous_ampersand_in_attribute_is_not_expanded() {
    // `&copy=` inside an attribute value is followed by `=`, so the
    // historical-entity expansion must not fire.
    let dom = parse("<a href=\"?a=b&copy=c\">x</a>");
    assert!(to_html(&dom).contains("href=\"?a=b&amp;copy=c\""));
}

#[test]
fn entity_without_semicolon_and_unknown_entity() {
    let dom = parse("<p>&amp and &notanentity; end");
    assert!(to_html(&dom).contains("<p>&amp; and &amp;notanentity; end</p>"));
}

#[test]
fn adoption_agency_fixes_misnested_formatting() {
    let dom = parse("<b><i><p></b></i></p>");
    assert_eq!(
        to_html(&dom),
        "<html><head></head><body>\
         <b><i></i></b><i></i><p><i><b></b></i></p>\
         </body></html>"
    );
}

#[test]
fn table_text_is_foster_parented() {
    let dom = parse("<table><tr><td>1</td></tr>x</table>");
    assert_eq!(
        to_html(&dom),
        "<html><head></head><body>\
         x<table><tbody><tr><td>1</td></tr></tbody></table>\
         </body></html>"
    );
}

#[test]
fn fragment_parsing_in_div_context() {
    let dom = driver::parse_fragment(
        RcDom::default(),
        Default::default(),
        QualName::new(None, ns!(html), local_name!("div")),
        vec![],
        false,
    )
    .from_utf8()
    .one("<p>hi".as_bytes());

    // The fragment's nodes hang off a synthetic html element.
    let html = dom.document.children.borrow()[0].clone();
    let mut serialized = Vec::new();
    let handle: SerializableHandle = html.into();
    serialize::serialize(&mut serialized, &handle, Default::default()).unwrap();
    assert_eq!(String::from_utf8(serialized).unwrap(), "<p>hi</p>");
}

#[test]
fn deeply_nested_elements_round_trip() {
    let mut source = String::new();
    for _ in 0..200 {
        source.push_str("<div>");
    }
    source.push('x');
    let html = to_html(&parse(&source));
    assert_eq!(html.matches("<div>").count(), 200);
    assert_eq!(html.matches("</div>").count(), 200);
}
