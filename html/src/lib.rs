// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! An incremental HTML5 parser: tokenizer, tree constructor, and
//! serializer, over any tree representation that implements
//! [`TreeSink`](interface::TreeSink).

pub use driver::{parse_document, parse_fragment, ParseOpts, Parser};
pub use shrike_markup::interface::{Attribute, ExpandedName, QualName};
pub use shrike_markup::{
    buffer_queue, expanded_name, local_name, namespace_prefix, namespace_url, ns, small_char_set,
    tendril, BufferQueue, LocalName, Namespace, Prefix,
};

#[macro_use]
mod macros;

pub mod driver;
pub mod serialize;
pub mod tokenizer;
pub mod tree_builder;

mod util {
    pub(crate) mod str;
}

/// The interface implemented by trees that the parser builds into,
/// re-exported from the substrate crate.
pub mod interface {
    pub use shrike_markup::interface::tree_builder::{
        create_element, AppendNode, AppendText, ElemName, ElementFlags, NodeOrText, Tracer,
        TreeSink,
    };
    pub use shrike_markup::interface::{
        Attribute, ExpandedName, LimitedQuirks, NoQuirks, QualName, Quirks, QuirksMode,
    };
}
