// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Traits for serializing a DOM back to markup text. The serializer
//! itself lives in the HTML crate; tree implementations implement
//! [`Serialize`] to walk their nodes through a [`Serializer`].

use std::io;

use crate::interface::QualName;

/// Whether to serialize the given node itself or only its children.
#[derive(Clone, PartialEq)]
pub enum TraversalScope {
    /// Serialize the node itself and its children.
    IncludeNode,
    /// Serialize only the children of the node, with the given parent
    /// element name available for context.
    ChildrenOnly(Option<QualName>),
}

/// A node within a tree that can be serialized.
pub trait Serialize {
    fn serialize<S>(&self, serializer: &mut S, traversal_scope: TraversalScope) -> io::Result<()>
    where
        S: Serializer;
}

/// A serializer which a [`Serialize`] implementation pushes markup events into.
pub trait Serializer {
    /// Serialize the start of an element, for example `<div class="test">`.
    fn start_elem<'a, AttrIter>(&mut self, name: QualName, attrs: AttrIter) -> io::Result<()>
    where
        AttrIter: Iterator<Item = AttrRef<'a>>;

    /// Serialize the end of an element, for example `</div>`.
    fn end_elem(&mut self, name: QualName) -> io::Result<()>;

    /// Serialize a plain text node.
    fn write_text(&mut self, text: &str) -> io::Result<()>;

    /// Serialize a comment node, for example `<!-- comment text -->`.
    fn write_comment(&mut self, text: &str) -> io::Result<()>;

    /// Serialize a doctype node, for example `<!doctype html>`.
    fn write_doctype(&mut self, name: &str) -> io::Result<()>;

    /// Serialize a processing instruction node, for example
    /// `<?processing instruction?>`.
    fn write_processing_instruction(&mut self, target: &str, data: &str) -> io::Result<()>;
}

/// A reference to an attribute name and its value.
pub type AttrRef<'a> = (&'a QualName, &'a str);

#[cfg(test)]
mod test {
    use super::TraversalScope;
    use crate::interface::QualName;
    use web_atoms::{local_name, ns};

    #[test]
    fn children_only_scope_carries_the_parent_name() {
        let name = QualName::new(None, ns!(html), local_name!("div"));
        let scope = TraversalScope::ChildrenOnly(Some(name));
        let copy = scope.clone();
        assert!(scope == copy);
        match copy {
            TraversalScope::ChildrenOnly(Some(n)) => assert_eq!(n.local, local_name!("div")),
            _ => panic!("clone changed the scope"),
        }
    }
}
