// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Types for tag and attribute names, and the tree mutation interface.

use std::fmt;
use tendril::StrTendril;
use web_atoms::{LocalName, Namespace, Prefix};

pub use self::tree_builder::{create_element, AppendNode, AppendText, ElementFlags, NodeOrText};
pub use self::tree_builder::{ElemName, Tracer, TreeSink};
pub use self::tree_builder::{LimitedQuirks, NoQuirks, Quirks, QuirksMode};

pub mod tree_builder;

/// An [expanded name], containing the namespace and the local name
/// but skipping the prefix.
///
/// [expanded name]: https://www.w3.org/TR/REC-xml-names/#dt-expname
#[derive(Copy, Clone, Eq, Hash, PartialEq)]
pub struct ExpandedName<'a> {
    pub ns: &'a Namespace,
    pub local: &'a LocalName,
}

impl ElemName for ExpandedName<'_> {
    #[inline(always)]
    fn ns(&self) -> &Namespace {
        self.ns
    }

    #[inline(always)]
    fn local_name(&self) -> &LocalName {
        self.local
    }
}

impl fmt::Debug for ExpandedName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.ns.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}:{}", self.ns, self.local)
        }
    }
}

/// Helper to quickly create an expanded name.
///
/// Can be used with no namespace as `expanded_name!("", "some_name")`
/// or with a namespace as `expanded_name!(ns "some_name")`.
#[macro_export]
macro_rules! expanded_name {
    ("", $local: tt) => {
        $crate::interface::ExpandedName {
            ns: &$crate::namespace_url!(""),
            local: &$crate::local_name!($local),
        }
    };
    ($ns: ident $local: tt) => {
        $crate::interface::ExpandedName {
            ns: &$crate::ns!($ns),
            local: &$crate::local_name!($local),
        }
    };
}

/// A fully qualified name (with a namespace), used to depict names of tags
/// and attributes.
///
/// Namespaces can be used to differentiate between similar XML fragments.
/// For example:
///
/// ```text
///    // HTML
///    <table>
///      <tr>
///        <td>Apples</td>
///        <td>Bananas</td>
///      </tr>
///    </table>
///
///    // Furniture XML
///    <table>
///      <name>African Coffee Table</name>
///      <width>80</width>
///      <length>120</length>
///    </table>
/// ```
///
/// Without XML namespaces, we can't use those two fragments in the same
/// document at the same time. However if we declare a namespace, we could
/// instead say:
///
/// ```text
///    // Furniture XML
///    <furn:table>
///      <furn:name>African Coffee Table</furn:name>
///      <furn:width>80</furn:width>
///      <furn:length>120</furn:length>
///    </furn:table>
/// ```
///
/// and bind the prefix `furn` to a different namespace.
///
/// For this reason we parse names that contain a colon in the following way:
///
/// ```text
///    <furn:table>
///        |    |
///        |    +- local name
///        |
///      prefix (when resolved gives namespace_url)
/// ```
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct QualName {
    /// The prefix, if any, of this name.
    pub prefix: Option<Prefix>,
    /// The namespace this name belongs to.
    pub ns: Namespace,
    /// The local name, e.g. `table` in `furn:table` above.
    pub local: LocalName,
}

impl QualName {
    /// Basic constructor function.
    #[inline]
    pub fn new(prefix: Option<Prefix>, ns: Namespace, local: LocalName) -> QualName {
        QualName { prefix, ns, local }
    }

    /// Take a reference of this name as an `ExpandedName`, dropping the
    /// unresolved prefix.
    ///
    /// In XML and HTML prefixes are only used to extract the relevant
    /// namespace URI. Once resolved, the prefix plays no role in comparing
    /// names, so it is not a part of the expanded name.
    #[inline]
    pub fn expanded(&self) -> ExpandedName {
        ExpandedName {
            ns: &self.ns,
            local: &self.local,
        }
    }
}

/// A tag attribute, e.g. `class="test"` in `<div class="test" ...>`.
///
/// The namespace on the attribute name is almost always ns!("").
/// The tokenizer creates all attributes this way, but the tree
/// builder will adjust certain attribute names inside foreign
/// content (MathML, SVG).
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Attribute {
    /// The name of the attribute (e.g. the `class` in `<div class="test">`).
    pub name: QualName,
    /// The value of the attribute (e.g. the `"test"` in `<div class="test">`).
    pub value: StrTendril,
}

#[cfg(test)]
mod tests {
    use super::{Namespace, QualName};
    use web_atoms::{local_name, namespace_prefix, namespace_url, ns, LocalName};

    #[test]
    fn ns_macro() {
        assert_eq!(ns!(), Namespace::from(""));

        assert_eq!(ns!(html), Namespace::from("http://www.w3.org/1999/xhtml"));
        assert_eq!(
            ns!(xml),
            Namespace::from("http://www.w3.org/XML/1998/namespace")
        );
        assert_eq!(ns!(xmlns), Namespace::from("http://www.w3.org/2000/xmlns/"));
        assert_eq!(ns!(xlink), Namespace::from("http://www.w3.org/1999/xlink"));
        assert_eq!(ns!(svg), Namespace::from("http://www.w3.org/2000/svg"));
        assert_eq!(
            ns!(mathml),
            Namespace::from("http://www.w3.org/1998/Math/MathML")
        );
    }

    #[test]
    fn qualname() {
        assert_eq!(
            QualName::new(None, ns!(), local_name!("")),
            QualName {
                prefix: None,
                ns: ns!(),
                local: LocalName::from(""),
            }
        );
        assert_eq!(
            QualName::new(Some(namespace_prefix!("xml")), ns!(xml), local_name!("base")),
            QualName {
                prefix: Some(namespace_prefix!("xml")),
                ns: ns!(xml),
                local: local_name!("base"),
            }
        );
    }
}
