// Copyright 2026 The shrike Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The arena-backed rule tree the stylesheet sink builds.
//!
//! Nodes live in one `Vec` and refer to each other by `RuleId` index,
//! forming intrusive sibling lists under a parent list node. Dropping
//! the arena frees the whole tree at once; there is no per-node
//! ownership to manage.

use crate::at_rule::AtRuleName;
use tendril::StrTendril;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RuleId(u32);

impl RuleId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuleData {
    /// A list of rules: the stylesheet root, or the body of a
    /// rule-bodied at-rule such as `@media`.
    RuleList,
    AtRule {
        kind: AtRuleName,
        name: StrTendril,
        prelude: StrTendril,
    },
    StyleRule {
        /// Verbatim selector text, everything up to the `{`.
        prelude: StrTendril,
    },
    /// A rule that failed to parse; carries the raw source span.
    BadStyleRule {
        raw: StrTendril,
    },
    DeclarationList,
    Declaration {
        name: StrTendril,
        value: StrTendril,
        important: bool,
        /// Set when the declaration failed to parse and `value` holds
        /// the raw text instead of a parsed value.
        undefined: bool,
    },
}

#[derive(Debug)]
pub struct RuleNode {
    pub data: RuleData,
    pub parent: Option<RuleId>,
    pub prev: Option<RuleId>,
    pub next: Option<RuleId>,
    pub first_child: Option<RuleId>,
    pub last_child: Option<RuleId>,
}

#[derive(Debug, Default)]
pub struct RuleArena {
    nodes: Vec<RuleNode>,
}

impl RuleArena {
    pub fn new() -> RuleArena {
        RuleArena { nodes: Vec::new() }
    }

    pub fn alloc(&mut self, data: RuleData) -> RuleId {
        let id = RuleId(self.nodes.len() as u32);
        self.nodes.push(RuleNode {
            data,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        });
        id
    }

    pub fn get(&self, id: RuleId) -> &RuleNode {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: RuleId) -> &mut RuleNode {
        &mut self.nodes[id.index()]
    }

    pub fn append_child(&mut self, parent: RuleId, child: RuleId) {
        debug_assert!(self.nodes[child.index()].parent.is_none());
        let prev = self.nodes[parent.index()].last_child;
        match prev {
            Some(prev) => {
                self.nodes[prev.index()].next = Some(child);
            },
            None => {
                self.nodes[parent.index()].first_child = Some(child);
            },
        }
        let node = &mut self.nodes[child.index()];
        node.parent = Some(parent);
        node.prev = prev;
        self.nodes[parent.index()].last_child = Some(child);
    }

    /// Unlink a node from its siblings and parent in O(1). The node
    /// itself stays in the arena until the arena is dropped.
    pub fn detach(&mut self, id: RuleId) {
        let (parent, prev, next) = {
            let node = &mut self.nodes[id.index()];
            (node.parent.take(), node.prev.take(), node.next.take())
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.index()].first_child = next;
                }
            },
        }
        match next {
            Some(next) => self.nodes[next.index()].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.index()].last_child = prev;
                }
            },
        }
    }

    pub fn children(&self, parent: RuleId) -> Children<'_> {
        Children {
            arena: self,
            next: self.get(parent).first_child,
        }
    }
}

pub struct Children<'a> {
    arena: &'a RuleArena,
    next: Option<RuleId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = RuleId;

    fn next(&mut self) -> Option<RuleId> {
        let id = self.next?;
        self.next = self.arena.get(id).next;
        Some(id)
    }
}

#[cfg(test)]
mod test {
    use super::{RuleArena, RuleData};

    #[test]
    fn sibling_links() {
        let mut arena = RuleArena::new();
        let list = arena.alloc(RuleData::RuleList);
        let a = arena.alloc(RuleData::DeclarationList);
        let b = arena.alloc(RuleData::DeclarationList);
        let c = arena.alloc(RuleData::DeclarationList);
        arena.append_child(list, a);
        arena.append_child(list, b);
        arena.append_child(list, c);

        assert_eq!(arena.children(list).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(arena.get(b).prev, Some(a));
        assert_eq!(arena.get(b).parent, Some(list));

        arena.detach(b);
        assert_eq!(arena.children(list).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(arena.get(c).prev, Some(a));
        assert_eq!(arena.get(a).next, Some(c));
    }
}
