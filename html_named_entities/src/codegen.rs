// Copyright 2014-2025 The html5ever Project Developers. See the
// COPYRIGHT file at the top-level directory of this distribution.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::interface::CharRef;

include!(concat!(env!("OUT_DIR"), "/named_entities_graph.rs"));

#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    code_point: u8,
    /// Represents the number of terminal nodes within this node's subtree.
    ///
    /// This is needed for minimal perfect hashing within the DAFSA.
    hash_value: u16,
    is_terminal: bool,
    is_last_child: bool,
    first_child_index: usize,
}

impl Node {
    pub(crate) const fn new(
        code_point: u8,
        hash_value: u16,
        is_terminal: bool,
        is_last_child: bool,
        first_child_index: usize,
    ) -> Self {
        Self {
            code_point,
            hash_value,
            is_terminal,
            is_last_child,
            first_child_index,
        }
    }

    pub(crate) const fn code_point(&self) -> u8 {
        self.code_point
    }

    pub(crate) const fn hash_value(&self) -> usize {
        self.hash_value as usize
    }

    pub(crate) const fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub(crate) fn children(&self) -> impl Iterator<Item = &'static Node> {
        struct ChildIterator {
            index: usize,
            done: bool,
        }

        impl Iterator for ChildIterator {
            type Item = &'static Node;

            fn next(&mut self) -> Option<Self::Item> {
                if self.done {
                    return None;
                }
                let node = &DAFSA_NODES[self.index];
                self.index += 1;

                if node.is_last_child {
                    self.done = true;
                }

                Some(node)
            }
        }

        ChildIterator {
            index: self.first_child_index,
            done: self.first_child_index == 0,
        }
    }
}

pub(crate) fn resolve_unique_hash_value(value: usize) -> CharRef {
    let (first, second) = REFERENCES[value];

    let num_chars = if second == 0 { 1 } else { 2 };

    CharRef {
        chars: [
            char::from_u32(first).unwrap(),
            char::from_u32(second).unwrap(),
        ],
        num_chars,
    }
}
