// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, LayerId};
use super::store::LayerTree;

/// An iterator over the direct children of a layer, in document order.
///
/// Created by [`LayerTree::children`].
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a LayerTree,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a LayerTree, first: u32) -> Self {
        Self {
            tree,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.tree.next_sibling[idx as usize];
        Some(LayerId {
            idx,
            generation: self.tree.generation[idx as usize],
        })
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn children_follow_document_order() {
        let mut tree = LayerTree::new();
        let root = tree.create_root_layer();
        let a = tree.create_layer();
        let a1 = tree.create_layer();
        let b = tree.create_layer();
        tree.add_child(root, a);
        tree.add_child(a, a1);
        tree.add_child(root, b);

        let order: Vec<LayerId> = tree.children(root).collect();
        assert_eq!(order, vec![a, b], "grandchildren are not yielded");
        assert_eq!(tree.children(b).count(), 0);
    }
}
