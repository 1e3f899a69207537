//! Tracks which parts of the row tree changed, so group-level work only
//! revisits affected subtrees.

use std::collections::HashSet;

use crate::node::{NodeKey, RowTree};

/// Set of group rows whose subtree changed.
///
/// An inactive path treats every node as changed. Traversal always lists
/// children before their parent, so a group is revisited only after all of
/// its changed descendants.
#[derive(Debug, Clone, Default)]
pub struct ChangedPath {
    inactive: bool,
    changed: HashSet<NodeKey>,
}

impl ChangedPath {
    /// An empty, active path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A path that covers the whole tree.
    pub fn everything() -> Self {
        Self {
            inactive: true,
            changed: HashSet::new(),
        }
    }

    /// Whether only recorded nodes are traversed.
    pub fn is_active(&self) -> bool {
        !self.inactive
    }

    /// Stop tracking and cover the whole tree.
    pub fn set_inactive(&mut self) {
        self.inactive = true;
        self.changed.clear();
    }

    /// Record `key` and every ancestor of it.
    pub fn add_parent_node<T>(&mut self, tree: &RowTree<T>, key: NodeKey) {
        if self.inactive {
            return;
        }
        let mut current = Some(key);
        while let Some(k) = current {
            if !self.changed.insert(k) {
                // ancestors already recorded
                break;
            }
            current = tree.get(k).and_then(|node| node.parent());
        }
    }

    /// Whether the subtree below `key` can be skipped.
    pub fn can_skip(&self, key: NodeKey) -> bool {
        !self.inactive && !self.changed.contains(&key)
    }

    /// Changed nodes under `tree`'s root in post-order.
    ///
    /// Leaves are only listed when `include_leaves` is set, and only for an
    /// inactive path. The root itself is listed last.
    pub fn changed_nodes_depth_first<T>(&self, tree: &RowTree<T>, include_leaves: bool) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect(tree, tree.root(), include_leaves, &mut out);
        out
    }

    fn collect<T>(&self, tree: &RowTree<T>, key: NodeKey, include_leaves: bool, out: &mut Vec<NodeKey>) {
        if self.can_skip(key) {
            return;
        }
        let Some(node) = tree.get(key) else {
            return;
        };
        if node.has_children() {
            for &child in node.children_after_group() {
                self.collect(tree, child, include_leaves, out);
            }
            out.push(key);
        } else if include_leaves && self.inactive {
            out.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::RowNode;
    use std::sync::Arc;

    /// root -> [g1 -> [a, b], g2 -> [c]]
    fn two_groups() -> (RowTree<u8>, [NodeKey; 5]) {
        let mut tree = RowTree::new();
        let root = tree.root();
        let g1 = tree.insert(RowNode::group("g1".into(), "f", "1".into(), 0, true));
        let g2 = tree.insert(RowNode::group("g2".into(), "f", "2".into(), 0, true));
        let a = tree.insert(RowNode::leaf(Some("a".into()), Some(Arc::new(0)), 0));
        let b = tree.insert(RowNode::leaf(Some("b".into()), Some(Arc::new(1)), 1));
        let c = tree.insert(RowNode::leaf(Some("c".into()), Some(Arc::new(2)), 2));
        for (child, parent) in [(a, g1), (b, g1), (c, g2), (g1, root), (g2, root)] {
            tree.get_mut(child).unwrap().set_parent(Some(parent));
        }
        tree.get_mut(g1).unwrap().children_after_group = vec![a, b];
        tree.get_mut(g2).unwrap().children_after_group = vec![c];
        tree.get_mut(root).unwrap().children_after_group = vec![g1, g2];
        (tree, [g1, g2, a, b, c])
    }

    #[test]
    fn test_everything_lists_groups_post_order() {
        let (tree, [g1, g2, ..]) = two_groups();
        let path = ChangedPath::everything();
        assert_eq!(path.changed_nodes_depth_first(&tree, false), vec![g1, g2, tree.root()]);
    }

    #[test]
    fn test_everything_with_leaves() {
        let (tree, [g1, g2, a, b, c]) = two_groups();
        let path = ChangedPath::everything();
        assert_eq!(
            path.changed_nodes_depth_first(&tree, true),
            vec![a, b, g1, c, g2, tree.root()]
        );
    }

    #[test]
    fn test_active_path_only_visits_recorded_ancestors() {
        let (tree, [g1, g2, a, ..]) = two_groups();
        let mut path = ChangedPath::new();
        path.add_parent_node(&tree, g2);

        assert!(path.can_skip(g1));
        assert!(!path.can_skip(g2));
        assert_eq!(path.changed_nodes_depth_first(&tree, false), vec![g2, tree.root()]);

        path.add_parent_node(&tree, a);
        assert_eq!(path.changed_nodes_depth_first(&tree, false), vec![g1, g2, tree.root()]);
    }

    #[test]
    fn test_set_inactive_covers_everything() {
        let (tree, [g1, g2, ..]) = two_groups();
        let mut path = ChangedPath::new();
        assert!(path.changed_nodes_depth_first(&tree, false).is_empty());
        path.set_inactive();
        assert!(!path.is_active());
        assert_eq!(path.changed_nodes_depth_first(&tree, false), vec![g1, g2, tree.root()]);
    }
}
