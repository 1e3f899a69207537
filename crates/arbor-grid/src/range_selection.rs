//! Anchor-and-extend state for shift-range selection.
//!
//! [`RowRangeSelectionContext`] remembers the anchor ("root") and the far end
//! of the current range by node id. It never changes selection flags itself:
//! `truncate` and `extend` return a [`RangePartition`] telling the selection
//! service which nodes to keep selected and which to release.

use crate::node::NodeKey;

/// Row lookups the range context needs from the active row model.
pub trait RowRangeSource {
    /// Resolve a node id to a live node.
    fn row_node(&self, id: &str) -> Option<NodeKey>;

    /// The id of a live node.
    fn node_id(&self, key: NodeKey) -> Option<&str>;

    /// Nodes between `first` and `last` inclusive, in display order.
    ///
    /// Returns `None` when the range cannot be walked, for instance when one
    /// of the boundaries is not displayed.
    fn nodes_in_range_for_selection(&self, first: NodeKey, last: NodeKey) -> Option<Vec<NodeKey>>;

    /// Every non-group row below `key`, excluding `key`.
    fn leaf_descendants(&self, key: NodeKey) -> Vec<NodeKey>;
}

/// Nodes to keep selected and nodes to release after a range gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangePartition {
    pub keep: Vec<NodeKey>,
    pub discard: Vec<NodeKey>,
}

/// Anchor, end and cached range of the current shift selection.
#[derive(Debug, Clone, Default)]
pub struct RowRangeSelectionContext {
    root: Option<String>,
    end: Option<String>,
    cached_range: Vec<NodeKey>,
    /// Set by select-all; a shift gesture then ranges from the first row.
    pub select_all: bool,
}

impl RowRangeSelectionContext {
    /// A context with no anchor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the anchor, the end and the cached range.
    pub fn reset(&mut self) {
        self.root = None;
        self.end = None;
        self.cached_range.clear();
        self.select_all = false;
    }

    /// Start a new range anchored at `node`.
    pub fn set_root(&mut self, source: &dyn RowRangeSource, node: NodeKey) {
        self.root = source.node_id(node).map(str::to_owned);
        self.end = None;
        self.cached_range.clear();
    }

    /// Move the far end of the range to `node`.
    pub fn set_end_range(&mut self, source: &dyn RowRangeSource, node: NodeKey) {
        self.end = source.node_id(node).map(str::to_owned);
        self.cached_range.clear();
    }

    /// Id of the anchor.
    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Id of the far end.
    pub fn end_id(&self) -> Option<&str> {
        self.end.as_deref()
    }

    /// The anchor node, promoting `fallback` to anchor when none is set.
    pub fn get_root(&mut self, source: &dyn RowRangeSource, fallback: Option<NodeKey>) -> Option<NodeKey> {
        if let Some(root) = self.root.as_deref() {
            return source.row_node(root);
        }
        let fallback = fallback?;
        self.set_root(source, fallback);
        Some(fallback)
    }

    fn get_end(&self, source: &dyn RowRangeSource) -> Option<NodeKey> {
        self.end.as_deref().and_then(|end| source.row_node(end))
    }

    /// Nodes from the anchor to the end, in display order.
    ///
    /// Empty when either end is unset or the range cannot be walked. The
    /// result is memoised until the anchor or the end moves.
    pub fn get_range(&mut self, source: &dyn RowRangeSource) -> Vec<NodeKey> {
        if self.cached_range.is_empty() {
            let root = self.root.as_deref().and_then(|root| source.row_node(root));
            let (Some(root), Some(end)) = (root, self.get_end(source)) else {
                return Vec::new();
            };
            self.cached_range = source
                .nodes_in_range_for_selection(root, end)
                .unwrap_or_default();
        }
        self.cached_range.clone()
    }

    /// Whether `node` lies in the current range.
    pub fn is_in_range(&mut self, source: &dyn RowRangeSource, node: NodeKey) -> bool {
        if self.root.is_none() {
            return false;
        }
        let Some(id) = source.node_id(node).map(str::to_owned) else {
            return false;
        };
        self.get_range(source)
            .iter()
            .any(|&k| source.node_id(k) == Some(id.as_str()))
    }

    /// Shrink the range so it ends at `node`.
    ///
    /// When the anchor is at the top of the range the nodes after `node` are
    /// discarded, otherwise the nodes before it. `node` itself is in neither
    /// half. A node outside the range keeps the whole range.
    pub fn truncate(&mut self, source: &dyn RowRangeSource, node: NodeKey) -> RangePartition {
        let range = self.get_range(source);
        let Some(&first) = range.first() else {
            return RangePartition::default();
        };

        let discard_after = source.node_id(first).is_some() && source.node_id(first) == self.root.as_deref();
        let target = source.node_id(node);
        let Some(idx) = range.iter().position(|&k| source.node_id(k) == target) else {
            return RangePartition {
                keep: range,
                discard: Vec::new(),
            };
        };

        let above = range[..idx].to_vec();
        let below = range[idx + 1..].to_vec();
        self.set_end_range(source, node);

        if discard_after {
            RangePartition {
                keep: above,
                discard: below,
            }
        } else {
            RangePartition {
                keep: below,
                discard: above,
            }
        }
    }

    /// Grow the range to reach `node`.
    ///
    /// - Without an anchor the current range, the leaves below `node` (when
    ///   `group_selects_children`) and `node` are kept, and `node` becomes
    ///   the anchor.
    /// - When the range cannot be walked, `node` becomes the anchor and is the
    ///   only node kept.
    /// - When the new range still contains the old end the range grew in the
    ///   same direction and nothing is discarded; otherwise it flipped over
    ///   the anchor and the whole old range is discarded.
    pub fn extend(
        &mut self,
        source: &dyn RowRangeSource,
        node: NodeKey,
        group_selects_children: bool,
    ) -> RangePartition {
        let Some(root) = self.get_root(source, None) else {
            let mut keep = self.get_range(source);
            if group_selects_children {
                keep.extend(source.leaf_descendants(node));
            }
            keep.push(node);
            self.set_root(source, node);
            return RangePartition {
                keep,
                discard: Vec::new(),
            };
        };

        let Some(new_range) = source.nodes_in_range_for_selection(root, node) else {
            tracing::debug!(
                target: arbor_core::logging::targets::RANGE_SELECTION,
                "range walk failed, restarting range"
            );
            self.set_root(source, node);
            return RangePartition {
                keep: vec![node],
                discard: Vec::new(),
            };
        };

        let contains_end = self
            .end
            .as_deref()
            .is_some_and(|end| new_range.iter().any(|&k| source.node_id(k) == Some(end)));

        if contains_end {
            self.set_end_range(source, node);
            RangePartition {
                keep: self.get_range(source),
                discard: Vec::new(),
            }
        } else {
            let discard = self.get_range(source);
            self.set_end_range(source, node);
            RangePartition {
                keep: self.get_range(source),
                discard,
            }
        }
    }
}
