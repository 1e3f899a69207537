//! Row nodes and the arena that owns them.
//!
//! Every logical row (leaf data row, group row, footer row and the invisible
//! root) is a [`RowNode`] stored in a [`RowTree`]. Nodes refer to each other
//! through [`NodeKey`] handles: parent and sibling links are plain keys, and
//! child lists are vectors of keys, so the tree has no ownership cycles.

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle of a node inside a [`RowTree`].
    ///
    /// Keys stay valid until the node is discarded from the arena. Removed
    /// leaves are discarded at the end of the operation that removed them.
    pub struct NodeKey;
}

/// Id of the root node.
pub const ROOT_NODE_ID: &str = "ROOT_NODE_ID";

/// Prefix of the ids of group rows built by the row model.
pub const GROUP_ID_PREFIX: &str = "row-group-";

/// Prefix of the ids of footer rows.
pub const FOOTER_ID_PREFIX: &str = "rowGroupFooter_";

/// Which edge of the grid a pinned row is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowPinned {
    /// Pinned above the scrollable rows.
    Top,
    /// Pinned below the scrollable rows.
    Bottom,
}

/// One logical row.
///
/// Position bookkeeping (`source_row_index`, `row_index`, `row_top`) is owned
/// by the node manager and the row model; the selection flag is owned by the
/// selection service. Both are only writable from inside the crate.
pub struct RowNode<T> {
    id: Option<String>,
    data: Option<Arc<T>>,
    level: i32,
    ui_level: i32,
    group: bool,
    footer: bool,
    expanded: bool,
    selectable: bool,
    row_pinned: Option<RowPinned>,
    key: Option<String>,
    field: Option<String>,
    parent: Option<NodeKey>,
    sibling: Option<NodeKey>,
    pub(crate) children_after_group: Vec<NodeKey>,
    pub(crate) children_after_filter: Vec<NodeKey>,
    pub(crate) children_after_agg_filter: Vec<NodeKey>,
    pub(crate) children_after_sort: Vec<NodeKey>,
    pub(crate) all_leaf_children: Vec<NodeKey>,
    source_row_index: Option<usize>,
    row_index: Option<usize>,
    row_top: Option<f64>,
    selected: Option<bool>,
}

impl<T> std::fmt::Debug for RowNode<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowNode")
            .field("id", &self.id)
            .field("level", &self.level)
            .field("group", &self.group)
            .field("footer", &self.footer)
            .field("source_row_index", &self.source_row_index)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl<T> RowNode<T> {
    fn blank(id: Option<String>, level: i32) -> Self {
        Self {
            id,
            data: None,
            level,
            ui_level: level.max(0),
            group: false,
            footer: false,
            expanded: false,
            selectable: true,
            row_pinned: None,
            key: None,
            field: None,
            parent: None,
            sibling: None,
            children_after_group: Vec::new(),
            children_after_filter: Vec::new(),
            children_after_agg_filter: Vec::new(),
            children_after_sort: Vec::new(),
            all_leaf_children: Vec::new(),
            source_row_index: None,
            row_index: None,
            row_top: None,
            selected: Some(false),
        }
    }

    pub(crate) fn root() -> Self {
        let mut node = Self::blank(Some(ROOT_NODE_ID.to_owned()), -1);
        node.group = true;
        node.expanded = true;
        node.selectable = false;
        node
    }

    pub(crate) fn leaf(id: Option<String>, data: Option<Arc<T>>, source_row_index: usize) -> Self {
        let mut node = Self::blank(id, 0);
        node.data = data;
        node.source_row_index = Some(source_row_index);
        node
    }

    pub(crate) fn group(id: String, field: &str, key: String, level: i32, expanded: bool) -> Self {
        let mut node = Self::blank(Some(id), level);
        node.group = true;
        node.field = Some(field.to_owned());
        node.key = Some(key);
        node.expanded = expanded;
        node
    }

    pub(crate) fn pinned(id: String, data: Arc<T>, pinned: RowPinned) -> Self {
        let mut node = Self::blank(Some(id), 0);
        node.data = Some(data);
        node.row_pinned = Some(pinned);
        node
    }

    /// Build the footer row mirroring `group`, whose key is `group_key`.
    pub(crate) fn footer_of(group: &RowNode<T>, group_key: NodeKey) -> Self {
        let id = group
            .id
            .as_deref()
            .map(|id| format!("{FOOTER_ID_PREFIX}{id}"));
        let mut node = Self::blank(id, group.level);
        node.ui_level = group.ui_level;
        node.group = true;
        node.footer = true;
        node.expanded = true;
        node.field = group.field.clone();
        node.key = group.key.clone();
        node.sibling = Some(group_key);
        node.parent = group.parent;
        node.selectable = group.selectable;
        node.selected = group.selected;
        node
    }

    // =========================================================================
    // Identity and data
    // =========================================================================

    /// The node id, `None` while the row is still loading.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The user record behind a leaf row.
    pub fn data(&self) -> Option<&Arc<T>> {
        self.data.as_ref()
    }

    /// Whether `data` is the very record this node holds.
    pub fn holds_data(&self, data: &Arc<T>) -> bool {
        self.data.as_ref().is_some_and(|own| Arc::ptr_eq(own, data))
    }

    pub(crate) fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    pub(crate) fn update_data(&mut self, data: Arc<T>) {
        self.data = Some(data);
    }

    // =========================================================================
    // Shape
    // =========================================================================

    /// Depth in the tree, `-1` for the root.
    pub fn level(&self) -> i32 {
        self.level
    }

    pub(crate) fn set_level(&mut self, level: i32) {
        self.level = level;
        self.ui_level = level.max(0);
    }

    /// Indentation level used for display.
    pub fn ui_level(&self) -> i32 {
        self.ui_level
    }

    /// Whether this is a group, filler, footer or root row.
    pub fn is_group(&self) -> bool {
        self.group
    }

    /// Whether this is a footer row.
    pub fn is_footer(&self) -> bool {
        self.footer
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.level == -1
    }

    /// Whether the group row shows its children.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub(crate) fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Whether the row may be selected.
    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub(crate) fn set_selectable_flag(&mut self, selectable: bool) {
        self.selectable = selectable;
    }

    /// The edge this row is pinned to, if any.
    pub fn row_pinned(&self) -> Option<RowPinned> {
        self.row_pinned
    }

    /// The value this group row groups by.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// The field this group row groups by.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The parent row, `None` for the root and detached rows.
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeKey>) {
        self.parent = parent;
    }

    /// The footer of a group, or the group of a footer.
    pub fn sibling(&self) -> Option<NodeKey> {
        self.sibling
    }

    pub(crate) fn set_sibling(&mut self, sibling: Option<NodeKey>) {
        self.sibling = sibling;
    }

    /// Children as produced by grouping.
    pub fn children_after_group(&self) -> &[NodeKey] {
        &self.children_after_group
    }

    /// Children that pass the filter.
    pub fn children_after_filter(&self) -> &[NodeKey] {
        &self.children_after_filter
    }

    /// Children that pass the filter, including aggregate filtering.
    pub fn children_after_agg_filter(&self) -> &[NodeKey] {
        &self.children_after_agg_filter
    }

    /// Children in display order.
    pub fn children_after_sort(&self) -> &[NodeKey] {
        &self.children_after_sort
    }

    /// Every leaf below this row, unfiltered.
    pub fn all_leaf_children(&self) -> &[NodeKey] {
        &self.all_leaf_children
    }

    /// Whether the row has children after grouping.
    pub fn has_children(&self) -> bool {
        !self.children_after_group.is_empty()
    }

    // =========================================================================
    // Position bookkeeping
    // =========================================================================

    /// Position within the flat leaf array.
    pub fn source_row_index(&self) -> Option<usize> {
        self.source_row_index
    }

    pub(crate) fn set_source_row_index(&mut self, index: Option<usize>) {
        self.source_row_index = index;
    }

    /// Position among displayed rows.
    pub fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    pub(crate) fn set_row_index(&mut self, index: Option<usize>) {
        self.row_index = index;
    }

    /// Vertical offset assigned by a renderer.
    pub fn row_top(&self) -> Option<f64> {
        self.row_top
    }

    /// Record the vertical offset a renderer laid this row out at.
    pub fn set_row_top(&mut self, top: Option<f64>) {
        self.row_top = top;
    }

    /// Clear `row_top` and `row_index`, as for a row that left the grid.
    pub(crate) fn clear_row_top_and_row_index(&mut self) {
        self.row_top = None;
        self.row_index = None;
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// The raw selection flag: `Some(true)`, `Some(false)` or `None` for
    /// indeterminate.
    ///
    /// For footer rows read the flag of [`RowTree::selection_identity`].
    pub fn is_selected(&self) -> Option<bool> {
        self.selected
    }

    pub(crate) fn set_selected_flag(&mut self, selected: Option<bool>) {
        self.selected = selected;
    }
}

/// Snapshot of a node whose id was retired by a reload.
///
/// Kept in the selection set so the old selection entry stays queryable.
#[derive(Debug)]
pub struct DaemonNode<T> {
    id: String,
    data: Option<Arc<T>>,
    selected: Option<bool>,
    level: i32,
}

impl<T> DaemonNode<T> {
    pub(crate) fn snapshot(node: &RowNode<T>) -> Option<Self> {
        Some(Self {
            id: node.id.clone()?,
            data: node.data.clone(),
            selected: node.selected,
            level: node.level,
        })
    }

    /// The retired id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The record the node held when its id was retired.
    pub fn data(&self) -> Option<&Arc<T>> {
        self.data.as_ref()
    }

    /// Selection flag at the time of retirement.
    pub fn is_selected(&self) -> Option<bool> {
        self.selected
    }

    /// Level of the retired node.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Always `true`.
    pub fn is_daemon(&self) -> bool {
        true
    }
}

/// Arena owning every [`RowNode`] of one grid.
pub struct RowTree<T> {
    nodes: SlotMap<NodeKey, RowNode<T>>,
    root: NodeKey,
}

impl<T> Default for RowTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RowTree<T> {
    /// Create an arena holding only the root.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(RowNode::root());
        Self { nodes, root }
    }

    /// Key of the root node.
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Look up a node.
    pub fn get(&self, key: NodeKey) -> Option<&RowNode<T>> {
        self.nodes.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: NodeKey) -> Option<&mut RowNode<T>> {
        self.nodes.get_mut(key)
    }

    /// Whether `key` refers to a live node.
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Number of nodes in the arena, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the root is never removed.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn insert(&mut self, node: RowNode<T>) -> NodeKey {
        self.nodes.insert(node)
    }

    pub(crate) fn discard(&mut self, key: NodeKey) -> Option<RowNode<T>> {
        if key == self.root {
            return None;
        }
        self.nodes.remove(key)
    }

    /// Id of a node, if it is live and its id is known.
    pub fn id_of(&self, key: NodeKey) -> Option<&str> {
        self.get(key).and_then(RowNode::id)
    }

    /// The node whose selection state `key` reads and writes.
    ///
    /// A footer row shares its selection with its group; every other row is
    /// its own identity.
    pub fn selection_identity(&self, key: NodeKey) -> NodeKey {
        match self.get(key) {
            Some(node) if node.footer => node.sibling.filter(|s| self.contains(*s)).unwrap_or(key),
            _ => key,
        }
    }

    /// Selection flag as seen through [`selection_identity`](Self::selection_identity).
    pub fn selected_state(&self, key: NodeKey) -> Option<bool> {
        self.get(self.selection_identity(key))
            .and_then(RowNode::is_selected)
    }

    /// Visit `key` and its descendants through `children_after_group`,
    /// children before their parent.
    pub fn depth_first_search(&self, key: NodeKey, callback: &mut dyn FnMut(NodeKey, &RowNode<T>)) {
        let Some(node) = self.get(key) else {
            return;
        };
        for &child in &node.children_after_group {
            self.depth_first_search(child, callback);
        }
        callback(key, node);
    }

    /// Every non-group row below `key`, in depth-first order, excluding `key`.
    pub fn leaf_descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut leaves = Vec::new();
        self.depth_first_search(key, &mut |k, node| {
            if k != key && !node.group {
                leaves.push(k);
            }
        });
        leaves
    }

    /// Every node below the root reachable through `children_after_group`,
    /// parents before children.
    pub fn nodes_after_group(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_pre_order(self.root, |node| &node.children_after_group, &mut out);
        out
    }

    /// Every node below the root reachable through `children_after_filter`,
    /// parents before children.
    pub fn nodes_after_filter(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_pre_order(self.root, |node| &node.children_after_filter, &mut out);
        out
    }

    /// Every node below the root reachable through `children_after_sort`,
    /// parents before children.
    pub fn nodes_after_sort(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        self.collect_pre_order(self.root, |node| &node.children_after_sort, &mut out);
        out
    }

    fn collect_pre_order(
        &self,
        key: NodeKey,
        children: fn(&RowNode<T>) -> &Vec<NodeKey>,
        out: &mut Vec<NodeKey>,
    ) {
        let Some(node) = self.get(key) else {
            return;
        };
        for &child in children(node) {
            out.push(child);
            self.collect_pre_order(child, children, out);
        }
    }

    /// Iterate over every node in the arena, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &RowNode<T>)> {
        self.nodes.iter()
    }
}
