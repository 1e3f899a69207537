//! Row selection engine.
//!
//! [`SelectionService`] owns the selection set (an insertion-ordered map from
//! node id to node) and is the only writer of the nodes' selection flags.
//! Every public operation keeps the map and the flags consistent:
//! the map holds exactly the rows whose flag is `Some(true)`, except group
//! rows while group selection is derived from descendants.
//!
//! # Organisation
//!
//! - this module: flag writes, `set_nodes_selected`, group derivation, queries
//! - [`gesture`]: turning clicks and key presses into selection changes
//! - `scope`: select-all and deselect-all over a [`SelectAllScope`]
//! - `selectable`: keeping the `selectable` flag in line with the callback
//!
//! [`SelectAllScope`]: crate::options::SelectAllScope

pub mod capabilities;
pub mod gesture;
mod scope;
mod selectable;

use std::collections::HashSet;
use std::sync::Arc;

use arbor_core::WarnOnce;
use arbor_core::logging::targets;
use indexmap::IndexMap;

use crate::changed_path::ChangedPath;
use crate::error::GridError;
use crate::events::{GridEvents, RowSelectedEvent, SelectionEventSource};
use crate::node::{DaemonNode, NodeKey, RowTree};
use crate::range_selection::RowRangeSelectionContext;

pub use capabilities::SelectionCapabilities;
pub use gesture::{Modifiers, NodeSelection};

/// An entry of the selection set.
#[derive(Debug)]
pub enum SelectedNode<T> {
    /// A node in the arena.
    Live(NodeKey),
    /// A retired id kept so the old selection stays visible.
    Daemon(Arc<DaemonNode<T>>),
}

impl<T> Clone for SelectedNode<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Live(key) => Self::Live(*key),
            Self::Daemon(daemon) => Self::Daemon(daemon.clone()),
        }
    }
}

impl<T> SelectedNode<T> {
    /// The arena key of a live entry.
    pub fn key(&self) -> Option<NodeKey> {
        match self {
            Self::Live(key) => Some(*key),
            Self::Daemon(_) => None,
        }
    }

    /// Whether this entry is a daemon.
    pub fn is_daemon(&self) -> bool {
        matches!(self, Self::Daemon(_))
    }
}

/// Selection state of a group derived from its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildSelection {
    /// Every counted child is selected.
    Selected,
    /// Every counted child is deselected.
    Deselected,
    /// Some children are selected and some are not.
    Indeterminate,
    /// No child has a determinable state.
    Unresolved,
}

impl ChildSelection {
    fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            Some(true) => Self::Selected,
            Some(false) => Self::Deselected,
            None => Self::Indeterminate,
        }
    }

    /// The flag to store on the group; unresolved counts as deselected.
    pub fn to_flag(self) -> Option<bool> {
        match self {
            Self::Selected => Some(true),
            Self::Deselected | Self::Unresolved => Some(false),
            Self::Indeterminate => None,
        }
    }
}

/// Arguments of [`SelectionService::set_nodes_selected`].
#[derive(Debug, Clone)]
pub struct SetSelectedParams {
    pub nodes: Vec<NodeKey>,
    pub new_value: bool,
    /// Deselect every other node when selecting.
    pub clear_selection: bool,
    /// Skip clearing others, group recompute and `selection_changed`.
    pub suppress_finish_actions: bool,
    pub source: SelectionEventSource,
}

impl SetSelectedParams {
    /// Set `nodes` to `new_value`.
    pub fn new(nodes: Vec<NodeKey>, new_value: bool, source: SelectionEventSource) -> Self {
        Self {
            nodes,
            new_value,
            clear_selection: false,
            suppress_finish_actions: false,
            source,
        }
    }

    /// Also deselect every other node.
    pub fn clear_selection(mut self, clear: bool) -> Self {
        self.clear_selection = clear;
        self
    }

    /// Leave the finishing steps to the caller.
    pub fn suppress_finish_actions(mut self, suppress: bool) -> Self {
        self.suppress_finish_actions = suppress;
        self
    }
}

/// The selection engine of one grid.
pub struct SelectionService<T> {
    caps: SelectionCapabilities<T>,
    selected_nodes: IndexMap<String, SelectedNode<T>>,
    ctx: RowRangeSelectionContext,
    events: Arc<GridEvents>,
    logger: Arc<WarnOnce>,
}

impl<T> std::fmt::Debug for SelectionService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionService")
            .field("caps", &self.caps)
            .field("selected", &self.selected_nodes.len())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl<T> SelectionService<T> {
    /// Create an engine with an empty selection.
    pub fn new(caps: SelectionCapabilities<T>, events: Arc<GridEvents>, logger: Arc<WarnOnce>) -> Self {
        Self {
            caps,
            selected_nodes: IndexMap::new(),
            ctx: RowRangeSelectionContext::new(),
            events,
            logger,
        }
    }

    /// The capabilities this engine was built with.
    pub fn capabilities(&self) -> &SelectionCapabilities<T> {
        &self.caps
    }

    pub(crate) fn capabilities_mut(&mut self) -> &mut SelectionCapabilities<T> {
        &mut self.caps
    }

    /// The shift-range state.
    pub fn range_context(&self) -> &RowRangeSelectionContext {
        &self.ctx
    }

    /// Whether more than one row may be selected.
    pub fn is_multi_select(&self) -> bool {
        self.caps.is_multi_select()
    }

    // =========================================================================
    // Flag writes
    // =========================================================================

    /// Write one node's flag, fire `row_selected` and update the set.
    ///
    /// Returns `false` when the value is unchanged, or when selecting a
    /// non-selectable node.
    pub(crate) fn select_row_node(
        &mut self,
        tree: &mut RowTree<T>,
        key: NodeKey,
        new_value: Option<bool>,
        source: SelectionEventSource,
    ) -> bool {
        let Some(node) = tree.get_mut(key) else {
            return false;
        };
        if !node.is_selectable() && new_value == Some(true) {
            return false;
        }
        if node.is_selected() == new_value {
            return false;
        }

        node.set_selected_flag(new_value);
        let id = node.id().map(str::to_owned);
        let is_group = node.is_group();
        let footer = node.sibling().filter(|_| !node.is_footer());
        if let Some(footer) = footer.and_then(|s| tree.get_mut(s))
            && footer.is_footer()
        {
            footer.set_selected_flag(new_value);
        }

        self.events.row_selected.emit(RowSelectedEvent {
            node: key,
            id: id.clone(),
            selected: new_value,
            source,
        });

        if let Some(id) = id
            && !(is_group && self.caps.group_selects_descendants())
        {
            if new_value == Some(true) {
                self.selected_nodes.insert(id, SelectedNode::Live(key));
            } else {
                self.selected_nodes.shift_remove(&id);
            }
        }
        true
    }

    /// Select or deselect `params.nodes`.
    ///
    /// Footer rows act on their group. Pinned rows and rows without an id are
    /// skipped with a warning, and more than one node in single selection
    /// mode rejects the whole call. While group selection is derived from
    /// descendants the value cascades to the children. Unless finish actions
    /// are suppressed, selecting with `clear_selection` (or in single mode)
    /// deselects every node not targeted by this call, group states are
    /// recomputed and one `selection_changed` fires if anything changed.
    ///
    /// Returns the number of flags that changed.
    pub fn set_nodes_selected(&mut self, tree: &mut RowTree<T>, params: SetSelectedParams) -> usize {
        let SetSelectedParams {
            nodes,
            new_value,
            clear_selection,
            suppress_finish_actions,
            source,
        } = params;

        let mut touched = HashSet::new();
        let mut updated = self.apply_selection(tree, &nodes, new_value, source, &mut touched);

        if !suppress_finish_actions {
            let clear_others = new_value && (clear_selection || !self.is_multi_select());
            if clear_others && !touched.is_empty() {
                updated += self.clear_other_nodes(tree, &touched, source);
            }
            if updated > 0 {
                self.update_groups_from_children_selections(tree, source, None);
                self.events.emit_selection_changed(source);
            }
        }
        updated
    }

    fn apply_selection(
        &mut self,
        tree: &mut RowTree<T>,
        nodes: &[NodeKey],
        new_value: bool,
        source: SelectionEventSource,
        touched: &mut HashSet<NodeKey>,
    ) -> usize {
        if nodes.is_empty() {
            return 0;
        }
        if nodes.len() > 1 && !self.is_multi_select() {
            GridError::MultiSelectNotAllowed { count: nodes.len() }.report(&self.logger);
            return 0;
        }

        let filtered = self.caps.group_selects_filtered();
        let cascade = self.caps.group_selects_descendants();
        let mut updated = 0;

        for &requested in nodes {
            let key = tree.selection_identity(requested);
            let Some(node) = tree.get(key) else {
                continue;
            };
            if node.row_pinned().is_some() {
                GridError::PinnedRowSelection.report(&self.logger);
                continue;
            }
            if node.id().is_none() {
                GridError::MissingNodeId.report(&self.logger);
                continue;
            }

            // derived afterwards in filtered mode, so not counted here
            let skip_self = filtered && node.is_group();
            let children: Vec<NodeKey> = if cascade {
                if filtered {
                    node.children_after_agg_filter().to_vec()
                } else {
                    node.children_after_group().to_vec()
                }
            } else {
                Vec::new()
            };

            if !skip_self && self.select_row_node(tree, key, Some(new_value), source) {
                updated += 1;
            }
            touched.insert(key);

            if !children.is_empty() {
                updated += self.apply_selection(tree, &children, new_value, source, touched);
            }
        }
        updated
    }

    /// Deselect every selected node not in `keep`.
    fn clear_other_nodes(
        &mut self,
        tree: &mut RowTree<T>,
        keep: &HashSet<NodeKey>,
        source: SelectionEventSource,
    ) -> usize {
        let cascade = self.caps.group_selects_descendants();
        let others: Vec<(String, SelectedNode<T>)> = self
            .selected_nodes
            .iter()
            .filter(|(_, entry)| entry.key().is_none_or(|k| !keep.contains(&k)))
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let mut groups_to_refresh = HashSet::new();
        let mut updated = 0;
        for (id, entry) in others {
            match entry {
                SelectedNode::Live(key) => {
                    let parent = tree.get(key).and_then(|n| n.parent());
                    let mut scratch = HashSet::new();
                    updated += self.apply_selection(tree, &[key], false, source, &mut scratch);
                    if cascade && let Some(parent) = parent {
                        groups_to_refresh.insert(parent);
                    }
                }
                SelectedNode::Daemon(_) => {
                    self.selected_nodes.shift_remove(&id);
                    updated += 1;
                }
            }
        }

        for group in groups_to_refresh {
            let state = self.calculate_selected_from_children(tree, group);
            self.select_row_node(tree, group, state.to_flag(), source);
        }
        updated
    }

    /// Deselect everything in the set and empty it, without events beyond
    /// `row_selected`.
    pub(crate) fn reset_nodes(&mut self, tree: &mut RowTree<T>, source: SelectionEventSource) -> usize {
        let entries = std::mem::take(&mut self.selected_nodes);
        let count = entries.len();
        for entry in entries.into_values() {
            if let SelectedNode::Live(key) = entry {
                self.select_row_node(tree, key, Some(false), source);
            }
        }
        if self.caps.group_selects_descendants() {
            self.update_groups_from_children_selections(tree, source, None);
        }
        count
    }

    /// Clear the selection and the range anchor.
    ///
    /// Fires `selection_changed` when something was selected.
    pub fn reset(&mut self, tree: &mut RowTree<T>, source: SelectionEventSource) {
        let count = self.reset_nodes(tree, source);
        self.ctx.reset();
        if count > 0 {
            self.events.emit_selection_changed(source);
        }
    }

    // =========================================================================
    // Group derivation
    // =========================================================================

    /// Fold the children's states into the state of `key`.
    ///
    /// Non-selectable children count through their own descendants and are
    /// ignored when those yield nothing. A row without children reports its
    /// own flag, or [`ChildSelection::Unresolved`] when it is not selectable.
    pub fn calculate_selected_from_children(&self, tree: &RowTree<T>, key: NodeKey) -> ChildSelection {
        let Some(node) = tree.get(key) else {
            return ChildSelection::Unresolved;
        };
        let children = if self.caps.group_selects_filtered() {
            node.children_after_agg_filter()
        } else {
            node.children_after_group()
        };

        if children.is_empty() {
            return if node.is_selectable() {
                ChildSelection::from_flag(node.is_selected())
            } else {
                ChildSelection::Unresolved
            };
        }

        let mut any_selected = false;
        let mut any_deselected = false;
        for &child_key in children {
            let Some(child) = tree.get(child_key) else {
                continue;
            };
            let state = if child.is_selectable() {
                ChildSelection::from_flag(tree.selected_state(child_key))
            } else {
                match self.calculate_selected_from_children(tree, child_key) {
                    ChildSelection::Unresolved => continue,
                    state => state,
                }
            };
            match state {
                ChildSelection::Selected => any_selected = true,
                ChildSelection::Deselected => any_deselected = true,
                _ => return ChildSelection::Indeterminate,
            }
        }

        match (any_selected, any_deselected) {
            (true, true) => ChildSelection::Indeterminate,
            (true, false) => ChildSelection::Selected,
            (false, true) => ChildSelection::Deselected,
            (false, false) if !node.is_selectable() => ChildSelection::Unresolved,
            (false, false) => ChildSelection::from_flag(node.is_selected()),
        }
    }

    /// Re-derive the state of every changed group, children first.
    ///
    /// Does nothing unless group selection is derived from descendants. An
    /// absent `changed_path` covers the whole tree. Returns whether any group
    /// flag changed.
    pub fn update_groups_from_children_selections(
        &mut self,
        tree: &mut RowTree<T>,
        source: SelectionEventSource,
        changed_path: Option<&ChangedPath>,
    ) -> bool {
        if !self.caps.group_selects_descendants() {
            return false;
        }
        let everything;
        let path = match changed_path {
            Some(path) => path,
            None => {
                everything = ChangedPath::everything();
                &everything
            }
        };

        let root = tree.root();
        let mut changed = false;
        for key in path.changed_nodes_depth_first(tree, false) {
            if key == root {
                continue;
            }
            let state = self.calculate_selected_from_children(tree, key);
            changed |= self.select_row_node(tree, key, state.to_flag(), source);
        }
        if changed {
            tracing::trace!(target: targets::SELECTION, source = %source, "group states recomputed");
        }
        changed
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Entries of the selection set, in selection order.
    pub fn get_selected_nodes(&self) -> Vec<SelectedNode<T>> {
        self.selected_nodes.values().cloned().collect()
    }

    /// Records of the selected rows, in selection order.
    pub fn get_selected_rows(&self, tree: &RowTree<T>) -> Vec<Arc<T>> {
        self.selected_nodes
            .values()
            .filter_map(|entry| match entry {
                SelectedNode::Live(key) => tree.get(*key).and_then(|n| n.data().cloned()),
                SelectedNode::Daemon(daemon) => daemon.data().cloned(),
            })
            .collect()
    }

    /// Number of entries in the selection set.
    pub fn get_selection_count(&self) -> usize {
        self.selected_nodes.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected_nodes.is_empty()
    }

    /// Whether the row with this id is in the selection set.
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_nodes.contains_key(id)
    }

    /// Selected ids in selection order, `None` when nothing is selected.
    pub fn get_selection_state(&self) -> Option<Vec<String>> {
        if self.selected_nodes.is_empty() {
            return None;
        }
        Some(self.selected_nodes.keys().cloned().collect())
    }

    /// Replace the selection with the rows whose ids are listed.
    ///
    /// Ids that match no row are ignored.
    pub fn set_selection_state(&mut self, tree: &mut RowTree<T>, ids: &[String], source: SelectionEventSource) {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let nodes: Vec<NodeKey> = tree
            .nodes_after_group()
            .into_iter()
            .filter(|&k| tree.id_of(k).is_some_and(|id| wanted.contains(id)))
            .collect();

        self.reset(tree, source);
        self.set_nodes_selected(tree, SetSelectedParams::new(nodes, true, source));
    }

    /// The top-most fully selected rows: a selected group stands for its
    /// whole subtree.
    pub fn get_best_cost_node_selection(&self, tree: &RowTree<T>) -> Vec<NodeKey> {
        fn traverse<T>(tree: &RowTree<T>, nodes: &[NodeKey], out: &mut Vec<NodeKey>) {
            for &key in nodes {
                let Some(node) = tree.get(key) else {
                    continue;
                };
                if tree.selected_state(key) == Some(true) {
                    out.push(key);
                } else if node.is_group() {
                    traverse(tree, node.children_after_group(), out);
                }
            }
        }

        let mut out = Vec::new();
        if let Some(root) = tree.get(tree.root()) {
            traverse(tree, root.children_after_group(), &mut out);
        }
        out
    }

    // =========================================================================
    // Reloads
    // =========================================================================

    /// Reconcile a node whose data (and maybe id) was replaced in place.
    ///
    /// When the id changed and the old id was selected through this node, the
    /// old entry becomes a daemon so it stays visible. The node itself is then
    /// selected exactly when its new id is in the set.
    pub fn sync_in_row_node(&mut self, tree: &mut RowTree<T>, key: NodeKey, old: Option<DaemonNode<T>>) {
        let new_id = tree.id_of(key).map(str::to_owned);

        if let Some(old) = old
            && new_id.as_deref() != Some(old.id())
            && matches!(self.selected_nodes.get(old.id()), Some(SelectedNode::Live(k)) if *k == key)
        {
            let id = old.id().to_owned();
            self.selected_nodes.insert(id, SelectedNode::Daemon(Arc::new(old)));
        }

        let selected = new_id
            .as_deref()
            .is_some_and(|id| self.selected_nodes.contains_key(id));
        if let Some(node) = tree.get_mut(key) {
            node.set_selected_flag(Some(selected));
        }
        if selected && let Some(id) = new_id {
            self.selected_nodes.insert(id, SelectedNode::Live(key));
        }
    }

    /// Drop live entries whose node left the arena.
    pub(crate) fn forget_missing(&mut self, tree: &RowTree<T>) {
        self.selected_nodes
            .retain(|_, entry| entry.key().is_none_or(|k| tree.contains(k)));
    }
}
