//! The flat leaf array and id index of the in-memory row model.
//!
//! [`NodeManager`] is the only writer of the root's `all_leaf_children`, of
//! the id map and of every leaf's `source_row_index`. It applies three kinds
//! of data change:
//!
//! - full replacement ([`set_new_row_data`](NodeManager::set_new_row_data))
//! - diffed replacement keyed by row id
//!   ([`set_immutable_row_data`](NodeManager::set_immutable_row_data))
//! - add/update/remove transactions
//!   ([`update_row_data`](NodeManager::update_row_data))
//!
//! Removed leaves are detached (id unmapped, positions cleared) but stay in
//! the arena; the row model discards them once it has regrouped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arbor_core::WarnOnce;
use arbor_core::logging::targets;
use indexmap::IndexSet;

use crate::error::GridError;
use crate::events::{GridEvents, RowDataChangeKind, RowDataUpdateStartedEvent, SelectionEventSource};
use crate::node::{DaemonNode, NodeKey, RowNode, RowTree};
use crate::options::GetRowId;
use crate::selection::{SelectionService, SetSelectedParams};
use crate::transaction::{RemovedRow, RowDataTransaction, RowDataUpdate};

/// Owner of the leaf rows of one grid.
pub struct NodeManager<T> {
    all_nodes_map: HashMap<String, NodeKey>,
    next_id: u64,
    get_row_id: Option<GetRowId<T>>,
    suppress_maintain_unsorted_order: bool,
    events: Arc<GridEvents>,
    logger: Arc<WarnOnce>,
}

impl<T> std::fmt::Debug for NodeManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeManager")
            .field("nodes", &self.all_nodes_map.len())
            .field("next_id", &self.next_id)
            .field("get_row_id", &self.get_row_id.is_some())
            .field("suppress_maintain_unsorted_order", &self.suppress_maintain_unsorted_order)
            .finish()
    }
}

impl<T> NodeManager<T> {
    /// Create a manager with no rows.
    pub fn new(
        get_row_id: Option<GetRowId<T>>,
        suppress_maintain_unsorted_order: bool,
        events: Arc<GridEvents>,
        logger: Arc<WarnOnce>,
    ) -> Self {
        Self {
            all_nodes_map: HashMap::new(),
            next_id: 0,
            get_row_id,
            suppress_maintain_unsorted_order,
            events,
            logger,
        }
    }

    /// Whether rows are keyed by the id callback.
    pub fn has_row_id_callback(&self) -> bool {
        self.get_row_id.is_some()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// The leaf with this id.
    pub fn get_row_node(&self, id: &str) -> Option<NodeKey> {
        self.all_nodes_map.get(id).copied()
    }

    /// Leaves in source order.
    pub fn all_leaf_children<'a>(&self, tree: &'a RowTree<T>) -> &'a [NodeKey] {
        tree.get(tree.root())
            .map(RowNode::all_leaf_children)
            .unwrap_or_default()
    }

    /// Number of leaves.
    pub fn leaf_count(&self, tree: &RowTree<T>) -> usize {
        self.all_leaf_children(tree).len()
    }

    /// Whether there are no leaves.
    pub fn is_empty(&self, tree: &RowTree<T>) -> bool {
        self.leaf_count(tree) == 0
    }

    /// Records of every leaf, in source order. Loading rows are skipped.
    pub fn extract_row_data(&self, tree: &RowTree<T>) -> Vec<Arc<T>> {
        self.all_leaf_children(tree)
            .iter()
            .filter_map(|&k| tree.get(k).and_then(|n| n.data().cloned()))
            .collect()
    }

    /// Find the leaf a transaction item refers to.
    ///
    /// With an id callback the item's id is looked up in the id map,
    /// otherwise the leaf holding this very record is searched for.
    fn lookup_row_node(&self, tree: &RowTree<T>, data: &Arc<T>) -> Option<NodeKey> {
        if let Some(get_row_id) = &self.get_row_id {
            let id = get_row_id(data.as_ref(), 0);
            let found = self.all_nodes_map.get(&id).copied();
            if found.is_none() {
                GridError::row_id_not_found(id).report(&self.logger);
            }
            return found;
        }

        let found = self
            .all_leaf_children(tree)
            .iter()
            .copied()
            .find(|&k| tree.get(k).is_some_and(|n| n.holds_data(data)));
        if found.is_none() {
            GridError::RowDataNotFound.report(&self.logger);
        }
        found
    }

    // =========================================================================
    // Node creation
    // =========================================================================

    fn resolve_id(&mut self, data: &T) -> String {
        let id = match &self.get_row_id {
            Some(get_row_id) => get_row_id(data, 0),
            None => self.next_id.to_string(),
        };
        self.next_id += 1;
        id
    }

    fn create_node(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        data: Arc<T>,
        source_row_index: usize,
    ) -> NodeKey {
        let id = self.resolve_id(&data);
        let mut node = RowNode::leaf(Some(id.clone()), Some(data), source_row_index);
        node.set_parent(Some(tree.root()));
        let key = tree.insert(node);

        if let Some(previous) = self.all_nodes_map.insert(id.clone(), key)
            && tree.contains(previous)
        {
            GridError::duplicate_row_id(id).report(&self.logger);
        }
        selection.update_row_selectable(tree, key, true);
        key
    }

    fn set_leaves(&self, tree: &mut RowTree<T>, leaves: Vec<NodeKey>) {
        for (index, &key) in leaves.iter().enumerate() {
            if let Some(node) = tree.get_mut(key) {
                node.set_source_row_index(Some(index));
            }
        }
        let root = tree.root();
        if let Some(root) = tree.get_mut(root) {
            root.all_leaf_children = leaves;
        }
        self.sync_root_sibling(tree);
    }

    fn detach(&mut self, tree: &mut RowTree<T>, key: NodeKey) {
        let Some(node) = tree.get_mut(key) else {
            return;
        };
        node.clear_row_top_and_row_index();
        node.set_source_row_index(None);
        if let Some(id) = node.id()
            && self.all_nodes_map.get(id) == Some(&key)
        {
            self.all_nodes_map.remove(id);
        }
    }

    /// Mirror the root's arrays onto its footer sibling.
    pub(crate) fn sync_root_sibling(&self, tree: &mut RowTree<T>) {
        let root_key = tree.root();
        let Some(root) = tree.get(root_key) else {
            return;
        };
        let Some(sibling) = root.sibling() else {
            return;
        };
        let all_leaf_children = root.all_leaf_children.clone();
        let after_group = root.children_after_group.clone();
        let after_filter = root.children_after_filter.clone();
        let after_agg_filter = root.children_after_agg_filter.clone();
        let after_sort = root.children_after_sort.clone();
        if let Some(footer) = tree.get_mut(sibling) {
            footer.all_leaf_children = all_leaf_children;
            footer.children_after_group = after_group;
            footer.children_after_filter = after_filter;
            footer.children_after_agg_filter = after_agg_filter;
            footer.children_after_sort = after_sort;
        }
    }

    // =========================================================================
    // Full replacement
    // =========================================================================

    /// Replace every leaf with one new leaf per record.
    ///
    /// The old leaves are discarded from the arena; the caller clears their
    /// selection first.
    #[tracing::instrument(skip_all, target = "arbor_grid::node_manager", level = "debug", fields(rows = rows.len()))]
    pub fn set_new_row_data(&mut self, tree: &mut RowTree<T>, selection: &mut SelectionService<T>, rows: Vec<Arc<T>>) {
        self.events.row_data_update_started.emit(RowDataUpdateStartedEvent {
            kind: RowDataChangeKind::NewData,
            row_count: rows.len(),
        });

        let root_key = tree.root();
        let old = match tree.get_mut(root_key) {
            Some(root) => {
                root.children_after_group.clear();
                root.children_after_filter.clear();
                root.children_after_agg_filter.clear();
                root.children_after_sort.clear();
                std::mem::take(&mut root.all_leaf_children)
            }
            None => Vec::new(),
        };
        for key in old {
            tree.discard(key);
        }
        self.all_nodes_map.clear();
        self.next_id = 0;

        let leaves: Vec<NodeKey> = rows
            .into_iter()
            .enumerate()
            .map(|(index, data)| self.create_node(tree, selection, data, index))
            .collect();
        self.set_leaves(tree, leaves);
    }

    // =========================================================================
    // Immutable replacement
    // =========================================================================

    /// Replace the data set, keeping every leaf whose id is still present.
    ///
    /// Returns `None` without touching anything when no id callback is
    /// configured. Leaves whose id is gone are detached, and the selected
    /// ones among them are deselected in one batch. Group states are left to
    /// the caller.
    #[tracing::instrument(skip_all, target = "arbor_grid::node_manager", level = "debug", fields(rows = rows.len()))]
    pub fn set_immutable_row_data(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        rows: Vec<Arc<T>>,
    ) -> Option<RowDataUpdate<T>> {
        let Some(get_row_id) = self.get_row_id.clone() else {
            GridError::missing_row_id_callback("set_immutable_row_data").report(&self.logger);
            return None;
        };

        self.events.row_data_update_started.emit(RowDataUpdateStartedEvent {
            kind: RowDataChangeKind::Immutable,
            row_count: rows.len(),
        });

        let reorder = !self.suppress_maintain_unsorted_order;
        let old_leaves = self.all_leaf_children(tree).to_vec();
        let mut update = RowDataUpdate::default();
        let mut processed: IndexSet<NodeKey> = IndexSet::with_capacity(rows.len());
        let mut created: HashSet<NodeKey> = HashSet::new();
        let mut prev_index: Option<usize> = None;
        let mut order_changed = false;

        for data in rows {
            let id = get_row_id(data.as_ref(), 0);
            let existing = self.all_nodes_map.get(&id).copied().filter(|&k| tree.contains(k));

            let key = match existing {
                Some(key) if created.contains(&key) => {
                    if let Some(node) = tree.get_mut(key)
                        && !node.holds_data(&data)
                    {
                        node.update_data(data);
                    }
                    key
                }
                Some(key) => {
                    if reorder && let Some(old_index) = tree.get(key).and_then(RowNode::source_row_index) {
                        order_changed |= prev_index.is_some_and(|prev| old_index <= prev) || !created.is_empty();
                        prev_index = Some(old_index);
                    }
                    if let Some(node) = tree.get_mut(key)
                        && !node.holds_data(&data)
                    {
                        node.update_data(data);
                        update.changed.update(key);
                        update.transaction.update.push(key);
                    }
                    key
                }
                None => {
                    let key = self.create_node(tree, selection, data, usize::MAX);
                    created.insert(key);
                    update.changed.add(key);
                    update.transaction.add.push(key);
                    key
                }
            };
            processed.insert(key);
        }

        let mut to_deselect = Vec::new();
        for &key in &old_leaves {
            if processed.contains(&key) {
                continue;
            }
            if let Some(node) = tree.get(key) {
                if node.is_selected() == Some(true) {
                    to_deselect.push(key);
                }
                update.transaction.remove.push(RemovedRow {
                    id: node.id().map(str::to_owned),
                    data: node.data().cloned(),
                });
            }
            self.detach(tree, key);
            update.changed.remove(key);
        }

        let leaves: Vec<NodeKey> = if order_changed {
            processed.into_iter().collect()
        } else {
            old_leaves
                .iter()
                .copied()
                .filter(|k| processed.contains(k))
                .chain(processed.iter().copied().filter(|k| created.contains(k)))
                .collect()
        };
        update.changed.rows_order_changed = order_changed;
        self.set_leaves(tree, leaves);

        tracing::debug!(
            target: targets::NODE_MANAGER,
            added = created.len(),
            removed = update.transaction.remove.len(),
            order_changed,
            "immutable row data applied"
        );

        if !to_deselect.is_empty() {
            let source = SelectionEventSource::RowDataChanged;
            let count = selection.set_nodes_selected(
                tree,
                SetSelectedParams::new(to_deselect, false, source).suppress_finish_actions(true),
            );
            if count > 0 {
                self.events.emit_selection_changed(source);
            }
        }
        Some(update)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Apply `transaction`: removes, then updates, then adds.
    ///
    /// Items that match no row are reported and skipped. Rows removed or made
    /// unselectable while selected are deselected in one batch at the end,
    /// followed by one group-state recompute.
    #[tracing::instrument(skip_all, target = "arbor_grid::node_manager", level = "debug")]
    pub fn update_row_data(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        transaction: RowDataTransaction<T>,
    ) -> RowDataUpdate<T> {
        self.events.row_data_update_started.emit(RowDataUpdateStartedEvent {
            kind: RowDataChangeKind::Transaction,
            row_count: transaction.len(),
        });

        let mut update = RowDataUpdate::default();
        let mut to_deselect = Vec::new();

        self.execute_remove(tree, &transaction.remove, &mut update, &mut to_deselect);
        self.execute_update(tree, selection, &transaction.update, &mut update, &mut to_deselect);
        self.execute_add(tree, selection, &transaction.add, transaction.add_index, &mut update);

        let source = SelectionEventSource::RowDataChanged;
        let count = if to_deselect.is_empty() {
            0
        } else {
            selection.set_nodes_selected(
                tree,
                SetSelectedParams::new(to_deselect, false, source).suppress_finish_actions(true),
            )
        };
        selection.update_groups_from_children_selections(tree, source, None);
        if count > 0 {
            self.events.emit_selection_changed(source);
        }
        update
    }

    fn execute_remove(
        &mut self,
        tree: &mut RowTree<T>,
        items: &[Arc<T>],
        update: &mut RowDataUpdate<T>,
        to_deselect: &mut Vec<NodeKey>,
    ) {
        let mut removed = HashSet::new();
        for item in items {
            let Some(key) = self.lookup_row_node(tree, item) else {
                continue;
            };
            if !removed.insert(key) {
                continue;
            }
            if let Some(node) = tree.get(key) {
                if node.is_selected() == Some(true) {
                    to_deselect.push(key);
                }
                update.transaction.remove.push(RemovedRow {
                    id: node.id().map(str::to_owned),
                    data: node.data().cloned(),
                });
            }
            self.detach(tree, key);
            update.changed.remove(key);
        }
        if removed.is_empty() {
            return;
        }

        let leaves: Vec<NodeKey> = self
            .all_leaf_children(tree)
            .iter()
            .copied()
            .filter(|k| !removed.contains(k))
            .collect();
        self.set_leaves(tree, leaves);
    }

    fn execute_update(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        items: &[Arc<T>],
        update: &mut RowDataUpdate<T>,
        to_deselect: &mut Vec<NodeKey>,
    ) {
        for item in items {
            let Some(key) = self.lookup_row_node(tree, item) else {
                continue;
            };
            if let Some(node) = tree.get_mut(key) {
                node.update_data(item.clone());
            }
            let selectable = selection.update_row_selectable(tree, key, true);
            if !selectable
                && tree.get(key).is_some_and(|n| n.is_selected() == Some(true))
                && !to_deselect.contains(&key)
            {
                to_deselect.push(key);
            }
            update.changed.update(key);
            update.transaction.update.push(key);
        }
    }

    fn execute_add(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        items: &[Arc<T>],
        add_index: Option<f64>,
        update: &mut RowDataUpdate<T>,
    ) {
        if items.is_empty() {
            return;
        }
        let mut leaves = self.all_leaf_children(tree).to_vec();
        let index = sanitize_add_index(add_index, leaves.len());

        let new_keys: Vec<NodeKey> = items
            .iter()
            .enumerate()
            .map(|(offset, data)| self.create_node(tree, selection, data.clone(), index + offset))
            .collect();

        if index < leaves.len() {
            update.changed.rows_inserted = true;
        }
        leaves.splice(index..index, new_keys.iter().copied());
        self.set_leaves(tree, leaves);

        for key in new_keys {
            update.changed.add(key);
            update.transaction.add.push(key);
        }
    }

    // =========================================================================
    // Loading rows
    // =========================================================================

    /// Append `count` placeholder leaves with no id and no data.
    pub fn add_loading_rows(&mut self, tree: &mut RowTree<T>, count: usize) -> Vec<NodeKey> {
        let mut leaves = self.all_leaf_children(tree).to_vec();
        let start = leaves.len();
        let root = tree.root();
        let keys: Vec<NodeKey> = (0..count)
            .map(|offset| {
                let mut node = RowNode::leaf(None, None, start + offset);
                node.set_parent(Some(root));
                tree.insert(node)
            })
            .collect();
        leaves.extend(keys.iter().copied());
        self.set_leaves(tree, leaves);
        keys
    }

    /// Fill a leaf in place with its record and id.
    ///
    /// When this changes the id of a selected row, the old id stays in the
    /// selection as a daemon. The id comes from the callback when one is
    /// configured, otherwise `id` is used, falling back to the counter.
    pub fn set_data_and_id(
        &mut self,
        tree: &mut RowTree<T>,
        selection: &mut SelectionService<T>,
        key: NodeKey,
        data: Arc<T>,
        id: Option<String>,
    ) {
        let Some(node) = tree.get(key) else {
            return;
        };
        let old = DaemonNode::snapshot(node);
        let new_id = if let Some(get_row_id) = &self.get_row_id {
            get_row_id(data.as_ref(), 0)
        } else if let Some(id) = id {
            id
        } else {
            self.resolve_id(&data)
        };

        if let Some(old_id) = old.as_ref().map(DaemonNode::id)
            && self.all_nodes_map.get(old_id) == Some(&key)
        {
            self.all_nodes_map.remove(old_id);
        }
        if let Some(node) = tree.get_mut(key) {
            node.set_id(Some(new_id.clone()));
            node.update_data(data);
        }
        self.all_nodes_map.insert(new_id, key);

        selection.update_row_selectable(tree, key, true);
        selection.sync_in_row_node(tree, key, old);
    }
}

/// Where added rows go: fractional indexes round up, anything outside
/// `0..len` appends.
fn sanitize_add_index(add_index: Option<f64>, len: usize) -> usize {
    match add_index {
        Some(index) if index.is_finite() && index >= 0.0 && index < len as f64 => (index.ceil() as usize).min(len),
        _ => len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RowSelectionOptions;
    use crate::selection::SelectionCapabilities;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: u32,
        name: &'static str,
    }

    fn row(id: u32, name: &'static str) -> Arc<Row> {
        Arc::new(Row { id, name })
    }

    fn setup(with_ids: bool) -> (NodeManager<Row>, RowTree<Row>, SelectionService<Row>, Arc<WarnOnce>) {
        let events = Arc::new(GridEvents::new());
        let logger = Arc::new(WarnOnce::new());
        let get_row_id: Option<GetRowId<Row>> = if with_ids {
            Some(Arc::new(|r: &Row, _: i32| r.id.to_string()))
        } else {
            None
        };
        let manager = NodeManager::new(get_row_id, false, events.clone(), logger.clone());
        let caps = SelectionCapabilities::new(Some(RowSelectionOptions::multi_row()), None);
        let selection = SelectionService::new(caps, events, logger.clone());
        (manager, RowTree::new(), selection, logger)
    }

    fn ids(manager: &NodeManager<Row>, tree: &RowTree<Row>) -> Vec<String> {
        manager
            .all_leaf_children(tree)
            .iter()
            .map(|&k| tree.id_of(k).unwrap().to_owned())
            .collect()
    }

    fn source_indexes(manager: &NodeManager<Row>, tree: &RowTree<Row>) -> Vec<usize> {
        manager
            .all_leaf_children(tree)
            .iter()
            .map(|&k| tree.get(k).unwrap().source_row_index().unwrap())
            .collect()
    }

    #[test]
    fn test_sanitize_add_index() {
        assert_eq!(sanitize_add_index(None, 4), 4);
        assert_eq!(sanitize_add_index(Some(-1.0), 4), 4);
        assert_eq!(sanitize_add_index(Some(f64::NAN), 4), 4);
        assert_eq!(sanitize_add_index(Some(4.0), 4), 4);
        assert_eq!(sanitize_add_index(Some(1.2), 4), 2);
        assert_eq!(sanitize_add_index(Some(0.0), 4), 0);
        assert_eq!(sanitize_add_index(Some(3.5), 4), 4);
    }

    #[test]
    fn test_new_row_data_uses_counter_ids() {
        let (mut manager, mut tree, mut selection, _) = setup(false);
        manager.set_new_row_data(&mut tree, &mut selection, vec![row(7, "a"), row(8, "b")]);
        assert_eq!(ids(&manager, &tree), vec!["0", "1"]);
        assert_eq!(source_indexes(&manager, &tree), vec![0, 1]);

        manager.set_new_row_data(&mut tree, &mut selection, vec![row(9, "c")]);
        assert_eq!(ids(&manager, &tree), vec!["0"]);
        // root plus one leaf
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_duplicate_ids_warn_and_last_wins() {
        let (mut manager, mut tree, mut selection, logger) = setup(true);
        manager.set_new_row_data(&mut tree, &mut selection, vec![row(1, "a"), row(1, "b")]);

        assert!(logger.has_warned("duplicate-row-id:1"));
        let key = manager.get_row_node("1").unwrap();
        assert_eq!(tree.get(key).unwrap().data().unwrap().name, "b");
        assert_eq!(manager.leaf_count(&tree), 2);
    }

    #[test]
    fn test_immutable_requires_row_id_callback() {
        let (mut manager, mut tree, mut selection, logger) = setup(false);
        assert!(manager.set_immutable_row_data(&mut tree, &mut selection, vec![row(1, "a")]).is_none());
        assert!(logger.has_warned("missing-row-id-callback:set_immutable_row_data"));
    }

    #[test]
    fn test_immutable_reorder_follows_input() {
        let (mut manager, mut tree, mut selection, _) = setup(true);
        let a = row(1, "a");
        let b = row(2, "b");
        let c = row(3, "c");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone(), b.clone(), c.clone()]);

        let update = manager
            .set_immutable_row_data(&mut tree, &mut selection, vec![c, a, b])
            .unwrap();
        assert!(update.order_changed());
        assert_eq!(ids(&manager, &tree), vec!["3", "1", "2"]);
        assert_eq!(source_indexes(&manager, &tree), vec![0, 1, 2]);
        assert_eq!(update.changed.updated().count(), 0);
    }

    #[test]
    fn test_immutable_insert_before_retained_rows_changes_order() {
        let (mut manager, mut tree, mut selection, _) = setup(true);
        let a = row(1, "a");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone()]);

        let update = manager
            .set_immutable_row_data(&mut tree, &mut selection, vec![row(5, "new"), a])
            .unwrap();
        assert!(update.order_changed());
        assert_eq!(ids(&manager, &tree), vec!["5", "1"]);
    }

    #[test]
    fn test_immutable_suppressed_order_appends_new_rows() {
        let events = Arc::new(GridEvents::new());
        let logger = Arc::new(WarnOnce::new());
        let mut manager = NodeManager::new(
            Some(Arc::new(|r: &Row, _: i32| r.id.to_string()) as GetRowId<Row>),
            true,
            events.clone(),
            logger.clone(),
        );
        let caps = SelectionCapabilities::new(Some(RowSelectionOptions::multi_row()), None);
        let mut selection = SelectionService::new(caps, events, logger);
        let mut tree = RowTree::new();
        let a = row(1, "a");
        let b = row(2, "b");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone(), b.clone()]);

        let update = manager
            .set_immutable_row_data(&mut tree, &mut selection, vec![row(9, "new"), b, a])
            .unwrap();
        assert!(!update.order_changed());
        assert_eq!(ids(&manager, &tree), vec!["1", "2", "9"]);
        assert_eq!(source_indexes(&manager, &tree), vec![0, 1, 2]);
    }

    #[test]
    fn test_immutable_update_and_remove() {
        let (mut manager, mut tree, mut selection, _) = setup(true);
        let a = row(1, "a");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone(), row(2, "b")]);

        let update = manager
            .set_immutable_row_data(&mut tree, &mut selection, vec![a, row(2, "b2")])
            .unwrap();
        assert_eq!(update.transaction.update.len(), 1);
        assert!(update.transaction.add.is_empty());

        let update = manager
            .set_immutable_row_data(&mut tree, &mut selection, vec![row(2, "b3")])
            .unwrap();
        assert_eq!(update.transaction.remove.len(), 1);
        assert_eq!(update.transaction.remove[0].id.as_deref(), Some("1"));
        assert!(manager.get_row_node("1").is_none());
        assert_eq!(ids(&manager, &tree), vec!["2"]);
    }

    #[test]
    fn test_transaction_phases_and_add_index() {
        let (mut manager, mut tree, mut selection, _) = setup(true);
        let rows = vec![row(1, "a"), row(2, "b"), row(3, "c")];
        manager.set_new_row_data(&mut tree, &mut selection, rows);

        let tx = RowDataTransaction::new()
            .with_remove([row(2, "ignored")])
            .with_update([row(3, "c2")])
            .with_add([row(4, "d")])
            .with_add_index(0.5);
        let update = manager.update_row_data(&mut tree, &mut selection, tx);

        assert_eq!(ids(&manager, &tree), vec!["1", "4", "3"]);
        assert_eq!(source_indexes(&manager, &tree), vec![0, 1, 2]);
        assert!(update.changed.rows_inserted);
        assert_eq!(update.transaction.add.len(), 1);
        assert_eq!(update.transaction.update.len(), 1);
        assert_eq!(update.transaction.remove.len(), 1);
    }

    #[test]
    fn test_transaction_without_ids_matches_by_identity() {
        let (mut manager, mut tree, mut selection, logger) = setup(false);
        let a = row(1, "a");
        let b = row(2, "b");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone(), b]);

        let tx = RowDataTransaction::new().with_remove([row(1, "a"), a]);
        let update = manager.update_row_data(&mut tree, &mut selection, tx);

        assert!(logger.has_warned("row-data-not-found"));
        assert_eq!(update.transaction.remove.len(), 1);
        assert_eq!(ids(&manager, &tree), vec!["1"]);
        assert_eq!(source_indexes(&manager, &tree), vec![0]);
    }

    #[test]
    fn test_unknown_id_is_skipped() {
        let (mut manager, mut tree, mut selection, logger) = setup(true);
        manager.set_new_row_data(&mut tree, &mut selection, vec![row(1, "a")]);

        let tx = RowDataTransaction::new()
            .with_update([row(42, "nope")])
            .with_add([row(2, "b")]);
        let update = manager.update_row_data(&mut tree, &mut selection, tx);

        assert!(logger.has_warned("row-id-not-found:42"));
        assert_eq!(update.transaction.add.len(), 1);
        assert!(!update.changed.rows_inserted);
        assert_eq!(ids(&manager, &tree), vec!["1", "2"]);
    }

    #[test]
    fn test_extract_row_data_skips_loading_rows() {
        let (mut manager, mut tree, mut selection, _) = setup(false);
        let a = row(1, "a");
        manager.set_new_row_data(&mut tree, &mut selection, vec![a.clone()]);
        let loading = manager.add_loading_rows(&mut tree, 2);

        assert_eq!(manager.leaf_count(&tree), 3);
        assert!(tree.get(loading[0]).unwrap().id().is_none());
        let data = manager.extract_row_data(&tree);
        assert_eq!(data.len(), 1);
        assert!(Arc::ptr_eq(&data[0], &a));

        manager.set_data_and_id(&mut tree, &mut selection, loading[1], row(2, "b"), Some("late".into()));
        assert_eq!(manager.get_row_node("late"), Some(loading[1]));
        assert_eq!(manager.extract_row_data(&tree).len(), 2);
    }
}
