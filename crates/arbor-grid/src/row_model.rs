//! The in-memory row model.
//!
//! [`ClientSideRowModel`] owns the arena and the [`NodeManager`], and after
//! every data change runs a small pipeline over the tree:
//!
//! 1. grouping: leaves are bucketed by the group key callback under reused
//!    group rows
//! 2. footers: group and grand total footers are added or dropped
//! 3. filter: `children_after_filter` and friends are rebuilt
//! 4. selection: selectability and derived group states are refreshed
//!    through a [`ChangedPath`]
//! 5. display: the expanded tree is flattened and paginated
//!
//! The selection engine is passed into every mutating call rather than owned
//! here, so both can borrow the tree independently.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use arbor_core::logging::{span_names, targets};
use arbor_core::{PerfSpan, WarnOnce};
use indexmap::IndexMap;

use crate::changed_path::ChangedPath;
use crate::error::GridError;
use crate::events::{
    AsyncTransactionsFlushedEvent, GridEvents, ModelUpdatedEvent, PaginationChangedEvent, RowDataChangeKind,
    RowDataUpdatedEvent, SelectionEventSource,
};
use crate::node::{FOOTER_ID_PREFIX, GROUP_ID_PREFIX, NodeKey, ROOT_NODE_ID, RowNode, RowPinned, RowTree};
use crate::node_manager::NodeManager;
use crate::options::{GridCallbacks, GridOptions, GroupKeyFn, GroupingOptions, RowFilter};
use crate::range_selection::RowRangeSource;
use crate::selection::SelectionService;
use crate::transaction::{ChangedRowNodes, RowDataTransaction, RowDataUpdate, RowNodeTransaction};

/// What the selection engine needs from the active row model.
pub trait RowModel<T>: RowRangeSource {
    /// The arena holding every row.
    fn tree(&self) -> &RowTree<T>;

    /// Mutable access to the arena.
    fn tree_mut(&mut self) -> &mut RowTree<T>;

    /// The first displayed row.
    fn first_displayed_row(&self) -> Option<NodeKey>;

    /// Displayed rows of the current page, in display order.
    fn nodes_on_page(&self) -> Vec<NodeKey>;
}

/// Which rows a refresh has to revisit.
enum Changes<'a> {
    Everything,
    Rows(&'a ChangedRowNodes),
}

/// Row model for data held entirely in memory.
pub struct ClientSideRowModel<T> {
    tree: RowTree<T>,
    nodes: NodeManager<T>,
    grouping: GroupingOptions,
    group_key: Option<GroupKeyFn<T>>,
    filter: Option<RowFilter<T>>,
    groups: IndexMap<String, NodeKey>,
    group_selects_descendants: bool,
    displayed: Vec<NodeKey>,
    page_size: Option<usize>,
    current_page: usize,
    pinned_top: Vec<NodeKey>,
    pinned_bottom: Vec<NodeKey>,
    async_queue: VecDeque<RowDataTransaction<T>>,
    events: Arc<GridEvents>,
    logger: Arc<WarnOnce>,
}

impl<T> std::fmt::Debug for ClientSideRowModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSideRowModel")
            .field("nodes", &self.nodes)
            .field("groups", &self.groups.len())
            .field("displayed", &self.displayed.len())
            .field("page_size", &self.page_size)
            .field("current_page", &self.current_page)
            .field("async_queue", &self.async_queue.len())
            .finish_non_exhaustive()
    }
}

impl<T> ClientSideRowModel<T> {
    /// Create an empty model.
    pub fn new(
        options: &GridOptions,
        callbacks: &GridCallbacks<T>,
        events: Arc<GridEvents>,
        logger: Arc<WarnOnce>,
    ) -> Self {
        let nodes = NodeManager::new(
            callbacks.get_row_id.clone(),
            options.suppress_maintain_unsorted_order,
            events.clone(),
            logger.clone(),
        );
        Self {
            tree: RowTree::new(),
            nodes,
            grouping: options.grouping.clone(),
            group_key: callbacks.group_key.clone(),
            filter: None,
            groups: IndexMap::new(),
            group_selects_descendants: options
                .row_selection
                .as_ref()
                .is_some_and(|s| s.group_selects.selects_children()),
            displayed: Vec::new(),
            page_size: options.pagination.map(|p| p.page_size),
            current_page: 0,
            pinned_top: Vec::new(),
            pinned_bottom: Vec::new(),
            async_queue: VecDeque::new(),
            events,
            logger,
        }
    }

    /// The leaf manager.
    pub fn nodes(&self) -> &NodeManager<T> {
        &self.nodes
    }

    pub(crate) fn set_group_selects_descendants(&mut self, enabled: bool) {
        self.group_selects_descendants = enabled;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Displayed rows across all pages, in display order.
    pub fn displayed_rows(&self) -> &[NodeKey] {
        &self.displayed
    }

    /// Number of displayed rows across all pages.
    pub fn row_count(&self) -> usize {
        self.displayed.len()
    }

    /// The displayed row at `index`.
    pub fn get_row(&self, index: usize) -> Option<NodeKey> {
        self.displayed.get(index).copied()
    }

    /// Any row by id: leaves, groups, footers, pinned rows and the root.
    pub fn get_row_node(&self, id: &str) -> Option<NodeKey> {
        if id == ROOT_NODE_ID {
            return Some(self.tree.root());
        }
        if let Some(key) = self.nodes.get_row_node(id) {
            return Some(key);
        }
        if let Some(&key) = self.groups.get(id) {
            return Some(key);
        }
        if let Some(owner) = id.strip_prefix(FOOTER_ID_PREFIX) {
            return self
                .get_row_node(owner)
                .and_then(|k| self.tree.get(k))
                .and_then(RowNode::sibling);
        }
        self.pinned_top
            .iter()
            .chain(&self.pinned_bottom)
            .copied()
            .find(|&k| self.tree.id_of(k) == Some(id))
    }

    /// The group row for a group value, if grouping produced one.
    pub fn get_group_node(&self, value: &str) -> Option<NodeKey> {
        let id = format!("{GROUP_ID_PREFIX}{}-{value}", self.grouping.field);
        self.groups.get(&id).copied()
    }

    /// Group rows in display order of first appearance.
    pub fn group_nodes(&self) -> Vec<NodeKey> {
        self.groups.values().copied().collect()
    }

    /// Visit every grouped row, parents before children.
    pub fn for_each_node(&self, mut callback: impl FnMut(NodeKey, &RowNode<T>)) {
        for key in self.tree.nodes_after_group() {
            if let Some(node) = self.tree.get(key) {
                callback(key, node);
            }
        }
    }

    /// Visit every row that passes the filter, parents before children.
    pub fn for_each_node_after_filter(&self, mut callback: impl FnMut(NodeKey, &RowNode<T>)) {
        for key in self.tree.nodes_after_filter() {
            if let Some(node) = self.tree.get(key) {
                callback(key, node);
            }
        }
    }

    /// Records of every leaf, in source order.
    pub fn extract_row_data(&self) -> Vec<Arc<T>> {
        self.nodes.extract_row_data(&self.tree)
    }

    /// Leaves in source order.
    pub fn all_leaf_children(&self) -> &[NodeKey] {
        self.nodes.all_leaf_children(&self.tree)
    }

    // =========================================================================
    // Data changes
    // =========================================================================

    /// Replace all row data. The selection is cleared first.
    pub fn set_row_data(&mut self, selection: &mut SelectionService<T>, rows: Vec<Arc<T>>) {
        let _perf = PerfSpan::new(span_names::SET_ROW_DATA);
        selection.reset(&mut self.tree, SelectionEventSource::RowDataChanged);
        let removed = self.nodes.leaf_count(&self.tree);

        self.nodes.set_new_row_data(&mut self.tree, selection, rows);
        self.refresh(selection, Changes::Everything, true);

        self.events.row_data_updated.emit(RowDataUpdatedEvent {
            kind: RowDataChangeKind::NewData,
            added: self.nodes.leaf_count(&self.tree),
            updated: 0,
            removed,
            order_changed: false,
        });
    }

    /// Replace all row data, keeping rows whose id is still present.
    ///
    /// Without a row id callback this warns and falls back to
    /// [`set_row_data`](Self::set_row_data), returning `None`. When nothing
    /// changed the pipeline is not re-run.
    pub fn set_immutable_row_data(
        &mut self,
        selection: &mut SelectionService<T>,
        rows: Vec<Arc<T>>,
    ) -> Option<RowNodeTransaction<T>> {
        if !self.nodes.has_row_id_callback() {
            GridError::missing_row_id_callback("set_immutable_row_data").report(&self.logger);
            self.set_row_data(selection, rows);
            return None;
        }

        let _perf = PerfSpan::new(span_names::SET_IMMUTABLE_ROW_DATA);
        let update = self.nodes.set_immutable_row_data(&mut self.tree, selection, rows)?;
        if !update.changed.is_empty() {
            self.discard_leaves(update.changed.removed().collect());
            self.refresh(selection, Changes::Rows(&update.changed), false);
        }
        self.emit_row_data_updated(RowDataChangeKind::Immutable, &update);
        Some(update.transaction)
    }

    /// Apply one transaction and refresh.
    pub fn apply_transaction(
        &mut self,
        selection: &mut SelectionService<T>,
        transaction: RowDataTransaction<T>,
    ) -> RowNodeTransaction<T> {
        let _perf = PerfSpan::new(span_names::TRANSACTION);
        let update = self.nodes.update_row_data(&mut self.tree, selection, transaction);
        if !update.changed.is_empty() {
            self.discard_leaves(update.changed.removed().collect());
            self.refresh(selection, Changes::Rows(&update.changed), false);
        }
        self.emit_row_data_updated(RowDataChangeKind::Transaction, &update);
        update.transaction
    }

    /// Queue a transaction for the next
    /// [`flush_async_transactions`](Self::flush_async_transactions).
    pub fn apply_transaction_async(&mut self, transaction: RowDataTransaction<T>) {
        self.async_queue.push_back(transaction);
        tracing::trace!(target: targets::ROW_MODEL, queued = self.async_queue.len(), "transaction queued");
    }

    /// Number of queued transactions.
    pub fn pending_async_transactions(&self) -> usize {
        self.async_queue.len()
    }

    /// Apply every queued transaction in call order, then refresh once.
    ///
    /// Returns one result per transaction.
    pub fn flush_async_transactions(&mut self, selection: &mut SelectionService<T>) -> Vec<RowNodeTransaction<T>> {
        if self.async_queue.is_empty() {
            return Vec::new();
        }
        let _perf = PerfSpan::new(span_names::TRANSACTION);

        let mut batch = RowDataUpdate::default();
        let mut removed = Vec::new();
        let mut results = Vec::with_capacity(self.async_queue.len());
        while let Some(transaction) = self.async_queue.pop_front() {
            let update = self.nodes.update_row_data(&mut self.tree, selection, transaction);
            removed.extend(update.changed.removed());
            batch.transaction.add.extend(update.transaction.add.iter().copied());
            batch.transaction.update.extend(update.transaction.update.iter().copied());
            batch.transaction.remove.extend(update.transaction.remove.iter().cloned());
            batch.changed.merge(update.changed);
            results.push(update.transaction);
        }

        self.discard_leaves(removed);
        self.refresh(selection, Changes::Rows(&batch.changed), false);
        self.emit_row_data_updated(RowDataChangeKind::AsyncBatch, &batch);
        self.events
            .async_transactions_flushed
            .emit(AsyncTransactionsFlushedEvent {
                transactions: results.len(),
            });
        results
    }

    /// Append placeholder rows that have no id or data yet.
    pub fn add_loading_rows(&mut self, selection: &mut SelectionService<T>, count: usize) -> Vec<NodeKey> {
        let keys = self.nodes.add_loading_rows(&mut self.tree, count);
        let mut changed = ChangedRowNodes::new();
        for &key in &keys {
            changed.add(key);
        }
        self.refresh(selection, Changes::Rows(&changed), false);
        keys
    }

    /// Fill a row in place with its data and id.
    ///
    /// When the id of a selected row changes, the old id stays in the
    /// selection as a daemon.
    pub fn load_row(&mut self, selection: &mut SelectionService<T>, key: NodeKey, data: Arc<T>, id: Option<String>) {
        self.nodes.set_data_and_id(&mut self.tree, selection, key, data, id);
        let mut changed = ChangedRowNodes::new();
        changed.update(key);
        self.refresh(selection, Changes::Rows(&changed), false);
    }

    fn emit_row_data_updated(&self, kind: RowDataChangeKind, update: &RowDataUpdate<T>) {
        self.events.row_data_updated.emit(RowDataUpdatedEvent {
            kind,
            added: update.transaction.add.len(),
            updated: update.transaction.update.len(),
            removed: update.transaction.remove.len(),
            order_changed: update.order_changed(),
        });
    }

    fn discard_leaves(&mut self, keys: Vec<NodeKey>) {
        for key in keys {
            self.tree.discard(key);
        }
    }

    // =========================================================================
    // Pipeline settings
    // =========================================================================

    /// Keep only leaves the predicate accepts; `None` shows everything.
    pub fn set_filter(&mut self, selection: &mut SelectionService<T>, filter: Option<RowFilter<T>>) {
        self.filter = filter;
        self.refresh(selection, Changes::Everything, false);
    }

    /// Group leaves by `group_key`; `None` removes grouping.
    pub fn set_group_key(&mut self, selection: &mut SelectionService<T>, group_key: Option<GroupKeyFn<T>>) {
        self.group_key = group_key;
        self.refresh(selection, Changes::Everything, false);
    }

    /// Expand or collapse a group row.
    pub fn set_expanded(&mut self, key: NodeKey, expanded: bool) {
        let Some(node) = self.tree.get_mut(key) else {
            return;
        };
        if !node.is_group() || node.is_expanded() == expanded {
            return;
        }
        node.set_expanded(expanded);
        self.update_displayed();
        self.update_pagination(false);
        self.events.model_updated.emit(ModelUpdatedEvent {
            new_data: false,
            new_page: false,
        });
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Rows per page; `None` shows all rows on one page.
    pub fn set_page_size(&mut self, page_size: Option<usize>) {
        self.page_size = page_size.filter(|&size| size > 0);
        self.update_pagination(false);
    }

    /// Rows per page, if paginated.
    pub fn page_size(&self) -> Option<usize> {
        self.page_size
    }

    /// Zero-based index of the current page.
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Number of pages, at least one.
    pub fn total_pages(&self) -> usize {
        match self.page_size {
            Some(size) => self.displayed.len().div_ceil(size).max(1),
            None => 1,
        }
    }

    /// Go to `page`, clamped to the last page.
    pub fn go_to_page(&mut self, page: usize) {
        let page = page.min(self.total_pages() - 1);
        if page == self.current_page {
            return;
        }
        self.current_page = page;
        self.update_pagination(true);
        self.events.model_updated.emit(ModelUpdatedEvent {
            new_data: false,
            new_page: true,
        });
    }

    fn update_pagination(&mut self, new_page: bool) {
        if self.page_size.is_none() {
            self.current_page = 0;
            return;
        }
        let total_pages = self.total_pages();
        self.current_page = self.current_page.min(total_pages - 1);
        self.events.pagination_changed.emit(PaginationChangedEvent {
            current_page: self.current_page,
            total_pages,
            new_page,
        });
    }

    // =========================================================================
    // Pinned rows
    // =========================================================================

    /// Replace the rows pinned above the grid.
    pub fn set_pinned_top_row_data(&mut self, rows: Vec<Arc<T>>) {
        let old = std::mem::take(&mut self.pinned_top);
        self.pinned_top = self.replace_pinned(old, rows, RowPinned::Top);
    }

    /// Replace the rows pinned below the grid.
    pub fn set_pinned_bottom_row_data(&mut self, rows: Vec<Arc<T>>) {
        let old = std::mem::take(&mut self.pinned_bottom);
        self.pinned_bottom = self.replace_pinned(old, rows, RowPinned::Bottom);
    }

    /// Rows pinned above the grid.
    pub fn pinned_top_rows(&self) -> &[NodeKey] {
        &self.pinned_top
    }

    /// Rows pinned below the grid.
    pub fn pinned_bottom_rows(&self) -> &[NodeKey] {
        &self.pinned_bottom
    }

    fn replace_pinned(&mut self, old: Vec<NodeKey>, rows: Vec<Arc<T>>, pinned: RowPinned) -> Vec<NodeKey> {
        for key in old {
            self.tree.discard(key);
        }
        let prefix = match pinned {
            RowPinned::Top => "t",
            RowPinned::Bottom => "b",
        };
        rows.into_iter()
            .enumerate()
            .map(|(index, data)| self.tree.insert(RowNode::pinned(format!("{prefix}-{index}"), data, pinned)))
            .collect()
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    #[tracing::instrument(skip_all, target = "arbor_grid::row_model", level = "trace")]
    fn refresh(&mut self, selection: &mut SelectionService<T>, changes: Changes<'_>, new_data: bool) {
        let _perf = PerfSpan::new(span_names::REFRESH_MODEL);
        let mut path = match changes {
            Changes::Everything => ChangedPath::everything(),
            Changes::Rows(_) => ChangedPath::new(),
        };

        self.group_rows(selection, &mut path);
        if let Changes::Rows(changed) = changes {
            for key in changed.added().chain(changed.updated()) {
                if let Some(parent) = self.tree.get(key).and_then(RowNode::parent) {
                    path.add_parent_node(&self.tree, parent);
                }
            }
        }
        self.update_footers();
        self.filter_rows();
        selection.update_selectable_after_grouping(&mut self.tree, Some(&path));
        self.update_displayed();
        self.update_pagination(false);

        self.events.model_updated.emit(ModelUpdatedEvent {
            new_data,
            new_page: false,
        });
        selection.forget_missing(&self.tree);

        tracing::debug!(
            target: targets::ROW_MODEL,
            leaves = self.nodes.leaf_count(&self.tree),
            groups = self.groups.len(),
            displayed = self.displayed.len(),
            "model refreshed"
        );
    }

    fn group_rows(&mut self, selection: &mut SelectionService<T>, path: &mut ChangedPath) {
        let root = self.tree.root();
        let leaves = self.nodes.all_leaf_children(&self.tree).to_vec();

        let Some(group_key) = self.group_key.clone() else {
            for &leaf in &leaves {
                if let Some(node) = self.tree.get_mut(leaf) {
                    node.set_parent(Some(root));
                    node.set_level(0);
                }
            }
            self.set_children(root, leaves, path);
            let vanished: Vec<NodeKey> = self.groups.drain(..).map(|(_, key)| key).collect();
            if !vanished.is_empty() {
                path.add_parent_node(&self.tree, root);
            }
            self.drop_groups(selection, vanished);
            return;
        };

        let mut buckets: IndexMap<String, Vec<NodeKey>> = IndexMap::new();
        for &leaf in &leaves {
            let value = self
                .tree
                .get(leaf)
                .and_then(RowNode::data)
                .map(|data| group_key(data.as_ref()))
                .unwrap_or_default();
            buckets.entry(value).or_default().push(leaf);
        }

        let mut groups = IndexMap::with_capacity(buckets.len());
        for (value, members) in buckets {
            let id = format!("{GROUP_ID_PREFIX}{}-{value}", self.grouping.field);
            let group = match self.groups.get(&id) {
                Some(&key) if self.tree.contains(key) => key,
                _ => {
                    let mut node = RowNode::group(
                        id.clone(),
                        &self.grouping.field,
                        value,
                        0,
                        self.grouping.expanded_by_default,
                    );
                    node.set_parent(Some(root));
                    self.tree.insert(node)
                }
            };
            for &leaf in &members {
                if let Some(node) = self.tree.get_mut(leaf) {
                    node.set_parent(Some(group));
                    node.set_level(1);
                }
            }
            if let Some(node) = self.tree.get_mut(group) {
                node.all_leaf_children = members.clone();
            }
            self.set_children(group, members, path);
            groups.insert(id, group);
        }

        let vanished: Vec<NodeKey> = self
            .groups
            .iter()
            .filter(|(id, _)| !groups.contains_key(*id))
            .map(|(_, &key)| key)
            .collect();
        self.groups = groups;
        let children = self.groups.values().copied().collect();
        self.set_children(root, children, path);
        self.drop_groups(selection, vanished);
    }

    /// Store `children` as the grouped children of `key`, recording the node
    /// in `path` when they differ from before.
    fn set_children(&mut self, key: NodeKey, children: Vec<NodeKey>, path: &mut ChangedPath) {
        let Some(node) = self.tree.get_mut(key) else {
            return;
        };
        if node.children_after_group == children {
            return;
        }
        node.children_after_group = children;
        path.add_parent_node(&self.tree, key);
    }

    fn drop_groups(&mut self, selection: &mut SelectionService<T>, groups: Vec<NodeKey>) {
        for group in groups {
            selection.select_row_node(&mut self.tree, group, Some(false), SelectionEventSource::RowGroupChanged);
            if let Some(footer) = self.tree.get(group).and_then(RowNode::sibling) {
                self.tree.discard(footer);
            }
            self.tree.discard(group);
        }
    }

    fn update_footers(&mut self) {
        let include = self.grouping.include_footer;
        for &group in self.groups.values() {
            let Some(node) = self.tree.get(group) else {
                continue;
            };
            match (include, node.sibling()) {
                (true, None) => {
                    let footer = RowNode::footer_of(node, group);
                    let footer = self.tree.insert(footer);
                    if let Some(node) = self.tree.get_mut(group) {
                        node.set_sibling(Some(footer));
                    }
                }
                (false, Some(footer)) => {
                    self.tree.discard(footer);
                    if let Some(node) = self.tree.get_mut(group) {
                        node.set_sibling(None);
                    }
                }
                _ => {}
            }
        }

        let root = self.tree.root();
        let total = self.tree.get(root).and_then(RowNode::sibling);
        match (self.grouping.include_total_footer, total) {
            (true, None) => {
                if let Some(node) = self.tree.get(root) {
                    let footer = RowNode::footer_of(node, root);
                    let footer = self.tree.insert(footer);
                    if let Some(node) = self.tree.get_mut(root) {
                        node.set_sibling(Some(footer));
                    }
                }
            }
            (false, Some(footer)) => {
                self.tree.discard(footer);
                if let Some(node) = self.tree.get_mut(root) {
                    node.set_sibling(None);
                }
            }
            _ => {}
        }
    }

    fn filter_rows(&mut self) {
        let root = self.tree.root();
        self.filter_node(root);
        self.nodes.sync_root_sibling(&mut self.tree);
    }

    /// Rebuild the filtered children of `key`; returns whether it is shown.
    fn filter_node(&mut self, key: NodeKey) -> bool {
        let Some(node) = self.tree.get(key) else {
            return false;
        };
        if !node.is_group() {
            return match (&self.filter, node.data()) {
                (Some(filter), Some(data)) => filter(data.as_ref()),
                _ => true,
            };
        }

        let children = node.children_after_group.clone();
        let kept: Vec<NodeKey> = children.into_iter().filter(|&c| self.filter_node(c)).collect();
        let shown = !kept.is_empty() || key == self.tree.root();
        if let Some(node) = self.tree.get_mut(key) {
            node.children_after_filter = kept.clone();
            node.children_after_agg_filter = kept.clone();
            node.children_after_sort = kept;
        }
        shown
    }

    fn update_displayed(&mut self) {
        fn flatten<T>(tree: &RowTree<T>, key: NodeKey, out: &mut Vec<NodeKey>) {
            let Some(node) = tree.get(key) else {
                return;
            };
            for &child in node.children_after_sort() {
                out.push(child);
                let Some(child_node) = tree.get(child) else {
                    continue;
                };
                if child_node.is_group() && child_node.is_expanded() {
                    flatten(tree, child, out);
                    if let Some(footer) = child_node.sibling() {
                        out.push(footer);
                    }
                }
            }
        }

        let mut displayed = Vec::with_capacity(self.displayed.len());
        let root = self.tree.root();
        flatten(&self.tree, root, &mut displayed);
        if !displayed.is_empty()
            && let Some(total) = self.tree.get(root).and_then(RowNode::sibling)
        {
            displayed.push(total);
        }

        for key in std::mem::take(&mut self.displayed) {
            if let Some(node) = self.tree.get_mut(key) {
                node.set_row_index(None);
            }
        }
        for (index, &key) in displayed.iter().enumerate() {
            if let Some(node) = self.tree.get_mut(key) {
                node.set_row_index(Some(index));
            }
        }
        self.displayed = displayed;
    }
}

impl<T> RowRangeSource for ClientSideRowModel<T> {
    fn row_node(&self, id: &str) -> Option<NodeKey> {
        self.get_row_node(id)
    }

    fn node_id(&self, key: NodeKey) -> Option<&str> {
        self.tree.id_of(key)
    }

    /// Walk filtered rows in display order, expanded or not, from whichever
    /// boundary comes first to the other.
    ///
    /// While groups derive their state only leaves are listed, and a group
    /// at the closing boundary brings all of its leaves.
    fn nodes_in_range_for_selection(&self, first: NodeKey, last: NodeKey) -> Option<Vec<NodeKey>> {
        let gsd = self.group_selects_descendants;
        let nodes = self.tree.nodes_after_sort();
        if first == last {
            return nodes.contains(&first).then(|| vec![first]);
        }

        let mut started = false;
        let mut result = Vec::new();
        for key in nodes {
            let Some(node) = self.tree.get(key) else {
                continue;
            };
            let is_boundary = key == first || key == last;
            if !started {
                if !is_boundary {
                    continue;
                }
                started = true;
                if !node.is_group() || !gsd {
                    result.push(key);
                }
                continue;
            }
            if is_boundary && node.is_group() && gsd {
                result.extend(node.all_leaf_children().iter().copied());
                return Some(result);
            }
            if !node.is_group() || !gsd {
                result.push(key);
            }
            if is_boundary {
                return Some(result);
            }
        }
        None
    }

    fn leaf_descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        self.tree.leaf_descendants(key)
    }
}

impl<T> RowModel<T> for ClientSideRowModel<T> {
    fn tree(&self) -> &RowTree<T> {
        &self.tree
    }

    fn tree_mut(&mut self) -> &mut RowTree<T> {
        &mut self.tree
    }

    fn first_displayed_row(&self) -> Option<NodeKey> {
        self.displayed.first().copied()
    }

    fn nodes_on_page(&self) -> Vec<NodeKey> {
        match self.page_size {
            Some(size) => {
                let start = (self.current_page * size).min(self.displayed.len());
                let end = (start + size).min(self.displayed.len());
                self.displayed[start..end].to_vec()
            }
            None => self.displayed.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{GroupSelectsMode, RowSelectionOptions};
    use crate::selection::SelectionCapabilities;

    #[derive(Debug)]
    struct Row {
        id: u32,
        kind: &'static str,
    }

    fn rows(entries: &[(u32, &'static str)]) -> Vec<Arc<Row>> {
        entries.iter().map(|&(id, kind)| Arc::new(Row { id, kind })).collect()
    }

    fn setup(options: GridOptions, grouped: bool) -> (ClientSideRowModel<Row>, SelectionService<Row>) {
        let events = Arc::new(GridEvents::new());
        let logger = Arc::new(WarnOnce::new());
        let mut callbacks = GridCallbacks::new().with_row_id(|r: &Row, _: i32| r.id.to_string());
        if grouped {
            callbacks = callbacks.with_group_key(|r: &Row| r.kind.to_owned());
        }
        let caps = SelectionCapabilities::from_grid(&options, &callbacks);
        let model = ClientSideRowModel::new(&options, &callbacks, events.clone(), logger.clone());
        (model, SelectionService::new(caps, events, logger))
    }

    fn ids(model: &ClientSideRowModel<Row>, keys: &[NodeKey]) -> Vec<String> {
        keys.iter()
            .map(|&k| model.tree().id_of(k).unwrap_or("?").to_owned())
            .collect()
    }

    #[test]
    fn test_flat_rows_are_displayed_in_order() {
        let (mut model, mut selection) = setup(GridOptions::default(), false);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "b"), (3, "a")]));
        assert_eq!(ids(&model, model.displayed_rows()), vec!["1", "2", "3"]);
        let second = model.get_row(1).unwrap();
        assert_eq!(model.tree().get(second).unwrap().row_index(), Some(1));
        assert_eq!(model.first_displayed_row(), model.get_row(0));
    }

    #[test]
    fn test_grouping_builds_groups_and_reuses_them() {
        let (mut model, mut selection) = setup(GridOptions::default(), true);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "b"), (3, "a")]));

        let group_a = model.get_group_node("a").unwrap();
        assert_eq!(model.tree().id_of(group_a), Some("row-group-group-a"));
        assert_eq!(
            ids(&model, model.displayed_rows()),
            vec!["row-group-group-a", "1", "3", "row-group-group-b", "2"]
        );
        let leaf = model.get_row_node("3").unwrap();
        assert_eq!(model.tree().get(leaf).unwrap().parent(), Some(group_a));
        assert_eq!(model.tree().get(leaf).unwrap().level(), 1);

        model.apply_transaction(&mut selection, RowDataTransaction::new().with_add(rows(&[(4, "a")])));
        assert_eq!(model.get_group_node("a"), Some(group_a));
        assert_eq!(model.tree().get(group_a).unwrap().children_after_group().len(), 3);
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let (mut model, mut selection) = setup(GridOptions::default(), true);
        let data = rows(&[(1, "a"), (2, "b")]);
        model.set_row_data(&mut selection, data.clone());
        let group_b = model.get_group_node("b").unwrap();

        model.apply_transaction(&mut selection, RowDataTransaction::new().with_remove([data[1].clone()]));
        assert!(model.get_group_node("b").is_none());
        assert!(!model.tree().contains(group_b));
        assert_eq!(model.group_nodes().len(), 1);
    }

    #[test]
    fn test_collapsed_group_hides_children_and_footer() {
        let mut options = GridOptions::default();
        options.grouping.include_footer = true;
        let (mut model, mut selection) = setup(options, true);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "a")]));
        assert_eq!(
            ids(&model, model.displayed_rows()),
            vec!["row-group-group-a", "1", "2", "rowGroupFooter_row-group-group-a"]
        );

        let group = model.get_group_node("a").unwrap();
        model.set_expanded(group, false);
        assert_eq!(ids(&model, model.displayed_rows()), vec!["row-group-group-a"]);
        let leaf = model.get_row_node("1").unwrap();
        assert_eq!(model.tree().get(leaf).unwrap().row_index(), None);
    }

    #[test]
    fn test_filter_hides_rows_and_empty_groups() {
        let (mut model, mut selection) = setup(GridOptions::default(), true);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "b"), (3, "a")]));
        model.set_filter(&mut selection, Some(Arc::new(|r: &Row| r.id != 2)));

        assert_eq!(
            ids(&model, model.displayed_rows()),
            vec!["row-group-group-a", "1", "3"]
        );
        let group_b = model.get_group_node("b").unwrap();
        assert!(model.tree().get(group_b).unwrap().children_after_filter().is_empty());
        assert_eq!(model.tree().nodes_after_filter().len(), 3);
    }

    #[test]
    fn test_pagination_slices_displayed_rows() {
        let options = GridOptions::default().with_pagination(2);
        let (mut model, mut selection) = setup(options, false);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "a"), (3, "a")]));

        assert_eq!(model.total_pages(), 2);
        assert_eq!(ids(&model, &model.nodes_on_page()), vec!["1", "2"]);
        model.go_to_page(5);
        assert_eq!(model.current_page(), 1);
        assert_eq!(ids(&model, &model.nodes_on_page()), vec!["3"]);
    }

    #[test]
    fn test_range_walk_includes_only_leaves_with_derived_groups() {
        let options = GridOptions::default().with_row_selection(
            RowSelectionOptions::multi_row().with_group_selects(GroupSelectsMode::Descendants),
        );
        let (mut model, mut selection) = setup(options, true);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "b"), (3, "b")]));

        let first = model.get_row_node("1").unwrap();
        let group_b = model.get_group_node("b").unwrap();
        let range = model.nodes_in_range_for_selection(first, group_b).unwrap();
        assert_eq!(ids(&model, &range), vec!["1", "2", "3"]);

        let reversed = model.nodes_in_range_for_selection(group_b, first).unwrap();
        assert_eq!(ids(&model, &reversed), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_range_walk_fails_for_unknown_boundary() {
        let (mut model, mut selection) = setup(GridOptions::default(), false);
        model.set_row_data(&mut selection, rows(&[(1, "a"), (2, "a")]));
        model.set_pinned_top_row_data(rows(&[(9, "p")]));

        let first = model.get_row_node("1").unwrap();
        let pinned = model.pinned_top_rows()[0];
        assert_eq!(model.get_row_node("t-0"), Some(pinned));
        assert!(model.nodes_in_range_for_selection(first, pinned).is_none());
        assert_eq!(model.nodes_in_range_for_selection(first, first), Some(vec![first]));
    }

    #[test]
    fn test_async_transactions_flush_in_order() {
        let (mut model, mut selection) = setup(GridOptions::default(), false);
        model.set_row_data(&mut selection, rows(&[(1, "a")]));

        let added = rows(&[(2, "a")]);
        model.apply_transaction_async(RowDataTransaction::new().with_add(added.clone()));
        model.apply_transaction_async(RowDataTransaction::new().with_remove(added));
        assert_eq!(model.pending_async_transactions(), 2);
        assert_eq!(model.row_count(), 1);

        let results = model.flush_async_transactions(&mut selection);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].add.len(), 1);
        assert_eq!(results[1].remove.len(), 1);
        assert_eq!(model.pending_async_transactions(), 0);
        assert_eq!(ids(&model, model.displayed_rows()), vec!["1"]);
        // root plus the remaining leaf
        assert_eq!(model.tree().len(), 2);
    }
}
