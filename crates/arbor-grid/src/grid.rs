//! The grid facade.
//!
//! [`Grid`] wires one row model, one selection engine and the select-all
//! feature to a shared [`GridEvents`] bundle and [`WarnOnce`] logger, and
//! exposes the public API in one place.

use std::path::Path;
use std::sync::Arc;

use arbor_core::WarnOnce;
use arbor_core::logging::targets;

use crate::error::Result;
use crate::events::{GridEvents, SelectionEventSource};
use crate::node::{NodeKey, RowNode, RowTree};
use crate::options::{
    GridCallbacks, GridOptions, GroupKeyFn, IsRowSelectable, RowFilter, RowSelectionOptions, SelectAllScope,
};
use crate::row_model::{ClientSideRowModel, RowModel};
use crate::select_all::{HeaderCheckbox, SelectAllFeature};
use crate::selection::{Modifiers, SelectedNode, SelectionCapabilities, SelectionService, SetSelectedParams};
use crate::transaction::{RowDataTransaction, RowNodeTransaction};

/// A data grid over records of type `T`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use arbor_grid::{Grid, GridCallbacks, GridOptions, Modifiers, RowSelectionOptions, SelectionEventSource};
///
/// struct Person { id: u32, name: &'static str }
///
/// let options = GridOptions::default().with_row_selection(RowSelectionOptions::multi_row());
/// let callbacks = GridCallbacks::new().with_row_id(|p: &Person, _: i32| p.id.to_string());
/// let mut grid = Grid::new(options, callbacks);
///
/// grid.set_row_data(vec![
///     Arc::new(Person { id: 1, name: "Ada" }),
///     Arc::new(Person { id: 2, name: "Grace" }),
/// ]);
/// grid.handle_selection_event("2", Modifiers::NONE, SelectionEventSource::CheckboxSelected);
/// assert_eq!(grid.get_selection_state(), Some(vec!["2".to_owned()]));
/// assert_eq!(grid.get_selected_rows()[0].name, "Grace");
/// ```
pub struct Grid<T> {
    options: GridOptions,
    model: ClientSideRowModel<T>,
    selection: SelectionService<T>,
    select_all: SelectAllFeature,
    events: Arc<GridEvents>,
    logger: Arc<WarnOnce>,
}

impl<T> std::fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("options", &self.options)
            .field("model", &self.model)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<T> Grid<T> {
    /// Create an empty grid.
    pub fn new(options: GridOptions, callbacks: GridCallbacks<T>) -> Self {
        Self::with_logger(options, callbacks, Arc::new(WarnOnce::new()))
    }

    /// Create an empty grid reporting through `logger`.
    pub fn with_logger(options: GridOptions, callbacks: GridCallbacks<T>, logger: Arc<WarnOnce>) -> Self {
        let events = Arc::new(GridEvents::new());
        let caps = SelectionCapabilities::from_grid(&options, &callbacks);
        let model = ClientSideRowModel::new(&options, &callbacks, events.clone(), logger.clone());
        let selection = SelectionService::new(caps, events.clone(), logger.clone());
        let select_all = SelectAllFeature::new(events.clone());
        tracing::debug!(target: targets::GRID, ?options, "grid created");
        Self {
            options,
            model,
            selection,
            select_all,
            events,
            logger,
        }
    }

    /// Create a grid with options loaded from a `.toml` or `.json` file.
    pub fn from_config_file(path: impl AsRef<Path>, callbacks: GridCallbacks<T>) -> Result<Self> {
        let options = GridOptions::load(path)?;
        Ok(Self::new(options, callbacks))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Signals of this grid.
    pub fn events(&self) -> &Arc<GridEvents> {
        &self.events
    }

    /// The warn-once logger of this grid.
    pub fn logger(&self) -> &Arc<WarnOnce> {
        &self.logger
    }

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn model(&self) -> &ClientSideRowModel<T> {
        &self.model
    }

    pub fn selection(&self) -> &SelectionService<T> {
        &self.selection
    }

    pub fn tree(&self) -> &RowTree<T> {
        self.model.tree()
    }

    /// Look up a live node.
    pub fn node(&self, key: NodeKey) -> Option<&RowNode<T>> {
        self.model.tree().get(key)
    }

    // =========================================================================
    // Row data
    // =========================================================================

    /// Replace all rows, clearing the selection.
    pub fn set_row_data(&mut self, rows: Vec<Arc<T>>) {
        self.model.set_row_data(&mut self.selection, rows);
    }

    /// Replace all rows, keeping rows whose id is still present.
    pub fn set_immutable_row_data(&mut self, rows: Vec<Arc<T>>) -> Option<RowNodeTransaction<T>> {
        self.model.set_immutable_row_data(&mut self.selection, rows)
    }

    /// Apply a transaction now.
    pub fn apply_transaction(&mut self, transaction: RowDataTransaction<T>) -> RowNodeTransaction<T> {
        self.model.apply_transaction(&mut self.selection, transaction)
    }

    /// Queue a transaction for [`flush_async_transactions`](Self::flush_async_transactions).
    pub fn apply_transaction_async(&mut self, transaction: RowDataTransaction<T>) {
        self.model.apply_transaction_async(transaction);
    }

    /// Apply every queued transaction as one batch.
    pub fn flush_async_transactions(&mut self) -> Vec<RowNodeTransaction<T>> {
        self.model.flush_async_transactions(&mut self.selection)
    }

    /// Append placeholder rows.
    pub fn add_loading_rows(&mut self, count: usize) -> Vec<NodeKey> {
        self.model.add_loading_rows(&mut self.selection, count)
    }

    /// Fill a placeholder, or reload a row, in place.
    pub fn load_row(&mut self, key: NodeKey, data: Arc<T>, id: Option<String>) {
        self.model.load_row(&mut self.selection, key, data, id);
    }

    /// Records of every leaf, in source order.
    pub fn extract_row_data(&self) -> Vec<Arc<T>> {
        self.model.extract_row_data()
    }

    /// Any row by id.
    pub fn get_row_node(&self, id: &str) -> Option<NodeKey> {
        self.model.get_row_node(id)
    }

    /// Displayed rows across all pages.
    pub fn displayed_rows(&self) -> &[NodeKey] {
        self.model.displayed_rows()
    }

    pub fn row_count(&self) -> usize {
        self.model.row_count()
    }

    pub fn set_pinned_top_row_data(&mut self, rows: Vec<Arc<T>>) {
        self.model.set_pinned_top_row_data(rows);
    }

    pub fn set_pinned_bottom_row_data(&mut self, rows: Vec<Arc<T>>) {
        self.model.set_pinned_bottom_row_data(rows);
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    pub fn set_filter(&mut self, filter: Option<RowFilter<T>>) {
        self.model.set_filter(&mut self.selection, filter);
    }

    pub fn set_group_key(&mut self, group_key: Option<GroupKeyFn<T>>) {
        self.model.set_group_key(&mut self.selection, group_key);
    }

    pub fn set_expanded(&mut self, key: NodeKey, expanded: bool) {
        self.model.set_expanded(key, expanded);
    }

    pub fn set_page_size(&mut self, page_size: Option<usize>) {
        self.model.set_page_size(page_size);
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.model.go_to_page(page);
    }

    // =========================================================================
    // Selection settings
    // =========================================================================

    /// Replace the row selection settings; `None` disables selection.
    ///
    /// Switching off selection or changing how groups select clears the
    /// selection.
    pub fn set_row_selection(&mut self, row_selection: Option<RowSelectionOptions>) {
        let old = self.options.row_selection.as_ref().map(|o| o.group_selects);
        let new = row_selection.as_ref().map(|o| o.group_selects);
        let source = SelectionEventSource::GridOptionsChanged;
        if row_selection.is_none() || old != new {
            self.selection.reset(self.model.tree_mut(), source);
        }

        self.options.row_selection = row_selection.clone();
        self.model
            .set_group_selects_descendants(new.is_some_and(|g| g.selects_children()));
        self.selection.capabilities_mut().set_options(row_selection);

        let single = !self.selection.is_multi_select();
        if single && self.selection.get_selection_count() > 1 {
            self.selection.reset(self.model.tree_mut(), source);
        }
        self.selection.update_selectable(self.model.tree_mut(), None);
    }

    /// Replace the selectability callback and re-evaluate every row.
    pub fn set_is_row_selectable(&mut self, callback: Option<IsRowSelectable<T>>) {
        self.selection
            .set_is_row_selectable(self.model.tree_mut(), callback);
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Apply a click or key gesture on the row with `id`.
    ///
    /// Returns the number of flags that changed.
    pub fn handle_selection_event(&mut self, id: &str, modifiers: Modifiers, source: SelectionEventSource) -> usize {
        let Some(key) = self.model.get_row_node(id) else {
            return 0;
        };
        self.handle_selection_event_for(key, modifiers, source)
    }

    /// Apply a click or key gesture on `key`.
    pub fn handle_selection_event_for(&mut self, key: NodeKey, modifiers: Modifiers, source: SelectionEventSource) -> usize {
        self.selection
            .handle_selection_event(&mut self.model, key, modifiers, source)
    }

    /// Select or deselect nodes.
    pub fn set_nodes_selected(&mut self, params: SetSelectedParams) -> usize {
        self.selection
            .set_nodes_selected(self.model.tree_mut(), params)
    }

    /// Select every row in `scope`, or in the configured scope.
    pub fn select_all(&mut self, scope: Option<SelectAllScope>) {
        let scope = scope.unwrap_or_else(|| SelectAllFeature::scope(&self.selection));
        self.selection
            .select_all_row_nodes(&mut self.model, scope, api_source(scope));
    }

    /// Deselect every row in `scope`, or in the configured scope.
    pub fn deselect_all(&mut self, scope: Option<SelectAllScope>) {
        let scope = scope.unwrap_or_else(|| SelectAllFeature::scope(&self.selection));
        self.selection
            .deselect_all_row_nodes(&mut self.model, scope, api_source(scope));
    }

    /// Tri-state of `scope`: `None` when partially selected.
    pub fn get_select_all_state(&self, scope: SelectAllScope) -> Option<bool> {
        self.selection.get_select_all_state(&self.model, scope)
    }

    pub fn get_selected_nodes(&self) -> Vec<SelectedNode<T>> {
        self.selection.get_selected_nodes()
    }

    pub fn get_selected_rows(&self) -> Vec<Arc<T>> {
        self.selection.get_selected_rows(self.model.tree())
    }

    pub fn get_selection_count(&self) -> usize {
        self.selection.get_selection_count()
    }

    /// Selected ids in selection order, `None` when nothing is selected.
    pub fn get_selection_state(&self) -> Option<Vec<String>> {
        self.selection.get_selection_state()
    }

    /// Replace the selection with the listed ids.
    pub fn set_selection_state(&mut self, ids: &[String]) {
        self.selection
            .set_selection_state(self.model.tree_mut(), ids, SelectionEventSource::Api);
    }

    /// Top-most fully selected rows.
    pub fn get_best_cost_node_selection(&self) -> Vec<NodeKey> {
        self.selection
            .get_best_cost_node_selection(self.model.tree())
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection
            .reset(self.model.tree_mut(), SelectionEventSource::Api);
    }

    // =========================================================================
    // Header checkbox
    // =========================================================================

    /// The select-all checkbox, refreshed if anything changed.
    pub fn header_checkbox(&mut self) -> HeaderCheckbox {
        self.select_all
            .refresh_if_dirty(&self.selection, &self.model)
    }

    /// Click the select-all checkbox.
    pub fn toggle_header_checkbox(&mut self) -> HeaderCheckbox {
        self.select_all
            .on_toggled(&mut self.selection, &mut self.model)
    }

    /// Disconnect every slot, including the header checkbox.
    pub fn destroy(&mut self) {
        self.select_all.destroy();
        self.events.disconnect_all();
    }
}

fn api_source(scope: SelectAllScope) -> SelectionEventSource {
    match scope {
        SelectAllScope::All => SelectionEventSource::ApiSelectAll,
        SelectAllScope::Filtered => SelectionEventSource::ApiSelectAllFiltered,
        SelectAllScope::CurrentPage => SelectionEventSource::ApiSelectAllCurrentPage,
    }
}
