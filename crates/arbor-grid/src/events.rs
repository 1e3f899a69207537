//! Event bus shared by the row model, the selection engine and the
//! select-all feature.
//!
//! # Signal Emission Protocol
//!
//! Every signal fires synchronously after the mutation it describes has
//! completed, never in the middle of one:
//!
//! - **Data changes**: `row_data_update_started` before the node manager
//!   touches the leaf array, `row_data_updated` and `model_updated` after
//!   the pipeline has been refreshed
//! - **Selection**: one `row_selected` per changed flag, then at most one
//!   `selection_changed` per finished action
//! - **Selectability**: `selectable_changed` when a row's selectable flag flips

use arbor_core::Signal;

use crate::node::NodeKey;

/// What triggered a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionEventSource {
    /// Public API call on individual nodes.
    Api,
    /// Public API select-all over every row.
    ApiSelectAll,
    /// Public API select-all over rows passing the filter.
    ApiSelectAllFiltered,
    /// Public API select-all over the current page.
    ApiSelectAllCurrentPage,
    /// A row checkbox was toggled.
    CheckboxSelected,
    /// A row was clicked.
    RowClicked,
    /// The space key was pressed on a focused row.
    SpaceKey,
    /// Ctrl/Cmd+A.
    KeyboardSelectAll,
    /// Row data was replaced or rows were removed.
    RowDataChanged,
    /// Grouping changed and group states were recomputed.
    RowGroupChanged,
    /// A row stopped being selectable.
    SelectableChanged,
    /// Options changed at runtime.
    GridOptionsChanged,
    /// The header checkbox selected or deselected every row.
    UiSelectAll,
    /// The header checkbox over rows passing the filter.
    UiSelectAllFiltered,
    /// The header checkbox over the current page.
    UiSelectAllCurrentPage,
}

impl SelectionEventSource {
    /// The wire name of this source, as used in event payloads and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::ApiSelectAll => "apiSelectAll",
            Self::ApiSelectAllFiltered => "apiSelectAllFiltered",
            Self::ApiSelectAllCurrentPage => "apiSelectAllCurrentPage",
            Self::CheckboxSelected => "checkboxSelected",
            Self::RowClicked => "rowClicked",
            Self::SpaceKey => "spaceKey",
            Self::KeyboardSelectAll => "keyboardSelectAll",
            Self::RowDataChanged => "rowDataChanged",
            Self::RowGroupChanged => "rowGroupChanged",
            Self::SelectableChanged => "selectableChanged",
            Self::GridOptionsChanged => "gridOptionsChanged",
            Self::UiSelectAll => "uiSelectAll",
            Self::UiSelectAllFiltered => "uiSelectAllFiltered",
            Self::UiSelectAllCurrentPage => "uiSelectAllCurrentPage",
        }
    }
}

impl std::fmt::Display for SelectionEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of data change a lifecycle event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDataChangeKind {
    /// Full replacement of the row data.
    NewData,
    /// Diffing replacement keyed by row id.
    Immutable,
    /// Incremental add/update/remove transaction.
    Transaction,
    /// A batch of queued transactions.
    AsyncBatch,
}

/// Payload of `row_data_update_started`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDataUpdateStartedEvent {
    pub kind: RowDataChangeKind,
    /// Number of records in the incoming data or transaction.
    pub row_count: usize,
}

/// Payload of `row_data_updated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDataUpdatedEvent {
    pub kind: RowDataChangeKind,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub order_changed: bool,
}

/// Payload of `row_selected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSelectedEvent {
    pub node: NodeKey,
    pub id: Option<String>,
    pub selected: Option<bool>,
    pub source: SelectionEventSource,
}

/// Payload of `selection_changed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChangedEvent {
    pub source: SelectionEventSource,
}

/// Payload of `selectable_changed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectableChangedEvent {
    pub node: NodeKey,
    pub id: Option<String>,
    pub selectable: bool,
}

/// Payload of `model_updated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelUpdatedEvent {
    /// The row data was replaced.
    pub new_data: bool,
    /// The current page changed.
    pub new_page: bool,
}

/// Payload of `pagination_changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationChangedEvent {
    pub current_page: usize,
    pub total_pages: usize,
    pub new_page: bool,
}

/// Payload of `async_transactions_flushed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncTransactionsFlushedEvent {
    /// Number of transactions applied by the flush.
    pub transactions: usize,
}

/// Every signal a grid emits.
///
/// Shared through an `Arc` by the components of one grid; consumers connect
/// slots to the public fields.
#[derive(Debug)]
pub struct GridEvents {
    // -------------------------------------------------------------------------
    // Row data lifecycle
    // -------------------------------------------------------------------------
    /// Emitted before the leaf array is mutated.
    pub row_data_update_started: Signal<RowDataUpdateStartedEvent>,

    /// Emitted after a data change has been applied and the model refreshed.
    pub row_data_updated: Signal<RowDataUpdatedEvent>,

    /// Emitted after the displayed rows were recomputed.
    pub model_updated: Signal<ModelUpdatedEvent>,

    /// Emitted after queued transactions were flushed.
    pub async_transactions_flushed: Signal<AsyncTransactionsFlushedEvent>,

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------
    /// Emitted once per node whose selection flag changed.
    pub row_selected: Signal<RowSelectedEvent>,

    /// Emitted once per finished selection action.
    pub selection_changed: Signal<SelectionChangedEvent>,

    /// Emitted when a row's selectable flag changes.
    pub selectable_changed: Signal<SelectableChangedEvent>,

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------
    /// Emitted when the current page or the page count changes.
    pub pagination_changed: Signal<PaginationChangedEvent>,

    /// Emitted by the column layer after a new column set was loaded.
    pub new_columns_loaded: Signal<()>,

    /// Emitted by the column layer when the displayed columns change.
    pub displayed_columns_changed: Signal<()>,
}

impl Default for GridEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl GridEvents {
    /// Creates a new set of grid signals.
    pub fn new() -> Self {
        Self {
            row_data_update_started: Signal::new(),
            row_data_updated: Signal::new(),
            model_updated: Signal::new(),
            async_transactions_flushed: Signal::new(),
            row_selected: Signal::new(),
            selection_changed: Signal::new(),
            selectable_changed: Signal::new(),
            pagination_changed: Signal::new(),
            new_columns_loaded: Signal::new(),
            displayed_columns_changed: Signal::new(),
        }
    }

    /// Emits `selection_changed` with the given source.
    pub fn emit_selection_changed(&self, source: SelectionEventSource) {
        self.selection_changed.emit(SelectionChangedEvent { source });
    }

    /// Disconnects every slot from every signal.
    pub fn disconnect_all(&self) {
        self.row_data_update_started.disconnect_all();
        self.row_data_updated.disconnect_all();
        self.model_updated.disconnect_all();
        self.async_transactions_flushed.disconnect_all();
        self.row_selected.disconnect_all();
        self.selection_changed.disconnect_all();
        self.selectable_changed.disconnect_all();
        self.pagination_changed.disconnect_all();
        self.new_columns_loaded.disconnect_all();
        self.displayed_columns_changed.disconnect_all();
    }
}
