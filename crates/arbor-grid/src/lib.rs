//! Client-side row model and selection engine for data grids.
//!
//! This crate keeps track of which rows exist, how they hang in a row tree,
//! and which of them are selected:
//!
//! - **Row tree**: an arena of [`RowNode`]s (root, groups, leaves, footers,
//!   pinned rows) addressed by [`NodeKey`] handles
//! - **Node manager**: the flat leaf array and id index, with full
//!   replacement, immutable diffing and add/update/remove transactions
//! - **Row model**: grouping, footers, filtering, display order and
//!   pagination over the leaves, plus a queue for batched transactions
//! - **Selection**: single, multi and shift-range selection, derived group
//!   states, footer aliasing and daemon entries for retired ids
//! - **Select all**: the tri-state header checkbox
//!
//! Everything is synchronous. Changes are announced through the signals in
//! [`GridEvents`]; misuse is reported once per kind through a
//! [`WarnOnce`](arbor_core::WarnOnce) logger and otherwise ignored.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use arbor_grid::{GridCallbacks, GridOptions, Grid, GroupSelectsMode, RowSelectionOptions, SetSelectedParams,
//!     SelectionEventSource};
//!
//! struct Task { id: u32, team: &'static str }
//!
//! let options = GridOptions::default().with_row_selection(
//!     RowSelectionOptions::multi_row().with_group_selects(GroupSelectsMode::Descendants),
//! );
//! let callbacks = GridCallbacks::new()
//!     .with_row_id(|t: &Task, _: i32| t.id.to_string())
//!     .with_group_key(|t: &Task| t.team.to_owned());
//! let mut grid = Grid::new(options, callbacks);
//! grid.set_row_data(vec![
//!     Arc::new(Task { id: 1, team: "core" }),
//!     Arc::new(Task { id: 2, team: "core" }),
//!     Arc::new(Task { id: 3, team: "docs" }),
//! ]);
//!
//! let core = grid.model().get_group_node("core").unwrap();
//! grid.set_nodes_selected(SetSelectedParams::new(vec![core], true, SelectionEventSource::Api));
//! assert_eq!(grid.get_selection_state(), Some(vec!["1".to_owned(), "2".to_owned()]));
//! ```

pub mod changed_path;
pub mod error;
pub mod events;
pub mod grid;
pub mod node;
pub mod node_manager;
pub mod options;
pub mod range_selection;
pub mod row_model;
pub mod select_all;
pub mod selection;
pub mod transaction;

pub use changed_path::ChangedPath;
pub use error::{ConfigError, GridError, Result};
pub use events::{GridEvents, RowDataChangeKind, SelectionEventSource};
pub use grid::Grid;
pub use node::{DaemonNode, NodeKey, RowNode, RowPinned, RowTree};
pub use node_manager::NodeManager;
pub use options::{
    ClickSelection, GetRowId, GridCallbacks, GridOptions, GroupKeyFn, GroupSelectsMode, GroupingOptions,
    IsRowSelectable, PaginationOptions, RowFilter, RowSelectionMode, RowSelectionOptions, SelectAllScope,
};
pub use range_selection::{RangePartition, RowRangeSelectionContext, RowRangeSource};
pub use row_model::{ClientSideRowModel, RowModel};
pub use select_all::{CheckState, HeaderCheckbox, SelectAllFeature};
pub use selection::{
    ChildSelection, Modifiers, NodeSelection, SelectedNode, SelectionCapabilities, SelectionService,
    SetSelectedParams,
};
pub use transaction::{ChangedRowNodes, RemovedRow, RowDataTransaction, RowNodeTransaction};
