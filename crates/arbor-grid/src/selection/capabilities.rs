//! The knobs the selection engine consults, resolved once from options and
//! callbacks.

use crate::node::RowNode;
use crate::options::{
    ClickSelection, GridCallbacks, GridOptions, GroupSelectsMode, IsRowSelectable, RowSelectionOptions,
};

/// Selection behaviour injected into [`SelectionService`](super::SelectionService).
pub struct SelectionCapabilities<T> {
    options: Option<RowSelectionOptions>,
    is_row_selectable: Option<IsRowSelectable<T>>,
}

impl<T> Clone for SelectionCapabilities<T> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            is_row_selectable: self.is_row_selectable.clone(),
        }
    }
}

impl<T> std::fmt::Debug for SelectionCapabilities<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionCapabilities")
            .field("options", &self.options)
            .field("is_row_selectable", &self.is_row_selectable.is_some())
            .finish()
    }
}

impl<T> SelectionCapabilities<T> {
    /// Capabilities with the given selection options and selectability callback.
    pub fn new(options: Option<RowSelectionOptions>, is_row_selectable: Option<IsRowSelectable<T>>) -> Self {
        Self {
            options,
            is_row_selectable,
        }
    }

    /// Capabilities derived from grid configuration.
    pub fn from_grid(options: &GridOptions, callbacks: &GridCallbacks<T>) -> Self {
        Self::new(options.row_selection.clone(), callbacks.is_row_selectable.clone())
    }

    /// The selection options, `None` when selection is disabled.
    pub fn options(&self) -> Option<&RowSelectionOptions> {
        self.options.as_ref()
    }

    /// Whether row selection is enabled at all.
    pub fn is_enabled(&self) -> bool {
        self.options.is_some()
    }

    /// Whether more than one row may be selected.
    pub fn is_multi_select(&self) -> bool {
        self.options.as_ref().is_some_and(RowSelectionOptions::is_multi_row)
    }

    /// How group rows relate to their children.
    pub fn group_selects(&self) -> GroupSelectsMode {
        self.options
            .as_ref()
            .map_or(GroupSelectsMode::SelfOnly, |o| o.group_selects)
    }

    /// Whether group state is derived from the children.
    pub fn group_selects_descendants(&self) -> bool {
        self.group_selects().selects_children()
    }

    /// Whether only filtered descendants count.
    pub fn group_selects_filtered(&self) -> bool {
        self.group_selects() == GroupSelectsMode::FilteredDescendants
    }

    fn click_selection(&self) -> ClickSelection {
        self.options
            .as_ref()
            .map_or(ClickSelection::Disabled, |o| o.enable_click_selection)
    }

    /// Whether a row click may select.
    pub fn enable_click_selection(&self) -> bool {
        self.click_selection().selects()
    }

    /// Whether a row click may deselect.
    pub fn enable_deselection(&self) -> bool {
        self.click_selection().deselects()
    }

    /// Whether plain clicks add to the selection.
    pub fn enable_selection_without_keys(&self) -> bool {
        self.options
            .as_ref()
            .is_some_and(|o| o.enable_selection_without_keys)
    }

    /// Evaluate the selectability callback, `true` without one.
    pub fn evaluate_selectable(&self, node: &RowNode<T>) -> bool {
        self.is_row_selectable.as_ref().is_none_or(|f| f(node))
    }

    pub(crate) fn set_is_row_selectable(&mut self, callback: Option<IsRowSelectable<T>>) {
        self.is_row_selectable = callback;
    }

    pub(crate) fn set_options(&mut self, options: Option<RowSelectionOptions>) {
        self.options = options;
    }
}
