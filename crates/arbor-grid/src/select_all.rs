//! The select-all header checkbox.
//!
//! [`SelectAllFeature`] holds no selection logic of its own: it listens to
//! the grid signals that can change the checkbox, marks itself dirty, and on
//! [`refresh`](SelectAllFeature::refresh) reads the tri-state from the
//! [`SelectionService`]. Toggling runs select-all or deselect-all over the
//! configured scope.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arbor_core::ConnectionId;
use arbor_core::logging::targets;

use crate::events::{GridEvents, SelectionEventSource};
use crate::options::SelectAllScope;
use crate::row_model::RowModel;
use crate::selection::SelectionService;

/// Check state of a tri-state checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    /// Nothing in scope is selected.
    #[default]
    Unchecked,
    /// Some but not all rows in scope are selected.
    PartiallyChecked,
    /// Every selectable row in scope is selected.
    Checked,
}

impl CheckState {
    /// Map a select-all state, where `None` is indeterminate.
    pub fn from_selection(state: Option<bool>) -> Self {
        match state {
            Some(true) => CheckState::Checked,
            Some(false) => CheckState::Unchecked,
            None => CheckState::PartiallyChecked,
        }
    }

    /// The value a click moves to: partial checks, otherwise negates.
    pub fn next_value(&self) -> bool {
        match self {
            CheckState::Unchecked | CheckState::PartiallyChecked => true,
            CheckState::Checked => false,
        }
    }
}

/// What the header checkbox should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderCheckbox {
    pub visible: bool,
    pub state: CheckState,
    pub disabled: bool,
}

#[derive(Debug)]
struct Connections {
    new_columns_loaded: ConnectionId,
    displayed_columns_changed: ConnectionId,
    selection_changed: ConnectionId,
    pagination_changed: ConnectionId,
    model_updated: ConnectionId,
}

/// Header-level select-all control.
#[derive(Debug)]
pub struct SelectAllFeature {
    events: Arc<GridEvents>,
    connections: Option<Connections>,
    dirty: Arc<AtomicBool>,
    checkbox: HeaderCheckbox,
}

impl SelectAllFeature {
    /// Mount on `events`. The feature starts dirty.
    pub fn new(events: Arc<GridEvents>) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let connections = Connections {
            new_columns_loaded: events.new_columns_loaded.connect(mark_dirty(&dirty)),
            displayed_columns_changed: events.displayed_columns_changed.connect(mark_dirty(&dirty)),
            selection_changed: events.selection_changed.connect(mark_dirty(&dirty)),
            pagination_changed: events.pagination_changed.connect(mark_dirty(&dirty)),
            model_updated: events.model_updated.connect(mark_dirty(&dirty)),
        };

        Self {
            events,
            connections: Some(connections),
            dirty,
            checkbox: HeaderCheckbox::default(),
        }
    }

    /// Whether a signal fired since the last refresh.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Whether the feature is still connected.
    pub fn is_mounted(&self) -> bool {
        self.connections.is_some()
    }

    /// The checkbox as of the last refresh.
    pub fn checkbox(&self) -> HeaderCheckbox {
        self.checkbox
    }

    /// The configured scope, `All` while selection is disabled.
    pub fn scope<T>(selection: &SelectionService<T>) -> SelectAllScope {
        selection
            .capabilities()
            .options()
            .map(|o| o.select_all)
            .unwrap_or_default()
    }

    /// Recompute the checkbox from the current selection.
    ///
    /// The checkbox is visible only in multi-row mode with a header checkbox
    /// configured, and disabled when nothing in scope can be selected.
    pub fn refresh<T, M: RowModel<T>>(&mut self, selection: &SelectionService<T>, model: &M) -> HeaderCheckbox {
        self.dirty.store(false, Ordering::SeqCst);
        let scope = Self::scope(selection);
        let visible = selection
            .capabilities()
            .options()
            .is_some_and(|o| o.is_multi_row() && o.header_checkbox);

        self.checkbox = HeaderCheckbox {
            visible,
            state: CheckState::from_selection(selection.get_select_all_state(model, scope)),
            disabled: !selection.has_nodes_to_select(model, scope),
        };
        self.checkbox
    }

    /// Refresh only when a signal fired since the last refresh.
    pub fn refresh_if_dirty<T, M: RowModel<T>>(&mut self, selection: &SelectionService<T>, model: &M) -> HeaderCheckbox {
        if self.is_dirty() {
            self.refresh(selection, model)
        } else {
            self.checkbox
        }
    }

    /// Handle a click on the checkbox.
    ///
    /// Returns the checkbox after the resulting selection change.
    pub fn on_toggled<T, M: RowModel<T>>(&mut self, selection: &mut SelectionService<T>, model: &mut M) -> HeaderCheckbox {
        let scope = Self::scope(selection);
        let current = CheckState::from_selection(selection.get_select_all_state(model, scope));
        let source = match scope {
            SelectAllScope::All => SelectionEventSource::UiSelectAll,
            SelectAllScope::Filtered => SelectionEventSource::UiSelectAllFiltered,
            SelectAllScope::CurrentPage => SelectionEventSource::UiSelectAllCurrentPage,
        };

        let select = current.next_value();
        tracing::debug!(target: targets::SELECT_ALL, ?scope, select, "header checkbox toggled");
        if select {
            selection.select_all_row_nodes(model, scope, source);
        } else {
            selection.deselect_all_row_nodes(model, scope, source);
        }
        self.refresh(selection, model)
    }

    /// Disconnect from every signal.
    pub fn destroy(&mut self) {
        let Some(c) = self.connections.take() else {
            return;
        };
        self.events.new_columns_loaded.disconnect(c.new_columns_loaded);
        self.events.displayed_columns_changed.disconnect(c.displayed_columns_changed);
        self.events.selection_changed.disconnect(c.selection_changed);
        self.events.pagination_changed.disconnect(c.pagination_changed);
        self.events.model_updated.disconnect(c.model_updated);
    }
}

fn mark_dirty<Args: 'static>(dirty: &Arc<AtomicBool>) -> impl Fn(&Args) + Send + Sync + 'static {
    let dirty = dirty.clone();
    move |_: &Args| dirty.store(true, Ordering::SeqCst)
}

impl Drop for SelectAllFeature {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_value() {
        assert!(CheckState::Unchecked.next_value());
        assert!(CheckState::PartiallyChecked.next_value());
        assert!(!CheckState::Checked.next_value());
    }

    #[test]
    fn test_from_selection() {
        assert_eq!(CheckState::from_selection(Some(true)), CheckState::Checked);
        assert_eq!(CheckState::from_selection(Some(false)), CheckState::Unchecked);
        assert_eq!(CheckState::from_selection(None), CheckState::PartiallyChecked);
    }

    #[test]
    fn test_signals_mark_dirty_until_destroyed() {
        let events = Arc::new(GridEvents::new());
        let mut feature = SelectAllFeature::new(events.clone());
        assert_eq!(events.selection_changed.connection_count(), 1);

        feature.dirty.store(false, Ordering::SeqCst);
        events.new_columns_loaded.emit(());
        assert!(feature.is_dirty());

        feature.dirty.store(false, Ordering::SeqCst);
        events.emit_selection_changed(SelectionEventSource::Api);
        assert!(feature.is_dirty());

        feature.destroy();
        assert!(!feature.is_mounted());
        assert_eq!(events.selection_changed.connection_count(), 0);
        assert_eq!(events.model_updated.connection_count(), 0);

        feature.dirty.store(false, Ordering::SeqCst);
        events.displayed_columns_changed.emit(());
        assert!(!feature.is_dirty());
    }

    #[test]
    fn test_drop_disconnects() {
        let events = Arc::new(GridEvents::new());
        drop(SelectAllFeature::new(events.clone()));
        assert_eq!(events.pagination_changed.connection_count(), 0);
    }
}
