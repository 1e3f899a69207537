//! Turning one user gesture into a selection change.

use crate::events::SelectionEventSource;
use crate::node::NodeKey;
use crate::range_selection::RowRangeSource;
use crate::row_model::RowModel;

use super::{SelectionService, SetSelectedParams};

/// Keyboard modifiers held during a gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl Modifiers {
    /// No modifier held.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        meta: false,
    };

    /// Shift only.
    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    /// Ctrl only.
    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Meta (command) only.
    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    /// Add shift to these modifiers.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Whether ctrl or meta is held; both toggle single rows.
    pub fn toggles(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// The selection change a gesture resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSelection {
    /// Apply a range: optionally clear everything, release `deselect`,
    /// then select `select`.
    Range {
        select: Vec<NodeKey>,
        deselect: Vec<NodeKey>,
        reset: bool,
    },
    /// Set one node.
    Single {
        node: NodeKey,
        new_value: bool,
        clear_selection: bool,
    },
}

impl<T> SelectionService<T> {
    /// Whether a gesture on `key` is ignored outright.
    pub fn is_row_selection_blocked<M: RowModel<T>>(&self, model: &M, key: NodeKey) -> bool {
        match model.tree().get(key) {
            Some(node) => !node.is_selectable() || node.row_pinned().is_some() || !self.caps.is_enabled(),
            None => true,
        }
    }

    /// Resolve a gesture on `key` to a selection change.
    ///
    /// Moves the range anchor as a side effect. Returns `None` when the
    /// gesture does nothing.
    pub fn infer_node_selections<M: RowModel<T>>(
        &mut self,
        model: &M,
        key: NodeKey,
        modifiers: Modifiers,
        source: SelectionEventSource,
    ) -> Option<NodeSelection> {
        let rows: &dyn RowRangeSource = model;
        let tree = model.tree();
        let node = tree.get(key)?;
        let current = tree.selected_state(key);
        let gsd = self.caps.group_selects_descendants();
        let multi = self.is_multi_select();
        let enable_click = self.caps.enable_click_selection();
        let enable_deselection = self.caps.enable_deselection();
        let row_clicked = source == SelectionEventSource::RowClicked;

        if row_clicked && gsd && node.is_group() {
            return None;
        }
        if row_clicked && !(enable_click || enable_deselection) {
            return None;
        }

        if modifiers.shift && modifiers.toggles() && multi {
            let root = self.ctx.get_root(rows, None)?;
            if tree.selected_state(root) != Some(true) {
                let partition = self.ctx.extend(rows, key, gsd);
                return Some(NodeSelection::Range {
                    select: Vec::new(),
                    deselect: partition.keep,
                    reset: false,
                });
            }
            let partition = if self.ctx.is_in_range(rows, key) {
                self.ctx.truncate(rows, key)
            } else {
                self.ctx.extend(rows, key, gsd)
            };
            return Some(NodeSelection::Range {
                select: partition.keep,
                deselect: partition.discard,
                reset: false,
            });
        }

        if modifiers.shift && multi {
            let select_all = self.ctx.select_all;
            let fallback = if select_all { model.first_displayed_row() } else { None };
            let root = self.ctx.get_root(rows, fallback);
            let partition = if self.ctx.is_in_range(rows, key) {
                self.ctx.truncate(rows, key)
            } else {
                self.ctx.extend(rows, key, gsd)
            };
            let root_unselected = root.is_some_and(|r| tree.selected_state(r) != Some(true));
            return Some(NodeSelection::Range {
                select: partition.keep,
                deselect: partition.discard,
                reset: select_all || root_unselected,
            });
        }

        self.ctx.set_root(rows, key);
        let selected = current == Some(true);

        if modifiers.toggles() {
            if row_clicked && selected && !enable_deselection {
                return None;
            }
            return Some(NodeSelection::Single {
                node: key,
                new_value: !selected,
                clear_selection: !multi,
            });
        }

        let without_keys = self.caps.enable_selection_without_keys();
        let should_clear = row_clicked && (!without_keys || !enable_click);

        if self.caps.group_selects_filtered() && current.is_none() {
            return Some(NodeSelection::Single {
                node: key,
                new_value: false,
                clear_selection: !multi || should_clear,
            });
        }

        if row_clicked {
            let new_value = if selected { !without_keys } else { enable_click };
            // an unchanged row still clears the others when the click is exclusive
            if (new_value == selected && !should_clear)
                || (new_value && !enable_click)
                || (!new_value && !enable_deselection)
            {
                return None;
            }
            return Some(NodeSelection::Single {
                node: key,
                new_value,
                clear_selection: !multi || should_clear,
            });
        }

        Some(NodeSelection::Single {
            node: key,
            new_value: !selected,
            clear_selection: !multi || should_clear,
        })
    }

    /// Apply a gesture on `key`.
    ///
    /// Returns the number of flags that changed.
    #[tracing::instrument(skip_all, target = "arbor_grid::selection", level = "trace")]
    pub fn handle_selection_event<M: RowModel<T>>(
        &mut self,
        model: &mut M,
        key: NodeKey,
        modifiers: Modifiers,
        source: SelectionEventSource,
    ) -> usize {
        if self.is_row_selection_blocked(model, key) {
            return 0;
        }
        let Some(selection) = self.infer_node_selections(model, key, modifiers, source) else {
            return 0;
        };
        self.ctx.select_all = false;

        match selection {
            NodeSelection::Range {
                select,
                deselect,
                reset,
            } => {
                let cleared = if reset {
                    self.reset_nodes(model.tree_mut(), source)
                } else {
                    self.select_range(model, &deselect, false, source)
                };
                let selected = self.select_range(model, &select, true, source);
                if selected == 0 && reset && cleared > 0 {
                    self.events.emit_selection_changed(source);
                }
                selected
            }
            NodeSelection::Single {
                node,
                new_value,
                clear_selection,
            } => self.set_nodes_selected(
                model.tree_mut(),
                SetSelectedParams::new(vec![node], new_value, source).clear_selection(clear_selection),
            ),
        }
    }

    /// Set every node of a range, skipping groups whose state is derived.
    fn select_range<M: RowModel<T>>(
        &mut self,
        model: &mut M,
        nodes: &[NodeKey],
        value: bool,
        source: SelectionEventSource,
    ) -> usize {
        let gsd = self.caps.group_selects_descendants();
        let tree = model.tree_mut();
        let mut updated = 0;
        for &key in nodes {
            let key = tree.selection_identity(key);
            if gsd && tree.get(key).is_some_and(|n| n.is_group()) {
                continue;
            }
            if self.select_row_node(tree, key, Some(value), source) {
                updated += 1;
            }
        }
        if updated > 0 {
            self.update_groups_from_children_selections(tree, source, None);
            self.events.emit_selection_changed(source);
        }
        updated
    }
}
