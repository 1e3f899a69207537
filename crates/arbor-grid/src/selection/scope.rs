//! Select-all and deselect-all over a [`SelectAllScope`].

use arbor_core::PerfSpan;
use arbor_core::logging::span_names;

use crate::error::GridError;
use crate::events::SelectionEventSource;
use crate::node::{NodeKey, RowTree};
use crate::options::SelectAllScope;
use crate::row_model::RowModel;

use super::{SelectedNode, SelectionService};

impl<T> SelectionService<T> {
    /// The rows a select-all with `scope` acts on.
    ///
    /// For the current page, collapsed groups stand for their filtered
    /// descendants and expanded groups are listed only when their state is
    /// not derived, since their displayed children are on the page anyway.
    pub fn nodes_to_select<M: RowModel<T>>(&self, model: &M, scope: SelectAllScope) -> Vec<NodeKey> {
        let tree = model.tree();
        match scope {
            SelectAllScope::All => tree.nodes_after_group(),
            SelectAllScope::Filtered => tree.nodes_after_filter(),
            SelectAllScope::CurrentPage => {
                fn add_filtered<T>(tree: &RowTree<T>, key: NodeKey, out: &mut Vec<NodeKey>) {
                    out.push(key);
                    if let Some(node) = tree.get(key) {
                        for &child in node.children_after_filter() {
                            add_filtered(tree, child, out);
                        }
                    }
                }

                let gsd = self.caps.group_selects_descendants();
                let mut out = Vec::new();
                for key in model.nodes_on_page() {
                    let Some(node) = tree.get(key) else {
                        continue;
                    };
                    if !node.is_group() {
                        out.push(key);
                    } else if !node.is_expanded() && !node.is_footer() {
                        add_filtered(tree, key, &mut out);
                    } else if !gsd {
                        out.push(key);
                    }
                }
                out
            }
        }
    }

    /// Select every row in `scope`.
    ///
    /// Rejected with a warning in single selection mode. Always fires one
    /// `selection_changed`.
    pub fn select_all_row_nodes<M: RowModel<T>>(
        &mut self,
        model: &mut M,
        scope: SelectAllScope,
        source: SelectionEventSource,
    ) {
        if !self.is_multi_select() {
            GridError::SelectAllRequiresMultiRow.report(&self.logger);
            return;
        }
        let _perf = PerfSpan::new(span_names::SELECT_ALL);
        let nodes = self.nodes_to_select(model, scope);
        let tree = model.tree_mut();
        for key in nodes {
            let key = tree.selection_identity(key);
            self.select_row_node(tree, key, Some(true), source);
        }
        self.ctx.select_all = true;
        self.update_groups_from_children_selections(tree, source, None);
        self.events.emit_selection_changed(source);
    }

    /// Deselect every row in `scope`.
    ///
    /// The `All` scope also drops entries whose row is not in the tree, such
    /// as daemons. Always fires one `selection_changed`.
    pub fn deselect_all_row_nodes<M: RowModel<T>>(
        &mut self,
        model: &mut M,
        scope: SelectAllScope,
        source: SelectionEventSource,
    ) {
        let _perf = PerfSpan::new(span_names::SELECT_ALL);
        if scope == SelectAllScope::All {
            let tree = model.tree_mut();
            let entries = std::mem::take(&mut self.selected_nodes);
            for entry in entries.into_values() {
                if let SelectedNode::Live(key) = entry {
                    self.select_row_node(tree, key, Some(false), source);
                }
            }
        } else {
            let nodes = self.nodes_to_select(model, scope);
            let tree = model.tree_mut();
            for key in nodes {
                let key = tree.selection_identity(key);
                self.select_row_node(tree, key, Some(false), source);
            }
        }
        self.ctx.select_all = false;
        self.update_groups_from_children_selections(model.tree_mut(), source, None);
        self.events.emit_selection_changed(source);
    }

    /// Tri-state of the header checkbox for `scope`.
    ///
    /// `Some(false)` when no selectable row in scope is selected, `None` when
    /// some are, `Some(true)` when all are and there is at least one.
    pub fn get_select_all_state<M: RowModel<T>>(&self, model: &M, scope: SelectAllScope) -> Option<bool> {
        let gsd = self.caps.group_selects_descendants();
        let tree = model.tree();
        let mut selected = 0usize;
        let mut not_selected = 0usize;
        for key in self.nodes_to_select(model, scope) {
            let Some(node) = tree.get(key) else {
                continue;
            };
            if gsd && node.is_group() {
                continue;
            }
            if !node.is_selectable() {
                continue;
            }
            match tree.selected_state(key) {
                Some(true) => selected += 1,
                Some(false) => not_selected += 1,
                None => {}
            }
        }

        match (selected, not_selected) {
            (0, _) => Some(false),
            (_, 0) => Some(true),
            _ => None,
        }
    }

    /// Whether `scope` holds at least one selectable row.
    pub fn has_nodes_to_select<M: RowModel<T>>(&self, model: &M, scope: SelectAllScope) -> bool {
        let tree = model.tree();
        self.nodes_to_select(model, scope)
            .into_iter()
            .any(|key| tree.get(key).is_some_and(|n| n.is_selectable()))
    }
}
