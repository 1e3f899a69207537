//! Keeping each row's `selectable` flag in line with the selectability
//! callback.

use crate::changed_path::ChangedPath;
use crate::events::{SelectableChangedEvent, SelectionEventSource};
use crate::node::{NodeKey, RowTree};
use crate::options::IsRowSelectable;

use super::{ChildSelection, SelectionService, SetSelectedParams};

impl<T> SelectionService<T> {
    /// Re-evaluate the callback for one row and store the result.
    ///
    /// Returns the new selectability.
    pub fn update_row_selectable(&mut self, tree: &mut RowTree<T>, key: NodeKey, suppress_selection_update: bool) -> bool {
        let Some(node) = tree.get(key) else {
            return false;
        };
        let selectable = node.row_pinned().is_none() && self.caps.evaluate_selectable(node);
        self.set_row_selectable(tree, key, selectable, suppress_selection_update);
        selectable
    }

    /// Store a row's selectability and fire `selectable_changed` when it
    /// changed.
    ///
    /// Unless suppressed, a row that lost selectability is deselected; with
    /// derived group state the row is instead re-derived from its children.
    pub fn set_row_selectable(
        &mut self,
        tree: &mut RowTree<T>,
        key: NodeKey,
        selectable: bool,
        suppress_selection_update: bool,
    ) {
        let Some(node) = tree.get_mut(key) else {
            return;
        };
        if node.is_selectable() == selectable {
            return;
        }
        node.set_selectable_flag(selectable);
        let id = node.id().map(str::to_owned);
        let footer = node.sibling().filter(|_| !node.is_footer());
        if let Some(footer) = footer.and_then(|s| tree.get_mut(s))
            && footer.is_footer()
        {
            footer.set_selectable_flag(selectable);
        }
        self.events.selectable_changed.emit(SelectableChangedEvent {
            node: key,
            id,
            selectable,
        });

        if suppress_selection_update {
            return;
        }
        let source = SelectionEventSource::SelectableChanged;
        if self.caps.group_selects_descendants() {
            let state = self.calculate_selected_from_children(tree, key);
            self.set_nodes_selected(
                tree,
                SetSelectedParams::new(vec![key], state == ChildSelection::Selected, source),
            );
            return;
        }
        if !selectable && tree.get(key).is_some_and(|n| n.is_selected() == Some(true)) {
            self.set_nodes_selected(tree, SetSelectedParams::new(vec![key], false, source));
        }
    }

    /// Re-evaluate selectability across the tree and deselect rows that lost
    /// it.
    ///
    /// With derived group state the walk is children first and a group is
    /// selectable when any child is. An active `changed_path` limits the walk
    /// to changed groups.
    pub fn update_selectable(&mut self, tree: &mut RowTree<T>, changed_path: Option<&ChangedPath>) {
        if !self.caps.is_enabled() {
            return;
        }
        let source = SelectionEventSource::SelectableChanged;
        let skip_leaves = changed_path.is_some();
        let gsd = self.caps.group_selects_descendants();
        let root = tree.root();

        let nodes = if gsd {
            let everything = ChangedPath::everything();
            changed_path
                .unwrap_or(&everything)
                .changed_nodes_depth_first(tree, !skip_leaves)
        } else {
            tree.nodes_after_group()
        };

        let mut to_deselect = Vec::new();
        for key in nodes {
            let Some(node) = tree.get(key) else {
                continue;
            };
            if key == root || (skip_leaves && !node.is_group()) {
                continue;
            }
            if gsd && node.is_group() {
                let any_selectable = node
                    .children_after_group()
                    .iter()
                    .any(|&c| tree.get(c).is_some_and(|n| n.is_selectable()));
                self.set_row_selectable(tree, key, any_selectable, true);
                continue;
            }
            let selectable = self.update_row_selectable(tree, key, true);
            if !selectable && tree.get(key).is_some_and(|n| n.is_selected() == Some(true)) {
                to_deselect.push(key);
            }
        }

        let mut updated = 0;
        for key in to_deselect {
            if self.select_row_node(tree, key, Some(false), source) {
                updated += 1;
            }
        }
        if !skip_leaves && gsd {
            self.update_groups_from_children_selections(tree, source, None);
        }
        if updated > 0 {
            self.events.emit_selection_changed(source);
        }
    }

    /// Selectability and group states after the row model regrouped.
    pub fn update_selectable_after_grouping(&mut self, tree: &mut RowTree<T>, changed_path: Option<&ChangedPath>) {
        self.update_selectable(tree, changed_path);
        if self.caps.group_selects_descendants() {
            let source = SelectionEventSource::RowGroupChanged;
            if self.update_groups_from_children_selections(tree, source, changed_path) {
                self.events.emit_selection_changed(source);
            }
        }
    }

    /// Replace the selectability callback and re-evaluate every row.
    pub fn set_is_row_selectable(&mut self, tree: &mut RowTree<T>, callback: Option<IsRowSelectable<T>>) {
        self.caps.set_is_row_selectable(callback);
        self.update_selectable(tree, None);
    }
}
