//! Row data transactions and the diffs they produce.

use std::sync::Arc;

use indexmap::IndexSet;

use crate::node::NodeKey;

/// A batch of add/update/remove operations applied in one call.
///
/// `update` and `remove` items are matched to existing rows by the row id
/// callback when one is configured, otherwise by record identity
/// (`Arc::ptr_eq`) against the current leaves.
pub struct RowDataTransaction<T> {
    pub add: Vec<Arc<T>>,
    /// Where to insert `add`. Fractional values round up; missing, negative,
    /// NaN or out-of-range values append.
    pub add_index: Option<f64>,
    pub update: Vec<Arc<T>>,
    pub remove: Vec<Arc<T>>,
}

impl<T> Default for RowDataTransaction<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            add_index: None,
            update: Vec::new(),
            remove: Vec::new(),
        }
    }
}

impl<T> Clone for RowDataTransaction<T> {
    fn clone(&self) -> Self {
        Self {
            add: self.add.clone(),
            add_index: self.add_index,
            update: self.update.clone(),
            remove: self.remove.clone(),
        }
    }
}

impl<T> std::fmt::Debug for RowDataTransaction<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowDataTransaction")
            .field("add", &self.add.len())
            .field("add_index", &self.add_index)
            .field("update", &self.update.len())
            .field("remove", &self.remove.len())
            .finish()
    }
}

impl<T> RowDataTransaction<T> {
    /// An empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rows`.
    pub fn with_add(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.add.extend(rows);
        self
    }

    /// Insert the added rows at `index`.
    pub fn with_add_index(mut self, index: f64) -> Self {
        self.add_index = Some(index);
        self
    }

    /// Replace the data of matching rows.
    pub fn with_update(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.update.extend(rows);
        self
    }

    /// Remove matching rows.
    pub fn with_remove(mut self, rows: impl IntoIterator<Item = Arc<T>>) -> Self {
        self.remove.extend(rows);
        self
    }

    /// Total number of items.
    pub fn len(&self) -> usize {
        self.add.len() + self.update.len() + self.remove.len()
    }

    /// Whether the transaction holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A row removed by a transaction.
///
/// The node itself is gone from the arena by the time the caller sees this.
#[derive(Debug)]
pub struct RemovedRow<T> {
    pub id: Option<String>,
    pub data: Option<Arc<T>>,
}

impl<T> Clone for RemovedRow<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            data: self.data.clone(),
        }
    }
}

/// Nodes touched by a transaction, as reported to the caller.
#[derive(Debug)]
pub struct RowNodeTransaction<T> {
    pub add: Vec<NodeKey>,
    pub update: Vec<NodeKey>,
    pub remove: Vec<RemovedRow<T>>,
}

impl<T> Default for RowNodeTransaction<T> {
    fn default() -> Self {
        Self {
            add: Vec::new(),
            update: Vec::new(),
            remove: Vec::new(),
        }
    }
}

impl<T> Clone for RowNodeTransaction<T> {
    fn clone(&self) -> Self {
        Self {
            add: self.add.clone(),
            update: self.update.clone(),
            remove: self.remove.clone(),
        }
    }
}

impl<T> RowNodeTransaction<T> {
    /// Whether nothing was added, updated or removed.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }
}

/// Accumulates the node-level diff of one data change.
///
/// A node appears in at most one set: removing an added node forgets the add,
/// and updates of added nodes are not recorded separately.
#[derive(Debug, Clone, Default)]
pub struct ChangedRowNodes {
    removed: IndexSet<NodeKey>,
    updated: IndexSet<NodeKey>,
    added: IndexSet<NodeKey>,
    /// Rows were inserted before the end of the leaf array.
    pub rows_inserted: bool,
    /// The leaf order differs from a pure append of new rows.
    pub rows_order_changed: bool,
}

impl ChangedRowNodes {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a removal.
    pub fn remove(&mut self, key: NodeKey) {
        self.updated.shift_remove(&key);
        if !self.added.shift_remove(&key) {
            self.removed.insert(key);
        }
    }

    /// Record an update.
    pub fn update(&mut self, key: NodeKey) {
        if !self.added.contains(&key) {
            self.updated.insert(key);
        }
    }

    /// Record an addition.
    pub fn add(&mut self, key: NodeKey) {
        self.added.insert(key);
    }

    /// Removed nodes, in removal order.
    pub fn removed(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.removed.iter().copied()
    }

    /// Updated nodes, in update order.
    pub fn updated(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.updated.iter().copied()
    }

    /// Added nodes, in creation order.
    pub fn added(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.added.iter().copied()
    }

    /// Whether `key` was removed.
    pub fn is_removed(&self, key: NodeKey) -> bool {
        self.removed.contains(&key)
    }

    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.updated.is_empty() && self.added.is_empty() && !self.rows_order_changed
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: ChangedRowNodes) {
        for key in other.removed {
            self.remove(key);
        }
        for key in other.updated {
            self.update(key);
        }
        for key in other.added {
            self.add(key);
        }
        self.rows_inserted |= other.rows_inserted;
        self.rows_order_changed |= other.rows_order_changed;
    }
}

/// Result of a data change: what the caller sees plus the full diff.
#[derive(Debug)]
pub struct RowDataUpdate<T> {
    pub transaction: RowNodeTransaction<T>,
    pub changed: ChangedRowNodes,
}

impl<T> Default for RowDataUpdate<T> {
    fn default() -> Self {
        Self {
            transaction: RowNodeTransaction::default(),
            changed: ChangedRowNodes::default(),
        }
    }
}

impl<T> RowDataUpdate<T> {
    /// Whether the leaf order changed beyond appending rows.
    pub fn order_changed(&self) -> bool {
        self.changed.rows_order_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<NodeKey> {
        let mut map = SlotMap::<NodeKey, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_transaction_builder() {
        let tx = RowDataTransaction::new()
            .with_add([Arc::new(1), Arc::new(2)])
            .with_add_index(1.5)
            .with_remove([Arc::new(3)]);
        assert_eq!(tx.len(), 3);
        assert_eq!(tx.add_index, Some(1.5));
        assert!(!tx.is_empty());
        assert!(RowDataTransaction::<i32>::new().is_empty());
    }

    #[test]
    fn test_removing_added_node_forgets_it() {
        let k = keys(2);
        let mut changed = ChangedRowNodes::new();
        changed.add(k[0]);
        changed.update(k[0]);
        changed.remove(k[0]);
        changed.update(k[1]);
        changed.remove(k[1]);

        assert_eq!(changed.added().count(), 0);
        assert_eq!(changed.updated().count(), 0);
        assert_eq!(changed.removed().collect::<Vec<_>>(), vec![k[1]]);
        assert!(changed.is_removed(k[1]));
    }

    #[test]
    fn test_merge_keeps_flags() {
        let k = keys(2);
        let mut first = ChangedRowNodes::new();
        first.add(k[0]);
        let mut second = ChangedRowNodes::new();
        second.update(k[1]);
        second.rows_inserted = true;

        first.merge(second);
        assert_eq!(first.added().collect::<Vec<_>>(), vec![k[0]]);
        assert_eq!(first.updated().collect::<Vec<_>>(), vec![k[1]]);
        assert!(first.rows_inserted);
        assert!(!first.is_empty());
    }
}
