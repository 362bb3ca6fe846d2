// B-Tree index
// Maps a column value to the ids of the rows holding it.
// Unique columns always get one; equality lookups on them skip the table scan.

use super::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct BTreeIndex {
    tree: BTreeMap<Value, Vec<usize>>,
}

impl BTreeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: Value, row_id: usize) {
        self.tree.entry(value).or_default().push(row_id);
    }

    /// Row ids holding `value`, empty when there are none
    pub fn lookup(&self, value: &Value) -> &[usize] {
        self.tree.get(value).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.tree.contains_key(value)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}
