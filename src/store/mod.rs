//! Storage engines.
//!
//! Two strategies sit behind the [`Store`] seam: [`Table`], a sorted `Vec`
//! located by binary search, and [`SparseSet`], a [`SparseMap`] trie keyed by
//! the order index. Views and external code work against [`Store`] only.
//!
//! Stores are not synchronized. Concurrent use goes through
//! [`Shared`](crate::view::Shared).

mod sparse_array;
mod sparse_map;
mod table;

use std::fmt;
use std::ops::Bound;

pub use sparse_array::SparseArray;
pub use sparse_map::{Iter as SparseMapIter, IterRev as SparseMapIterRev, SparseMap};
pub use table::Table;

use crate::order::OrderRef;

/// Object-safe interface shared by every storage engine.
///
/// Elements are kept in ascending order of [`Store::order`]. Positional
/// access counts in that order.
pub trait Store<T>: Send + Sync {
    /// The order elements are kept in; views forward it unchanged.
    fn order(&self) -> &OrderRef<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, value: &T) -> bool;

    /// Element at `index` in ascending order.
    fn get(&self, index: usize) -> Option<&T>;

    /// Adds `value`; returns `false` if the store rejected it as a duplicate.
    fn add(&mut self, value: T) -> bool;

    /// Removes one element equal to `value`.
    fn remove(&mut self, value: &T) -> bool;

    fn clear(&mut self);

    fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool);

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    /// Elements in ascending order starting at `from`.
    fn iter_from(&self, from: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_>;

    /// Elements in descending order starting at `to`.
    fn iter_back_from(&self, to: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_>;

    /// Number of elements comparing less than `value` (or less than or equal
    /// to it when `inclusive`).
    fn rank(&self, value: &T, inclusive: bool) -> usize;
}

impl<T: Send + Sync> Store<T> for Table<T> {
    fn order(&self) -> &OrderRef<T> {
        Table::order(self)
    }

    fn len(&self) -> usize {
        Table::len(self)
    }

    fn contains(&self, value: &T) -> bool {
        Table::contains(self, value)
    }

    fn get(&self, index: usize) -> Option<&T> {
        Table::get(self, index)
    }

    /// Tables keep duplicates; always `true`.
    fn add(&mut self, value: T) -> bool {
        Table::add(self, value);
        true
    }

    fn remove(&mut self, value: &T) -> bool {
        Table::remove(self, value).is_some()
    }

    fn clear(&mut self) {
        Table::clear(self);
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        Table::retain(self, keep);
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(Table::iter(self))
    }

    fn iter_from(&self, from: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(Table::iter_from(self, from))
    }

    fn iter_back_from(&self, to: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(Table::iter_back_from(self, to))
    }

    fn rank(&self, value: &T, inclusive: bool) -> usize {
        Table::rank(self, value, inclusive)
    }
}

// =============================================================================
// SparseSet
// =============================================================================

/// Set of elements in a [`SparseMap`] with unit values.
#[derive(Clone)]
pub struct SparseSet<T> {
    map: SparseMap<T, ()>,
}

impl<T> SparseSet<T> {
    pub fn new(order: OrderRef<T>) -> Self {
        Self {
            map: SparseMap::new(order),
        }
    }

    pub fn with_max_depth(order: OrderRef<T>, max_depth: usize) -> Self {
        Self {
            map: SparseMap::with_max_depth(order, max_depth),
        }
    }

    pub fn order(&self) -> &OrderRef<T> {
        self.map.order()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Adds `value` unless an equal element is present.
    pub fn insert(&mut self, value: T) -> bool {
        self.map.insert(value, ()).is_none()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.map.contains_key(value)
    }

    /// The stored element equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.map.get_key_value(value).map(|(key, _)| key)
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.map.remove(value).is_some()
    }

    /// Removes and returns the stored element equal to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        self.map.remove_entry(value).map(|(key, _)| key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        self.map.retain(|key, _| keep(key));
    }

    pub fn first(&self) -> Option<&T> {
        self.map.first_entry().map(|(key, _)| key)
    }

    pub fn last(&self) -> Option<&T> {
        self.map.last_entry().map(|(key, _)| key)
    }

    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.map.ceiling_entry(value).map(|(key, _)| key)
    }

    pub fn higher(&self, value: &T) -> Option<&T> {
        self.map.higher_entry(value).map(|(key, _)| key)
    }

    pub fn floor(&self, value: &T) -> Option<&T> {
        self.map.floor_entry(value).map(|(key, _)| key)
    }

    pub fn lower(&self, value: &T) -> Option<&T> {
        self.map.lower_entry(value).map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.map.keys()
    }

    pub fn iter_from(&self, from: Bound<&T>) -> impl Iterator<Item = &T> + '_ {
        self.map.iter_from(from).map(|(key, _)| key)
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = &T> + '_ {
        self.map.iter_rev().map(|(key, _)| key)
    }

    /// Elements in descending order starting at `to`.
    pub fn iter_back_from(&self, to: Bound<&T>) -> impl Iterator<Item = &T> + '_ {
        self.map.iter_back_from(to).map(|(key, _)| key)
    }
}

impl<T: fmt::Debug> fmt::Debug for SparseSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Send + Sync> Store<T> for SparseSet<T> {
    fn order(&self) -> &OrderRef<T> {
        SparseSet::order(self)
    }

    fn len(&self) -> usize {
        SparseSet::len(self)
    }

    fn contains(&self, value: &T) -> bool {
        SparseSet::contains(self, value)
    }

    fn get(&self, index: usize) -> Option<&T> {
        SparseSet::iter(self).nth(index)
    }

    fn add(&mut self, value: T) -> bool {
        self.insert(value)
    }

    fn remove(&mut self, value: &T) -> bool {
        SparseSet::remove(self, value)
    }

    fn clear(&mut self) {
        SparseSet::clear(self);
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool) {
        SparseSet::retain(self, keep);
    }

    fn iter(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(SparseSet::iter(self))
    }

    fn iter_from(&self, from: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(SparseSet::iter_from(self, from))
    }

    fn iter_back_from(&self, to: Bound<&T>) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(SparseSet::iter_back_from(self, to))
    }

    fn rank(&self, value: &T, inclusive: bool) -> usize {
        let order = SparseSet::order(self);
        SparseSet::iter(self)
            .take_while(|item| {
                let ordering = order.compare(item, value);
                ordering.is_lt() || (inclusive && ordering.is_eq())
            })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order;

    fn stores() -> Vec<Box<dyn Store<u32>>> {
        vec![
            Box::new(Table::new(order::natural())),
            Box::new(SparseSet::new(order::index())),
            Box::new(SparseSet::new(order::hash())),
        ]
    }

    #[test]
    fn test_store_seam() {
        for mut store in stores() {
            for value in [5, 1, 3] {
                assert!(store.add(value));
            }
            assert_eq!(store.len(), 3);
            assert!(store.contains(&3));
            assert!(!store.contains(&4));
            assert!(store.remove(&3));
            assert!(!store.remove(&3));
            store.retain(&mut |v| *v != 1);
            let left: Vec<u32> = store.iter().copied().collect();
            assert_eq!(left, vec![5]);
            store.clear();
            assert!(store.is_empty());
        }
    }

    #[test]
    fn test_ordered_stores_agree() {
        let mut table = Table::new(order::natural());
        let mut set = SparseSet::new(order::index());
        for value in [40u32, 10, 30, 20] {
            Store::add(&mut table, value);
            Store::add(&mut set, value);
        }
        let stores: [&dyn Store<u32>; 2] = [&table, &set];
        for store in stores {
            assert!(store.iter().copied().eq([10, 20, 30, 40]));
            assert_eq!(store.get(2), Some(&30));
            assert_eq!(store.get(4), None);
            assert_eq!(store.rank(&30, false), 2);
            assert_eq!(store.rank(&30, true), 3);
            assert!(store.iter_from(Bound::Excluded(&20)).copied().eq([30, 40]));
            assert!(store.iter_back_from(Bound::Included(&30)).copied().eq([30, 20, 10]));
            assert!(store.iter_back_from(Bound::Excluded(&10)).next().is_none());
        }
    }

    #[test]
    fn test_sparse_set_rejects_duplicates() {
        let mut set = SparseSet::new(order::lexical::<String>());
        assert!(set.insert("a".to_string()));
        assert!(!set.insert("a".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.take(&"a".to_string()), Some("a".to_string()));
        assert!(set.is_empty());
    }

    #[test]
    fn test_sparse_set_keeps_resident_element() {
        let mut set = SparseSet::new(order::lexical_case_insensitive::<String>());
        assert!(set.insert("Apple".to_string()));
        assert!(!set.insert("APPLE".to_string()));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&"apple".to_string()).map(String::as_str), Some("Apple"));
    }
}
