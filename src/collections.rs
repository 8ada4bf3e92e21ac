//! Ready-made collections with sensible default orders.
//!
//! - [`FastTable`]: sorted sequence (a [`Table`]), natural order by default,
//!   duplicates allowed.
//! - [`FastSet`]: set in a sparse trie, hash order by default.
//! - [`FastMap`]: map in a sparse trie, hash order by default, with
//!   [`SubMap`]/[`SubMapMut`] key ranges and an [`UnmodifiableMap`] handle.
//!
//! Every collection takes any other [`Order`](crate::order::Order) through
//! `with_order` and opens [`View`]s over itself.

use std::fmt;
use std::hash::Hash;
use std::ops::{Bound, RangeBounds};

use crate::error::{Error, Result};
use crate::order::{self, Order, OrderRef};
use crate::store::{SparseMap, SparseMapIter, SparseMapIterRev, SparseSet, Table};
use crate::view::{admits_from, admits_to, SharedMap, View};

// =============================================================================
// FastTable
// =============================================================================

/// Sorted sequence allowing duplicates.
#[derive(Clone)]
pub struct FastTable<T> {
    table: Table<T>,
}

impl<T: Ord> FastTable<T> {
    pub fn new() -> Self {
        Self::with_order(order::natural())
    }
}

impl<T: Ord> Default for FastTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FastTable<T> {
    pub fn with_order(order: OrderRef<T>) -> Self {
        Self {
            table: Table::new(order),
        }
    }

    pub fn with_capacity(order: OrderRef<T>, capacity: usize) -> Self {
        Self {
            table: Table::with_capacity(order, capacity),
        }
    }

    pub fn order(&self) -> &OrderRef<T> {
        self.table.order()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        self.table.as_slice()
    }

    /// Inserts `value` before any element comparing equal; returns its index.
    pub fn add(&mut self, value: T) -> usize {
        self.table.add(value)
    }

    /// Inserts `value` unless an equal element is present. Returns the index
    /// of the new or existing element and whether it was inserted.
    pub fn add_if_absent(&mut self, value: T) -> (usize, bool) {
        self.table.add_if_absent(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.table.contains(value)
    }

    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.table.index_of(value)
    }

    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        self.table.last_index_of(value)
    }

    /// Removes the first element equal to `value`.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        self.table.remove(value)
    }

    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        let len = self.table.len();
        self.table
            .remove_at(index)
            .ok_or(Error::IndexOutOfBounds { index, len })
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.table.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.table.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.table.last()
    }

    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.table.ceiling(value)
    }

    pub fn higher(&self, value: &T) -> Option<&T> {
        self.table.higher(value)
    }

    pub fn floor(&self, value: &T) -> Option<&T> {
        self.table.floor(value)
    }

    pub fn lower(&self, value: &T) -> Option<&T> {
        self.table.lower(value)
    }

    pub fn range<'a, R: RangeBounds<&'a T>>(&self, range: R) -> &[T]
    where
        T: 'a,
    {
        self.table.range(range)
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.table.retain(keep);
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.table.iter()
    }

    pub fn iter_from(&self, from: Bound<&T>) -> std::slice::Iter<'_, T> {
        self.table.iter_from(from)
    }

    /// Elements admitted by `to`, last first.
    pub fn iter_back_from(&self, to: Bound<&T>) -> std::iter::Rev<std::slice::Iter<'_, T>> {
        self.table.iter_back_from(to)
    }
}

impl<T: Clone + Send + Sync> FastTable<T> {
    /// Read-only view borrowing the table.
    pub fn view(&self) -> View<'_, T> {
        View::borrowed(&self.table)
    }

    /// View writing through to the table.
    pub fn view_mut(&mut self) -> View<'_, T> {
        View::exclusive(&mut self.table)
    }

    pub fn into_view<'a>(self) -> View<'a, T>
    where
        T: 'a,
    {
        View::owned(Box::new(self.table))
    }

    /// Owned view refusing every mutation.
    pub fn freeze<'a>(self) -> View<'a, T>
    where
        T: 'a,
    {
        self.into_view().unmodifiable()
    }
}

impl<T: Ord> FromIterator<T> for FastTable<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<T> Extend<T> for FastTable<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.table.add(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a FastTable<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for FastTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.table, f)
    }
}

// =============================================================================
// FastSet
// =============================================================================

/// Set stored in a sparse trie keyed by the order index.
#[derive(Clone)]
pub struct FastSet<T> {
    set: SparseSet<T>,
}

impl<T: Hash + Eq> FastSet<T> {
    pub fn new() -> Self {
        Self::with_order(order::hash())
    }
}

impl<T: Hash + Eq> Default for FastSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FastSet<T> {
    pub fn with_order(order: OrderRef<T>) -> Self {
        Self {
            set: SparseSet::new(order),
        }
    }

    pub fn order(&self) -> &OrderRef<T> {
        self.set.order()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Adds `value`; returns `false` if an equal element is already present.
    pub fn insert(&mut self, value: T) -> bool {
        self.set.insert(value)
    }

    pub fn contains(&self, value: &T) -> bool {
        self.set.contains(value)
    }

    /// The stored element equal to `value`.
    pub fn get(&self, value: &T) -> Option<&T> {
        self.set.get(value)
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.set.remove(value)
    }

    pub fn take(&mut self, value: &T) -> Option<T> {
        self.set.take(value)
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.set.retain(keep);
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    pub fn first(&self) -> Option<&T> {
        self.set.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.set.last()
    }

    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.set.ceiling(value)
    }

    pub fn higher(&self, value: &T) -> Option<&T> {
        self.set.higher(value)
    }

    pub fn floor(&self, value: &T) -> Option<&T> {
        self.set.floor(value)
    }

    pub fn lower(&self, value: &T) -> Option<&T> {
        self.set.lower(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.set.iter()
    }

    pub fn iter_from(&self, from: Bound<&T>) -> impl Iterator<Item = &T> + '_ {
        self.set.iter_from(from)
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = &T> + '_ {
        self.set.iter_rev()
    }

    /// Elements admitted by `to`, in descending order.
    pub fn iter_back_from(&self, to: Bound<&T>) -> impl Iterator<Item = &T> + '_ {
        self.set.iter_back_from(to)
    }
}

impl<T: Clone + Send + Sync> FastSet<T> {
    pub fn view(&self) -> View<'_, T> {
        View::borrowed(&self.set)
    }

    pub fn view_mut(&mut self) -> View<'_, T> {
        View::exclusive(&mut self.set)
    }

    pub fn into_view<'a>(self) -> View<'a, T>
    where
        T: 'a,
    {
        View::owned(Box::new(self.set))
    }

    pub fn freeze<'a>(self) -> View<'a, T>
    where
        T: 'a,
    {
        self.into_view().unmodifiable()
    }
}

impl<T: Hash + Eq> FromIterator<T> for FastSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T> Extend<T> for FastSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.set.insert(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for FastSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.set, f)
    }
}

// =============================================================================
// FastMap
// =============================================================================

/// Map stored in a sparse trie keyed by the key order's index.
#[derive(Clone)]
pub struct FastMap<K, V> {
    map: SparseMap<K, V>,
}

impl<K: Hash + Eq, V> FastMap<K, V> {
    pub fn new() -> Self {
        Self::with_order(order::hash())
    }
}

impl<K: Hash + Eq, V> Default for FastMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FastMap<K, V> {
    pub fn with_order(order: OrderRef<K>) -> Self {
        Self {
            map: SparseMap::new(order),
        }
    }

    pub fn order(&self) -> &OrderRef<K> {
        self.map.order()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inserts or replaces; returns the replaced value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map.get_mut(key)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.map.get_key_value(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.map.remove_entry(key)
    }

    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.map.retain(keep);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.map.first_entry()
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.map.last_entry()
    }

    pub fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.map.ceiling_entry(key)
    }

    pub fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.map.higher_entry(key)
    }

    pub fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.map.floor_entry(key)
    }

    pub fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.map.lower_entry(key)
    }

    pub fn iter(&self) -> SparseMapIter<'_, K, V> {
        self.map.iter()
    }

    pub fn iter_from(&self, from: Bound<&K>) -> SparseMapIter<'_, K, V> {
        self.map.iter_from(from)
    }

    pub fn iter_rev(&self) -> SparseMapIterRev<'_, K, V> {
        self.map.iter_rev()
    }

    /// Entries whose keys are admitted by `to`, in descending key order.
    pub fn iter_back_from(&self, to: Bound<&K>) -> SparseMapIterRev<'_, K, V> {
        self.map.iter_back_from(to)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.map.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.map.values()
    }

    /// Entries whose keys lie between `from` and `to`, borrowing the map.
    pub fn sub_map(&self, from: Bound<K>, to: Bound<K>) -> SubMap<'_, K, V> {
        SubMap {
            map: &self.map,
            range: KeyRange { from, to },
        }
    }

    /// Like [`FastMap::sub_map`], but writes through to the map. Insertions
    /// and removals are confined to the key range.
    pub fn sub_map_mut(&mut self, from: Bound<K>, to: Bound<K>) -> SubMapMut<'_, K, V> {
        SubMapMut {
            map: &mut self.map,
            range: KeyRange { from, to },
        }
    }

    /// Read-only handle; its mutators fail with [`Error::Immutable`].
    pub fn unmodifiable(&self) -> UnmodifiableMap<'_, K, V> {
        UnmodifiableMap { map: &self.map }
    }
}

impl<K: Send + Sync, V: Send + Sync> FastMap<K, V> {
    /// Moves the map behind a lock shared by every clone of the handle.
    pub fn shared(self) -> SharedMap<K, V> {
        SharedMap::new(self)
    }
}

impl<K: Hash + Eq, V> FromIterator<(K, V)> for FastMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V> Extend<(K, V)> for FastMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.map.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a FastMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = SparseMapIter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for FastMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.map, f)
    }
}

/// Lower and upper key bounds of a sub-map.
struct KeyRange<K> {
    from: Bound<K>,
    to: Bound<K>,
}

impl<K> KeyRange<K> {
    fn admits(&self, order: &dyn Order<K>, key: &K) -> bool {
        admits_from(order, self.from.as_ref(), key) && admits_to(order, self.to.as_ref(), key)
    }

    fn iter<'a, 'm: 'a, V>(
        &'a self,
        map: &'m SparseMap<K, V>,
    ) -> impl Iterator<Item = (&'m K, &'m V)> + 'a {
        let order = &**map.order();
        map.iter_from(self.from.as_ref())
            .take_while(move |(key, _)| admits_to(order, self.to.as_ref(), key))
    }

    fn iter_rev<'a, 'm: 'a, V>(
        &'a self,
        map: &'m SparseMap<K, V>,
    ) -> impl Iterator<Item = (&'m K, &'m V)> + 'a {
        let order = &**map.order();
        map.iter_back_from(self.to.as_ref())
            .take_while(move |(key, _)| admits_from(order, self.from.as_ref(), key))
    }
}

/// Key range of a [`FastMap`]; see [`FastMap::sub_map`].
pub struct SubMap<'m, K, V> {
    map: &'m SparseMap<K, V>,
    range: KeyRange<K>,
}

impl<'m, K, V> SubMap<'m, K, V> {
    fn admits(&self, key: &K) -> bool {
        self.range.admits(&**self.map.order(), key)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.admits(key) && self.map.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&'m V> {
        if !self.admits(key) {
            return None;
        }
        self.map.get(key)
    }

    pub fn first_entry(&self) -> Option<(&'m K, &'m V)> {
        self.iter().next()
    }

    pub fn last_entry(&self) -> Option<(&'m K, &'m V)> {
        self.iter_rev().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'m K, &'m V)> + '_ {
        self.range.iter(self.map)
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = (&'m K, &'m V)> + '_ {
        self.range.iter_rev(self.map)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SubMap<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Writable key range of a [`FastMap`]; see [`FastMap::sub_map_mut`].
pub struct SubMapMut<'m, K, V> {
    map: &'m mut SparseMap<K, V>,
    range: KeyRange<K>,
}

impl<K, V> SubMapMut<'_, K, V> {
    fn admits(&self, key: &K) -> bool {
        self.range.admits(&**self.map.order(), key)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.admits(key) && self.map.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        if !self.admits(key) {
            return None;
        }
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.admits(key) {
            return None;
        }
        self.map.get_mut(key)
    }

    /// Inserts or replaces; returns the replaced value. A key outside the
    /// range is not inserted and the pair is handed back.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, (K, V)> {
        if !self.admits(&key) {
            return Err((key, value));
        }
        Ok(self.map.insert(key, value))
    }

    /// Removes `key` if it lies in the range.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.admits(key) {
            return None;
        }
        self.map.remove(key)
    }

    /// Drops the in-range entries rejected by `keep`. Entries outside the
    /// range are not visited.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        let order = self.map.order().clone();
        let range = &self.range;
        self.map
            .retain(|key, value| !range.admits(&*order, key) || keep(key, value));
    }

    pub fn clear(&mut self) {
        self.retain(|_, _| false);
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.iter_rev().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.range.iter(&*self.map)
    }

    pub fn iter_rev(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.range.iter_rev(&*self.map)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SubMapMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Read-only handle over a [`FastMap`]; see [`FastMap::unmodifiable`].
pub struct UnmodifiableMap<'m, K, V> {
    map: &'m SparseMap<K, V>,
}

impl<'m, K, V> UnmodifiableMap<'m, K, V> {
    pub fn order(&self) -> &OrderRef<K> {
        self.map.order()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&'m V> {
        self.map.get(key)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&'m K, &'m V)> {
        self.map.get_key_value(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn first_entry(&self) -> Option<(&'m K, &'m V)> {
        self.map.first_entry()
    }

    pub fn last_entry(&self) -> Option<(&'m K, &'m V)> {
        self.map.last_entry()
    }

    pub fn ceiling_entry(&self, key: &K) -> Option<(&'m K, &'m V)> {
        self.map.ceiling_entry(key)
    }

    pub fn floor_entry(&self, key: &K) -> Option<(&'m K, &'m V)> {
        self.map.floor_entry(key)
    }

    pub fn iter(&self) -> SparseMapIter<'m, K, V> {
        self.map.iter()
    }

    pub fn iter_from(&self, from: Bound<&K>) -> SparseMapIter<'m, K, V> {
        self.map.iter_from(from)
    }

    pub fn iter_rev(&self) -> SparseMapIterRev<'m, K, V> {
        self.map.iter_rev()
    }

    pub fn insert(&mut self, _key: K, _value: V) -> Result<Option<V>> {
        Err(Error::Immutable)
    }

    pub fn remove(&mut self, _key: &K) -> Result<Option<V>> {
        Err(Error::Immutable)
    }

    pub fn retain(&mut self, _keep: impl FnMut(&K, &mut V) -> bool) -> Result<()> {
        Err(Error::Immutable)
    }

    pub fn clear(&mut self) -> Result<()> {
        Err(Error::Immutable)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for UnmodifiableMap<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.map, f)
    }
}
