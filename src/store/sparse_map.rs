//! Ordered map on top of [`SparseArray`], keyed by an [`Order`] index.
//!
//! Each level of the map is a sparse array keyed by the index of its order.
//! Keys colliding on an index move into a nested level keyed by their
//! sub-order, so long keys (strings, Morton codes) are told apart one index
//! at a time. When an order cannot refine further, or the nesting depth cap
//! is reached, colliding keys are kept in a bucket sorted by the level's
//! comparator.
//!
//! Invariants:
//! - a nested level (or bucket) never holds a single entry;
//! - iterating cells in index order, entries inside a nested level in its own
//!   order and buckets front to back yields keys in ascending order of the
//!   map's order.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Rev;
use std::ops::Bound;
use std::sync::Arc;

use smallvec::SmallVec;

use super::sparse_array::{self, SparseArray};
use crate::order::{Order, OrderRef};

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    #[inline]
    fn pair(&self) -> (&K, &V) {
        (&self.key, &self.value)
    }
}

#[derive(Clone)]
enum Cell<K, V> {
    Entry(Entry<K, V>),
    Nested(Box<Level<K, V>>),
    Bucket(Vec<Entry<K, V>>),
}

impl<K, V> Cell<K, V> {
    fn max(&self) -> &Entry<K, V> {
        let mut cell = self;
        loop {
            match cell {
                Cell::Entry(entry) => return entry,
                Cell::Bucket(bucket) => return bucket.last().expect("buckets are never empty"),
                Cell::Nested(level) => {
                    cell = level.cells.last().expect("nested levels are never empty").1
                }
            }
        }
    }
}

#[derive(Clone)]
struct Level<K, V> {
    order: OrderRef<K>,
    cells: SparseArray<Cell<K, V>>,
}

impl<K, V> Level<K, V> {
    fn new(order: OrderRef<K>) -> Self {
        Self {
            order,
            cells: SparseArray::new(),
        }
    }

    fn iter(&self) -> Iter<'_, K, V> {
        let mut stack = SmallVec::new();
        stack.push(Cursor::Trie(self.cells.iter()));
        Iter { stack }
    }

    fn iter_rev(&self) -> IterRev<'_, K, V> {
        let mut stack = SmallVec::new();
        stack.push(CursorRev::Trie(self.cells.iter_rev()));
        IterRev { stack }
    }

    /// Consumes the level, returning its entries in no particular order.
    fn into_entries(self) -> Vec<Entry<K, V>> {
        let mut entries = Vec::new();
        let mut pending = vec![self];
        while let Some(level) = pending.pop() {
            for (_, cell) in level.cells {
                match cell {
                    Cell::Entry(entry) => entries.push(entry),
                    Cell::Bucket(bucket) => entries.extend(bucket),
                    Cell::Nested(nested) => pending.push(*nested),
                }
            }
        }
        entries
    }

    /// Removes entries rejected by `keep`; returns how many were removed.
    // Recursion is bounded by the nesting depth cap.
    fn retain<F: FnMut(&K, &mut V) -> bool>(&mut self, keep: &mut F) -> usize {
        let mut removed = 0;
        self.cells.retain(|_, cell| match cell {
            Cell::Entry(entry) => {
                let kept = keep(&entry.key, &mut entry.value);
                if !kept {
                    removed += 1;
                }
                kept
            }
            Cell::Bucket(bucket) => {
                let before = bucket.len();
                bucket.retain_mut(|entry| keep(&entry.key, &mut entry.value));
                removed += before - bucket.len();
                match bucket.len() {
                    0 => false,
                    1 => {
                        let single = bucket.pop().expect("length checked");
                        *cell = Cell::Entry(single);
                        true
                    }
                    _ => true,
                }
            }
            Cell::Nested(nested) => {
                removed += nested.retain(&mut *keep);
                match nested.iter().take(2).count() {
                    0 => false,
                    1 => {
                        let order = Arc::clone(&nested.order);
                        let single = std::mem::replace(&mut **nested, Level::new(order))
                            .into_entries()
                            .pop()
                            .expect("length checked");
                        *cell = Cell::Entry(single);
                        true
                    }
                    _ => true,
                }
            }
        });
        removed
    }
}

/// Position of `key` in a sorted bucket: `Ok` when an equal key is present,
/// otherwise `Err` with the insertion slot (after any compare-equal run).
fn search_bucket<K, V>(order: &dyn Order<K>, bucket: &[Entry<K, V>], key: &K) -> Result<usize, usize> {
    let start = bucket.partition_point(|entry| order.compare(&entry.key, key) == Ordering::Less);
    let mut slot = start;
    for entry in &bucket[start..] {
        if order.compare(&entry.key, key) != Ordering::Equal {
            break;
        }
        if order.are_equal(&entry.key, key) {
            return Ok(slot);
        }
        slot += 1;
    }
    Err(slot)
}

#[inline]
fn admits_from(ordering: Ordering, inclusive: bool) -> bool {
    match ordering {
        Ordering::Greater => true,
        Ordering::Equal => inclusive,
        Ordering::Less => false,
    }
}

#[inline]
fn admits_to(ordering: Ordering, inclusive: bool) -> bool {
    admits_from(ordering.reverse(), inclusive)
}

/// Ordered map whose key order, equality and indexing are supplied by an
/// [`Order`].
///
/// ```
/// use ordex::order;
/// use ordex::store::SparseMap;
///
/// let mut map = SparseMap::new(order::lexical::<String>());
/// map.insert("beta".to_string(), 2);
/// map.insert("alpha".to_string(), 1);
/// map.insert("alphabet".to_string(), 3);
///
/// let keys: Vec<&str> = map.keys().map(String::as_str).collect();
/// assert_eq!(keys, ["alpha", "alphabet", "beta"]);
/// assert_eq!(map.ceiling_entry(&"alphas".to_string()).map(|(_, v)| *v), Some(2));
/// ```
#[derive(Clone)]
pub struct SparseMap<K, V> {
    root: Level<K, V>,
    len: usize,
    max_depth: usize,
}

impl<K, V> SparseMap<K, V> {
    /// Creates an empty map nesting at most
    /// [`Config::max_nesting_depth`](crate::Config::max_nesting_depth) levels.
    pub fn new(order: OrderRef<K>) -> Self {
        Self::with_max_depth(order, crate::config::global().max_nesting_depth)
    }

    /// Creates an empty map with its own nesting depth cap.
    pub fn with_max_depth(order: OrderRef<K>, max_depth: usize) -> Self {
        Self {
            root: Level::new(order),
            len: 0,
            max_depth,
        }
    }

    pub fn order(&self) -> &OrderRef<K> {
        &self.root.order
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.root.cells.clear();
        self.len = 0;
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let mut level = &self.root;
        loop {
            if level.order.is_sequential() {
                return None;
            }
            match level.cells.get(level.order.index_of(key))? {
                Cell::Entry(entry) => {
                    return level.order.are_equal(&entry.key, key).then(|| entry.pair());
                }
                Cell::Bucket(bucket) => {
                    let at = search_bucket(&*level.order, bucket, key).ok()?;
                    return Some(bucket[at].pair());
                }
                Cell::Nested(nested) => level = &**nested,
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get_key_value(key).is_some()
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let mut level = &mut self.root;
        loop {
            if level.order.is_sequential() {
                return None;
            }
            let index = level.order.index_of(key);
            match level.cells.get_mut(index)? {
                Cell::Entry(entry) => {
                    return level.order.are_equal(&entry.key, key).then_some(&mut entry.value);
                }
                Cell::Bucket(bucket) => {
                    let at = search_bucket(&*level.order, bucket, key).ok()?;
                    return Some(&mut bucket[at].value);
                }
                Cell::Nested(nested) => level = &mut **nested,
            }
        }
    }

    /// Inserts `key`, replacing (and returning) the value of an equal key.
    /// The resident key is kept.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let max_depth = self.max_depth;
        let mut level = &mut self.root;
        let mut depth = 0;
        loop {
            let index = level.order.index_of(&key);
            let descend = match level.cells.get_mut(index) {
                None => {
                    level.cells.insert(index, Cell::Entry(Entry { key, value }));
                    self.len += 1;
                    return None;
                }
                Some(Cell::Entry(entry)) if level.order.are_equal(&entry.key, &key) => {
                    return Some(std::mem::replace(&mut entry.value, value));
                }
                Some(Cell::Entry(_)) => false,
                Some(Cell::Bucket(bucket)) => {
                    match search_bucket(&*level.order, bucket, &key) {
                        Ok(at) => return Some(std::mem::replace(&mut bucket[at].value, value)),
                        Err(at) => bucket.insert(at, Entry { key, value }),
                    }
                    self.len += 1;
                    return None;
                }
                Some(Cell::Nested(_)) => true,
            };

            if descend {
                let Some(Cell::Nested(nested)) = level.cells.get_mut(index) else {
                    unreachable!()
                };
                level = &mut **nested;
                depth += 1;
                continue;
            }

            // Collision with a single resident: split the cell and retry.
            let Some(Cell::Entry(resident)) = level.cells.remove(index) else {
                unreachable!()
            };
            let sub_order = level
                .order
                .sub_order(&key)
                .or_else(|| level.order.sub_order(&resident.key));
            let cell = match sub_order {
                Some(order) if depth < max_depth => {
                    let mut nested = Level::new(order);
                    let at = nested.order.index_of(&resident.key);
                    nested.cells.insert(at, Cell::Entry(resident));
                    Cell::Nested(Box::new(nested))
                }
                refinement => {
                    tracing::debug!(
                        depth,
                        index,
                        refinable = refinement.is_some(),
                        "index collision kept in a sorted bucket"
                    );
                    Cell::Bucket(vec![resident])
                }
            };
            level.cells.insert(index, cell);
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        if !self.contains_key(key) {
            return None;
        }
        // The key is present, so no level on its path is sequential.
        let mut level = &mut self.root;
        let removed = loop {
            let index = level.order.index_of(key);
            match level.cells.get_mut(index).expect("key located by lookup") {
                Cell::Entry(_) => {
                    let Some(Cell::Entry(entry)) = level.cells.remove(index) else {
                        unreachable!()
                    };
                    break entry;
                }
                Cell::Bucket(bucket) => {
                    let at = search_bucket(&*level.order, bucket, key)
                        .expect("key located by lookup");
                    let entry = bucket.remove(at);
                    if bucket.len() == 1 {
                        let single = bucket.pop().expect("length checked");
                        level.cells.insert(index, Cell::Entry(single));
                    }
                    break entry;
                }
                Cell::Nested(nested) if nested.iter().take(3).count() == 2 => {
                    // The nested level would be left with one entry: dissolve it.
                    let Some(Cell::Nested(nested)) = level.cells.remove(index) else {
                        unreachable!()
                    };
                    let order = Arc::clone(&nested.order);
                    let mut entries = nested.into_entries();
                    let at = entries
                        .iter()
                        .position(|entry| order.are_equal(&entry.key, key))
                        .expect("key located by lookup");
                    let entry = entries.swap_remove(at);
                    let single = entries.pop().expect("two entries");
                    level.cells.insert(index, Cell::Entry(single));
                    break entry;
                }
                Cell::Nested(_) => {}
            }
            let Some(Cell::Nested(nested)) = level.cells.get_mut(index) else {
                unreachable!()
            };
            level = &mut **nested;
        };
        self.len -= 1;
        Some((removed.key, removed.value))
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        let removed = self.root.retain(&mut keep);
        self.len -= removed;
    }

    pub fn first_entry(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    pub fn last_entry(&self) -> Option<(&K, &V)> {
        self.root.cells.last().map(|(_, cell)| cell.max().pair())
    }

    /// Least entry with a key `>= key`.
    pub fn ceiling_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.iter_from(Bound::Included(key)).next()
    }

    /// Least entry with a key `> key`.
    pub fn higher_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.iter_from(Bound::Excluded(key)).next()
    }

    /// Greatest entry with a key `<= key`.
    pub fn floor_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek_back(key, true)
    }

    /// Greatest entry with a key `< key`.
    pub fn lower_entry(&self, key: &K) -> Option<(&K, &V)> {
        self.seek_back(key, false)
    }

    fn seek_back(&self, key: &K, inclusive: bool) -> Option<(&K, &V)> {
        let mut level = &self.root;
        // Cell whose greatest entry is the best answer found so far.
        let mut best: Option<&Cell<K, V>> = None;
        loop {
            if level.order.is_sequential() {
                // Every entry of a sequential level compares equal to `key`.
                if inclusive {
                    if let Some((_, cell)) = level.cells.last() {
                        return Some(cell.max().pair());
                    }
                }
                break;
            }
            let index = level.order.index_of(key);
            if let Some((_, cell)) = index.checked_sub(1).and_then(|before| level.cells.floor(before)) {
                best = Some(cell);
            }
            match level.cells.get(index) {
                None => break,
                Some(Cell::Entry(entry)) => {
                    if admits_to(level.order.compare(&entry.key, key), inclusive) {
                        return Some(entry.pair());
                    }
                    break;
                }
                Some(Cell::Bucket(bucket)) => {
                    let end = bucket.partition_point(|entry| {
                        admits_to(level.order.compare(&entry.key, key), inclusive)
                    });
                    if end > 0 {
                        return Some(bucket[end - 1].pair());
                    }
                    break;
                }
                Some(Cell::Nested(nested)) => level = &**nested,
            }
        }
        best.map(|cell| cell.max().pair())
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.root.iter()
    }

    /// Iterates entries in ascending order starting at `from`.
    pub fn iter_from(&self, from: Bound<&K>) -> Iter<'_, K, V> {
        let (key, inclusive) = match from {
            Bound::Unbounded => return self.iter(),
            Bound::Included(key) => (key, true),
            Bound::Excluded(key) => (key, false),
        };
        let mut stack = SmallVec::new();
        let mut level = &self.root;
        loop {
            if level.order.is_sequential() {
                if inclusive {
                    stack.push(Cursor::Trie(level.cells.iter()));
                }
                break;
            }
            let index = level.order.index_of(key);
            if let Some(after) = index.checked_add(1) {
                stack.push(Cursor::Trie(level.cells.iter_from(after)));
            }
            match level.cells.get(index) {
                None => break,
                Some(Cell::Entry(entry)) => {
                    if admits_from(level.order.compare(&entry.key, key), inclusive) {
                        stack.push(Cursor::Bucket(std::slice::from_ref(entry).iter()));
                    }
                    break;
                }
                Some(Cell::Bucket(bucket)) => {
                    let start = bucket.partition_point(|entry| {
                        !admits_from(level.order.compare(&entry.key, key), inclusive)
                    });
                    stack.push(Cursor::Bucket(bucket[start..].iter()));
                    break;
                }
                Some(Cell::Nested(nested)) => level = &**nested,
            }
        }
        Iter { stack }
    }

    /// Iterates entries in descending order.
    pub fn iter_rev(&self) -> IterRev<'_, K, V> {
        self.root.iter_rev()
    }

    /// Iterates entries in descending order starting at `to`.
    pub fn iter_back_from(&self, to: Bound<&K>) -> IterRev<'_, K, V> {
        let (key, inclusive) = match to {
            Bound::Unbounded => return self.iter_rev(),
            Bound::Included(key) => (key, true),
            Bound::Excluded(key) => (key, false),
        };
        let mut stack = SmallVec::new();
        let mut level = &self.root;
        loop {
            if level.order.is_sequential() {
                if inclusive {
                    stack.push(CursorRev::Trie(level.cells.iter_rev()));
                }
                break;
            }
            let index = level.order.index_of(key);
            if let Some(before) = index.checked_sub(1) {
                stack.push(CursorRev::Trie(level.cells.iter_back_from(before)));
            }
            match level.cells.get(index) {
                None => break,
                Some(Cell::Entry(entry)) => {
                    if admits_to(level.order.compare(&entry.key, key), inclusive) {
                        stack.push(CursorRev::Bucket(std::slice::from_ref(entry).iter().rev()));
                    }
                    break;
                }
                Some(Cell::Bucket(bucket)) => {
                    let end = bucket.partition_point(|entry| {
                        admits_to(level.order.compare(&entry.key, key), inclusive)
                    });
                    stack.push(CursorRev::Bucket(bucket[..end].iter().rev()));
                    break;
                }
                Some(Cell::Nested(nested)) => level = &**nested,
            }
        }
        IterRev { stack }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SparseMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a SparseMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

enum Cursor<'a, K, V> {
    Trie(sparse_array::Iter<'a, Cell<K, V>>),
    Bucket(std::slice::Iter<'a, Entry<K, V>>),
}

/// Ascending iterator over the entries of a [`SparseMap`].
pub struct Iter<'a, K, V> {
    /// Open levels and buckets, innermost last.
    stack: SmallVec<[Cursor<'a, K, V>; 4]>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cell = match self.stack.last_mut()? {
                Cursor::Bucket(entries) => match entries.next() {
                    Some(entry) => return Some(entry.pair()),
                    None => {
                        self.stack.pop();
                        continue;
                    }
                },
                Cursor::Trie(cells) => match cells.next() {
                    Some((_, cell)) => cell,
                    None => {
                        self.stack.pop();
                        continue;
                    }
                },
            };
            match cell {
                Cell::Entry(entry) => return Some(entry.pair()),
                Cell::Bucket(bucket) => self.stack.push(Cursor::Bucket(bucket.iter())),
                Cell::Nested(level) => self.stack.push(Cursor::Trie(level.cells.iter())),
            }
        }
    }
}

enum CursorRev<'a, K, V> {
    Trie(sparse_array::IterRev<'a, Cell<K, V>>),
    Bucket(Rev<std::slice::Iter<'a, Entry<K, V>>>),
}

/// Descending iterator over the entries of a [`SparseMap`].
pub struct IterRev<'a, K, V> {
    stack: SmallVec<[CursorRev<'a, K, V>; 4]>,
}

impl<'a, K, V> Iterator for IterRev<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let cell = match self.stack.last_mut()? {
                CursorRev::Bucket(entries) => match entries.next() {
                    Some(entry) => return Some(entry.pair()),
                    None => {
                        self.stack.pop();
                        continue;
                    }
                },
                CursorRev::Trie(cells) => match cells.next() {
                    Some((_, cell)) => cell,
                    None => {
                        self.stack.pop();
                        continue;
                    }
                },
            };
            match cell {
                Cell::Entry(entry) => return Some(entry.pair()),
                Cell::Bucket(bucket) => self.stack.push(CursorRev::Bucket(bucket.iter().rev())),
                Cell::Nested(level) => self.stack.push(CursorRev::Trie(level.cells.iter_rev())),
            }
        }
    }
}
