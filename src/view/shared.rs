//! Collections shared between threads behind a [`SharedLock`].
//!
//! [`Shared`] owns a value and hands out access for the duration of one
//! closure call: reads under the read lock, writes under the write lock.
//! Nothing borrowed escapes a call, so iteration returns snapshots taken under
//! the read lock. Concurrent writes may or may not be visible to a snapshot
//! taken earlier, but a snapshot never observes a half-applied write.
//!
//! [`Shared::atomic`] holds the write lock across a batch of calls. The write
//! lock is re-entrant, so calls (and nested batches) inside a batch proceed
//! on the holding thread while every other thread waits.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;

use super::View;
use crate::collections::FastMap;
use crate::error::Result;
use crate::lock::SharedLock;
use crate::order::OrderRef;

/// Outstanding borrows of a [`Shared`] value: `n > 0` shared, `-1` exclusive.
struct BorrowFlag(AtomicIsize);

impl BorrowFlag {
    const EXCLUSIVE: isize = -1;

    fn shared(&self) -> SharedBorrow<'_> {
        if self.0.fetch_add(1, Ordering::Acquire) < 0 {
            self.0.fetch_sub(1, Ordering::Release);
            panic!("shared collection accessed while it is being modified");
        }
        SharedBorrow(self)
    }

    fn exclusive(&self) -> ExclusiveBorrow<'_> {
        if self
            .0
            .compare_exchange(0, Self::EXCLUSIVE, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            panic!("shared collection modified while it is being accessed");
        }
        ExclusiveBorrow(self)
    }
}

struct SharedBorrow<'a>(&'a BorrowFlag);

impl Drop for SharedBorrow<'_> {
    fn drop(&mut self) {
        self.0 .0.fetch_sub(1, Ordering::Release);
    }
}

struct ExclusiveBorrow<'a>(&'a BorrowFlag);

impl Drop for ExclusiveBorrow<'_> {
    fn drop(&mut self) {
        self.0 .0.store(0, Ordering::Release);
    }
}

/// A value guarded by a [`SharedLock`].
///
/// Only the thread holding the write lock can re-enter while a call is in
/// progress (from a closure passed to `retain` or a mapping function, say).
/// Such re-entry panics when it would alias the value being modified.
pub struct Shared<S> {
    lock: SharedLock,
    borrows: BorrowFlag,
    value: UnsafeCell<S>,
}

// SAFETY: `value` is only reached through `read` and `write`. `write` holds
// the write lock, which excludes every other thread, and the borrow flag
// rejects a second borrow on the holding thread, so `&mut S` is unique.
// `read` holds a read lock (or is the write-lock holder, checked by the flag),
// so `&S` only coexists with other `&S`, which needs `S: Sync`; moving the
// value's ownership between threads through `write` needs `S: Send`.
unsafe impl<S: Send + Sync> Sync for Shared<S> {}

impl<S> Shared<S> {
    pub fn new(value: S) -> Self {
        Self {
            lock: SharedLock::new(),
            borrows: BorrowFlag(AtomicIsize::new(0)),
            value: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> &SharedLock {
        &self.lock
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let _guard = self.lock.read();
        let _borrow = self.borrows.shared();
        // SAFETY: see the `Sync` impl; no exclusive borrow is live.
        f(unsafe { &*self.value.get() })
    }

    pub(crate) fn write<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let _guard = self.lock.write();
        let _borrow = self.borrows.exclusive();
        // SAFETY: see the `Sync` impl; this is the only borrow.
        f(unsafe { &mut *self.value.get() })
    }

    /// Runs `batch` holding the write lock: other threads observe either none
    /// or all of its effects.
    pub fn atomic<R>(&self, batch: impl FnOnce() -> R) -> R {
        let _guard = self.lock.write();
        batch()
    }

    pub fn into_inner(self) -> S {
        self.value.into_inner()
    }
}

impl<S: Default> Default for Shared<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

// =============================================================================
// SharedView
// =============================================================================

/// Thread-safe handle to a view chain. Clones share the same chain and lock.
pub struct SharedView<'a, T> {
    cell: Arc<Shared<View<'a, T>>>,
    order: OrderRef<T>,
    ascending: bool,
}

impl<T> Clone for SharedView<'_, T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            order: Arc::clone(&self.order),
            ascending: self.ascending,
        }
    }
}

impl<'a, T: Clone + Send + Sync + 'a> SharedView<'a, T> {
    pub fn new(view: View<'a, T>) -> Self {
        let order = Arc::clone(view.order());
        let ascending = view.is_ascending();
        Self {
            cell: Arc::new(Shared::new(view)),
            order,
            ascending,
        }
    }

    pub fn order(&self) -> &OrderRef<T> {
        &self.order
    }

    /// See [`View::is_ascending`].
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    pub fn lock(&self) -> &SharedLock {
        self.cell.lock()
    }

    pub fn len(&self) -> usize {
        self.cell.read(|view| view.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: &T) -> bool {
        self.cell.read(|view| view.contains(value))
    }

    pub fn get(&self, index: usize) -> Result<T> {
        self.cell.read(|view| view.get(index))
    }

    pub fn rank(&self, value: &T, inclusive: bool) -> usize {
        self.cell.read(|view| view.rank(value, inclusive))
    }

    pub fn add(&self, value: T) -> Result<bool> {
        self.cell.write(|view| view.add(value))
    }

    pub fn remove(&self, value: &T) -> Result<bool> {
        self.cell.write(|view| view.remove(value))
    }

    pub fn clear(&self) -> Result<()> {
        self.cell.write(|view| view.clear())
    }

    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> Result<()> {
        self.cell.write(|view| view.retain(&mut keep))
    }

    /// Snapshot of the elements, taken under the read lock.
    pub fn to_vec(&self) -> Vec<T> {
        self.cell.read(|view| view.iter().collect())
    }

    /// Iterates a snapshot; later writes are not observed.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    pub fn iter_from(&self, from: Bound<&T>) -> std::vec::IntoIter<T> {
        self.cell
            .read(|view| view.iter_from(from).collect::<Vec<_>>())
            .into_iter()
    }

    pub fn iter_back_from(&self, to: Bound<&T>) -> std::vec::IntoIter<T> {
        self.cell
            .read(|view| view.iter_back_from(to).collect::<Vec<_>>())
            .into_iter()
    }

    /// Runs `batch` on this view holding the write lock.
    ///
    /// ```
    /// use ordex::collections::FastTable;
    ///
    /// let table: FastTable<u32> = [1, 2].into_iter().collect();
    /// let shared = table.into_view().shared_view();
    /// let moved = shared.atomic(|view| {
    ///     let taken = view.remove(&1)?;
    ///     view.add(10)?;
    ///     Ok::<_, ordex::Error>(taken)
    /// });
    /// assert_eq!(moved, Ok(true));
    /// assert_eq!(shared.to_vec(), [2, 10]);
    /// ```
    pub fn atomic<R>(&self, batch: impl FnOnce(&Self) -> R) -> R {
        self.cell.atomic(|| batch(self))
    }
}

impl<'a, T: Clone + Send + Sync + fmt::Debug + 'a> fmt::Debug for SharedView<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

// =============================================================================
// SharedMap
// =============================================================================

/// Thread-safe [`FastMap`]. Clones share the same map and lock.
pub struct SharedMap<K, V> {
    cell: Arc<Shared<FastMap<K, V>>>,
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<K: Send + Sync, V: Send + Sync> SharedMap<K, V> {
    pub fn new(map: FastMap<K, V>) -> Self {
        Self {
            cell: Arc::new(Shared::new(map)),
        }
    }

    pub fn lock(&self) -> &SharedLock {
        self.cell.lock()
    }

    pub fn len(&self) -> usize {
        self.cell.read(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.cell.read(|map| map.contains_key(key))
    }

    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.cell.read(|map| map.get(key).cloned())
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.cell.write(|map| map.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.cell.write(|map| map.remove(key))
    }

    pub fn clear(&self) {
        self.cell.write(|map| map.clear());
    }

    pub fn retain(&self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.cell.write(|map| map.retain(keep));
    }

    pub fn first_entry(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.cell
            .read(|map| map.first_entry().map(|(k, v)| (k.clone(), v.clone())))
    }

    pub fn last_entry(&self) -> Option<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.cell
            .read(|map| map.last_entry().map(|(k, v)| (k.clone(), v.clone())))
    }

    /// Snapshot of the entries in key order, taken under the read lock.
    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.cell.read(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    /// Runs `batch` on this map holding the write lock.
    pub fn atomic<R>(&self, batch: impl FnOnce(&Self) -> R) -> R {
        self.cell.atomic(|| batch(self))
    }

    /// Returns the map if this is the last handle to it.
    pub fn try_unwrap(self) -> Result<FastMap<K, V>, Self> {
        Arc::try_unwrap(self.cell)
            .map(Shared::into_inner)
            .map_err(|cell| Self { cell })
    }
}

impl<K, V> fmt::Debug for SharedMap<K, V>
where
    K: Clone + Send + Sync + fmt::Debug,
    V: Clone + Send + Sync + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::{FastMap, FastTable};
    use crate::order;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;
    use std::thread;

    #[test]
    fn test_shared_view_basics() {
        let table: FastTable<u32> = [3, 1, 2].into_iter().collect();
        let shared = table.into_view().shared_view();
        assert_eq!(shared.len(), 3);
        assert_eq!(shared.add(4), Ok(true));
        assert_eq!(shared.remove(&1), Ok(true));
        assert_eq!(shared.get(0), Ok(2));
        assert_eq!(shared.to_vec(), [2, 3, 4]);
        assert!(shared.iter_from(Bound::Excluded(&2)).eq([3, 4]));
    }

    #[test]
    fn test_nested_atomic() {
        let table: FastTable<u32> = FastTable::new();
        let shared = table.into_view().shared_view();
        shared.atomic(|outer| {
            outer.add(1).unwrap();
            outer.atomic(|inner| inner.add(2).unwrap());
            assert!(outer.lock().is_held_by_current_thread());
        });
        assert!(!shared.lock().is_write_locked());
        assert_eq!(shared.to_vec(), [1, 2]);
    }

    #[test]
    #[should_panic(expected = "accessed while it is being modified")]
    fn test_reentrant_read_during_write_panics() {
        let table: FastTable<u32> = [1, 2, 3].into_iter().collect();
        let shared = table.into_view().shared_view();
        let needle = shared.clone();
        let _ = shared.retain(|_| needle.len() > 0);
    }

    #[test]
    fn test_batches_are_all_or_nothing() {
        // Writers move a token between two values inside a batch; readers
        // must always see exactly one of them.
        let table: FastTable<u32> = [0].into_iter().collect();
        let shared = table.into_view().shared_view();
        thread::scope(|s| {
            for seed in 0..2u64 {
                let shared = shared.clone();
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for _ in 0..300 {
                        shared.atomic(|view| {
                            let from = view.get(0).unwrap();
                            let to = if from == 0 { 1 } else { 0 };
                            view.remove(&from).unwrap();
                            if rng.gen_bool(0.5) {
                                thread::yield_now();
                            }
                            view.add(to).unwrap();
                        });
                    }
                });
            }
            for _ in 0..2 {
                let shared = shared.clone();
                s.spawn(move || {
                    for _ in 0..300 {
                        let seen = shared.to_vec();
                        assert_eq!(seen.len(), 1, "torn batch observed: {seen:?}");
                    }
                });
            }
        });
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_concurrent_adds_are_linearizable() {
        let table: FastTable<u32> = FastTable::new();
        let shared = table.into_view().distinct().shared_view();
        thread::scope(|s| {
            for t in 0..4u32 {
                let shared = shared.clone();
                s.spawn(move || {
                    for i in 0..100 {
                        // Overlapping ranges: every value is offered twice.
                        let _ = shared.add((t % 2) * 50 + i);
                    }
                });
            }
        });
        let values = shared.to_vec();
        let expected: BTreeSet<u32> = (0..150).collect();
        assert_eq!(values.len(), expected.len());
        assert!(values.iter().eq(expected.iter()));
    }

    #[test]
    fn test_shared_map() {
        let map: FastMap<String, u32> = FastMap::with_order(order::lexical());
        let shared = map.shared();
        thread::scope(|s| {
            for t in 0..4 {
                let shared = shared.clone();
                s.spawn(move || {
                    for i in 0..50 {
                        shared.insert(format!("k{:03}", t * 50 + i), i);
                    }
                });
            }
        });
        assert_eq!(shared.len(), 200);
        assert_eq!(shared.get(&"k007".to_string()), Some(7));
        assert_eq!(shared.first_entry().map(|(k, _)| k), Some("k000".to_string()));

        let counter = shared.clone();
        counter.atomic(|map| {
            let next = map.get(&"k000".to_string()).unwrap_or(0) + 1;
            map.insert("k000".to_string(), next);
        });
        assert_eq!(shared.get(&"k000".to_string()), Some(1));
        drop(counter);
        let map = shared.try_unwrap().expect("last handle");
        assert_eq!(map.len(), 200);
    }
}
