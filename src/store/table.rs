//! Contiguous sorted table.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Rev;
use std::ops::{Bound, RangeBounds};

use crate::order::OrderRef;

/// A `Vec` kept sorted by an [`Order`](crate::order::Order).
///
/// Equal elements are allowed ([`Table::add`]) and keep no particular order
/// among themselves; [`Table::add_if_absent`] gives set semantics. Lookups
/// locate the leftmost slot by binary search and then scan the run of
/// elements comparing equal, since compare-equal does not imply equal.
#[derive(Clone)]
pub struct Table<T> {
    order: OrderRef<T>,
    items: Vec<T>,
}

impl<T> Table<T> {
    pub fn new(order: OrderRef<T>) -> Self {
        Self {
            order,
            items: Vec::new(),
        }
    }

    pub fn with_capacity(order: OrderRef<T>, capacity: usize) -> Self {
        Self {
            order,
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn order(&self) -> &OrderRef<T> {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Leftmost slot at which `value` keeps the table sorted: every element
    /// before it compares less than `value`.
    pub fn slot_of(&self, value: &T) -> usize {
        self.items
            .partition_point(|item| self.order.compare(item, value) == Ordering::Less)
    }

    /// Slot just past the last element comparing less than or equal to `value`.
    fn slot_after(&self, value: &T) -> usize {
        self.items
            .partition_point(|item| self.order.compare(item, value) != Ordering::Greater)
    }

    /// Number of elements comparing less than `value`, or less than or equal
    /// to it when `inclusive`.
    pub fn rank(&self, value: &T, inclusive: bool) -> usize {
        if inclusive {
            self.slot_after(value)
        } else {
            self.slot_of(value)
        }
    }

    /// Slots of the elements equal to `value`, in ascending order.
    fn equal_slots<'a>(&'a self, value: &'a T) -> impl Iterator<Item = usize> + 'a {
        let start = self.slot_of(value);
        self.items[start..]
            .iter()
            .take_while(move |item| self.order.compare(item, value) == Ordering::Equal)
            .enumerate()
            .filter(move |(_, item)| self.order.are_equal(item, value))
            .map(move |(offset, _)| start + offset)
    }

    /// Inserts `value` at [`Table::slot_of`], returning the slot.
    pub fn add(&mut self, value: T) -> usize {
        let slot = self.slot_of(&value);
        self.items.insert(slot, value);
        slot
    }

    /// Inserts `value` unless an equal element is present. Returns the slot of
    /// the (new or existing) element and whether it was inserted.
    pub fn add_if_absent(&mut self, value: T) -> (usize, bool) {
        if let Some(slot) = self.index_of(&value) {
            return (slot, false);
        }
        (self.add(value), true)
    }

    /// Slot of the first element equal to `value`.
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.equal_slots(value).next()
    }

    /// Slot of the last element equal to `value`.
    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        self.equal_slots(value).last()
    }

    pub fn contains(&self, value: &T) -> bool {
        self.index_of(value).is_some()
    }

    /// Removes the first element equal to `value`.
    pub fn remove(&mut self, value: &T) -> Option<T> {
        let slot = self.index_of(value)?;
        Some(self.items.remove(slot))
    }

    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// Least element `>= value`.
    pub fn ceiling(&self, value: &T) -> Option<&T> {
        self.items.get(self.slot_of(value))
    }

    /// Least element `> value`.
    pub fn higher(&self, value: &T) -> Option<&T> {
        self.items.get(self.slot_after(value))
    }

    /// Greatest element `<= value`.
    pub fn floor(&self, value: &T) -> Option<&T> {
        self.slot_after(value).checked_sub(1).map(|slot| &self.items[slot])
    }

    /// Greatest element `< value`.
    pub fn lower(&self, value: &T) -> Option<&T> {
        self.slot_of(value).checked_sub(1).map(|slot| &self.items[slot])
    }

    /// Elements within `range`, compared with the table's order.
    pub fn range<'a, R: RangeBounds<&'a T>>(&self, range: R) -> &[T]
    where
        T: 'a,
    {
        let start = match range.start_bound() {
            Bound::Included(value) => self.slot_of(value),
            Bound::Excluded(value) => self.slot_after(value),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(value) => self.slot_after(value),
            Bound::Excluded(value) => self.slot_of(value),
            Bound::Unbounded => self.items.len(),
        };
        &self.items[start..end.max(start)]
    }

    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.items.retain(keep);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Elements from `from` onwards.
    pub fn iter_from(&self, from: Bound<&T>) -> std::slice::Iter<'_, T> {
        let start = match from {
            Bound::Included(value) => self.slot_of(value),
            Bound::Excluded(value) => self.slot_after(value),
            Bound::Unbounded => 0,
        };
        self.items[start..].iter()
    }

    /// Elements up to `to`, in descending order.
    pub fn iter_back_from(&self, to: Bound<&T>) -> Rev<std::slice::Iter<'_, T>> {
        let end = match to {
            Bound::Included(value) => self.slot_after(value),
            Bound::Excluded(value) => self.slot_of(value),
            Bound::Unbounded => self.items.len(),
        };
        self.items[..end].iter().rev()
    }
}

impl<T: fmt::Debug> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.items).finish()
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
