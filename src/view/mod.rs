//! Composable views over a store.
//!
//! A [`View`] is a chain of wrappers ending in a [`Store`]. Each wrapper
//! restricts or transforms what the next one exposes:
//!
//! - [`View::range`] keeps the elements within two bounds of the chain's order;
//! - [`View::unmodifiable`] refuses every mutation with [`Error::Immutable`];
//! - [`View::distinct`] hides duplicates and refuses to add one;
//! - [`View::reversed`] iterates the rest of the chain backwards;
//! - [`View::filter`] keeps the elements accepted by a predicate;
//! - [`View::shared`] guards the rest of the chain with a [`SharedLock`];
//! - [`View::map`] projects every element through a function.
//!
//! Views yield owned (cloned) elements. Every operation a wrapper cannot
//! express fails with an [`Error`] instead of silently doing something else.
//!
//! [`SharedLock`]: crate::lock::SharedLock
//!
//! ```
//! use std::ops::Bound;
//! use ordex::collections::FastTable;
//!
//! let mut table: FastTable<u32> = [1, 3, 5].into_iter().collect();
//! let mut window = table.view_mut().range(Bound::Included(2), Bound::Excluded(5));
//! assert_eq!(window.to_vec(), [3]);
//! assert_eq!(window.add(7), Ok(false));
//! assert_eq!(window.add(4), Ok(true));
//! drop(window);
//! assert_eq!(table.as_slice(), [1, 3, 4, 5]);
//! ```

mod shared;

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

pub use shared::{Shared, SharedMap, SharedView};

use crate::error::{Error, Result};
use crate::order::{Order, OrderRef};
use crate::store::{Store, Table};

/// Iterator over the (owned) elements of a view.
pub type Iter<'v, T> = Box<dyn Iterator<Item = T> + 'v>;

/// How a view chain holds its store.
pub enum Root<'a, T> {
    /// Read-only: mutations fail with [`Error::Immutable`].
    Borrowed(&'a dyn Store<T>),
    Exclusive(&'a mut dyn Store<T>),
    Owned(Box<dyn Store<T> + 'a>),
}

impl<'a, T> Root<'a, T> {
    fn store(&self) -> &(dyn Store<T> + 'a) {
        match self {
            Root::Borrowed(store) => *store,
            Root::Exclusive(store) => &**store,
            Root::Owned(store) => &**store,
        }
    }

    fn store_mut(&mut self) -> Result<&mut (dyn Store<T> + 'a)> {
        match self {
            Root::Borrowed(_) => Err(Error::Immutable),
            Root::Exclusive(store) => Ok(&mut **store),
            Root::Owned(store) => Ok(&mut **store),
        }
    }
}

/// A view whose elements are computed from another view's.
///
/// The projection is not invertible, so elements cannot be added through it;
/// removal and retention are evaluated against each source element's image.
pub trait Projection<T>: Send + Sync {
    fn order(&self) -> &OrderRef<T>;

    fn len(&self) -> usize;

    fn iter(&self) -> Iter<'_, T>;

    /// Images in reverse source order.
    fn iter_rev(&self) -> Iter<'_, T>;

    /// Removes every source element whose image equals `value`.
    fn remove(&mut self, value: &T) -> Result<bool>;

    fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool) -> Result<()>;

    fn clear(&mut self) -> Result<()>;
}

struct MappedView<'a, S, T, F> {
    source: View<'a, S>,
    map: F,
    order: OrderRef<T>,
}

impl<'a, S, T, F> Projection<T> for MappedView<'a, S, T, F>
where
    S: Clone + Send + Sync + 'a,
    T: Send + Sync,
    F: Fn(&S) -> T + Send + Sync,
{
    fn order(&self) -> &OrderRef<T> {
        &self.order
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    fn iter(&self) -> Iter<'_, T> {
        Box::new(self.source.iter().map(move |item| (self.map)(&item)))
    }

    fn iter_rev(&self) -> Iter<'_, T> {
        Box::new(self.source.iter_rev().map(move |item| (self.map)(&item)))
    }

    fn remove(&mut self, value: &T) -> Result<bool> {
        let (map, order) = (&self.map, &self.order);
        let mut removed = false;
        self.source.retain(&mut |item| {
            let keep = !order.are_equal(&map(item), value);
            removed |= !keep;
            keep
        })?;
        Ok(removed)
    }

    fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool) -> Result<()> {
        let map = &self.map;
        self.source.retain(&mut |item| keep(&map(item)))
    }

    fn clear(&mut self) -> Result<()> {
        self.source.clear()
    }
}

/// Predicate of a [`View::Filtered`].
pub type Predicate<'a, T> = Box<dyn Fn(&T) -> bool + Send + Sync + 'a>;

/// A chain of view wrappers over a [`Store`].
pub enum View<'a, T> {
    Store(Root<'a, T>),
    /// Elements between `from` and `to`. Adds and removes outside the bounds
    /// are ignored.
    Range {
        target: Box<View<'a, T>>,
        from: Bound<T>,
        to: Bound<T>,
    },
    Unmodifiable(Box<View<'a, T>>),
    Distinct(Box<View<'a, T>>),
    /// The target's elements in reverse iteration order.
    Reversed(Box<View<'a, T>>),
    /// Elements accepted by `predicate`. Adding a rejected element is ignored.
    Filtered {
        target: Box<View<'a, T>>,
        predicate: Predicate<'a, T>,
    },
    Shared(SharedView<'a, T>),
    Mapped(Box<dyn Projection<T> + 'a>),
}

pub(crate) fn admits_from<T>(order: &dyn Order<T>, from: Bound<&T>, value: &T) -> bool {
    match from {
        Bound::Included(bound) => order.compare(value, bound) != Ordering::Less,
        Bound::Excluded(bound) => order.compare(value, bound) == Ordering::Greater,
        Bound::Unbounded => true,
    }
}

pub(crate) fn admits_to<T>(order: &dyn Order<T>, to: Bound<&T>, value: &T) -> bool {
    match to {
        Bound::Included(bound) => order.compare(value, bound) != Ordering::Greater,
        Bound::Excluded(bound) => order.compare(value, bound) == Ordering::Less,
        Bound::Unbounded => true,
    }
}

fn within<T>(order: &dyn Order<T>, from: &Bound<T>, to: &Bound<T>, value: &T) -> bool {
    admits_from(order, from.as_ref(), value) && admits_to(order, to.as_ref(), value)
}

/// The tighter of two lower bounds.
fn tighter_from<'b, T>(order: &dyn Order<T>, a: Bound<&'b T>, b: Bound<&'b T>) -> Bound<&'b T> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            match order.compare(x, y) {
                Ordering::Less => b,
                Ordering::Greater => a,
                Ordering::Equal if matches!(a, Bound::Excluded(_)) => a,
                Ordering::Equal => b,
            }
        }
    }
}

/// The tighter of two upper bounds.
fn tighter_to<'b, T>(order: &dyn Order<T>, a: Bound<&'b T>, b: Bound<&'b T>) -> Bound<&'b T> {
    match (a, b) {
        (Bound::Unbounded, other) | (other, Bound::Unbounded) => other,
        (Bound::Included(x) | Bound::Excluded(x), Bound::Included(y) | Bound::Excluded(y)) => {
            match order.compare(x, y) {
                Ordering::Less => a,
                Ordering::Greater => b,
                Ordering::Equal if matches!(a, Bound::Excluded(_)) => a,
                Ordering::Equal => b,
            }
        }
    }
}

impl<'a, T: Clone + Send + Sync + 'a> View<'a, T> {
    pub fn borrowed(store: &'a dyn Store<T>) -> Self {
        View::Store(Root::Borrowed(store))
    }

    pub fn exclusive(store: &'a mut dyn Store<T>) -> Self {
        View::Store(Root::Exclusive(store))
    }

    pub fn owned(store: Box<dyn Store<T> + 'a>) -> Self {
        View::Store(Root::Owned(store))
    }

    /// Restricts the view to the elements between `from` and `to`.
    pub fn range(self, from: Bound<T>, to: Bound<T>) -> Self {
        View::Range {
            target: Box::new(self),
            from,
            to,
        }
    }

    /// Elements less than `to`.
    pub fn head(self, to: T) -> Self {
        self.range(Bound::Unbounded, Bound::Excluded(to))
    }

    /// Elements greater than or equal to `from`.
    pub fn tail(self, from: T) -> Self {
        self.range(Bound::Included(from), Bound::Unbounded)
    }

    pub fn unmodifiable(self) -> Self {
        View::Unmodifiable(Box::new(self))
    }

    pub fn distinct(self) -> Self {
        View::Distinct(Box::new(self))
    }

    pub fn reversed(self) -> Self {
        View::Reversed(Box::new(self))
    }

    /// Keeps the elements accepted by `predicate`.
    pub fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'a) -> Self {
        View::Filtered {
            target: Box::new(self),
            predicate: Box::new(predicate),
        }
    }

    /// Guards the chain with a lock so it can be used from several threads.
    pub fn shared(self) -> Self {
        View::Shared(SharedView::new(self))
    }

    /// Like [`View::shared`], returning the cloneable handle itself.
    pub fn shared_view(self) -> SharedView<'a, T> {
        match self {
            View::Shared(shared) => shared,
            view => SharedView::new(view),
        }
    }

    /// Projects every element through `map`; the result is ordered by
    /// `order`. Images keep the source's iteration order.
    pub fn map<U, F>(self, map: F, order: OrderRef<U>) -> View<'a, U>
    where
        U: Clone + Send + Sync + 'a,
        F: Fn(&T) -> U + Send + Sync + 'a,
    {
        View::Mapped(Box::new(MappedView {
            source: self,
            map,
            order,
        }))
    }

    pub fn order(&self) -> &OrderRef<T> {
        match self {
            View::Store(root) => root.store().order(),
            View::Range { target, .. }
            | View::Unmodifiable(target)
            | View::Distinct(target)
            | View::Reversed(target)
            | View::Filtered { target, .. } => target.order(),
            View::Shared(shared) => shared.order(),
            View::Mapped(projection) => projection.order(),
        }
    }

    /// Whether iteration follows ascending [`View::order`]. Ranges over other
    /// views filter instead of cutting the iteration short, and count instead
    /// of translating positions.
    pub fn is_ascending(&self) -> bool {
        match self {
            View::Store(_) => true,
            View::Range { target, .. }
            | View::Unmodifiable(target)
            | View::Distinct(target)
            | View::Filtered { target, .. } => target.is_ascending(),
            View::Shared(shared) => shared.is_ascending(),
            View::Reversed(_) | View::Mapped(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            View::Store(root) => root.store().len(),
            View::Range { .. } | View::Distinct(_) | View::Filtered { .. } => self.iter().count(),
            View::Unmodifiable(target) | View::Reversed(target) => target.len(),
            View::Shared(shared) => shared.len(),
            View::Mapped(projection) => projection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            View::Store(root) => root.store().is_empty(),
            _ => self.iter().next().is_none(),
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        match self {
            View::Store(root) => root.store().contains(value),
            View::Range { target, from, to } => {
                within(&**target.order(), from, to, value) && target.contains(value)
            }
            View::Unmodifiable(target) | View::Distinct(target) | View::Reversed(target) => {
                target.contains(value)
            }
            View::Filtered { target, predicate } => predicate(value) && target.contains(value),
            View::Shared(shared) => shared.contains(value),
            View::Mapped(projection) => {
                let order = projection.order();
                projection.iter().any(|item| order.are_equal(&item, value))
            }
        }
    }

    /// Element at `index` in iteration order.
    pub fn get(&self, index: usize) -> Result<T> {
        match self {
            View::Store(root) => {
                let store = root.store();
                store.get(index).cloned().ok_or(Error::IndexOutOfBounds {
                    index,
                    len: store.len(),
                })
            }
            View::Range { target, from, to } if target.is_ascending() => {
                let (start, end) = Self::bound_ranks(target, from, to);
                if index >= end - start {
                    return Err(Error::IndexOutOfBounds {
                        index,
                        len: end - start,
                    });
                }
                target.get(start + index)
            }
            View::Unmodifiable(target) => target.get(index),
            View::Reversed(target) => {
                let len = target.len();
                if index >= len {
                    return Err(Error::IndexOutOfBounds { index, len });
                }
                target.get(len - 1 - index)
            }
            View::Shared(shared) => shared.get(index),
            _ => match self.iter().nth(index) {
                Some(item) => Ok(item),
                None => Err(Error::IndexOutOfBounds {
                    index,
                    len: self.len(),
                }),
            },
        }
    }

    /// Number of elements comparing less than `value` (or less than or equal
    /// to it when `inclusive`).
    pub fn rank(&self, value: &T, inclusive: bool) -> usize {
        match self {
            View::Store(root) => root.store().rank(value, inclusive),
            View::Range { target, from, to } if target.is_ascending() => {
                let (start, end) = Self::bound_ranks(target, from, to);
                target.rank(value, inclusive).clamp(start, end) - start
            }
            View::Unmodifiable(target) | View::Reversed(target) => target.rank(value, inclusive),
            View::Shared(shared) => shared.rank(value, inclusive),
            _ => {
                let order = Arc::clone(self.order());
                self.iter()
                    .filter(|item| {
                        let ordering = order.compare(item, value);
                        ordering.is_lt() || (inclusive && ordering.is_eq())
                    })
                    .count()
            }
        }
    }

    /// Target ranks of a range's lower and upper bound; the target must be
    /// ascending.
    fn bound_ranks(target: &View<'a, T>, from: &Bound<T>, to: &Bound<T>) -> (usize, usize) {
        let start = match from {
            Bound::Included(bound) => target.rank(bound, false),
            Bound::Excluded(bound) => target.rank(bound, true),
            Bound::Unbounded => 0,
        };
        let end = match to {
            Bound::Included(bound) => target.rank(bound, true),
            Bound::Excluded(bound) => target.rank(bound, false),
            Bound::Unbounded => target.len(),
        };
        (start, end.max(start))
    }

    /// Adds `value`; returns `Ok(false)` when the view ignored it.
    pub fn add(&mut self, value: T) -> Result<bool> {
        match self {
            View::Store(root) => Ok(root.store_mut()?.add(value)),
            View::Range { target, from, to } => {
                if !within(&**target.order(), from, to, &value) {
                    return Ok(false);
                }
                target.add(value)
            }
            View::Unmodifiable(_) => Err(Error::Immutable),
            View::Distinct(target) => {
                if target.contains(&value) {
                    return Ok(false);
                }
                target.add(value)
            }
            View::Reversed(target) => target.add(value),
            View::Filtered { target, predicate } => {
                if !predicate(&value) {
                    return Ok(false);
                }
                target.add(value)
            }
            View::Shared(shared) => shared.add(value),
            View::Mapped(_) => Err(Error::Unsupported("mapped")),
        }
    }

    pub fn remove(&mut self, value: &T) -> Result<bool> {
        match self {
            View::Store(root) => Ok(root.store_mut()?.remove(value)),
            View::Range { target, from, to } => {
                if !within(&**target.order(), from, to, value) {
                    return Ok(false);
                }
                target.remove(value)
            }
            View::Unmodifiable(_) => Err(Error::Immutable),
            View::Distinct(target) | View::Reversed(target) => target.remove(value),
            View::Filtered { target, predicate } => {
                if !predicate(value) {
                    return Ok(false);
                }
                target.remove(value)
            }
            View::Shared(shared) => shared.remove(value),
            View::Mapped(projection) => projection.remove(value),
        }
    }

    /// Removes every element of the view; ranges and filters clear only what
    /// they admit.
    pub fn clear(&mut self) -> Result<()> {
        match self {
            View::Store(root) => {
                root.store_mut()?.clear();
                Ok(())
            }
            View::Range { target, from, to } => {
                let order = Arc::clone(target.order());
                target.retain(&mut |item| !within(&*order, from, to, item))
            }
            View::Unmodifiable(_) => Err(Error::Immutable),
            View::Distinct(target) | View::Reversed(target) => target.clear(),
            View::Filtered { target, predicate } => target.retain(&mut |item| !predicate(item)),
            View::Shared(shared) => shared.clear(),
            View::Mapped(projection) => projection.clear(),
        }
    }

    /// Keeps only the elements for which `keep` returns `true`.
    pub fn retain(&mut self, keep: &mut dyn FnMut(&T) -> bool) -> Result<()> {
        match self {
            View::Store(root) => {
                root.store_mut()?.retain(keep);
                Ok(())
            }
            View::Range { target, from, to } => {
                let order = Arc::clone(target.order());
                target.retain(&mut |item| !within(&*order, from, to, item) || keep(item))
            }
            View::Unmodifiable(_) => Err(Error::Immutable),
            View::Distinct(target) | View::Reversed(target) => target.retain(keep),
            View::Filtered { target, predicate } => {
                target.retain(&mut |item| !predicate(item) || keep(item))
            }
            View::Shared(shared) => shared.retain(keep),
            View::Mapped(projection) => projection.retain(keep),
        }
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.iter_from(Bound::Unbounded)
    }

    /// Elements admitted by `from`, in iteration order. On an ascending view
    /// these are the elements from `from` onwards. Shared views iterate a
    /// snapshot.
    pub fn iter_from(&self, from: Bound<&T>) -> Iter<'_, T> {
        match self {
            View::Store(root) => Box::new(root.store().iter_from(from).cloned()),
            View::Range {
                target,
                from: lower,
                to,
            } => {
                let order = Arc::clone(target.order());
                if target.is_ascending() {
                    let start = tighter_from(&*order, lower.as_ref(), from);
                    let items = target.iter_from(start);
                    Box::new(items.take_while(move |item| admits_to(&*order, to.as_ref(), item)))
                } else {
                    let items = target.iter_from(from);
                    Box::new(items.filter(move |item| within(&*order, lower, to, item)))
                }
            }
            View::Unmodifiable(target) => target.iter_from(from),
            View::Distinct(target) => {
                let mut seen = Table::new(Arc::clone(target.order()));
                Box::new(
                    target
                        .iter_from(from)
                        .filter(move |item| seen.add_if_absent(item.clone()).1),
                )
            }
            View::Reversed(target) => {
                let order = Arc::clone(target.order());
                let from = from.cloned();
                let items = target.iter_rev();
                if target.is_ascending() {
                    Box::new(items.take_while(move |item| admits_from(&*order, from.as_ref(), item)))
                } else {
                    Box::new(items.filter(move |item| admits_from(&*order, from.as_ref(), item)))
                }
            }
            View::Filtered { target, predicate } => {
                Box::new(target.iter_from(from).filter(move |item| predicate(item)))
            }
            View::Shared(shared) => Box::new(shared.iter_from(from)),
            View::Mapped(projection) => {
                let order = Arc::clone(projection.order());
                let from = from.cloned();
                Box::new(
                    projection
                        .iter()
                        .filter(move |item| admits_from(&*order, from.as_ref(), item)),
                )
            }
        }
    }

    /// Elements in reverse iteration order.
    pub fn iter_rev(&self) -> Iter<'_, T> {
        self.iter_back_from(Bound::Unbounded)
    }

    /// Elements admitted by `to`, in reverse iteration order. On an ascending
    /// view these are the elements from `to` downwards.
    pub fn iter_back_from(&self, to: Bound<&T>) -> Iter<'_, T> {
        match self {
            View::Store(root) => Box::new(root.store().iter_back_from(to).cloned()),
            View::Range {
                target,
                from,
                to: upper,
            } => {
                let order = Arc::clone(target.order());
                if target.is_ascending() {
                    let end = tighter_to(&*order, upper.as_ref(), to);
                    let items = target.iter_back_from(end);
                    Box::new(items.take_while(move |item| admits_from(&*order, from.as_ref(), item)))
                } else {
                    let items = target.iter_back_from(to);
                    Box::new(items.filter(move |item| within(&*order, from, upper, item)))
                }
            }
            View::Unmodifiable(target) => target.iter_back_from(to),
            View::Reversed(target) => {
                let order = Arc::clone(target.order());
                let to = to.cloned();
                let items = target.iter();
                if target.is_ascending() {
                    Box::new(items.take_while(move |item| admits_to(&*order, to.as_ref(), item)))
                } else {
                    Box::new(items.filter(move |item| admits_to(&*order, to.as_ref(), item)))
                }
            }
            View::Filtered { target, predicate } => {
                Box::new(target.iter_back_from(to).filter(move |item| predicate(item)))
            }
            View::Shared(shared) => Box::new(shared.iter_back_from(to)),
            View::Distinct(_) => {
                // Duplicates are dropped front to back, so walk forwards.
                let order = Arc::clone(self.order());
                let mut items: Vec<T> = self.iter().collect();
                items.retain(|item| admits_to(&*order, to, item));
                Box::new(items.into_iter().rev())
            }
            View::Mapped(projection) => {
                let order = Arc::clone(projection.order());
                let to = to.cloned();
                Box::new(
                    projection
                        .iter_rev()
                        .filter(move |item| admits_to(&*order, to.as_ref(), item)),
                )
            }
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}

impl<'a, T: Clone + Send + Sync + fmt::Debug + 'a> fmt::Debug for View<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
