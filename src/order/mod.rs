//! Pluggable total orders with an unsigned index.
//!
//! An [`Order`] decides, per collection instance, how elements are compared,
//! which elements are equal and where they live in an index trie. Element
//! types are never asked for their own `Ord`/`Hash`/`Eq` unless the chosen
//! order says so ([`NaturalOrder`], [`HashOrder`]).
//!
//! ## Contract
//!
//! For any order `o` and values `x`, `y` (indices compared as unsigned):
//!
//! - `o.are_equal(x, y)` implies `o.compare(x, y) == Equal`;
//! - `o.compare(x, y) == Equal` implies `o.index_of(x) == o.index_of(y)`;
//! - `o.index_of(x) < o.index_of(y)` implies `o.compare(x, y) == Less`.
//!
//! Equal indices do not imply equal values: a collision is resolved by the
//! [`Order::sub_order`] of the colliding value, or by comparison when there
//! is none. The contract is not checked; a malformed order silently
//! corrupts binary search and trie ordering.

mod intern;
mod lexical;
mod spatial;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

use rustc_hash::FxHasher;

pub use lexical::{CaseInsensitiveOrder, LexicalOrder};
pub use spatial::{OctreeOrder, QuadtreeOrder};

/// Shared handle to an order. Orders are immutable and freely shared
/// between collections, views and threads.
pub type OrderRef<T> = Arc<dyn Order<T>>;

/// A total order over `T` combined with an unsigned 32-bit index.
pub trait Order<T: ?Sized>: Send + Sync {
    /// Unsigned index of `value`, consistent with [`Order::compare`].
    fn index_of(&self, value: &T) -> u32;

    /// Compares two values.
    fn compare(&self, left: &T, right: &T) -> Ordering;

    /// Equality under this order. Defaults to `compare == Equal`.
    fn are_equal(&self, left: &T, right: &T) -> bool {
        self.compare(left, right) == Ordering::Equal
    }

    /// Finer order used to discriminate values colliding on
    /// [`Order::index_of`], or `None` when this order cannot refine further.
    fn sub_order(&self, value: &T) -> Option<OrderRef<T>> {
        let _ = value;
        None
    }

    /// `true` when `index_of` hands out insertion sequence numbers instead of
    /// deriving the index from the value. Lookups at such a level visit every
    /// slot.
    fn is_sequential(&self) -> bool {
        false
    }
}

impl<T: ?Sized, O: Order<T> + ?Sized> Order<T> for Arc<O> {
    #[inline]
    fn index_of(&self, value: &T) -> u32 {
        (**self).index_of(value)
    }

    #[inline]
    fn compare(&self, left: &T, right: &T) -> Ordering {
        (**self).compare(left, right)
    }

    #[inline]
    fn are_equal(&self, left: &T, right: &T) -> bool {
        (**self).are_equal(left, right)
    }

    fn sub_order(&self, value: &T) -> Option<OrderRef<T>> {
        (**self).sub_order(value)
    }

    fn is_sequential(&self) -> bool {
        (**self).is_sequential()
    }
}

#[inline]
fn fold_hash(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

// =============================================================================
// Hash / identity / natural
// =============================================================================

/// Default order: 32-bit hash as unsigned index, values with the same hash
/// compare equal, equality is `Eq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashOrder;

impl<T: Hash + Eq + ?Sized> Order<T> for HashOrder {
    #[inline]
    fn index_of(&self, value: &T) -> u32 {
        let mut hasher = FxHasher::default();
        value.hash(&mut hasher);
        fold_hash(hasher.finish())
    }

    fn compare(&self, left: &T, right: &T) -> Ordering {
        self.index_of(left).cmp(&self.index_of(right))
    }

    #[inline]
    fn are_equal(&self, left: &T, right: &T) -> bool {
        left == right
    }
}

/// Pointer identity over shared handles: two `Arc`s are equal only when they
/// point to the same allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityOrder;

impl IdentityOrder {
    #[inline]
    fn address<U: ?Sized>(value: &Arc<U>) -> usize {
        Arc::as_ptr(value).cast::<()>() as usize
    }
}

impl<U: ?Sized + Send + Sync> Order<Arc<U>> for IdentityOrder {
    #[inline]
    fn index_of(&self, value: &Arc<U>) -> u32 {
        let mut hasher = FxHasher::default();
        hasher.write_usize(Self::address(value));
        fold_hash(hasher.finish())
    }

    fn compare(&self, left: &Arc<U>, right: &Arc<U>) -> Ordering {
        self.index_of(left).cmp(&self.index_of(right))
    }

    #[inline]
    fn are_equal(&self, left: &Arc<U>, right: &Arc<U>) -> bool {
        Arc::ptr_eq(left, right)
    }
}

/// Order of the type's own `Ord`. Its index is always `0`, which makes it a
/// comparator for tables; sparse maps require an order with a real index.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<T: Ord + ?Sized> Order<T> for NaturalOrder {
    #[inline]
    fn index_of(&self, _value: &T) -> u32 {
        0
    }

    #[inline]
    fn compare(&self, left: &T, right: &T) -> Ordering {
        left.cmp(right)
    }
}

/// Direct pass-through for values that already are unsigned indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexOrder;

impl Order<u32> for IndexOrder {
    #[inline]
    fn index_of(&self, value: &u32) -> u32 {
        *value
    }

    #[inline]
    fn compare(&self, left: &u32, right: &u32) -> Ordering {
        left.cmp(right)
    }
}

// =============================================================================
// Multi
// =============================================================================

/// Multi-set/multi-map order: values sort by the wrapped order but are never
/// equal, so every insertion is kept. Values colliding once the wrapped order
/// runs out of sub-orders are discriminated by an insertion sequence.
pub struct MultiOrder<T: ?Sized> {
    inner: OrderRef<T>,
    sequence: Arc<SequenceOrder>,
}

impl<T: ?Sized> MultiOrder<T> {
    pub fn new(inner: OrderRef<T>) -> Self {
        Self {
            inner,
            sequence: Arc::new(SequenceOrder::new()),
        }
    }
}

impl<T: ?Sized + 'static> Order<T> for MultiOrder<T> {
    #[inline]
    fn index_of(&self, value: &T) -> u32 {
        self.inner.index_of(value)
    }

    #[inline]
    fn compare(&self, left: &T, right: &T) -> Ordering {
        self.inner.compare(left, right)
    }

    #[inline]
    fn are_equal(&self, _left: &T, _right: &T) -> bool {
        false
    }

    fn sub_order(&self, value: &T) -> Option<OrderRef<T>> {
        match self.inner.sub_order(value) {
            Some(inner) => Some(Arc::new(MultiOrder {
                inner,
                sequence: Arc::clone(&self.sequence),
            }) as OrderRef<T>),
            None => Some(Arc::clone(&self.sequence) as OrderRef<T>),
        }
    }

    fn is_sequential(&self) -> bool {
        self.inner.is_sequential()
    }
}

/// Strictly increasing per-call index; every value compares equal, no value
/// is equal to another.
#[derive(Debug, Default)]
pub struct SequenceOrder {
    next: AtomicU32,
}

impl SequenceOrder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: ?Sized> Order<T> for SequenceOrder {
    #[inline]
    fn index_of(&self, _value: &T) -> u32 {
        self.next.fetch_add(1, AtomicOrdering::Relaxed)
    }

    #[inline]
    fn compare(&self, _left: &T, _right: &T) -> Ordering {
        Ordering::Equal
    }

    #[inline]
    fn are_equal(&self, _left: &T, _right: &T) -> bool {
        false
    }

    fn is_sequential(&self) -> bool {
        true
    }
}

// =============================================================================
// Nullable
// =============================================================================

/// Lifts an order to `Option<T>`: `None` has index `0`, sorts before every
/// `Some` and is equal only to `None`.
pub struct NullableOrder<T> {
    inner: OrderRef<T>,
}

impl<T> NullableOrder<T> {
    pub fn new(inner: OrderRef<T>) -> Self {
        Self { inner }
    }
}

impl<T: 'static> Order<Option<T>> for NullableOrder<T> {
    #[inline]
    fn index_of(&self, value: &Option<T>) -> u32 {
        value.as_ref().map_or(0, |v| self.inner.index_of(v))
    }

    fn compare(&self, left: &Option<T>, right: &Option<T>) -> Ordering {
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => self.inner.compare(l, r),
        }
    }

    fn are_equal(&self, left: &Option<T>, right: &Option<T>) -> bool {
        match (left, right) {
            (None, None) => true,
            (Some(l), Some(r)) => self.inner.are_equal(l, r),
            _ => false,
        }
    }

    fn sub_order(&self, value: &Option<T>) -> Option<OrderRef<Option<T>>> {
        let inner = self.inner.sub_order(value.as_ref()?)?;
        let order: OrderRef<Option<T>> = Arc::new(NullableOrder { inner });
        Some(order)
    }

    fn is_sequential(&self) -> bool {
        self.inner.is_sequential()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Hash order ([`HashOrder`]).
pub fn hash<T: Hash + Eq + ?Sized>() -> OrderRef<T> {
    Arc::new(HashOrder)
}

/// Pointer identity over `Arc`s ([`IdentityOrder`]).
pub fn identity<U: ?Sized + Send + Sync>() -> OrderRef<Arc<U>> {
    Arc::new(IdentityOrder)
}

/// The type's own `Ord` ([`NaturalOrder`]).
pub fn natural<T: Ord + ?Sized>() -> OrderRef<T> {
    Arc::new(NaturalOrder)
}

/// Unsigned pass-through ([`IndexOrder`]).
pub fn index() -> OrderRef<u32> {
    Arc::new(IndexOrder)
}

/// Lexicographic order over anything viewable as `str`.
pub fn lexical<T: AsRef<str> + ?Sized>() -> OrderRef<T> {
    intern::table().lexical(0)
}

/// Case-insensitive lexicographic order over anything viewable as `str`.
pub fn lexical_case_insensitive<T: AsRef<str> + ?Sized>() -> OrderRef<T> {
    intern::table().case_insensitive(0, false)
}

/// Multi-set order over `inner` ([`MultiOrder`]).
pub fn multi<T: ?Sized + 'static>(inner: OrderRef<T>) -> OrderRef<T> {
    Arc::new(MultiOrder::new(inner))
}

/// `Option` lifting of `inner` ([`NullableOrder`]).
pub fn nullable<T: 'static>(inner: OrderRef<T>) -> OrderRef<Option<T>> {
    Arc::new(NullableOrder::new(inner))
}

/// Two-dimensional Morton order.
pub fn quadtree() -> OrderRef<(u32, u32)> {
    intern::table().quadtree(0)
}

/// Three-dimensional Morton order.
pub fn octree() -> OrderRef<(u32, u32, u32)> {
    intern::table().octree(0)
}
