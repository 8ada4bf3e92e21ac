//! Process-wide table of pre-allocated orders.
//!
//! Built once from [`crate::config::global`] on first use and never mutated
//! afterwards. Sub-order lookups clone an `Arc` from here instead of
//! allocating a fresh order per trie level; offsets past the table allocate.

use std::sync::{Arc, OnceLock};

use super::lexical::{CaseInsensitiveOrder, LexicalOrder};
use super::spatial::{OctreeOrder, QuadtreeOrder};
use super::OrderRef;

static TABLE: OnceLock<OrderTable> = OnceLock::new();

pub(crate) struct OrderTable {
    /// Lexical orders at byte offsets `0, 4, 8, ..`.
    lexical: Vec<Arc<LexicalOrder>>,
    /// Case-insensitive orders at char offsets `0, 6, 12, ..`.
    case_insensitive: Vec<Arc<CaseInsensitiveOrder>>,
    /// Case-insensitive orders with an exact lead character, one per offset.
    case_insensitive_lead: Vec<Arc<CaseInsensitiveOrder>>,
    quadtree: [Arc<QuadtreeOrder>; QuadtreeOrder::LEVELS],
    octree: [Arc<OctreeOrder>; OctreeOrder::LEVELS],
}

pub(crate) fn table() -> &'static OrderTable {
    TABLE.get_or_init(|| OrderTable::build(crate::config::global().interned_sub_orders))
}

impl OrderTable {
    fn build(count: usize) -> Self {
        let table = Self {
            lexical: (0..count)
                .map(|i| Arc::new(LexicalOrder::at(i * LexicalOrder::BYTES_PER_INDEX)))
                .collect(),
            case_insensitive: (0..count)
                .map(|i| {
                    Arc::new(CaseInsensitiveOrder::at(
                        i * CaseInsensitiveOrder::CHARS_PER_INDEX,
                        false,
                    ))
                })
                .collect(),
            case_insensitive_lead: (0..count * CaseInsensitiveOrder::CHARS_PER_INDEX)
                .map(|offset| Arc::new(CaseInsensitiveOrder::at(offset, true)))
                .collect(),
            quadtree: [0, 1].map(|level| Arc::new(QuadtreeOrder::at_level(level))),
            octree: [0, 1, 2].map(|level| Arc::new(OctreeOrder::at_level(level))),
        };
        tracing::debug!(count, "interned order table built");
        table
    }

    pub(crate) fn lexical<T: AsRef<str> + ?Sized>(&self, offset: usize) -> OrderRef<T> {
        let interned = (offset % LexicalOrder::BYTES_PER_INDEX == 0)
            .then(|| self.lexical.get(offset / LexicalOrder::BYTES_PER_INDEX))
            .flatten();
        match interned {
            Some(order) => Arc::clone(order) as OrderRef<T>,
            None => Arc::new(LexicalOrder::at(offset)),
        }
    }

    pub(crate) fn case_insensitive<T: AsRef<str> + ?Sized>(
        &self,
        offset: usize,
        exact_lead: bool,
    ) -> OrderRef<T> {
        let interned = if exact_lead {
            self.case_insensitive_lead.get(offset)
        } else if offset % CaseInsensitiveOrder::CHARS_PER_INDEX == 0 {
            self.case_insensitive
                .get(offset / CaseInsensitiveOrder::CHARS_PER_INDEX)
        } else {
            None
        };
        match interned {
            Some(order) => Arc::clone(order) as OrderRef<T>,
            None => Arc::new(CaseInsensitiveOrder::at(offset, exact_lead)),
        }
    }

    pub(crate) fn quadtree(&self, level: usize) -> OrderRef<(u32, u32)> {
        Arc::clone(&self.quadtree[level]) as OrderRef<(u32, u32)>
    }

    pub(crate) fn octree(&self, level: usize) -> OrderRef<(u32, u32, u32)> {
        Arc::clone(&self.octree[level]) as OrderRef<(u32, u32, u32)>
    }
}
