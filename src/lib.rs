//! # ordex
//!
//! Order-indexed collections: every collection is parameterized by a
//! pluggable [`Order`](order::Order) that supplies comparison, equality and an
//! unsigned 32-bit index. The index drives a sparse trie ([`store::SparseMap`])
//! where colliding keys descend into finer sub-orders, while comparison drives
//! a contiguous sorted [`store::Table`]. [`view::View`]s compose ranges,
//! read-only wrappers, duplicate filtering, projections and writer-preferring
//! locking ([`lock::SharedLock`]) on top of either store.
//!
//! ## Example
//!
//! ```rust
//! use std::ops::Bound;
//! use ordex::collections::{FastMap, FastTable};
//! use ordex::order;
//!
//! let mut names = FastMap::with_order(order::lexical_case_insensitive::<String>());
//! names.insert("Tyler".to_string(), 1845);
//! names.insert("adams".to_string(), 1825);
//! names.insert("Kennedy".to_string(), 1961);
//! let keys: Vec<_> = names.keys().map(String::as_str).collect();
//! assert_eq!(keys, ["adams", "Kennedy", "Tyler"]);
//!
//! let table: FastTable<i32> = [5, 1, 3].into_iter().collect();
//! let window = table.view().range(Bound::Included(2), Bound::Excluded(5));
//! assert_eq!(window.to_vec(), [3]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod collections;
mod config;
mod error;
pub mod lock;
pub mod order;
pub mod store;
pub mod view;

pub use collections::{FastMap, FastSet, FastTable, SubMap, SubMapMut, UnmodifiableMap};
pub use config::{init, Config};
pub use error::{Error, Result};
pub use lock::SharedLock;
pub use view::{SharedMap, SharedView, View};

#[cfg(test)]
mod proptests;
