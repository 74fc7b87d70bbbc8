//! # lrucache
//!
//! Fixed-capacity in-memory key-value cache with LRU eviction.
//!
//! ## Architecture
//! - **HashMap**: AHash index from key to arena handle (O(1))
//! - **LRU List**: Arena-backed doubly-linked ring with two boundary nodes (O(1))
//! - **Stats**: Hit/miss/insert/update/eviction/removal counters
//!
//! Not thread-safe. Wrap the whole cache in a single lock to share it.
//!
//! ```
//! use lrucache::LruCache;
//!
//! let mut cache = LruCache::new(2).unwrap();
//! cache.set(1, 1);
//! cache.set(2, 2);
//! assert_eq!(cache.get(&1), Some(&1));
//!
//! cache.set(3, 3); // evicts 2
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&3), Some(&3));
//! ```

#![warn(missing_docs)]

mod error;
mod lru;
mod stats;

pub use error::{Error, Result};
pub use lru::LruCache;
pub use stats::CacheStats;
