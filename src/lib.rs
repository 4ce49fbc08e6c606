//! Thread-safe in-process key-value caches with pluggable replacement policies.
//!
//! This crate provides the following cache implementations, all usable through
//! the common [`CachePolicy`] trait:
//!
//! 1. [`LruCache`] - Evicts the least recently used entry
//! 2. [`LruKCache`] - LRU that only admits keys seen `k` times
//! 3. [`LfuCache`] - Evicts the least frequently used entry, with aging
//! 4. [`ArcCache`] - Adaptive split between a recency and a frequency part
//! 5. [`ShardedLruCache`] / [`ShardedLfuCache`] - Hash-partitioned variants for
//!    better concurrent performance
//!
//! # Features
//!
//! - Every operation takes `&self` and is safe to call from many threads
//! - O(1) `get` and `put` for all policies
//! - Nodes stored in an index arena instead of pointer-linked lists
//! - Pluggable hashers through `with_hasher` constructors
//! - Validated settings structs in [`config`]
//!
//! # Examples
//!
//! ```rust
//! use policy_cache::{ArcCache, CachePolicy, LfuCache, LruCache, ShardedLruCache};
//!
//! // A plain LRU cache for strings keyed by strings
//! let lru: LruCache<String, String> = LruCache::new(1000);
//! lru.put("key".to_string(), "value".to_string());
//! assert_eq!(lru.get(&"key".to_string()), Some("value".to_string()));
//!
//! // Pick a policy at runtime behind the common trait
//! let caches: Vec<Box<dyn CachePolicy<u64, String>>> = vec![
//!     Box::new(LruCache::<u64, String>::new(100)),
//!     Box::new(LfuCache::<u64, String>::new(100)),
//!     Box::new(ArcCache::<u64, String>::new(100, 2)),
//!     Box::new(ShardedLruCache::<u64, String>::new(100, 4)),
//! ];
//! for cache in &caches {
//!     cache.put(42, "answer".to_string());
//!     assert_eq!(cache.get(&42), Some("answer".to_string()));
//!     assert_eq!(cache.get_or_default(&7), String::new());
//! }
//! ```

pub mod arc;
mod cache_policy;
pub mod config;
pub mod error;
mod lfu_cache;
mod linked_list;
mod lru_cache;
mod lru_k_cache;
mod sharded;

pub use arc::ArcCache;
pub use cache_policy::CachePolicy;
pub use error::ConfigError;
pub use lfu_cache::LfuCache;
pub use lru_cache::LruCache;
pub use lru_k_cache::LruKCache;
pub use sharded::{ShardRouter, ShardedLfuCache, ShardedLruCache};
