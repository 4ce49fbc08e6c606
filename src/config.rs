//! Construction-time settings for the policies that take more than a capacity.
//!
//! Every struct has public fields and a `Default`, so callers can override just
//! what they need:
//!
//! ```
//! use policy_cache::config::LfuConfig;
//!
//! let config = LfuConfig { capacity: 512, ..Default::default() };
//! assert_eq!(config.max_average_num, 10);
//! assert!(config.validate().is_ok());
//! ```

use std::num::NonZeroUsize;
use std::thread;

use crate::error::ConfigError;

const DEFAULT_CAPACITY: usize = 10;

/// Settings for [`LruKCache`](crate::LruKCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LruKConfig {
    /// Capacity of the main cache.
    pub capacity: usize,
    /// Capacity of the access-count history; counters of keys evicted from it
    /// start over.
    pub history_capacity: usize,
    /// Number of observations a key needs before it is admitted.
    pub k: usize,
}

impl Default for LruKConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            history_capacity: DEFAULT_CAPACITY * 2,
            k: 2,
        }
    }
}

impl LruKConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroK);
        }
        Ok(())
    }
}

/// Settings for [`LfuCache`](crate::LfuCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfuConfig {
    pub capacity: usize,
    /// Ceiling on the average access frequency; crossing it halves every
    /// entry's frequency by `max_average_num / 2`.
    pub max_average_num: u64,
}

impl Default for LfuConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_average_num: 10,
        }
    }
}

impl LfuConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_average_num == 0 {
            return Err(ConfigError::ZeroMaxAverage);
        }
        Ok(())
    }
}

/// Settings for [`ArcCache`](crate::ArcCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArcConfig {
    /// Total capacity, split between the recency and the frequency part.
    pub capacity: usize,
    /// Hits needed in the recency part before an entry is copied into the
    /// frequency part.
    pub transform_threshold: usize,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            transform_threshold: crate::arc::DEFAULT_TRANSFORM_THRESHOLD,
        }
    }
}

impl ArcConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transform_threshold == 0 {
            return Err(ConfigError::ZeroTransformThreshold);
        }
        Ok(())
    }
}

/// Settings shared by the hash-sharded caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardConfig {
    /// Total capacity; each shard gets `ceil(capacity / shards)`.
    pub capacity: usize,
    /// Number of shards, `0` meaning one per available hardware thread.
    pub shard_count: usize,
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            shard_count: 0,
        }
    }
}

impl ShardConfig {
    /// Resolves `shard_count == 0` against the machine's parallelism.
    pub fn resolved_shard_count(&self) -> usize {
        if self.shard_count > 0 {
            return self.shard_count;
        }
        thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }

    /// Capacity given to every shard when there are `shards` of them.
    pub fn shard_capacity(&self, shards: usize) -> usize {
        self.capacity.div_ceil(shards.max(1))
    }
}
