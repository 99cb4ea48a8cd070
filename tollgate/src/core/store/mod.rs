//! Concurrent keyed storage for token buckets
//!
//! [`BucketStore`] partitions client keys across a fixed set of shards, each
//! guarded by its own lock. Every read or write of a bucket happens while its
//! shard lock is held, so refill and consume are always observed together and
//! the Evictor can never remove a bucket that a check is working on.

use crate::core::bucket::{RefillPolicy, TokenBucket};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::time::Instant;

#[cfg(feature = "ahash")]
use ahash::{AHashMap as HashMap, RandomState};
#[cfg(not(feature = "ahash"))]
use std::collections::{HashMap, hash_map::RandomState};


// Configuration constants
const DEFAULT_CAPACITY: usize = 1000;
const CAPACITY_OVERHEAD_FACTOR: f64 = 1.3;
const SHARDS_PER_CPU: usize = 4;

type Shard = Mutex<HashMap<String, TokenBucket>>;

/// Exclusive access to one bucket
///
/// The handle holds the lock of the shard that owns the bucket. Drop it as
/// soon as the bucket has been updated; other keys on the same shard wait
/// while it is alive.
pub type BucketHandle<'a> = MappedMutexGuard<'a, TokenBucket>;

/// Sharded map of client keys to token buckets
///
/// Buckets are created on first use with a full token count. They are only
/// removed through [`remove`](BucketStore::remove), [`retain`](BucketStore::retain)
/// or [`clear`](BucketStore::clear).
///
/// A store with a single shard uses one lock for the whole map.
///
/// # Example
///
/// ```
/// use tollgate::{BucketStore, RefillPolicy};
/// use std::time::{Duration, Instant};
///
/// let policy = RefillPolicy::new(5, Duration::from_secs(1), 1);
/// let store = BucketStore::builder(policy).shards(8).capacity(10_000).build();
///
/// let now = Instant::now();
/// {
///     let mut bucket = store.get_or_create("user:123", now);
///     assert!(bucket.try_consume());
/// }
/// assert_eq!(store.len(), 1);
/// ```
pub struct BucketStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
    policy: RefillPolicy,
}

/// Builder for configuring a BucketStore
///
/// # Example
///
/// ```
/// use tollgate::{BucketStore, RefillPolicy};
/// use std::time::Duration;
///
/// let store = BucketStore::builder(RefillPolicy::new(10, Duration::from_secs(1), 2))
///     .shards(1) // single store-wide lock
///     .capacity(500)
///     .build();
/// assert_eq!(store.shard_count(), 1);
/// ```
pub struct BucketStoreBuilder {
    policy: RefillPolicy,
    shards: usize,
    capacity: usize,
}

impl BucketStore {
    /// Create a store with the default shard count and capacity
    pub fn new(policy: RefillPolicy) -> Self {
        Self::builder(policy).build()
    }

    /// Create a new builder for configuring a BucketStore
    pub fn builder(policy: RefillPolicy) -> BucketStoreBuilder {
        BucketStoreBuilder {
            policy,
            shards: default_shard_count(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    fn with_config(policy: RefillPolicy, shard_count: usize, capacity: usize) -> Self {
        let shard_count = shard_count.max(1);
        // Pre-allocate with overhead to avoid rehashing
        let per_shard =
            ((capacity as f64 * CAPACITY_OVERHEAD_FACTOR) as usize).div_ceil(shard_count);

        let shards = (0..shard_count)
            .map(|_| Mutex::new(HashMap::with_capacity(per_shard)))
            .collect();

        BucketStore {
            shards,
            hasher: RandomState::new(),
            policy,
        }
    }

    /// Determine which shard a key belongs to
    fn shard(&self, key: &str) -> &Shard {
        let index = (self.hasher.hash_one(key) as usize) % self.shards.len();
        &self.shards[index]
    }

    /// Return the bucket for `key`, creating a full one if it does not exist
    ///
    /// Lookup and creation happen under the same shard lock, so concurrent
    /// callers for a new key always end up sharing one bucket.
    pub fn get_or_create(&self, key: &str, now: Instant) -> BucketHandle<'_> {
        let guard = self.shard(key).lock();

        match MutexGuard::try_map(guard, |map| map.get_mut(key)) {
            Ok(bucket) => bucket,
            Err(guard) => MutexGuard::map(guard, |map| {
                tracing::trace!(key, "creating bucket");
                map.entry(key.to_owned())
                    .or_insert_with(|| TokenBucket::new(self.policy, now))
            }),
        }
    }

    /// Return the bucket for `key` if it exists
    pub fn get(&self, key: &str) -> Option<BucketHandle<'_>> {
        MutexGuard::try_map(self.shard(key).lock(), |map| map.get_mut(key)).ok()
    }

    /// Remove the bucket for `key`
    ///
    /// Returns `true` if a bucket was removed. The next check for the key
    /// starts again from a full bucket.
    pub fn remove(&self, key: &str) -> bool {
        self.shard(key).lock().remove(key).is_some()
    }

    /// Keep only the buckets for which `f` returns `true`
    ///
    /// Shards are visited one at a time; each is locked for the duration of
    /// its visit, so the decision and the removal are atomic with respect to
    /// checks on the same shard. Returns the number of buckets removed.
    ///
    /// `f` must not call back into the store.
    pub fn retain<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&str, &mut TokenBucket) -> bool,
    {
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut map = shard.lock();
            let before = map.len();
            map.retain(|key, bucket| f(key.as_str(), bucket));
            removed += before - map.len();
        }
        removed
    }

    /// Visit every bucket
    ///
    /// Like [`retain`](BucketStore::retain), `f` runs with the shard lock held
    /// and must not call back into the store.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &TokenBucket),
    {
        for shard in self.shards.iter() {
            let map = shard.lock();
            for (key, bucket) in map.iter() {
                f(key.as_str(), bucket);
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.shard(key).lock().contains_key(key)
    }

    /// Total number of buckets across all shards
    ///
    /// Shards are locked one after another, so the count is a snapshot that
    /// may be stale under concurrent inserts.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    /// Remove every bucket
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Refill policy applied to newly created buckets
    pub fn policy(&self) -> RefillPolicy {
        self.policy
    }
}

fn default_shard_count() -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    cpu_count * SHARDS_PER_CPU
}

impl BucketStoreBuilder {
    /// Set the number of shards
    ///
    /// Each shard has its own lock. One shard means a single store-wide
    /// lock. Zero is treated as one.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    /// Set the expected capacity (number of unique keys)
    ///
    /// The store will allocate 30% more space to reduce hash collisions.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Build the BucketStore with the configured settings
    pub fn build(self) -> BucketStore {
        BucketStore::with_config(self.policy, self.shards, self.capacity)
    }
}
