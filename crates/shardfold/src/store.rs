use crate::{Error, Result};
use core::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

/// Identifies one partition of a horizontally-partitioned dataset: the unit
/// of parallel scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartitionId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// A lazy, finite scan over one partition's resident records.
///
/// `None` items are records that vanished between discovery and read; they
/// are skipped by consumers (present-only semantics), never treated as an
/// error. A scan is not restartable mid-failure: retries re-scan from the
/// start.
pub type PartitionScan<'a, R> = Box<dyn Iterator<Item = Option<R>> + 'a>;

/// The partitioned key-value store seam.
///
/// Distribution, replication and partition ownership live behind this
/// trait; the aggregation core only needs to discover the current partition
/// set and scan each partition's records. Record-visitation order within a
/// partition is unspecified.
pub trait PartitionStore {
    /// The record type resident in this store.
    type Record;

    /// The current partition set. Called once per aggregation; the set may
    /// differ between calls as partitions migrate.
    fn partitions(&self) -> Vec<PartitionId>;

    /// Scans one partition.
    ///
    /// # Errors
    /// Returns [`Error::PartitionUnreachable`] if the partition cannot be
    /// scanned; the caller may retry, which re-scans from the start.
    fn scan(&self, partition: PartitionId) -> Result<PartitionScan<'_, Self::Record>>;
}

/// An in-process [`PartitionStore`] holding records in a fixed number of
/// partitions.
///
/// Suitable as a local reference store and as the base for tests; real
/// deployments implement [`PartitionStore`] over the distributed store's
/// client API instead.
#[derive(Clone, Debug)]
pub struct MemoryStore<R> {
    partitions: Vec<Vec<R>>,
}

impl<R> MemoryStore<R> {
    /// Creates an empty store with `partition_count` partitions.
    ///
    /// # Panics
    /// Panics if `partition_count` is zero.
    pub fn new(partition_count: usize) -> Self {
        assert!(partition_count > 0, "a store needs at least one partition");
        Self {
            partitions: (0..partition_count).map(|_| Vec::new()).collect(),
        }
    }

    /// Creates a store from pre-partitioned records, one inner `Vec` per
    /// partition.
    pub fn from_partitions(partitions: Vec<Vec<R>>) -> Self {
        assert!(!partitions.is_empty(), "a store needs at least one partition");
        Self { partitions }
    }

    /// Inserts a batch of keyed records, routing each to a partition by key
    /// hash.
    pub fn bulk_put<K: Hash>(&mut self, entries: impl IntoIterator<Item = (K, R)>) {
        let count = self.partitions.len() as u64;
        for (key, record) in entries {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            let target = (hasher.finish() % count) as usize;
            self.partitions[target].push(record);
        }
    }

    /// Total number of records across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<R: Clone> PartitionStore for MemoryStore<R> {
    type Record = R;

    fn partitions(&self) -> Vec<PartitionId> {
        (0..self.partitions.len() as u32).map(PartitionId).collect()
    }

    fn scan(&self, partition: PartitionId) -> Result<PartitionScan<'_, R>> {
        let records = self.partitions.get(partition.0 as usize).ok_or_else(|| {
            Error::PartitionUnreachable {
                partition,
                reason: "partition not present in this store".to_owned(),
            }
        })?;
        Ok(Box::new(records.iter().cloned().map(Some)))
    }
}
