use crate::{
    Error, Invoker, PartitionId, PartitionStore, Result, StreamingAggregator, ThreadInvoker,
};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

/// Default number of scan attempts per partition before the aggregation
/// fails.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Coordinates a parallel streaming aggregation across all partitions of a
/// [`PartitionStore`].
///
/// The coordinator does not know how many partitions or nodes exist until
/// it asks the store. It fans per-partition accumulation out through an
/// [`Invoker`] (scoped threads by default), collects the partial results,
/// and combines them into a single output. Partials are keyed by
/// [`PartitionId`], so a retried scan (or a partition that migrated
/// mid-aggregation and was re-dispatched) replaces its earlier result
/// instead of adding to it: every partition contributes exactly once.
///
/// If any partition remains unreachable after
/// [`max_attempts`](Self::with_max_attempts) scans, the whole aggregation
/// fails. Omitting the partition would silently under-count, so a partial
/// success is never reported as a complete aggregate.
///
/// # Example
///
/// ```
/// use shardfold::{AggregationCoordinator, MemoryStore, Trade, TradeSummaryAggregator};
///
/// let mut store = MemoryStore::new(4);
/// store.bulk_put((0..8u32).map(|i| (i, Trade::new("ORCL", 10, 2.0))));
///
/// let coordinator = AggregationCoordinator::new();
/// let summary = coordinator
///     .aggregate(&store, &TradeSummaryAggregator::new())
///     .unwrap();
/// assert_eq!(summary.quantity(), 80);
/// assert_eq!(summary.count(), 8);
/// ```
#[derive(Clone, Debug)]
pub struct AggregationCoordinator<I = ThreadInvoker> {
    invoker: I,
    max_attempts: u32,
}

impl AggregationCoordinator<ThreadInvoker> {
    /// Creates a coordinator whose fan-out width follows the host's
    /// available parallelism.
    pub fn new() -> Self {
        Self::with_invoker(ThreadInvoker::new())
    }

    /// Overrides the number of scan threads.
    pub const fn with_parallelism(mut self, parallelism: NonZeroUsize) -> Self {
        self.invoker = ThreadInvoker::with_parallelism(parallelism);
        self
    }
}

impl<I: Invoker> AggregationCoordinator<I> {
    /// Creates a coordinator that dispatches scans through `invoker`.
    pub const fn with_invoker(invoker: I) -> Self {
        Self {
            invoker,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides how many times a partition scan is attempted before the
    /// aggregation fails.
    ///
    /// # Panics
    /// Panics if `max_attempts` is zero.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "at least one scan attempt is required");
        self.max_attempts = max_attempts;
        self
    }

    /// Aggregates every record in `store` through instances supplied by
    /// `prototype`.
    ///
    /// Each partition is scanned by a fresh `supply()` instance; vanished
    /// records are skipped; the `accumulate`/`combine` continuation flags
    /// are honored. Partials are combined in ascending partition order,
    /// which keeps the floating-point component of the result stable
    /// across runs over identical data (any order would be equally valid
    /// under the combine laws).
    ///
    /// An empty partition set yields the empty aggregate,
    /// `prototype.supply().finalize()`.
    ///
    /// # Errors
    /// Returns [`Error::PartitionUnreachable`] if any partition cannot be
    /// scanned within the retry limit, or produced no partial at all.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(max_attempts = self.max_attempts))
    )]
    pub fn aggregate<S, A>(&self, store: &S, prototype: &A) -> Result<A::Output>
    where
        S: PartitionStore + Sync,
        A: StreamingAggregator<Record = S::Record> + Sync,
        A::Partial: Send,
    {
        let partitions = store.partitions();
        if partitions.is_empty() {
            return Ok(prototype.supply().finalize());
        }

        let max_attempts = self.max_attempts;
        let outcomes = self.invoker.invoke(partitions.clone(), |partition| {
            scan_partition(store, prototype, partition, max_attempts)
        });

        let mut collected: BTreeMap<PartitionId, A::Partial> = BTreeMap::new();
        for (partition, outcome) in outcomes {
            // `insert` replaces any result from an earlier dispatch of
            // the same partition
            collected.insert(partition, outcome?);
        }
        for &partition in &partitions {
            if !collected.contains_key(&partition) {
                return Err(Error::PartitionUnreachable {
                    partition,
                    reason: "no partial result produced".to_owned(),
                });
            }
        }

        let mut root = prototype.supply();
        for (_partition, partial) in collected {
            if !root.combine(partial) {
                break;
            }
        }
        Ok(root.finalize())
    }
}

impl Default for AggregationCoordinator<ThreadInvoker> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scans one partition with retries. Each attempt re-scans from the start
/// into a fresh aggregator instance, so a retry can never double count.
fn scan_partition<S, A>(
    store: &S,
    prototype: &A,
    partition: PartitionId,
    max_attempts: u32,
) -> Result<A::Partial>
where
    S: PartitionStore,
    A: StreamingAggregator<Record = S::Record>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match scan_once(store, prototype, partition) {
            Ok(partial) => return Ok(partial),
            Err(_err) if attempt < max_attempts => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "partition {partition} scan attempt {attempt} failed: {_err}; retrying"
                );
            }
            Err(err) => return Err(err),
        }
    }
}

fn scan_once<S, A>(store: &S, prototype: &A, partition: PartitionId) -> Result<A::Partial>
where
    S: PartitionStore,
    A: StreamingAggregator<Record = S::Record>,
{
    let mut aggregator = prototype.supply();
    for entry in store.scan(partition)? {
        match entry {
            Some(record) => {
                if !aggregator.accumulate(&record) {
                    break;
                }
            }
            // vanished between discovery and read: present-only, skip
            None => {}
        }
    }
    Ok(aggregator.partial_result())
}
