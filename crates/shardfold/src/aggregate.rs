use crate::{Trade, TradeSummary};
use core::ops::BitOr;

/// Execution hints advertised by a [`StreamingAggregator`].
///
/// Modeled as a small bitset so hints compose with `|`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Characteristics(u8);

impl Characteristics {
    /// No hints.
    pub const NONE: Self = Self(0);

    /// Per-partition accumulation may run concurrently across any number of
    /// threads or nodes; partials combine in arbitrary order.
    pub const PARALLEL: Self = Self(1);

    /// Records that vanish between discovery and read are skipped, not
    /// treated as an error.
    pub const PRESENT_ONLY: Self = Self(1 << 1);

    /// Returns `true` if all hints in `other` are set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Combines two hint sets.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for Characteristics {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// A streaming, combinable aggregation over a partitioned dataset.
///
/// One instance is created (via [`supply`](Self::supply)) per partition
/// scan. The instance folds that partition's records through
/// [`accumulate`](Self::accumulate), and the resulting partials are merged
/// into a single root instance through [`combine`](Self::combine). For the
/// merged result to equal a single-threaded fold over the whole dataset,
/// `combine` must be commutative and associative with the empty instance as
/// identity.
///
/// `accumulate` and `combine` return a continuation flag: `true` to keep
/// processing, `false` to short-circuit. Once an instance returns `false`,
/// no further `accumulate` or `combine` calls are issued to it.
///
/// [`partial_result`](Self::partial_result) may be called at any point to
/// checkpoint the running state; [`finalize`](Self::finalize) is called
/// exactly once at the end to produce the output.
pub trait StreamingAggregator {
    /// The record type this aggregator consumes.
    type Record;
    /// The intermediate result exchanged between instances.
    type Partial;
    /// The final result handed to the caller.
    type Output;

    /// Creates a fresh, empty instance for a new partition scan.
    fn supply(&self) -> Self
    where
        Self: Sized;

    /// Folds one record into the running state. Returns `false` to stop
    /// consuming input.
    fn accumulate(&mut self, record: &Self::Record) -> bool;

    /// Merges an upstream partial result into the running state. Returns
    /// `false` to stop consuming input.
    fn combine(&mut self, partial: Self::Partial) -> bool;

    /// A checkpoint of the running state.
    fn partial_result(&self) -> Self::Partial;

    /// Consumes the aggregator and produces the final result.
    fn finalize(self) -> Self::Output
    where
        Self: Sized;

    /// Execution hints. Defaults to parallel, present-only.
    fn characteristics(&self) -> Characteristics {
        Characteristics::PARALLEL | Characteristics::PRESENT_ONLY
    }
}

/// Summarises trade quantity, count and purchase value across all trades.
///
/// # Example
///
/// ```
/// use shardfold::{StreamingAggregator, Trade, TradeSummaryAggregator};
///
/// let mut aggregator = TradeSummaryAggregator::new();
/// aggregator.accumulate(&Trade::new("ORCL", 10, 10.0));
/// aggregator.accumulate(&Trade::new("MSFT", 20, 7.5));
///
/// let summary = aggregator.finalize();
/// assert_eq!(summary.quantity(), 30);
/// assert_eq!(summary.count(), 2);
/// assert_eq!(summary.purchase_value(), 250.0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TradeSummaryAggregator {
    summary: TradeSummary,
}

impl TradeSummaryAggregator {
    /// Creates an empty aggregator.
    pub const fn new() -> Self {
        Self {
            summary: TradeSummary::new(),
        }
    }
}

impl StreamingAggregator for TradeSummaryAggregator {
    type Record = Trade;
    type Partial = TradeSummary;
    type Output = TradeSummary;

    fn supply(&self) -> Self {
        Self::new()
    }

    fn accumulate(&mut self, trade: &Trade) -> bool {
        self.summary.add(trade.quantity(), trade.purchase_value());
        true
    }

    fn combine(&mut self, partial: TradeSummary) -> bool {
        self.summary.combine(&partial);
        true
    }

    fn partial_result(&self) -> TradeSummary {
        self.summary.clone()
    }

    fn finalize(self) -> TradeSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characteristics_compose() {
        let hints = Characteristics::PARALLEL | Characteristics::PRESENT_ONLY;
        assert!(hints.contains(Characteristics::PARALLEL));
        assert!(hints.contains(Characteristics::PRESENT_ONLY));
        assert!(!Characteristics::PARALLEL.contains(hints));
        assert!(hints.contains(Characteristics::NONE));
    }

    #[test]
    fn supply_returns_empty_instance() {
        let mut aggregator = TradeSummaryAggregator::new();
        aggregator.accumulate(&Trade::new("ORCL", 10, 10.0));

        let fresh = aggregator.supply();
        assert!(fresh.partial_result().is_empty());
        // the source instance is untouched
        assert_eq!(aggregator.partial_result().quantity(), 10);
    }

    #[test]
    fn combine_merges_upstream_partials() {
        let mut root = TradeSummaryAggregator::new();
        root.accumulate(&Trade::new("ORCL", 10, 10.0));

        let mut upstream = root.supply();
        upstream.accumulate(&Trade::new("MSFT", 5, 12.0));
        assert!(root.combine(upstream.partial_result()));

        let summary = root.finalize();
        assert_eq!(summary.quantity(), 15);
        assert_eq!(summary.count(), 2);
        assert_eq!(summary.purchase_value(), 160.0);
    }

    #[test]
    fn partial_result_checkpoints_mid_stream() {
        let mut aggregator = TradeSummaryAggregator::new();
        aggregator.accumulate(&Trade::new("ORCL", 10, 10.0));

        let checkpoint = aggregator.partial_result();
        aggregator.accumulate(&Trade::new("ORCL", 1, 1.0));

        assert_eq!(checkpoint.count(), 1);
        assert_eq!(aggregator.partial_result().count(), 2);
    }
}
