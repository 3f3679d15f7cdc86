use crate::StreamingAggregator;
use std::collections::HashMap;
use std::hash::Hash;

/// Group-by-then-aggregate composition over any [`StreamingAggregator`].
///
/// Extracts a grouping key from each record and routes the record to a
/// per-key inner aggregator created via the inner `supply()`. Partials are
/// per-key maps, merged key-by-key with the inner `combine`, so the
/// composition inherits the inner aggregator's monoid laws and remains safe
/// to run fully in parallel.
///
/// # Example
///
/// ```
/// use shardfold::{GroupAggregator, StreamingAggregator, Trade, TradeSummaryAggregator};
///
/// let mut by_symbol = GroupAggregator::new(
///     |trade: &Trade| trade.symbol().to_owned(),
///     TradeSummaryAggregator::new(),
/// );
/// by_symbol.accumulate(&Trade::new("A", 10, 10.0));
/// by_symbol.accumulate(&Trade::new("A", 20, 7.5));
/// by_symbol.accumulate(&Trade::new("B", 5, 12.0));
///
/// let grouped = by_symbol.finalize();
/// assert_eq!(grouped["A"].quantity(), 30);
/// assert_eq!(grouped["B"].count(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct GroupAggregator<K, A, F> {
    key_fn: F,
    prototype: A,
    groups: HashMap<K, A>,
}

impl<K, A, F> GroupAggregator<K, A, F>
where
    K: Eq + Hash + Clone,
    A: StreamingAggregator,
    F: Fn(&A::Record) -> K + Clone,
{
    /// Creates a grouped aggregator from a key extractor and an inner
    /// aggregator prototype.
    ///
    /// The prototype is never accumulated into directly; it only serves as
    /// the `supply()` source for per-key instances.
    pub fn new(key_fn: F, prototype: A) -> Self {
        Self {
            key_fn,
            prototype,
            groups: HashMap::new(),
        }
    }

    /// Number of distinct keys seen so far.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl<K, A, F> StreamingAggregator for GroupAggregator<K, A, F>
where
    K: Eq + Hash + Clone,
    A: StreamingAggregator,
    F: Fn(&A::Record) -> K + Clone,
{
    type Record = A::Record;
    type Partial = HashMap<K, A::Partial>;
    type Output = HashMap<K, A::Output>;

    fn supply(&self) -> Self {
        Self {
            key_fn: self.key_fn.clone(),
            prototype: self.prototype.supply(),
            groups: HashMap::new(),
        }
    }

    fn accumulate(&mut self, record: &Self::Record) -> bool {
        let key = (self.key_fn)(record);
        let prototype = &self.prototype;
        let group = self
            .groups
            .entry(key)
            .or_insert_with(|| prototype.supply());
        group.accumulate(record)
    }

    fn combine(&mut self, partial: Self::Partial) -> bool {
        for (key, upstream) in partial {
            let prototype = &self.prototype;
            let group = self
                .groups
                .entry(key)
                .or_insert_with(|| prototype.supply());
            if !group.combine(upstream) {
                return false;
            }
        }
        true
    }

    fn partial_result(&self) -> Self::Partial {
        self.groups
            .iter()
            .map(|(key, group)| (key.clone(), group.partial_result()))
            .collect()
    }

    fn finalize(self) -> Self::Output {
        self.groups
            .into_iter()
            .map(|(key, group)| (key, group.finalize()))
            .collect()
    }
}
