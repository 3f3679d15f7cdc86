use crate::{
    AggregationCoordinator, GroupAggregator, Invoker, PartitionStore, Price, Result, Trade,
    TradeSummary, TradeSummaryAggregator,
};
use std::collections::HashMap;

/// Summarises the whole trades dataset in one distributed pass.
pub fn trade_summary<S, I>(
    coordinator: &AggregationCoordinator<I>,
    store: &S,
) -> Result<TradeSummary>
where
    S: PartitionStore<Record = Trade> + Sync,
    I: Invoker,
{
    coordinator.aggregate(store, &TradeSummaryAggregator::new())
}

/// Summarises the trades dataset per symbol.
///
/// This is the chart-data flow: quantity, position count and original
/// purchase value for each distinct symbol, computed without moving raw
/// trades off their owning partitions.
pub fn summary_by_symbol<S, I>(
    coordinator: &AggregationCoordinator<I>,
    store: &S,
) -> Result<HashMap<String, TradeSummary>>
where
    S: PartitionStore<Record = Trade> + Sync,
    I: Invoker,
{
    coordinator.aggregate(
        store,
        &GroupAggregator::new(
            |trade: &Trade| trade.symbol().to_owned(),
            TradeSummaryAggregator::new(),
        ),
    )
}

/// Values each symbol's position at the current quoted prices.
///
/// Symbols without a quote are omitted from the result rather than valued
/// at zero.
pub fn valuation_by_symbol<S, I>(
    coordinator: &AggregationCoordinator<I>,
    store: &S,
    quotes: &HashMap<String, Price>,
) -> Result<HashMap<String, f64>>
where
    S: PartitionStore<Record = Trade> + Sync,
    I: Invoker,
{
    let grouped = summary_by_symbol(coordinator, store)?;
    Ok(grouped
        .into_iter()
        .filter_map(|(symbol, summary)| {
            let quote = quotes.get(&symbol)?;
            let valuation = summary.quantity() as f64 * quote.price();
            Some((symbol, valuation))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn demo_store() -> MemoryStore<Trade> {
        let mut store = MemoryStore::new(3);
        store.bulk_put([
            (1u32, Trade::new("A", 10, 10.0)),
            (2, Trade::new("A", 20, 7.5)),
            (3, Trade::new("B", 5, 12.0)),
        ]);
        store
    }

    #[test]
    fn whole_dataset_summary() {
        let summary =
            trade_summary(&AggregationCoordinator::new(), &demo_store()).unwrap();
        assert_eq!(summary, TradeSummary::from_parts(35, 3, 310.0));
    }

    #[test]
    fn per_symbol_summary() {
        let grouped =
            summary_by_symbol(&AggregationCoordinator::new(), &demo_store()).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["A"], TradeSummary::from_parts(30, 2, 250.0));
        assert_eq!(grouped["B"], TradeSummary::from_parts(5, 1, 60.0));
    }

    #[test]
    fn valuation_uses_current_quotes() {
        let quotes = HashMap::from([
            ("A".to_owned(), Price::new("A", 11.0)),
            ("B".to_owned(), Price::new("B", 10.0)),
        ]);

        let valuations =
            valuation_by_symbol(&AggregationCoordinator::new(), &demo_store(), &quotes).unwrap();
        assert_eq!(valuations["A"], 330.0);
        assert_eq!(valuations["B"], 50.0);
    }

    #[test]
    fn unquoted_symbols_are_omitted() {
        let quotes = HashMap::from([("A".to_owned(), Price::new("A", 11.0))]);

        let valuations =
            valuation_by_symbol(&AggregationCoordinator::new(), &demo_store(), &quotes).unwrap();
        assert_eq!(valuations.len(), 1);
        assert!(!valuations.contains_key("B"));
    }
}
