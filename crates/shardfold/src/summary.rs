/// A commutative, associative summary of a set of trades.
///
/// `TradeSummary` is the partial result exchanged between partitions during
/// a distributed aggregation: each partition folds its resident records into
/// its own summary, and summaries [`combine`](Self::combine) losslessly in
/// any order. Formally, `(TradeSummary, combine, empty)` is a commutative
/// monoid, which is what makes unordered, concurrent combination safe.
///
/// `quantity` and `count` sum as integers. `purchase_value` sums as `f64`,
/// so the combination order affects its least-significant bits; compare
/// distributed results against a sequential reference with a relative
/// tolerance, not exact equality.
///
/// # Example
///
/// ```
/// use shardfold::TradeSummary;
///
/// let mut a = TradeSummary::new();
/// a.add(10, 100.0);
/// a.add(20, 150.0);
///
/// let mut b = TradeSummary::new();
/// b.add(5, 60.0);
///
/// a.combine(&b);
/// assert_eq!(a.quantity(), 35);
/// assert_eq!(a.count(), 3);
/// assert_eq!(a.purchase_value(), 310.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeSummary {
    quantity: u64,
    count: u64,
    purchase_value: f64,
}

impl TradeSummary {
    /// Creates an empty summary, the identity element for
    /// [`combine`](Self::combine).
    pub const fn new() -> Self {
        Self {
            quantity: 0,
            count: 0,
            purchase_value: 0.0,
        }
    }

    /// Creates a summary from explicit accumulator values.
    ///
    /// Primarily useful for restoring a checkpointed partial result or for
    /// constructing expected values in tests.
    pub const fn from_parts(quantity: u64, count: u64, purchase_value: f64) -> Self {
        Self {
            quantity,
            count,
            purchase_value,
        }
    }

    /// Folds a single record's contribution into this summary.
    pub fn add(&mut self, quantity: u64, purchase_value: f64) {
        self.quantity += quantity;
        self.count += 1;
        self.purchase_value += purchase_value;
    }

    /// Merges another partial summary into this one.
    ///
    /// Commutative and associative; combining with an empty summary is a
    /// no-op.
    pub fn combine(&mut self, other: &Self) {
        self.quantity += other.quantity;
        self.count += other.count;
        self.purchase_value += other.purchase_value;
    }

    /// Total quantity across all records seen.
    pub const fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Number of records seen.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Sum of the purchase value across all records seen.
    pub const fn purchase_value(&self) -> f64 {
        self.purchase_value
    }

    /// Returns `true` if no records have been folded in.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        let scale = a.abs().max(b.abs()).max(1.0);
        (a - b).abs() <= 1e-9 * scale
    }

    #[test]
    fn empty_is_identity() {
        let mut summary = TradeSummary::from_parts(500, 3, 1000.0);
        summary.combine(&TradeSummary::new());
        assert_eq!(summary, TradeSummary::from_parts(500, 3, 1000.0));
    }

    #[test]
    fn combine_is_commutative() {
        let a = TradeSummary::from_parts(500, 3, 1000.5);
        let b = TradeSummary::from_parts(100, 1, 50.25);

        let mut ab = a.clone();
        ab.combine(&b);
        let mut ba = b.clone();
        ba.combine(&a);

        assert_eq!(ab, ba);
    }

    #[test]
    fn combine_is_associative() {
        let a = TradeSummary::from_parts(1, 1, 0.125);
        let b = TradeSummary::from_parts(2, 1, 0.25);
        let c = TradeSummary::from_parts(4, 1, 0.5);

        let mut left = a.clone();
        left.combine(&b);
        left.combine(&c);

        let mut bc = b.clone();
        bc.combine(&c);
        let mut right = a.clone();
        right.combine(&bc);

        assert_eq!(left, right);
    }

    #[test]
    fn arbitrary_partitioning_matches_single_pass() {
        use rand::Rng;

        let mut rng = rand::rng();
        let records: Vec<(u64, f64)> = (0..512)
            .map(|_| (rng.random_range(1..1000u64), rng.random_range(0.01..5000.0f64)))
            .collect();

        let mut reference = TradeSummary::new();
        for &(quantity, value) in &records {
            reference.add(quantity, value);
        }

        // Scatter the same records across a random number of groups and
        // combine the per-group summaries.
        let groups = rng.random_range(1..16usize);
        let mut partials = vec![TradeSummary::new(); groups];
        for &(quantity, value) in &records {
            partials[rng.random_range(0..groups)].add(quantity, value);
        }

        let mut combined = TradeSummary::new();
        for partial in &partials {
            combined.combine(partial);
        }

        assert_eq!(combined.quantity(), reference.quantity());
        assert_eq!(combined.count(), reference.count());
        assert!(approx_eq(
            combined.purchase_value(),
            reference.purchase_value()
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn summary_serializes_accumulators() {
        let summary = TradeSummary::from_parts(30, 2, 250.0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["quantity"], 30);
        assert_eq!(json["count"], 2);
        assert_eq!(json["purchase_value"], 250.0);
    }
}
