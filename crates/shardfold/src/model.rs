/// A single position in the trades dataset.
///
/// The purchase value is derived, not stored: `quantity * price` at the time
/// the trade was placed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    symbol: String,
    quantity: u64,
    price: f64,
}

impl Trade {
    /// Creates a trade for `quantity` units of `symbol` at `price` per unit.
    pub fn new(symbol: impl Into<String>, quantity: u64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            price,
        }
    }

    /// The ticker symbol this trade is for.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Number of units purchased.
    pub const fn quantity(&self) -> u64 {
        self.quantity
    }

    /// Price per unit at time of purchase.
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Total value of this trade at time of purchase.
    pub fn purchase_value(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// The current quoted price for a symbol.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price {
    symbol: String,
    price: f64,
}

impl Price {
    /// Creates a quote for `symbol` at `price` per unit.
    pub fn new(symbol: impl Into<String>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
        }
    }

    /// The ticker symbol this quote is for.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The current price per unit.
    pub const fn price(&self) -> f64 {
        self.price
    }

    /// Replaces the quoted price.
    pub fn set_price(&mut self, price: f64) {
        self.price = price;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_value_is_quantity_times_price() {
        let trade = Trade::new("ORCL", 40, 12.5);
        assert_eq!(trade.purchase_value(), 500.0);
    }

    #[test]
    fn price_updates_in_place() {
        let mut quote = Price::new("ORCL", 12.5);
        quote.set_price(13.0);
        assert_eq!(quote.price(), 13.0);
        assert_eq!(quote.symbol(), "ORCL");
    }
}
