//! FX value objects
//!
//! Rates and account transactions as they flow through the event bridge.
//! The bridge never interprets them; they are copied into event info
//! snapshots and handed back to reactions untouched.

use crate::error::{BridgeError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Currency pair, e.g. `EUR/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pair {
    /// Base currency
    pub base: String,
    /// Quote currency
    pub quote: String,
}

impl Pair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.to_string(),
            quote: quote.to_string(),
        }
    }

    /// Parse a pair written as `BASE/QUOTE`
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !quote.contains('/') =>
            {
                Ok(Self::new(base.trim(), quote.trim()))
            }
            _ => Err(BridgeError::InvalidPair(s.to_string())),
        }
    }
}

impl FromStr for Pair {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// A bid/ask quote at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tick {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Tick {
    pub fn new(timestamp: i64, bid: Decimal, ask: Decimal) -> Self {
        Self { timestamp, bid, ask }
    }

    /// Get mid price
    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Get spread
    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.timestamp, self.bid, self.ask)
    }
}

/// Kind of account transaction, e.g. `Order Cancelled`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionType(String);

impl TransactionType {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TransactionType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An account transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction number, unique per account
    pub number: i64,
    pub kind: TransactionType,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub pair: Pair,
    /// Signed units: positive buys, negative sells
    pub units: i64,
    pub price: Decimal,
    /// Account balance after the transaction
    pub balance: Decimal,
}

impl Transaction {
    pub fn new(number: i64, kind: TransactionType, timestamp: i64, pair: Pair) -> Self {
        Self {
            number,
            kind,
            timestamp,
            pair,
            units: 0,
            price: Decimal::ZERO,
            balance: Decimal::ZERO,
        }
    }

    /// Set units and price
    pub fn with_fill(mut self, units: i64, price: Decimal) -> Self {
        self.units = units;
        self.price = price;
        self
    }

    /// Set the resulting balance
    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }

    pub fn is_buy(&self) -> bool {
        self.units > 0
    }

    pub fn is_sell(&self) -> bool {
        self.units < 0
    }

    pub fn description(&self) -> String {
        let side = if self.is_buy() {
            "buy"
        } else if self.is_sell() {
            "sell"
        } else {
            "flat"
        };
        format!(
            "#{} {} {} {} {} @ {} (balance {})",
            self.number,
            self.kind,
            side,
            self.units.abs(),
            self.pair,
            self.price,
            self.balance
        )
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pair_parse() {
        let pair = Pair::parse("EUR/USD").unwrap();
        assert_eq!(pair.base, "EUR");
        assert_eq!(pair.quote, "USD");
        assert_eq!(pair.to_string(), "EUR/USD");
        assert_eq!("USD/JPY".parse::<Pair>().unwrap(), Pair::new("USD", "JPY"));
    }

    #[test]
    fn test_pair_parse_rejects_garbage() {
        assert!(matches!(Pair::parse("EURUSD"), Err(BridgeError::InvalidPair(_))));
        assert!(Pair::parse("/USD").is_err());
        assert!(Pair::parse("EUR/").is_err());
        assert!(Pair::parse("EUR/USD/JPY").is_err());
    }

    #[test]
    fn test_tick_prices() {
        let tick = Tick::new(1000, dec!(1.1000), dec!(1.1002));
        assert_eq!(tick.mid(), dec!(1.1001));
        assert_eq!(tick.spread(), dec!(0.0002));
    }

    #[test]
    fn test_transaction_type() {
        assert_eq!(TransactionType::default().to_string(), "");
        let kind = TransactionType::from("Order Cancelled");
        assert_eq!(kind.to_string(), "Order Cancelled");
        assert!(TransactionType::new("A") < TransactionType::new("B"));
    }

    #[test]
    fn test_transaction_side() {
        let pair = Pair::new("EUR", "USD");
        let buy = Transaction::new(1, "Buy Market".into(), 10, pair.clone())
            .with_fill(100, dec!(1.1))
            .with_balance(dec!(1000));
        let sell = Transaction::new(2, "Sell Market".into(), 11, pair).with_fill(-50, dec!(1.2));

        assert!(buy.is_buy() && !buy.is_sell());
        assert!(sell.is_sell() && !sell.is_buy());
        assert!(buy.description().contains("buy 100 EUR/USD"));
        assert!(sell.to_string().contains("sell 50"));
    }
}
