//! Random stock-trade generation
//!
//! This is the event source feeding the emission loop: each event is one
//! JSON-serialized trade plus a random 128-bit partition key spreading the
//! records across the stream's shards.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tradestream_emitter::{Event, EventSource, SourceError};

/// Ticker symbols and reference prices the generator draws from
const STOCKS: &[(&str, f64)] = &[
    ("AAPL", 119.72),
    ("XOM", 91.56),
    ("GOOG", 527.83),
    ("BRK.A", 223999.88),
    ("AMZN", 370.56),
    ("MSFT", 44.40),
    ("SLB", 80.34),
    ("MMM", 158.42),
    ("T", 32.77),
    ("KO", 43.04),
];

/// Generated prices deviate at most this fraction from the reference price
const MAX_PRICE_DEVIATION: f64 = 0.05;

const MAX_QUANTITY: u64 = 10_000;

/// Captures the key elements of a stock trade: the ticker symbol, price,
/// number of shares, the type of the trade, and an id uniquely identifying
/// the trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StockTrade {
    pub(crate) ticker_symbol: String,
    pub(crate) trade_type: TradeType,
    pub(crate) price: f64,
    pub(crate) quantity: u64,
    pub(crate) id: u64,
    pub(crate) time_in_nanos: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub(crate) enum TradeType {
    Buy,
    Sell,
}

/// Produces an unbounded sequence of random trades
#[derive(Debug)]
pub(crate) struct RandomTradeSource {
    rng: SmallRng,
    next_id: u64,
}

impl RandomTradeSource {
    pub(crate) fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }

    fn with_rng(rng: SmallRng) -> Self {
        Self { rng, next_id: 1 }
    }

    fn next_trade(&mut self) -> StockTrade {
        let (ticker_symbol, reference_price) =
            STOCKS[self.rng.gen_range(0..STOCKS.len())];
        let deviation = self
            .rng
            .gen_range(-MAX_PRICE_DEVIATION..=MAX_PRICE_DEVIATION);
        // round to cents
        let price = f64::round(reference_price * (1.0 + deviation) * 100.0) / 100.0;
        let trade_type = if self.rng.gen_bool(0.5) {
            TradeType::Buy
        } else {
            TradeType::Sell
        };
        let id = self.next_id;
        self.next_id += 1;

        StockTrade {
            ticker_symbol: ticker_symbol.to_string(),
            trade_type,
            price,
            quantity: self.rng.gen_range(1..=MAX_QUANTITY),
            id,
            time_in_nanos: unix_nanos(),
        }
    }
}

impl EventSource for RandomTradeSource {
    fn next_event(&mut self) -> Result<Event, SourceError> {
        let trade = self.next_trade();
        debug!(?trade, "generated trade");
        let payload = serde_json::to_vec(&trade)
            .map_err(|e| SourceError::new(format!("could not serialize trade to JSON: {e}")))?;
        // a random 128-bit key in decimal form, the full explicit-hash key range
        let partition_key = self.rng.gen::<u128>().to_string();
        Ok(Event {
            payload: Bytes::from(payload),
            partition_key,
        })
    }
}

fn unix_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the unix epoch")
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn trade_serializes_with_wire_field_names() {
        let trade = StockTrade {
            ticker_symbol: "AAPL".to_string(),
            trade_type: TradeType::Buy,
            price: 119.72,
            quantity: 400,
            id: 1,
            time_in_nanos: 123,
        };
        let json = serde_json::to_value(&trade).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tickerSymbol": "AAPL",
                "tradeType": "BUY",
                "price": 119.72,
                "quantity": 400,
                "id": 1,
                "timeInNanos": 123,
            })
        );
    }

    #[test]
    fn generated_trades_stay_in_range() {
        let mut source = RandomTradeSource::with_rng(SmallRng::seed_from_u64(42));
        for expected_id in 1..=100 {
            let trade = source.next_trade();
            let (_, reference_price) = STOCKS
                .iter()
                .find(|(t, _)| *t == trade.ticker_symbol)
                .expect("ticker from the table");
            assert!(trade.price >= reference_price * (1.0 - MAX_PRICE_DEVIATION) - 0.01);
            assert!(trade.price <= reference_price * (1.0 + MAX_PRICE_DEVIATION) + 0.01);
            assert!((1..=MAX_QUANTITY).contains(&trade.quantity));
            assert_eq!(trade.id, expected_id);
        }
    }

    #[test]
    fn events_carry_full_range_partition_keys() {
        let mut source = RandomTradeSource::with_rng(SmallRng::seed_from_u64(42));
        let event = source.next_event().unwrap();
        event
            .partition_key
            .parse::<u128>()
            .expect("partition key is a decimal 128-bit value");
        let trade: StockTrade = serde_json::from_slice(&event.payload).unwrap();
        assert_eq!(trade.id, 1);
    }
}
