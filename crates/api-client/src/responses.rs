use core_types::OrderSide;
use rust_decimal::Decimal;
use serde::Deserialize;

// Using `#[serde(rename_all = "camelCase")]` to automatically map from JSON camelCase to Rust snake_case.

/// The envelope every Bybit v5 endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub ret_code: i64,
    pub ret_msg: String,
    pub result: Option<T>,
}

/// One page of `GET /v5/market/instruments-info`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentsResult {
    pub list: Vec<InstrumentEntry>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentEntry {
    pub symbol: String,
    pub quote_coin: String,
    pub contract_type: String,
    pub lot_size_filter: LotSizeFilter,
}

/// The exchange encodes quantities as strings; deserializing straight into
/// `Decimal` preserves the declared scale, which is what the execution
/// engine's rounding rule is derived from.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSizeFilter {
    pub min_order_qty: Decimal,
}

/// The payload of `GET /v5/market/tickers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickersResult {
    pub list: Vec<TickerEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEntry {
    pub symbol: String,
    pub last_price: Decimal,
    pub mark_price: Decimal,
    pub index_price: Decimal,
}

/// The payload of `GET /v5/position/list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsResult {
    pub list: Vec<PositionEntry>,
}

/// A raw position record. `side` is left as a string because the exchange
/// reports "None" for empty one-way-mode slots; only records with a positive
/// size are converted into [`PositionInfo`].
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
    pub side: String,
    pub size: Decimal,
}

/// The payload of a successful `POST /v5/order/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_id: String,
}

/// An open position as seen by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionInfo {
    pub side: OrderSide,
    pub size: Decimal,
}

/// Current prices for a symbol: last traded, mark, and index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolPrices {
    pub last: Decimal,
    pub mark: Decimal,
    pub index: Decimal,
}
