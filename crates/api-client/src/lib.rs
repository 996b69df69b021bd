use crate::auth::sign_request;
use crate::error::ApiError;
use crate::responses::{
    ApiEnvelope, InstrumentEntry, InstrumentsResult, OrderResult, PositionsResult, TickersResult,
};
use async_trait::async_trait;
use configuration::settings::BybitConfig;
use core_types::OrderSide;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

mod auth;
pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::{PositionInfo, SymbolPrices};

const MAINNET_URL: &str = "https://api.bybit.com";
const TESTNET_URL: &str = "https://api-testnet.bybit.com";
/// All trading happens on USDT linear perpetual contracts.
const CATEGORY: &str = "linear";
const RECV_WINDOW: u64 = 5000;
const TIMEOUT: Duration = Duration::from_secs(10);
/// Bybit's "leverage not modified" code; setting an already-active leverage
/// answers with this instead of retCode 0.
const LEVERAGE_NOT_MODIFIED: i64 = 110043;

/// The generic, abstract interface to the futures exchange.
/// This trait is the contract the execution engine works against, allowing
/// the underlying implementation (live or test double) to be swapped out.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Minimum order quantity per symbol, for every USDT-quoted linear
    /// perpetual the exchange lists. Pages through the instrument catalog
    /// until the exchange returns no further cursor.
    async fn min_order_quantities(&self) -> Result<HashMap<String, Decimal>, ApiError>;

    /// Current last/mark/index prices for a symbol.
    async fn symbol_prices(&self, symbol: &str) -> Result<SymbolPrices, ApiError>;

    /// Open positions for a symbol, filtered to a positive size. (Authenticated)
    async fn open_positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, ApiError>;

    /// Sets buy and sell leverage for a symbol; idempotent. (Authenticated)
    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), ApiError>;

    /// Places a market order with mark-price-triggered TP/SL in full-position
    /// mode and returns the exchange order id. (Authenticated)
    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
        tp: Decimal,
        sl: Decimal,
    ) -> Result<String, ApiError>;

    /// Places a reduce-only market order on the given (already-opposite)
    /// side to close part or all of a position. (Authenticated)
    async fn close_position(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
    ) -> Result<(), ApiError>;
}

/// A concrete implementation of the `ExchangeApi` for the Bybit v5 REST API.
#[derive(Clone)]
pub struct BybitClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl BybitClient {
    pub fn new(config: &BybitConfig) -> Result<Self, ApiError> {
        let base_url = if config.testnet {
            TESTNET_URL.to_string()
        } else {
            MAINNET_URL.to_string()
        };

        Ok(Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build()?,
            base_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn auth_headers(&self, timestamp: u128, signature: &str) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-BAPI-API-KEY", header_value(&self.api_key)?);
        headers.insert("X-BAPI-TIMESTAMP", header_value(&timestamp.to_string())?);
        headers.insert("X-BAPI-RECV-WINDOW", header_value(&RECV_WINDOW.to_string())?);
        headers.insert("X-BAPI-SIGN", header_value(signature)?);
        Ok(headers)
    }

    /// Unauthenticated GET against a public market endpoint.
    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &BTreeMap<&str, String>,
    ) -> Result<T, ApiError> {
        let query_string = serde_qs::to_string(params).unwrap();
        let url = format!("{}{}?{}", self.base_url, path, query_string);

        let response = self.client.get(&url).send().await?;
        decode_envelope(response, path).await
    }

    /// Signed GET; the signature covers the query string.
    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &BTreeMap<&str, String>,
    ) -> Result<T, ApiError> {
        let query_string = serde_qs::to_string(params).unwrap();
        let timestamp = now_millis();
        let signature = sign_request(
            &self.api_secret,
            &self.api_key,
            timestamp,
            RECV_WINDOW,
            &query_string,
        );
        let url = format!("{}{}?{}", self.base_url, path, query_string);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers(timestamp, &signature)?)
            .send()
            .await?;
        decode_envelope(response, path).await
    }

    /// Signed POST; the signature covers the raw JSON body.
    async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let body_string = body.to_string();
        let timestamp = now_millis();
        let signature = sign_request(
            &self.api_secret,
            &self.api_key,
            timestamp,
            RECV_WINDOW,
            &body_string,
        );
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers(timestamp, &signature)?)
            .header(CONTENT_TYPE, "application/json")
            .body(body_string)
            .send()
            .await?;
        decode_envelope(response, path).await
    }
}

#[async_trait]
impl ExchangeApi for BybitClient {
    async fn min_order_quantities(&self) -> Result<HashMap<String, Decimal>, ApiError> {
        let mut quantities = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut params = BTreeMap::new();
            params.insert("category", CATEGORY.to_string());
            params.insert("limit", "1000".to_string());
            if let Some(cursor) = &cursor {
                params.insert("cursor", cursor.clone());
            }

            let page: InstrumentsResult =
                self.get_public("/v5/market/instruments-info", &params).await?;
            retain_usdt_perpetuals(page.list, &mut quantities);

            match page.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::debug!(
            instruments = quantities.len(),
            "fetched USDT perpetual instrument metadata"
        );
        Ok(quantities)
    }

    async fn symbol_prices(&self, symbol: &str) -> Result<SymbolPrices, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("category", CATEGORY.to_string());
        params.insert("symbol", symbol.to_string());

        let result: TickersResult = self.get_public("/v5/market/tickers", &params).await?;
        let ticker = result
            .list
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::InvalidData(format!("symbol {symbol} not found")))?;

        tracing::debug!(%symbol, mark = %ticker.mark_price, "fetched symbol prices");
        Ok(SymbolPrices {
            last: ticker.last_price,
            mark: ticker.mark_price,
            index: ticker.index_price,
        })
    }

    async fn open_positions(&self, symbol: &str) -> Result<Vec<PositionInfo>, ApiError> {
        let mut params = BTreeMap::new();
        params.insert("category", CATEGORY.to_string());
        params.insert("symbol", symbol.to_string());

        let result: PositionsResult = self.get_signed("/v5/position/list", &params).await?;
        let open = collect_open_positions(result, symbol)?;

        tracing::debug!(%symbol, open = open.len(), "fetched open positions");
        Ok(open)
    }

    async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> Result<(), ApiError> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "buyLeverage": leverage.to_string(),
            "sellLeverage": leverage.to_string(),
        });

        let outcome = self
            .post_signed::<serde_json::Value>("/v5/position/set-leverage", &body)
            .await
            .map(|_| ());
        match absorb_leverage_not_modified(outcome)? {
            Applied::Changed => tracing::info!(%symbol, %leverage, "leverage set"),
            Applied::AlreadySet => tracing::info!(%symbol, %leverage, "leverage already set"),
        }
        Ok(())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
        tp: Decimal,
        sl: Decimal,
    ) -> Result<String, ApiError> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "side": side.as_str(),
            "orderType": "Market",
            "qty": qty.to_string(),
            "takeProfit": tp.to_string(),
            "tpTriggerBy": "MarkPrice",
            "tpOrderType": "Market",
            "stopLoss": sl.to_string(),
            "slTriggerBy": "MarkPrice",
            "slOrderType": "Market",
            "tpslMode": "Full",
            "orderLinkId": Uuid::new_v4().to_string(),
        });

        let result: OrderResult = self.post_signed("/v5/order/create", &body).await?;
        Ok(result.order_id)
    }

    async fn close_position(
        &self,
        symbol: &str,
        side: OrderSide,
        qty: Decimal,
    ) -> Result<(), ApiError> {
        let body = json!({
            "category": CATEGORY,
            "symbol": symbol,
            "side": side.as_str(),
            "orderType": "Market",
            "qty": qty.to_string(),
            "reduceOnly": true,
        });

        self.post_signed::<serde_json::Value>("/v5/order/create", &body)
            .await?;
        Ok(())
    }
}

/// Whether a leverage request changed anything on the exchange.
enum Applied {
    Changed,
    AlreadySet,
}

/// RetCode 110043 means the requested leverage was already active; for this
/// client that outcome is success.
fn absorb_leverage_not_modified(outcome: Result<(), ApiError>) -> Result<Applied, ApiError> {
    match outcome {
        Ok(()) => Ok(Applied::Changed),
        Err(ApiError::Exchange {
            code: LEVERAGE_NOT_MODIFIED,
            ..
        }) => Ok(Applied::AlreadySet),
        Err(e) => Err(e),
    }
}

/// Keeps only USDT-quoted linear perpetuals, mapping symbol -> minOrderQty.
fn retain_usdt_perpetuals(
    instruments: Vec<InstrumentEntry>,
    quantities: &mut HashMap<String, Decimal>,
) {
    for instrument in instruments {
        if instrument.quote_coin != "USDT" || instrument.contract_type != "LinearPerpetual" {
            continue;
        }
        quantities.insert(instrument.symbol, instrument.lot_size_filter.min_order_qty);
    }
}

/// Filters raw position records to open ones (size > 0) and resolves the
/// reported side. One-way-mode empty slots come back as side "None" with a
/// zero size and are dropped before side resolution.
fn collect_open_positions(
    result: PositionsResult,
    symbol: &str,
) -> Result<Vec<PositionInfo>, ApiError> {
    let mut open = Vec::new();
    for entry in result.list {
        if entry.size <= Decimal::ZERO {
            continue;
        }
        let side = match entry.side.as_str() {
            "Buy" => OrderSide::Buy,
            "Sell" => OrderSide::Sell,
            other => {
                return Err(ApiError::InvalidData(format!(
                    "unexpected position side '{other}' for {symbol}"
                )));
            }
        };
        open.push(PositionInfo {
            side,
            size: entry.size,
        });
    }
    Ok(open)
}

fn header_value(value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value)
        .map_err(|_| ApiError::InvalidData("credential is not a valid header value".to_string()))
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis()
}

async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &str,
) -> Result<T, ApiError> {
    let text = response.text().await?;
    let envelope: ApiEnvelope<T> = serde_json::from_str(&text).map_err(|e| {
        ApiError::Deserialization(format!("[{endpoint}] {e}. Original text: {text}"))
    })?;
    check_envelope(envelope, endpoint)
}

fn check_envelope<T>(envelope: ApiEnvelope<T>, endpoint: &str) -> Result<T, ApiError> {
    if envelope.ret_code != 0 {
        return Err(ApiError::Exchange {
            code: envelope.ret_code,
            message: format!("[{endpoint}] {}", envelope.ret_msg),
        });
    }
    envelope
        .result
        .ok_or_else(|| ApiError::InvalidData(format!("[{endpoint}] missing result payload")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn envelope_with_error_code_maps_to_exchange_error() {
        let raw = r#"{"retCode":10004,"retMsg":"error sign!","result":null}"#;
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_str(raw).unwrap();
        match check_envelope(envelope, "/v5/order/create") {
            Err(ApiError::Exchange { code, message }) => {
                assert_eq!(code, 10004);
                assert!(message.contains("error sign!"));
            }
            other => panic!("expected exchange error, got {other:?}"),
        }
    }

    #[test]
    fn leverage_not_modified_is_success() {
        let outcome = Err(ApiError::Exchange {
            code: LEVERAGE_NOT_MODIFIED,
            message: "leverage not modified".to_string(),
        });
        assert!(matches!(
            absorb_leverage_not_modified(outcome),
            Ok(Applied::AlreadySet)
        ));

        let outcome = Err(ApiError::Exchange {
            code: 110001,
            message: "order not exists".to_string(),
        });
        assert!(absorb_leverage_not_modified(outcome).is_err());
    }

    #[test]
    fn instrument_filter_keeps_only_usdt_perpetuals() {
        let raw = r#"{
            "list": [
                {"symbol":"BTCUSDT","quoteCoin":"USDT","contractType":"LinearPerpetual","lotSizeFilter":{"minOrderQty":"0.001"}},
                {"symbol":"BTCUSDC","quoteCoin":"USDC","contractType":"LinearPerpetual","lotSizeFilter":{"minOrderQty":"0.001"}},
                {"symbol":"BTCUSDT-29MAR24","quoteCoin":"USDT","contractType":"LinearFutures","lotSizeFilter":{"minOrderQty":"0.001"}},
                {"symbol":"ETHUSDT","quoteCoin":"USDT","contractType":"LinearPerpetual","lotSizeFilter":{"minOrderQty":"0.01"}}
            ],
            "nextPageCursor": ""
        }"#;
        let page: InstrumentsResult = serde_json::from_str(raw).unwrap();

        let mut quantities = HashMap::new();
        retain_usdt_perpetuals(page.list, &mut quantities);

        assert_eq!(quantities.len(), 2);
        assert_eq!(quantities["BTCUSDT"], dec!(0.001));
        assert_eq!(quantities["ETHUSDT"], dec!(0.01));
        // The declared scale carries the rounding precision downstream.
        assert_eq!(quantities["BTCUSDT"].scale(), 3);
    }

    #[test]
    fn open_positions_skip_empty_one_way_slots() {
        let raw = r#"{"list":[
            {"side":"None","size":"0"},
            {"side":"Buy","size":"1.5"}
        ]}"#;
        let result: PositionsResult = serde_json::from_str(raw).unwrap();

        let open = collect_open_positions(result, "BTCUSDT").unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].side, OrderSide::Buy);
        assert_eq!(open[0].size, dec!(1.5));
    }

    #[test]
    fn unknown_position_side_is_rejected() {
        let raw = r#"{"list":[{"side":"Both","size":"2"}]}"#;
        let result: PositionsResult = serde_json::from_str(raw).unwrap();
        assert!(collect_open_positions(result, "BTCUSDT").is_err());
    }
}
