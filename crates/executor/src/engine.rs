use crate::error::ExecutorError;
use api_client::ExchangeApi;
use configuration::settings::TradingConfig;
use core_types::{EntrySignal, ExitMode, ExitSignal, Signal};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Quote asset appended to every signal's bare asset token.
const SYMBOL_SUFFIX: &str = "USDT";

/// The execution engine: converts typed signals into exchange calls,
/// applying leverage, position sizing, and exchange-declared quantity
/// precision.
pub struct TradeExecutor {
    api: Arc<dyn ExchangeApi>,
    trading: TradingConfig,
    min_order_qty: HashMap<String, Decimal>,
}

impl TradeExecutor {
    pub fn new(api: Arc<dyn ExchangeApi>, trading: TradingConfig) -> Self {
        Self {
            api,
            trading,
            min_order_qty: HashMap::new(),
        }
    }

    /// Loads the per-instrument minimum order quantities. Called once before
    /// the first signal; the cache is read-only afterwards and never expires
    /// during the process lifetime.
    pub async fn init_cache(&mut self) -> Result<(), ExecutorError> {
        self.min_order_qty = self.api.min_order_quantities().await?;
        tracing::info!(
            instruments = self.min_order_qty.len(),
            "instrument precision cache initialized"
        );
        Ok(())
    }

    /// Routes one signal. Noise is a no-op; a failing entry or exit aborts
    /// only that signal and surfaces its error to the caller.
    pub async fn process_signal(&self, signal: &Signal) -> Result<(), ExecutorError> {
        match signal {
            Signal::Noise => Ok(()),
            Signal::Entry(entry) => self.process_entry(entry).await,
            Signal::Exit(exit) => self.process_exit(exit).await,
        }
    }

    async fn process_entry(&self, signal: &EntrySignal) -> Result<(), ExecutorError> {
        let symbol = full_symbol(&signal.asset);
        let Some(min_qty) = self.min_order_qty.get(&symbol) else {
            tracing::warn!(%symbol, "instrument not listed on the exchange, signal skipped");
            return Ok(());
        };

        tracing::info!(
            asset = %signal.asset,
            direction = ?signal.direction,
            leverage = %signal.leverage,
            "processing entry signal"
        );

        self.api.set_leverage(&symbol, signal.leverage).await?;

        let prices = self.api.symbol_prices(&symbol).await?;

        let qty = self.position_quantity(prices.last, signal.leverage)?;
        let qty_rounded = round_quantity(qty, *min_qty);
        tracing::info!(%qty, %qty_rounded, "position quantity computed");

        let side = signal.direction.order_side();
        let order_id = self
            .api
            .place_market_order(&symbol, side, qty_rounded, signal.tp, signal.sl)
            .await?;
        tracing::info!(
            %symbol,
            ?side,
            qty = %qty_rounded,
            tp = %signal.tp,
            sl = %signal.sl,
            %order_id,
            "position opened"
        );
        Ok(())
    }

    async fn process_exit(&self, signal: &ExitSignal) -> Result<(), ExecutorError> {
        let symbol = full_symbol(&signal.asset);
        let Some(min_qty) = self.min_order_qty.get(&symbol) else {
            tracing::warn!(%symbol, "instrument not listed on the exchange, signal skipped");
            return Ok(());
        };

        // Positions are never cached; every exit looks at fresh exchange state.
        let positions = self.api.open_positions(&symbol).await?;
        let Some(position) = positions.first() else {
            tracing::info!(%symbol, "no open position, exit signal skipped");
            return Ok(());
        };

        let percent = match signal.mode {
            ExitMode::All => Decimal::from(100),
            ExitMode::Percentage(p) => p,
        };
        let qty_to_close = position.size * percent / Decimal::from(100);
        let qty_rounded = round_quantity(qty_to_close, *min_qty);

        self.api
            .close_position(&symbol, position.side.opposite(), qty_rounded)
            .await?;
        tracing::info!(
            %symbol,
            %percent,
            position_size = %position.size,
            qty = %qty_rounded,
            "position closed"
        );
        Ok(())
    }

    /// margin = balance * risk% / 100; notional = margin * leverage;
    /// qty = notional / price.
    fn position_quantity(
        &self,
        price: Decimal,
        leverage: Decimal,
    ) -> Result<Decimal, ExecutorError> {
        let margin = self.trading.account_balance * self.trading.risk_percent
            / Decimal::from(100);
        let notional = margin * leverage;
        notional.checked_div(price).ok_or_else(|| {
            ExecutorError::Calculation(format!("invalid price {price} for position sizing"))
        })
    }
}

fn full_symbol(asset: &str) -> String {
    format!("{asset}{SYMBOL_SUFFIX}")
}

/// Rounds a quantity to the precision the exchange declares through the
/// instrument's minimum order quantity: "0.001" allows three fractional
/// digits, "1" allows none. Midpoints round to even, matching the exchange's
/// own truncation tolerance.
pub fn round_quantity(qty: Decimal, min_order_qty: Decimal) -> Decimal {
    qty.round_dp(min_order_qty.scale())
}
