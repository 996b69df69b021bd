use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub openrouter: OpenRouterConfig,
    pub bybit: BybitConfig,
    pub trading: TradingConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

/// Channel transport credentials and the monitored channel.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Numeric channel identifier (e.g. -1001234567890).
    pub channel_id: i64,
}

/// Credentials for the LLM routing service used to classify messages.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenRouterConfig {
    pub api_key: String,
    /// Model identifier passed to the chat-completions endpoint.
    pub model: String,
}

/// Exchange account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct BybitConfig {
    pub api_key: String,
    pub api_secret: String,
    /// Route calls to the exchange testnet instead of the live account.
    #[serde(default)]
    pub testnet: bool,
}

/// Position-sizing inputs shared by every entry signal.
#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Account balance used for margin calculations, in USDT.
    pub account_balance: Decimal,
    /// Percentage of the balance committed as margin per trade, in (0, 100].
    pub risk_percent: Decimal,
}

/// How new channel messages reach the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// The transport's own receive loop pushes messages as they arrive.
    Push,
    /// The ingestor fetches the most recent messages on a fixed interval.
    Poll,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestionConfig {
    #[serde(default = "default_mode")]
    pub mode: DeliveryMode,
    /// Poll-mode fetch period, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Number of most-recent messages fetched per poll cycle.
    #[serde(default = "default_poll_limit")]
    pub poll_limit: usize,
    /// Connectivity sampling period, in seconds.
    #[serde(default = "default_connectivity_interval")]
    pub connectivity_interval_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            poll_interval_secs: default_poll_interval(),
            poll_limit: default_poll_limit(),
            connectivity_interval_secs: default_connectivity_interval(),
        }
    }
}

fn default_mode() -> DeliveryMode {
    DeliveryMode::Push
}

fn default_poll_interval() -> u64 {
    2
}

fn default_poll_limit() -> usize {
    10
}

fn default_connectivity_interval() -> u64 {
    30
}

impl Config {
    /// Checks every value the pipeline depends on. A violation here is fatal
    /// at startup, before any collaborator is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Validation(
                "telegram.bot_token must not be empty".to_string(),
            ));
        }
        if self.telegram.channel_id == 0 {
            return Err(ConfigError::Validation(
                "telegram.channel_id must be set".to_string(),
            ));
        }
        if self.openrouter.api_key.is_empty() {
            return Err(ConfigError::Validation(
                "openrouter.api_key must not be empty".to_string(),
            ));
        }
        if self.openrouter.model.is_empty() {
            return Err(ConfigError::Validation(
                "openrouter.model must not be empty".to_string(),
            ));
        }
        if self.bybit.api_key.is_empty() || self.bybit.api_secret.is_empty() {
            return Err(ConfigError::Validation(
                "bybit.api_key and bybit.api_secret must not be empty".to_string(),
            ));
        }
        if self.trading.account_balance <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!(
                "trading.account_balance must be positive, got {}",
                self.trading.account_balance
            )));
        }
        if self.trading.risk_percent <= Decimal::ZERO
            || self.trading.risk_percent > Decimal::from(100)
        {
            return Err(ConfigError::Validation(format!(
                "trading.risk_percent must be in (0, 100], got {}",
                self.trading.risk_percent
            )));
        }
        if self.ingestion.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "ingestion.poll_interval_secs must be non-zero".to_string(),
            ));
        }
        if self.ingestion.poll_limit == 0 {
            return Err(ConfigError::Validation(
                "ingestion.poll_limit must be non-zero".to_string(),
            ));
        }
        if self.ingestion.connectivity_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "ingestion.connectivity_interval_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_config() -> Config {
        Config {
            telegram: TelegramConfig {
                bot_token: "123456:token".to_string(),
                channel_id: -1001234567890,
            },
            openrouter: OpenRouterConfig {
                api_key: "or-key".to_string(),
                model: "deepseek/deepseek-chat".to_string(),
            },
            bybit: BybitConfig {
                api_key: "bybit-key".to_string(),
                api_secret: "bybit-secret".to_string(),
                testnet: false,
            },
            trading: TradingConfig {
                account_balance: dec!(1000),
                risk_percent: dec!(5),
            },
            ingestion: IngestionConfig::default(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_balance() {
        let mut config = valid_config();
        config.trading.account_balance = Decimal::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_risk_percent_above_hundred() {
        let mut config = valid_config();
        config.trading.risk_percent = dec!(100.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_risk_percent() {
        let mut config = valid_config();
        config.trading.risk_percent = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_missing_credentials() {
        let mut config = valid_config();
        config.bybit.api_secret.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let mut config = valid_config();
        config.ingestion.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
