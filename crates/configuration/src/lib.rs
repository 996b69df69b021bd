// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{
    BybitConfig, Config, DeliveryMode, IngestionConfig, OpenRouterConfig, TelegramConfig,
    TradingConfig,
};

/// Loads the application configuration.
///
/// Values come from an optional `config.toml` next to the binary, overridden
/// by `APP`-prefixed environment variables (`APP__TRADING__RISK_PERCENT=5`).
/// The result still has to pass [`Config::validate`] before the pipeline is
/// constructed.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config.toml").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;

    Ok(config)
}
