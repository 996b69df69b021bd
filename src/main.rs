use anyhow::Context;
use api_client::{BybitClient, ExchangeApi};
use channel::{connectivity_monitor, ChannelTransport, MessageIngestor, TelegramChannel};
use classifier::{Classifier, OpenRouterClassifier};
use configuration::DeliveryMode;
use engine::{guarded, HandlerStats, SignalPipeline};
use executor::TradeExecutor;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Herald signal-trading application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file is a development convenience; deployments set real
    // environment variables.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("starting herald");

    let config = configuration::load_config().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    // Construct every collaborator once and inject it where needed; nothing
    // below holds process-wide singletons.
    let api: Arc<dyn ExchangeApi> =
        Arc::new(BybitClient::new(&config.bybit).context("failed to build exchange client")?);
    let llm: Arc<dyn Classifier> = Arc::new(
        OpenRouterClassifier::new(&config.openrouter).context("failed to build classifier")?,
    );
    let telegram =
        TelegramChannel::new(&config.telegram).context("failed to build channel transport")?;

    match telegram.channel_title().await {
        Ok(title) => {
            tracing::info!(channel = %title, channel_id = config.telegram.channel_id, "monitoring channel")
        }
        Err(e) => {
            tracing::warn!(error = %e, channel_id = config.telegram.channel_id, "could not resolve channel title")
        }
    }

    let mut executor = TradeExecutor::new(Arc::clone(&api), config.trading.clone());
    executor
        .init_cache()
        .await
        .context("failed to initialize the instrument precision cache")?;

    let pipeline = Arc::new(SignalPipeline::new(llm, Arc::new(executor)));
    let stats = Arc::new(HandlerStats::new());

    let transport: Arc<dyn ChannelTransport> = Arc::new(telegram);
    let mut ingestor = MessageIngestor::new(Arc::clone(&transport));
    ingestor
        .seed()
        .await
        .context("failed to seed the message ledger")?;

    let shutdown = CancellationToken::new();

    let handler = {
        let pipeline = Arc::clone(&pipeline);
        let stats = Arc::clone(&stats);
        move |message: channel::ChannelMessage| {
            let pipeline = Arc::clone(&pipeline);
            let stats = Arc::clone(&stats);
            async move {
                guarded(&stats, message.text.as_deref(), pipeline.handle(&message)).await;
            }
        }
    };

    let ingestion = match config.ingestion.mode {
        DeliveryMode::Push => {
            let token = shutdown.clone();
            tokio::spawn(async move {
                if let Err(e) = ingestor.run_push(handler, token).await {
                    tracing::error!(error = %e, "push ingestion failed");
                }
            })
        }
        DeliveryMode::Poll => tokio::spawn(ingestor.run_poll(
            Duration::from_secs(config.ingestion.poll_interval_secs),
            config.ingestion.poll_limit,
            handler,
            shutdown.clone(),
        )),
    };

    let monitor = tokio::spawn(connectivity_monitor(
        Arc::clone(&transport),
        Duration::from_secs(config.ingestion.connectivity_interval_secs),
        shutdown.clone(),
    ));

    tracing::info!("herald is running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for the shutdown signal")?;
    tracing::info!("shutdown signal received");

    shutdown.cancel();
    let _ = ingestion.await;
    let _ = monitor.await;

    tracing::info!(stats = %stats.summary(), "herald stopped");
    Ok(())
}
