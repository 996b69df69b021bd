//! # Channel Ingestion Crate
//!
//! Everything between the Telegram channel and the signal pipeline: the
//! transport abstraction, the Bot-API implementation, the deduplicating
//! ingestion loops (push and poll), and the connectivity monitor.
//!
//! The ingestion layer's one hard guarantee is that the pipeline is invoked
//! **at most once per distinct message id**, even when poll cycles overlap or
//! the transport re-delivers updates after a reconnect.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

pub mod error;
pub mod ingest;
pub mod telegram;

// Re-export the key components to provide a clean, public-facing API.
pub use error::ChannelError;
pub use ingest::{connectivity_monitor, MessageIngestor};
pub use telegram::TelegramChannel;

/// A single channel post as delivered by the transport.
#[derive(Debug, Clone)]
pub struct ChannelMessage {
    /// Monotonic, channel-scoped message identifier.
    pub id: i64,
    /// Media-only posts carry no text and never reach the pipeline.
    pub text: Option<String>,
    pub date: DateTime<Utc>,
    pub has_media: bool,
}

/// The channel transport boundary. Session handling, authentication, and
/// reconnection live behind this trait; the ingestion layer only sees
/// messages and a connectivity flag.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// The most recent channel posts, oldest first, at most `limit` of them.
    async fn recent_messages(&self, limit: usize)
        -> Result<Vec<ChannelMessage>, ChannelError>;

    /// Push delivery: the transport runs its own receive loop and forwards
    /// every new channel post into the returned receiver.
    async fn subscribe(&self) -> Result<mpsc::Receiver<ChannelMessage>, ChannelError>;

    /// Last-observed transport connectivity. Sampled, not probed: calling
    /// this never issues network traffic.
    fn is_connected(&self) -> bool;
}
