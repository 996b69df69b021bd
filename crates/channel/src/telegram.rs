use crate::{ChannelError, ChannelMessage, ChannelTransport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configuration::settings::TelegramConfig;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const API_BASE: &str = "https://api.telegram.org";
/// Long-poll window for the push-mode receive loop.
const LONG_POLL_SECS: u64 = 25;
/// The HTTP timeout has to outlast the long-poll window.
const HTTP_TIMEOUT: Duration = Duration::from_secs(35);
const RETRY_DELAY: Duration = Duration::from_secs(5);
const UPDATE_BATCH: usize = 100;
const PUSH_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    channel_post: Option<Post>,
}

#[derive(Debug, Deserialize)]
struct Post {
    message_id: i64,
    date: i64,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    photo: Option<serde_json::Value>,
    #[serde(default)]
    document: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    ok: bool,
    #[serde(default)]
    result: Option<ChatInfo>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatInfo {
    #[serde(default)]
    title: Option<String>,
}

/// A `ChannelTransport` over the Telegram Bot API.
///
/// Updates are consumed through `getUpdates` with a confirmed offset; the
/// offset only moves forward, so a crash-free session never re-reads a
/// confirmed update, while re-delivery after transport errors is handled by
/// the ingestor's dedup ledger.
#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    token: String,
    channel_id: i64,
    connected: Arc<AtomicBool>,
    next_offset: Arc<AtomicI64>,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self, ChannelError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?,
            token: config.bot_token.clone(),
            channel_id: config.channel_id,
            connected: Arc::new(AtomicBool::new(false)),
            next_offset: Arc::new(AtomicI64::new(0)),
        })
    }

    /// The channel's display title, for startup logging.
    pub async fn channel_title(&self) -> Result<String, ChannelError> {
        let url = format!("{API_BASE}/bot{}/getChat", self.token);
        let response: ChatResponse = self
            .client
            .get(&url)
            .query(&[("chat_id", self.channel_id.to_string())])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(ChannelError::Api(
                response
                    .description
                    .unwrap_or_else(|| "getChat failed".to_string()),
            ));
        }
        Ok(response
            .result
            .and_then(|chat| chat.title)
            .unwrap_or_else(|| "unknown".to_string()))
    }

    /// One `getUpdates` round trip. Every outcome also refreshes the sampled
    /// connectivity flag.
    async fn get_updates(
        &self,
        limit: usize,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, ChannelError> {
        let url = format!("{API_BASE}/bot{}/getUpdates", self.token);
        let offset = self.next_offset.load(Ordering::Acquire);

        let outcome = async {
            let response: UpdatesResponse = self
                .client
                .get(&url)
                .query(&[
                    ("offset", offset.to_string()),
                    ("limit", limit.to_string()),
                    ("timeout", timeout_secs.to_string()),
                    ("allowed_updates", r#"["channel_post"]"#.to_string()),
                ])
                .send()
                .await?
                .json()
                .await?;

            if !response.ok {
                return Err(ChannelError::Api(
                    response
                        .description
                        .unwrap_or_else(|| "getUpdates failed".to_string()),
                ));
            }
            Ok(response.result)
        }
        .await;

        self.connected.store(outcome.is_ok(), Ordering::Release);
        outcome
    }

    /// Confirms the fetched updates and keeps the monitored channel's posts.
    fn take_posts(&self, updates: Vec<Update>) -> Vec<ChannelMessage> {
        let mut messages = Vec::new();
        for update in updates {
            self.next_offset
                .fetch_max(update.update_id + 1, Ordering::AcqRel);

            let Some(post) = update.channel_post else {
                continue;
            };
            if post.chat.id != self.channel_id {
                continue;
            }

            messages.push(ChannelMessage {
                id: post.message_id,
                text: post.text,
                date: DateTime::from_timestamp(post.date, 0).unwrap_or_else(Utc::now),
                has_media: post.photo.is_some() || post.document.is_some(),
            });
        }
        messages
    }

    async fn receive_loop(self, sender: mpsc::Sender<ChannelMessage>) {
        tracing::info!(channel_id = self.channel_id, "transport receive loop started");

        while !sender.is_closed() {
            match self.get_updates(UPDATE_BATCH, LONG_POLL_SECS).await {
                Ok(updates) => {
                    for message in self.take_posts(updates) {
                        if sender.send(message).await.is_err() {
                            tracing::info!("subscription receiver dropped");
                            return;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "getUpdates failed, backing off");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }

        tracing::info!("transport receive loop stopped");
    }
}

#[async_trait]
impl ChannelTransport for TelegramChannel {
    async fn recent_messages(
        &self,
        limit: usize,
    ) -> Result<Vec<ChannelMessage>, ChannelError> {
        let updates = self.get_updates(limit, 0).await?;
        Ok(self.take_posts(updates))
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<ChannelMessage>, ChannelError> {
        let (sender, receiver) = mpsc::channel(PUSH_BUFFER);
        let transport = self.clone();
        tokio::spawn(transport.receive_loop(sender));
        Ok(receiver)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}
