use crate::{ChannelError, ChannelMessage, ChannelTransport};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Number of most-recent messages used to seed the dedup ledger at startup.
const SEED_LIMIT: usize = 1;

/// Delivers new channel messages to a handler, exactly once per message id.
///
/// The ingestor is the single writer of the dedup ledger; exactly one
/// delivery mode (push or poll) runs at a time. Overlapping dispatches are
/// not serialized per asset — two messages can race on the exchange while
/// both are suspended on network calls.
pub struct MessageIngestor {
    transport: Arc<dyn ChannelTransport>,
    processed: HashSet<i64>,
}

impl MessageIngestor {
    pub fn new(transport: Arc<dyn ChannelTransport>) -> Self {
        Self {
            transport,
            processed: HashSet::new(),
        }
    }

    /// Marks the newest pre-existing message(s) as processed so that posts
    /// published before startup are never dispatched.
    pub async fn seed(&mut self) -> Result<(), ChannelError> {
        let recent = self.transport.recent_messages(SEED_LIMIT).await?;
        for message in &recent {
            self.processed.insert(message.id);
        }
        tracing::info!(seeded = recent.len(), "message ledger seeded");
        Ok(())
    }

    /// Poll mode: every `interval`, fetch the most recent `limit` messages
    /// and dispatch the not-yet-seen ones, oldest first.
    pub async fn run_poll<F, Fut>(
        mut self,
        interval: Duration,
        limit: usize,
        handler: F,
        shutdown: CancellationToken,
    ) where
        F: Fn(ChannelMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        tracing::info!(interval_secs = interval.as_secs(), "poll ingestion started");
        let mut ticker = tokio::time::interval(interval);

        loop {
            // Shutdown wins over a due tick, so cancellation never triggers
            // one more fetch.
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let batch = match self.transport.recent_messages(limit).await {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to fetch channel messages");
                    continue;
                }
            };

            let mut fresh: Vec<ChannelMessage> = batch
                .into_iter()
                .filter(|message| !self.processed.contains(&message.id))
                .collect();
            fresh.sort_by_key(|message| message.id);

            for message in fresh {
                // The id enters the ledger before dispatch, so an overlapping
                // poll cycle can never re-dispatch the same message.
                self.processed.insert(message.id);
                handler(message).await;
            }
        }

        tracing::info!("poll ingestion stopped");
    }

    /// Push mode: drain the transport's subscription, with the same
    /// insert-before-dispatch dedup as poll mode.
    pub async fn run_push<F, Fut>(
        mut self,
        handler: F,
        shutdown: CancellationToken,
    ) -> Result<(), ChannelError>
    where
        F: Fn(ChannelMessage) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut receiver = self.transport.subscribe().await?;
        tracing::info!("push ingestion started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                message = receiver.recv() => {
                    let Some(message) = message else {
                        tracing::warn!("transport subscription closed");
                        break;
                    };
                    if !self.processed.insert(message.id) {
                        continue;
                    }
                    handler(message).await;
                }
            }
        }

        tracing::info!("push ingestion stopped");
        Ok(())
    }
}

/// Samples transport connectivity on a fixed interval and logs only on state
/// transitions. Observability only: ingestion is never paused or resumed
/// from here, and reconnection is the transport's own business.
pub async fn connectivity_monitor(
    transport: Arc<dyn ChannelTransport>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    let mut connected = transport.is_connected();
    tracing::info!(connected, "connectivity monitor started");
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let now = transport.is_connected();
        if now != connected {
            if now {
                tracing::info!("channel transport reconnected");
            } else {
                tracing::warn!("channel transport connection lost");
            }
            connected = now;
        }
    }

    tracing::info!("connectivity monitor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn message(id: i64) -> ChannelMessage {
        ChannelMessage {
            id,
            text: Some(format!("message {id}")),
            date: Utc::now(),
            has_media: false,
        }
    }

    /// Answers `recent_messages` from a script of poll batches and cancels
    /// the provided token when the script runs out.
    struct ScriptedTransport {
        batches: Mutex<VecDeque<Vec<ChannelMessage>>>,
        done: CancellationToken,
    }

    impl ScriptedTransport {
        fn new(batches: Vec<Vec<ChannelMessage>>, done: CancellationToken) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                done,
            }
        }
    }

    #[async_trait]
    impl ChannelTransport for ScriptedTransport {
        async fn recent_messages(
            &self,
            _limit: usize,
        ) -> Result<Vec<ChannelMessage>, ChannelError> {
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => Ok(batch),
                None => {
                    self.done.cancel();
                    Ok(Vec::new())
                }
            }
        }

        async fn subscribe(&self) -> Result<mpsc::Receiver<ChannelMessage>, ChannelError> {
            let (tx, rx) = mpsc::channel(16);
            for batch in self.batches.lock().unwrap().drain(..) {
                for message in batch {
                    tx.try_send(message).unwrap();
                }
            }
            // Dropping the sender ends the subscription after the backlog.
            Ok(rx)
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    /// A handler that records dispatched message ids into `seen`.
    fn recording_handler(
        seen: &Arc<Mutex<Vec<i64>>>,
    ) -> impl Fn(ChannelMessage) -> std::future::Ready<()> {
        let seen = Arc::clone(seen);
        move |message: ChannelMessage| {
            seen.lock().unwrap().push(message.id);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_poll_batches_dispatch_each_id_once() {
        let done = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                vec![message(1), message(2)],
                vec![message(2), message(3), message(4)],
                vec![message(4)],
            ],
            done.clone(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&seen);

        let ingestor = MessageIngestor::new(transport);
        ingestor
            .run_poll(Duration::from_secs(2), 10, handler, done)
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_dispatches_oldest_first() {
        let done = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![vec![message(7), message(5), message(6)]],
            done.clone(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&seen);

        let ingestor = MessageIngestor::new(transport);
        ingestor
            .run_poll(Duration::from_secs(2), 10, handler, done)
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![5, 6, 7]);
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_messages_are_never_dispatched() {
        let done = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![
                // Seed consumes the first batch.
                vec![message(10)],
                vec![message(10), message(11)],
            ],
            done.clone(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&seen);

        let mut ingestor = MessageIngestor::new(transport);
        ingestor.seed().await.unwrap();
        ingestor
            .run_poll(Duration::from_secs(2), 10, handler, done)
            .await;

        assert_eq!(*seen.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn push_mode_deduplicates_redelivered_messages() {
        let done = CancellationToken::new();
        let transport = Arc::new(ScriptedTransport::new(
            vec![vec![message(1), message(2), message(1), message(3)]],
            done.clone(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&seen);

        let ingestor = MessageIngestor::new(transport);
        ingestor.run_push(handler, done).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_poll_loop() {
        let done = CancellationToken::new();
        done.cancel();
        let transport = Arc::new(ScriptedTransport::new(
            vec![vec![message(1)]],
            CancellationToken::new(),
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = recording_handler(&seen);

        let ingestor = MessageIngestor::new(transport);
        ingestor
            .run_poll(Duration::from_secs(2), 10, handler, done)
            .await;

        assert!(seen.lock().unwrap().is_empty());
    }
}
