use crate::error::EngineError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest message excerpt that ends up in a log line.
const LOG_EXCERPT_LEN: usize = 100;

/// Running counters for the safety boundary. Operational visibility only —
/// no threshold here triggers shutdown or backoff.
#[derive(Debug, Default)]
pub struct HandlerStats {
    total_processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    consecutive_failures: AtomicU64,
}

impl HandlerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// One-line operational summary.
    pub fn summary(&self) -> String {
        let total = self.total_processed();
        let succeeded = self.succeeded();
        let success_rate = if total > 0 {
            succeeded as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        format!(
            "processed: {total} | ok: {succeeded} | failed: {} | consecutive failures: {} | success rate: {success_rate:.1}%",
            self.failed(),
            self.consecutive_failures(),
        )
    }
}

/// The per-message safety boundary: runs one handler future to completion,
/// records the outcome, and never lets a failure escape into the ingestion
/// loop. Cancellation is not intercepted here — the ingestion loops observe
/// their token directly, so shutdown always propagates.
pub async fn guarded<F>(stats: &HandlerStats, text: Option<&str>, handler: F)
where
    F: Future<Output = Result<(), EngineError>>,
{
    if let Some(text) = text {
        tracing::info!(stage = "received", text = %excerpt(text), "channel message received");
    }

    match handler.await {
        Ok(()) => {
            stats.record_success();
            tracing::info!(stage = "success", stats = %stats.summary(), "message processed");
        }
        Err(e) => {
            stats.record_failure();
            tracing::error!(
                stage = "error",
                error = %e,
                text = %text.map(excerpt).unwrap_or_else(|| "N/A".to_string()),
                stats = %stats.summary(),
                "message processing failed"
            );
        }
    }
}

/// Newline-escaped excerpt bounded to [`LOG_EXCERPT_LEN`] characters.
fn excerpt(text: &str) -> String {
    text.replace('\n', "\\n").chars().take(LOG_EXCERPT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier::error::ClassifierError;

    fn failure() -> Result<(), EngineError> {
        Err(EngineError::Classification(
            ClassifierError::MalformedResponse("no choices".to_string()),
        ))
    }

    #[tokio::test]
    async fn success_and_failure_counters() {
        let stats = HandlerStats::new();

        guarded(&stats, Some("hello"), async { Ok(()) }).await;
        guarded(&stats, Some("boom"), async { failure() }).await;
        guarded(&stats, None, async { failure() }).await;

        assert_eq!(stats.total_processed(), 3);
        assert_eq!(stats.succeeded(), 1);
        assert_eq!(stats.failed(), 2);
        assert_eq!(stats.consecutive_failures(), 2);
    }

    #[tokio::test]
    async fn success_resets_consecutive_failures() {
        let stats = HandlerStats::new();

        guarded(&stats, None, async { failure() }).await;
        assert_eq!(stats.consecutive_failures(), 1);

        guarded(&stats, None, async { Ok(()) }).await;
        assert_eq!(stats.consecutive_failures(), 0);
        assert_eq!(stats.failed(), 1);
    }

    #[test]
    fn summary_reports_success_rate() {
        let stats = HandlerStats::new();
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        let summary = stats.summary();
        assert!(summary.contains("processed: 3"));
        assert!(summary.contains("success rate: 66.7%"));
    }

    #[test]
    fn excerpt_escapes_newlines_and_truncates() {
        let long = format!("line one\nline two {}", "x".repeat(200));
        let excerpt = excerpt(&long);
        assert!(excerpt.starts_with("line one\\nline two"));
        assert_eq!(excerpt.chars().count(), 100);
    }
}
