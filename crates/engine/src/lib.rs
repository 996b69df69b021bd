//! # Signal Pipeline Crate
//!
//! The per-message pipeline (classify → parse → execute) and the safety
//! boundary that brackets it. The ingestion loop hands every message to
//! [`guarded`] wrapping [`SignalPipeline::handle`]; whatever happens inside,
//! the loop keeps running.

use channel::ChannelMessage;
use classifier::Classifier;
use executor::TradeExecutor;
use std::sync::Arc;

pub mod error;
pub mod safety;

// Re-export the key components to provide a clean, public-facing API.
pub use error::EngineError;
pub use safety::{guarded, HandlerStats};

/// Runs one channel message through classification, the signal grammar, and
/// the execution engine.
pub struct SignalPipeline {
    classifier: Arc<dyn Classifier>,
    executor: Arc<TradeExecutor>,
}

impl SignalPipeline {
    pub fn new(classifier: Arc<dyn Classifier>, executor: Arc<TradeExecutor>) -> Self {
        Self {
            classifier,
            executor,
        }
    }

    /// Processes a single message. Messages without text are skipped before
    /// any collaborator is invoked.
    pub async fn handle(&self, message: &ChannelMessage) -> Result<(), EngineError> {
        let Some(text) = message.text.as_deref() else {
            return Ok(());
        };

        let label = self.classifier.classify(text).await?;
        let signal = signal_parser::parse(&label);
        self.executor.process_signal(&signal).await?;
        Ok(())
    }
}
