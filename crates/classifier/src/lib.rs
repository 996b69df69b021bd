use crate::error::ClassifierError;
use async_trait::async_trait;
use configuration::settings::OpenRouterConfig;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub mod error;
pub mod prompts;
// --- Public API ---
pub use prompts::{build_prompt, SYSTEM_PROMPT};

const BASE_URL: &str = "https://openrouter.ai/api/v1";
const TIMEOUT: Duration = Duration::from_secs(30);
/// Canonical answers are a single short line; anything longer is the model
/// rambling.
const MAX_TOKENS: u32 = 100;

/// Turns a raw channel message into a canonical label string.
///
/// The answer is free text as far as this crate is concerned; the signal
/// grammar downstream decides what it means.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, message: &str) -> Result<String, ClassifierError>;
}

/// A `Classifier` backed by the OpenRouter chat-completions API.
pub struct OpenRouterClassifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl OpenRouterClassifier {
    pub fn new(config: &OpenRouterConfig) -> Result<Self, ClassifierError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(TIMEOUT).build()?,
            base_url: BASE_URL.to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Classifier for OpenRouterClassifier {
    async fn classify(&self, message: &str) -> Result<String, ClassifierError> {
        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_prompt(message) },
            ],
            // Classification must be deterministic.
            "temperature": 0,
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        let answer = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| {
                ClassifierError::MalformedResponse("completion carried no choices".to_string())
            })?;

        tracing::info!(%answer, "classifier answered");
        Ok(answer)
    }
}
