use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to build or send the classification request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The classification request returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
}
