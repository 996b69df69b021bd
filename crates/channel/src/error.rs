use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Failed to build or send the transport request: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The channel transport returned an error: {0}")]
    Api(String),
}
