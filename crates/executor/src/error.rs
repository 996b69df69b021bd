use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Exchange call failed: {0}")]
    Api(#[from] api_client::error::ApiError),

    #[error("Quantity calculation failed: {0}")]
    Calculation(String),
}
