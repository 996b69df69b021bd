use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Classification failed: {0}")]
    Classification(#[from] classifier::error::ClassifierError),

    #[error("Signal execution failed: {0}")]
    Execution(#[from] executor::ExecutorError),
}
