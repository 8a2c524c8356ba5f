#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] cafe_store::StoreError),
    #[error("malformed target: {0}")]
    MalformedInput(String),
}
