#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error(transparent)]
    Rpc(#[from] cafe_client::error::RpcError),
    #[error(transparent)]
    ObjectSource(#[from] cafe_client::object::ObjectSourceError),
}
