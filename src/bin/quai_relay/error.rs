//! Error types for the relay.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Upstream client error: {0}")]
    Client(#[from] quai_portfolio::error::ClientError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
