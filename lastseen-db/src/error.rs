use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store document error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("store worker failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("store document root is not a mapping")]
    NotAMapping,
}

pub type Result<T> = std::result::Result<T, DbError>;
