use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Please paste a URL before adding it to the queue")]
    EmptyUrl,

    #[error("duplicate of already downloaded file")]
    Duplicate,

    #[error("download failed: {0}")]
    Service(String),
}
