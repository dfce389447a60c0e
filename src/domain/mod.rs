pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    DispatchKey, DownloadRequest, DownloadStatus, MediaFormat, Notice, RequestId, StatusUpdate,
};
