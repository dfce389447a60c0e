pub mod client;
pub mod models;

use futures::channel::mpsc::UnboundedSender;
use futures::future::BoxFuture;

pub use client::{ServiceError, YtDlpClient};
pub use models::{DownloadOptions, ProgressEvent, ServiceConfig};

/// Receives progress events while a download runs
pub type ProgressHook = UnboundedSender<ProgressEvent>;

/// External tool that performs the actual transfer and transcoding.
///
/// The returned future resolves once the transfer has finished or failed;
/// progress is reported through `progress` in the meantime and the hook is
/// dropped when the future completes.
pub trait DownloadService: Send + Sync {
    fn download(
        &self,
        url: String,
        options: DownloadOptions,
        progress: ProgressHook,
    ) -> BoxFuture<'static, Result<(), ServiceError>>;
}
