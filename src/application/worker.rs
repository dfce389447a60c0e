use std::sync::Arc;

use futures::{
    channel::mpsc::{self, UnboundedSender},
    stream::{self, BoxStream},
    StreamExt,
};

use super::queue::Job;
use crate::{
    domain::{AppError, DownloadStatus, RequestId, StatusUpdate},
    service::{DownloadOptions, DownloadService},
};

/// Runs the download for a single dispatched request
pub struct Worker {
    request: RequestId,
    url: String,
    options: DownloadOptions,
    service: Arc<dyn DownloadService>,
}

impl Worker {
    pub fn new(job: Job, options: DownloadOptions, service: Arc<dyn DownloadService>) -> Self {
        Self {
            request: job.request,
            url: job.url,
            options,
            service,
        }
    }

    /// Status updates for the request, ending with a terminal one.
    ///
    /// The download is spawned onto the tokio runtime the first time the
    /// stream is polled, so it never runs on the thread driving the UI.
    pub fn run(self) -> BoxStream<'static, StatusUpdate> {
        let (tx, rx) = mpsc::unbounded();

        stream::once(async move {
            let request = self.request;
            let watcher = tx.clone();
            let handle = tokio::spawn(self.drive(tx));

            // the stream only ends once the watcher drops its sender too
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    log::error!("Worker for {} stopped unexpectedly: {}", request, e);
                    let _ = watcher.unbounded_send(StatusUpdate {
                        request,
                        status: DownloadStatus::Failed {
                            reason: AppError::Service(format!("worker stopped unexpectedly: {}", e))
                                .to_string(),
                        },
                    });
                }
            });

            rx
        })
        .flatten()
        .boxed()
    }

    async fn drive(self, updates: UnboundedSender<StatusUpdate>) {
        let request = self.request;
        let send = |status: DownloadStatus| {
            let _ = updates.unbounded_send(StatusUpdate { request, status });
        };

        send(DownloadStatus::Downloading { progress: None });

        let (hook, mut events) = mpsc::unbounded();
        let download = self.service.download(self.url.clone(), self.options, hook);

        // ends once the service drops the hook
        let forward = async {
            while let Some(event) = events.next().await {
                if event.is_downloading() {
                    send(DownloadStatus::Downloading {
                        progress: Some(event.percent),
                    });
                }
            }
        };

        let (result, ()) = futures::join!(download, forward);

        match result {
            Ok(()) => {
                log::info!("Download {} finished: {}", request, self.url);
                send(DownloadStatus::Finished);
            }
            Err(e) => {
                log::error!("Download {} failed: {}: {}", request, self.url, e);
                send(DownloadStatus::Failed {
                    reason: AppError::Service(e.to_string()).to_string(),
                });
            }
        }
    }
}
