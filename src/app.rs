use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use iced::Task;

use crate::application::{Queue, Worker};
use crate::domain::{Notice, StatusUpdate};
use crate::service::{DownloadOptions, DownloadService, ServiceConfig, YtDlpClient};
use crate::ui::{QueueView, UiMessage};

pub struct QueueApp {
    view: QueueView,
    queue: Queue,
    config: ServiceConfig,
    service: Arc<dyn DownloadService>,
    notices: Vec<Notice>,
}

impl Default for QueueApp {
    fn default() -> Self {
        let config = ServiceConfig::from_env();
        let service = Arc::new(YtDlpClient::new(config.program.clone()));
        Self::new(config, service)
    }
}

impl QueueApp {
    pub fn new(config: ServiceConfig, service: Arc<dyn DownloadService>) -> Self {
        Self {
            view: QueueView::default(),
            queue: Queue::new(),
            config,
            service,
            notices: Vec::new(),
        }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    fn add_from_form(&mut self) {
        match self.queue.add(&self.view.url_input, self.view.selected_format) {
            Ok(request) => {
                log::info!(
                    "Queued {} {} as {}",
                    request.id(),
                    request.url(),
                    request.format().as_str()
                );
                log::debug!("{} requests in queue", self.queue.len());
                self.view.url_input.clear();
                self.view.validation_message = None;
            }
            Err(e) => {
                self.view.validation_message = Some(e.to_string());
            }
        }
    }

    fn start_all(&mut self) -> Task<Message> {
        let report = self.queue.start_all();
        if self.queue.is_empty() {
            log::info!("Queue is empty, add a url first");
        } else if report.is_empty() {
            log::info!("Nothing pending to start");
        }

        for duplicate in &report.duplicates {
            log::warn!(
                "Skipping {} {}: duplicate of an already started download",
                duplicate.request,
                duplicate.url
            );
            self.notices.push(Notice::duplicate(&duplicate.url));
        }

        Task::batch(report.jobs.into_iter().map(|job| {
            log::info!("Dispatching {} {}", job.request, job.url);
            let options = DownloadOptions::for_format(job.format, &self.config);
            let worker = Worker::new(job, options, Arc::clone(&self.service));
            Task::stream(worker.run().map(Message::Worker))
        }))
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(UiMessage),
    /// Folder picked in the native dialog, `None` if cancelled
    OutputDirSelected(Option<PathBuf>),
    /// Status change reported by a running worker
    Worker(StatusUpdate),
}

pub fn update(app: &mut QueueApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                UiMessage::AddPressed => app.add_from_form(),
                UiMessage::StartAllPressed => return app.start_all(),
                UiMessage::BrowsePressed => {
                    let current = app.config.output_dir.clone();
                    // iced Task::perform runs in the background tokio executor
                    return Task::perform(
                        async move {
                            rfd::AsyncFileDialog::new()
                                .set_directory(&current)
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::OutputDirSelected,
                    );
                }
                UiMessage::DismissNotice(index) => {
                    if index < app.notices.len() {
                        app.notices.remove(index);
                    }
                }
                UiMessage::UrlChanged(_) | UiMessage::FormatSelected(_) => {}
            }
        }
        Message::OutputDirSelected(Some(dir)) => {
            log::info!("Saving downloads to {}", dir.display());
            app.config.output_dir = dir;
        }
        Message::OutputDirSelected(None) => {}
        Message::Worker(update) => {
            let request = update.request;
            if !app.queue.apply(update) {
                log::debug!(
                    "Dropped stale update for {} (worker {:?})",
                    request,
                    app.queue.get(request).map(|r| r.worker())
                );
            } else if let Some(done) = app.queue.get(request).filter(|r| r.status().is_terminal()) {
                log::info!("{} {}: {}", request, done.url(), done.status());
            }
        }
    }
    Task::none()
}

pub fn view(app: &QueueApp) -> iced::Element<'_, Message> {
    app.view
        .view(app.queue().requests(), app.notices(), &app.config.output_dir)
        .map(Message::UiMessage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DownloadStatus, MediaFormat};
    use crate::service::testing::ScriptedService;

    fn app() -> QueueApp {
        QueueApp::new(ServiceConfig::default(), ScriptedService::succeeding(vec![]))
    }

    fn submit(app: &mut QueueApp, url: &str, format: MediaFormat) {
        let _ = update(app, Message::UiMessage(UiMessage::UrlChanged(url.to_string())));
        let _ = update(app, Message::UiMessage(UiMessage::FormatSelected(format)));
        let _ = update(app, Message::UiMessage(UiMessage::AddPressed));
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let mut app = app();
        submit(&mut app, "   ", MediaFormat::Audio);

        assert!(app.queue().is_empty());
        assert!(app.view.validation_message.is_some());
    }

    #[test]
    fn test_add_clears_input() {
        let mut app = app();
        submit(&mut app, "http://a", MediaFormat::Video);

        assert_eq!(app.queue().len(), 1);
        assert_eq!(app.queue().requests()[0].format(), MediaFormat::Video);
        assert!(app.view.url_input.is_empty());
    }

    #[test]
    fn test_duplicates_raise_dismissible_notice() {
        let mut app = app();
        submit(&mut app, "http://a", MediaFormat::Audio);
        submit(&mut app, "http://a", MediaFormat::Audio);

        let _ = update(&mut app, Message::UiMessage(UiMessage::StartAllPressed));
        assert_eq!(app.notices().len(), 1);
        assert!(app.notices()[0].message.contains("http://a"));

        let _ = update(&mut app, Message::UiMessage(UiMessage::DismissNotice(0)));
        assert!(app.notices().is_empty());
    }

    #[test]
    fn test_start_all_on_empty_queue() {
        let mut app = app();
        let _ = update(&mut app, Message::UiMessage(UiMessage::StartAllPressed));

        assert!(app.queue().is_empty());
        assert!(app.notices().is_empty());
    }

    #[test]
    fn test_late_update_after_finish_is_dropped() {
        let mut app = app();
        submit(&mut app, "http://a", MediaFormat::Audio);
        let _ = update(&mut app, Message::UiMessage(UiMessage::StartAllPressed));

        let id = app.queue().requests()[0].id();
        for status in [
            DownloadStatus::Finished,
            DownloadStatus::Downloading {
                progress: Some("99.0%".to_string()),
            },
        ] {
            let _ = update(&mut app, Message::Worker(StatusUpdate { request: id, status }));
        }

        let request = &app.queue().requests()[0];
        assert_eq!(*request.status(), DownloadStatus::Finished);
        assert_eq!(request.worker(), crate::domain::model::WorkerState::Stopped);
    }

    #[test]
    fn test_worker_messages_update_rows() {
        let mut app = app();
        submit(&mut app, "http://a", MediaFormat::Audio);
        let _ = update(&mut app, Message::UiMessage(UiMessage::StartAllPressed));

        let id = app.queue().requests()[0].id();
        let _ = update(
            &mut app,
            Message::Worker(StatusUpdate {
                request: id,
                status: DownloadStatus::Downloading {
                    progress: Some("42.0%".to_string()),
                },
            }),
        );
        assert!(app.queue().requests()[0]
            .status()
            .to_string()
            .contains("42.0%"));
    }

    #[test]
    fn test_output_dir_selection() {
        let mut app = app();
        let _ = update(
            &mut app,
            Message::OutputDirSelected(Some(PathBuf::from("/tmp/music"))),
        );
        assert_eq!(app.config.output_dir, PathBuf::from("/tmp/music"));

        let _ = update(&mut app, Message::OutputDirSelected(None));
        assert_eq!(app.config.output_dir, PathBuf::from("/tmp/music"));
    }
}
