use std::fmt;
use std::path::Path;

use iced::{
    widget::{button, column, container, pick_list, row, scrollable, text, text_input, Column, Space},
    Background, Border, Color, Element, Length, Theme,
};

use crate::domain::{DownloadRequest, DownloadStatus, MediaFormat, Notice};

/// Form state owned by the view
pub struct QueueView {
    pub url_input: String,
    pub selected_format: MediaFormat,
    pub validation_message: Option<String>,
}

impl Default for QueueView {
    fn default() -> Self {
        Self {
            url_input: String::new(),
            selected_format: MediaFormat::Audio,
            validation_message: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum UiMessage {
    UrlChanged(String),
    FormatSelected(MediaFormat),
    AddPressed,
    StartAllPressed,
    BrowsePressed,
    DismissNotice(usize),
}

/// Labels of one row in the queue list, used for the header as well
pub struct EntryFields {
    pub url: String,
    pub format: String,
    pub status: String,
}

impl EntryFields {
    fn header() -> Self {
        Self {
            url: "Video URL".to_string(),
            format: "Format".to_string(),
            status: "Status".to_string(),
        }
    }

    fn from_request(request: &DownloadRequest) -> Self {
        Self {
            url: request.url().to_string(),
            format: request.format().to_string(),
            status: request.status().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    Plain,
    Active,
    Done,
    Error,
}

impl RowTone {
    pub fn for_status(status: &DownloadStatus) -> Self {
        match status {
            DownloadStatus::Pending => RowTone::Plain,
            DownloadStatus::Downloading { .. } => RowTone::Active,
            DownloadStatus::Finished => RowTone::Done,
            DownloadStatus::Failed { .. } => RowTone::Error,
        }
    }

    fn background(self) -> Option<Color> {
        match self {
            RowTone::Plain => None,
            RowTone::Active => Some(Color::from_rgb8(173, 216, 230)),
            RowTone::Done => Some(Color::from_rgb8(144, 238, 144)),
            RowTone::Error => Some(Color::from_rgb8(240, 128, 128)),
        }
    }
}

/// Per-status counts shown under the list
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueSummary {
    pub pending: usize,
    pub downloading: usize,
    pub finished: usize,
    pub failed: usize,
}

impl QueueSummary {
    pub fn from_requests(requests: &[DownloadRequest]) -> Self {
        requests
            .iter()
            .fold(Self::default(), |mut summary, request| {
                match request.status() {
                    DownloadStatus::Pending => summary.pending += 1,
                    DownloadStatus::Downloading { .. } => summary.downloading += 1,
                    DownloadStatus::Finished => summary.finished += 1,
                    DownloadStatus::Failed { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

impl fmt::Display for QueueSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} downloading, {} finished, {} failed",
            self.pending, self.downloading, self.finished, self.failed
        )
    }
}

impl QueueView {
    pub fn update(&mut self, message: UiMessage) {
        match message {
            UiMessage::UrlChanged(url) => {
                self.url_input = url;
                self.validation_message = None;
            }
            UiMessage::FormatSelected(format) => {
                self.selected_format = format;
            }
            UiMessage::AddPressed
            | UiMessage::StartAllPressed
            | UiMessage::BrowsePressed
            | UiMessage::DismissNotice(_) => {
                // Will be handled by the app
            }
        }
    }

    pub fn view<'a>(
        &'a self,
        requests: &'a [DownloadRequest],
        notices: &'a [Notice],
        output_dir: &'a Path,
    ) -> Element<'a, UiMessage> {
        let form = column![
            text("Paste your url here:").size(16),
            text_input("https://...", &self.url_input)
                .on_input(UiMessage::UrlChanged)
                .on_submit(UiMessage::AddPressed)
                .padding(10),
            row![
                pick_list(
                    MediaFormat::ALL,
                    Some(self.selected_format),
                    UiMessage::FormatSelected
                ),
                button("Add to queue").on_press(UiMessage::AddPressed),
            ]
            .spacing(10),
            row![
                text(format!("Save to: {}", output_dir.display())).size(14),
                button("Browse…").on_press(UiMessage::BrowsePressed),
            ]
            .spacing(10),
        ]
        .spacing(8);

        let mut content = column![text("Media Queue Downloader").size(28), form].spacing(10);

        if let Some(message) = &self.validation_message {
            content = content.push(
                text(message.clone())
                    .size(13)
                    .color(Color::from_rgb(0.8, 0.2, 0.2)),
            );
        }

        if !notices.is_empty() {
            content = content.push(notice_list(notices));
        }

        let entries = Column::with_children(requests.iter().map(|request| {
            entry_row(
                EntryFields::from_request(request),
                RowTone::for_status(request.status()),
            )
        }));

        content
            .push(entry_row(EntryFields::header(), RowTone::Plain))
            .push(scrollable(entries).height(Length::Fill))
            .push(text(QueueSummary::from_requests(requests).to_string()).size(13))
            .push(Space::new().height(Length::Fixed(5.0)))
            .push(
                button("Download!")
                    .on_press(UiMessage::StartAllPressed)
                    .padding([10, 20]),
            )
            .padding(20)
            .into()
    }
}

fn entry_row(fields: EntryFields, tone: RowTone) -> Element<'static, UiMessage> {
    let labels = row![
        text(fields.url).width(Length::FillPortion(5)),
        text(fields.format).width(Length::FillPortion(1)),
        text(fields.status).width(Length::FillPortion(2)),
    ]
    .spacing(10);

    container(labels)
        .padding(8)
        .width(Length::Fill)
        .style(move |_theme: &Theme| container::Style {
            background: tone.background().map(Background::Color),
            border: Border {
                color: Color::from_rgb(0.6, 0.6, 0.6),
                width: 1.0,
                ..Border::default()
            },
            ..container::Style::default()
        })
        .into()
}

fn notice_list(notices: &[Notice]) -> Element<'static, UiMessage> {
    let items = notices.iter().enumerate().map(|(index, notice)| {
        row![
            column![
                text(notice.title.clone()).size(14),
                text(notice.message.clone()).size(12),
            ]
            .width(Length::Fill),
            button("Dismiss").on_press(UiMessage::DismissNotice(index)),
        ]
        .spacing(10)
        .into()
    });

    container(Column::with_children(items).spacing(6))
        .padding(8)
        .width(Length::Fill)
        .style(|_theme: &Theme| container::Style {
            background: Some(Background::Color(Color::from_rgb8(255, 243, 205))),
            ..container::Style::default()
        })
        .into()
}
