use std::fmt;
use std::str::FromStr;

/// Output format chosen for a queued url
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    /// Extract the audio track and transcode it
    Audio,
    /// Keep the video, constrained to a fixed container
    Video,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 2] = [MediaFormat::Audio, MediaFormat::Video];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaFormat::Audio => "audio",
            MediaFormat::Video => "video",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFormat::Audio => write!(f, "audio (mp3)"),
            MediaFormat::Video => write!(f, "video (mp4)"),
        }
    }
}

impl FromStr for MediaFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" | "mp3" => Ok(MediaFormat::Audio),
            "video" | "mp4" => Ok(MediaFormat::Video),
            other => Err(format!("unknown media format: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Pending,
    /// `progress` is the percentage text reported by the download service
    Downloading { progress: Option<String> },
    Finished,
    Failed { reason: String },
}

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Finished | DownloadStatus::Failed { .. })
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Pending => write!(f, "PENDING"),
            DownloadStatus::Downloading { progress: None } => write!(f, "DOWNLOADING"),
            DownloadStatus::Downloading {
                progress: Some(percent),
            } => write!(f, "downloading...{}", percent),
            DownloadStatus::Finished => write!(f, "FINISHED"),
            DownloadStatus::Failed { reason } => write!(f, "FAILED: {}", reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of the worker serving a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    NotStarted,
    Running,
    Stopped,
}

/// Deduplication key: two requests with the same pair are duplicates
pub type DispatchKey = (String, MediaFormat);

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    id: RequestId,
    url: String,
    format: MediaFormat,
    status: DownloadStatus,
    worker: WorkerState,
}

impl DownloadRequest {
    pub(crate) fn new(id: RequestId, url: String, format: MediaFormat) -> Self {
        Self {
            id,
            url,
            format,
            status: DownloadStatus::Pending,
            worker: WorkerState::NotStarted,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    pub fn worker(&self) -> WorkerState {
        self.worker
    }

    pub fn key(&self) -> DispatchKey {
        (self.url.clone(), self.format)
    }

    pub(crate) fn set_status(&mut self, status: DownloadStatus) {
        if status.is_terminal() && self.worker == WorkerState::Running {
            self.worker = WorkerState::Stopped;
        }
        self.status = status;
    }

    pub(crate) fn mark_dispatched(&mut self) {
        self.worker = WorkerState::Running;
        self.status = DownloadStatus::Downloading { progress: None };
    }
}

/// Status change reported by a worker for the request it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub request: RequestId,
    pub status: DownloadStatus,
}

/// Non-blocking warning shown above the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn duplicate(url: &str) -> Self {
        Self {
            title: "Duplicate URL".to_string(),
            message: format!(
                "The pending url \"{}\" duplicates an already downloaded file \
                 (same url and format), and is being skipped.",
                url
            ),
        }
    }
}
