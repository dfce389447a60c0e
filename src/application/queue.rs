use std::collections::HashSet;

use crate::{
    domain::{
        AppError, DispatchKey, DownloadRequest, DownloadStatus, MediaFormat, RequestId,
        StatusUpdate,
    },
    utils::normalize_url,
};

/// A request handed out by [`Queue::start_all`] that needs a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub request: RequestId,
    pub url: String,
    pub format: MediaFormat,
}

/// A pending request rejected because its (url, format) pair already ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    pub request: RequestId,
    pub url: String,
}

/// Outcome of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub jobs: Vec<Job>,
    pub duplicates: Vec<Duplicate>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.duplicates.is_empty()
    }
}

/// Ordered download requests for the session
#[derive(Debug, Default)]
pub struct Queue {
    requests: Vec<DownloadRequest>,
    dispatched: HashSet<DispatchKey>,
    next_id: u64,
}

impl Queue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pending request. Duplicates are accepted here and only
    /// rejected when the queue is started.
    pub fn add(&mut self, url: &str, format: MediaFormat) -> Result<&DownloadRequest, AppError> {
        let url = normalize_url(url);
        if url.is_empty() {
            return Err(AppError::EmptyUrl);
        }

        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.push(DownloadRequest::new(id, url.to_string(), format));

        Ok(&self.requests[self.requests.len() - 1])
    }

    /// Dispatches every pending request whose (url, format) pair has not run
    /// yet and fails the pending ones whose pair has. Requests that are
    /// already dispatched or finished are left alone, so calling this again
    /// only picks up newly added requests.
    pub fn start_all(&mut self) -> DispatchReport {
        let mut report = DispatchReport::default();

        for request in &mut self.requests {
            if *request.status() != DownloadStatus::Pending {
                continue;
            }

            let key = request.key();
            if self.dispatched.contains(&key) {
                request.set_status(DownloadStatus::Failed {
                    reason: AppError::Duplicate.to_string(),
                });
                report.duplicates.push(Duplicate {
                    request: request.id(),
                    url: key.0,
                });
            } else {
                request.mark_dispatched();
                report.jobs.push(Job {
                    request: request.id(),
                    url: key.0.clone(),
                    format: key.1,
                });
                self.dispatched.insert(key);
            }
        }

        report
    }

    /// Applies a worker update. Returns false when the request is unknown or
    /// has already reached a terminal state.
    pub fn apply(&mut self, update: StatusUpdate) -> bool {
        match self.requests.iter_mut().find(|r| r.id() == update.request) {
            Some(request) if !request.status().is_terminal() => {
                request.set_status(update.status);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, id: RequestId) -> Option<&DownloadRequest> {
        self.requests.iter().find(|r| r.id() == id)
    }

    pub fn requests(&self) -> &[DownloadRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
