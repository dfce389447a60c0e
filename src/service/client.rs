use std::path::PathBuf;
use std::process::Stdio;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::Command,
};

use super::models::{DownloadOptions, ProgressEvent, RawProgress};
use super::{DownloadService, ProgressHook};
use crate::utils::strip_ansi;

/// Prefix marking the progress lines we asked yt-dlp to print
const PROGRESS_MARKER: &str = "mqd-progress:";

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to capture {0} of the downloader process")]
    MissingPipe(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("downloader exited with {}: {message}", exit_label(.code))]
    Exited { code: Option<i32>, message: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Drives the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlpClient {
    program: PathBuf,
}

impl YtDlpClient {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    pub async fn run_download(
        &self,
        url: &str,
        options: &DownloadOptions,
        progress: ProgressHook,
    ) -> Result<()> {
        let args = build_args(url, options);
        log::info!("Starting {} {}", self.program.display(), args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServiceError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(ServiceError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ServiceError::MissingPipe("stderr"))?;

        let read_progress = async {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            while let Some(line) = read_lossy_line(&mut reader, &mut buf).await? {
                match parse_progress_line(&line) {
                    Some(event) => {
                        let _ = progress.unbounded_send(event);
                    }
                    None => log::debug!("yt-dlp> {}", line),
                }
            }
            Ok::<_, std::io::Error>(())
        };

        // stderr must be drained alongside stdout or the child can block on a full pipe
        let read_errors = async {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut last_error: Option<String> = None;
            let mut last_line: Option<String> = None;
            while let Some(line) = read_lossy_line(&mut reader, &mut buf).await? {
                log::warn!("yt-dlp! {}", line);
                if line.starts_with("ERROR") {
                    last_error = Some(line.clone());
                }
                if !line.trim().is_empty() {
                    last_line = Some(line);
                }
            }
            Ok::<_, std::io::Error>(last_error.or(last_line))
        };

        let ((), last_error) = tokio::try_join!(read_progress, read_errors)?;
        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            Err(ServiceError::Exited {
                code: status.code(),
                message: last_error.unwrap_or_default(),
            })
        }
    }
}

impl DownloadService for YtDlpClient {
    fn download(
        &self,
        url: String,
        options: DownloadOptions,
        progress: ProgressHook,
    ) -> BoxFuture<'static, Result<()>> {
        let client = self.clone();
        async move { client.run_download(&url, &options, progress).await }.boxed()
    }
}

/// Next line of output, decoded lossily since yt-dlp may write in the
/// console code page rather than UTF-8
async fn read_lossy_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    if reader.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..]);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Command line for one download
pub fn build_args(url: &str, options: &DownloadOptions) -> Vec<String> {
    let mut args = vec![
        "--newline".to_owned(),
        "--no-colors".to_owned(),
        "--encoding".to_owned(),
        "utf-8".to_owned(),
        "--progress".to_owned(),
        "--progress-template".to_owned(),
        format!("download:{}%(progress)j", PROGRESS_MARKER),
        "-P".to_owned(),
        options.output_dir.display().to_string(),
        "-o".to_owned(),
        options.output_name_template.clone(),
    ];

    if let Some(codec) = &options.codec_postprocessing {
        args.push("-x".to_owned());
        args.push("--audio-format".to_owned());
        args.push(codec.clone());
    }
    if let Some(container) = &options.container_format {
        args.push("-f".to_owned());
        args.push(container.clone());
    }

    // urls starting with '-' must not be read as flags
    args.push("--".to_owned());
    args.push(url.to_owned());
    args
}

/// Parses a line printed through our progress template
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let json = line.trim().strip_prefix(PROGRESS_MARKER)?;
    let raw: RawProgress = serde_json::from_str(json).ok()?;
    let percent = raw
        .percent_str
        .map(|p| strip_ansi(&p).trim().to_string())
        .unwrap_or_default();
    Some(ProgressEvent::new(raw.status, percent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MediaFormat;
    use crate::service::models::ServiceConfig;

    fn options(format: MediaFormat) -> DownloadOptions {
        let config = ServiceConfig {
            output_dir: PathBuf::from("/tmp/media"),
            ..ServiceConfig::default()
        };
        DownloadOptions::for_format(format, &config)
    }

    #[test]
    fn test_audio_args() {
        let args = build_args("http://a", &options(MediaFormat::Audio));
        let joined = args.join(" ");
        assert!(joined.contains("-x --audio-format mp3"));
        assert!(joined.contains("--encoding utf-8"));
        assert!(!args.contains(&"-f".to_string()));
        assert!(joined.contains("-P /tmp/media -o %(title)s.%(ext)s"));
        assert_eq!(&args[args.len() - 2..], ["--", "http://a"]);
    }

    #[test]
    fn test_video_args() {
        let args = build_args("http://a", &options(MediaFormat::Video));
        assert!(args.join(" ").contains("-f mp4"));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_parse_progress_line() {
        let line = "mqd-progress:{\"status\": \"downloading\", \"_percent_str\": \"\\u001b[0;94m 42.0%\\u001b[0m\"}";
        let event = parse_progress_line(line).unwrap();
        assert_eq!(event, ProgressEvent::new("downloading", "42.0%"));
    }

    #[test]
    fn test_parse_finished_line_without_percent() {
        let event = parse_progress_line("mqd-progress:{\"status\": \"finished\"}").unwrap();
        assert_eq!(event.phase, "finished");
        assert_eq!(event.percent, "");
    }

    #[test]
    fn test_ignores_other_output() {
        assert_eq!(parse_progress_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_progress_line("mqd-progress:not json"), None);
    }

    #[test]
    fn test_exit_error_message() {
        let err = ServiceError::Exited {
            code: Some(1),
            message: "ERROR: Unsupported URL".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "downloader exited with code 1: ERROR: Unsupported URL"
        );
    }

    #[cfg(unix)]
    fn fake_program(name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = std::env::temp_dir().join(format!("mqd-{}-{}", std::process::id(), name));
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    async fn run_fake(program: PathBuf) -> (Result<()>, Vec<ProgressEvent>) {
        use futures::StreamExt;

        let client = YtDlpClient::new(program.clone());
        let (hook, events) = futures::channel::mpsc::unbounded();
        let result = client
            .run_download("http://a", &options(MediaFormat::Audio), hook)
            .await;
        let events = events.collect().await;
        let _ = std::fs::remove_file(program);
        (result, events)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_run_reports_progress() {
        let program = fake_program(
            "success",
            r#"echo '[youtube] abc: Downloading webpage'
printf 'mqd-progress:{"status": "downloading", "_percent_str": " 10.0%%"}\n'
printf 'mqd-progress:{"status": "finished", "_percent_str": "100.0%%"}\n'
exit 0"#,
        );

        let (result, events) = run_fake(program).await;
        assert!(result.is_ok());
        assert_eq!(
            events,
            [
                ProgressEvent::new("downloading", "10.0%"),
                ProgressEvent::new("finished", "100.0%"),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_output_does_not_fail_download() {
        let program = fake_program(
            "latin1",
            r#"printf 'mqd-progress:{"status": "downloading", "_percent_str": "10.0%%"}\n'
printf '[download] Destination: caf\351.mp3\n'
printf 'WARNING: caf\351\n' >&2
printf 'mqd-progress:{"status": "downloading", "_percent_str": "55.0%%"}\n'
exit 0"#,
        );

        let (result, events) = run_fake(program).await;
        assert!(result.is_ok(), "unexpected error: {:?}", result);
        let percents: Vec<_> = events.iter().map(|e| e.percent.as_str()).collect();
        assert_eq!(percents, ["10.0%", "55.0%"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_reports_error_line() {
        let program = fake_program(
            "error",
            "echo 'WARNING: slow connection' >&2\necho 'ERROR: x' >&2\necho 'WARNING: cleanup' >&2\nexit 1",
        );

        let (result, _) = run_fake(program).await;
        match result {
            Err(ServiceError::Exited { code, message }) => {
                assert_eq!(code, Some(1));
                assert_eq!(message, "ERROR: x");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_without_error_line_uses_last_stderr_line() {
        let program = fake_program(
            "warnings",
            "echo 'WARNING: first' >&2\necho 'something broke' >&2\nexit 2",
        );

        let (result, _) = run_fake(program).await;
        match result {
            Err(ServiceError::Exited { code, message }) => {
                assert_eq!(code, Some(2));
                assert_eq!(message, "something broke");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let client = YtDlpClient::new(PathBuf::from("/nonexistent/yt-dlp-binary"));
        let (hook, _events) = futures::channel::mpsc::unbounded();
        let result = client
            .run_download("http://a", &options(MediaFormat::Audio), hook)
            .await;
        assert!(matches!(result, Err(ServiceError::Spawn { .. })));
    }
}
