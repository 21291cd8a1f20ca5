//! Video download using yt-dlp.
//!
//! yt-dlp runs with `--newline` and a progress template so stdout can be read
//! line by line. Each line is classified into a [`DownloadEvent`]; the caller
//! turns those into task progress.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Format selector preferring mp4 video with m4a audio.
pub const DEFAULT_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Subtitle languages requested when the caller names none.
pub const DEFAULT_SUBTITLE_LANGS: [&str; 4] = ["en", "en-US", "en-GB", "ko"];

/// `downloaded/total - eta - speed`, one line per update.
const PROGRESS_TEMPLATE: &str = "download:%(progress.downloaded_bytes)s/%(progress.total_bytes,progress.total_bytes_estimate)s - %(progress.eta)s - %(progress.speed)s";

const STDERR_TAIL_LINES: usize = 10;

const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "webm", "mkv", "m4v", "mov"];

static DESTINATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[download\] Destination: (.+)$").unwrap());

static ALREADY_DOWNLOADED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[download\] (.+) has already been downloaded").unwrap());

static MERGER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[Merger\] Merging formats into "(.+)"$"#).unwrap());

static PROGRESS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)/(\d+(?:\.\d+)?|NA|None) - (\S+) - (\S+)\s*$").unwrap()
});

/// One classified line of yt-dlp output.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// A file is being written
    Destination(PathBuf),
    /// The target already exists
    AlreadyDownloaded(PathBuf),
    /// Separate streams are being merged into the final file
    Merging(PathBuf),
    /// Bytes written so far and the (estimated) total
    Progress { downloaded: u64, total: Option<u64> },
}

impl DownloadEvent {
    /// Completed fraction carried by the event, if any.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            DownloadEvent::Progress {
                downloaded,
                total: Some(total),
            } if *total > 0 => Some((*downloaded as f64 / *total as f64).min(1.0)),
            DownloadEvent::AlreadyDownloaded(_) => Some(1.0),
            _ => None,
        }
    }
}

/// Classify one stdout line.
pub fn parse_ytdlp_line(line: &str) -> Option<DownloadEvent> {
    let line = line.trim_end();

    if let Some(caps) = MERGER_REGEX.captures(line) {
        return Some(DownloadEvent::Merging(PathBuf::from(&caps[1])));
    }
    if let Some(caps) = ALREADY_DOWNLOADED_REGEX.captures(line) {
        return Some(DownloadEvent::AlreadyDownloaded(PathBuf::from(&caps[1])));
    }
    if let Some(caps) = DESTINATION_REGEX.captures(line) {
        return Some(DownloadEvent::Destination(PathBuf::from(&caps[1])));
    }
    if let Some(caps) = PROGRESS_REGEX.captures(line) {
        let downloaded = caps[1].parse::<f64>().ok()? as u64;
        let total = caps[2].parse::<f64>().ok().map(|t| t as u64);
        return Some(DownloadEvent::Progress { downloaded, total });
    }
    None
}

/// A yt-dlp invocation.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub format: Option<String>,
    pub subtitle_langs: Vec<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            format: None,
            subtitle_langs: DEFAULT_SUBTITLE_LANGS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_format(mut self, format: Option<String>) -> Self {
        self.format = format.filter(|f| !f.trim().is_empty());
        self
    }

    /// Replace the subtitle languages. An empty list keeps the current ones.
    pub fn with_subtitle_langs(mut self, langs: Vec<String>) -> Self {
        let langs: Vec<String> = langs
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if !langs.is_empty() {
            self.subtitle_langs = langs;
        }
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let template = self.output_dir.join("%(title)s.%(ext)s");
        vec![
            "-f".to_string(),
            self.format.clone().unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--write-auto-sub".to_string(),
            "--write-sub".to_string(),
            "--sub-lang".to_string(),
            self.subtitle_langs.join(","),
            "--newline".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
            "--no-playlist".to_string(),
            self.url.clone(),
        ]
    }
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Paths announced by yt-dlp, in increasing order of authority.
#[derive(Debug, Default)]
struct CapturedPaths {
    destination: Option<PathBuf>,
    already: Option<PathBuf>,
    merged: Option<PathBuf>,
}

impl CapturedPaths {
    fn record(&mut self, event: &DownloadEvent) {
        match event {
            DownloadEvent::Destination(p) if is_video_file(p) => self.destination = Some(p.clone()),
            DownloadEvent::AlreadyDownloaded(p) if is_video_file(p) => self.already = Some(p.clone()),
            DownloadEvent::Merging(p) => self.merged = Some(p.clone()),
            _ => {}
        }
    }

    fn best_existing(&self) -> Option<PathBuf> {
        [&self.merged, &self.already, &self.destination]
            .into_iter()
            .flatten()
            .find(|p| p.is_file())
            .cloned()
    }
}

/// Download a video with yt-dlp, reporting each parsed stdout line.
///
/// Returns the path of the downloaded video. When yt-dlp does not announce a
/// usable path, the newest `.mp4` in the output directory is taken.
pub async fn download_video<F>(request: &DownloadRequest, mut on_event: F) -> MediaResult<PathBuf>
where
    F: FnMut(&DownloadEvent) + Send,
{
    check_ytdlp()?;
    tokio::fs::create_dir_all(&request.output_dir).await?;

    info!(
        url = %request.url,
        output_dir = %request.output_dir.display(),
        "Downloading video"
    );

    let args = request.build_args();
    debug!("Running yt-dlp {}", args.join(" "));

    let started = Instant::now();
    let mut child = Command::new("yt-dlp")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::internal("yt-dlp stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| MediaError::internal("yt-dlp stderr was not captured"))?;

    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    });

    let mut captured = CapturedPaths::default();
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(event) = parse_ytdlp_line(&line) {
            captured.record(&event);
            on_event(&event);
        }
    }

    let status = child.wait().await?;
    let stderr_tail = stderr_handle.await.unwrap_or_default();

    metrics::histogram!("shadow_download_duration_seconds")
        .record(started.elapsed().as_secs_f64());

    if !status.success() {
        let last = stderr_tail
            .back()
            .cloned()
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(url = %request.url, status = %status, "yt-dlp failed");
        return Err(MediaError::download_failed(format!("yt-dlp failed: {}", last)));
    }

    let path = match captured.best_existing() {
        Some(path) => path,
        None => newest_mp4(&request.output_dir)
            .await?
            .ok_or_else(|| MediaError::download_failed("Downloaded file could not be located"))?,
    };

    info!(
        output = %path.display(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Downloaded video successfully"
    );
    Ok(path)
}

/// Most recently modified `.mp4` in `dir`.
pub async fn newest_mp4(dir: &Path) -> MediaResult<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_mp4 = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("mp4"))
            .unwrap_or(false);
        if !is_mp4 {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        if newest.as_ref().map(|(t, _)| modified > *t).unwrap_or(true) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, p)| p))
}

/// Hosts yt-dlp is used for.
const SUPPORTED_DOMAINS: [&str; 7] = [
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "twitter.com",
    "x.com",
    "twitch.tv",
    "tiktok.com",
];

/// Check if a URL points at a supported video platform.
pub fn is_supported_url(url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    SUPPORTED_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_destination_and_merger() {
        assert_eq!(
            parse_ytdlp_line("[download] Destination: data/clips/Talk.f137.mp4"),
            Some(DownloadEvent::Destination(PathBuf::from("data/clips/Talk.f137.mp4")))
        );
        assert_eq!(
            parse_ytdlp_line(r#"[Merger] Merging formats into "data/clips/Talk.mp4""#),
            Some(DownloadEvent::Merging(PathBuf::from("data/clips/Talk.mp4")))
        );
    }

    #[test]
    fn test_parse_already_downloaded() {
        let event = parse_ytdlp_line("[download] data/clips/Talk.mp4 has already been downloaded").unwrap();
        assert_eq!(event, DownloadEvent::AlreadyDownloaded(PathBuf::from("data/clips/Talk.mp4")));
        assert_eq!(event.fraction(), Some(1.0));
    }

    #[test]
    fn test_parse_progress_template() {
        let event = parse_ytdlp_line("524288/1048576 - 3 - 1048576.5").unwrap();
        assert_eq!(
            event,
            DownloadEvent::Progress {
                downloaded: 524288,
                total: Some(1048576)
            }
        );
        assert_eq!(event.fraction(), Some(0.5));

        let unknown = parse_ytdlp_line("1024/NA - NA - NA").unwrap();
        assert_eq!(unknown.fraction(), None);
    }

    #[test]
    fn test_parse_ignores_noise() {
        assert_eq!(parse_ytdlp_line("[youtube] abc: Downloading webpage"), None);
        assert_eq!(parse_ytdlp_line(""), None);
    }

    #[test]
    fn test_subtitle_destination_is_not_the_video() {
        let mut captured = CapturedPaths::default();
        captured.record(&DownloadEvent::Destination(PathBuf::from("a.en.vtt")));
        assert!(captured.destination.is_none());
        captured.record(&DownloadEvent::Destination(PathBuf::from("a.mp4")));
        assert_eq!(captured.destination, Some(PathBuf::from("a.mp4")));
    }

    #[test]
    fn test_build_args() {
        let request = DownloadRequest::new("https://youtu.be/dQw4w9WgXcQ", "data/clips")
            .with_format(Some(" ".to_string()))
            .with_subtitle_langs(vec!["en".to_string(), " ".to_string()]);
        let args = request.build_args();
        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], DEFAULT_FORMAT);
        let langs = args.iter().position(|a| a == "--sub-lang").unwrap();
        assert_eq!(args[langs + 1], "en");
        assert!(args.contains(&"--newline".to_string()));
        assert_eq!(args.last().unwrap(), "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_default_subtitle_langs() {
        let args = DownloadRequest::new("u", "d").build_args();
        assert!(args.contains(&"en,en-US,en-GB,ko".to_string()));
    }

    #[tokio::test]
    async fn test_newest_mp4() {
        let dir = tempfile::tempdir().unwrap();
        assert!(newest_mp4(&dir.path().join("missing")).await.unwrap().is_none());

        std::fs::write(dir.path().join("old.mp4"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"a").unwrap();
        let newer = dir.path().join("new.mp4");
        std::fs::write(&newer, b"b").unwrap();
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(60);
        std::fs::File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(later)
            .unwrap();

        assert_eq!(newest_mp4(dir.path()).await.unwrap(), Some(newer));
    }

    #[test]
    fn test_is_supported_url() {
        assert!(is_supported_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_supported_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_supported_url("https://evil.com/?u=youtube.com"));
        assert!(!is_supported_url("ftp://youtube.com/x"));
        assert!(!is_supported_url("not a url"));
    }
}
