//! Download job.

use serde_json::json;
use tracing::debug;

use shadow_media::{download_video, DownloadEvent, DownloadRequest};
use shadow_queue::TaskProgress;
use shadow_storage::available_subtitles;

use crate::context::JobContext;
use crate::error::WorkerResult;
use crate::job::DownloadJob;

pub async fn run(ctx: &JobContext, job: DownloadJob, progress: TaskProgress) -> WorkerResult<serde_json::Value> {
    let langs = if job.subtitle_langs.is_empty() {
        ctx.config.subtitle_langs.clone()
    } else {
        job.subtitle_langs
    };
    let request = DownloadRequest::new(job.url, job.output_dir)
        .with_format(job.format)
        .with_subtitle_langs(langs);

    progress.update(0.0, "Starting download");
    let video_path = download_video(&request, |event| match event {
        DownloadEvent::Destination(path) => {
            debug!(destination = %path.display(), "yt-dlp destination");
            progress.update(0.0, format!("Downloading {}", file_name(path)));
        }
        DownloadEvent::Merging(_) => progress.update(0.0, "Merging audio and video"),
        DownloadEvent::AlreadyDownloaded(_) | DownloadEvent::Progress { .. } => {
            if let Some(fraction) = event.fraction() {
                progress.set(fraction);
            }
        }
    })
    .await?;

    let subtitles = available_subtitles(&video_path);
    Ok(json!({
        "video_path": ctx.layout.display_path(&video_path),
        "file_name": file_name(&video_path),
        "has_subtitle": !subtitles.is_empty(),
        "available_subtitles": subtitles,
    }))
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
