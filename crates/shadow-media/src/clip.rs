//! Segment extraction.

use std::path::Path;
use tracing::info;

use shadow_models::Timestamp;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::AUDIO_SAMPLE_RATE;
use crate::progress::FfmpegProgress;

/// Build the command that cuts `[start, end)` out of `input`.
///
/// The segment is re-encoded (libx264/aac, preset fast) with a fixed pixel
/// format and audio layout so later parts can be joined with stream copy.
pub fn segment_command(input: &Path, output: &Path, start: Timestamp, end: Timestamp) -> MediaResult<FfmpegCommand> {
    if end <= start {
        return Err(MediaError::invalid_input(format!(
            "segment end {} is not after start {}",
            end, start
        )));
    }
    let duration = end.saturating_sub(start).as_secs_f64();

    Ok(FfmpegCommand::new(input, output)
        .seek(start.as_secs_f64())
        .duration(duration)
        .video_codec("libx264")
        .preset("fast")
        .pixel_format("yuv420p")
        .audio_codec("aac")
        .output_args(["-ar".to_string(), AUDIO_SAMPLE_RATE.to_string(), "-ac".to_string(), "2".to_string()]))
}

/// Extract a segment from a video file.
pub async fn extract_segment<F>(
    runner: &FfmpegRunner,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start: Timestamp,
    end: Timestamp,
    progress_callback: F,
) -> MediaResult<()>
where
    F: Fn(FfmpegProgress) + Send + 'static,
{
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.is_file() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }

    info!(
        "Extracting segment: {} -> {} ({} - {})",
        input.display(),
        output.display(),
        start,
        end
    );

    let cmd = segment_command(input, output, start, end)?;
    runner.run_with_progress(&cmd, progress_callback).await?;

    info!("Segment extracted: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_command() {
        let cmd = segment_command(
            Path::new("talk.mp4"),
            Path::new("seg.mp4"),
            Timestamp::from_millis(61_500),
            Timestamp::from_millis(64_000),
        )
        .unwrap();
        let args = cmd.build_args().join(" ");
        assert!(args.contains("-ss 61.500 -t 2.500 -i talk.mp4"));
        assert!(args.contains("-c:v libx264 -preset fast"));
        assert!(args.contains("-c:a aac"));
        assert!(args.contains("-ar 44100 -ac 2"));
    }

    #[test]
    fn test_segment_command_rejects_empty_range() {
        let t = Timestamp::from_millis(1000);
        assert!(matches!(
            segment_command(Path::new("a.mp4"), Path::new("b.mp4"), t, t),
            Err(MediaError::InvalidInput(_))
        ));
    }
}
