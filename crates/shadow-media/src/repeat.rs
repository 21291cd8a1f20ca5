//! Repeat video generation.
//!
//! For every selected range the segment is cut once, then rendered once per
//! repetition with that repetition's subtitle mode. Optional narration is
//! mixed in and focus cards are placed between repetitions. All parts are
//! joined with the concat demuxer and the result is published atomically.
//!
//! ```text
//! range 0: [seg en_ko+tts] [card] [seg] [card] [seg en_ko]
//! range 1: ...
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use shadow_models::{
    sanitize_file_stem, with_extension, GenerationConfig, SubtitleCue, SubtitleMode, TimeRange,
    Timestamp, FOCUS_CARD_SECS,
};
use shadow_subtitle::{highlight_phrase, slice_for_range, to_srt};

use crate::clip::extract_segment;
use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{
    focus_card_message, focus_card_source, focus_card_text, silent_audio_source, subtitles_filter,
    AUDIO_SAMPLE_RATE,
};
use crate::fs_utils::{job_workspace, move_file};
use crate::merge::{concat_command, write_concat_list};
use crate::probe::{get_duration, probe_video, VideoInfo};
use crate::progress::{FfmpegProgress, StepCallback, StepProgress};
use crate::tts::{narration_mix_command, synthesize_cues, NarrationClip, SpeechSynthesizer};

/// Colour used for the highlighted phrase.
pub const HIGHLIGHT_COLOR: &str = "#FFD700";

/// `{stem}_repeat{N}_{start}.mp4` unless a name was requested.
pub fn repeat_output_name(video: &Path, repeat_count: u32, start: Timestamp, requested: Option<&str>) -> String {
    if let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) {
        return with_extension(&sanitize_file_stem(name), "mp4");
    }
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_repeat{}_{}.mp4", stem, repeat_count, start.to_file_tag())
}

/// Everything needed to render one repeat video.
#[derive(Debug, Clone)]
pub struct RepeatRequest {
    pub video: PathBuf,
    pub ranges: Vec<TimeRange>,
    /// Full subtitle track of the video, translations merged
    pub cues: Vec<SubtitleCue>,
    pub config: GenerationConfig,
    pub output: PathBuf,
}

impl RepeatRequest {
    /// Number of progress steps the render takes.
    pub fn total_steps(&self) -> usize {
        let per_range = 1 + self.config.repeat_count as usize + self.focus_cards_per_range();
        per_range * self.ranges.len() + 1
    }

    /// Distinct focus cards rendered for each range.
    fn focus_cards_per_range(&self) -> usize {
        if !self.config.focus_cards {
            return 0;
        }
        (self.config.repeat_count.saturating_sub(1) as usize).min(shadow_models::FOCUS_CARD_MESSAGES.len())
    }
}

/// Result of a render.
#[derive(Debug, Clone, Serialize)]
pub struct RepeatOutcome {
    pub output_path: PathBuf,
    pub repeat_count: u32,
    /// Seconds
    pub duration: f64,
    pub segments: usize,
}

/// Renders repeat videos with ffmpeg.
#[derive(Clone)]
pub struct RepeatVideoGenerator {
    runner: FfmpegRunner,
    workspace_root: PathBuf,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl RepeatVideoGenerator {
    pub fn new(runner: FfmpegRunner, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            runner: runner.operation("repeat"),
            workspace_root: workspace_root.into(),
            synthesizer: None,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    /// Render `request` and move the result to `request.output`.
    pub async fn generate(&self, request: &RepeatRequest, on_progress: StepCallback) -> MediaResult<RepeatOutcome> {
        validate_request(request)?;
        if request.config.tts.is_some() && self.synthesizer.is_none() {
            return Err(MediaError::tts_failed("no speech backend configured"));
        }

        let workspace = job_workspace(&self.workspace_root, "repeat-")?;
        let mut job = RenderJob {
            generator: self,
            request,
            dir: workspace.path(),
            steps: StepProgress::new(request.total_steps()),
            on_progress,
        };

        let mut parts = Vec::new();
        for (index, range) in request.ranges.iter().enumerate() {
            parts.extend(job.render_range(index, range).await?);
        }

        let list_path = workspace.path().join("parts.txt");
        write_concat_list(&parts, &list_path).await?;
        let staged = workspace.path().join("output.mp4");
        job.report(0.0, "Joining repetitions");
        self.runner.run(&concat_command(&list_path, &staged)).await?;
        job.finish_step("Joined repetitions");

        let expected: f64 = request
            .ranges
            .iter()
            .map(|r| request.config.expected_duration(r.duration_secs()))
            .sum();
        let duration = get_duration(&staged).await.unwrap_or(expected);

        move_file(&staged, &request.output).await?;

        info!(
            output = %request.output.display(),
            segments = request.ranges.len(),
            repeat_count = request.config.repeat_count,
            duration,
            "Repeat video generated"
        );

        Ok(RepeatOutcome {
            output_path: request.output.clone(),
            repeat_count: request.config.repeat_count,
            duration,
            segments: request.ranges.len(),
        })
    }
}

fn validate_request(request: &RepeatRequest) -> MediaResult<()> {
    if !request.video.is_file() {
        return Err(MediaError::FileNotFound(request.video.clone()));
    }
    if request.ranges.is_empty() {
        return Err(MediaError::invalid_input("at least one time range is required"));
    }
    if let Some(bad) = request.ranges.iter().find(|r| !r.is_valid()) {
        return Err(MediaError::invalid_input(format!(
            "start time {} must be before end time {}",
            bad.start_time, bad.end_time
        )));
    }
    Ok(())
}

/// Per-range cue text for one subtitle mode.
///
/// Returns `None` when no cue has text in this mode.
pub fn render_mode_srt(cues: &[SubtitleCue], mode: SubtitleMode, highlight: Option<&str>) -> Option<String> {
    let rendered: Vec<SubtitleCue> = cues
        .iter()
        .filter_map(|cue| {
            let text = mode.render_text(&cue.text, cue.translation.as_deref())?;
            let text = match highlight {
                Some(phrase) => highlight_phrase(&text, phrase, HIGHLIGHT_COLOR),
                None => text,
            };
            Some(SubtitleCue {
                text,
                ..cue.clone()
            })
        })
        .filter(|cue| !cue.text.trim().is_empty())
        .collect();

    if rendered.is_empty() {
        None
    } else {
        Some(to_srt(&rendered))
    }
}

struct RenderJob<'a> {
    generator: &'a RepeatVideoGenerator,
    request: &'a RepeatRequest,
    dir: &'a Path,
    steps: StepProgress,
    on_progress: StepCallback,
}

impl RenderJob<'_> {
    fn report(&self, within: f64, message: impl Into<String>) {
        (self.on_progress)(self.steps.overall(within), message.into());
    }

    fn finish_step(&mut self, message: impl Into<String>) {
        let overall = self.steps.finish_step();
        (self.on_progress)(overall, message.into());
    }

    /// Callback refining the current step from ffmpeg telemetry.
    fn step_callback(&self, expected_ms: i64, message: String) -> impl Fn(FfmpegProgress) + Send + 'static {
        let steps = self.steps;
        let callback = Arc::clone(&self.on_progress);
        move |p| callback(steps.overall(p.fraction(expected_ms)), message.clone())
    }

    async fn render_range(&mut self, index: usize, range: &TimeRange) -> MediaResult<Vec<PathBuf>> {
        let request = self.request;
        let config = &request.config;
        let label = format!("segment {}/{}", index + 1, request.ranges.len());
        let segment_ms = range.end_time.saturating_sub(range.start_time).as_millis() as i64;

        // 1. cut
        let raw_segment = self.dir.join(format!("seg{}_raw.mp4", index));
        let callback = self.step_callback(segment_ms, format!("Extracting {}", label));
        extract_segment(
            &self.generator.runner,
            &request.video,
            &raw_segment,
            range.start_time,
            range.end_time,
            callback,
        )
        .await?;

        // 2. probe, and give silent sources an audio track so parts concat cleanly
        let mut info = probe_video(&raw_segment).await?;
        let segment = if info.has_audio {
            raw_segment
        } else {
            let with_audio = self.dir.join(format!("seg{}.mp4", index));
            self.add_silent_audio(&raw_segment, &with_audio).await?;
            info.has_audio = true;
            with_audio
        };
        self.finish_step(format!("Extracted {}", label));

        // 3. subtitle files per mode
        let range_cues = slice_for_range(&request.cues, range.start_time, range.end_time);
        let highlight = config.highlight_phrase.as_deref().filter(|p| !p.trim().is_empty());
        let mut subtitle_files: HashMap<SubtitleMode, PathBuf> = HashMap::new();
        for mode in config.subtitle_modes_in_use() {
            if let Some(srt) = render_mode_srt(&range_cues, mode, highlight) {
                let path = self.dir.join(format!("seg{}_{}.srt", index, mode.as_str()));
                tokio::fs::write(&path, srt).await?;
                subtitle_files.insert(mode, path);
            } else {
                debug!(segment = index, mode = mode.as_str(), "No cues for mode, rendering without subtitles");
            }
        }

        // 4-6. repetitions, narration and focus cards
        let mut narration: Option<Vec<NarrationClip>> = None;
        let mut rendered: HashMap<SubtitleMode, PathBuf> = HashMap::new();
        let mut cards: HashMap<usize, PathBuf> = HashMap::new();
        let modes = config.modes_for_repetitions();
        let mut parts = Vec::with_capacity(modes.len() * 2);

        for (rep, mode) in modes.iter().enumerate() {
            let rep_label = format!("{} repetition {}/{}", label, rep + 1, modes.len());

            let mut part = match subtitle_files.get(mode) {
                Some(srt) => match rendered.get(mode) {
                    Some(existing) => existing.clone(),
                    None => {
                        let out = self.dir.join(format!("seg{}_{}.mp4", index, mode.as_str()));
                        let cmd = FfmpegCommand::new(&segment, &out)
                            .video_filter(subtitles_filter(srt, &config.style))
                            .video_codec("libx264")
                            .preset("fast")
                            .pixel_format("yuv420p")
                            .audio_codec("copy");
                        let callback = self.step_callback(segment_ms, format!("Rendering {}", rep_label));
                        self.generator.runner.run_with_progress(&cmd, callback).await?;
                        rendered.insert(*mode, out.clone());
                        out
                    }
                },
                None => segment.clone(),
            };

            if let Some(tts) = config.tts.as_ref().filter(|t| t.applies_to(rep as u32)) {
                if narration.is_none() {
                    self.report(0.0, format!("Synthesizing narration for {}", label));
                    let synthesizer = self
                        .generator
                        .synthesizer
                        .as_ref()
                        .ok_or_else(|| MediaError::tts_failed("no speech backend configured"))?;
                    narration = Some(synthesize_cues(synthesizer.as_ref(), &range_cues, tts, self.dir).await?);
                }
                let clips = narration.as_deref().unwrap_or_default();
                if !clips.is_empty() {
                    let out = self.dir.join(format!("seg{}_rep{}_tts.mp4", index, rep));
                    let cmd = narration_mix_command(&part, clips, info.has_audio, info.duration, &out);
                    let callback = self.step_callback(segment_ms, format!("Mixing narration into {}", rep_label));
                    self.generator.runner.run_with_progress(&cmd, callback).await?;
                    part = out;
                }
            }

            parts.push(part);
            self.finish_step(format!("Rendered {}", rep_label));

            if config.focus_cards && rep + 1 < modes.len() {
                let message_index = rep % shadow_models::FOCUS_CARD_MESSAGES.len();
                let card = match cards.get(&message_index) {
                    Some(card) => card.clone(),
                    None => {
                        let card = self.dir.join(format!("seg{}_card{}.mp4", index, message_index));
                        self.render_focus_card(&info, focus_card_message(message_index), &card).await?;
                        cards.insert(message_index, card.clone());
                        self.finish_step(format!("Rendered focus card for {}", label));
                        card
                    }
                };
                parts.push(card);
            }
        }

        Ok(parts)
    }

    async fn add_silent_audio(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output)
            .add_lavfi(silent_audio_source())
            .map("0:v")
            .map("1:a")
            .video_codec("copy")
            .audio_codec("aac")
            .shortest();
        self.generator.runner.run(&cmd).await
    }

    async fn render_focus_card(&self, info: &VideoInfo, message: &str, output: &Path) -> MediaResult<()> {
        let cmd = FfmpegCommand::lavfi(
            focus_card_source(&info.resolution(), info.fps, FOCUS_CARD_SECS),
            output,
        )
        .add_lavfi(silent_audio_source())
        .video_filter(focus_card_text(message))
        .output_duration(FOCUS_CARD_SECS)
        .video_codec("libx264")
        .preset("fast")
        .pixel_format("yuv420p")
        .audio_codec("aac")
        .output_args(["-ar".to_string(), AUDIO_SAMPLE_RATE.to_string(), "-ac".to_string(), "2".to_string()]);
        self.generator.runner.run(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shadow_models::{Timestamp, TtsConfig};

    fn cue(index: usize, start_ms: u64, end_ms: u64, text: &str, translation: Option<&str>) -> SubtitleCue {
        let mut cue = SubtitleCue::new(index, Timestamp::from_millis(start_ms), Timestamp::from_millis(end_ms), text);
        cue.translation = translation.map(str::to_string);
        cue
    }

    fn request(repeat_count: u32, focus_cards: bool, ranges: usize) -> RepeatRequest {
        RepeatRequest {
            video: PathBuf::from("talk.mp4"),
            ranges: (0..ranges)
                .map(|i| {
                    TimeRange::new(
                        Timestamp::from_millis(i as u64 * 10_000),
                        Timestamp::from_millis(i as u64 * 10_000 + 3_000),
                    )
                })
                .collect(),
            cues: Vec::new(),
            config: GenerationConfig {
                repeat_count,
                focus_cards,
                ..GenerationConfig::default()
            },
            output: PathBuf::from("out.mp4"),
        }
    }

    #[test]
    fn test_total_steps() {
        // extract + 3 renders + 2 distinct cards, plus the final join
        assert_eq!(request(3, true, 1).total_steps(), 7);
        assert_eq!(request(3, false, 2).total_steps(), 9);
        // cards are shared between repetitions
        assert_eq!(request(10, true, 1).total_steps(), 1 + 10 + 2 + 1);
        assert_eq!(request(1, true, 1).total_steps(), 3);
    }

    #[test]
    fn test_render_mode_srt() {
        let cues = vec![
            cue(0, 0, 1500, "Break a leg", Some("행운을 빌어")),
            cue(1, 1500, 2800, "See you", None),
        ];

        let en_ko = render_mode_srt(&cues, SubtitleMode::EnKo, None).unwrap();
        assert!(en_ko.contains("Break a leg\n행운을 빌어\n"));
        assert!(en_ko.contains("00:00:01,500 --> 00:00:02,800\nSee you\n"));

        let ko = render_mode_srt(&cues, SubtitleMode::Ko, None).unwrap();
        assert!(ko.contains("행운을 빌어"));
        assert!(ko.contains("See you"));

        assert!(render_mode_srt(&cues, SubtitleMode::NoSubtitle, None).is_none());
        assert!(render_mode_srt(&[], SubtitleMode::En, None).is_none());
    }

    #[test]
    fn test_render_mode_srt_highlight() {
        let cues = vec![cue(0, 0, 1000, "Break a leg tonight", None)];
        let srt = render_mode_srt(&cues, SubtitleMode::En, Some("break a LEG")).unwrap();
        assert!(srt.contains("<font color=\"#FFD700\">Break a leg</font> tonight"));
    }

    #[test]
    fn test_validate_request() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"x").unwrap();

        let mut req = request(3, true, 1);
        assert!(matches!(validate_request(&req), Err(MediaError::FileNotFound(_))));

        req.video = video;
        assert!(validate_request(&req).is_ok());

        req.ranges = vec![TimeRange::new(Timestamp::from_millis(5000), Timestamp::from_millis(5000))];
        assert!(matches!(validate_request(&req), Err(MediaError::InvalidInput(_))));

        req.ranges.clear();
        assert!(matches!(validate_request(&req), Err(MediaError::InvalidInput(_))));
    }

    #[test]
    fn test_repeat_output_name() {
        let start = Timestamp::from_millis(61_500);
        assert_eq!(
            repeat_output_name(Path::new("clips/talk.mp4"), 3, start, None),
            "talk_repeat3_00_01_01_500.mp4"
        );
        assert_eq!(repeat_output_name(Path::new("talk.mp4"), 3, start, Some("mine")), "mine.mp4");
    }

    #[tokio::test]
    async fn test_tts_without_backend_fails_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"x").unwrap();

        let mut req = request(2, true, 1);
        req.video = video;
        req.config.tts = Some(TtsConfig::default());

        let generator = RepeatVideoGenerator::new(FfmpegRunner::new(), dir.path().join("temp"));
        let err = generator.generate(&req, Arc::new(|_, _| {})).await.unwrap_err();
        assert!(matches!(err, MediaError::TtsFailed { .. }));
        assert!(!dir.path().join("temp").exists());
    }

    #[tokio::test]
    #[ignore = "requires ffmpeg and ffprobe"]
    async fn test_three_repetitions_triple_the_segment() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.mp4");
        let cmd = FfmpegCommand::lavfi("testsrc=size=320x240:rate=25:d=6", &source)
            .add_lavfi("sine=frequency=440")
            .output_duration(6.0)
            .video_codec("libx264")
            .audio_codec("aac");
        FfmpegRunner::new().run(&cmd).await.unwrap();

        let mut req = request(3, true, 1);
        req.video = source;
        req.output = dir.path().join("out").join("repeat.mp4");
        req.cues = vec![cue(0, 500, 2500, "Hello there", Some("안녕"))];

        let progress = Arc::new(recorder::Recorder::default());
        let sink = Arc::clone(&progress);
        let outcome = RepeatVideoGenerator::new(FfmpegRunner::new(), dir.path().join("temp"))
            .generate(&req, Arc::new(move |p, _| sink.push(p)))
            .await
            .unwrap();

        let expected = req.config.expected_duration(3.0);
        assert!((outcome.duration - expected).abs() < 0.5, "{} vs {}", outcome.duration, expected);
        assert!(req.output.is_file());
        assert!(progress.is_monotonic());
    }

    mod recorder {
        use std::sync::Mutex;

        #[derive(Default)]
        pub struct Recorder(Mutex<Vec<f64>>);

        impl Recorder {
            pub fn push(&self, p: f64) {
                self.0.lock().unwrap().push(p);
            }

            pub fn is_monotonic(&self) -> bool {
                let values = self.0.lock().unwrap();
                values.windows(2).all(|w| w[1] >= w[0] - 1e-9)
            }
        }
    }
}
