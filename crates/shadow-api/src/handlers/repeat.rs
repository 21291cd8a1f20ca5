//! Repeat video generation and its time estimate.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use shadow_media::{probe_video, repeat_output_name, RepeatRequest};
use shadow_models::timestamp::validate_range;
use shadow_models::whisper::human_duration;
use shadow_models::{
    estimate_generation_secs, GenerationConfig, SubtitleMode, SubtitleStyle, TimeRange, TtsConfig,
};
use shadow_worker::{RepeatJob, WorkerJob};

use crate::error::{ApiError, ApiResult};
use crate::handlers::subtitles::load_cues_blocking;
use crate::handlers::tasks::TaskAccepted;
use crate::state::AppState;

/// A `start_time`/`end_time` pair as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeInput {
    pub start_time: String,
    pub end_time: String,
}

impl RangeInput {
    fn parse(&self) -> ApiResult<TimeRange> {
        let (start, end) = validate_range(&self.start_time, &self.end_time).map_err(|e| {
            ApiError::bad_request(format!("invalid range {}-{}: {}", self.start_time, self.end_time, e))
        })?;
        Ok(TimeRange::new(start, end))
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRepeatRequest {
    pub video_path: String,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    /// Several selections rendered back to back; wins over `start_time`/`end_time`
    #[serde(default)]
    pub ranges: Option<Vec<RangeInput>>,
    #[serde(default)]
    pub repeat_count: Option<u32>,
    #[serde(default)]
    pub subtitle_modes: Option<Vec<SubtitleMode>>,
    #[serde(default)]
    pub style: Option<SubtitleStyle>,
    #[serde(default)]
    pub tts: Option<TtsConfig>,
    #[serde(default)]
    pub highlight_phrase: Option<String>,
    #[serde(default)]
    pub focus_cards: Option<bool>,
    #[serde(default)]
    pub output_name: Option<String>,
    /// Subtitle language used for burned-in text
    #[serde(default)]
    pub language: Option<String>,
}

impl GenerateRepeatRequest {
    pub fn time_ranges(&self) -> ApiResult<Vec<TimeRange>> {
        if let Some(ranges) = self.ranges.as_ref().filter(|r| !r.is_empty()) {
            return ranges.iter().map(RangeInput::parse).collect();
        }
        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => Ok(vec![RangeInput {
                start_time: start.clone(),
                end_time: end.clone(),
            }
            .parse()?]),
            _ => Err(ApiError::bad_request(
                "either ranges or start_time and end_time are required",
            )),
        }
    }

    /// Defaults overlaid with whatever the client sent.
    pub fn generation_config(&self) -> ApiResult<GenerationConfig> {
        let mut config = GenerationConfig::default();
        if let Some(count) = self.repeat_count {
            config.repeat_count = count;
        }
        if let Some(modes) = &self.subtitle_modes {
            config.subtitle_modes = modes.clone();
        }
        if let Some(style) = &self.style {
            config.style = style.clone();
        }
        config.tts = self.tts.clone();
        config.highlight_phrase = self
            .highlight_phrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        if let Some(focus_cards) = self.focus_cards {
            config.focus_cards = focus_cards;
        }
        config.validate().map_err(ApiError::validation)?;
        Ok(config)
    }
}

/// Queue a repeat video render into the output directory.
pub async fn generate_repeat(
    State(state): State<AppState>,
    Json(request): Json<GenerateRepeatRequest>,
) -> ApiResult<(StatusCode, Json<TaskAccepted>)> {
    let video = state.layout.require_file(&request.video_path)?;
    let ranges = request.time_ranges()?;
    let config = request.generation_config()?;

    let output_name = repeat_output_name(
        &video,
        config.repeat_count,
        ranges[0].start_time,
        request.output_name.as_deref(),
    );
    let output = state.layout.output_dir().join(&output_name);
    let lock = state.locks.acquire(&output)?;

    let language = request.language.as_deref().map(str::trim).filter(|l| !l.is_empty());
    let cues = load_cues_blocking(&video, language)
        .await?
        .map(|t| t.cues)
        .unwrap_or_default();

    info!(
        video = %video.display(),
        ranges = ranges.len(),
        repeat_count = config.repeat_count,
        cues = cues.len(),
        output = %output.display(),
        "Repeat generation accepted"
    );

    let output_path = state.layout.display_path(&output);
    let job = RepeatJob {
        request: RepeatRequest {
            video,
            ranges,
            cues,
            config,
            output,
        },
    };
    let record = state.executor.submit(WorkerJob::Repeat(job), Some(lock));

    Ok(TaskAccepted::new(record, "Repeat video generation started")
        .with_output(output_name, output_path)
        .accepted())
}

#[derive(Debug, Deserialize)]
pub struct EstimateGenerationRequest {
    pub video_path: String,
    pub subtitle_segments: Vec<RangeInput>,
}

#[derive(Debug, Serialize)]
pub struct EstimateGenerationResponse {
    pub status: &'static str,
    pub estimated_seconds: f64,
    pub human_estimate: String,
    pub total_segment_seconds: f64,
}

/// Rough render time for the selected segments.
pub async fn estimate_generation(
    State(state): State<AppState>,
    Json(request): Json<EstimateGenerationRequest>,
) -> ApiResult<Json<EstimateGenerationResponse>> {
    let video = state.layout.require_file(&request.video_path)?;
    if request.subtitle_segments.is_empty() {
        return Err(ApiError::bad_request("subtitle_segments must not be empty"));
    }

    let mut total_segment_seconds = 0.0;
    for segment in &request.subtitle_segments {
        total_segment_seconds += segment.parse()?.duration_secs();
    }

    let info = probe_video(&video).await?;
    let estimated_seconds = estimate_generation_secs(total_segment_seconds, info.width, info.height);

    Ok(Json(EstimateGenerationResponse {
        status: "success",
        estimated_seconds,
        human_estimate: human_duration(estimated_seconds),
        total_segment_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> GenerateRepeatRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_single_range_from_start_end() {
        let req = request(serde_json::json!({
            "video_path": "talk.mp4",
            "start_time": "00:00:01,000",
            "end_time": "00:00:03,500"
        }));
        let ranges = req.time_ranges().unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].duration_secs(), 2.5);
    }

    #[test]
    fn test_ranges_win_over_pair() {
        let req = request(serde_json::json!({
            "video_path": "talk.mp4",
            "start_time": "00:00:01",
            "end_time": "00:00:02",
            "ranges": [
                {"start_time": "00:00:10", "end_time": "00:00:12"},
                {"start_time": "00:01:00", "end_time": "00:01:01,500"}
            ]
        }));
        let ranges = req.time_ranges().unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].duration_secs(), 1.5);
    }

    #[test]
    fn test_invalid_ranges() {
        let reversed = request(serde_json::json!({
            "video_path": "talk.mp4",
            "start_time": "00:00:05",
            "end_time": "00:00:02"
        }));
        assert!(matches!(reversed.time_ranges(), Err(ApiError::BadRequest(_))));

        let missing = request(serde_json::json!({"video_path": "talk.mp4", "start_time": "00:00:05"}));
        assert!(matches!(missing.time_ranges(), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_generation_config_overlay() {
        let req = request(serde_json::json!({
            "video_path": "talk.mp4",
            "repeat_count": 2,
            "subtitle_modes": ["en"],
            "highlight_phrase": "  ",
            "focus_cards": false
        }));
        let config = req.generation_config().unwrap();
        assert_eq!(config.repeat_count, 2);
        assert_eq!(config.subtitle_modes, vec![SubtitleMode::En]);
        assert!(config.highlight_phrase.is_none());
        assert!(!config.focus_cards);

        let too_many = request(serde_json::json!({"video_path": "talk.mp4", "repeat_count": 11}));
        assert!(matches!(too_many.generation_config(), Err(ApiError::Validation(_))));
    }
}
