//! Subtitle lookup, search and translation.

use std::path::Path;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use shadow_media::{check_whisper, estimate_transcription, transcribe, WhisperRequest};
use shadow_models::{SubtitleCue, WhisperModel};
use shadow_storage::{load_cues, search_documents, LoadedSubtitles, StorageError, SUBTITLE_LANGUAGES};
use shadow_subtitle::{search, search_multiline, SearchHit};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::sanitize_text;
use crate::state::AppState;

/// Language used when Whisper runs without an explicit one.
const DEFAULT_WHISPER_LANGUAGE: &str = "en";

#[derive(Debug, Deserialize)]
pub struct GetSubtitleParams {
    #[serde(default)]
    pub video_path: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub use_whisper: bool,
}

#[derive(Debug, Serialize)]
pub struct SubtitleListResponse {
    pub status: &'static str,
    pub message: String,
    pub subtitles: Vec<SubtitleCue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whisper_models: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_languages: Option<Vec<&'static str>>,
}

/// [`load_cues`] on the blocking pool. Lookup may convert a VTT track to SRT
/// on disk.
pub(crate) async fn load_cues_blocking(
    video: &Path,
    language: Option<&str>,
) -> ApiResult<Option<LoadedSubtitles>> {
    let video = video.to_path_buf();
    let language = language.map(str::to_string);
    tokio::task::spawn_blocking(move || load_cues(&video, language.as_deref()))
        .await
        .map_err(|e| ApiError::internal(format!("subtitle load panicked: {}", e)))?
        .map_err(ApiError::from)
}

/// Cues of a video merged with saved translations.
///
/// With `use_whisper` a missing track is generated with the `tiny` model
/// before the lookup is retried.
pub async fn get_subtitles(
    State(state): State<AppState>,
    Query(params): Query<GetSubtitleParams>,
) -> ApiResult<Json<SubtitleListResponse>> {
    let video = state.layout.require_file(&params.video_path)?;
    let language = params.language.as_deref().map(str::trim).filter(|l| !l.is_empty());

    let mut loaded = load_cues_blocking(&video, language).await?;

    if loaded.is_none() && params.use_whisper {
        let whisper_language = language.unwrap_or(DEFAULT_WHISPER_LANGUAGE);
        info!(video = %video.display(), language = whisper_language, "No subtitles, running Whisper");

        let request = WhisperRequest::new(&video, WhisperModel::Tiny, whisper_language);
        let estimate = estimate_transcription(&video, WhisperModel::Tiny).await?;
        transcribe(
            &request,
            &state.layout.temp_dir(),
            estimate.estimated_seconds,
            std::sync::Arc::new(|_, _| {}),
        )
        .await?;

        loaded = load_cues_blocking(&video, Some(whisper_language)).await?;
    }

    let response = match loaded {
        Some(track) => SubtitleListResponse {
            status: "success",
            message: format!("Found {} subtitles", track.cues.len()),
            subtitle_path: Some(state.layout.display_path(&track.subtitle_path)),
            subtitles: track.cues,
            whisper_available: None,
            whisper_models: None,
            supported_languages: None,
        },
        None => SubtitleListResponse {
            status: "success",
            message: "No subtitles found. They can be generated with Whisper.".to_string(),
            subtitles: Vec::new(),
            subtitle_path: None,
            whisper_available: Some(check_whisper().is_ok()),
            whisper_models: Some(WhisperModel::ALL.iter().map(WhisperModel::as_str).collect()),
            supported_languages: Some(SUBTITLE_LANGUAGES.to_vec()),
        },
    };

    Ok(Json(response))
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubtitleSearchRequest {
    #[validate(length(min = 1, max = 5000))]
    pub query: String,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 200))]
    pub limit: usize,
    #[serde(default)]
    pub multiline: bool,
}

#[derive(Debug, Serialize)]
pub struct SubtitleSearchResponse {
    pub status: &'static str,
    pub query: String,
    pub total: usize,
    pub results: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_results: Option<std::collections::BTreeMap<String, Vec<SearchHit>>>,
}

/// Search every non-Korean subtitle track in the clips directory.
pub async fn search_subtitles(
    State(state): State<AppState>,
    Json(request): Json<SubtitleSearchRequest>,
) -> ApiResult<Json<SubtitleSearchResponse>> {
    request.validate().map_err(ApiError::validation)?;

    let query = sanitize_text(&request.query);
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("query must not be blank"));
    }

    let layout = state.layout.clone();
    let documents = tokio::task::spawn_blocking(move || search_documents(&layout))
        .await
        .map_err(|e| ApiError::internal(format!("subtitle scan panicked: {}", e)))??;

    metrics::record_subtitle_search(request.multiline);

    let response = if request.multiline {
        let found = search_multiline(&documents, &query, request.limit);
        SubtitleSearchResponse {
            status: "success",
            total: found.results.len(),
            query,
            results: found.results,
            query_results: Some(found.query_results),
        }
    } else {
        let results = search(&documents, query.trim(), request.limit);
        SubtitleSearchResponse {
            status: "success",
            total: results.len(),
            query,
            results,
            query_results: None,
        }
    };

    info!(
        tracks = documents.len(),
        hits = response.total,
        multiline = request.multiline,
        "Subtitle search finished"
    );
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub video_path: String,
    pub subtitle_index: usize,
    /// Source text as the client saw it
    #[serde(default)]
    pub text: Option<String>,
    pub translation: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub status: &'static str,
    pub message: String,
    pub subtitle_index: usize,
    pub text: String,
    pub translation: String,
}

/// Save the translation of one cue.
pub async fn translate_subtitle(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> ApiResult<Json<TranslateResponse>> {
    let video = state.layout.require_file(&request.video_path)?;
    let track = load_cues_blocking(&video, None)
        .await?
        .ok_or_else(|| StorageError::SubtitleNotFound(request.video_path.clone()))?;

    let index = request.subtitle_index;
    let translation = sanitize_text(request.translation.trim());
    let store = state.translations.clone();
    let (cue_count, saved) = (track.cues.len(), translation.clone());
    tokio::task::spawn_blocking(move || store.save(&video, index, cue_count, &saved))
        .await
        .map_err(|e| ApiError::internal(format!("translation save panicked: {}", e)))??;
    metrics::record_translation_saved();

    let text = track.cues[index].text.clone();
    if let Some(client_text) = request.text.as_deref() {
        if client_text.trim() != text.trim() {
            warn!(index, "Translated cue text differs from the track on disk");
        }
    }

    Ok(Json(TranslateResponse {
        status: "success",
        message: "Translation saved".to_string(),
        subtitle_index: index,
        text,
        translation,
    }))
}
