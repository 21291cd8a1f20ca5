//! Thumbnail generation.
//!
//! A frame is grabbed at the requested time and scaled to 1280x720. The
//! template then blurs and darkens it, lays a tint over it and draws the title
//! and subtitle. The filter graph goes through a script file so arbitrary
//! text never touches the command line.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use shadow_models::Timestamp;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::escape_drawtext;
use crate::fs_utils::{job_workspace, move_file};

pub const THUMBNAIL_WIDTH: u32 = 1280;
pub const THUMBNAIL_HEIGHT: u32 = 720;

const TINT_ALPHA: f64 = 0.85;
const GRADIENT_ALPHA: f64 = 0.9;
const SHADOW_COLOR: &str = "#000000";
const SHADOW_OFFSET: (u32, u32) = (2, 2);
const MARGIN: u32 = 40;

/// Thumbnail looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailTemplate {
    #[default]
    Basic,
    Title,
    EnglishVocab,
    Shadowing,
    Conversation,
    Pronunciation,
    Quiz,
}

impl ThumbnailTemplate {
    pub const ALL: [ThumbnailTemplate; 7] = [
        ThumbnailTemplate::Basic,
        ThumbnailTemplate::Title,
        ThumbnailTemplate::EnglishVocab,
        ThumbnailTemplate::Shadowing,
        ThumbnailTemplate::Conversation,
        ThumbnailTemplate::Pronunciation,
        ThumbnailTemplate::Quiz,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailTemplate::Basic => "basic",
            ThumbnailTemplate::Title => "title",
            ThumbnailTemplate::EnglishVocab => "english_vocab",
            ThumbnailTemplate::Shadowing => "shadowing",
            ThumbnailTemplate::Conversation => "conversation",
            ThumbnailTemplate::Pronunciation => "pronunciation",
            ThumbnailTemplate::Quiz => "quiz",
        }
    }

    pub fn style(&self) -> TemplateStyle {
        let base = TemplateStyle {
            background: "#000000",
            gradient_end: None,
            text_color: "#FFFFFF",
            subtitle_color: "#DDDDDD",
            font_size: 72,
            subtitle_size: 36,
            text_position: (0.5, 0.4),
            box_fill: None,
            border: None,
        };
        match self {
            ThumbnailTemplate::Basic => base,
            ThumbnailTemplate::Title => TemplateStyle {
                background: "#0F1829",
                text_position: (0.5, 0.5),
                ..base
            },
            ThumbnailTemplate::EnglishVocab => TemplateStyle {
                background: "#2C3E50",
                text_color: "#ECF0F1",
                subtitle_color: "#E74C3C",
                font_size: 80,
                subtitle_size: 48,
                ..base
            },
            ThumbnailTemplate::Shadowing => TemplateStyle {
                background: "#34495E",
                text_color: "#F1C40F",
                subtitle_color: "#BDC3C7",
                text_position: (0.5, 0.5),
                border: Some(("#F39C12", 4)),
                ..base
            },
            ThumbnailTemplate::Conversation => TemplateStyle {
                background: "#1E3A8A",
                subtitle_color: "#FBBF24",
                text_position: (0.5, 0.45),
                ..base
            },
            ThumbnailTemplate::Pronunciation => TemplateStyle {
                background: "#481449",
                gradient_end: Some("#27104E"),
                subtitle_color: "#F472B6",
                text_position: (0.5, 0.35),
                ..base
            },
            ThumbnailTemplate::Quiz => TemplateStyle {
                background: "#065F46",
                subtitle_color: "#A7F3D0",
                box_fill: Some(("#047857", 20)),
                ..base
            },
        }
    }
}

impl FromStr for ThumbnailTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ThumbnailTemplate::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown thumbnail template: {}", s))
    }
}

/// Colours and geometry of a template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateStyle {
    pub background: &'static str,
    pub gradient_end: Option<&'static str>,
    pub text_color: &'static str,
    pub subtitle_color: &'static str,
    pub font_size: u32,
    pub subtitle_size: u32,
    /// Title anchor as fractions of the free space
    pub text_position: (f64, f64),
    /// Filled box behind the title: colour and padding
    pub box_fill: Option<(&'static str, u32)>,
    /// Subtitle outline: colour and width
    pub border: Option<(&'static str, u32)>,
}

/// Filter graph for a template. Returns the graph and its output label.
pub fn build_thumbnail_filter(
    template: ThumbnailTemplate,
    text: Option<&str>,
    subtitle: Option<&str>,
) -> (String, &'static str) {
    let style = template.style();
    let size = format!("{}x{}", THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT);
    let mut graph = vec![
        "[0:v]format=rgb24,boxblur=20,setsar=1[bg]".to_string(),
        "[bg]colorlevels=rimax=0.7:gimax=0.7:bimax=0.7[darken]".to_string(),
    ];

    match style.gradient_end {
        Some(end) => {
            graph.push(format!(
                "gradients=s={size}:c0={start}:c1={end}:x0=0:y0=0:x1={w}:y1={h},format=rgba,colorchannelmixer=aa={alpha}[tint]",
                size = size,
                start = style.background,
                end = end,
                w = THUMBNAIL_WIDTH,
                h = THUMBNAIL_HEIGHT,
                alpha = GRADIENT_ALPHA
            ));
        }
        None => {
            graph.push(format!(
                "color=c={}:s={},format=rgba,colorchannelmixer=aa={}[tint]",
                style.background, size, TINT_ALPHA
            ));
        }
    }
    graph.push("[darken][tint]overlay=format=auto[base]".to_string());

    let mut last = "base";

    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        let escaped = escape_drawtext(text);
        let x = format!("(w-text_w)*{}", style.text_position.0);
        let y = format!("(h-text_h)*{}", style.text_position.1);

        graph.push(format!(
            "[{last}]drawtext=text='{t}':fontsize={fs}:fontcolor={c}:x={x}+{dx}:y={y}+{dy}[shadow]",
            last = last,
            t = escaped,
            fs = style.font_size,
            c = SHADOW_COLOR,
            x = x,
            y = y,
            dx = SHADOW_OFFSET.0,
            dy = SHADOW_OFFSET.1
        ));
        last = "shadow";

        if let Some((color, padding)) = style.box_fill {
            graph.push(format!(
                "[{last}]drawbox=x=(iw*{px})-{p}-{fs}*2:y=(ih*{py})-{p}-{fs}/2:w={fs}*4+{p2}:h={fs}+{p2}:color={c}:t=fill[box_bg]",
                last = last,
                px = style.text_position.0,
                py = style.text_position.1,
                p = padding,
                p2 = padding * 2,
                fs = style.font_size,
                c = color
            ));
            last = "box_bg";
        }

        graph.push(format!(
            "[{last}]drawtext=text='{t}':fontsize={fs}:fontcolor={c}:x={x}:y={y}[main_text]",
            last = last,
            t = escaped,
            fs = style.font_size,
            c = style.text_color,
            x = x,
            y = y
        ));
        last = "main_text";
    }

    if let Some(subtitle) = subtitle.map(str::trim).filter(|s| !s.is_empty()) {
        let escaped = escape_drawtext(subtitle);
        let y = format!("h-th-{}", MARGIN);
        match style.border {
            Some((color, width)) => graph.push(format!(
                "[{last}]drawtext=text='{t}':fontsize={fs}:bordercolor={bc}:borderw={bw}:fontcolor={c}:x=(w-text_w)/2:y={y}[final]",
                last = last,
                t = escaped,
                fs = style.subtitle_size,
                bc = color,
                bw = width,
                c = style.subtitle_color,
                y = y
            )),
            None => {
                graph.push(format!(
                    "[{last}]drawtext=text='{t}':fontsize={fs}:fontcolor={c}:x=(w-text_w)/2+{dx}:y={y}+{dy}[sub_shadow]",
                    last = last,
                    t = escaped,
                    fs = style.subtitle_size,
                    c = SHADOW_COLOR,
                    y = y,
                    dx = SHADOW_OFFSET.0,
                    dy = SHADOW_OFFSET.1
                ));
                graph.push(format!(
                    "[sub_shadow]drawtext=text='{t}':fontsize={fs}:fontcolor={c}:x=(w-text_w)/2:y={y}[final]",
                    t = escaped,
                    fs = style.subtitle_size,
                    c = style.subtitle_color,
                    y = y
                ));
            }
        }
        last = "final";
    }

    (graph.join(";\n"), last)
}

/// `{stem}_thumb_{time}.jpg`
pub fn default_thumbnail_name(video: &Path, time: Timestamp) -> String {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    format!("{}_thumb_{}.jpg", stem, time.to_file_tag())
}

/// A thumbnail to render.
#[derive(Debug, Clone)]
pub struct ThumbnailRequest {
    pub video: PathBuf,
    pub time: Timestamp,
    pub output: PathBuf,
    pub text: Option<String>,
    pub subtitle: Option<String>,
    pub template: ThumbnailTemplate,
}

/// Render a thumbnail and return its path.
pub async fn generate_thumbnail(
    runner: &FfmpegRunner,
    request: &ThumbnailRequest,
    workspace_root: &Path,
) -> MediaResult<PathBuf> {
    if !request.video.is_file() {
        return Err(MediaError::FileNotFound(request.video.clone()));
    }

    let workspace = job_workspace(workspace_root, "thumb-")?;
    let frame = workspace.path().join("frame.png");

    let grab = FfmpegCommand::new(&request.video, &frame)
        .seek(request.time.as_secs_f64())
        .single_frame()
        .video_filter(format!("scale={}:{}", THUMBNAIL_WIDTH, THUMBNAIL_HEIGHT));
    runner.run(&grab).await?;
    if !frame.is_file() {
        return Err(MediaError::InvalidVideo(format!(
            "no frame at {} in {}",
            request.time,
            request.video.display()
        )));
    }

    let (graph, last) = build_thumbnail_filter(
        request.template,
        request.text.as_deref(),
        request.subtitle.as_deref(),
    );
    let script = workspace.path().join("filter.txt");
    tokio::fs::write(&script, graph).await?;

    let staged = workspace.path().join("thumbnail.jpg");
    let render = FfmpegCommand::new(&frame, &staged)
        .filter_complex_script(&script)
        .map(format!("[{}]", last))
        .single_frame();
    runner.run(&render).await?;

    move_file(&staged, &request.output).await?;
    info!(
        output = %request.output.display(),
        template = request.template.as_str(),
        "Thumbnail generated"
    );
    Ok(request.output.clone())
}
