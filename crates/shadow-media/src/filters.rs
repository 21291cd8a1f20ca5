//! FFmpeg filter strings.

use std::path::Path;

use shadow_models::{SubtitleStyle, FOCUS_CARD_MESSAGES};

/// Audio layout shared by every part that gets concatenated.
pub const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Font size of the focus card message.
pub const FOCUS_CARD_FONT_SIZE: u32 = 72;

/// Silent stereo audio source.
pub fn silent_audio_source() -> String {
    format!("anullsrc=r={}:cl=stereo", AUDIO_SAMPLE_RATE)
}

/// Escape text for use inside a single-quoted `drawtext=text='...'`.
pub fn escape_drawtext(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            ':' => out.push_str("\\:"),
            '%' => out.push_str("\\%"),
            c => out.push(c),
        }
    }
    out
}

/// Escape a file path used as a filter option value.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' | ':' | '\'' | ',' | ';' | '[' | ']' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// `#RRGGBB[AA]` to libass `&HAABBGGRR`.
///
/// CSS alpha counts opacity, ASS alpha counts transparency, so the alpha byte
/// is inverted. Unparseable input renders opaque black.
fn ass_colour(hex: &str) -> String {
    let digits = hex.trim().trim_start_matches('#');
    let byte = |i: usize| digits.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok());

    let parsed = match digits.len() {
        6 => byte(0).zip(byte(2)).zip(byte(4)).map(|((r, g), b)| (r, g, b, 0xFF)),
        8 => byte(0)
            .zip(byte(2))
            .zip(byte(4))
            .zip(byte(6))
            .map(|(((r, g), b), a)| (r, g, b, a)),
        _ => None,
    };
    let (r, g, b, a) = parsed.unwrap_or((0, 0, 0, 0xFF));
    format!("&H{:02X}{:02X}{:02X}{:02X}", 0xFF - a, b, g, r)
}

/// Burn an SRT file into the video with the given style.
pub fn subtitles_filter(srt: &Path, style: &SubtitleStyle) -> String {
    format!(
        "subtitles={}:force_style='FontName={},FontSize={},PrimaryColour=&HFFFFFF,OutlineColour=&H000000,BorderStyle=1,Outline=1,Shadow={},BackColour={},Alignment=2,MarginL={},MarginV={}'",
        escape_filter_path(srt),
        style.font.replace(&['\'', ','][..], ""),
        style.font_size,
        if style.shadow { 1 } else { 0 },
        ass_colour(&style.background),
        style.x,
        style.y,
    )
}

/// Message shown on the `n`th focus card.
pub fn focus_card_message(n: usize) -> &'static str {
    FOCUS_CARD_MESSAGES[n % FOCUS_CARD_MESSAGES.len()]
}

/// Black background source for a focus card.
pub fn focus_card_source(resolution: &str, fps: f64, seconds: f64) -> String {
    format!(
        "color=c=black:s={}:r={}:d={:.3}",
        resolution,
        format_fps(fps),
        seconds
    )
}

/// Centered white message drawn on a focus card.
pub fn focus_card_text(message: &str) -> String {
    format!(
        "drawtext=text='{}':fontcolor=white:fontsize={}:x=(w-tw)/2:y=(h-th)/2",
        escape_drawtext(message),
        FOCUS_CARD_FONT_SIZE
    )
}

fn format_fps(fps: f64) -> String {
    if fps.is_finite() && fps > 0.0 {
        let rounded = (fps * 1000.0).round() / 1000.0;
        format!("{}", rounded)
    } else {
        "30".to_string()
    }
}

/// Delay each narration input and mix it over the base audio.
///
/// Input `0` carries the base audio, inputs `1..=delays.len()` the narration
/// clips. The mixed stream is labelled `[aout]`.
pub fn narration_mix_filter(base: &str, delays_ms: &[u64]) -> String {
    let mut parts: Vec<String> = delays_ms
        .iter()
        .enumerate()
        .map(|(i, ms)| format!("[{}:a]adelay={}|{}[s{}]", i + 1, ms, ms, i))
        .collect();

    let mut mix = format!("[{}]", base);
    for i in 0..delays_ms.len() {
        mix.push_str(&format!("[s{}]", i));
    }
    mix.push_str(&format!(
        "amix=inputs={}:duration=first:dropout_transition=0[aout]",
        delays_ms.len() + 1
    ));
    parts.push(mix);
    parts.join(";")
}

/// Scale and pad a video stream to `width`x`height` at a fixed frame rate.
pub fn normalize_video(input: &str, width: u32, height: u32, fps: u32, label: &str) -> String {
    format!(
        "[{input}]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,fps={fps},format=yuv420p[{label}]",
        input = input,
        w = width,
        h = height,
        fps = fps,
        label = label
    )
}

/// Resample an audio stream to 44.1 kHz stereo.
pub fn normalize_audio(input: &str, label: &str) -> String {
    format!(
        "[{}]aresample={},aformat=sample_fmts=fltp:channel_layouts=stereo[{}]",
        input, AUDIO_SAMPLE_RATE, label
    )
}
