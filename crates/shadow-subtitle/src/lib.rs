//! Subtitle handling: SRT and WebVTT parsing, VTT to SRT conversion, inline
//! markup and cue search.

pub mod error;
pub mod markup;
pub mod search;
pub mod srt;
pub mod vtt;

pub use error::{SubtitleError, SubtitleResult};
pub use markup::{highlight_phrase, normalize, strip_tags};
pub use search::{search, search_multiline, MultilineResults, SearchDocument, SearchHit};
pub use srt::{parse_srt, read_srt, slice_for_range, to_srt};
pub use vtt::{convert_vtt_file, parse_vtt, vtt_to_srt};
