//! Local media library.
//!
//! This crate provides:
//! - The data directory layout and safe path resolution
//! - Clip listing with subtitle availability
//! - Subtitle discovery with on-disk WebVTT conversion
//! - Translation sidecars with atomic writes

pub mod error;
pub mod layout;
pub mod library;
pub mod translations;

pub use error::{StorageError, StorageResult};
pub use layout::{StorageLayout, STREAMABLE_EXTENSIONS};
pub use library::{
    available_subtitles, find_subtitle_file, list_clips, load_cues, search_documents,
    LoadedSubtitles, SUBTITLE_LANGUAGES,
};
pub use translations::{
    apply_translations, load_translations, read_translations, translations_path, TranslationStore,
    Translations,
};
