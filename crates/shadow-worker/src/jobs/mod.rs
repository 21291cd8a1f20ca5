//! One runner per task kind.

pub mod download;
pub mod final_video;
pub mod merge;
pub mod repeat;
pub mod whisper;
