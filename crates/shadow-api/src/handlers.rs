//! Request handlers.

pub mod clips;
pub mod health;
pub mod merge;
pub mod repeat;
pub mod subtitles;
pub mod tasks;
pub mod thumbnail;
pub mod whisper;

pub use clips::*;
pub use health::*;
pub use merge::*;
pub use repeat::*;
pub use subtitles::*;
pub use tasks::*;
pub use thumbnail::*;
pub use whisper::*;
