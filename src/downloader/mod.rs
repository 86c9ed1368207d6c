// Downloader module - engine abstraction and download orchestration

pub mod errors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod traits;
pub mod utils;
pub mod ytdlp;

pub use errors::DownloadError;
pub use format_selector::{QualityPreset, VIDEO_QUALITIES};
pub use models::{
    DownloadOptions, DownloadRequest, ExtractOptions, PlaylistEntry, PlaylistInfo, ProgressHook,
    ProgressUpdate,
};
pub use orchestrator::Downloader;
pub use traits::MediaEngine;
pub use ytdlp::YtDlpEngine;
