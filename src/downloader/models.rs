// Common data models for downloader

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Title used when the engine reports an entry without one
pub const NO_TITLE: &str = "No Title";

/// Output filename template understood by yt-dlp
pub const OUTPUT_FILENAME_TEMPLATE: &str = "%(title)s.%(ext)s";

/// One item of a flat playlist extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub url: String,
    pub title: String,
}

impl PlaylistEntry {
    pub fn new(url: impl Into<String>, title: Option<String>) -> Self {
        Self {
            url: url.into(),
            title: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| NO_TITLE.to_string()),
        }
    }
}

/// Playlist membership without per-entry stream metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    pub title: Option<String>,
    pub entries: Vec<PlaylistEntry>,
}

/// A single download call: what to fetch, in which format, and where to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub format_selector: String,
    pub download_dir: PathBuf,
}

impl DownloadRequest {
    pub fn new(url: &str, format_selector: &str, download_dir: &Path) -> Self {
        Self {
            url: url.to_string(),
            format_selector: format_selector.to_string(),
            download_dir: download_dir.to_path_buf(),
        }
    }

    /// `<download_dir>/%(title)s.%(ext)s`
    pub fn output_template(&self) -> String {
        self.download_dir
            .join(OUTPUT_FILENAME_TEMPLATE)
            .to_string_lossy()
            .to_string()
    }
}

/// Status transitions reported while a download runs
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// yt-dlp picked a destination file and started transferring
    Started { filename: PathBuf },
    Downloading { percent: f32, status: String },
    /// Video and audio streams are being merged into one container
    Merging,
    AlreadyDownloaded,
    /// The final file is in place
    Finished { filename: PathBuf },
}

/// Synchronous progress callback, invoked from inside the blocking download
pub type ProgressHook = Arc<dyn Fn(&ProgressUpdate) + Send + Sync>;

/// Options for a single engine download
#[derive(Clone)]
pub struct DownloadOptions {
    pub format: String,
    pub output_template: String,
    pub quiet: bool,
    pub progress_hook: Option<ProgressHook>,
}

impl DownloadOptions {
    pub fn new(format: impl Into<String>, output_template: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            output_template: output_template.into(),
            quiet: true,
            progress_hook: None,
        }
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_progress_hook(mut self, hook: ProgressHook) -> Self {
        self.progress_hook = Some(hook);
        self
    }

    pub fn report(&self, update: &ProgressUpdate) {
        if let Some(hook) = &self.progress_hook {
            hook(update);
        }
    }
}

impl fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("format", &self.format)
            .field("output_template", &self.output_template)
            .field("quiet", &self.quiet)
            .field("progress_hook", &self.progress_hook.is_some())
            .finish()
    }
}

/// Options for metadata extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub quiet: bool,
    /// List playlist members without resolving each entry
    pub extract_flat: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            quiet: true,
            extract_flat: true,
        }
    }
}
