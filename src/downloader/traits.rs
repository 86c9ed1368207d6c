// Download engine trait definition

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{DownloadOptions, ExtractOptions, PlaylistInfo};

/// External extraction/download engine
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Name of the engine (for logging)
    fn name(&self) -> &'static str;

    /// Download one item, reporting status transitions through the options' hook
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<(), DownloadError>;

    /// Extract playlist membership without downloading
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<PlaylistInfo, DownloadError>;
}
