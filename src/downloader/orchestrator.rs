// Orchestrator - single downloads, playlist extraction, sequential batches

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use super::errors::DownloadError;
use super::models::{
    DownloadOptions, DownloadRequest, ExtractOptions, PlaylistEntry, ProgressHook, ProgressUpdate,
};
use super::traits::MediaEngine;

pub struct Downloader<E: MediaEngine> {
    engine: E,
}

impl<E: MediaEngine> Downloader<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Download one video into `download_dir`, creating the directory first
    pub async fn download_video(
        &self,
        url: &str,
        format_selector: &str,
        download_dir: &Path,
    ) -> Result<(), DownloadError> {
        let request = DownloadRequest::new(url, format_selector, download_dir);

        if let Err(e) = std::fs::create_dir_all(&request.download_dir) {
            let err = DownloadError::io(
                format!("creating {}", request.download_dir.display()),
                e,
            );
            tracing::error!(url, error = %err, "Failed to download video");
            return Err(err);
        }

        let options = DownloadOptions::new(&request.format_selector, request.output_template())
            .with_quiet(true)
            .with_progress_hook(log_progress_hook());

        tracing::debug!(engine = self.engine.name(), ?request, "starting download");

        match self.engine.download(&request.url, &options).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(url, error = %e, "Failed to download video");
                Err(e)
            }
        }
    }

    /// List playlist members without resolving their streams
    pub async fn fetch_playlist_entries(&self, url: &str) -> Result<Vec<PlaylistEntry>, DownloadError> {
        let options = ExtractOptions {
            quiet: true,
            extract_flat: true,
        };

        match self.engine.extract_info(url, &options).await {
            Ok(info) => {
                tracing::info!(
                    url,
                    title = info.title.as_deref().unwrap_or(""),
                    entries = info.entries.len(),
                    "Fetched playlist"
                );
                if info.entries.is_empty() {
                    tracing::warn!(url, "playlist has no entries");
                }
                Ok(info.entries)
            }
            Err(e) => {
                tracing::error!(url, error = %e, "Failed to fetch playlist");
                Err(e)
            }
        }
    }

    /// Download entries one after another; the first failure aborts the batch
    pub async fn download_many(
        &self,
        entries: &[PlaylistEntry],
        format_selector: &str,
        download_dir: &Path,
    ) -> Result<(), DownloadError> {
        let bar = ProgressBar::new(entries.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{prefix} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix("Downloading");

        for entry in entries {
            bar.set_message(entry.title.clone());
            if let Err(e) = self.download_video(&entry.url, format_selector, download_dir).await {
                bar.abandon();
                return Err(e);
            }
            bar.inc(1);
        }

        bar.finish();
        Ok(())
    }
}

/// Logs the final file path once the engine reports it
fn log_progress_hook() -> ProgressHook {
    Arc::new(|update: &ProgressUpdate| match update {
        ProgressUpdate::Finished { filename } => {
            tracing::info!("Downloaded: {}", filename.display());
        }
        ProgressUpdate::Downloading { status, .. } => tracing::trace!("{}", status),
        other => tracing::debug!(?other, "download progress"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::downloader::models::PlaylistInfo;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedDownload {
        pub url: String,
        pub format: String,
        pub output_template: String,
        pub dir_existed: bool,
    }

    /// In-memory engine recording every call
    #[derive(Default)]
    pub struct FakeEngine {
        pub downloads: Mutex<Vec<RecordedDownload>>,
        pub playlist: PlaylistInfo,
        pub fail_on: Option<String>,
        pub fail_extract: bool,
        pub finished: Mutex<Vec<PathBuf>>,
    }

    impl FakeEngine {
        pub fn with_entries(entries: Vec<PlaylistEntry>) -> Self {
            Self {
                playlist: PlaylistInfo {
                    title: Some("Playlist".to_string()),
                    entries,
                },
                ..Default::default()
            }
        }

        pub fn download_urls(&self) -> Vec<String> {
            self.downloads
                .lock()
                .unwrap()
                .iter()
                .map(|d| d.url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl MediaEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn download(&self, url: &str, options: &DownloadOptions) -> Result<(), DownloadError> {
            let template = PathBuf::from(&options.output_template);
            let dir_existed = template.parent().map_or(false, |p| p.is_dir());
            self.downloads.lock().unwrap().push(RecordedDownload {
                url: url.to_string(),
                format: options.format.clone(),
                output_template: options.output_template.clone(),
                dir_existed,
            });

            if self.fail_on.as_deref() == Some(url) {
                return Err(DownloadError::ExecutionError(format!("boom: {}", url)));
            }

            let filename = template.with_file_name("video.mp4");
            self.finished.lock().unwrap().push(filename.clone());
            options.report(&ProgressUpdate::Finished { filename });
            Ok(())
        }

        async fn extract_info(
            &self,
            _url: &str,
            options: &ExtractOptions,
        ) -> Result<PlaylistInfo, DownloadError> {
            assert!(options.extract_flat);
            if self.fail_extract {
                return Err(DownloadError::NetworkTimeout);
            }
            Ok(self.playlist.clone())
        }
    }

    pub fn entries(n: usize) -> Vec<PlaylistEntry> {
        (1..=n)
            .map(|i| PlaylistEntry::new(format!("https://youtu.be/v{}", i), Some(format!("Video {}", i))))
            .collect()
    }

    #[tokio::test]
    async fn test_download_video_creates_directory_first() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("videos");
        let downloader = Downloader::new(FakeEngine::default());

        downloader
            .download_video("https://youtu.be/abc", "bestvideo+bestaudio/best", &dir)
            .await
            .unwrap();

        assert!(dir.is_dir());
        let calls = downloader.engine().downloads.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].dir_existed);
        assert_eq!(calls[0].format, "bestvideo+bestaudio/best");
        assert_eq!(
            PathBuf::from(&calls[0].output_template),
            dir.join("%(title)s.%(ext)s")
        );
    }

    #[tokio::test]
    async fn test_download_video_logs_finished_path() {
        let (logs, _guard) = crate::config::log_capture::capture();
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(FakeEngine::default());

        downloader
            .download_video("https://youtu.be/abc", "best", tmp.path())
            .await
            .unwrap();

        let expected = format!("Downloaded: {}", tmp.path().join("video.mp4").display());
        let logs = logs.contents();
        assert!(logs.contains(&expected), "missing {:?} in {}", expected, logs);
    }

    #[tokio::test]
    async fn test_download_video_propagates_engine_error() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            fail_on: Some("https://youtu.be/bad".to_string()),
            ..Default::default()
        };
        let downloader = Downloader::new(engine);

        let err = downloader
            .download_video("https://youtu.be/bad", "best", tmp.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_download_video_fails_when_directory_cannot_be_created() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();
        let downloader = Downloader::new(FakeEngine::default());

        let err = downloader
            .download_video("https://youtu.be/abc", "best", &file.join("sub"))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Io { .. }));
        assert!(downloader.engine().downloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_playlist_entries() {
        let downloader = Downloader::new(FakeEngine::with_entries(entries(3)));
        let fetched = downloader
            .fetch_playlist_entries("https://www.youtube.com/playlist?list=PL1")
            .await
            .unwrap();
        assert_eq!(fetched, entries(3));
    }

    #[tokio::test]
    async fn test_fetch_playlist_entries_propagates_error() {
        let engine = FakeEngine {
            fail_extract: true,
            ..Default::default()
        };
        let downloader = Downloader::new(engine);
        let err = downloader
            .fetch_playlist_entries("https://www.youtube.com/playlist?list=PL1")
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::NetworkTimeout));
    }

    #[tokio::test]
    async fn test_download_many_is_sequential_and_ordered() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(FakeEngine::default());
        let list = entries(3);

        downloader
            .download_many(&[list[2].clone(), list[0].clone()], "best", tmp.path())
            .await
            .unwrap();

        assert_eq!(
            downloader.engine().download_urls(),
            vec!["https://youtu.be/v3", "https://youtu.be/v1"]
        );
        assert_eq!(downloader.engine().finished.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_download_many_aborts_on_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = FakeEngine {
            fail_on: Some("https://youtu.be/v2".to_string()),
            ..Default::default()
        };
        let downloader = Downloader::new(engine);

        let result = downloader.download_many(&entries(3), "best", tmp.path()).await;

        assert!(result.is_err());
        assert_eq!(
            downloader.engine().download_urls(),
            vec!["https://youtu.be/v1", "https://youtu.be/v2"]
        );
    }

    #[tokio::test]
    async fn test_download_many_with_nothing_selected() {
        let tmp = tempfile::tempdir().unwrap();
        let downloader = Downloader::new(FakeEngine::default());
        downloader.download_many(&[], "best", tmp.path()).await.unwrap();
        assert!(downloader.engine().download_urls().is_empty());
    }
}
