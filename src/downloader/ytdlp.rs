// yt-dlp engine - runs the native `yt-dlp` binary as a subprocess

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use super::errors::DownloadError;
use super::models::{DownloadOptions, ExtractOptions, PlaylistEntry, PlaylistInfo};
use super::traits::MediaEngine;
use super::utils::{self, FINISHED_MARKER};

/// Environment variable overriding the yt-dlp executable
pub const YTDLP_PATH_ENV: &str = "YTDLP_PATH";

const BINARY_NAME: &str = "yt-dlp";

/// Homebrew (Apple Silicon, Intel) and distro package locations
const INSTALL_LOCATIONS: [&str; 3] = [
    "/opt/homebrew/bin/yt-dlp",
    "/usr/local/bin/yt-dlp",
    "/usr/bin/yt-dlp",
];

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Engine backed by the yt-dlp binary
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    ytdlp_path: PathBuf,
    extract_timeout: Duration,
}

impl YtDlpEngine {
    pub fn new(ytdlp_path: impl Into<PathBuf>, extract_timeout: Duration) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            extract_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// `$YTDLP_PATH`, else a known install location, else the bare name for a
    /// PATH lookup at spawn time (a miss there surfaces as `ToolNotFound`)
    pub fn locate() -> PathBuf {
        resolve_binary(std::env::var_os(YTDLP_PATH_ENV), &INSTALL_LOCATIONS)
    }

    /// Installed yt-dlp version, if the binary runs
    pub fn version(&self) -> Option<String> {
        match StdCommand::new(&self.ytdlp_path).arg("--version").output() {
            Ok(output) if output.status.success() => {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            }
            _ => None,
        }
    }

    pub fn build_download_args(url: &str, options: &DownloadOptions) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            options.format.clone(),
            "--output".to_string(),
            options.output_template.clone(),
            "--newline".to_string(),
            // Reports the final path after merging/moving; implies --quiet
            "--print".to_string(),
            format!("after_move:{} %(filepath)s", FINISHED_MARKER),
        ];

        if options.quiet {
            args.push("--no-warnings".to_string());
        } else {
            args.push("--progress".to_string());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    pub fn build_extract_args(url: &str, options: &ExtractOptions) -> Vec<String> {
        let mut args = vec!["--dump-single-json".to_string(), "--no-warnings".to_string()];

        if options.extract_flat {
            args.push("--flat-playlist".to_string());
        }
        if options.quiet {
            args.push("--quiet".to_string());
        }

        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

fn resolve_binary<P: AsRef<Path>>(override_path: Option<OsString>, locations: &[P]) -> PathBuf {
    if let Some(path) = override_path.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    locations
        .iter()
        .map(|path| path.as_ref())
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(BINARY_NAME))
}

#[async_trait]
impl MediaEngine for YtDlpEngine {
    fn name(&self) -> &'static str {
        BINARY_NAME
    }

    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<(), DownloadError> {
        let args = Self::build_download_args(url, options);
        tracing::debug!(binary = %self.ytdlp_path.display(), ?args, "spawning yt-dlp download");

        let mut child = TokioCommand::new(&self.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| utils::spawn_error(&self.ytdlp_path, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stdout".to_string()))?;
        let mut stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::ExecutionError("Failed to capture stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        // Paths and titles arrive in the locale encoding, not necessarily UTF-8
        let mut lines = BufReader::new(stdout).split(b'\n');
        while let Some(raw) = lines
            .next_segment()
            .await
            .map_err(|e| DownloadError::io("reading yt-dlp output", e))?
        {
            let line = String::from_utf8_lossy(&raw);
            if let Some(update) = utils::parse_output_line(&line) {
                options.report(&update);
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| DownloadError::io("waiting for yt-dlp", e))?;
        let stderr = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(DownloadError::from(utils::stderr_summary(&stderr)))
        }
    }

    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<PlaylistInfo, DownloadError> {
        let args = Self::build_extract_args(url, options);
        tracing::debug!(binary = %self.ytdlp_path.display(), ?args, "spawning yt-dlp extraction");

        let output =
            utils::run_output_with_timeout(&self.ytdlp_path, &args, self.extract_timeout.as_secs())
                .await?;

        if !output.status.success() {
            return Err(DownloadError::from(utils::stderr_summary(&output.stderr)));
        }

        parse_playlist_json(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct RawPlaylist {
    title: Option<String>,
    #[serde(default)]
    entries: Option<Vec<RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: Option<String>,
    url: Option<String>,
    title: Option<String>,
}

/// Parse `--dump-single-json` output into playlist entries
pub fn parse_playlist_json(stdout: &[u8]) -> Result<PlaylistInfo, DownloadError> {
    let raw: RawPlaylist = serde_json::from_slice(stdout)
        .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))?;

    let mut entries = Vec::new();
    for entry in raw.entries.unwrap_or_default() {
        let url = match (entry.url, entry.id) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(id)) if !id.is_empty() => format!("{}{}", WATCH_URL_PREFIX, id),
            _ => {
                tracing::warn!(title = ?entry.title, "skipping playlist entry without url or id");
                continue;
            }
        };
        entries.push(PlaylistEntry::new(url, entry.title));
    }

    Ok(PlaylistInfo {
        title: raw.title,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{ProgressUpdate, NO_TITLE};
    use std::sync::{Arc, Mutex};

    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_resolve_binary_prefers_override() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("yt-dlp");
        std::fs::write(&installed, "").unwrap();

        let path = resolve_binary(Some(OsString::from("/custom/yt-dlp")), &[&installed]);
        assert_eq!(path, PathBuf::from("/custom/yt-dlp"));
    }

    #[test]
    fn test_resolve_binary_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let installed = dir.path().join("yt-dlp");
        std::fs::write(&installed, "").unwrap();

        // Empty override counts as unset
        let path = resolve_binary(Some(OsString::new()), &[&missing, &installed]);
        assert_eq!(path, installed);

        let path = resolve_binary(None, &[&missing]);
        assert_eq!(path, PathBuf::from("yt-dlp"));
    }

    #[test]
    fn test_download_args() {
        let options = DownloadOptions::new(
            "bestvideo[height<=720]+bestaudio/best[height<=720]",
            "/tmp/videos/%(title)s.%(ext)s",
        );
        let args = YtDlpEngine::build_download_args("https://youtu.be/abc", &options);

        assert_eq!(args[0], "--format");
        assert_eq!(args[1], "bestvideo[height<=720]+bestaudio/best[height<=720]");
        assert_eq!(args[2], "--output");
        assert_eq!(args[3], "/tmp/videos/%(title)s.%(ext)s");
        assert!(args.contains(&"after_move:[finished] %(filepath)s".to_string()));
        assert!(args.contains(&"--no-warnings".to_string()));
        assert!(!args.contains(&"--progress".to_string()));
        assert_eq!(args[args.len() - 2..], ["--", "https://youtu.be/abc"]);
    }

    #[test]
    fn test_download_args_not_quiet() {
        let options = DownloadOptions::new("best", "%(title)s.%(ext)s").with_quiet(false);
        let args = YtDlpEngine::build_download_args("https://youtu.be/abc", &options);
        assert!(args.contains(&"--progress".to_string()));
        assert!(!args.contains(&"--no-warnings".to_string()));
    }

    #[test]
    fn test_extract_args() {
        let args = YtDlpEngine::build_extract_args(
            "https://www.youtube.com/playlist?list=PL1",
            &ExtractOptions::default(),
        );
        assert_eq!(
            args,
            vec![
                "--dump-single-json",
                "--no-warnings",
                "--flat-playlist",
                "--quiet",
                "--",
                "https://www.youtube.com/playlist?list=PL1",
            ]
        );
    }

    #[test]
    fn test_parse_flat_playlist() {
        let json = br#"{
            "_type": "playlist",
            "title": "Lectures",
            "entries": [
                {"_type": "url", "id": "a1", "url": "https://www.youtube.com/watch?v=a1", "title": "One"},
                {"_type": "url", "id": "b2", "url": null, "title": null},
                {"_type": "url", "title": "Broken"},
                {"_type": "url", "id": "c3", "url": "https://www.youtube.com/watch?v=c3", "title": "Three"}
            ]
        }"#;

        let info = parse_playlist_json(json).unwrap();
        assert_eq!(info.title.as_deref(), Some("Lectures"));
        assert_eq!(info.entries.len(), 3);
        assert_eq!(info.entries[0].title, "One");
        assert_eq!(info.entries[1].url, "https://www.youtube.com/watch?v=b2");
        assert_eq!(info.entries[1].title, NO_TITLE);
        assert_eq!(info.entries[2].url, "https://www.youtube.com/watch?v=c3");
    }

    #[test]
    fn test_parse_single_video_has_no_entries() {
        let json = br#"{"_type": "video", "id": "abc", "title": "Just one"}"#;
        let info = parse_playlist_json(json).unwrap();
        assert!(info.entries.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_playlist_json(b"not json").unwrap_err();
        assert!(matches!(err, DownloadError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let engine = YtDlpEngine::new("/nonexistent/bin/yt-dlp", Duration::from_secs(5));
        let err = engine
            .extract_info("https://youtu.be/abc", &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::ToolNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_tolerates_non_utf8_output() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ytdlp(dir.path(), "printf '[finished] /tmp/caf\\351.mp4\\n'\nexit 0");
        let engine = YtDlpEngine::new(binary, Duration::from_secs(5));

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = DownloadOptions::new("best", "%(title)s.%(ext)s").with_progress_hook(Arc::new(
            move |update: &ProgressUpdate| sink.lock().unwrap().push(update.clone()),
        ));

        engine.download("https://youtu.be/abc", &options).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        match &seen[0] {
            ProgressUpdate::Finished { filename } => {
                let name = filename.to_string_lossy();
                assert!(name.starts_with("/tmp/caf"));
                assert!(name.ends_with(".mp4"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_failure_uses_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let binary = fake_ytdlp(
            dir.path(),
            "echo 'ERROR: [youtube] abc: HTTP Error 429: Too Many Requests' >&2\nexit 1",
        );
        let engine = YtDlpEngine::new(binary, Duration::from_secs(5));
        let options = DownloadOptions::new("best", "%(title)s.%(ext)s");

        let err = engine.download("https://youtu.be/abc", &options).await.unwrap_err();
        assert!(matches!(err, DownloadError::BlockedByYouTube));
    }
}
