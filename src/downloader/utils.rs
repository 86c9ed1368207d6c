// Helper functions for the yt-dlp backend

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::{timeout, Duration};

use super::errors::DownloadError;
use super::models::ProgressUpdate;

/// Prefix of the line yt-dlp prints once a file is in its final place
pub const FINISHED_MARKER: &str = "[finished]";

lazy_static::lazy_static! {
    // [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
    static ref PROGRESS_RE: Regex = Regex::new(
        r"\[download\]\s+(\d+\.?\d*)%\s+of\s+~?\s*(\d+\.?\d*\s*\w+)(?:\s+at\s+(\S+\s*\w*/s))?(?:\s+ETA\s+(\S+))?(?:\s+\(frag\s+(\d+)/(\d+)\))?"
    ).unwrap();
    static ref DEST_RE: Regex = Regex::new(r"\[download\]\s+Destination:\s+(.+)").unwrap();
    static ref MERGE_RE: Regex = Regex::new(r"\[Merger?\]\s+Merging").unwrap();
    static ref ALREADY_RE: Regex = Regex::new(r"has already been downloaded").unwrap();
    static ref FINISHED_RE: Regex = Regex::new(r"^\[finished\]\s+(.+)$").unwrap();
}

/// Parse one stdout line of a running download
pub fn parse_output_line(line: &str) -> Option<ProgressUpdate> {
    let line = line.trim_end();

    if let Some(caps) = FINISHED_RE.captures(line) {
        let filename = caps.get(1)?.as_str().trim();
        return Some(ProgressUpdate::Finished {
            filename: PathBuf::from(filename),
        });
    }

    if let Some(caps) = PROGRESS_RE.captures(line) {
        let percent: f32 = caps.get(1)?.as_str().parse().ok()?;
        let size = caps.get(2).map(|m| m.as_str()).unwrap_or("?");
        let speed = caps.get(3).map(|m| m.as_str().trim());
        let eta = caps.get(4).map(|m| m.as_str());

        let mut status = format!("{:.1}% of {}", percent, size);
        if let Some(speed) = speed {
            status.push_str(&format!(" @ {}", speed));
        }
        if let Some(eta) = eta {
            status.push_str(&format!(" ETA {}", eta));
        }
        if let (Some(fc), Some(ft)) = (caps.get(5), caps.get(6)) {
            status.push_str(&format!(" (frag {}/{})", fc.as_str(), ft.as_str()));
        }

        return Some(ProgressUpdate::Downloading { percent, status });
    }

    if let Some(caps) = DEST_RE.captures(line) {
        let filename = caps.get(1)?.as_str().trim();
        return Some(ProgressUpdate::Started {
            filename: PathBuf::from(filename),
        });
    }

    if MERGE_RE.is_match(line) {
        return Some(ProgressUpdate::Merging);
    }

    if ALREADY_RE.is_match(line) {
        return Some(ProgressUpdate::AlreadyDownloaded);
    }

    None
}

/// Keep the tail of a stderr dump, where yt-dlp puts its ERROR lines
pub fn stderr_summary(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let errors: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("ERROR"))
        .collect();

    if !errors.is_empty() {
        return errors.join("\n");
    }

    let start = lines.len().saturating_sub(5);
    lines[start..].join("\n")
}

/// Run command with timeout, collecting its whole output
pub async fn run_output_with_timeout(
    program: &Path,
    args: &[String],
    timeout_secs: u64,
) -> Result<std::process::Output, DownloadError> {
    let mut child = TokioCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stdout from {}", program.display()))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        DownloadError::ExecutionError(format!("Failed to capture stderr from {}", program.display()))
    })?;

    let stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await.map(|_| buf)
    });

    match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status_res) => {
            let status = status_res
                .map_err(|e| DownloadError::io(format!("waiting for {}", program.display()), e))?;
            let stdout = join_pipe(stdout_task, "stdout").await?;
            let stderr = join_pipe(stderr_task, "stderr").await?;
            Ok(std::process::Output { status, stdout, stderr })
        }
        Err(_) => {
            let _ = child.kill().await;
            stdout_task.abort();
            stderr_task.abort();
            Err(DownloadError::NetworkTimeout)
        }
    }
}

async fn join_pipe(
    task: tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>, DownloadError> {
    task.await
        .map_err(|e| DownloadError::ExecutionError(format!("{} task failed: {}", name, e)))?
        .map_err(|e| DownloadError::io(format!("reading {}", name), e))
}

/// Map a spawn failure, telling a missing binary apart from other I/O errors
pub fn spawn_error(program: &Path, err: std::io::Error) -> DownloadError {
    if err.kind() == std::io::ErrorKind::NotFound {
        DownloadError::ToolNotFound(program.display().to_string())
    } else {
        DownloadError::io(format!("starting {}", program.display()), err)
    }
}
