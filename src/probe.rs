//! Advisory `--list-formats` check run before a download.
//!
//! The result only ends up in the log. It never changes the command that is
//! eventually run and never fails the download.

use crate::error::{AppError, Result};
use crate::model::{Quality, UiEvent};
use std::{process::Stdio, time::Duration};
use tokio::{process::Command, sync::mpsc::UnboundedSender, time::timeout};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub url: String,
    pub quality: Quality,
    /// Selector the download will use, echoed to the log
    pub format_selector: String,
    pub timeout: Duration,
}

/// What the listing says about the requested height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFinding {
    /// First listing line mentioning the height
    Found(String),
    NotFound,
    /// best/worst: nothing to look for
    NotApplicable,
}

pub fn assess_listing(listing: &str, quality: Quality) -> ProbeFinding {
    let Some(height) = quality.height() else {
        return ProbeFinding::NotApplicable;
    };
    let needle = format!("{height}p");
    listing
        .lines()
        .find(|line| line.contains(&needle))
        .map(|line| ProbeFinding::Found(line.trim().to_string()))
        .unwrap_or(ProbeFinding::NotFound)
}

pub async fn check_available_formats(
    program: &str,
    request: &ProbeRequest,
    events: &UnboundedSender<UiEvent>,
) {
    let log = |line: String| {
        let _ = events.send(UiEvent::Log(line));
    };

    log("Checking available formats...".to_string());
    let listing = match list_formats(program, &request.url, request.timeout).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return,
        Err(err) => {
            log(format!("Could not check formats: {err}"));
            return;
        }
    };

    match assess_listing(&listing, request.quality) {
        ProbeFinding::Found(line) => log(format!("✓ Found {}: {line}", request.quality)),
        ProbeFinding::NotFound => log(format!(
            "⚠ Exact quality {} not available, will use best alternative",
            request.quality
        )),
        ProbeFinding::NotApplicable => {}
    }
    log(format!("Will use format string: {}", request.format_selector));
}

/// Listing on success, `None` when the tool ran but reported failure.
async fn list_formats(program: &str, url: &str, limit: Duration) -> Result<Option<String>> {
    let output = Command::new(program)
        .args(["--list-formats", url])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = timeout(limit, output)
        .await
        .map_err(|_| AppError::Timeout { program: program.to_string(), timeout: limit })?
        .map_err(|source| AppError::Spawn { program: program.to_string(), source })?;

    if !output.status.success() {
        debug!(status = %output.status, "format listing failed");
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    const LISTING: &str = "\
ID  EXT   RESOLUTION FPS | FILESIZE
140 m4a   audio only     |  3.27MiB
136 mp4   1280x720    30 |  9.10MiB 720p
137 mp4   1920x1080   30 | 17.40MiB 1080p";

    #[test]
    fn finds_requested_height() {
        assert_eq!(
            assess_listing(LISTING, Quality::P1080),
            ProbeFinding::Found("137 mp4   1920x1080   30 | 17.40MiB 1080p".to_string())
        );
    }

    #[test]
    fn missing_height_is_reported() {
        assert_eq!(assess_listing(LISTING, Quality::P2160), ProbeFinding::NotFound);
        assert_eq!(assess_listing(LISTING, Quality::Best), ProbeFinding::NotApplicable);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_listing_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("slow-tool");
        std::fs::write(&tool, "#!/bin/sh\nexec sleep 30\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let (tx, mut rx) = unbounded_channel();
        let request = ProbeRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            quality: Quality::P720,
            format_selector: "best[height<=720]/best".to_string(),
            timeout: Duration::from_millis(100),
        };
        let started = std::time::Instant::now();
        check_available_formats(tool.to_str().unwrap(), &request, &tx).await;
        assert!(started.elapsed() < Duration::from_secs(5));

        let mut lines = Vec::new();
        while let Ok(UiEvent::Log(line)) = rx.try_recv() {
            lines.push(line);
        }
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("Could not check formats:"));
        assert!(lines[1].contains("did not finish within"));
    }

    #[tokio::test]
    async fn unreachable_tool_only_logs() {
        let (tx, mut rx) = unbounded_channel();
        let request = ProbeRequest {
            url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
            quality: Quality::P720,
            format_selector: "best[height<=720]/best".to_string(),
            timeout: Duration::from_secs(5),
        };
        check_available_formats("vidfetch-no-such-tool", &request, &tx).await;

        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                UiEvent::Log(line) => lines.push(line),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(lines[0], "Checking available formats...");
        assert!(lines[1].starts_with("Could not check formats:"));
    }
}
