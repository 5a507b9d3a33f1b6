//! Checks the form before anything is launched.

use crate::error::{AppError, Result};
use crate::model::{DownloadRequest, SessionState};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

/// Permissive video-host pattern: optional scheme, allow-listed domains, an
/// 11-character video identifier in the last group.
static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+\?v=)?([^&=%\?]{11})",
    )
    .expect("video URL pattern is valid")
});

pub fn is_valid_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

/// Extracts the video identifier from a URL the pattern accepts.
pub fn video_id(url: &str) -> Option<String> {
    VIDEO_URL
        .captures(url.trim())
        .and_then(|caps| caps.get(6))
        .map(|m| m.as_str().to_string())
}

/// Turns the form into a request, or explains what is wrong with it.
pub fn validate_request(session: &SessionState) -> Result<DownloadRequest> {
    let url = session.url.trim();
    if url.is_empty() {
        return Err(AppError::EmptyUrl);
    }
    if !is_valid_video_url(url) {
        return Err(AppError::InvalidUrl(url.to_string()));
    }

    let destination = PathBuf::from(session.destination.trim());
    if !destination.is_dir() {
        return Err(AppError::MissingDestination(destination));
    }

    Ok(DownloadRequest {
        url: url.to_string(),
        destination,
        quality: session.quality,
        format: session.format,
    })
}
