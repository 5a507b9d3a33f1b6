//! Fixed settings for the external downloader invocation.
//!
//! The program reads no config file; these defaults are the whole
//! configuration surface.

use crate::model::OutputFormat;
use std::time::Duration;

/// Browser-like user agent passed to the downloader.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Executable name resolved through `PATH`.
    pub program: String,
    /// Browser to read cookies from; `None` leaves the flag out.
    pub cookies_from_browser: Option<String>,
    pub user_agent: String,
    /// Bitrate requested for mp3 extraction.
    pub mp3_bitrate: String,
    /// Ceiling used by the "best" selector.
    pub max_height: u32,
    /// Container the downloader produces without recoding.
    pub default_container: OutputFormat,
    /// Run the advisory `--list-formats` probe before downloading.
    pub probe_formats: bool,
    pub probe_timeout: Duration,
    pub version_timeout: Duration,
    pub install_timeout: Duration,
    /// Command used to install the downloader when it is missing.
    pub install_command: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let python = if cfg!(target_os = "windows") { "python" } else { "python3" };
        Self {
            program: "yt-dlp".to_string(),
            cookies_from_browser: Some("firefox".to_string()),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            mp3_bitrate: "192K".to_string(),
            max_height: 2160,
            default_container: OutputFormat::Mp4,
            probe_formats: true,
            probe_timeout: Duration::from_secs(30),
            version_timeout: Duration::from_secs(15),
            install_timeout: Duration::from_secs(300),
            install_command: [python, "-m", "pip", "install", "yt-dlp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Settings {
    /// Human-readable install command for the manual-remediation dialog.
    pub fn install_hint(&self) -> String {
        self.install_command.join(" ")
    }
}
