use std::{fmt, path::PathBuf};

/// Requested video quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Best stream, capped at the configured ceiling
    #[default]
    Best,
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P240,
    P144,
    /// Smallest streams available
    Worst,
}

impl Quality {
    pub const ALL: [Quality; 10] = [
        Quality::Best,
        Quality::P2160,
        Quality::P1440,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
        Quality::P240,
        Quality::P144,
        Quality::Worst,
    ];

    /// Height ceiling in pixels; `None` for best/worst.
    pub fn height(self) -> Option<u32> {
        match self {
            Quality::Best | Quality::Worst => None,
            Quality::P2160 => Some(2160),
            Quality::P1440 => Some(1440),
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
            Quality::P240 => Some(240),
            Quality::P144 => Some(144),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Best => "best",
            Quality::P2160 => "2160p (4K)",
            Quality::P1440 => "1440p (2K)",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::P360 => "360p",
            Quality::P240 => "240p",
            Quality::P144 => "144p",
            Quality::Worst => "worst",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Output container or audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mkv,
    Webm,
    Avi,
    Mp3,
    M4a,
    Wav,
    Flac,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 8] = [
        OutputFormat::Mp4,
        OutputFormat::Mkv,
        OutputFormat::Webm,
        OutputFormat::Avi,
        OutputFormat::Mp3,
        OutputFormat::M4a,
        OutputFormat::Wav,
        OutputFormat::Flac,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Webm => "webm",
            OutputFormat::Avi => "avi",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Wav => "wav",
            OutputFormat::Flac => "flac",
        }
    }

    /// Audio targets are extracted rather than recoded.
    pub fn is_audio(self) -> bool {
        matches!(
            self,
            OutputFormat::Mp3 | OutputFormat::M4a | OutputFormat::Wav | OutputFormat::Flac
        )
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Form state owned by the controller.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Text of the URL field
    pub url: String,
    /// Text of the destination field
    pub destination: String,
    pub quality: Quality,
    pub format: OutputFormat,
    /// True while a download is in flight
    pub downloading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            url: String::new(),
            destination: default_download_dir().display().to_string(),
            quality: Quality::default(),
            format: OutputFormat::default(),
            downloading: false,
        }
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Validated snapshot of the form, taken when a download is triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub quality: Quality,
    pub format: OutputFormat,
}

/// Where the current or last download stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// How a single tool invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Non-zero exit code, or `None` when killed by a signal
    Exited(Option<i32>),
    /// The tool could not be run or read
    Errored(String),
}

impl Outcome {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        if status.success() {
            Outcome::Succeeded
        } else {
            Outcome::Exited(status.code())
        }
    }
}

/// Decoded RGBA thumbnail ready for upload as a texture.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

/// Messages from background work to the UI thread.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// One line for the log view
    Log(String),
    /// Sent exactly once per launched download
    DownloadFinished(Outcome),
    /// Bootstrap could neither find nor install the downloader
    DependencyMissing(String),
    Thumbnail { video_id: String, image: Thumbnail },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A blocking dialog the GUI must show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, title: title.into(), message: message.into() }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, title: title.into(), message: message.into() }
    }
}
