use std::{io, path::PathBuf, process::ExitStatus, time::Duration};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Everything that can go wrong between the form and the external tool.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Please enter a video URL")]
    EmptyUrl,

    #[error("Please enter a valid video URL: {0}")]
    InvalidUrl(String),

    #[error("Download path does not exist: {}", .0.display())]
    MissingDestination(PathBuf),

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} did not finish within {}s", .timeout.as_secs())]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {status}")]
    ToolFailed { program: String, status: ExitStatus },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("thumbnail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("thumbnail could not be decoded: {0}")]
    Image(#[from] image::ImageError),
}

impl AppError {
    /// Input problems the user can fix in the form.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyUrl | AppError::InvalidUrl(_) | AppError::MissingDestination(_)
        )
    }
}
