//! UI-thread state: the busy gate, the run state machine, the log sink and
//! pending dialogs. Background work only talks to it through `UiEvent`s.

use crate::command::{build_args, format_selector};
use crate::config::Settings;
use crate::downloader::DownloadJob;
use crate::error::Result;
use crate::model::{Notice, Outcome, RunPhase, SessionState, Thumbnail, UiEvent};
use crate::probe::ProbeRequest;
use crate::progress::parse_progress;
use crate::validate::{validate_request, video_id};
use std::collections::VecDeque;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

/// Lines kept in the log view.
pub const LOG_CAPACITY: usize = 2_000;

pub const STATUS_READY: &str = "Ready to download";
pub const STATUS_STARTING: &str = "Starting download...";
pub const STATUS_SUCCEEDED: &str = "Download completed successfully!";
pub const STATUS_FAILED: &str = "Download failed!";

/// Starts background work on behalf of the controller.
pub trait Launcher {
    /// Runs the job off the UI thread; must send exactly one
    /// `UiEvent::DownloadFinished` when done.
    fn launch(&self, job: DownloadJob, events: UnboundedSender<UiEvent>);

    /// Fetches a preview image; may send `UiEvent::Thumbnail`.
    fn preview(&self, video_id: String, events: UnboundedSender<UiEvent>);
}

/// Result of pressing the download button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Started,
    /// A download is already running
    Ignored,
}

pub struct Controller<L: Launcher> {
    pub session: SessionState,
    settings: Settings,
    launcher: L,
    events_tx: UnboundedSender<UiEvent>,
    events_rx: UnboundedReceiver<UiEvent>,
    phase: RunPhase,
    status: String,
    progress: Option<f32>,
    log: VecDeque<String>,
    notices: VecDeque<Notice>,
    thumbnail: Option<(String, Thumbnail)>,
}

impl<L: Launcher> Controller<L> {
    pub fn new(launcher: L, settings: Settings) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            session: SessionState::default(),
            settings,
            launcher,
            events_tx,
            events_rx,
            phase: RunPhase::Idle,
            status: STATUS_READY.to_string(),
            progress: None,
            log: VecDeque::new(),
            notices: VecDeque::new(),
            thumbnail: None,
        }
    }

    /// Sender for other background work (bootstrap) reporting to the UI.
    pub fn events(&self) -> UnboundedSender<UiEvent> {
        self.events_tx.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validates the form and launches a download. Validation errors leave
    /// every piece of state untouched.
    pub fn start_download(&mut self) -> Result<Trigger> {
        if self.session.downloading {
            info!("download already running, ignoring trigger");
            return Ok(Trigger::Ignored);
        }

        let request = validate_request(&self.session)?;
        let selector = format_selector(request.quality, request.format, &self.settings);

        self.push_log(format!("Starting download: {}", request.url));
        self.push_log(format!("Selected quality: {}", request.quality));
        self.push_log(format!("Selected format: {}", request.format));
        self.push_log(format!("Format string: {selector}"));

        let probe = self.settings.probe_formats.then(|| ProbeRequest {
            url: request.url.clone(),
            quality: request.quality,
            format_selector: selector,
            timeout: self.settings.probe_timeout,
        });
        let job = DownloadJob {
            program: self.settings.program.clone(),
            args: build_args(&request, &self.settings),
            probe,
        };

        self.session.downloading = true;
        self.phase = RunPhase::Running;
        self.status = STATUS_STARTING.to_string();
        self.progress = None;
        info!(url = %request.url, destination = %request.destination.display(), "download started");

        self.launcher.launch(job, self.events_tx.clone());
        if let Some(id) = video_id(&request.url) {
            self.launcher.preview(id, self.events_tx.clone());
        }
        Ok(Trigger::Started)
    }

    /// Applies every queued event. Returns true when something changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            changed = true;
        }
        changed
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(line) => {
                if self.phase == RunPhase::Running {
                    if let Some(fraction) = parse_progress(&line) {
                        self.progress = Some(fraction);
                        self.status = format!("Downloading... {:.0}%", fraction * 100.0);
                    }
                }
                self.push_log(line);
            }
            UiEvent::DownloadFinished(outcome) => self.finalize(outcome),
            UiEvent::DependencyMissing(message) => {
                self.notices.push_back(Notice::error("Dependency Error", message));
            }
            UiEvent::Thumbnail { video_id, image } => self.thumbnail = Some((video_id, image)),
        }
    }

    fn finalize(&mut self, outcome: Outcome) {
        if self.phase != RunPhase::Running {
            warn!(?outcome, "completion without a running download, ignoring");
            return;
        }
        self.session.downloading = false;
        self.progress = None;

        match outcome {
            Outcome::Succeeded => {
                self.phase = RunPhase::Succeeded;
                self.status = STATUS_SUCCEEDED.to_string();
                self.push_log("✓ Download completed successfully!".to_string());
                self.notices.push_back(Notice::info("Success", "Video downloaded successfully!"));
            }
            Outcome::Exited(code) => {
                self.phase = RunPhase::Failed;
                self.status = STATUS_FAILED.to_string();
                let code = code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                self.push_log(format!("✗ Download failed! (exit: {code})"));
                self.notices.push_back(Notice::error(
                    "Error",
                    "Download failed. Check the log for details.",
                ));
            }
            Outcome::Errored(message) => {
                self.phase = RunPhase::Failed;
                self.status = STATUS_FAILED.to_string();
                self.push_log(format!("✗ Error: {message}"));
                self.notices.push_back(Notice::error("Error", format!("An error occurred: {message}")));
            }
        }
    }

    /// Called once the user has dismissed the dialog; terminal phases
    /// return to idle.
    pub fn acknowledge(&mut self) {
        if matches!(self.phase, RunPhase::Succeeded | RunPhase::Failed) {
            self.phase = RunPhase::Idle;
            self.status = STATUS_READY.to_string();
        }
    }

    fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }

    /// Oldest dialog not yet shown.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    pub fn take_thumbnail(&mut self) -> Option<(String, Thumbnail)> {
        self.thumbnail.take()
    }

    pub fn is_busy(&self) -> bool {
        self.session.downloading
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> Option<f32> {
        self.progress
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }
}
