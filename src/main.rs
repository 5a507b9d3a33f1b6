//! Desktop front end for the yt-dlp video downloader

// Startup dependency check and install
mod bootstrap;
// Argument vector for the external downloader
mod command;
// Fixed invocation settings
mod config;
// Busy gate, run state and log sink
mod controller;
// Child process spawning and output streaming
mod downloader;
mod error;
mod logging;
// Session state, enums and worker events
mod model;
// Advisory format listing before a download
mod probe;
// Progress parsing utilities
mod progress;
// Thumbnail fetching
mod thumbnail;
// URL and destination checks
mod validate;

use anyhow::{Context, anyhow};
use config::Settings;
use controller::Controller;
use downloader::RuntimeLauncher;
use eframe::{App, Frame, egui};
use egui::{ColorImage, TextureHandle, TextureOptions, Visuals};
use model::{Notice, NoticeLevel, OutputFormat, Quality, RunPhase};
use once_cell::sync::OnceCell;
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::runtime::Runtime;
use tracing::{info, warn};

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

/// Program entry point: initializes logging and the runtime, then launches the GUI
fn main() -> anyhow::Result<()> {
    logging::init_tracing();

    let rt = Arc::new(Runtime::new().context("failed to start the async runtime")?);
    let handle = rt.handle().clone();
    RUNTIME
        .set(rt)
        .map_err(|_| anyhow!("runtime already initialized"))?;

    let controller = Controller::new(RuntimeLauncher::new(handle.clone()), Settings::default());
    // Dependency check runs in the background; the window opens right away
    handle.spawn(bootstrap::ensure_tool(
        controller.settings().clone(),
        controller.events(),
    ));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    info!("opening window");
    eframe::run_native(
        "YouTube Video Downloader",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(DownloaderApp::new(controller))
        }),
    )
    .map_err(|err| anyhow!("GUI error: {err}"))
}

/// Application state for the GUI
struct DownloaderApp {
    controller: Controller<RuntimeLauncher>,
    /// Preview of the video being downloaded (video_id, texture)
    thumbnail: Option<(String, TextureHandle)>,
}

impl DownloaderApp {
    fn new(controller: Controller<RuntimeLauncher>) -> Self {
        Self { controller, thumbnail: None }
    }

    fn trigger_download(&mut self) {
        match self.controller.start_download() {
            Ok(trigger) => info!(?trigger, "download button"),
            Err(err) => {
                warn!("rejected download: {err}");
                let title = if err.is_validation() { "Invalid input" } else { "Error" };
                show_notice(&Notice::error(title, err.to_string()));
            }
        }
    }

    fn form(&mut self, ui: &mut egui::Ui) {
        let busy = self.controller.is_busy();
        let session = &mut self.controller.session;

        ui.label("YouTube URL:");
        ui.add(
            egui::TextEdit::singleline(&mut session.url)
                .hint_text("https://www.youtube.com/watch?v=...")
                .desired_width(f32::INFINITY),
        );
        ui.add_space(10.0);

        ui.label("Download Path:");
        ui.horizontal(|ui| {
            ui.add(egui::TextEdit::singleline(&mut session.destination).desired_width(600.0));
            if ui.button("Browse").clicked() {
                if let Some(folder) = FileDialog::new()
                    .set_directory(Path::new(&session.destination))
                    .pick_folder()
                {
                    session.destination = folder.display().to_string();
                }
            }
        });
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            ui.label("Quality:");
            egui::ComboBox::from_id_source("quality")
                .selected_text(session.quality.label())
                .show_ui(ui, |ui| {
                    for q in Quality::ALL {
                        ui.selectable_value(&mut session.quality, q, q.label());
                    }
                });

            ui.add_space(20.0);
            ui.label("Format:");
            egui::ComboBox::from_id_source("format")
                .selected_text(session.format.extension())
                .show_ui(ui, |ui| {
                    for f in OutputFormat::ALL {
                        ui.selectable_value(&mut session.format, f, f.extension());
                    }
                });
        });
        ui.add_space(15.0);

        let label = if busy { "Downloading..." } else { "Download Video" };
        let button = egui::Button::new(label).min_size(egui::vec2(ui.available_width(), 36.0));
        if ui.add_enabled(!busy, button).clicked() {
            self.trigger_download();
        }
    }

    fn status(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.controller.is_busy() {
                match self.controller.progress() {
                    Some(fraction) => {
                        ui.add(egui::ProgressBar::new(fraction).desired_width(200.0));
                    }
                    None => {
                        ui.add(egui::Spinner::new());
                    }
                }
            }
            let status = egui::RichText::new(self.controller.status());
            let status = match self.controller.phase() {
                RunPhase::Succeeded => status.color(egui::Color32::LIGHT_GREEN),
                RunPhase::Failed => status.color(egui::Color32::LIGHT_RED),
                RunPhase::Idle | RunPhase::Running => status,
            };
            ui.label(status);
        });
    }

    fn log(&self, ui: &mut egui::Ui) {
        ui.label("Download Log:");
        egui::ScrollArea::vertical()
            .auto_shrink([false; 2])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in self.controller.log_lines() {
                    ui.monospace(line);
                }
            });
    }
}

/// GUI update loop: applies worker events, then redraws
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        self.controller.poll();

        if let Some((video_id, image)) = self.controller.take_thumbnail() {
            let image = ColorImage::from_rgba_unmultiplied(image.size, &image.rgba);
            let texture = ctx.load_texture(&video_id, image, TextureOptions::default());
            self.thumbnail = Some((video_id, texture));
        }

        while let Some(notice) = self.controller.take_notice() {
            show_notice(&notice);
            self.controller.acknowledge();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("YouTube Video Downloader");
            ui.add_space(20.0);

            ui.horizontal_top(|ui| {
                ui.vertical(|ui| {
                    ui.set_max_width(560.0);
                    self.form(ui);
                });
                if let Some((_, texture)) = &self.thumbnail {
                    ui.add(egui::Image::new(texture).max_width(200.0));
                }
            });

            ui.add_space(10.0);
            self.status(ui);
            ui.separator();
            self.log(ui);
        });

        // Request periodic repaint so worker events show up promptly
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Native blocking dialog
fn show_notice(notice: &Notice) {
    let level = match notice.level {
        NoticeLevel::Info => MessageLevel::Info,
        NoticeLevel::Error => MessageLevel::Error,
    };
    MessageDialog::new()
        .set_level(level)
        .set_title(notice.title.as_str())
        .set_description(notice.message.as_str())
        .set_buttons(MessageButtons::Ok)
        .show();
}
