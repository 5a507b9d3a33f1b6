//! Startup check that the downloader is on `PATH`, with a one-time install
//! attempt when it is not.

use crate::config::Settings;
use crate::error::{AppError, Result};
use crate::model::UiEvent;
use std::{process::Stdio, time::Duration};
use tokio::{process::Command, sync::mpsc::UnboundedSender, time::timeout};
use tracing::{info, warn};

/// Best-effort: reports through `events` and never blocks the UI.
pub async fn ensure_tool(settings: Settings, events: UnboundedSender<UiEvent>) {
    let log = |line: String| {
        let _ = events.send(UiEvent::Log(line));
    };
    let program = settings.program.as_str();

    match query_version(program, settings.version_timeout).await {
        Ok(version) => {
            info!(program, %version, "downloader available");
            log(format!("✓ {program} {version} is installed and ready"));
            return;
        }
        Err(err) => {
            warn!(program, "downloader unavailable: {err}");
            log(format!("⚠ {program} not found. Installing..."));
        }
    }

    match install(&settings.install_command, settings.install_timeout).await {
        Ok(()) => {
            info!(program, "installed");
            log(format!("✓ {program} installed successfully"));
            if let Err(err) = query_version(program, settings.version_timeout).await {
                warn!(program, "installed but not runnable: {err}");
                log(format!("⚠ {program} was installed but is still not runnable: {err}"));
                let _ = events.send(UiEvent::DependencyMissing(format!(
                    "{program} was installed but could not be run ({err}). \
                     Make sure it is on PATH or install it manually:\n{}",
                    settings.install_hint()
                )));
            }
        }
        Err(err) => {
            warn!(program, "install failed: {err}");
            let hint = settings.install_hint();
            log(format!(
                "✗ Failed to install {program}. Please install manually: {hint}"
            ));
            let _ = events.send(UiEvent::DependencyMissing(format!(
                "Could not install {program} ({err}). Please install it manually:\n{hint}"
            )));
        }
    }
}

/// First line of `<program> --version`.
pub async fn query_version(program: &str, limit: Duration) -> Result<String> {
    let output = run_with_timeout(program, &["--version".to_string()], limit).await?;
    if !output.status.success() {
        return Err(AppError::ToolFailed { program: program.to_string(), status: output.status });
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

async fn install(command: &[String], limit: Duration) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(AppError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no install command configured",
        )));
    };
    let output = run_with_timeout(program, args, limit).await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(AppError::ToolFailed { program: program.clone(), status: output.status })
    }
}

async fn run_with_timeout(
    program: &str,
    args: &[String],
    limit: Duration,
) -> Result<std::process::Output> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();
    timeout(limit, output)
        .await
        .map_err(|_| AppError::Timeout { program: program.to_string(), timeout: limit })?
        .map_err(|source| AppError::Spawn { program: program.to_string(), source })
}
