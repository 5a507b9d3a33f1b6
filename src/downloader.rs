use crate::controller::Launcher;
use crate::error::{AppError, Result};
use crate::model::{Outcome, UiEvent};
use crate::probe::{self, ProbeRequest};
use crate::thumbnail;
use std::process::{ExitStatus, Stdio};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
    runtime::Handle,
    sync::mpsc::UnboundedSender,
};
use tracing::{debug, info, warn};

/// Everything a worker needs to run one download.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub program: String,
    pub args: Vec<String>,
    /// Advisory format listing to run first
    pub probe: Option<ProbeRequest>,
}

/// Runs a job to completion and reports exactly one `DownloadFinished`,
/// including when the worker fails to spawn the tool or panics.
pub async fn run_download(job: DownloadJob, events: UnboundedSender<UiEvent>) {
    let worker = tokio::spawn(execute(job, events.clone()));
    let outcome = match worker.await {
        Ok(Ok(status)) => Outcome::from_status(status),
        Ok(Err(err)) => {
            warn!("download failed: {err}");
            Outcome::Errored(err.to_string())
        }
        Err(join_err) => Outcome::Errored(format!("download worker stopped: {join_err}")),
    };
    info!(?outcome, "download finished");
    let _ = events.send(UiEvent::DownloadFinished(outcome));
}

async fn execute(job: DownloadJob, events: UnboundedSender<UiEvent>) -> Result<ExitStatus> {
    if let Some(request) = &job.probe {
        probe::check_available_formats(&job.program, request, &events).await;
    }
    stream_tool(&job.program, &job.args, &events).await
}

/// Spawns `program`, forwards each non-empty line of its merged
/// stdout/stderr as it arrives and waits for it to exit.
pub async fn stream_tool(
    program: &str,
    args: &[String],
    events: &UnboundedSender<UiEvent>,
) -> Result<ExitStatus> {
    info!(program, ?args, "spawning");
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| AppError::Spawn { program: program.to_string(), source })?;

    let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;
    supervise(&mut child, stdout, stderr, events).await
}

/// Relays output until both pipes close, then reaps the child. If output
/// can no longer be read the child is killed so nothing outlives the run.
async fn supervise<O, E>(
    child: &mut Child,
    stdout: O,
    stderr: E,
    events: &UnboundedSender<UiEvent>,
) -> Result<ExitStatus>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    if let Err(err) = relay_lines(stdout, stderr, events).await {
        warn!("lost tool output, killing it: {err}");
        let _ = child.kill().await;
        return Err(err);
    }
    Ok(child.wait().await?)
}

async fn relay_lines<O, E>(stdout: O, stderr: E, events: &UnboundedSender<UiEvent>) -> Result<()>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            segment = out.next_segment(), if out_open => match segment? {
                Some(bytes) => forward(&bytes, events),
                None => out_open = false,
            },
            segment = err.next_segment(), if err_open => match segment? {
                Some(bytes) => forward(&bytes, events),
                None => err_open = false,
            },
        }
    }
    Ok(())
}

fn forward(bytes: &[u8], events: &UnboundedSender<UiEvent>) {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    debug!(target: "vidfetch::tool", "{line}");
    let _ = events.send(UiEvent::Log(line.to_string()));
}

fn missing_pipe(name: &str) -> AppError {
    AppError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("child {name} was not captured"),
    ))
}

/// Launches jobs on a shared tokio runtime.
#[derive(Clone)]
pub struct RuntimeLauncher {
    handle: Handle,
}

impl RuntimeLauncher {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Launcher for RuntimeLauncher {
    fn launch(&self, job: DownloadJob, events: UnboundedSender<UiEvent>) {
        self.handle.spawn(run_download(job, events));
    }

    fn preview(&self, video_id: String, events: UnboundedSender<UiEvent>) {
        self.handle.spawn_blocking(move || match thumbnail::fetch_thumbnail(&video_id) {
            Ok(image) => {
                let _ = events.send(UiEvent::Thumbnail { video_id, image });
            }
            Err(err) => debug!(%video_id, "no thumbnail: {err}"),
        });
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::ReadBuf;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    fn drain(rx: &mut UnboundedReceiver<UiEvent>) -> (Vec<String>, Vec<Outcome>) {
        let (mut lines, mut finished) = (Vec::new(), Vec::new());
        while let Ok(event) = rx.try_recv() {
            match event {
                UiEvent::Log(line) => lines.push(line),
                UiEvent::DownloadFinished(outcome) => finished.push(outcome),
                _ => {}
            }
        }
        (lines, finished)
    }

    fn shell_job(script: &str) -> DownloadJob {
        DownloadJob {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            probe: None,
        }
    }

    #[tokio::test]
    async fn forwards_both_streams_and_success() {
        let (tx, mut rx) = unbounded_channel();
        run_download(shell_job("echo first; echo; echo second >&2; exit 0"), tx).await;

        let (mut lines, finished) = drain(&mut rx);
        lines.sort();
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(finished, vec![Outcome::Succeeded]);
    }

    #[tokio::test]
    async fn reports_non_zero_exit_once() {
        let (tx, mut rx) = unbounded_channel();
        run_download(shell_job("echo oops >&2; exit 1"), tx).await;

        let (lines, finished) = drain(&mut rx);
        assert_eq!(lines, vec!["oops".to_string()]);
        assert_eq!(finished, vec![Outcome::Exited(Some(1))]);
    }

    #[tokio::test]
    async fn missing_executable_still_finishes() {
        let (tx, mut rx) = unbounded_channel();
        let job = DownloadJob {
            program: "vidfetch-no-such-tool".to_string(),
            args: Vec::new(),
            probe: None,
        };
        run_download(job, tx).await;

        let (_, finished) = drain(&mut rx);
        assert_eq!(finished.len(), 1);
        assert!(matches!(&finished[0], Outcome::Errored(msg) if msg.contains("vidfetch-no-such-tool")));
    }

    /// Reader that fails on first use.
    struct BrokenPipe;

    impl AsyncRead for BrokenPipe {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed")))
        }
    }

    #[tokio::test]
    async fn unreadable_output_kills_the_tool() {
        let (tx, _rx) = unbounded_channel();
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap();
        let pid = child.id().unwrap().to_string();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            supervise(&mut child, BrokenPipe, tokio::io::empty(), &tx),
        )
        .await
        .expect("supervise returned promptly");
        assert!(matches!(result, Err(AppError::Io(_))));

        let alive = std::process::Command::new("kill")
            .args(["-0", &pid])
            .status()
            .unwrap()
            .success();
        assert!(!alive, "tool process {pid} is still running");
    }

    #[tokio::test]
    async fn lines_are_trimmed_and_lossy() {
        let (tx, mut rx) = unbounded_channel();
        let status = stream_tool(
            "sh",
            &["-c".to_string(), "printf '  padded  \\r\\n\\377ok\\n'".to_string()],
            &tx,
        )
        .await
        .unwrap();
        assert!(status.success());

        let (lines, _) = drain(&mut rx);
        assert_eq!(lines[0], "padded");
        assert!(lines[1].ends_with("ok"));
    }
}
