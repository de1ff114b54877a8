//! FFmpeg execution adapter
//!
//! Runs the transcoder as a child process, turns its diagnostic stream into
//! progress events and guarantees the child is gone when `run` returns.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::engine::progress::parse_progress;
use crate::error::{TimemarkError, TimemarkResult};
use crate::ports::*;
use crate::utils::path::locate_executable;

pub const DEFAULT_DIAGNOSTIC_TAIL_LINES: usize = 40;
pub const DEFAULT_READER_GRACE: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 4096;
/// Longest diagnostic line kept before it is flushed unterminated
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Supervises one transcoder child process per `run` call
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    program: PathBuf,
    /// Arguments placed before every command's own arguments
    leading_args: Vec<String>,
    diagnostic_tail_lines: usize,
    reader_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            diagnostic_tail_lines: DEFAULT_DIAGNOSTIC_TAIL_LINES,
            reader_grace: DEFAULT_READER_GRACE,
        }
    }

    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_diagnostic_tail_lines(mut self, lines: usize) -> Self {
        self.diagnostic_tail_lines = lines.max(1);
        self
    }

    /// How long to wait for output readers once the child has exited
    pub fn with_reader_grace(mut self, grace: Duration) -> Self {
        self.reader_grace = grace;
        self
    }

    fn spawn(&self, args: &[String]) -> TimemarkResult<Child> {
        let program = locate_executable(&self.program)?;

        let mut command = Command::new(&program);
        command
            .args(&self.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!(
            program = %program.display(),
            args = %args.join(" "),
            "Starting transcoder"
        );

        command.spawn().map_err(|e| TimemarkError::Resource {
            name: program.to_string_lossy().into_owned(),
            message: format!("failed to start: {}", e),
        })
    }
}

#[async_trait]
impl ExecutePort for ProcessSupervisor {
    async fn run(
        &self,
        args: &[String],
        total: Duration,
        progress: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> TimemarkResult<ProcessResult> {
        if cancel.is_cancelled() {
            let _ = progress.send(ProgressEvent::cancelled()).await;
            return Err(TimemarkError::Cancelled);
        }

        let mut child = self.spawn(args)?;
        let pid = child.id();

        let stderr = child.stderr.take().ok_or_else(|| missing_pipe(&self.program, "stderr"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe(&self.program, "stdout"))?;

        let sink = DiagnosticSink::new(total, progress.clone(), self.diagnostic_tail_lines);
        let mut supervised = SupervisedChild {
            child,
            stderr_reader: Some(tokio::spawn(read_diagnostics(stderr, sink))),
            stdout_reader: Some(tokio::spawn(drain_output(stdout))),
            exited: false,
        };

        let exit = tokio::select! {
            status = supervised.child.wait() => ChildExit::Exited(status?),
            _ = cancel.cancelled() => ChildExit::Cancelled,
        };

        match exit {
            ChildExit::Cancelled => {
                tracing::info!(?pid, "Cancellation requested, stopping transcoder");
                supervised.terminate().await;
                supervised.join_readers(self.reader_grace).await;
                let _ = progress.send(ProgressEvent::cancelled()).await;
                Err(TimemarkError::Cancelled)
            }
            ChildExit::Exited(status) => {
                supervised.exited = true;
                let diagnostics = supervised.join_readers(self.reader_grace).await;
                let exit_code = exit_code(status);

                if exit_code == 0 {
                    tracing::info!(?pid, "Transcoder finished");
                    let _ = progress.send(ProgressEvent::completed()).await;
                    Ok(ProcessResult::success())
                } else {
                    let diagnostics = diagnostics.join("\n");
                    tracing::warn!(?pid, exit_code, "Transcoder failed");
                    let _ = progress
                        .send(ProgressEvent::failed(format!("exit code {}", exit_code)))
                        .await;
                    Err(TimemarkError::CommandFailed {
                        exit_code,
                        diagnostics,
                    })
                }
            }
        }
    }
}

enum ChildExit {
    Exited(ExitStatus),
    Cancelled,
}

/// A signalled child has no exit code; report it as -1
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn missing_pipe(program: &Path, pipe: &str) -> TimemarkError {
    TimemarkError::Resource {
        name: program.to_string_lossy().into_owned(),
        message: format!("{} pipe was not captured", pipe),
    }
}

/// Child process plus its output readers
///
/// Dropping it kills a still-running child and aborts the readers, so an
/// early return or a dropped `run` future never leaves anything behind.
struct SupervisedChild {
    child: Child,
    stderr_reader: Option<JoinHandle<Vec<String>>>,
    stdout_reader: Option<JoinHandle<()>>,
    exited: bool,
}

impl SupervisedChild {
    async fn terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(error = %e, "Kill request failed, child already gone");
        }
        match self.child.wait().await {
            Ok(status) => tracing::debug!(%status, "Transcoder stopped"),
            Err(e) => tracing::warn!(error = %e, "Failed to reap transcoder"),
        }
        self.exited = true;
    }

    /// Wait for both readers, aborting any still running after `grace`
    ///
    /// Returns the diagnostic tail collected from stderr.
    async fn join_readers(&mut self, grace: Duration) -> Vec<String> {
        let mut tail = Vec::new();

        if let Some(mut handle) = self.stderr_reader.take() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(lines)) => tail = lines,
                Ok(Err(e)) => tracing::warn!(error = %e, "Diagnostic reader failed"),
                Err(_) => {
                    tracing::warn!("Diagnostic reader still open after exit, aborting");
                    handle.abort();
                }
            }
        }

        if let Some(mut handle) = self.stdout_reader.take() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "Output reader failed"),
                Err(_) => {
                    tracing::warn!("Output reader still open after exit, aborting");
                    handle.abort();
                }
            }
        }

        tail
    }
}

impl Drop for SupervisedChild {
    fn drop(&mut self) {
        if !self.exited {
            let _ = self.child.start_kill();
        }
        if let Some(handle) = self.stderr_reader.take() {
            handle.abort();
        }
        if let Some(handle) = self.stdout_reader.take() {
            handle.abort();
        }
    }
}

/// Consumer of diagnostic lines: progress events out, tail retained
struct DiagnosticSink {
    total: Duration,
    progress: mpsc::Sender<ProgressEvent>,
    receiver_open: bool,
    tail: VecDeque<String>,
    tail_lines: usize,
}

impl DiagnosticSink {
    fn new(total: Duration, progress: mpsc::Sender<ProgressEvent>, tail_lines: usize) -> Self {
        Self {
            total,
            progress,
            receiver_open: true,
            tail: VecDeque::with_capacity(tail_lines),
            tail_lines,
        }
    }

    fn accept(&mut self, line: String) {
        match parse_progress(&line, self.total) {
            Some(event) => self.publish(event),
            None => {
                tracing::trace!(line = %line, "transcoder");
                if self.tail.len() == self.tail_lines {
                    self.tail.pop_front();
                }
                self.tail.push_back(line);
            }
        }
    }

    /// Progress is observational: a full channel drops the update rather
    /// than stalling the child's stderr pipe.
    fn publish(&mut self, event: ProgressEvent) {
        if !self.receiver_open {
            return;
        }
        match self.progress.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::trace!("Progress channel full, update dropped"),
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Progress receiver dropped, draining silently");
                self.receiver_open = false;
            }
        }
    }

    fn into_tail(self) -> Vec<String> {
        self.tail.into_iter().collect()
    }
}

/// Split a byte stream on `\n` and `\r`; ffmpeg rewrites its status line
/// with carriage returns. Runs longer than `MAX_LINE_BYTES` are cut.
#[derive(Debug, Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if let Some(line) = self.take_pending() {
                    lines.push(line);
                }
            } else {
                self.pending.push(byte);
                if self.pending.len() >= MAX_LINE_BYTES {
                    lines.extend(self.take_pending());
                }
            }
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

async fn read_diagnostics<R>(mut stream: R, mut sink: DiagnosticSink) -> Vec<String>
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::default();
    let mut buf = [0u8; READ_CHUNK];

    loop {
        let read = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) => {
                tracing::debug!(error = %e, "Diagnostic stream closed with error");
                break;
            }
        };
        for line in splitter.push(&buf[..read]) {
            sink.accept(line);
        }
    }
    if let Some(line) = splitter.finish() {
        sink.accept(line);
    }

    sink.into_tail()
}

async fn drain_output<R>(mut stream: R)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_CHUNK];
    let mut total = 0usize;
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(read) => total += read,
            Err(e) => {
                tracing::debug!(error = %e, "Output stream closed with error");
                break;
            }
        }
    }
    tracing::trace!(bytes = total, "Transcoder stdout discarded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_handles_carriage_returns() {
        let mut splitter = LineSplitter::default();
        let lines = splitter.push(b"frame=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\nDone\npart");
        assert_eq!(
            lines,
            vec!["frame=1 time=00:00:01.00", "frame=2 time=00:00:02.00", "Done"]
        );
        assert_eq!(splitter.push(b"ial\n"), vec!["partial"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_caps_unterminated_runs() {
        let mut splitter = LineSplitter::default();
        let run = vec![b'x'; MAX_LINE_BYTES + 10];
        let lines = splitter.push(&run);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES);
        assert!(splitter.pending.len() < MAX_LINE_BYTES);
        assert_eq!(splitter.finish().map(|line| line.len()), Some(10));
    }

    #[test]
    fn test_sink_keeps_only_diagnostic_tail() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = DiagnosticSink::new(Duration::from_secs(10), tx, 2);
        sink.accept("first".to_string());
        sink.accept("time=00:00:05.00".to_string());
        sink.accept("second".to_string());
        sink.accept("third".to_string());

        assert_eq!(sink.into_tail(), vec!["second", "third"]);
        assert_eq!(rx.try_recv().unwrap().percent, 50.0);
    }

    #[test]
    fn test_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = DiagnosticSink::new(Duration::from_secs(10), tx, 4);
        sink.accept("time=00:00:01.00".to_string());
        sink.accept("time=00:00:02.00".to_string());
        assert!(!sink.receiver_open);
    }

    #[tokio::test]
    async fn test_missing_program_is_resource_error() {
        let supervisor = ProcessSupervisor::new("/no/such/transcoder");
        let (tx, _rx) = mpsc::channel(4);
        let err = supervisor
            .run(&[], Duration::from_secs(1), tx, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TimemarkError::Resource { .. }));
    }
}
