// Transcode interactor - Orchestrates one watermark/crop operation

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Local, NaiveDateTime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::model::*;
use crate::domain::rules::*;
use crate::engine::CommandBuilder;
use crate::error::{TimemarkError, TimemarkResult};
use crate::ports::*;
use crate::utils::path::disambiguate;

/// Create the bounded channel operations report progress on
///
/// The receiver must be drained while the operation runs.
pub fn progress_channel(
    capacity: usize,
) -> (mpsc::Sender<ProgressEvent>, mpsc::Receiver<ProgressEvent>) {
    mpsc::channel(capacity.max(1))
}

/// Interactor for transcode use cases
pub struct TranscodeInteractor {
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    builder: CommandBuilder,
}

impl TranscodeInteractor {
    /// Create new transcode interactor with injected ports
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        builder: CommandBuilder,
    ) -> Self {
        Self {
            probe_port,
            execute_port,
            builder,
        }
    }

    /// Prepare a single-use operation for `request`
    pub fn operation(&self, request: OperationRequest) -> TranscodeOperation {
        TranscodeOperation::new(
            request,
            Arc::clone(&self.probe_port),
            Arc::clone(&self.execute_port),
            self.builder.clone(),
        )
    }

    /// Probe a file without transcoding it
    pub async fn describe(&self, path: &Path) -> TimemarkResult<MediaDescriptor> {
        if !path.is_file() {
            return Err(TimemarkError::probe(path, "input file does not exist"));
        }
        self.probe_port.describe(path, true).await
    }
}

/// Terminal record of an operation
#[derive(Debug)]
pub struct OperationOutcome {
    pub state: OperationState,
    /// Every state entered, starting with `Idle`
    pub history: Vec<OperationState>,
    pub result: TimemarkResult<OperationReport>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.state == OperationState::Completed
    }

    pub fn into_result(self) -> TimemarkResult<OperationReport> {
        self.result
    }
}

/// One transcode request moving through its lifecycle
///
/// `run` consumes the operation, so it can be driven exactly once.
pub struct TranscodeOperation {
    request: OperationRequest,
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    builder: CommandBuilder,
    naming_time: Option<NaiveDateTime>,
    state: OperationState,
    history: Vec<OperationState>,
}

impl TranscodeOperation {
    pub fn new(
        request: OperationRequest,
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        builder: CommandBuilder,
    ) -> Self {
        Self {
            request,
            probe_port,
            execute_port,
            builder,
            naming_time: None,
            state: OperationState::Idle,
            history: vec![OperationState::Idle],
        }
    }

    /// Fix the timestamp used to name outputs that have no anchor
    pub fn with_naming_time(mut self, now: NaiveDateTime) -> Self {
        self.naming_time = Some(now);
        self
    }

    pub fn request(&self) -> &OperationRequest {
        &self.request
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Drive the operation to a terminal state
    ///
    /// Progress events go to `progress`; a terminal event (completed,
    /// failed or cancelled) is always the last one sent.
    pub async fn run(
        mut self,
        progress: mpsc::Sender<ProgressEvent>,
        cancel: CancellationToken,
    ) -> OperationOutcome {
        let started = Instant::now();
        tracing::info!(
            kind = %self.request.kind(),
            input = %self.request.input.display(),
            "Starting operation"
        );

        let result = self.drive(&progress, &cancel, started).await;
        let reached_process = self.state == OperationState::Running;

        let terminal = match &result {
            Ok(_) => OperationState::Completed,
            Err(e) if e.is_cancelled() => OperationState::Cancelled,
            Err(_) => OperationState::Failed,
        };
        self.transition(terminal);

        match &result {
            Ok(report) => tracing::info!(
                output = %report.output_path.display(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Operation completed"
            ),
            Err(e) if e.is_cancelled() => tracing::info!("Operation cancelled"),
            Err(e) => tracing::error!(error = %e, "Operation failed"),
        }

        // The supervisor reports its own terminal event once the process ran
        if !reached_process {
            if let Err(e) = &result {
                let event = if e.is_cancelled() {
                    ProgressEvent::cancelled()
                } else {
                    ProgressEvent::failed(e)
                };
                let _ = progress.send(event).await;
            }
        }

        OperationOutcome {
            state: self.state,
            history: self.history,
            result,
        }
    }

    async fn drive(
        &mut self,
        progress: &mpsc::Sender<ProgressEvent>,
        cancel: &CancellationToken,
        started: Instant,
    ) -> TimemarkResult<OperationReport> {
        RequestValidator::validate(&self.request)?;

        self.transition(OperationState::Probing);
        let media = tokio::select! {
            media = probe_media(self.probe_port.as_ref(), &self.request) => media?,
            _ = cancel.cancelled() => return Err(TimemarkError::Cancelled),
        };

        self.transition(OperationState::BuildingCommand);
        let command = self.build_command();
        if let Some(dir) = command.output_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        tracing::debug!(args = ?command.args, "Built transcoder command");

        if cancel.is_cancelled() {
            return Err(TimemarkError::Cancelled);
        }

        self.transition(OperationState::Running);
        let _ = progress
            .send(ProgressEvent::new(
                0.0,
                format!("starting {}", self.request.kind()),
            ))
            .await;

        let process = self
            .execute_port
            .run(
                &command.args,
                media.duration,
                progress.clone(),
                cancel.clone(),
            )
            .await?;

        Ok(OperationReport {
            output_path: command.output_path,
            media,
            process,
            elapsed: started.elapsed(),
        })
    }

    fn build_command(&self) -> BuiltCommand {
        let now = self
            .naming_time
            .unwrap_or_else(|| Local::now().naive_local());
        let command = self.builder.build(&self.request, now);

        let free = disambiguate(&command.output_path, Path::exists);
        if free != command.output_path {
            tracing::info!(
                taken = %command.output_path.display(),
                output = %free.display(),
                "Output exists, writing alongside"
            );
            command.with_output_path(free)
        } else {
            command
        }
    }

    fn transition(&mut self, next: OperationState) {
        if !self.state.can_transition_to(next) {
            tracing::error!(from = %self.state, to = %next, "Rejected invalid state transition");
            return;
        }
        tracing::debug!(from = %self.state, to = %next, "State transition");
        self.state = next;
        self.history.push(next);
    }
}

/// Probe everything the request needs and check it against the frame
async fn probe_media(
    probe: &dyn ProbePort,
    request: &OperationRequest,
) -> TimemarkResult<MediaDescriptor> {
    if !request.input.is_file() {
        return Err(TimemarkError::probe(
            &request.input,
            "input file does not exist",
        ));
    }

    let media = probe
        .describe(&request.input, request.kind().needs_geometry())
        .await?;
    RequestValidator::validate_against_media(request, &media)?;
    Ok(media)
}
