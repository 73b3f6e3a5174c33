//! Headless workflow runner: drives the session state machine through one
//! full annotation pass and executes its effects on the engine.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_info, engine_warn, get_poll_cycle};
use maskbench_core::{update, Effect, Msg, SessionState, SessionViewModel, UploadKind};
use maskbench_engine::{EngineEvent, EngineHandle, EngineSettings, WatchOutcome};
use thiserror::Error;

const PUMP_INTERVAL: Duration = Duration::from_millis(20);

/// What one invocation pushes through the session.
pub struct WorkflowPlan {
    pub source: SourceArtifact,
    pub labels: Option<PathBuf>,
    pub labels_mode: maskbench_core::LabelsMode,
    pub export: bool,
}

/// Where the frame sequence comes from.
pub enum SourceArtifact {
    Video(PathBuf),
    FrameArchive(PathBuf),
}

/// Ways a workflow run ends short of success. Each maps onto its own exit
/// code so scripts can tell a failed propagation from an unknown one.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The engine could not start, or a stage never reported back.
    #[error("{0}")]
    Stalled(String),
    /// The service or the local filesystem refused an operation.
    #[error("{0}")]
    Refused(String),
    /// The service reported the propagation failed.
    #[error("propagation failed: {0}")]
    PropagationFailed(String),
    /// Status observation broke off; the remote outcome is unknown.
    #[error("lost contact with the service; the propagation outcome is unknown")]
    OutcomeUnknown,
}

impl WorkflowError {
    pub fn exit_code(&self) -> u8 {
        match self {
            WorkflowError::Stalled(_) => 1,
            WorkflowError::Refused(_) => 2,
            WorkflowError::PropagationFailed(_) => 3,
            WorkflowError::OutcomeUnknown => 4,
        }
    }
}

pub fn run(plan: WorkflowPlan, settings: EngineSettings) -> Result<(), WorkflowError> {
    // Listings that fail in transit produce no event, so every wait except
    // the status watch carries a deadline derived from the client timeouts.
    let patience = settings.client.request_timeout * 3;
    let transfer_patience = settings.client.transfer_timeout + Duration::from_secs(60);

    let engine = EngineHandle::new(settings)
        .map_err(|err| WorkflowError::Stalled(format!("engine startup failed: {err}")))?;
    let mut driver = Driver::new(engine, patience, transfer_patience);

    driver.apply(Msg::NewJobClicked);
    let job = driver.await_job()?;
    engine_info!("session opened with job {}", job);

    let (kind, upload_msg) = match plan.source {
        SourceArtifact::Video(video) => (
            UploadKind::Video,
            Msg::UploadVideoClicked { video: Some(video) },
        ),
        SourceArtifact::FrameArchive(archive) => (
            UploadKind::FrameArchive,
            Msg::UploadFramesClicked {
                archive: Some(archive),
            },
        ),
    };
    driver.apply(upload_msg);
    driver.await_upload(kind)?;
    let frame_count = driver.await_frames()?;
    engine_info!("frame index ready with {} frames", frame_count);

    let Some(labels) = plan.labels else {
        engine_info!("no label import given; stopping after frame upload");
        driver.finish();
        return Ok(());
    };
    driver.apply(Msg::UploadLabelsClicked {
        labels: Some(labels),
    });
    driver.await_upload(UploadKind::LabelImport)?;

    driver.apply(Msg::PropagateClicked {
        mode: plan.labels_mode,
    });
    driver.await_launch()?;
    driver.await_completion()?;

    let mask_count = driver.await_masks()?;
    engine_info!("mask index ready with {} masks", mask_count);

    if plan.export {
        driver.apply(Msg::ExportClicked);
        let path = driver.await_export()?;
        engine_info!("export archive at {:?}", path);
    }

    driver.finish();
    Ok(())
}

/// Owns the session state and the engine handle; every engine event flows
/// through [`update`] before the runner looks at it.
struct Driver {
    state: SessionState,
    engine: EngineHandle,
    last_view: SessionViewModel,
    patience: Duration,
    transfer_patience: Duration,
}

impl Driver {
    fn new(engine: EngineHandle, patience: Duration, transfer_patience: Duration) -> Self {
        Self {
            state: SessionState::new(),
            engine,
            last_view: SessionViewModel::default(),
            patience,
            transfer_patience,
        }
    }

    /// Applies one message and executes whatever effects fall out.
    fn apply(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.execute(effects);
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateJob => self.engine.create_job(),
                Effect::UploadVideo { job, video } => {
                    self.engine.upload(UploadKind::Video, job, video)
                }
                Effect::UploadFrameArchive { job, archive } => {
                    self.engine.upload(UploadKind::FrameArchive, job, archive)
                }
                Effect::UploadLabelImport { job, labels } => {
                    self.engine.upload(UploadKind::LabelImport, job, labels)
                }
                Effect::RefreshFrames { job } => self.engine.refresh_frames(job),
                Effect::RefreshMasks { job } => self.engine.refresh_masks(job),
                Effect::StartPropagation { job, mode } => {
                    self.engine.start_propagation(job, mode)
                }
                Effect::WatchStatus { job } => self.engine.watch_status(job),
                Effect::CancelWatch => self.engine.cancel_watch(),
                Effect::SaveExport { job } => self.engine.save_export(job),
            }
        }
    }

    /// Drains engine events into the state machine until `check` picks one
    /// out. Renders between batches so progress shows while waiting.
    fn pump_until<T>(
        &mut self,
        what: &str,
        deadline: Option<Duration>,
        mut check: impl FnMut(&EngineEvent) -> Option<T>,
    ) -> Result<T, WorkflowError> {
        let started = Instant::now();
        loop {
            while let Some(event) = self.engine.try_recv() {
                let hit = check(&event);
                self.dispatch(event);
                if let Some(value) = hit {
                    self.apply(Msg::Tick);
                    self.render();
                    return Ok(value);
                }
            }
            self.apply(Msg::Tick);
            self.render();
            if let Some(limit) = deadline {
                if started.elapsed() > limit {
                    return Err(WorkflowError::Stalled(format!(
                        "gave up waiting for {what}"
                    )));
                }
            }
            thread::sleep(PUMP_INTERVAL);
        }
    }

    fn dispatch(&mut self, event: EngineEvent) {
        if let EngineEvent::WatchEnded {
            job,
            outcome: WatchOutcome::Interrupted(fault),
        } = &event
        {
            engine_warn!(
                "status observation for job {} interrupted: {}; remote outcome unknown",
                job,
                fault
            );
        }
        if let Some(msg) = event_msg(event) {
            self.apply(msg);
        }
    }

    fn render(&mut self) {
        if !self.state.consume_dirty() {
            return;
        }
        let view = self.state.view();
        print_changes(&self.last_view, &view);
        self.last_view = view;
    }

    /// Final render so the last state change is never swallowed.
    fn finish(&mut self) {
        self.apply(Msg::Tick);
        self.render();
    }

    fn await_job(&mut self) -> Result<maskbench_core::JobId, WorkflowError> {
        let outcome = self.pump_until("job creation", Some(self.patience), |event| match event {
            EngineEvent::JobCreated(job) => Some(Ok(job.clone())),
            EngineEvent::JobCreateFailed(fault) => Some(Err(fault.clone())),
            _ => None,
        })?;
        outcome.map_err(|fault| WorkflowError::Refused(format!("could not create a job: {fault}")))
    }

    fn await_upload(&mut self, kind: UploadKind) -> Result<Option<u32>, WorkflowError> {
        let outcome = self.pump_until(
            "upload completion",
            Some(self.transfer_patience),
            |event| match event {
                EngineEvent::UploadFinished {
                    kind: done,
                    frame_count,
                } if *done == kind => Some(Ok(*frame_count)),
                EngineEvent::UploadFailed { kind: failed, fault } if *failed == kind => {
                    Some(Err(fault.clone()))
                }
                _ => None,
            },
        )?;
        outcome.map_err(|fault| WorkflowError::Refused(format!("{kind} upload failed: {fault}")))
    }

    fn await_frames(&mut self) -> Result<usize, WorkflowError> {
        let count = self.pump_until("the frame listing", Some(self.patience), |event| {
            match event {
                EngineEvent::FramesListed(frames) => Some(frames.len()),
                _ => None,
            }
        })?;
        if count == 0 {
            return Err(WorkflowError::Refused(
                "the service reported no frames for this job".to_string(),
            ));
        }
        Ok(count)
    }

    fn await_launch(&mut self) -> Result<(), WorkflowError> {
        let outcome = self.pump_until(
            "the propagation start",
            Some(self.patience),
            |event| match event {
                EngineEvent::PropagationStarted => Some(Ok(())),
                EngineEvent::PropagationRejected(fault) => Some(Err(fault.clone())),
                _ => None,
            },
        )?;
        outcome
            .map_err(|fault| WorkflowError::Refused(format!("propagation was not started: {fault}")))
    }

    /// Follows status reports until the remote run ends one way or another.
    /// No deadline: a healthy watch keeps reporting for as long as the
    /// computation takes, and an unhealthy one ends itself.
    fn await_completion(&mut self) -> Result<(), WorkflowError> {
        enum RunEnd {
            Completed,
            Failed,
            Unknown,
        }
        let end = self.pump_until("the propagation outcome", None, |event| match event {
            EngineEvent::StatusReported { report, .. } if report.status.is_terminal() => {
                match report.status {
                    maskbench_core::RemoteStatus::Completed => Some(RunEnd::Completed),
                    _ => Some(RunEnd::Failed),
                }
            }
            EngineEvent::WatchEnded {
                outcome: WatchOutcome::Interrupted(_),
                ..
            } => Some(RunEnd::Unknown),
            _ => None,
        })?;
        engine_debug!("status watch finished after {} poll cycles", get_poll_cycle());
        match end {
            RunEnd::Completed => Ok(()),
            RunEnd::Failed => {
                let note = self.state.view().run_note.unwrap_or_default();
                Err(WorkflowError::PropagationFailed(note))
            }
            RunEnd::Unknown => Err(WorkflowError::OutcomeUnknown),
        }
    }

    fn await_masks(&mut self) -> Result<usize, WorkflowError> {
        self.pump_until("the mask listing", Some(self.patience), |event| {
            match event {
                EngineEvent::MasksListed(masks) => Some(masks.len()),
                _ => None,
            }
        })
    }

    fn await_export(&mut self) -> Result<PathBuf, WorkflowError> {
        let outcome = self.pump_until(
            "the export archive",
            Some(self.transfer_patience),
            |event| match event {
                EngineEvent::ExportSaved { path } => Some(Ok(path.clone())),
                EngineEvent::ExportFailed(fault) => Some(Err(fault.clone())),
                _ => None,
            },
        )?;
        outcome.map_err(|fault| WorkflowError::Refused(format!("export failed: {fault}")))
    }
}

fn event_msg(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::JobCreated(job) => Some(Msg::JobCreated(job)),
        EngineEvent::JobCreateFailed(fault) => Some(Msg::JobCreateFailed(fault)),
        EngineEvent::UploadFinished { kind, frame_count } => {
            Some(Msg::UploadFinished { kind, frame_count })
        }
        EngineEvent::UploadFailed { kind, fault } => Some(Msg::UploadFailed { kind, fault }),
        EngineEvent::FramesListed(frames) => Some(Msg::FramesListed(frames)),
        EngineEvent::MasksListed(masks) => Some(Msg::MasksListed(masks)),
        EngineEvent::PropagationStarted => Some(Msg::PropagationStarted),
        EngineEvent::PropagationRejected(fault) => Some(Msg::PropagationRejected(fault)),
        EngineEvent::StatusReported { report, .. } => Some(Msg::StatusReported(report)),
        EngineEvent::WatchEnded { outcome, .. } => match outcome {
            WatchOutcome::Interrupted(fault) => Some(Msg::PollingInterrupted(fault)),
            // Terminal and cancelled watches already told the session
            // everything it needs through the report stream.
            WatchOutcome::Terminal | WatchOutcome::Cancelled => None,
        },
        EngineEvent::ExportSaved { path } => Some(Msg::ExportSaved(path)),
        EngineEvent::ExportFailed(fault) => Some(Msg::ExportFailed(fault)),
    }
}

/// Prints only the lines that changed since the previous render.
fn print_changes(prev: &SessionViewModel, next: &SessionViewModel) {
    if next.job_line != prev.job_line {
        println!("[job] {}", next.job_line);
    }
    if next.upload_note != prev.upload_note {
        if let Some(note) = &next.upload_note {
            println!("[frames] {note}");
        }
    }
    if next.label_note != prev.label_note {
        if let Some(note) = &next.label_note {
            println!("[labels] {note}");
        }
    }
    if next.run_note != prev.run_note {
        if let Some(note) = &next.run_note {
            println!("[propagation] {note}");
        }
    }
    if next.export_note != prev.export_note {
        if let Some(note) = &next.export_note {
            println!("[export] {note}");
        }
    }
    if next.frame_position != prev.frame_position {
        println!("[viewer] frame {}", next.frame_position);
    }
    if next.mask_count != prev.mask_count {
        println!("[viewer] masks loaded: {}", next.mask_count);
    }
}
