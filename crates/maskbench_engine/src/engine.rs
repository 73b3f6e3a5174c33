use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use maskbench_core::{Fault, JobId, LabelsMode, UploadKind};
use tokio_util::sync::CancellationToken;

use crate::api::{AnnotationApi, ApiError, ArtifactFile, ClientSettings, HttpAnnotationApi};
use crate::persist::ArchiveWriter;
use crate::poller::watch_status;
use crate::types::EngineEvent;

/// Engine-wide settings: connection plus polling and export behavior.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub client: ClientSettings,
    pub poll_interval: Duration,
    pub export_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            client: ClientSettings::default(),
            poll_interval: Duration::from_millis(1000),
            export_dir: PathBuf::from("export"),
        }
    }
}

enum EngineCommand {
    CreateJob,
    Upload {
        kind: UploadKind,
        job: JobId,
        path: PathBuf,
    },
    StartPropagation {
        job: JobId,
        mode: LabelsMode,
    },
    WatchStatus {
        job: JobId,
    },
    CancelWatch,
    RefreshFrames {
        job: JobId,
    },
    RefreshMasks {
        job: JobId,
    },
    SaveExport {
        job: JobId,
    },
}

/// Handle to the engine thread. Commands go in over a channel; events come
/// back over another. Each command runs as its own task on the engine's
/// runtime, so uploads and the status watch proceed concurrently.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    /// Engine against the real HTTP service.
    pub fn new(settings: EngineSettings) -> Result<Self, ApiError> {
        let api = Arc::new(HttpAnnotationApi::new(settings.client.clone())?);
        Ok(Self::with_api(api, settings))
    }

    /// Engine over any API implementation.
    pub fn with_api(api: Arc<dyn AnnotationApi>, settings: EngineSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let watch = Arc::new(Mutex::new(None::<CancellationToken>));

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            while let Ok(command) = cmd_rx.recv() {
                let api = api.clone();
                let event_tx = event_tx.clone();
                let watch = watch.clone();
                let settings = settings.clone();
                runtime.spawn(async move {
                    handle_command(api, command, event_tx, watch, settings).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn create_job(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CreateJob);
    }

    pub fn upload(&self, kind: UploadKind, job: JobId, path: PathBuf) {
        let _ = self.cmd_tx.send(EngineCommand::Upload { kind, job, path });
    }

    pub fn start_propagation(&self, job: JobId, mode: LabelsMode) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::StartPropagation { job, mode });
    }

    pub fn watch_status(&self, job: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::WatchStatus { job });
    }

    pub fn cancel_watch(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CancelWatch);
    }

    pub fn refresh_frames(&self, job: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::RefreshFrames { job });
    }

    pub fn refresh_masks(&self, job: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::RefreshMasks { job });
    }

    pub fn save_export(&self, job: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::SaveExport { job });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}

async fn handle_command(
    api: Arc<dyn AnnotationApi>,
    command: EngineCommand,
    event_tx: mpsc::Sender<EngineEvent>,
    watch: Arc<Mutex<Option<CancellationToken>>>,
    settings: EngineSettings,
) {
    match command {
        EngineCommand::CreateJob => {
            let event = match api.create_job().await {
                Ok(job) => {
                    engine_info!("created job {}", job);
                    EngineEvent::JobCreated(job)
                }
                Err(err) => {
                    engine_warn!("job creation failed: {}", err);
                    EngineEvent::JobCreateFailed(err.into_fault())
                }
            };
            let _ = event_tx.send(event);
        }
        EngineCommand::Upload { kind, job, path } => {
            let file = match ArtifactFile::read(&path).await {
                Ok(file) => file,
                Err(err) => {
                    engine_warn!("could not read {} from {:?}: {}", kind, path, err);
                    let _ = event_tx.send(EngineEvent::UploadFailed {
                        kind,
                        fault: Fault::Input(format!("Could not read file: {err}")),
                    });
                    return;
                }
            };
            let result = match kind {
                UploadKind::Video => api.upload_video(&job, file).await,
                UploadKind::FrameArchive => api.upload_frame_archive(&job, file).await,
                UploadKind::LabelImport => api.upload_label_import(&job, file).await.map(|_| None),
            };
            let event = match result {
                Ok(frame_count) => {
                    engine_info!("{} upload for job {} finished", kind, job);
                    EngineEvent::UploadFinished { kind, frame_count }
                }
                Err(err) => {
                    engine_warn!("{} upload for job {} failed: {}", kind, job, err);
                    EngineEvent::UploadFailed {
                        kind,
                        fault: err.into_fault(),
                    }
                }
            };
            let _ = event_tx.send(event);
        }
        EngineCommand::StartPropagation { job, mode } => {
            let event = match api.start_propagation(&job, mode).await {
                Ok(()) => {
                    engine_info!("propagation started for job {} (labels mode {})", job, mode);
                    EngineEvent::PropagationStarted
                }
                Err(err) => {
                    engine_warn!("propagation start for job {} rejected: {}", job, err);
                    EngineEvent::PropagationRejected(err.into_fault())
                }
            };
            let _ = event_tx.send(event);
        }
        EngineCommand::WatchStatus { job } => {
            let token = CancellationToken::new();
            let previous = {
                let mut guard = watch.lock().expect("watch token lock");
                guard.replace(token.clone())
            };
            if let Some(previous) = previous {
                // One observation loop at a time.
                previous.cancel();
            }
            watch_status(api, job, settings.poll_interval, token, event_tx).await;
        }
        EngineCommand::CancelWatch => {
            if let Some(token) = watch.lock().expect("watch token lock").take() {
                token.cancel();
            }
        }
        EngineCommand::RefreshFrames { job } => {
            match api.list_frames(&job).await {
                Ok(frames) => {
                    let _ = event_tx.send(EngineEvent::FramesListed(frames));
                }
                Err(err @ ApiError::Service { .. }) => {
                    // The service has no listing for this job yet; show an
                    // empty index rather than a stale one.
                    engine_warn!("frame listing for job {} unavailable: {}", job, err);
                    let _ = event_tx.send(EngineEvent::FramesListed(Vec::new()));
                }
                Err(err) => {
                    engine_warn!("frame listing for job {} failed: {}", job, err);
                }
            }
        }
        EngineCommand::RefreshMasks { job } => {
            match api.list_masks(&job).await {
                Ok(masks) => {
                    let _ = event_tx.send(EngineEvent::MasksListed(masks));
                }
                Err(err @ ApiError::Service { .. }) => {
                    engine_warn!("mask listing for job {} unavailable: {}", job, err);
                    let _ = event_tx.send(EngineEvent::MasksListed(Vec::new()));
                }
                Err(err) => {
                    engine_warn!("mask listing for job {} failed: {}", job, err);
                }
            }
        }
        EngineCommand::SaveExport { job } => {
            let event = match api.download_export(&job).await {
                Ok(bytes) => {
                    let writer = ArchiveWriter::new(settings.export_dir.clone());
                    match writer.write(&format!("{job}_masks.zip"), &bytes) {
                        Ok(path) => {
                            engine_info!("export for job {} saved to {:?}", job, path);
                            EngineEvent::ExportSaved { path }
                        }
                        Err(err) => {
                            engine_error!("could not persist export for job {}: {}", job, err);
                            EngineEvent::ExportFailed(Fault::Input(format!(
                                "Could not save export: {err}"
                            )))
                        }
                    }
                }
                Err(err) => {
                    engine_warn!("export download for job {} failed: {}", job, err);
                    EngineEvent::ExportFailed(err.into_fault())
                }
            };
            let _ = event_tx.send(event);
        }
    }
}
