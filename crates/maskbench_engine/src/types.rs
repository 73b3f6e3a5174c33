use std::path::PathBuf;

use maskbench_core::{Fault, FrameRef, JobId, MaskRef, StatusReport, UploadKind};

/// Events reported by the engine back to the shell. Failures arrive already
/// collapsed onto the client fault taxonomy; the raw errors are logged at
/// the point of failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    JobCreated(JobId),
    JobCreateFailed(Fault),
    UploadFinished {
        kind: UploadKind,
        frame_count: Option<u32>,
    },
    UploadFailed {
        kind: UploadKind,
        fault: Fault,
    },
    FramesListed(Vec<FrameRef>),
    MasksListed(Vec<MaskRef>),
    PropagationStarted,
    PropagationRejected(Fault),
    StatusReported {
        job: JobId,
        report: StatusReport,
    },
    WatchEnded {
        job: JobId,
        outcome: WatchOutcome,
    },
    ExportSaved {
        path: PathBuf,
    },
    ExportFailed(Fault),
}

/// Why a status observation loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A terminal status was observed and reported.
    Terminal,
    /// A status query failed; the remote outcome is unknown.
    Interrupted(Fault),
    /// The loop was told to stop, usually because the job was replaced.
    Cancelled,
}
