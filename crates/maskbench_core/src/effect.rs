use std::path::PathBuf;

/// Side effects requested by the update function and executed by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateJob,
    UploadVideo { job: crate::JobId, video: PathBuf },
    UploadFrameArchive { job: crate::JobId, archive: PathBuf },
    UploadLabelImport { job: crate::JobId, labels: PathBuf },
    RefreshFrames { job: crate::JobId },
    RefreshMasks { job: crate::JobId },
    StartPropagation { job: crate::JobId, mode: crate::LabelsMode },
    /// Begin the status observation loop for the given job.
    WatchStatus { job: crate::JobId },
    /// Stop whichever observation loop is active, if any.
    CancelWatch,
    SaveExport { job: crate::JobId },
}
