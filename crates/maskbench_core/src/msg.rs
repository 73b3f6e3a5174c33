use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator asked for a fresh job.
    NewJobClicked,
    /// Operator submitted a source video for server-side frame extraction.
    UploadVideoClicked { video: Option<PathBuf> },
    /// Operator submitted a pre-extracted frame archive.
    UploadFramesClicked { archive: Option<PathBuf> },
    /// Operator submitted a label seed export.
    UploadLabelsClicked { labels: Option<PathBuf> },
    /// Operator started propagation with the chosen labels mode.
    PropagateClicked { mode: crate::LabelsMode },
    /// Operator asked for the mask export archive.
    ExportClicked,
    /// Viewer navigation, one frame back.
    PrevFrameClicked,
    /// Viewer navigation, one frame forward.
    NextFrameClicked,
    /// UI/render tick to coalesce rendering.
    Tick,

    /// The service allocated a job.
    JobCreated(crate::JobId),
    /// Job allocation failed.
    JobCreateFailed(crate::Fault),
    /// One upload finished; frame-producing kinds report a count.
    UploadFinished {
        kind: crate::UploadKind,
        frame_count: Option<u32>,
    },
    /// One upload failed.
    UploadFailed {
        kind: crate::UploadKind,
        fault: crate::Fault,
    },
    /// Wholesale frame listing from the service.
    FramesListed(Vec<crate::FrameRef>),
    /// Wholesale mask listing from the service.
    MasksListed(Vec<crate::MaskRef>),
    /// The start call was accepted; the remote computation is underway.
    PropagationStarted,
    /// The start call was rejected.
    PropagationRejected(crate::Fault),
    /// One status-poll cycle's result.
    StatusReported(crate::StatusReport),
    /// The observation loop ended without reaching a terminal status.
    PollingInterrupted(crate::Fault),
    /// The export archive was written to disk.
    ExportSaved(PathBuf),
    /// The export download or write failed.
    ExportFailed(crate::Fault),
}
