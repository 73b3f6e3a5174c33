use crate::PropagationPhase;

/// Snapshot of the session prepared for display. Strings are fully formatted
/// so the shell renders without consulting the state again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionViewModel {
    /// "Job ID: <id>", "No active job.", or a job-creation error.
    pub job_line: String,
    /// "3 / 42", or "0 / 0" while no frames are loaded.
    pub frame_position: String,
    pub current_frame: Option<String>,
    pub current_mask: Option<String>,
    pub upload_note: Option<String>,
    pub label_note: Option<String>,
    pub run_note: Option<String>,
    pub export_note: Option<String>,
    pub phase: PropagationPhase,
    pub frame_count: usize,
    pub mask_count: usize,
    pub dirty: bool,
}
