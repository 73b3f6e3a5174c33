use std::fmt;

use crate::view_model::SessionViewModel;

/// Opaque job identifier issued by the annotation service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Locator for one source frame image, as published by the annotation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef(pub String);

/// Locator for one computed mask image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRef(pub String);

/// How seed labels are grouped during propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelsMode {
    /// All labelled objects composited into a single mask per frame.
    #[default]
    Composite,
    /// One mask track per labelled object.
    PerLabel,
}

impl LabelsMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelsMode::Composite => "composite",
            LabelsMode::PerLabel => "per_label",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "composite" => Some(LabelsMode::Composite),
            "per_label" => Some(LabelsMode::PerLabel),
            _ => None,
        }
    }
}

impl fmt::Display for LabelsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job status as reported by the annotation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    Created,
    Queued,
    Running,
    Completed,
    Failed,
}

impl RemoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteStatus::Created => "created",
            RemoteStatus::Queued => "queued",
            RemoteStatus::Running => "running",
            RemoteStatus::Completed => "completed",
            RemoteStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "created" => Some(RemoteStatus::Created),
            "queued" => Some(RemoteStatus::Queued),
            "running" => Some(RemoteStatus::Running),
            "completed" => Some(RemoteStatus::Completed),
            "failed" => Some(RemoteStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses end the status observation loop.
    pub fn is_terminal(self) -> bool {
        matches!(self, RemoteStatus::Completed | RemoteStatus::Failed)
    }
}

impl fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion metadata the service attaches once propagation succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropagationStats {
    pub frame_count: u32,
    pub objects: u32,
}

/// One status-poll result. Rendered into the run note and then discarded;
/// no report history is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: RemoteStatus,
    pub progress: u32,
    pub message: Option<String>,
    pub stats: Option<PropagationStats>,
}

/// Client-side view of the propagation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropagationPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Kinds of artifact the operator can submit to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Video,
    FrameArchive,
    LabelImport,
}

impl UploadKind {
    /// True for uploads whose success replaces the frame sequence.
    pub fn produces_frames(self) -> bool {
        matches!(self, UploadKind::Video | UploadKind::FrameArchive)
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadKind::Video => "video",
            UploadKind::FrameArchive => "frame archive",
            UploadKind::LabelImport => "label import",
        };
        f.write_str(name)
    }
}

/// The annotation session: the active job plus everything hanging off it.
///
/// All mutation goes through [`crate::update`]; the shell only reads
/// projections via [`SessionState::view`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    job: Option<JobId>,
    frames: Vec<FrameRef>,
    masks: Vec<MaskRef>,
    cursor: usize,
    phase: PropagationPhase,
    watching: bool,
    job_note: Option<String>,
    upload_note: Option<String>,
    label_note: Option<String>,
    run_note: Option<String>,
    export_note: Option<String>,
    dirty: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job(&self) -> Option<&JobId> {
        self.job.as_ref()
    }

    pub fn phase(&self) -> PropagationPhase {
        self.phase
    }

    /// True while a status watch is live for the active job.
    pub fn watching(&self) -> bool {
        self.watching
    }

    pub fn frames(&self) -> &[FrameRef] {
        &self.frames
    }

    pub fn masks(&self) -> &[MaskRef] {
        &self.masks
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Frame under the cursor, or `None` while the sequence is empty.
    pub fn current_frame(&self) -> Option<&FrameRef> {
        self.frames.get(self.cursor)
    }

    /// Mask under the cursor. Absent wherever masks lag behind frames.
    pub fn current_mask(&self) -> Option<&MaskRef> {
        self.masks.get(self.cursor)
    }

    pub fn view(&self) -> SessionViewModel {
        let position = if self.frames.is_empty() {
            format!("0 / {}", self.frames.len())
        } else {
            format!("{} / {}", self.cursor + 1, self.frames.len())
        };
        let job_line = match (&self.job_note, &self.job) {
            (Some(note), _) => note.clone(),
            (None, Some(job)) => format!("Job ID: {job}"),
            (None, None) => "No active job.".to_string(),
        };
        SessionViewModel {
            job_line,
            frame_position: position,
            current_frame: self.current_frame().map(|f| f.0.clone()),
            current_mask: self.current_mask().map(|m| m.0.clone()),
            upload_note: self.upload_note.clone(),
            label_note: self.label_note.clone(),
            run_note: self.run_note.clone(),
            export_note: self.export_note.clone(),
            phase: self.phase,
            frame_count: self.frames.len(),
            mask_count: self.masks.len(),
            dirty: self.dirty,
        }
    }

    /// Reports whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Adopts a freshly created job and drops everything tied to the old one.
    pub(crate) fn begin_job(&mut self, job: JobId) {
        self.job_note = Some(format!("Job ID: {job}"));
        self.job = Some(job);
        self.frames.clear();
        self.masks.clear();
        self.cursor = 0;
        self.phase = PropagationPhase::Idle;
        self.watching = false;
        self.upload_note = None;
        self.label_note = None;
        self.run_note = None;
        self.export_note = None;
        self.mark_dirty();
    }

    /// Replaces the frame sequence wholesale. The cursor is only clamped,
    /// never reset, so navigation survives a refresh.
    pub(crate) fn replace_frames(&mut self, frames: Vec<FrameRef>) {
        self.frames = frames;
        self.clamp_cursor();
        self.mark_dirty();
    }

    /// Replaces the mask sequence wholesale. The cursor is not touched.
    pub(crate) fn replace_masks(&mut self, masks: Vec<MaskRef>) {
        self.masks = masks;
        self.mark_dirty();
    }

    pub(crate) fn clear_masks(&mut self) {
        if !self.masks.is_empty() {
            self.masks.clear();
            self.mark_dirty();
        }
    }

    pub(crate) fn reset_cursor(&mut self) {
        if self.cursor != 0 {
            self.cursor = 0;
            self.mark_dirty();
        }
    }

    /// Moves the cursor by `delta`, clamped to the frame sequence.
    /// A no-op while the sequence is empty.
    pub(crate) fn step_cursor(&mut self, delta: isize) {
        if self.frames.is_empty() {
            return;
        }
        let last = self.frames.len() - 1;
        let next = if delta < 0 {
            self.cursor.saturating_sub(delta.unsigned_abs())
        } else {
            self.cursor.saturating_add(delta as usize).min(last)
        };
        if next != self.cursor {
            self.cursor = next;
            self.mark_dirty();
        }
    }

    /// Records whether a status watch is live. Not rendered, so no dirty
    /// mark.
    pub(crate) fn set_watching(&mut self, watching: bool) {
        self.watching = watching;
    }

    pub(crate) fn set_phase(&mut self, phase: PropagationPhase) {
        if self.phase != phase {
            self.phase = phase;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_job_note(&mut self, note: impl Into<String>) {
        self.job_note = Some(note.into());
        self.mark_dirty();
    }

    pub(crate) fn set_upload_note(&mut self, note: impl Into<String>) {
        self.upload_note = Some(note.into());
        self.mark_dirty();
    }

    pub(crate) fn set_label_note(&mut self, note: impl Into<String>) {
        self.label_note = Some(note.into());
        self.mark_dirty();
    }

    pub(crate) fn set_run_note(&mut self, note: impl Into<String>) {
        self.run_note = Some(note.into());
        self.mark_dirty();
    }

    pub(crate) fn set_export_note(&mut self, note: impl Into<String>) {
        self.export_note = Some(note.into());
        self.mark_dirty();
    }

    fn clamp_cursor(&mut self) {
        if self.frames.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.frames.len() {
            self.cursor = self.frames.len() - 1;
        }
    }
}
