use std::path::PathBuf;

use crate::{
    Effect, Fault, Msg, PropagationPhase, RemoteStatus, SessionState, StatusReport, UploadKind,
};

/// Pure update function: applies a message to the session and returns any effects.
pub fn update(mut state: SessionState, msg: Msg) -> (SessionState, Vec<Effect>) {
    let effects = match msg {
        Msg::NewJobClicked => vec![Effect::CreateJob],
        Msg::JobCreated(job) => {
            state.begin_job(job);
            // A watch left over from the previous job must stop observing it.
            vec![Effect::CancelWatch]
        }
        Msg::JobCreateFailed(fault) => {
            state.set_job_note(format!("Error: {}", fault.describe("Failed to create job.")));
            Vec::new()
        }

        Msg::UploadVideoClicked { video } => {
            upload_requested(&mut state, UploadKind::Video, video)
        }
        Msg::UploadFramesClicked { archive } => {
            upload_requested(&mut state, UploadKind::FrameArchive, archive)
        }
        Msg::UploadLabelsClicked { labels } => {
            upload_requested(&mut state, UploadKind::LabelImport, labels)
        }
        Msg::UploadFinished { kind, frame_count } => upload_finished(&mut state, kind, frame_count),
        Msg::UploadFailed { kind, fault } => {
            set_upload_area(&mut state, kind, format!("Error: {}", fault.describe("Upload failed.")));
            Vec::new()
        }

        Msg::FramesListed(frames) => {
            state.replace_frames(frames);
            Vec::new()
        }
        Msg::MasksListed(masks) => {
            state.replace_masks(masks);
            Vec::new()
        }

        Msg::PropagateClicked { mode } => match state.job().cloned() {
            None => {
                state.set_run_note(Fault::no_active_job().to_string());
                Vec::new()
            }
            // Keyed on the live watch, not the phase: after an interrupted
            // watch the phase stays Running with nothing observing, and a
            // relaunch must go through.
            Some(_) if state.watching() => {
                state.set_run_note("Propagation is already running.");
                Vec::new()
            }
            Some(job) => {
                state.set_run_note("Starting...");
                vec![Effect::StartPropagation { job, mode }]
            }
        },
        Msg::PropagationStarted => {
            state.set_phase(PropagationPhase::Running);
            state.set_watching(true);
            match state.job().cloned() {
                Some(job) => vec![Effect::WatchStatus { job }],
                None => Vec::new(),
            }
        }
        Msg::PropagationRejected(fault) => {
            state.set_run_note(format!(
                "Error: {}",
                fault.describe("Failed to start propagation.")
            ));
            Vec::new()
        }
        Msg::StatusReported(report) => status_reported(&mut state, report),
        Msg::PollingInterrupted(_) => {
            // The remote outcome stays unknown; the session keeps its last
            // known phase and notes, and the shell logs the detail. The
            // dead watch no longer holds the launch guard.
            state.set_watching(false);
            Vec::new()
        }

        Msg::ExportClicked => match state.job().cloned() {
            None => {
                state.set_export_note(Fault::no_active_job().to_string());
                Vec::new()
            }
            Some(job) => {
                state.set_export_note("Exporting...");
                vec![Effect::SaveExport { job }]
            }
        },
        Msg::ExportSaved(path) => {
            state.set_export_note(format!("Export saved to {}", path.display()));
            Vec::new()
        }
        Msg::ExportFailed(fault) => {
            state.set_export_note(format!("Error: {}", fault.describe("Export failed.")));
            Vec::new()
        }

        Msg::PrevFrameClicked => {
            state.step_cursor(-1);
            Vec::new()
        }
        Msg::NextFrameClicked => {
            state.step_cursor(1);
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

/// Validates an upload intent: an active job and a selected file, in that
/// order, before any effect is produced.
fn upload_requested(
    state: &mut SessionState,
    kind: UploadKind,
    artifact: Option<PathBuf>,
) -> Vec<Effect> {
    let Some(job) = state.job().cloned() else {
        set_upload_area(state, kind, Fault::no_active_job().to_string());
        return Vec::new();
    };
    let Some(path) = artifact else {
        set_upload_area(state, kind, Fault::Input(format!("No {kind} selected.")).to_string());
        return Vec::new();
    };
    set_upload_area(state, kind, format!("Uploading {kind}..."));
    vec![match kind {
        UploadKind::Video => Effect::UploadVideo { job, video: path },
        UploadKind::FrameArchive => Effect::UploadFrameArchive { job, archive: path },
        UploadKind::LabelImport => Effect::UploadLabelImport { job, labels: path },
    }]
}

fn upload_finished(
    state: &mut SessionState,
    kind: UploadKind,
    frame_count: Option<u32>,
) -> Vec<Effect> {
    if !kind.produces_frames() {
        state.set_label_note("Label import uploaded.");
        return Vec::new();
    }
    let count = frame_count.unwrap_or(0);
    let note = match kind {
        UploadKind::Video => format!("Video uploaded. Frame count: {count}"),
        _ => format!("Frames extracted. Frame count: {count}"),
    };
    state.set_upload_note(note);
    // The new sequence replaces the old one, so masks computed against the
    // old frames no longer line up with anything.
    state.reset_cursor();
    state.clear_masks();
    match state.job().cloned() {
        Some(job) => vec![Effect::RefreshFrames { job }],
        None => Vec::new(),
    }
}

fn status_reported(state: &mut SessionState, report: StatusReport) -> Vec<Effect> {
    state.set_run_note(render_report(&report));
    if report.status.is_terminal() {
        // The watch stops itself after reporting a terminal status.
        state.set_watching(false);
    }
    match report.status {
        RemoteStatus::Completed => {
            state.set_phase(PropagationPhase::Completed);
            match state.job().cloned() {
                Some(job) => vec![Effect::RefreshMasks { job }],
                None => Vec::new(),
            }
        }
        RemoteStatus::Failed => {
            state.set_phase(PropagationPhase::Failed);
            Vec::new()
        }
        RemoteStatus::Created | RemoteStatus::Queued | RemoteStatus::Running => {
            state.set_phase(PropagationPhase::Running);
            Vec::new()
        }
    }
}

/// Formats one poll report the way the progress line shows it:
/// `running - 55% (propagating masks)`, with completion stats appended.
fn render_report(report: &StatusReport) -> String {
    let mut line = format!("{} - {}%", report.status, report.progress);
    if let Some(message) = report.message.as_deref() {
        if !message.is_empty() {
            line.push_str(&format!(" ({message})"));
        }
    }
    if let Some(stats) = report.stats {
        line.push_str(&format!(
            " [frames: {}, objects: {}]",
            stats.frame_count, stats.objects
        ));
    }
    line
}

/// Video and frame-archive uploads report into the frame-source area;
/// label imports report into their own.
fn set_upload_area(state: &mut SessionState, kind: UploadKind, note: String) {
    if kind.produces_frames() {
        state.set_upload_note(note);
    } else {
        state.set_label_note(note);
    }
}
