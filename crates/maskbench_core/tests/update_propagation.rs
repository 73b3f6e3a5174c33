use std::sync::Once;

use maskbench_core::{
    update, Effect, Fault, FrameRef, JobId, LabelsMode, MaskRef, Msg, PropagationPhase,
    PropagationStats, RemoteStatus, SessionState, StatusReport,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn session_with_job(id: &str) -> SessionState {
    let (state, _) = update(SessionState::new(), Msg::NewJobClicked);
    let (state, _) = update(state, Msg::JobCreated(JobId::new(id)));
    state
}

fn running_session(id: &str) -> SessionState {
    let state = session_with_job(id);
    let (state, _) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );
    let (state, _) = update(state, Msg::PropagationStarted);
    state
}

fn report(status: RemoteStatus, progress: u32, message: &str) -> StatusReport {
    StatusReport {
        status,
        progress,
        message: (!message.is_empty()).then(|| message.to_string()),
        stats: None,
    }
}

#[test]
fn propagate_click_starts_and_watches() {
    init_logging();
    let state = session_with_job("a1b2c3d4");

    let (state, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::PerLabel,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartPropagation {
            job: JobId::new("a1b2c3d4"),
            mode: LabelsMode::PerLabel,
        }]
    );
    assert_eq!(state.view().run_note.as_deref(), Some("Starting..."));
    assert_eq!(state.phase(), PropagationPhase::Idle);

    let (state, effects) = update(state, Msg::PropagationStarted);
    assert_eq!(
        effects,
        vec![Effect::WatchStatus {
            job: JobId::new("a1b2c3d4"),
        }]
    );
    assert_eq!(state.phase(), PropagationPhase::Running);
}

#[test]
fn propagate_click_is_refused_while_running() {
    init_logging();
    let state = running_session("a1b2c3d4");

    let (state, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("Propagation is already running.")
    );
    assert_eq!(state.phase(), PropagationPhase::Running);
}

#[test]
fn rejected_launch_stays_idle_with_detail() {
    let state = session_with_job("a1b2c3d4");
    let (state, _) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );

    let (state, effects) = update(
        state,
        Msg::PropagationRejected(Fault::Service {
            detail: Some("no label file uploaded".to_string()),
        }),
    );

    assert!(effects.is_empty());
    assert_eq!(state.phase(), PropagationPhase::Idle);
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("Error: no label file uploaded")
    );

    // A rejected launch leaves the session ready for another attempt.
    let (_, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );
    assert_eq!(effects.len(), 1);
}

#[test]
fn rejected_launch_without_detail_uses_generic_text() {
    let state = session_with_job("a1b2c3d4");

    let (state, _) = update(
        state,
        Msg::PropagationRejected(Fault::Service { detail: None }),
    );

    assert_eq!(
        state.view().run_note.as_deref(),
        Some("Error: Failed to start propagation.")
    );
}

#[test]
fn each_report_rewrites_the_run_note() {
    init_logging();
    let state = running_session("a1b2c3d4");

    let (state, effects) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Queued, 0, "")),
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().run_note.as_deref(), Some("queued - 0%"));

    let (state, effects) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Running, 55, "propagating masks")),
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("running - 55% (propagating masks)")
    );
    assert_eq!(state.phase(), PropagationPhase::Running);
}

#[test]
fn completion_refreshes_masks_exactly_once() {
    init_logging();
    let state = running_session("a1b2c3d4");
    let (state, _) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Running, 80, "")),
    );

    let (state, effects) = update(
        state,
        Msg::StatusReported(StatusReport {
            status: RemoteStatus::Completed,
            progress: 100,
            message: Some("done".to_string()),
            stats: Some(PropagationStats {
                frame_count: 42,
                objects: 3,
            }),
        }),
    );

    assert_eq!(
        effects,
        vec![Effect::RefreshMasks {
            job: JobId::new("a1b2c3d4"),
        }]
    );
    assert_eq!(state.phase(), PropagationPhase::Completed);
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("completed - 100% (done) [frames: 42, objects: 3]")
    );

    // The listing that follows does not trigger another refresh.
    let masks = (0..42)
        .map(|i| MaskRef(format!("/data/a1b2c3d4/masks/{i:05}.png")))
        .collect::<Vec<_>>();
    let (state, effects) = update(state, Msg::MasksListed(masks));
    assert!(effects.is_empty());
    assert_eq!(state.masks().len(), 42);
}

#[test]
fn failed_status_stops_without_touching_masks() {
    let state = running_session("a1b2c3d4");
    let (state, _) = update(state, Msg::FramesListed(
        (0..4)
            .map(|i| FrameRef(format!("/data/a1b2c3d4/frames/{i:05}.jpg")))
            .collect(),
    ));

    let (state, effects) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Failed, 30, "propagation error: oom")),
    );

    assert!(effects.is_empty());
    assert_eq!(state.phase(), PropagationPhase::Failed);
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("failed - 30% (propagation error: oom)")
    );
    assert!(state.masks().is_empty());

    // A failed run can be retried.
    let (_, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );
    assert_eq!(effects.len(), 1);
}

#[test]
fn interrupted_polling_keeps_the_last_known_state() {
    init_logging();
    let state = running_session("a1b2c3d4");
    let (mut state, _) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Running, 55, "propagating masks")),
    );
    state.consume_dirty();
    let before = state.view();

    let (mut state, effects) = update(
        state,
        Msg::PollingInterrupted(Fault::Transport("connection reset".to_string())),
    );

    // No effects, no note rewrite, no phase change: the outcome is unknown,
    // which is not the same as failed.
    assert!(effects.is_empty());
    assert_eq!(state.view(), before);
    assert_eq!(state.phase(), PropagationPhase::Running);
    assert_eq!(
        state.view().run_note.as_deref(),
        Some("running - 55% (propagating masks)")
    );
    assert!(!state.consume_dirty());
}

#[test]
fn interrupted_run_can_be_relaunched() {
    init_logging();
    let state = running_session("a1b2c3d4");
    let (state, _) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Running, 55, "propagating masks")),
    );
    let (state, _) = update(
        state,
        Msg::PollingInterrupted(Fault::Transport("connection reset".to_string())),
    );
    assert!(!state.watching());

    // Nothing is observing the job anymore, so a fresh launch goes through
    // instead of being refused as already running.
    let (state, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartPropagation {
            job: JobId::new("a1b2c3d4"),
            mode: LabelsMode::Composite,
        }]
    );
    assert_eq!(state.view().run_note.as_deref(), Some("Starting..."));

    let (state, effects) = update(state, Msg::PropagationStarted);
    assert_eq!(
        effects,
        vec![Effect::WatchStatus {
            job: JobId::new("a1b2c3d4"),
        }]
    );
    assert!(state.watching());

    // The relaunched watch holds the guard again.
    let (_, effects) = update(
        state,
        Msg::PropagateClicked {
            mode: LabelsMode::Composite,
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn queued_report_right_after_start_is_displayed() {
    let state = running_session("a1b2c3d4");

    let (state, _) = update(
        state,
        Msg::StatusReported(report(RemoteStatus::Created, 0, "")),
    );

    assert_eq!(state.view().run_note.as_deref(), Some("created - 0%"));
    assert_eq!(state.phase(), PropagationPhase::Running);
}
