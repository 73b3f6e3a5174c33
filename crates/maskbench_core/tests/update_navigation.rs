use maskbench_core::{update, FrameRef, JobId, MaskRef, Msg, SessionState};

fn session_with_frames(count: usize) -> SessionState {
    let (state, _) = update(SessionState::new(), Msg::JobCreated(JobId::new("a1b2c3d4")));
    let frames = (0..count)
        .map(|i| FrameRef(format!("/data/a1b2c3d4/frames/{i:05}.jpg")))
        .collect();
    let (state, _) = update(state, Msg::FramesListed(frames));
    state
}

#[test]
fn navigation_on_empty_sequence_is_a_noop() {
    let state = session_with_frames(0);

    let (state, effects) = update(state, Msg::NextFrameClicked);
    assert!(effects.is_empty());
    assert_eq!(state.cursor(), 0);

    let (state, effects) = update(state, Msg::PrevFrameClicked);
    assert!(effects.is_empty());
    assert_eq!(state.cursor(), 0);

    let view = state.view();
    assert_eq!(view.frame_position, "0 / 0");
    assert_eq!(view.current_frame, None);
    assert_eq!(view.current_mask, None);
}

#[test]
fn cursor_stops_at_both_ends() {
    let mut state = session_with_frames(3);

    let (next, _) = update(state, Msg::PrevFrameClicked);
    state = next;
    assert_eq!(state.cursor(), 0);

    for _ in 0..5 {
        let (next, _) = update(state, Msg::NextFrameClicked);
        state = next;
    }
    assert_eq!(state.cursor(), 2);
    assert_eq!(state.view().frame_position, "3 / 3");

    let (state, _) = update(state, Msg::NextFrameClicked);
    assert_eq!(state.cursor(), 2);
}

#[test]
fn navigation_round_trip_restores_position() {
    let state = session_with_frames(5);

    let (state, _) = update(state, Msg::NextFrameClicked);
    let (state, _) = update(state, Msg::NextFrameClicked);
    let (state, _) = update(state, Msg::PrevFrameClicked);

    assert_eq!(state.cursor(), 1);
    assert_eq!(state.view().frame_position, "2 / 5");
    assert_eq!(
        state.view().current_frame.as_deref(),
        Some("/data/a1b2c3d4/frames/00001.jpg")
    );
}

#[test]
fn boundary_noop_does_not_request_a_render() {
    let mut state = session_with_frames(2);
    state.consume_dirty();

    let (mut state, _) = update(state, Msg::PrevFrameClicked);
    assert!(!state.consume_dirty());

    let (mut state, _) = update(state, Msg::NextFrameClicked);
    assert!(state.consume_dirty());
}

#[test]
fn cursor_walks_frames_and_masks_in_lockstep() {
    let state = session_with_frames(4);
    let masks = (0..4)
        .map(|i| MaskRef(format!("/data/a1b2c3d4/masks/{i:05}.png")))
        .collect();
    let (state, _) = update(state, Msg::MasksListed(masks));

    let (state, _) = update(state, Msg::NextFrameClicked);
    let (state, _) = update(state, Msg::NextFrameClicked);
    let (state, _) = update(state, Msg::NextFrameClicked);

    let view = state.view();
    assert_eq!(view.frame_position, "4 / 4");
    assert_eq!(
        view.current_frame.as_deref(),
        Some("/data/a1b2c3d4/frames/00003.jpg")
    );
    assert_eq!(
        view.current_mask.as_deref(),
        Some("/data/a1b2c3d4/masks/00003.png")
    );
}
