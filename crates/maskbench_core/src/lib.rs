//! Maskbench core: pure session state machine and view-model helpers.
mod effect;
mod fault;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use fault::Fault;
pub use msg::Msg;
pub use state::{
    FrameRef, JobId, LabelsMode, MaskRef, PropagationPhase, PropagationStats, RemoteStatus,
    SessionState, StatusReport, UploadKind,
};
pub use update::update;
pub use view_model::SessionViewModel;
