//! Maskbench engine: annotation service client, status polling, and effect
//! execution on a dedicated runtime thread.
mod api;
mod engine;
mod persist;
mod poller;
mod types;

pub use api::{AnnotationApi, ApiError, ArtifactFile, ClientSettings, HttpAnnotationApi};
pub use engine::{EngineHandle, EngineSettings};
pub use persist::{ensure_export_dir, ArchiveWriter, PersistError};
pub use poller::watch_status;
pub use types::{EngineEvent, WatchOutcome};
