use std::fmt;

/// Client-side failure taxonomy. Faults are rendered into the session notes
/// at the operation boundary; they never abort the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// An operation that needs an active job was attempted without one.
    /// Raised before any network traffic.
    Precondition(String),
    /// A problem with a local file: not selected, or unreadable.
    Input(String),
    /// The service answered non-2xx; carries its diagnostic when it sent one.
    Service { detail: Option<String> },
    /// The request never completed, so the remote outcome is unknown.
    Transport(String),
}

impl Fault {
    pub fn no_active_job() -> Self {
        Fault::Precondition("No active job. Create a job first.".to_string())
    }

    /// Diagnostic text for the operator: the service detail verbatim when
    /// present, otherwise the per-operation fallback.
    pub fn describe(&self, fallback: &str) -> String {
        match self {
            Fault::Precondition(text) | Fault::Input(text) | Fault::Transport(text) => {
                text.clone()
            }
            Fault::Service { detail: Some(detail) } => detail.clone(),
            Fault::Service { detail: None } => fallback.to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Precondition(text) | Fault::Input(text) => f.write_str(text),
            Fault::Service { detail: Some(detail) } => write!(f, "service error: {detail}"),
            Fault::Service { detail: None } => f.write_str("service error"),
            Fault::Transport(text) => write!(f, "transport error: {text}"),
        }
    }
}
