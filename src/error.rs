use thiserror::Error;

/// Failures reported by a [`crate::page::DomAccessor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The handle no longer points at a live element (the page reflowed).
    #[error("element reference is stale")]
    Stale,

    #[error("timed out waiting for {0}")]
    Timeout(String),

    /// The browser or its connection is gone. Only this one aborts a run.
    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("browser call failed: {0}")]
    Browser(String),
}

impl DomError {
    pub fn is_session_lost(&self) -> bool {
        matches!(self, DomError::SessionLost(_))
    }

    /// Sorts an error coming out of `headless_chrome` into the variants above.
    pub fn from_browser(err: anyhow::Error) -> Self {
        let msg = format!("{err:#}");
        let lower = msg.to_lowercase();
        if lower.contains("no element found")
            || lower.contains("could not find node")
            || lower.contains("node is detached")
            || lower.contains("stale")
        {
            DomError::Stale
        } else if lower.contains("timeout") || lower.contains("timed out") {
            DomError::Timeout(msg)
        } else if lower.contains("connection is closed")
            || lower.contains("channel closed")
            || lower.contains("target closed")
            || lower.contains("browser closed")
        {
            DomError::SessionLost(msg)
        } else {
            DomError::Browser(msg)
        }
    }
}

/// Session-level conditions that end a run early.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("page still rendered an error after {reloads} reloads")]
    ErrorPageBudget { reloads: u32 },

    #[error("run interrupted by operator")]
    Interrupted,

    #[error(transparent)]
    Session(#[from] DomError),
}
