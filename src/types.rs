use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of activity a run removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[value(name = "posts", alias = "post")]
    Post,
    #[value(name = "comments", alias = "comment")]
    Comment,
    #[value(name = "reactions", alias = "reaction", alias = "likes")]
    Reaction,
}

impl Role {
    /// Reactions are toggled off; posts and comments go through the delete menu.
    pub fn is_deletion(self) -> bool {
        !matches!(self, Role::Reaction)
    }

    /// Activity-feed path appended to a profile URL.
    pub fn activity_path(self) -> &'static str {
        match self {
            Role::Post => "recent-activity/all/",
            Role::Comment => "recent-activity/comments/",
            Role::Reaction => "recent-activity/reactions/",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Post => "post",
            Role::Comment => "comment",
            Role::Reaction => "reaction",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-effort content fingerprint of an item. The platform assigns no durable
/// id we can rely on, so this is rebuilt from the page on every enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    pub const MAX_FINGERPRINT_CHARS: usize = 200;

    /// `occurrence` separates items whose fingerprints collide within one
    /// enumeration (0 for the first, 1 for the second, ...).
    pub fn from_fingerprint(role: Role, fingerprint: &str, occurrence: usize) -> Self {
        let normalized = normalize_fingerprint(fingerprint);
        Identity(format!("{}:{}#{}", role.as_str(), normalized, occurrence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapses whitespace and truncates to [`Identity::MAX_FINGERPRINT_CHARS`].
pub fn normalize_fingerprint(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(Identity::MAX_FINGERPRINT_CHARS)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Preserved,
    Processed,
    Failed,
}

/// One deletable or unlikeable unit on the page. Holds no element handle:
/// every action re-locates its target from `fingerprint` and `copy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub role: Role,
    pub identity: Identity,
    pub status: ItemStatus,
    pub position: usize,
    /// Normalized fingerprint, shared by identical-looking items.
    pub fingerprint: String,
    /// Which of the items with this fingerprint, in page order, at the time
    /// it was handed out.
    pub copy: usize,
}

/// Classification of the current page render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageState {
    Ok,
    Empty,
    ErrorPage,
}

/// What the loop has to do before it may act again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Continue,
    Reload,
    Finish,
}

impl PageState {
    /// `confirmed` says whether the page has been reloaded since the last
    /// item was acted on. An empty render only ends the run once it has
    /// survived such a reload.
    pub fn recovery(self, confirmed: bool) -> Recovery {
        match self {
            PageState::Ok => Recovery::Continue,
            PageState::ErrorPage => Recovery::Reload,
            PageState::Empty if confirmed => Recovery::Finish,
            PageState::Empty => Recovery::Reload,
        }
    }
}

/// Per-run tallies, owned by the deletion loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub processed_count: u64,
    pub failed_count: u64,
    /// Subset of `failed_count`: the menu had no delete entry.
    pub restricted_count: u64,
    pub since_last_refresh: u32,
    pub skipped_preserved_count: u64,
    pub refresh_count: u64,
    pub error_page_reloads: u64,
}

impl RunCounters {
    /// Items handed to the executor so far.
    pub fn dispatched(&self) -> u64 {
        self.processed_count + self.failed_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted(AbortReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortReason {
    Interrupted,
    ErrorPageBudget,
    SessionLost(String),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Interrupted => f.write_str("interrupted by operator"),
            AbortReason::ErrorPageBudget => f.write_str("page kept rendering an error"),
            AbortReason::SessionLost(msg) => write!(f, "browser session lost: {msg}"),
        }
    }
}

/// Emitted when the loop reaches `Completed` or `Aborted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub role: Role,
    pub state: RunState,
    pub processed: u64,
    pub preserved: u64,
    pub failed: u64,
    pub restricted: u64,
    pub refreshes: u64,
}

impl RunSummary {
    pub fn from_counters(role: Role, state: RunState, counters: &RunCounters) -> Self {
        Self {
            role,
            state,
            processed: counters.processed_count,
            preserved: counters.skipped_preserved_count,
            failed: counters.failed_count,
            restricted: counters.restricted_count,
            refreshes: counters.refresh_count,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }
}
