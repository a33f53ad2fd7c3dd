//! Removes a user's own posts, comments and reactions from an
//! infinitely-scrolling activity feed, one item at a time, through a
//! browser page that offers no bulk delete.
//!
//! The loop itself ([`DeletionLoop`]) only talks to the page through the
//! [`DomAccessor`] trait; [`ChromeDom`] implements it over `headless_chrome`.

pub mod cli;
pub mod config;
pub mod deletion_loop;
pub mod dom;
pub mod enumerator;
pub mod error;
pub mod executor;
pub mod freshness;
pub mod gate;
pub mod hands;
pub mod locator;
pub mod page;
pub mod throttle;
pub mod types;

pub use config::{Pacing, RunConfig};
pub use deletion_loop::{CancelToken, DeletionLoop};
pub use dom::ChromeDom;
pub use enumerator::{ContentEnumerator, Next};
pub use error::{DomError, RunError};
pub use executor::{ActionExecutor, ActionOutcome, FailureReason};
pub use freshness::FreshnessGuard;
pub use gate::{OnOpen, PromptGate, Ready, ReadinessGate};
pub use locator::{LocatorSet, LocatorStrategy};
pub use page::{Control, DomAccessor, ScrollAmount, ScrollDirection};
pub use throttle::ThrottleController;
pub use types::{
    AbortReason, Identity, Item, ItemStatus, PageState, Recovery, Role, RunCounters, RunState,
    RunSummary,
};
