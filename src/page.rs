use std::fmt;
use std::time::{Duration, Instant};

use crate::error::DomError;
use crate::types::Role;

/// Page controls the executor needs besides the items themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// The "..." button attached to an item.
    OverflowMenu,
    /// The delete entry inside an open overflow menu.
    DeleteOption,
    /// The primary button of a delete confirmation dialog.
    ConfirmButton,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAmount {
    Pixels(u32),
    /// All the way to the end of the document in the given direction.
    ToEnd,
}

/// Capability surface over a rendered page. The core never sees markup, only
/// this trait; concrete selectors live in the implementation.
///
/// Handles are only valid until the next page mutation. Implementations
/// return [`DomError::Stale`] when an outdated handle is used.
pub trait DomAccessor {
    type Handle: Clone + fmt::Debug;

    /// Current items of `role`, in page order.
    fn find_items(&mut self, role: Role) -> Result<Vec<Self::Handle>, DomError>;

    /// Raw text the identity of an item is derived from.
    fn fingerprint(&mut self, item: &Self::Handle) -> Result<String, DomError>;

    /// Locates a control, inside `scope` when given, else anywhere on the page.
    fn find_control(
        &mut self,
        scope: Option<&Self::Handle>,
        control: Control,
    ) -> Result<Option<Self::Handle>, DomError>;

    fn read_attribute(
        &mut self,
        element: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>, DomError>;

    fn click(&mut self, element: &Self::Handle) -> Result<(), DomError>;

    fn scroll(&mut self, direction: ScrollDirection, amount: ScrollAmount) -> Result<(), DomError>;

    fn page_height(&mut self) -> Result<u64, DomError>;

    /// Clicks every visible "show more" style control relevant to `role`
    /// (previous comments, previous replies, collapsed threads). Returns how
    /// many were clicked.
    fn load_more(&mut self, role: Role) -> Result<usize, DomError>;

    fn error_banner_visible(&mut self) -> Result<bool, DomError>;

    /// Closes open menus and dialogs without confirming anything.
    fn dismiss_overlays(&mut self) -> Result<(), DomError>;

    fn go_back(&mut self) -> Result<(), DomError>;

    fn reload_page(&mut self) -> Result<(), DomError>;

    fn current_url(&mut self) -> Result<String, DomError>;
}

/// Polls `check` until it yields a value or `timeout` runs out. The check runs
/// at least once, so a zero timeout is a single check.
pub fn wait_for<T>(
    timeout: Duration,
    interval: Duration,
    mut check: impl FnMut() -> Result<Option<T>, DomError>,
) -> Result<Option<T>, DomError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(found) = check()? {
            return Ok(Some(found));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(interval);
    }
}
