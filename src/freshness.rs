use tracing::warn;

use crate::error::DomError;
use crate::page::DomAccessor;
use crate::types::PageState;

/// Tells a broken render apart from a feed that has simply run out.
///
/// A visible error banner always wins: the platform sometimes serves its
/// error template with no items at all, and treating that as "nothing left"
/// would end the run early.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreshnessGuard;

impl FreshnessGuard {
    pub fn new() -> Self {
        Self
    }

    /// `on_page` is how many items of the role the last enumeration saw,
    /// handled or not; `growth_exhausted` says whether every scroll/load-more
    /// attempt has already been spent.
    ///
    /// `Empty` only means nothing rendered. Whether that is the end of the
    /// feed or a blank render is for the caller to confirm with a reload.
    pub fn classify<D: DomAccessor>(
        &self,
        dom: &mut D,
        on_page: usize,
        growth_exhausted: bool,
    ) -> Result<PageState, DomError> {
        if dom.error_banner_visible()? {
            warn!(on_page, "error banner visible");
            return Ok(PageState::ErrorPage);
        }
        if on_page == 0 && growth_exhausted {
            return Ok(PageState::Empty);
        }
        Ok(PageState::Ok)
    }
}
