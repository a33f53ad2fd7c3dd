use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{Pacing, RunConfig};
use crate::enumerator::{copies_of, is_pressed};
use crate::error::DomError;
use crate::page::{Control, DomAccessor, wait_for};
use crate::types::{Item, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The item vanished before we could act. The goal is already met.
    ElementNotFound,
    /// The click did not produce the expected page change.
    ActionRejected,
    /// A confirmation dialog showed up where none belonged.
    DialogUnexpected,
    /// The overflow menu offered no delete entry: not the user's content.
    NoDeleteOption,
    Timeout,
}

impl FailureReason {
    pub fn counts_as_success(self) -> bool {
        matches!(self, FailureReason::ElementNotFound)
    }

    fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureReason::ActionRejected | FailureReason::DialogUnexpected | FailureReason::Timeout
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureReason::ElementNotFound => "element-not-found",
            FailureReason::ActionRejected => "action-rejected",
            FailureReason::DialogUnexpected => "dialog-unexpected",
            FailureReason::NoDeleteOption => "no-delete-option",
            FailureReason::Timeout => "timeout",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Success,
    Failure(FailureReason),
}

impl ActionOutcome {
    pub fn is_success(self) -> bool {
        match self {
            ActionOutcome::Success => true,
            ActionOutcome::Failure(reason) => reason.counts_as_success(),
        }
    }
}

/// Deletes or unlikes one item and checks that it took.
pub struct ActionExecutor {
    max_attempts: u32,
    verify_polls: u32,
    pacing: Pacing,
}

impl ActionExecutor {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            verify_polls: config.verify_polls.max(1),
            pacing: config.pacing.clone(),
        }
    }

    /// Per-item problems come back as [`ActionOutcome::Failure`]; only a lost
    /// session is returned as an error.
    pub fn apply<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
    ) -> Result<ActionOutcome, DomError> {
        let mut last = FailureReason::ActionRejected;
        let mut baseline = None;
        for attempt in 1..=self.max_attempts {
            let result = if item.role.is_deletion() {
                self.delete_once(dom, item, &mut baseline)
            } else {
                self.unlike_once(dom, item)
            };
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err) if err.is_session_lost() => return Err(err),
                Err(DomError::Stale) => {
                    debug!(identity = %item.identity, attempt, "target went stale, re-locating");
                    ActionOutcome::Failure(FailureReason::ActionRejected)
                }
                Err(DomError::Timeout(what)) => {
                    warn!(identity = %item.identity, attempt, %what, "timed out");
                    ActionOutcome::Failure(FailureReason::Timeout)
                }
                Err(err) => {
                    warn!(identity = %item.identity, attempt, error = %err, "action failed");
                    ActionOutcome::Failure(FailureReason::ActionRejected)
                }
            };
            match outcome {
                ActionOutcome::Failure(reason) if reason.is_retryable() => {
                    if attempt < self.max_attempts {
                        warn!(identity = %item.identity, attempt, %reason, "retrying");
                        std::thread::sleep(self.pacing.scroll_settle);
                    }
                    last = reason;
                }
                done => return Ok(done),
            }
        }
        Ok(ActionOutcome::Failure(last))
    }

    /// The dispatched copy of `item`, if it is still on the page, and how many
    /// items currently share its fingerprint.
    fn locate<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
    ) -> Result<(Option<D::Handle>, usize), DomError> {
        let copies = copies_of(dom, item.role, &item.fingerprint)?;
        let count = copies.len();
        Ok((copies.into_iter().nth(item.copy).map(|located| located.handle), count))
    }

    /// Finds a reaction toggle. The fingerprint takes in text around the
    /// toggle, reaction counts included, so when it no longer matches the
    /// target is looked up at its enumerated position instead.
    fn locate_toggle<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
        expand: bool,
    ) -> Result<Option<D::Handle>, DomError> {
        if let (Some(handle), _) = self.locate(dom, item)? {
            return Ok(Some(handle));
        }
        if expand && dom.load_more(Role::Reaction)? > 0 {
            std::thread::sleep(self.pacing.scroll_settle);
            if let (Some(handle), _) = self.locate(dom, item)? {
                return Ok(Some(handle));
            }
        }
        debug!(identity = %item.identity, position = item.position, "re-locating toggle by position");
        Ok(dom.find_items(item.role)?.into_iter().nth(item.position))
    }

    fn wait_control<D: DomAccessor>(
        &self,
        dom: &mut D,
        control: Control,
    ) -> Result<Option<D::Handle>, DomError> {
        wait_for(self.pacing.control_timeout, self.pacing.poll_interval, || {
            dom.find_control(None, control)
        })
    }

    /// `baseline` is the number of copies of the fingerprint when the first
    /// attempt started. Identical items shift into the removed one's place,
    /// so removal is verified by the count dropping, not by the copy vanishing.
    fn delete_once<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
        baseline: &mut Option<usize>,
    ) -> Result<ActionOutcome, DomError> {
        let (target, count) = self.locate(dom, item)?;
        let before = *baseline.get_or_insert(count);
        if count < before {
            info!(identity = %item.identity, "earlier attempt went through");
            return Ok(ActionOutcome::Success);
        }
        let Some(target) = target else {
            info!(identity = %item.identity, "item already gone");
            return Ok(ActionOutcome::Failure(FailureReason::ElementNotFound));
        };

        if dom.find_control(None, Control::ConfirmButton)?.is_some() {
            warn!("a confirmation dialog was already open, dismissing it");
            dom.dismiss_overlays()?;
            return Ok(ActionOutcome::Failure(FailureReason::DialogUnexpected));
        }

        let Some(menu) = dom.find_control(Some(&target), Control::OverflowMenu)? else {
            warn!(identity = %item.identity, "no overflow menu on item");
            return Ok(ActionOutcome::Failure(FailureReason::ActionRejected));
        };

        let url = dom.current_url()?;
        dom.click(&menu)?;
        if dom.current_url()? != url {
            warn!("menu click opened the item instead, going back");
            dom.go_back()?;
            std::thread::sleep(self.pacing.reload_settle);
            return Ok(ActionOutcome::Failure(FailureReason::ActionRejected));
        }

        let Some(delete) = self.wait_control(dom, Control::DeleteOption)? else {
            info!(identity = %item.identity, "menu has no delete entry");
            dom.dismiss_overlays()?;
            return Ok(ActionOutcome::Failure(FailureReason::NoDeleteOption));
        };
        dom.click(&delete)?;

        match self.wait_control(dom, Control::ConfirmButton)? {
            Some(confirm) => dom.click(&confirm)?,
            None => debug!("no confirmation dialog for this variant"),
        }

        for poll in 1..=self.verify_polls {
            let (_, remaining) = self.locate(dom, item)?;
            if remaining < before {
                info!(identity = %item.identity, "deleted");
                return Ok(ActionOutcome::Success);
            }
            debug!(poll, remaining, "item still on page");
            std::thread::sleep(self.pacing.poll_interval);
        }
        Ok(ActionOutcome::Failure(FailureReason::ActionRejected))
    }

    fn unlike_once<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
    ) -> Result<ActionOutcome, DomError> {
        let Some(target) = self.locate_toggle(dom, item, true)? else {
            info!(identity = %item.identity, "reaction target already gone");
            return Ok(ActionOutcome::Failure(FailureReason::ElementNotFound));
        };

        if !is_pressed(dom, &target)? {
            info!(identity = %item.identity, "already not pressed");
            return Ok(ActionOutcome::Success);
        }

        dom.click(&target)?;

        if dom.find_control(None, Control::ConfirmButton)?.is_some() {
            warn!("unlike opened a dialog, dismissing it");
            dom.dismiss_overlays()?;
            return Ok(ActionOutcome::Failure(FailureReason::DialogUnexpected));
        }

        // The toggle sometimes ignores the click, so read the attribute back.
        for poll in 1..=self.verify_polls {
            match self.toggle_state(dom, item, &target)? {
                Some(false) => {
                    info!(identity = %item.identity, "unliked");
                    return Ok(ActionOutcome::Success);
                }
                Some(true) => debug!(poll, "toggle still pressed"),
                None => debug!(poll, "toggle not found after click"),
            }
            std::thread::sleep(self.pacing.poll_interval);
        }
        Ok(ActionOutcome::Failure(FailureReason::ActionRejected))
    }

    /// Reads the toggle through the clicked handle while it still resolves,
    /// and re-locates it once the page has re-rendered.
    fn toggle_state<D: DomAccessor>(
        &self,
        dom: &mut D,
        item: &Item,
        clicked: &D::Handle,
    ) -> Result<Option<bool>, DomError> {
        match is_pressed(dom, clicked) {
            Ok(pressed) => return Ok(Some(pressed)),
            Err(DomError::Stale) => {}
            Err(err) => return Err(err),
        }
        match self.locate_toggle(dom, item, false)? {
            Some(current) => Ok(Some(is_pressed(dom, &current)?)),
            None => Ok(None),
        }
    }
}
