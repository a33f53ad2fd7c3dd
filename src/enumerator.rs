use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::error::DomError;
use crate::freshness::FreshnessGuard;
use crate::page::{DomAccessor, ScrollAmount, ScrollDirection};
use crate::types::{Identity, Item, ItemStatus, PageState, Recovery, Role, normalize_fingerprint};

/// Attempts at reading a consistent list while the page keeps reflowing.
const SNAPSHOT_RETRIES: usize = 3;

/// An item found by one enumeration. The handle dies with the next mutation.
#[derive(Debug, Clone)]
pub struct Located<H> {
    pub identity: Identity,
    pub handle: H,
    pub position: usize,
    pub fingerprint: String,
    /// Index among the items sharing `fingerprint`, in page order.
    pub copy: usize,
}

/// Queries every item of `role` and derives its identity.
pub fn snapshot<D: DomAccessor>(
    dom: &mut D,
    role: Role,
) -> Result<Vec<Located<D::Handle>>, DomError> {
    let mut attempt = 0;
    loop {
        match try_snapshot(dom, role) {
            Err(DomError::Stale) if attempt + 1 < SNAPSHOT_RETRIES => {
                attempt += 1;
                debug!(attempt, "page reflowed during enumeration, querying again");
            }
            other => return other,
        }
    }
}

fn try_snapshot<D: DomAccessor>(
    dom: &mut D,
    role: Role,
) -> Result<Vec<Located<D::Handle>>, DomError> {
    let handles = dom.find_items(role)?;
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut located = Vec::with_capacity(handles.len());
    for (position, handle) in handles.into_iter().enumerate() {
        let fingerprint = normalize_fingerprint(&dom.fingerprint(&handle)?);
        let seen_before = occurrences.entry(fingerprint.clone()).or_insert(0);
        let copy = *seen_before;
        *seen_before += 1;
        located.push(Located {
            identity: Identity::from_fingerprint(role, &fingerprint, copy),
            handle,
            position,
            fingerprint,
            copy,
        });
    }
    Ok(located)
}

/// Every item of `role` currently showing `fingerprint`, in page order.
pub fn copies_of<D: DomAccessor>(
    dom: &mut D,
    role: Role,
    fingerprint: &str,
) -> Result<Vec<Located<D::Handle>>, DomError> {
    Ok(snapshot(dom, role)?
        .into_iter()
        .filter(|located| located.fingerprint == fingerprint)
        .collect())
}

pub fn is_pressed<D: DomAccessor>(dom: &mut D, handle: &D::Handle) -> Result<bool, DomError> {
    Ok(dom.read_attribute(handle, "aria-pressed")?.as_deref() == Some("true"))
}

/// Result of one [`ContentEnumerator::next_item`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Next {
    /// Hand this to the executor.
    Item(Item),
    /// Kept by the preservation policy; reported once so it can be counted.
    Preserved(Item),
    /// The page rendered the error template; reload before anything else.
    PageError,
    /// Nothing of the role rendered at all and no reload since the last
    /// dispatched item has confirmed it. Reload, then ask again.
    BlankPage,
    EndOfContent,
}

/// Copies of one fingerprint: the most seen on the page at once, and how
/// many of those the run has removed.
#[derive(Debug, Default, Clone, Copy)]
struct CopyTally {
    peak: usize,
    removed: usize,
}

impl CopyTally {
    /// Stable occurrence number for the `copy`-th visible item. Removed
    /// copies no longer take up the low numbers; anything beyond the copies
    /// still owed is a removed one rendered again and maps back onto it.
    fn occurrence(self, copy: usize) -> usize {
        let owed = self.peak.saturating_sub(self.removed);
        if copy < owed {
            self.removed + copy
        } else {
            (copy - owed).min(self.removed.saturating_sub(1))
        }
    }
}

/// Walks the feed and hands out each identity at most once per run.
pub struct ContentEnumerator {
    role: Role,
    preserve_first: usize,
    post_refresh_rounds: u32,
    stall_limit: u32,
    round_limit: u32,
    scroll_settle: Duration,
    seen: HashMap<Identity, ItemStatus>,
    tallies: HashMap<String, CopyTally>,
    reloaded_since_dispatch: bool,
    preservation_fixed: bool,
    preserved_queue: VecDeque<Item>,
    pending_aggressive_rounds: u32,
}

impl ContentEnumerator {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            role: config.role,
            preserve_first: config.preserve_first,
            post_refresh_rounds: config.post_refresh_scroll_rounds,
            stall_limit: config.growth_stall_limit,
            round_limit: config.growth_round_limit,
            scroll_settle: config.pacing.scroll_settle,
            seen: HashMap::new(),
            tallies: HashMap::new(),
            reloaded_since_dispatch: false,
            preservation_fixed: false,
            preserved_queue: VecDeque::new(),
            pending_aggressive_rounds: config.initial_scroll_rounds,
        }
    }

    pub fn next_item<D: DomAccessor>(
        &mut self,
        dom: &mut D,
        guard: &FreshnessGuard,
    ) -> Result<Next, DomError> {
        if let Some(item) = self.preserved_queue.pop_front() {
            return Ok(Next::Preserved(item));
        }

        let mut stalls = 0;
        let mut rounds = 0;
        loop {
            let (on_page, found) = self.actionable(dom)?;
            if guard.classify(dom, on_page, false)? == PageState::ErrorPage {
                return Ok(Next::PageError);
            }

            if !self.preservation_fixed && !found.is_empty() {
                self.fix_preservation(&found);
                if let Some(item) = self.preserved_queue.pop_front() {
                    return Ok(Next::Preserved(item));
                }
            }

            let fresh = found
                .into_iter()
                .find(|located| !self.seen.contains_key(&located.identity));
            if let Some(located) = fresh {
                self.seen.insert(located.identity.clone(), ItemStatus::Pending);
                self.reloaded_since_dispatch = false;
                return Ok(Next::Item(self.item(located, ItemStatus::Pending)));
            }

            if stalls >= self.stall_limit || rounds >= self.round_limit {
                let state = guard.classify(dom, on_page, true)?;
                info!(?state, rounds, on_page, "no more actionable items after growing the feed");
                return Ok(match state.recovery(self.reloaded_since_dispatch) {
                    Recovery::Continue | Recovery::Finish => Next::EndOfContent,
                    Recovery::Reload if state == PageState::ErrorPage => Next::PageError,
                    Recovery::Reload => Next::BlankPage,
                });
            }

            rounds += 1;
            if self.grow(dom)? {
                stalls = 0;
            } else {
                stalls += 1;
            }
        }
    }

    /// Records the final status of a dispatched item.
    pub fn record(&mut self, item: &Item, status: ItemStatus) {
        self.seen.insert(item.identity.clone(), status);
        if status == ItemStatus::Processed && self.role.is_deletion() {
            self.tallies
                .entry(item.fingerprint.clone())
                .or_default()
                .removed += 1;
        }
    }

    pub fn status_of(&self, identity: &Identity) -> Option<ItemStatus> {
        self.seen.get(identity).copied()
    }

    /// The next growth step after a reload is aggressive again, and an empty
    /// page seen from here on counts as confirmed.
    pub fn after_reload(&mut self) {
        self.pending_aggressive_rounds = self.post_refresh_rounds;
        self.reloaded_since_dispatch = true;
    }

    fn item<H>(&self, located: Located<H>, status: ItemStatus) -> Item {
        Item {
            role: self.role,
            identity: located.identity,
            status,
            position: located.position,
            fingerprint: located.fingerprint,
            copy: located.copy,
        }
    }

    /// Returns how many items of the role are on the page, and the ones that
    /// can still be acted on.
    fn actionable<D: DomAccessor>(
        &mut self,
        dom: &mut D,
    ) -> Result<(usize, Vec<Located<D::Handle>>), DomError> {
        let all = snapshot(dom, self.role)?;
        let on_page = all.len();
        if self.role.is_deletion() {
            return Ok((on_page, self.renumber(all)));
        }
        let mut pressed = Vec::with_capacity(all.len());
        for located in all {
            if is_pressed(dom, &located.handle)? {
                pressed.push(located);
            }
        }
        Ok((on_page, pressed))
    }

    /// Deleted items leave the page, so the copies of a repeated fingerprint
    /// shift down. Renumber them against what this run already removed.
    fn renumber<H>(&mut self, mut found: Vec<Located<H>>) -> Vec<Located<H>> {
        let mut visible: HashMap<&str, usize> = HashMap::new();
        for located in &found {
            *visible.entry(located.fingerprint.as_str()).or_insert(0) += 1;
        }
        for (fingerprint, count) in visible {
            let tally = self.tallies.entry(fingerprint.to_string()).or_default();
            tally.peak = tally.peak.max(count);
        }
        for located in &mut found {
            let tally = self.tallies[&located.fingerprint];
            let occurrence = tally.occurrence(located.copy);
            if occurrence != located.copy {
                located.identity =
                    Identity::from_fingerprint(self.role, &located.fingerprint, occurrence);
            }
        }
        found
    }

    fn fix_preservation<H: Clone>(&mut self, found: &[Located<H>]) {
        for located in found.iter().take(self.preserve_first) {
            info!(identity = %located.identity, position = located.position, "preserving item");
            self.seen
                .insert(located.identity.clone(), ItemStatus::Preserved);
            let item = self.item(located.clone(), ItemStatus::Preserved);
            self.preserved_queue.push_back(item);
        }
        self.preservation_fixed = true;
    }

    /// Scrolls and clicks "load more" controls. Returns whether the page
    /// changed at all.
    fn grow<D: DomAccessor>(&mut self, dom: &mut D) -> Result<bool, DomError> {
        let rounds = std::mem::take(&mut self.pending_aggressive_rounds).max(1);
        let before = dom.page_height()?;
        let mut clicked = 0;
        for round in 1..=rounds {
            dom.scroll(ScrollDirection::Down, ScrollAmount::ToEnd)?;
            std::thread::sleep(self.scroll_settle);
            let opened = dom.load_more(self.role)?;
            if opened > 0 {
                std::thread::sleep(self.scroll_settle);
            }
            clicked += opened;
            debug!(round, rounds, opened, "grew feed");
        }
        let after = dom.page_height()?;
        debug!(before, after, clicked, "feed growth step done");
        Ok(after != before || clicked > 0)
    }
}
