//! In-memory activity feed implementing `DomAccessor`.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use activity_purge::{Control, DomAccessor, DomError, Pacing, Role, RunConfig, ScrollAmount, ScrollDirection};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

/// Config with no sleeping, suitable for the fake feed.
pub fn fast_config(role: Role) -> RunConfig {
    RunConfig::new(role).with_pacing(Pacing::immediate())
}

const ACTIVITY_URL: &str = "https://feed.test/in/me/recent-activity/all/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Click(String),
    Deleted(String),
    Toggled { text: String, pressed: bool },
    Scroll,
    Reload,
    Back,
    Dismiss,
}

#[derive(Debug, Clone)]
pub struct FakeItem {
    pub text: String,
    pub pressed: bool,
    pub deletable: bool,
    pub confirm: bool,
    /// Clicks on the toggle are swallowed.
    pub stuck: bool,
    /// Comes back after the next reload even though it was deleted.
    pub resurrects: bool,
    /// Each toggle click changes the text around it, like a reaction count.
    pub relabels: bool,
    /// The first overflow-menu click opens the item's own page.
    pub menu_navigates: bool,
    /// The first toggle click opens a dialog instead of toggling.
    pub prompts_on_unlike: bool,
}

impl FakeItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pressed: true,
            deletable: true,
            confirm: true,
            stuck: false,
            resurrects: false,
            relabels: false,
            menu_navigates: false,
            prompts_on_unlike: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Item,
    Menu,
    DeleteOption,
    Confirm,
}

/// Handles carry the render generation; any mutation bumps it, so old
/// handles go stale the way real element references do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    kind: Kind,
    index: usize,
    generation: u64,
}

#[derive(Debug)]
pub struct FeedState {
    pub role: Role,
    pub items: Vec<FakeItem>,
    pub page_size: usize,
    pub loaded: usize,
    pub generation: u64,
    pub error_renders_left: u32,
    /// Renders with no items and no error banner.
    pub blank_renders_left: u32,
    pub always_error: bool,
    pub session_lost: bool,
    /// Handed out, in order, instead of performing the next clicks.
    pub click_faults: VecDeque<DomError>,
    pub menu_open: Option<usize>,
    pub dialog_for: Option<usize>,
    pub ghosts: Vec<FakeItem>,
    pub events: Vec<Event>,
    pub url: String,
}

impl FeedState {
    fn bump(&mut self) {
        self.generation += 1;
    }

    fn visible(&self) -> usize {
        if self.error_rendered() || self.blank_renders_left > 0 {
            0
        } else {
            self.loaded.min(self.items.len())
        }
    }

    fn error_rendered(&self) -> bool {
        self.always_error || self.error_renders_left > 0
    }

    fn check(&self, handle: &FakeHandle) -> Result<(), DomError> {
        if handle.generation != self.generation || handle.index >= self.visible() {
            return Err(DomError::Stale);
        }
        Ok(())
    }

    fn handle(&self, kind: Kind, index: usize) -> FakeHandle {
        FakeHandle {
            kind,
            index,
            generation: self.generation,
        }
    }

    fn remove(&mut self, index: usize) {
        let item = self.items.remove(index);
        self.events.push(Event::Deleted(item.text.clone()));
        if item.resurrects {
            self.ghosts.push(item);
        }
        self.menu_open = None;
        self.dialog_for = None;
        self.bump();
    }
}

#[derive(Clone)]
pub struct FakeFeed {
    state: Rc<RefCell<FeedState>>,
}

impl FakeFeed {
    pub fn new(role: Role, items: Vec<FakeItem>) -> Self {
        let page_size = items.len().max(1);
        Self {
            state: Rc::new(RefCell::new(FeedState {
                role,
                items,
                page_size,
                loaded: page_size,
                generation: 0,
                error_renders_left: 0,
                blank_renders_left: 0,
                always_error: false,
                session_lost: false,
                click_faults: VecDeque::new(),
                menu_open: None,
                dialog_for: None,
                ghosts: Vec::new(),
                events: Vec::new(),
                url: ACTIVITY_URL.to_string(),
            })),
        }
    }

    pub fn with_texts(role: Role, count: usize) -> Self {
        let items = (1..=count).map(|n| FakeItem::new(format!("{role} {n}"))).collect();
        Self::new(role, items)
    }

    /// Only `size` items are rendered until the page is scrolled.
    pub fn paged(self, size: usize) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.page_size = size.max(1);
            s.loaded = s.page_size;
        }
        self
    }

    pub fn erroring_for(self, renders: u32) -> Self {
        self.state.borrow_mut().error_renders_left = renders;
        self
    }

    /// Renders nothing at all, without an error banner, until reloaded.
    pub fn blank_for(self, renders: u32) -> Self {
        self.state.borrow_mut().blank_renders_left = renders;
        self
    }

    pub fn failing_clicks(self, faults: Vec<DomError>) -> Self {
        self.state.borrow_mut().click_faults = faults.into();
        self
    }

    pub fn session_lost(self) -> Self {
        self.state.borrow_mut().session_lost = true;
        self
    }

    pub fn always_erroring(self) -> Self {
        self.state.borrow_mut().always_error = true;
        self
    }

    pub fn state(&self) -> std::cell::RefMut<'_, FeedState> {
        self.state.borrow_mut()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn reloads(&self) -> usize {
        self.count(|e| matches!(e, Event::Reload))
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Deleted(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clicks(&self) -> usize {
        self.count(|e| matches!(e, Event::Click(_)))
    }

    pub fn remaining(&self) -> Vec<String> {
        self.state.borrow().items.iter().map(|i| i.text.clone()).collect()
    }

    fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.state.borrow().events.iter().filter(|e| pred(e)).count()
    }
}

impl DomAccessor for FakeFeed {
    type Handle = FakeHandle;

    fn find_items(&mut self, role: Role) -> Result<Vec<FakeHandle>, DomError> {
        let s = self.state.borrow();
        if s.session_lost {
            return Err(DomError::SessionLost("browser went away".to_string()));
        }
        if role != s.role {
            return Ok(Vec::new());
        }
        Ok((0..s.visible()).map(|i| s.handle(Kind::Item, i)).collect())
    }

    fn fingerprint(&mut self, item: &FakeHandle) -> Result<String, DomError> {
        let s = self.state.borrow();
        s.check(item)?;
        Ok(s.items[item.index].text.clone())
    }

    fn find_control(
        &mut self,
        scope: Option<&FakeHandle>,
        control: Control,
    ) -> Result<Option<FakeHandle>, DomError> {
        let s = self.state.borrow();
        match (control, scope) {
            (Control::OverflowMenu, Some(item)) => {
                s.check(item)?;
                Ok(Some(s.handle(Kind::Menu, item.index)))
            }
            (Control::DeleteOption, _) => Ok(s
                .menu_open
                .filter(|&i| s.items.get(i).is_some_and(|it| it.deletable))
                .map(|i| s.handle(Kind::DeleteOption, i))),
            (Control::ConfirmButton, _) => Ok(s.dialog_for.map(|i| s.handle(Kind::Confirm, i))),
            (Control::OverflowMenu, None) => Ok(None),
        }
    }

    fn read_attribute(&mut self, element: &FakeHandle, name: &str) -> Result<Option<String>, DomError> {
        let s = self.state.borrow();
        s.check(element)?;
        Ok(match name {
            "aria-pressed" => Some(s.items[element.index].pressed.to_string()),
            _ => None,
        })
    }

    fn click(&mut self, element: &FakeHandle) -> Result<(), DomError> {
        let mut s = self.state.borrow_mut();
        s.check(element)?;
        if let Some(fault) = s.click_faults.pop_front() {
            return Err(fault);
        }
        let index = element.index;
        let text = s.items[index].text.clone();
        s.events.push(Event::Click(text.clone()));
        match element.kind {
            Kind::Item => {
                if s.items[index].prompts_on_unlike {
                    s.items[index].prompts_on_unlike = false;
                    s.dialog_for = Some(index);
                } else if !s.items[index].stuck {
                    let pressed = !s.items[index].pressed;
                    s.items[index].pressed = pressed;
                    s.events.push(Event::Toggled { text, pressed });
                    s.bump();
                }
                if s.items[index].relabels {
                    s.items[index].text.push_str(" +1");
                    s.bump();
                }
            }
            Kind::Menu if s.items[index].menu_navigates => {
                s.items[index].menu_navigates = false;
                s.url = format!("https://feed.test/feed/update/{index}/");
                s.bump();
            }
            Kind::Menu => s.menu_open = Some(index),
            Kind::DeleteOption => {
                s.menu_open = None;
                if s.items[index].confirm {
                    s.dialog_for = Some(index);
                } else {
                    s.remove(index);
                }
            }
            Kind::Confirm => s.remove(index),
        }
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection, _amount: ScrollAmount) -> Result<(), DomError> {
        let mut s = self.state.borrow_mut();
        s.events.push(Event::Scroll);
        if direction == ScrollDirection::Down && !s.error_rendered() {
            s.loaded = (s.loaded + s.page_size).min(s.items.len().max(s.page_size));
        }
        Ok(())
    }

    fn page_height(&mut self) -> Result<u64, DomError> {
        Ok(self.state.borrow().visible() as u64 * 100)
    }

    fn load_more(&mut self, _role: Role) -> Result<usize, DomError> {
        Ok(0)
    }

    fn error_banner_visible(&mut self) -> Result<bool, DomError> {
        Ok(self.state.borrow().error_rendered())
    }

    fn dismiss_overlays(&mut self) -> Result<(), DomError> {
        let mut s = self.state.borrow_mut();
        s.menu_open = None;
        s.dialog_for = None;
        s.events.push(Event::Dismiss);
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), DomError> {
        let mut s = self.state.borrow_mut();
        s.events.push(Event::Back);
        s.url = ACTIVITY_URL.to_string();
        s.bump();
        Ok(())
    }

    fn reload_page(&mut self) -> Result<(), DomError> {
        let mut s = self.state.borrow_mut();
        s.events.push(Event::Reload);
        s.error_renders_left = s.error_renders_left.saturating_sub(1);
        s.blank_renders_left = s.blank_renders_left.saturating_sub(1);
        let ghosts = std::mem::take(&mut s.ghosts);
        for (offset, ghost) in ghosts.into_iter().enumerate() {
            let at = offset.min(s.items.len());
            s.items.insert(at, ghost);
        }
        s.loaded = s.page_size;
        s.menu_open = None;
        s.dialog_for = None;
        s.bump();
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, DomError> {
        Ok(self.state.borrow().url.clone())
    }
}
