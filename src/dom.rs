use std::sync::Arc;
use std::time::Duration;

use headless_chrome::Tab;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::DomError;
use crate::locator::{LocatorSet, LocatorStrategy, first_match};
use crate::page::{Control, DomAccessor, ScrollAmount, ScrollDirection};
use crate::types::Role;

/// Stamp attribute written onto every element we hand out a handle for.
const REF_ATTR: &str = "data-purge-ref";

/// Runs one locator strategy, optionally inside a stamped scope element, and
/// stamps every match with a `data-purge-ref` token. Returns the tokens in
/// document order, or null when the scope element is gone.
const MATCH_JS: &str = r#"
(function (args) {
  const root = args.scope
    ? document.querySelector('[data-purge-ref="' + args.scope + '"]')
    : document;
  if (!root) return null;

  let nodes = [];
  if (args.strategy.kind === 'xpath') {
    const snap = document.evaluate(args.strategy.query, root, null,
      XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
    for (let i = 0; i < snap.snapshotLength; i++) nodes.push(snap.snapshotItem(i));
  } else {
    nodes = Array.from(root.querySelectorAll(args.strategy.query));
  }

  if (args.visible) {
    nodes = nodes.filter(n => n.nodeType === 1 && n.getClientRects().length > 0);
  }

  return nodes.filter(n => n.nodeType === 1).map(n => {
    if (!n.dataset.purgeRef) {
      window.__purgeSeq = (window.__purgeSeq || 0) + 1;
      n.dataset.purgeRef = 'r' + window.__purgeSeq;
    }
    return n.dataset.purgeRef;
  });
})
"#;

/// Text an item's identity is built from: the platform key of the enclosing
/// update when there is one, plus the visible text of the item's container.
const FINGERPRINT_JS: &str = r#"
(function (ref) {
  const el = document.querySelector('[data-purge-ref="' + ref + '"]');
  if (!el) return null;
  const keyed = el.closest('[data-urn], [data-id]');
  const key = keyed ? (keyed.getAttribute('data-urn') || keyed.getAttribute('data-id')) : '';
  const box = el.closest('article, li, .feed-shared-update-v2, .comments-comment-item') || el;
  const text = (box.innerText || '').replace(/\s+/g, ' ').trim().slice(0, 200);
  return key ? key + ' | ' + text : text;
})
"#;

fn selector(handle: &str) -> String {
    format!("[{REF_ATTR}=\"{handle}\"]")
}

/// Arguments go in as JSON literals, so quotes in a handle or attribute name
/// cannot break out of the script.
fn click_script(handle: &str) -> String {
    let sel = json!(selector(handle));
    format!(
        "(() => {{ const el = document.querySelector({sel}); if (!el) return false; el.click(); return true; }})()"
    )
}

fn attribute_script(handle: &str, name: &str) -> String {
    let sel = json!(selector(handle));
    let name = json!(name);
    format!(
        "(() => {{ const el = document.querySelector({sel}); return el ? [el.getAttribute({name})] : null; }})()"
    )
}

/// A `DomAccessor` over a live Chrome tab.
///
/// Handles are `data-purge-ref` tokens, not element objects, so nothing
/// keeps a DOM node alive across actions; a token whose node has been
/// removed simply stops resolving and reports [`DomError::Stale`].
pub struct ChromeDom {
    tab: Arc<Tab>,
    locators: LocatorSet,
    settle: Duration,
}

impl ChromeDom {
    pub fn new(tab: Arc<Tab>, locators: LocatorSet) -> Self {
        Self {
            tab,
            locators,
            settle: Duration::from_secs(3),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn eval(&self, script: &str) -> Result<Value, DomError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(DomError::from_browser)?;
        Ok(result.value.unwrap_or(Value::Null))
    }

    fn run_strategy(
        &self,
        strategy: &LocatorStrategy,
        scope: Option<&str>,
        visible: bool,
    ) -> Result<Vec<String>, DomError> {
        let args = json!({
            "strategy": strategy,
            "scope": scope,
            "visible": visible,
        });
        match self.eval(&format!("({MATCH_JS})({args})"))? {
            Value::Null if scope.is_some() => Err(DomError::Stale),
            Value::Array(refs) => Ok(refs
                .into_iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    fn first_of(
        &self,
        strategies: &[LocatorStrategy],
        scope: Option<&str>,
        visible: bool,
    ) -> Result<Vec<String>, DomError> {
        let hit = first_match(strategies, |s| self.run_strategy(s, scope, visible))?;
        Ok(match hit {
            Some((strategy, refs)) => {
                debug!(query = strategy.query(), count = refs.len(), "locator matched");
                refs
            }
            None => Vec::new(),
        })
    }

    fn js_click(&self, handle: &str) -> Result<(), DomError> {
        let clicked = self.eval(&click_script(handle))?;
        if clicked.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(DomError::Stale)
        }
    }

    fn wait_ready(&self) -> Result<(), DomError> {
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while std::time::Instant::now() < deadline {
            if self.eval("document.readyState")?.as_str() == Some("complete") {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(200));
        }
        warn!("page load timeout, continuing anyway");
        Ok(())
    }
}

impl DomAccessor for ChromeDom {
    type Handle = String;

    fn find_items(&mut self, role: Role) -> Result<Vec<String>, DomError> {
        self.first_of(self.locators.items(role), None, false)
    }

    fn fingerprint(&mut self, item: &String) -> Result<String, DomError> {
        match self.eval(&format!("({FINGERPRINT_JS})({})", json!(item)))? {
            Value::String(text) => Ok(text),
            _ => Err(DomError::Stale),
        }
    }

    fn find_control(
        &mut self,
        scope: Option<&String>,
        control: Control,
    ) -> Result<Option<String>, DomError> {
        let refs = self.first_of(
            self.locators.control(control),
            scope.map(String::as_str),
            true,
        )?;
        Ok(refs.into_iter().next())
    }

    fn read_attribute(&mut self, element: &String, name: &str) -> Result<Option<String>, DomError> {
        let value = self.eval(&attribute_script(element, name))?;
        match value {
            Value::Array(mut wrapped) => Ok(wrapped.pop().and_then(|v| v.as_str().map(String::from))),
            _ => Err(DomError::Stale),
        }
    }

    fn click(&mut self, element: &String) -> Result<(), DomError> {
        let found = self
            .tab
            .find_element(&selector(element))
            .map_err(DomError::from_browser)?;
        if let Err(e) = found.scroll_into_view() {
            debug!(error = %e, "scroll into view failed");
        }
        match found.click() {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "regular click failed, trying JavaScript click");
                self.js_click(element)
            }
        }
    }

    fn scroll(&mut self, direction: ScrollDirection, amount: ScrollAmount) -> Result<(), DomError> {
        let script = match (direction, amount) {
            (ScrollDirection::Down, ScrollAmount::ToEnd) => {
                "window.scrollTo(0, document.body.scrollHeight)".to_string()
            }
            (ScrollDirection::Up, ScrollAmount::ToEnd) => "window.scrollTo(0, 0)".to_string(),
            (ScrollDirection::Down, ScrollAmount::Pixels(px)) => format!("window.scrollBy(0, {px})"),
            (ScrollDirection::Up, ScrollAmount::Pixels(px)) => format!("window.scrollBy(0, -{px})"),
        };
        self.eval(&script)?;
        Ok(())
    }

    fn page_height(&mut self) -> Result<u64, DomError> {
        Ok(self.eval("document.body.scrollHeight")?.as_u64().unwrap_or(0))
    }

    fn load_more(&mut self, role: Role) -> Result<usize, DomError> {
        let mut clicked = 0;
        for strategy in self.locators.growth(role) {
            for handle in self.run_strategy(strategy, None, true)? {
                match self.js_click(&handle) {
                    Ok(()) => clicked += 1,
                    Err(DomError::Stale) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        if clicked > 0 {
            debug!(clicked, "clicked load-more controls");
        }
        Ok(clicked)
    }

    fn error_banner_visible(&mut self) -> Result<bool, DomError> {
        Ok(!self.first_of(&self.locators.error_banner, None, true)?.is_empty())
    }

    fn dismiss_overlays(&mut self) -> Result<(), DomError> {
        if let Err(e) = self.tab.press_key("Escape") {
            debug!(error = %e, "escape key failed");
        }
        self.eval("document.activeElement && document.activeElement.blur()")?;
        Ok(())
    }

    fn go_back(&mut self) -> Result<(), DomError> {
        self.eval("history.back()")?;
        std::thread::sleep(self.settle);
        self.wait_ready()
    }

    fn reload_page(&mut self) -> Result<(), DomError> {
        self.tab.reload(false, None).map_err(DomError::from_browser)?;
        self.tab
            .wait_until_navigated()
            .map_err(DomError::from_browser)?;
        self.wait_ready()
    }

    fn current_url(&mut self) -> Result<String, DomError> {
        Ok(self.tab.get_url())
    }
}
