//! Fallback selector lists.
//!
//! The feed markup changes often, so every element is described by several
//! strategies tried in priority order; the first one that matches wins.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::page::Control;
use crate::types::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "query", rename_all = "lowercase")]
pub enum LocatorStrategy {
    Css(String),
    XPath(String),
}

impl LocatorStrategy {
    /// Anything starting with `//`, `.//` or `(` is XPath, the rest is CSS.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("//") || raw.starts_with(".//") || raw.starts_with('(') {
            LocatorStrategy::XPath(raw.to_string())
        } else {
            LocatorStrategy::Css(raw.to_string())
        }
    }

    pub fn query(&self) -> &str {
        match self {
            LocatorStrategy::Css(q) | LocatorStrategy::XPath(q) => q,
        }
    }
}

/// Tries `strategies` in order and returns the first non-empty match set
/// together with the strategy that produced it.
pub fn first_match<'a, T, E>(
    strategies: &'a [LocatorStrategy],
    mut query: impl FnMut(&LocatorStrategy) -> Result<Vec<T>, E>,
) -> Result<Option<(&'a LocatorStrategy, Vec<T>)>, E> {
    for strategy in strategies {
        let found = query(strategy)?;
        if !found.is_empty() {
            return Ok(Some((strategy, found)));
        }
    }
    Ok(None)
}

/// Every selector list the Chrome-backed accessor uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorSet {
    pub posts: Vec<LocatorStrategy>,
    pub comments: Vec<LocatorStrategy>,
    pub reactions: Vec<LocatorStrategy>,
    pub overflow_menu: Vec<LocatorStrategy>,
    pub delete_option: Vec<LocatorStrategy>,
    pub confirm_button: Vec<LocatorStrategy>,
    pub error_banner: Vec<LocatorStrategy>,
    pub feed_growth: Vec<LocatorStrategy>,
    pub thread_growth: Vec<LocatorStrategy>,
}

fn strategies(raw: &[&str]) -> Vec<LocatorStrategy> {
    raw.iter().map(|s| LocatorStrategy::parse(s)).collect()
}

impl Default for LocatorSet {
    fn default() -> Self {
        Self {
            posts: strategies(&[
                ".feed-shared-update-v2",
                "[data-test-id*='post']",
                ".feed-shared-update",
                ".occludable-update",
            ]),
            comments: strategies(&[
                "li.comments-comments-list__comment-item",
                "article.comments-comment-item",
                "div.comments-comment-item",
                "div.update-components-comment",
                "[data-test-id*='comment']",
                "[data-id*='comment']",
            ]),
            reactions: strategies(&[
                "button.react-button__trigger[aria-pressed]",
                "button[data-control-name='like_toggle'][aria-pressed]",
                ".feed-shared-social-action-bar__action-button[aria-pressed]",
                ".comments-comment-social-bar__like-action-button[aria-pressed]",
                "button[data-control-name='comment_like_toggle'][aria-pressed]",
            ]),
            overflow_menu: strategies(&[
                "button[aria-label*='More actions']",
                "button[aria-label*='Open options'][aria-label*='comment']",
                "button[aria-label*='options'][aria-label*='comment']",
                ".//button[.//svg[@data-test-icon='overflow-web-ios-small']]",
                "button.comment-options-dropdown__dropdown-trigger",
                ".feed-shared-control-menu__trigger",
                "button[data-test-id*='more']",
                "button[class*='control-menu']",
            ]),
            delete_option: strategies(&[
                ".option-delete .feed-shared-control-menu__headline",
                ".artdeco-dropdown__content button[data-control-name='delete_comment']",
                ".artdeco-dropdown__content button[data-control-name='delete']",
                "[role='menu'] button[data-control-name='delete']",
                "//div[@role='menu']//*[self::button or @role='button'][contains(., 'Delete')]",
                "//div[contains(@class, 'artdeco-dropdown__content')]//*[self::button or @role='button'][contains(., 'Delete')]",
            ]),
            confirm_button: strategies(&[
                "button.feed-components-shared-decision-modal__confirm-button",
                "//div[@role='dialog']//button[contains(@class, 'artdeco-button--primary') and (contains(., 'Delete') or contains(., 'Confirm') or contains(., 'Yes'))]",
            ]),
            error_banner: strategies(&[
                "//*[contains(text(), 'Error with your network')]",
                "//*[contains(text(), 'Something went wrong')]",
                "//*[contains(text(), 'Network error')]",
                "//*[contains(text(), 'Connection error')]",
                "//*[contains(text(), 'There was an issue')]",
                ".feed-shared-error-message",
                ".error-page",
                ".error-container",
            ]),
            feed_growth: strategies(&[
                "button.scaffold-finite-scroll__load-button",
                "//button[contains(., 'Show more results')]",
            ]),
            thread_growth: strategies(&[
                "button.comments-comments-list__show-previous-button",
                "button.show-prev-replies",
                "button[data-control-name='comment_count']",
                ".social-details-social-counts__comments button",
            ]),
        }
    }
}

impl LocatorSet {
    /// Reads a JSON override file. Lists missing from the file keep their
    /// defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading locator file {}", path.display()))?;
        let set: LocatorSet = serde_json::from_str(&raw)
            .with_context(|| format!("parsing locator file {}", path.display()))?;
        Ok(set)
    }

    pub fn items(&self, role: Role) -> &[LocatorStrategy] {
        match role {
            Role::Post => &self.posts,
            Role::Comment => &self.comments,
            Role::Reaction => &self.reactions,
        }
    }

    pub fn control(&self, control: Control) -> &[LocatorStrategy] {
        match control {
            Control::OverflowMenu => &self.overflow_menu,
            Control::DeleteOption => &self.delete_option,
            Control::ConfirmButton => &self.confirm_button,
        }
    }

    /// Posts and comments only need the feed's own pager; reactions also
    /// have to open collapsed comment threads to reach liked comments.
    pub fn growth(&self, role: Role) -> Vec<&LocatorStrategy> {
        let mut all: Vec<&LocatorStrategy> = self.feed_growth.iter().collect();
        if matches!(role, Role::Comment | Role::Reaction) {
            all.extend(self.thread_growth.iter());
        }
        all
    }
}
