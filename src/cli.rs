use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;

use crate::config::{Pacing, RunConfig};
use crate::hands::BrowserOptions;
use crate::locator::LocatorSet;
use crate::types::Role;

/// Bulk-remove your own posts, comments or reactions from an activity feed.
#[derive(Debug, Parser)]
#[command(name = "activity-purge", version)]
pub struct Cli {
    /// What to remove.
    #[arg(value_enum)]
    pub role: Role,

    /// Page to open. Defaults to the role's activity page under --profile-url.
    #[arg(long)]
    pub url: Option<String>,

    /// Profile URL, e.g. https://www.linkedin.com/in/<handle>/
    #[arg(long, env = "PURGE_PROFILE_URL")]
    pub profile_url: Option<String>,

    /// Stop after this many items (all of them if absent).
    #[arg(long)]
    pub max_items: Option<u64>,

    /// Leading items of the first listing that are kept.
    #[arg(long, default_value_t = 1)]
    pub preserve_first: usize,

    /// Scroll rounds before the first pass over the feed.
    #[arg(long, default_value_t = 5)]
    pub scroll_rounds: u32,

    /// Successful actions between full page reloads (0 disables).
    #[arg(long, default_value_t = RunConfig::DEFAULT_REFRESH_EVERY)]
    pub refresh_every: u32,

    /// Pause before each action, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    pub action_delay_ms: u64,

    /// Error-page reloads tolerated in a row before giving up.
    #[arg(long, default_value_t = 3)]
    pub error_page_budget: u32,

    /// Run Chrome without a window.
    #[arg(long, env = "PURGE_HEADLESS")]
    pub headless: bool,

    /// Attach to a Chrome already listening on this remote-debugging port.
    #[arg(long, env = "PURGE_DEBUG_PORT")]
    pub debug_port: Option<u16>,

    /// Chrome executable. Found automatically if absent.
    #[arg(long, env = "PURGE_CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Persistent Chrome profile, so the login survives between runs.
    #[arg(long, env = "PURGE_PROFILE_DIR")]
    pub profile_dir: Option<PathBuf>,

    /// JSON file overriding the built-in selector lists.
    #[arg(long)]
    pub locators: Option<PathBuf>,

    /// Skip the "press Enter" prompt.
    #[arg(long)]
    pub no_wait: bool,

    /// Print the final summary as JSON on stdout.
    #[arg(long)]
    pub summary_json: bool,
}

impl Cli {
    pub fn target_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let Some(profile) = &self.profile_url else {
            bail!("pass --url or --profile-url (or set PURGE_PROFILE_URL)");
        };
        Ok(format!(
            "{}/{}",
            profile.trim_end_matches('/'),
            self.role.activity_path()
        ))
    }

    pub fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::new(self.role).with_pacing(Pacing {
            action_delay: Duration::from_millis(self.action_delay_ms),
            ..Pacing::default()
        });
        config.max_items = self.max_items;
        config.preserve_first = self.preserve_first;
        config.initial_scroll_rounds = self.scroll_rounds;
        config.refresh_every = self.refresh_every;
        config.error_page_budget = self.error_page_budget;
        config
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            debug_port: self.debug_port,
            chrome_path: self.chrome_path.clone(),
            profile_dir: self.profile_dir.clone(),
        }
    }

    pub fn locator_set(&self) -> Result<LocatorSet> {
        match &self.locators {
            Some(path) => LocatorSet::from_json_file(path),
            None => Ok(LocatorSet::default()),
        }
    }
}
