use anyhow::{Result, anyhow};
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    pub headless: bool,
    /// Attach to a Chrome already running with `--remote-debugging-port`.
    pub debug_port: Option<u16>,
    pub chrome_path: Option<PathBuf>,
    pub profile_dir: Option<PathBuf>,
}

impl BrowserOptions {
    /// Profile directory; defaults to a folder under the local data dir so
    /// the operator only has to log in once.
    pub fn profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("activity-purge")
                .join("profile")
        })
    }
}

/// One browser and the tab the whole run happens in.
pub struct BrowserSession {
    _browser: Browser,
    pub tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(options: &BrowserOptions) -> Result<Self> {
        if let Some(port) = options.debug_port {
            return Self::attach(port);
        }

        let profile = options.profile_dir();
        if !profile.exists() {
            info!(profile = %profile.display(), "creating browser profile");
            std::fs::create_dir_all(&profile)?;
        }

        let user_agent = format!("--user-agent={USER_AGENT}");
        let launch = LaunchOptions {
            headless: options.headless,
            path: options.chrome_path.clone(),
            user_data_dir: Some(profile),
            args: vec![
                std::ffi::OsStr::new("--no-first-run"),
                std::ffi::OsStr::new("--no-default-browser-check"),
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-blink-features=AutomationControlled"),
                std::ffi::OsStr::new("--disable-infobars"),
                std::ffi::OsStr::new(&user_agent),
            ],
            // The operator may sit at the login prompt for a while.
            idle_browser_timeout: Duration::from_secs(60 * 60),
            ..Default::default()
        };

        info!(headless = options.headless, "starting Chrome");
        let browser = Browser::new(launch).map_err(|e| anyhow!("Browser launch failed: {}", e))?;
        let tab = browser.new_tab()?;
        if let Err(e) = tab.enable_stealth_mode() {
            warn!(error = %e, "could not enable stealth mode");
        }
        info!("Chrome ready");

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    fn attach(port: u16) -> Result<Self> {
        info!(port, "attaching to running Chrome");
        let browser = Browser::connect(format!("http://127.0.0.1:{port}"))
            .map_err(|e| anyhow!("could not attach to Chrome on port {}: {}", port, e))?;

        let existing = {
            let tabs = browser.get_tabs();
            let tabs = tabs
                .lock()
                .map_err(|_| anyhow!("tab list lock poisoned"))?;
            tabs.first().cloned()
        };
        let tab = match existing {
            Some(tab) => {
                info!("using existing tab");
                tab
            }
            None => browser.new_tab()?,
        };

        Ok(Self {
            _browser: browser,
            tab,
        })
    }

    pub fn open(&self, url: &str) -> Result<()> {
        info!(url, "navigating");
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        Ok(())
    }
}
