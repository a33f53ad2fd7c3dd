use std::io::{BufRead, Write};

use anyhow::{Result, bail};
use tracing::{info, warn};

/// Barrier between opening the page and touching anything on it. The
/// operator logs in by hand; the loop stays idle until the gate opens.
pub trait ReadinessGate {
    fn wait_until_ready(&mut self, current_url: &str) -> Result<()>;
}

impl<G: ReadinessGate + ?Sized> ReadinessGate for Box<G> {
    fn wait_until_ready(&mut self, current_url: &str) -> Result<()> {
        (**self).wait_until_ready(current_url)
    }
}

/// Opens immediately. For sessions that are already signed in.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ready;

impl ReadinessGate for Ready {
    fn wait_until_ready(&mut self, _current_url: &str) -> Result<()> {
        Ok(())
    }
}

/// Blocks on a line from the given reader (stdin in the binary).
pub struct PromptGate<R> {
    input: R,
    action: String,
}

impl PromptGate<std::io::StdinLock<'static>> {
    pub fn stdin(action: impl Into<String>) -> Self {
        Self::new(std::io::stdin().lock(), action)
    }
}

impl<R: BufRead> PromptGate<R> {
    pub fn new(input: R, action: impl Into<String>) -> Self {
        Self {
            input,
            action: action.into(),
        }
    }
}

impl<R: BufRead> ReadinessGate for PromptGate<R> {
    fn wait_until_ready(&mut self, current_url: &str) -> Result<()> {
        match page_hint(current_url) {
            PageHint::Login => info!(url = current_url, "login page detected, please log in manually"),
            PageHint::NotActivity => warn!(
                url = current_url,
                "this is not a recent-activity page, please navigate to it"
            ),
            PageHint::Activity => info!(url = current_url, "on the activity page"),
        }

        eprint!("Press Enter when you're on the correct page and ready to start {}...", self.action);
        std::io::stderr().flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed before the operator confirmed");
        }
        Ok(())
    }
}

/// Wraps a gate and runs `hook` once it has opened. The binary uses this to
/// take over Ctrl-C only after the prompt, so an interrupt while waiting for
/// the operator still ends the process.
pub struct OnOpen<G> {
    gate: G,
    hook: Option<Box<dyn FnOnce() + Send>>,
}

impl<G: ReadinessGate> OnOpen<G> {
    pub fn new(gate: G, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            gate,
            hook: Some(Box::new(hook)),
        }
    }
}

impl<G: ReadinessGate> ReadinessGate for OnOpen<G> {
    fn wait_until_ready(&mut self, current_url: &str) -> Result<()> {
        self.gate.wait_until_ready(current_url)?;
        if let Some(hook) = self.hook.take() {
            hook();
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHint {
    Login,
    NotActivity,
    Activity,
}

pub fn page_hint(url: &str) -> PageHint {
    let url = url.to_lowercase();
    if url.contains("login") || url.contains("auth") || url.contains("checkpoint") {
        PageHint::Login
    } else if !url.contains("recent-activity") {
        PageHint::NotActivity
    } else {
        PageHint::Activity
    }
}
