use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::enumerator::{ContentEnumerator, Next};
use crate::error::{DomError, RunError};
use crate::executor::{ActionExecutor, ActionOutcome, FailureReason};
use crate::freshness::FreshnessGuard;
use crate::gate::ReadinessGate;
use crate::page::DomAccessor;
use crate::throttle::ThrottleController;
use crate::types::{AbortReason, ItemStatus, RunCounters, RunState, RunSummary};

/// Shared stop flag. Set from a signal handler, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
enum RefreshCause {
    ErrorPage,
    ConfirmEmpty,
    Cadence,
    StaleElements,
}

/// Drives one run: enumerate, throttle, act, verify, record, repeat.
pub struct DeletionLoop<D: DomAccessor> {
    dom: D,
    config: RunConfig,
    guard: FreshnessGuard,
    enumerator: ContentEnumerator,
    executor: ActionExecutor,
    throttle: ThrottleController,
    counters: RunCounters,
    cancel: CancelToken,
    state: RunState,
}

impl<D: DomAccessor> DeletionLoop<D> {
    pub fn new(dom: D, config: RunConfig) -> Self {
        Self {
            guard: FreshnessGuard::new(),
            enumerator: ContentEnumerator::new(&config),
            executor: ActionExecutor::new(&config),
            throttle: ThrottleController::new(&config),
            counters: RunCounters::default(),
            cancel: CancelToken::new(),
            state: RunState::Idle,
            dom,
            config,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn enumerator(&self) -> &ContentEnumerator {
        &self.enumerator
    }

    pub fn into_dom(self) -> D {
        self.dom
    }

    /// Waits at `gate`, then processes the feed until it is exhausted, the
    /// item limit is hit, or the session becomes unusable.
    pub fn run(&mut self, gate: &mut dyn ReadinessGate) -> RunSummary {
        let state = match self.open_gate(gate).and_then(|()| self.drive()) {
            Ok(()) => RunState::Completed,
            Err(err) => {
                error!(error = %err, "run aborted");
                RunState::Aborted(match err {
                    RunError::Interrupted => AbortReason::Interrupted,
                    RunError::ErrorPageBudget { .. } => AbortReason::ErrorPageBudget,
                    RunError::Session(err) => AbortReason::SessionLost(err.to_string()),
                })
            }
        };
        self.state = state.clone();
        let summary = RunSummary::from_counters(self.config.role, state, &self.counters);
        info!(
            processed = summary.processed,
            preserved = summary.preserved,
            failed = summary.failed,
            restricted = summary.restricted,
            refreshes = summary.refreshes,
            "processing complete"
        );
        summary
    }

    fn open_gate(&mut self, gate: &mut dyn ReadinessGate) -> Result<(), RunError> {
        let url = self.dom.current_url()?;
        if let Err(err) = gate.wait_until_ready(&url) {
            warn!(error = %err, "readiness gate did not open");
            return Err(RunError::Interrupted);
        }
        if self.cancel.is_cancelled() {
            return Err(RunError::Interrupted);
        }
        info!(url = %self.dom.current_url()?, role = %self.config.role, "starting run");
        self.state = RunState::Running;
        Ok(())
    }

    fn drive(&mut self) -> Result<(), RunError> {
        let mut error_pages = 0u32;
        let mut consecutive_failures = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(RunError::Interrupted);
            }
            if self.config.limit_reached(self.counters.dispatched()) {
                info!(max = ?self.config.max_items, "reached maximum item count");
                return Ok(());
            }

            let next = match self.enumerator.next_item(&mut self.dom, &self.guard) {
                Ok(next) => next,
                Err(err) if err.is_session_lost() => return Err(err.into()),
                Err(err) => {
                    warn!(error = %err, "enumeration failed, treating as a broken render");
                    Next::PageError
                }
            };

            let item = match next {
                Next::EndOfContent => return Ok(()),
                Next::PageError => {
                    error_pages += 1;
                    if error_pages > self.config.error_page_budget {
                        return Err(RunError::ErrorPageBudget {
                            reloads: self.config.error_page_budget,
                        });
                    }
                    self.counters.error_page_reloads += 1;
                    self.refresh(RefreshCause::ErrorPage)?;
                    continue;
                }
                Next::BlankPage => {
                    info!("nothing rendered, reloading once to confirm the feed is empty");
                    self.refresh(RefreshCause::ConfirmEmpty)?;
                    continue;
                }
                Next::Preserved(_) => {
                    self.counters.skipped_preserved_count += 1;
                    continue;
                }
                Next::Item(item) => item,
            };
            error_pages = 0;

            self.throttle.before_action();
            info!(
                identity = %item.identity,
                position = item.position,
                n = self.counters.dispatched() + 1,
                "processing item"
            );
            let outcome = match self.executor.apply(&mut self.dom, &item) {
                Ok(outcome) => outcome,
                Err(err) => return Err(err.into()),
            };

            let succeeded = outcome.is_success();
            if succeeded {
                self.counters.processed_count += 1;
                self.enumerator.record(&item, ItemStatus::Processed);
                consecutive_failures = 0;
            } else {
                self.counters.failed_count += 1;
                self.enumerator.record(&item, ItemStatus::Failed);
                if outcome == ActionOutcome::Failure(FailureReason::NoDeleteOption) {
                    self.counters.restricted_count += 1;
                    consecutive_failures = 0;
                } else {
                    consecutive_failures += 1;
                }
                warn!(identity = %item.identity, ?outcome, consecutive_failures, "item failed");
            }

            if self.throttle.after_action(&mut self.counters, succeeded) {
                self.refresh(RefreshCause::Cadence)?;
            } else if self.config.stale_refresh_after > 0
                && consecutive_failures >= self.config.stale_refresh_after
            {
                consecutive_failures = 0;
                self.refresh(RefreshCause::StaleElements)?;
            }
        }
    }

    fn refresh(&mut self, cause: RefreshCause) -> Result<(), DomError> {
        info!(?cause, "reloading page");
        match self.dom.reload_page() {
            Ok(()) => {}
            Err(err) if err.is_session_lost() => return Err(err),
            Err(err) => warn!(error = %err, "reload reported an error, continuing"),
        }
        std::thread::sleep(self.config.pacing.reload_settle);
        self.counters.refresh_count += 1;
        self.enumerator.after_reload();
        Ok(())
    }
}
