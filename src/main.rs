use activity_purge::cli::Cli;
use activity_purge::hands::BrowserSession;
use activity_purge::{
    CancelToken, ChromeDom, DeletionLoop, OnOpen, PromptGate, Ready, ReadinessGate, Role,
};
use anyhow::{Result, anyhow, bail};
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn action_phrase(role: Role) -> &'static str {
    match role {
        Role::Post => "deleting posts",
        Role::Comment => "deleting comments",
        Role::Reaction => "removing reactions",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let url = cli.target_url()?;
    let config = cli.run_config();
    let locators = cli.locator_set()?;
    let options = cli.browser_options();

    info!(
        role = %cli.role,
        %url,
        max_items = ?config.max_items,
        scroll_rounds = config.initial_scroll_rounds,
        headless = options.headless,
        "starting"
    );

    // Ctrl-C is only taken over once the operator has confirmed; before that
    // it kills the process as usual, prompt included.
    let cancel = CancelToken::new();
    let (opened_tx, opened_rx) = tokio::sync::oneshot::channel::<()>();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if opened_rx.await.is_err() {
                return;
            }
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current item");
                cancel.cancel();
            }
        });
    }

    // Everything below blocks on the browser, so keep it off the runtime.
    let no_wait = cli.no_wait;
    let role = cli.role;
    let summary = tokio::task::spawn_blocking(move || -> Result<_> {
        let session = BrowserSession::launch(&options)?;
        session.open(&url)?;

        let dom = ChromeDom::new(session.tab.clone(), locators)
            .with_settle(config.pacing.reload_settle);
        let prompt: Box<dyn ReadinessGate> = if no_wait {
            Box::new(Ready)
        } else {
            Box::new(PromptGate::stdin(action_phrase(role)))
        };
        let mut gate = OnOpen::new(prompt, move || {
            let _ = opened_tx.send(());
        });

        let mut run = DeletionLoop::new(dom, config).with_cancel(cancel);
        Ok(run.run(&mut gate))
    })
    .await
    .map_err(|e| anyhow!("run panicked: {}", e))??;

    if cli.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Processed: {}, Preserved: {}, Failed: {} (restricted: {}), Refreshes: {}",
            summary.processed, summary.preserved, summary.failed, summary.restricted, summary.refreshes
        );
    }

    if !summary.is_completed() {
        bail!("run did not complete: {:?}", summary.state);
    }
    Ok(())
}
