mod browser;
mod config;
mod detector;
mod error;
mod notifier;
mod poller;
mod runlog;
mod scheduler;
mod types;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::browser::ChromiumLauncher;
use crate::config::Config;
use crate::error::Result;
use crate::notifier::PushNotifier;
use crate::poller::PollOrchestrator;
use crate::runlog::RunLog;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let run_log = RunLog::new(cfg.log_file_path.clone());
    info!(
        event_url = %cfg.event_url,
        headless = cfg.headless,
        log_file = %run_log.path().display(),
        "Starting resale ticket checker"
    );

    let launcher = ChromiumLauncher::new(cfg.headless);
    let notifier = PushNotifier::new(&cfg)?;
    let interval = cfg.interval();
    let max_retries = cfg.max_retries;

    let orchestrator = PollOrchestrator::new(cfg, launcher, notifier);
    let scheduler = Scheduler::new(orchestrator, run_log, interval, max_retries);

    // --- Ctrl-C: finish the current run, then stop ---
    let shutdown = scheduler.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current check");
                shutdown.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    scheduler.run().await;
    info!("Ticket checking stopped by user");
    Ok(())
}
