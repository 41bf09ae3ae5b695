//! Acceleration engine (accel-engine) - Main entry point
//!
//! Runs the tiering-and-queue engine against file-backed collaborators.
//! State is loaded before and saved after every operation.

use std::path::PathBuf;
use std::time::Duration;

use accel_common::config::Config;
use accel_common::store::StateStore;
use accel_common::time;
use accel_engine::adapters::{FileCollaborators, ReplyClassifier};
use accel_engine::{AccelerationEngine, CommandEvent, CycleReport, Intent};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::signal;
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Level used until the configured one is known
const STARTUP_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Command-line arguments for accel-engine
#[derive(Parser, Debug)]
#[command(name = "accel-engine")]
#[command(about = "Topic affinity tiering, opt-in labels and moderator alerts")]
#[command(version)]
struct Args {
    /// Config file (defaults to $ACCEL_CONFIG, then the per-user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State file override
    #[arg(long)]
    state: Option<PathBuf>,

    /// Data directory override (history.json, labels.json, outbox.jsonl)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Record state without writing labels or sending notices
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one cycle: refresh due opted-in users, then drain the scan queue
    Cycle,

    /// Handle one user-triggered event
    #[command(name = "command")]
    Event {
        /// Author of the event (omit for a deleted author)
        #[arg(long)]
        user: Option<String>,

        /// Pre-classified intent (enable, disable, inspect, none)
        #[arg(long, conflicts_with = "reply", required_unless_present = "reply")]
        intent: Option<Intent>,

        /// Raw classifier answer (ON, OFF, CHECK, NONE)
        #[arg(long)]
        reply: Option<String>,
    },

    /// Queue users for a background scan
    Enqueue {
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Show state totals, or one user's records
    Status { user: Option<String> },

    /// Run cycles on an interval until interrupted
    Daemon {
        #[arg(long, default_value = "180")]
        interval_secs: u64,
    },
}

/// Everything a single operation needs, cheap to clone into blocking tasks
#[derive(Debug, Clone)]
struct Runtime {
    config: Config,
    store: StateStore,
    data_dir: PathBuf,
}

impl Runtime {
    fn from_args(args: &Args) -> Result<Self> {
        let mut config =
            Config::resolve(args.config.as_deref()).context("Failed to load configuration")?;
        if args.dry_run {
            config.acceleration.dry_run = true;
        }
        let state_path = args
            .state
            .clone()
            .unwrap_or_else(|| config.storage.state_path.clone());
        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.storage.data_dir.clone());

        Ok(Self {
            config,
            store: StateStore::new(state_path),
            data_dir,
        })
    }

    fn collaborators(&self) -> Result<FileCollaborators> {
        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!("Failed to create data directory {}", self.data_dir.display())
        })?;
        Ok(FileCollaborators::in_dir(&self.data_dir))
    }

    fn run_cycle(&self) -> Result<CycleReport> {
        let files = self.collaborators()?;
        let engine = AccelerationEngine::new(
            self.config.acceleration.clone(),
            &files.history,
            &files.labels,
            &files.notifier,
        );

        let mut state = self.store.load().context("Failed to load state")?;
        let report = engine.run_cycle(&mut state, time::now());
        self.store.save(&state).context("Failed to save state")?;
        Ok(report)
    }

    fn run_command(
        &self,
        user: Option<&str>,
        intent: Option<Intent>,
        reply: Option<&str>,
    ) -> Result<Option<String>> {
        let files = self.collaborators()?;
        let engine = AccelerationEngine::new(
            self.config.acceleration.clone(),
            &files.history,
            &files.labels,
            &files.notifier,
        );

        let mut state = self.store.load().context("Failed to load state")?;
        let now = time::now();
        let response = match (intent, reply) {
            (Some(intent), _) => {
                engine.handle_command(&mut state, CommandEvent { author: user, intent }, now)
            }
            (None, Some(reply)) => {
                engine.classify_and_handle(&mut state, &ReplyClassifier, user, reply, now)
            }
            (None, None) => None,
        };
        self.store.save(&state).context("Failed to save state")?;
        Ok(response)
    }

    fn enqueue(&self, users: &[String]) -> Result<()> {
        let files = self.collaborators()?;
        let engine = AccelerationEngine::new(
            self.config.acceleration.clone(),
            &files.history,
            &files.labels,
            &files.notifier,
        );

        let mut state = self.store.load().context("Failed to load state")?;
        let now = time::now();
        for user in users {
            let outcome = engine.enqueue_background_scan(&mut state, user, now);
            println!("{}: {:?}", user, outcome);
        }
        self.store.save(&state).context("Failed to save state")?;
        Ok(())
    }

    fn status(&self, user: Option<&str>) -> Result<serde_json::Value> {
        let state = self.store.load().context("Failed to load state")?;
        let value = match user {
            Some(user) => json!({
                "username": user,
                "opted_in": state.opted_in(user),
                "background_scan": state.scanned_users.get(user),
                "alerted": state.alerted_users.contains(user),
                "queued": state.scan_queue.contains(user),
            }),
            None => json!({
                "version": state.version,
                "opted_in_users": state.opted_in_users.len(),
                "scanned_users": state.scanned_users.len(),
                "alerted_users": state.alerted_users.len(),
                "scan_queue": state.scan_queue.len(),
            }),
        };
        Ok(value)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing before config resolution so its warnings are seen
    let (filter, from_env) = startup_filter();
    let (subscriber, filter_handle) = build_subscriber(filter, std::io::stdout);
    subscriber.init();

    let runtime = Runtime::from_args(&args)?;

    // RUST_LOG wins over the configured level
    if !from_env {
        apply_log_level(&filter_handle, &runtime.config.logging.level);
    }

    info!(
        "Starting accel-engine v{} (state: {}, data: {})",
        env!("CARGO_PKG_VERSION"),
        runtime.store.path().display(),
        runtime.data_dir.display()
    );
    if runtime.config.acceleration.dry_run {
        info!("Dry run: labels and notices will not be written");
    }

    match args.command {
        Command::Cycle => {
            let report = runtime.run_cycle()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Event {
            user,
            intent,
            reply,
        } => match runtime.run_command(user.as_deref(), intent, reply.as_deref())? {
            Some(response) => println!("{}", response),
            None => println!("(no reply)"),
        },
        Command::Enqueue { users } => runtime.enqueue(&users)?,
        Command::Status { user } => {
            let status = runtime.status(user.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Command::Daemon { interval_secs } => run_daemon(runtime, interval_secs).await?,
    }

    Ok(())
}

/// Filter from RUST_LOG if set, else the startup level; true when from RUST_LOG
fn startup_filter() -> (EnvFilter, bool) {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(STARTUP_LOG_LEVEL), false),
    }
}

/// fmt subscriber whose filter can be swapped once config is loaded
fn build_subscriber<W>(
    filter: EnvFilter,
    writer: W,
) -> (impl Subscriber + Send + Sync + 'static, FilterHandle)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer));
    (subscriber, handle)
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(level)) {
        warn!("Failed to apply configured log level '{}': {}", level, e);
    }
}

/// Run a cycle every `interval_secs` until shutdown
async fn run_daemon(runtime: Runtime, interval_secs: u64) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!("Running cycles every {}s", interval_secs.max(1));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                let cycle_runtime = runtime.clone();
                match tokio::task::spawn_blocking(move || cycle_runtime.run_cycle()).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => error!("Cycle failed: {:#}", e),
                    Err(e) => error!("Cycle task panicked: {}", e),
                }
            }
        }
    }

    info!("Daemon shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_config_resolution_is_logged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[acceleration]\ntopic_communities = []\n").unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let (subscriber, _handle) =
            build_subscriber(EnvFilter::new(STARTUP_LOG_LEVEL), move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            Config::resolve(Some(&path)).unwrap();
        });

        let text = log.text();
        assert!(text.contains("Loaded configuration from"), "log was: {}", text);
        assert!(text.contains("No topic communities configured"), "log was: {}", text);
    }

    #[test]
    fn test_configured_level_applies_after_startup() {
        let log = CapturedLog::default();
        let writer = log.clone();
        let (subscriber, handle) =
            build_subscriber(EnvFilter::new(STARTUP_LOG_LEVEL), move || writer.clone());

        tracing::subscriber::with_default(subscriber, || {
            info!("before reload");
            apply_log_level(&handle, "warn");
            info!("after reload");
            warn!("still visible");
        });

        let text = log.text();
        assert!(text.contains("before reload"));
        assert!(!text.contains("after reload"));
        assert!(text.contains("still visible"));
    }
}
