use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use upwatch::alerts::{LogSink, NotificationSink, TelegramSink, TransitionNotifier};
use upwatch::clock::{Clock, SystemClock};
use upwatch::config::{process_env, Config, EnvLookup};
use upwatch::error::ConfigError;
use upwatch::history::SqliteHistory;
use upwatch::orchestrator::CheckOrchestrator;
use upwatch::probe::HttpProber;
use upwatch::scheduler::Scheduler;
use upwatch::server::{self, AppState};

/// Command-line arguments for the uptime monitor
#[derive(Parser)]
#[command(
    name = "upwatch",
    about = "Lightweight uptime monitor with Telegram alerts and an hourly status dashboard",
    long_about = "Periodically probes a list of named URLs, records every result in SQLite, \
                  sends a Telegram message whenever a site goes down or recovers, and serves \
                  a dashboard plus a JSON query API."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

/// Wires the probe engine, history, notifier, scheduler and dashboard together
struct Upwatch {
    config: Config,
    orchestrator: Arc<CheckOrchestrator>,
    clock: Arc<dyn Clock>,
}

impl Upwatch {
    /// Load configuration, falling back to defaults when the file is missing
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read, parsed or
    /// validated.
    fn load_config(config_path: Option<&Path>) -> Result<Config, ConfigError> {
        match config_path {
            Some(path) if !path.exists() => {
                warn!(
                    "Configuration file '{}' not found, using defaults",
                    path.display()
                );
                Ok(Config::default())
            }
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Config::from_file(path)
            }
            None => {
                info!("Using default configuration");
                Ok(Config::default())
            }
        }
    }

    /// Pick the Telegram sink when credentials are present, the log sink otherwise
    fn notification_sink(config: &Config) -> anyhow::Result<Arc<dyn NotificationSink>> {
        if config.notify.telegram.is_configured() {
            let sink = TelegramSink::new(&config.notify.telegram, config.probe_timeout())
                .context("Failed to build Telegram client")?;
            Ok(Arc::new(sink))
        } else {
            warn!("Telegram is not configured, notifications will only be logged");
            Ok(Arc::new(LogSink))
        }
    }

    async fn new(
        config: Config,
        env: EnvLookup,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let store = SqliteHistory::open(&config.storage.path)
            .await
            .with_context(|| format!("Failed to open history at {}", config.storage.path))?;
        let prober = HttpProber::new(config.probe_timeout(), &config.probe.user_agent)
            .context("Failed to build HTTP client")?;
        let notifier = TransitionNotifier::new(Self::notification_sink(&config)?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let source = config.monitor_source(env);
        info!("Monitors come from {}", source.describe());

        let orchestrator = CheckOrchestrator::new(
            source,
            Arc::new(prober),
            Arc::new(store),
            Arc::new(notifier),
            clock.clone(),
        )
        .with_retention(config.retention_seconds())
        .with_sweep_timeout(config.sweep_timeout())
        .with_shutdown(shutdown);

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            clock,
        })
    }

    /// Run the scheduler and the dashboard until `shutdown` fires
    async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let scheduler = Scheduler::new(
            Arc::clone(&self.orchestrator),
            self.config.sweep_interval(),
        );
        let scheduler = tokio::spawn(scheduler.run(shutdown.clone()));

        let state = Arc::new(AppState::new(
            Arc::clone(&self.orchestrator),
            self.clock.clone(),
            &self.config,
        ));
        let served = server::serve(&self.config.server.bind, state, shutdown.clone()).await;

        // The scheduler must stop even if the server failed on its own
        shutdown.cancel();
        if let Err(e) = scheduler.await {
            error!("Scheduler task failed: {}", e);
        }

        info!("Waiting for pending notifications");
        self.orchestrator.notifier().flush().await;

        served.with_context(|| format!("Dashboard server on {} failed", self.config.server.bind))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting upwatch {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let mut config = Upwatch::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;
    let env = process_env();
    config.apply_env_overrides(|key| env(key));

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down gracefully...");
        signal.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let app = Upwatch::new(config, env, shutdown.clone()).await?;
    info!("upwatch is running. Press Ctrl+C to stop.");
    app.run(shutdown).await?;

    info!("upwatch shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_validation_with_existing_file() {
        let temp_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();

        let cli = Cli {
            config: Some(temp_file.path().to_path_buf()),
            verbose: false,
        };

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/config.toml")),
            verbose: false,
        };

        // Missing files fall back to defaults
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli {
            config: Some(dir.path().to_path_buf()),
            verbose: false,
        };

        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_cli_validation_no_config() {
        let cli = Cli {
            config: None,
            verbose: false,
        };

        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let config = Upwatch::load_config(Some(Path::new("/nonexistent/upwatch.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_config_invalid_file_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[probe]\ntimeout_seconds = 0").unwrap();

        assert!(Upwatch::load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_config_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[schedule]\ninterval_seconds = 60\n\n[[monitors]]\nname = \"site-a\"\nurl = \"https://site-a.example\""
        )
        .unwrap();

        let config = Upwatch::load_config(Some(file.path())).unwrap();
        assert_eq!(config.schedule.interval_seconds, 60);
        assert_eq!(config.monitors.len(), 1);
    }

    #[test]
    fn test_notification_sink_selection() {
        let mut config = Config::default();
        assert_eq!(Upwatch::notification_sink(&config).unwrap().name(), "log");

        config.notify.telegram.bot_token = "123:abc".to_string();
        config.notify.telegram.chat_id = "42".to_string();
        assert_eq!(
            Upwatch::notification_sink(&config).unwrap().name(),
            "telegram"
        );
    }

    #[tokio::test]
    async fn test_build_with_in_memory_store() {
        let mut config = Config::default();
        config.storage.path = ":memory:".to_string();

        let env: EnvLookup = Arc::new(|_: &str| None::<String>);
        let app = Upwatch::new(config, env, CancellationToken::new())
            .await
            .unwrap();
        assert!(app.orchestrator.store().ping().await.is_ok());
    }
}
