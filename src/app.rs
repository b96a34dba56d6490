use crate::cli::{Cli, Commands, FileKind, InitDbArgs};
use anyhow::{anyhow, Context, Result};
use history_api::AppState;
use history_archive::{source_from_config, Downloader, RetryPolicy};
use history_collector_core::Collector;
use history_metrics::{MetricsService, TracingService};
use history_models::{Config, FileSequence, HistoryError};
use history_store::{bootstrap, BootstrapOptions, HistoryStore, PgStore};
use history_xdr::{parse_ledger_file, parse_transactions_file, NetworkId};
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceMode {
    All,
    CollectOnly,
    ServeOnly,
}

impl ServiceMode {
    pub fn collects(self) -> bool {
        matches!(self, ServiceMode::All | ServiceMode::CollectOnly)
    }

    pub fn serves(self) -> bool {
        matches!(self, ServiceMode::All | ServiceMode::ServeOnly)
    }
}

pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.log_json {
        config.logging.json = true;
    }
    Ok(config)
}

pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let command = cli.command();

    // Commands that print to stdout keep it free of log lines.
    if !matches!(command, Commands::Inspect { .. } | Commands::Config) {
        TracingService::init(&config.logging.level, config.logging.json)
            .map_err(|e| anyhow!("failed to initialise logging: {}", e))?;
    }

    match command {
        Commands::Run => run_service(config, ServiceMode::All).await,
        Commands::Collect => run_service(config, ServiceMode::CollectOnly).await,
        Commands::Serve => run_service(config, ServiceMode::ServeOnly).await,
        Commands::InitDb(args) => {
            let options = bootstrap_options(&config, &args)?;
            bootstrap(&options).await?;
            Ok(())
        }
        Commands::Inspect { file, kind } => {
            let value = inspect_file(&file, kind, &config.network.passphrase)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Commands::Config => {
            print!("{}", render_config(&config)?);
            Ok(())
        }
    }
}

pub fn build_collector(
    config: &Config,
    store: Arc<dyn HistoryStore>,
    metrics: Arc<MetricsService>,
) -> Result<Collector, HistoryError> {
    let downloader = Downloader::new(
        source_from_config(&config.archive)?,
        RetryPolicy::from_config(&config.archive),
        metrics.clone(),
    );
    Collector::new(config, downloader, store, metrics)
}

async fn finished<T>(handle: &mut Option<JoinHandle<T>>) -> Result<T, JoinError> {
    match handle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

enum Stopped {
    Signal,
    Collector(Result<Result<(), HistoryError>, JoinError>),
    Api(Result<Result<(), BoxError>, JoinError>),
}

/// Runs the collector and/or the query API until a shutdown signal or a collector error.
pub async fn run_service(config: Config, mode: ServiceMode) -> Result<()> {
    run_service_until(config, mode, wait_for_shutdown_signal()).await
}

pub async fn run_service_until(
    config: Config,
    mode: ServiceMode,
    shutdown_signal: impl Future<Output = ()>,
) -> Result<()> {
    if mode.collects() {
        config.validate()?;
    }
    info!(mode = ?mode, "Starting history-collector");

    let metrics = Arc::new(MetricsService::new()?);
    let pg = PgStore::connect(&config.database).await?;
    if mode.collects() {
        pg.migrate().await?;
    }
    let store: Arc<dyn HistoryStore> = Arc::new(pg);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut collector_handle = if mode.collects() {
        let collector = build_collector(&config, store.clone(), metrics.clone())?;
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move { collector.run(rx).await }))
    } else {
        None
    };

    let mut api_handle = if mode.serves() {
        let state = AppState::new(store.clone(), metrics.clone());
        let bind = config.server.bind.clone();
        let port = config.server.port;
        let mut rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            let stop = async move {
                let _ = rx.wait_for(|stop| *stop).await;
            };
            history_api::start_server(bind, port, state, stop).await
        }))
    } else {
        None
    };

    let stopped = tokio::select! {
        _ = shutdown_signal => Stopped::Signal,
        joined = finished(&mut collector_handle) => Stopped::Collector(joined),
        joined = finished(&mut api_handle) => Stopped::Api(joined),
    };

    let outcome = match stopped {
        Stopped::Signal => {
            info!("Received shutdown signal");
            Ok(())
        }
        Stopped::Collector(joined) => {
            collector_handle = None;
            match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    error!(error = %e, "Collector stopped");
                    Err(anyhow::Error::new(e))
                }
                Err(e) => Err(anyhow!("collector task failed: {}", e)),
            }
        }
        Stopped::Api(joined) => {
            api_handle = None;
            match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow!("query API failed: {}", e)),
                Err(e) => Err(anyhow!("query API task failed: {}", e)),
            }
        }
    };

    info!("Shutting down history-collector...");
    let _ = shutdown_tx.send(true);
    if let Some(handle) = collector_handle {
        match handle.await {
            Ok(Err(e)) => warn!(error = %e, "Collector failed during shutdown"),
            Err(e) => warn!(error = %e, "Collector task failed during shutdown"),
            Ok(Ok(())) => {}
        }
    }
    if let Some(handle) = api_handle {
        match handle.await {
            Ok(Err(e)) => warn!("Query API failed during shutdown: {}", e),
            Err(e) => warn!(error = %e, "Query API task failed during shutdown"),
            Ok(Ok(())) => {}
        }
    }

    info!("history-collector stopped");
    outcome
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                warn!("Unable to register signal handlers, falling back to Ctrl-C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Database, user and first checkpoint for `init-db`: flags win over the configuration.
pub fn bootstrap_options(config: &Config, args: &InitDbArgs) -> Result<BootstrapOptions, HistoryError> {
    let mut database = config.database.clone();
    if let Some(host) = &args.host {
        database.host = host.clone();
    }
    if let Some(password) = &args.password {
        database.admin_password = password.clone();
    }
    if let Some(db) = &args.db {
        database.name = db.clone();
    }
    if let Some(user) = &args.user {
        database.user = user.clone();
    }
    if let Some(userpass) = &args.userpass {
        database.password = userpass.clone();
    }

    let first_file = match (&args.first, args.first_ledger) {
        (Some(raw), _) => FileSequence::parse(raw)?,
        (None, Some(ledger)) => FileSequence::containing_ledger(ledger),
        (None, None) => config
            .collector
            .first_file
            .ok_or_else(|| HistoryError::ConfigError {
                reason: "first file required: pass --first or --first-ledger, or set collector.first_file"
                    .to_string(),
            })?,
    };
    if !first_file.is_checkpoint() {
        return Err(HistoryError::InvalidFileSequence {
            value: first_file.name(),
        });
    }

    Ok(BootstrapOptions {
        database,
        first_file,
        force: args.force,
    })
}

/// Decodes a checkpoint file for display. Transactions are listed with their network hash.
pub fn inspect_file(path: &Path, kind: Option<FileKind>, passphrase: &str) -> Result<Value> {
    let kind = match kind {
        Some(kind) => kind,
        None => path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(FileKind::from_file_name)
            .ok_or_else(|| anyhow!("cannot tell the kind of {}; pass --kind", path.display()))?,
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

    match kind {
        FileKind::Ledger => Ok(serde_json::to_value(parse_ledger_file(&bytes)?)?),
        FileKind::Transactions => {
            let network = NetworkId::from_passphrase(passphrase);
            let entries = parse_transactions_file(&bytes)?;
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                let transactions = entry
                    .tx_set
                    .txs
                    .iter()
                    .map(|envelope| {
                        Ok(json!({
                            "hash": envelope.hash(&network).to_hex(),
                            "envelope": serde_json::to_value(envelope)?,
                        }))
                    })
                    .collect::<Result<Vec<Value>, serde_json::Error>>()?;
                out.push(json!({
                    "ledger_seq": entry.ledger_seq,
                    "previous_ledger_hash": entry.tx_set.previous_ledger_hash.to_hex(),
                    "transactions": transactions,
                }));
            }
            Ok(Value::Array(out))
        }
    }
}

pub fn render_config(config: &Config) -> Result<String> {
    Ok(toml::to_string_pretty(&config.redacted())?)
}
