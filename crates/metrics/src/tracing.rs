use history_models::{CheckpointSummary, FileSequence};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

pub struct TracingService;

impl TracingService {
    /// Installs the global subscriber. `RUST_LOG` overrides `level` when set.
    pub fn init(level: &str, json: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
        if json {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_timer(UtcTime::rfc_3339())
                .try_init()
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).try_init()
        }
    }

    pub fn log_collector_started(next_file: FileSequence) {
        info!(
            next_file = %next_file,
            first_ledger = next_file.first_ledger(),
            "Collector started"
        );
    }

    pub fn log_checkpoint_committed(summary: &CheckpointSummary, elapsed_ms: u128) {
        info!(
            file = %summary.file,
            ledgers = summary.ledgers,
            transactions = summary.transactions,
            payments = summary.payments,
            trustlines = summary.trustlines,
            elapsed_ms = elapsed_ms as u64,
            "Checkpoint committed"
        );
    }

    pub fn log_download_retry(path: &str, attempt: u32, max_attempts: u32, reason: &str) {
        warn!(
            path = %path,
            attempt = attempt,
            max_attempts = max_attempts,
            reason = %reason,
            "Download attempt failed, retrying"
        );
    }
}
