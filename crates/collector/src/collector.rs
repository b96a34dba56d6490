use crate::extract::{close_times, extract_operations, Extracted};
use history_archive::{CheckpointFiles, Downloader};
use history_metrics::{MetricsService, TracingService};
use history_models::{CheckpointSummary, Config, FileSequence, HistoryError};
use history_store::HistoryStore;
use history_xdr::{parse_ledger_file, parse_transactions_file, Asset, NetworkId};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, instrument};

/// Downloads checkpoints in order and commits the tracked asset's operations.
pub struct Collector {
    asset: Asset,
    network: NetworkId,
    first_file: Option<FileSequence>,
    downloader: Downloader,
    store: Arc<dyn HistoryStore>,
    metrics: Arc<MetricsService>,
}

impl Collector {
    pub fn new(
        config: &Config,
        downloader: Downloader,
        store: Arc<dyn HistoryStore>,
        metrics: Arc<MetricsService>,
    ) -> Result<Self, HistoryError> {
        Ok(Self {
            asset: config.asset.to_asset()?,
            network: NetworkId::from_passphrase(&config.network.passphrase),
            first_file: config.collector.first_file,
            downloader,
            store,
            metrics,
        })
    }

    /// Checkpoint to process next: after the stored cursor, else `collector.first_file`.
    pub async fn start_file(&self) -> Result<FileSequence, HistoryError> {
        match self.store.cursor().await? {
            Some(cursor) => cursor.next_file(),
            None => self.first_file.ok_or(HistoryError::NotInitialized),
        }
    }

    #[instrument(skip(self, file), fields(file = %file))]
    pub async fn process(&self, file: FileSequence) -> Result<CheckpointSummary, HistoryError> {
        let started = Instant::now();
        let files = self.downloader.fetch_checkpoint(file).await?;

        let asset = self.asset;
        let network = self.network;
        let (ledgers, extracted) = tokio::task::spawn_blocking(move || decode(&files, &asset, &network))
            .await
            .map_err(|e| HistoryError::InternalError {
                reason: format!("decode task failed: {}", e),
            })??;

        self.store
            .commit_checkpoint(file, &extracted.payments, &extracted.trustlines)
            .await?;

        let summary = CheckpointSummary {
            file,
            ledgers,
            transactions: extracted.transactions,
            payments: extracted.payments.len(),
            trustlines: extracted.trustlines.len(),
        };
        let elapsed = started.elapsed();
        self.metrics.record_checkpoint(&summary, elapsed);
        TracingService::log_checkpoint_committed(&summary, elapsed.as_millis());
        Ok(summary)
    }

    /// Processes checkpoints until `shutdown` flips to true or an error occurs.
    ///
    /// A checkpoint interrupted by shutdown is not committed and is picked up again on the
    /// next start.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), HistoryError> {
        let mut file = self.start_file().await?;
        TracingService::log_collector_started(file);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                result = self.process(file) => {
                    result?;
                    file = file.next()?;
                }
                _ = shutdown.changed() => {
                    info!(next_file = %file, "Collector stopping");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn decode(
    files: &CheckpointFiles,
    asset: &Asset,
    network: &NetworkId,
) -> Result<(usize, Extracted), HistoryError> {
    let ledgers = parse_ledger_file(&files.ledger)?;
    let transactions = parse_transactions_file(&files.transactions)?;
    let extracted = extract_operations(
        &transactions,
        &close_times(&ledgers),
        asset,
        network,
        &files.file.name(),
    )?;
    Ok((ledgers.len(), extracted))
}
