use history_models::{CheckpointSummary, HistoryError};
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::time::Duration;

pub struct MetricsService {
    registry: Registry,
    files_processed_total: IntCounter,
    payments_written_total: IntCounter,
    trustlines_written_total: IntCounter,
    download_retries_total: IntCounter,
    download_failures_total: IntCounter,
    last_ledger_sequence: IntGauge,
    file_process_seconds: Histogram,
}

fn internal(e: prometheus::Error) -> HistoryError {
    HistoryError::InternalError {
        reason: e.to_string(),
    }
}

impl MetricsService {
    pub fn new() -> Result<Self, HistoryError> {
        let registry = Registry::new();

        let files_processed_total = IntCounter::new(
            "history_files_processed_total",
            "Total number of checkpoint files committed",
        )
        .map_err(internal)?;
        let payments_written_total = IntCounter::new(
            "history_payments_written_total",
            "Total number of payments written to the database",
        )
        .map_err(internal)?;
        let trustlines_written_total = IntCounter::new(
            "history_trustlines_written_total",
            "Total number of trustlines written to the database",
        )
        .map_err(internal)?;
        let download_retries_total = IntCounter::new(
            "history_download_retries_total",
            "Total number of retried archive downloads",
        )
        .map_err(internal)?;
        let download_failures_total = IntCounter::new(
            "history_download_failures_total",
            "Total number of downloads that exhausted their retries",
        )
        .map_err(internal)?;
        let last_ledger_sequence = IntGauge::new(
            "history_last_ledger_sequence",
            "Last ledger sequence covered by a committed checkpoint",
        )
        .map_err(internal)?;
        let file_process_seconds = Histogram::with_opts(HistogramOpts::new(
            "history_file_process_seconds",
            "Time to download, decode and commit one checkpoint",
        ))
        .map_err(internal)?;

        registry
            .register(Box::new(files_processed_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(payments_written_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(trustlines_written_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(download_retries_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(download_failures_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(last_ledger_sequence.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(file_process_seconds.clone()))
            .map_err(internal)?;

        Ok(Self {
            registry,
            files_processed_total,
            payments_written_total,
            trustlines_written_total,
            download_retries_total,
            download_failures_total,
            last_ledger_sequence,
            file_process_seconds,
        })
    }

    pub fn record_checkpoint(&self, summary: &CheckpointSummary, elapsed: Duration) {
        self.files_processed_total.inc();
        self.payments_written_total.inc_by(summary.payments as u64);
        self.trustlines_written_total.inc_by(summary.trustlines as u64);
        self.last_ledger_sequence.set(summary.file.last_ledger() as i64);
        self.file_process_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_download_retry(&self) {
        self.download_retries_total.inc();
    }

    pub fn record_download_failure(&self) {
        self.download_failures_total.inc();
    }

    pub fn render(&self) -> Result<String, HistoryError> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(internal)?;

        String::from_utf8(buffer).map_err(|e| HistoryError::InternalError {
            reason: e.to_string(),
        })
    }
}
