use crate::fixtures::{issuer, Checkpoint, ASSET_CODE};
use anyhow::Result;
use history_models::{Config, FileCategory};
use history_xdr::TESTNET_PASSPHRASE;
use std::path::Path;
use tempfile::TempDir;

/// Writes a checkpoint into `root` using the archive directory layout.
pub fn write_checkpoint(root: &Path, checkpoint: &Checkpoint) -> Result<()> {
    write_file(
        root,
        &checkpoint.file.archive_path(FileCategory::Ledger),
        &checkpoint.ledger_bytes(),
    )?;
    write_file(
        root,
        &checkpoint.file.archive_path(FileCategory::Transactions),
        &checkpoint.transactions_bytes(),
    )
}

pub fn write_file(root: &Path, relative: &str, bytes: &[u8]) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// A temporary local archive populated with the given checkpoints.
pub fn local_archive(checkpoints: &[Checkpoint]) -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    for checkpoint in checkpoints {
        write_checkpoint(dir.path(), checkpoint)?;
    }
    Ok(dir)
}

/// Config reading from a local archive, tracking the fixture asset on the test network.
pub fn test_config(archive_root: &Path) -> Config {
    let mut config = Config::default();
    config.archive.local_dir = Some(archive_root.display().to_string());
    config.archive.max_retries = 1;
    config.archive.retry_delay_secs = 1;
    config.asset.code = ASSET_CODE.to_string();
    config.asset.issuer = issuer().to_strkey();
    config.network.passphrase = TESTNET_PASSPHRASE.to_string();
    config
}
