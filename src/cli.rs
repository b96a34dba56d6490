use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "history-collector")]
#[command(about = "Collects one asset's payments from a Stellar history archive and serves them over HTTP")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (default: configs/default.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the collector and the query API (default)
    Run,

    /// Run the collector only
    Collect,

    /// Run the query API only
    Serve,

    /// Create the database, its user and tables, and set the first checkpoint
    InitDb(InitDbArgs),

    /// Decode a local checkpoint file and print it as JSON
    Inspect {
        /// Path to a ledger-*.xdr.gz or transactions-*.xdr.gz file
        file: PathBuf,

        /// File kind (default: guessed from the file name)
        #[arg(long, value_enum)]
        kind: Option<FileKind>,
    },

    /// Print the effective configuration with secrets hidden
    Config,
}

#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct InitDbArgs {
    /// Postgres host
    #[arg(long)]
    pub host: Option<String>,

    /// Postgres superuser password
    #[arg(long)]
    pub password: Option<String>,

    /// Database to create
    #[arg(long)]
    pub db: Option<String>,

    /// Database user for the collector
    #[arg(long)]
    pub user: Option<String>,

    /// Password of the collector user
    #[arg(long)]
    pub userpass: Option<String>,

    /// First checkpoint file to collect, e.g. 0000003f
    #[arg(long, conflicts_with = "first_ledger")]
    pub first: Option<String>,

    /// First ledger to collect; its checkpoint becomes the first file
    #[arg(long)]
    pub first_ledger: Option<u32>,

    /// Drop the database and user if they exist
    #[arg(long)]
    pub force: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Ledger,
    Transactions,
}

impl FileKind {
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.starts_with("ledger-") {
            Some(FileKind::Ledger)
        } else if name.starts_with("transactions-") {
            Some(FileKind::Transactions)
        } else {
            None
        }
    }
}

impl Cli {
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}
