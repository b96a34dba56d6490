use anyhow::Result;
use clap::Parser;
use history_collector::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    history_collector::execute(cli).await
}
