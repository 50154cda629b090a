//! strife-migrate CLI

use clap::Parser;

use strife_migrate::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli::init_tracing(cli.verbose)?;
    cli::run(cli).await?;
    Ok(())
}
