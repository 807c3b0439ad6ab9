//! EasyFi host entry point.

use clap::Parser;
use easyfi_cli::{logging, run, Cli};
use easyfi_core::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A broken config file still gets reported through the logger.
    let logging_config = Config::load_or_default(cli.config.as_deref())
        .map(|c| c.logging)
        .unwrap_or_default();
    logging::init(&logging_config, cli.verbose);

    run(cli).await
}
