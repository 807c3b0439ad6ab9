//! Run command.

use anyhow::Context;
use clap::Args;
use easyfi_broker::Host;
use easyfi_core::config::VaultBackend;
use easyfi_core::{paths, Config};
use easyfi_vault::{FileVault, MemoryVault, Vault};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Run command arguments.
#[derive(Args)]
pub struct RunArgs {
    /// Do not launch a UI process; print the IPC endpoint instead
    #[arg(long)]
    pub headless: bool,

    /// IPC port (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Command that launches the UI for each window
    #[arg(long)]
    pub ui_command: Option<String>,

    /// Extra argument for the UI command (repeatable)
    #[arg(long = "ui-arg")]
    pub ui_args: Vec<String>,
}

/// Merge command-line flags over the loaded configuration.
pub fn apply_args(config: &mut Config, args: &RunArgs) {
    if args.headless {
        config.window.headless = true;
    }
    if let Some(port) = args.port {
        config.ipc.port = port;
    }
    if let Some(ref command) = args.ui_command {
        config.window.ui_command = Some(command.clone());
    }
    if !args.ui_args.is_empty() {
        config.window.ui_args = args.ui_args.clone();
    }
    if config.window.ui_command.is_none() {
        config.window.headless = true;
    }
}

async fn open_vault(config: &Config) -> anyhow::Result<Arc<dyn Vault>> {
    match config.vault.backend {
        VaultBackend::Memory => Ok(Arc::new(MemoryVault::new())),
        VaultBackend::File => {
            let dir = match config.vault.dir {
                Some(ref dir) => paths::expand_tilde(&dir.to_string_lossy()),
                None => paths::vault_dir()?,
            };
            let vault = FileVault::open(dir.clone())
                .await
                .with_context(|| format!("Failed to open vault at {}", dir.display()))?;
            Ok(Arc::new(vault))
        }
    }
}

/// Run the host until it quits.
pub async fn run(args: RunArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = Config::load_or_default(config_path)?;
    apply_args(&mut config, &args);
    config.validate()?;

    let vault = open_vault(&config).await?;
    info!(backend = vault.backend(), "Vault ready");

    let headless = config.window.headless;
    let host = Host::builder(config)
        .version(env!("CARGO_PKG_VERSION"))
        .vault(vault)
        .start()
        .await?;
    let handle = host.handle();

    if headless {
        if let Some(session) = handle.current_session() {
            println!("IPC endpoint:  {}", session.url);
            println!("Session token: {}", session.token.expose_secret());
        }
    }

    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            signal_handle.quit();
        }
    });

    host.run().await?;
    Ok(())
}
