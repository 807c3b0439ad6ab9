//! Methods command: print the operation whitelist.

use clap::Args;
use easyfi_broker::OperationKind;

/// Methods command arguments.
#[derive(Args)]
pub struct MethodsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: MethodsArgs) -> anyhow::Result<()> {
    if args.json {
        let list: Vec<serde_json::Value> = OperationKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.name(),
                    "params": kind.params(),
                    "description": kind.description(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    for kind in OperationKind::ALL {
        let signature = format!("{}({})", kind.name(), kind.params().join(", "));
        println!("{:<36} {}", signature, kind.description());
    }
    Ok(())
}
