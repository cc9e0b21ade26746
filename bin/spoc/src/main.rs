//! spoc deploys the SPOC token and staking contracts to a BSC network.

mod cli;

use anyhow::Result;
use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use cli::Cli;
use spoc_deploy::{DeployerBuilder, DeploymentOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut builder = DeployerBuilder::new(&cli.network).secrets_path(&cli.secrets);

    if let Some(config) = &cli.config {
        builder = builder.config_path(config);
    }

    if let Some(artifacts) = &cli.artifacts {
        builder = builder.artifacts_dir(artifacts);
    }

    if let Some(rpc_url) = cli.rpc_url.clone() {
        builder = builder.rpc_url(rpc_url);
    }

    let deployer = builder.build()?;
    let outcome = deployer.deploy(cli.stage).await?;

    if let Some(out) = &cli.out {
        outcome.manifest()?.save_to_file(out)?;
    }

    println!("{}", summary_table(&outcome));

    Ok(())
}

/// One row per deployed contract.
fn summary_table(outcome: &DeploymentOutcome) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Contract", "Kind", "Address", "Implementation", "Transaction"]);

    for record in &outcome.records {
        table.add_row(vec![
            record.contract_name.clone(),
            record.kind.to_string(),
            record.address.to_string(),
            record
                .implementation
                .map(|a| a.to_string())
                .unwrap_or_else(|| "-".to_string()),
            record.confirmation.transaction_hash.to_string(),
        ]);
    }

    table
}
