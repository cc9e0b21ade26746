use std::path::PathBuf;

use clap::Parser;
use spoc_deploy::{PlanStage, secrets::DEFAULT_SECRETS_FILENAME};
use tracing::level_filters::LevelFilter;
use url::Url;

/// The default target: a node on localhost.
const DEFAULT_NETWORK: &str = "local";

#[derive(Parser)]
#[command(name = "spoc")]
#[command(
    author,
    version,
    about = "Deploy the SPOC token and staking contracts"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "SPOC_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// The target network: local, test or production.
    ///
    /// The Hardhat network names localhost, testnet and mainnet are accepted too.
    #[arg(short, long, env = "SPOC_NETWORK", default_value = DEFAULT_NETWORK)]
    pub network: String,

    /// Path to the secrets file (signing keys and wiring addresses).
    ///
    /// Any value can be overridden with an environment variable, e.g. SPOC_TOKEN_ADDRESS.
    #[arg(long, env = "SPOC_SECRETS", default_value = DEFAULT_SECRETS_FILENAME)]
    pub secrets: PathBuf,

    /// Path to a Spoc.toml configuration file, or the directory containing it.
    ///
    /// If not provided, ./Spoc.toml is used when present, built-in defaults otherwise.
    #[arg(long, env = "SPOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// The Hardhat artifacts directory. Overrides the configuration file.
    #[arg(long, env = "SPOC_ARTIFACTS")]
    pub artifacts: Option<PathBuf>,

    /// The RPC endpoint of the target. Overrides the configuration file.
    #[arg(long, alias = "rpc", env = "SPOC_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Write a deployments.json manifest after a successful run.
    ///
    /// A path without an extension is a directory and is created if missing.
    #[arg(long, alias = "outdata", env = "SPOC_OUT")]
    pub out: Option<PathBuf>,

    /// What to deploy: token, staking or all.
    #[arg(env = "SPOC_STAGE")]
    pub stage: PlanStage,
}
