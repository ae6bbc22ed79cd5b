//! # CLI Interface
//!
//! Defines the command-line argument structure for `cloister-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.
//! Every `run` option can also be set through a `CLOISTER_*` environment
//! variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cloister_protocol::config::{DEFAULT_METRICS_PORT, DEFAULT_ORGS, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Name of the collection config file inside the data directory.
pub const COLLECTIONS_FILE: &str = "collections.json";

/// Cloister peer node.
///
/// Hosts one organization's peer: executes asset-transfer invocations
/// against the shared ledger, serves the JSON-RPC API, and exposes
/// Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "cloister-node",
    about = "Cloister private asset-transfer peer",
    version,
    propagate_version = true
)]
pub struct CloisterNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the Cloister node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the peer.
    Run(RunArgs),
    /// Create the data directory and write a collection config.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the ledger database and collection config.
    #[arg(long, short = 'd', env = "CLOISTER_DATA_DIR", default_value = "cloister-data")]
    pub data_dir: PathBuf,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "CLOISTER_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CLOISTER_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Membership id of the organization this peer belongs to.
    #[arg(long, env = "CLOISTER_ORG_ID", default_value = "Org1MSP")]
    pub org_id: String,

    /// Collection config file (JSON).
    ///
    /// Defaults to `collections.json` in the data directory, and to the
    /// built-in two-organization layout when that file does not exist.
    #[arg(long, short = 'c', env = "CLOISTER_COLLECTIONS")]
    pub collections: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, env = "CLOISTER_LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Keep the ledger in memory only. Nothing is written to the data
    /// directory and all state is lost on exit.
    #[arg(long, env = "CLOISTER_EPHEMERAL")]
    pub ephemeral: bool,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "CLOISTER_DATA_DIR", default_value = "cloister-data")]
    pub data_dir: PathBuf,

    /// Member organizations, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_ORGS.map(String::from))]
    pub orgs: Vec<String>,

    /// Overwrite an existing collection config.
    #[arg(long)]
    pub force: bool,
}
