// Copyright (c) 2026 Cloister Contributors. MIT License.
// See LICENSE for details.

//! # Cloister Peer Node
//!
//! Entry point for the `cloister-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the ledger, and serves the
//! HTTP/WS API for one organization's peer.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : serve the peer
//! - `init`   : create the data directory and collection config
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;

use cloister_protocol::config::{private_collection_name, DEFAULT_ORGS};
use cloister_protocol::storage::{CollectionConfig, MemoryWorldState, SledWorldState, WorldState};
use cloister_protocol::transaction::Peer;

use cli::{CloisterNodeCli, Commands, COLLECTIONS_FILE};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CloisterNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the peer: ledger, API server, and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::RUN_FILTER, args.log_format)
        .context("failed to initialize logging")?;

    tracing::info!(
        org_id = %args.org_id,
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        ephemeral = args.ephemeral,
        "starting cloister-node"
    );

    // --- Collections ---
    let collections = Arc::new(load_collections(&args)?);
    let own_partition = private_collection_name(&args.org_id);
    collections
        .policy(&own_partition)
        .with_context(|| format!("collection config has no partition for {}", args.org_id))?;

    // --- Ledger ---
    let ledger: Arc<dyn WorldState> = if args.ephemeral {
        tracing::warn!("ephemeral ledger: state is lost on exit");
        Arc::new(MemoryWorldState::new())
    } else {
        let db_path = args.data_dir.join("ledger");
        std::fs::create_dir_all(&db_path).with_context(|| {
            format!("failed to create ledger directory: {}", db_path.display())
        })?;
        let db = SledWorldState::open(&db_path)
            .with_context(|| format!("failed to open ledger at {}", db_path.display()))?;
        tracing::info!(
            path = %db_path.display(),
            transactions = db.transaction_count(),
            "ledger opened"
        );
        Arc::new(db)
    };

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    let height = ledger.height().context("failed to read ledger height")?;
    node_metrics.ledger_height.set(height as i64);

    // --- Application state ---
    let peer = Peer::new(args.org_id.clone(), ledger, collections);
    let app_state = api::AppState::new(peer, Arc::clone(&node_metrics));

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("cloister-node stopped");
    Ok(())
}

/// The collection config named on the command line, else the one in the
/// data directory, else the built-in two-organization layout.
fn load_collections(args: &cli::RunArgs) -> Result<CollectionConfig> {
    let in_data_dir = args.data_dir.join(COLLECTIONS_FILE);
    let path = match &args.collections {
        Some(path) => path.clone(),
        None if in_data_dir.exists() => in_data_dir,
        None => {
            tracing::info!(orgs = ?DEFAULT_ORGS, "using built-in collection config");
            return CollectionConfig::for_orgs(&DEFAULT_ORGS)
                .context("failed to build default collection config");
        }
    };
    read_collections(&path)
}

fn read_collections(path: &Path) -> Result<CollectionConfig> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read collection config {}", path.display()))?;
    let config = CollectionConfig::from_json(&bytes)
        .with_context(|| format!("invalid collection config {}", path.display()))?;
    tracing::info!(path = %path.display(), "collection config loaded");
    Ok(config)
}

/// Creates the data directory and writes the collection config for the
/// given member organizations.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::INIT_FILTER, LogFormat::Pretty)
        .context("failed to initialize logging")?;
    tracing::info!(data_dir = %args.data_dir.display(), orgs = ?args.orgs, "initializing node");

    let (config_path, config) = write_collections(&args)?;

    println!("Node initialized successfully.");
    println!("  Data directory    : {}", args.data_dir.display());
    println!("  Collection config : {}", config_path.display());
    println!("  Organizations     : {}", args.orgs.join(", "));
    for name in config.names() {
        println!("    - {}", name);
    }

    Ok(())
}

fn write_collections(args: &cli::InitArgs) -> Result<(PathBuf, CollectionConfig)> {
    if args.orgs.is_empty() {
        bail!("at least one organization is required");
    }

    std::fs::create_dir_all(&args.data_dir).with_context(|| {
        format!("failed to create data directory: {}", args.data_dir.display())
    })?;

    let config_path = args.data_dir.join(COLLECTIONS_FILE);
    if config_path.exists() && !args.force {
        bail!(
            "{} already exists; pass --force to overwrite",
            config_path.display()
        );
    }

    let config = CollectionConfig::for_orgs(&args.orgs)
        .context("failed to build collection config")?;
    let rendered = config
        .to_json_pretty()
        .context("failed to render collection config")?;
    std::fs::write(&config_path, rendered)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    Ok((config_path, config))
}

/// Prints version information to stdout.
fn print_version() {
    println!("cloister-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", cloister_protocol::config::PROTOCOL_VERSION);
    println!(
        "hash          {}",
        cloister_protocol::config::CONTENT_HASH_ALGORITHM
    );
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(data_dir: &Path, collections: Option<&Path>) -> cli::RunArgs {
        let mut argv = vec![
            "cloister-node".to_string(),
            "run".to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
        ];
        if let Some(path) = collections {
            argv.push("--collections".into());
            argv.push(path.display().to_string());
        }
        match CloisterNodeCli::parse_from(argv).command {
            Commands::Run(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn builtin_collections_when_nothing_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_collections(&run_args(dir.path(), None)).unwrap();
        assert!(config.policy("Org1MSPPrivateCollection").is_ok());
        assert!(config.policy("Org2MSPPrivateCollection").is_ok());
    }

    fn init_args(data_dir: &Path, extra: &[&str]) -> cli::InitArgs {
        let mut argv = vec![
            "cloister-node".to_string(),
            "init".to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        match CloisterNodeCli::parse_from(argv).command {
            Commands::Init(args) => args,
            _ => unreachable!(),
        }
    }

    #[test]
    fn init_output_is_loaded_by_run() {
        let dir = tempfile::tempdir().unwrap();
        let args = init_args(dir.path(), &["--orgs", "AcmeMSP,GlobexMSP,InitechMSP"]);
        let (path, _) = write_collections(&args).unwrap();
        assert_eq!(path, dir.path().join(COLLECTIONS_FILE));

        let loaded = load_collections(&run_args(dir.path(), None)).unwrap();
        assert!(loaded.policy("InitechMSPPrivateCollection").is_ok());
        assert!(loaded.policy("Org1MSPPrivateCollection").is_err());
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        write_collections(&init_args(dir.path(), &[])).unwrap();
        assert!(write_collections(&init_args(dir.path(), &[])).is_err());
        write_collections(&init_args(dir.path(), &["--force"])).unwrap();
    }

    #[test]
    fn explicit_collections_path_must_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{").unwrap();
        assert!(load_collections(&run_args(dir.path(), Some(&path))).is_err());
    }
}
