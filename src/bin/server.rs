//! BucketKV Server Binary
//!
//! Starts the TCP server for BucketKV.

use std::sync::Arc;
use std::time::Duration;

use bucketkv::network::Server;
use bucketkv::{Credentials, Engine, ServerConfig, StoreConfig};
use clap::Parser;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing_subscriber::{fmt, EnvFilter};

/// BucketKV Server
#[derive(Parser, Debug)]
#[command(name = "bucketkv-server")]
#[command(about = "File-backed key-value store with bucket namespaces")]
#[command(version)]
struct Args {
    /// Data directory (one file per database)
    #[arg(short, long, default_value = "./bucketkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Username clients must authenticate with (random if omitted)
    #[arg(short, long)]
    user: Option<String>,

    /// Password clients must authenticate with (random if omitted)
    #[arg(short, long)]
    pass: Option<String>,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Give up waiting for a database lock after this many milliseconds
    #[arg(long)]
    lock_timeout_ms: Option<u64>,

    /// File size (bytes) at which commits start compacting a database
    #[arg(long, default_value = "1048576")]
    compaction_min_bytes: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bucketkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    let credentials = Credentials::new(
        args.user.unwrap_or_else(|| random_token(4)),
        args.pass.unwrap_or_else(|| random_token(4)),
    );

    tracing::info!("BucketKV Server v{}", bucketkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!(
        "Authenticated with user: {} and pw: {}",
        credentials.username,
        credentials.password
    );

    let mut store = StoreConfig::builder()
        .data_dir(&args.data_dir)
        .compaction_min_bytes(args.compaction_min_bytes);
    if let Some(ms) = args.lock_timeout_ms {
        store = store.lock_timeout(Duration::from_millis(ms));
    }

    let engine = match Engine::open(store.build()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let config = ServerConfig::builder()
        .listen_addr(&args.listen)
        .credentials(credentials)
        .worker_threads(args.workers)
        .build();

    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
