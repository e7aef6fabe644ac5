//! sablekv Server Binary
//!
//! Starts the TCP server for sablekv.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sablekv::network::Server;
use sablekv::{Config, Engine};

/// sablekv server
#[derive(Parser, Debug)]
#[command(name = "sablekv-server", version)]
#[command(about = "Persistent key-value store server")]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./sablekv_data")]
    data_dir: String,

    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Memtable entry count before a flush is triggered
    #[arg(long, default_value_t = 4096)]
    memtable_size: usize,

    /// Live SSTable count before compaction is triggered
    #[arg(long, default_value_t = 10)]
    compaction_threshold: usize,

    /// Max concurrent client connections
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(args.listen)
        .memtable_size(args.memtable_size)
        .compaction_threshold(args.compaction_threshold)
        .max_connections(args.max_connections)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            tracing::error!("failed to open engine in {}: {}", args.data_dir, e);
            std::process::exit(1);
        }
    };

    tracing::info!("sablekv {} serving {}", sablekv::VERSION, args.data_dir);

    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
