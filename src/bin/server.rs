//! msgboard Server Binary
//!
//! Serves the control plane (UDP) and the data plane (TCP) on one port.

use std::sync::Arc;

use clap::Parser;
use msgboard::network::Server;
use msgboard::validation::is_valid_port;
use msgboard::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// msgboard Server
#[derive(Parser, Debug)]
#[command(name = "msgboard-server")]
#[command(about = "Centralized message board server")]
#[command(version)]
struct Args {
    /// Port for both UDP and TCP
    #[arg(short, long, default_value_t = msgboard::config::DEFAULT_PORT.to_string())]
    port: String,

    /// Log every request with its origin
    #[arg(short, long)]
    verbose: bool,

    /// Data directory
    #[arg(short, long, default_value = "./msgboard_data")]
    data_dir: String,

    /// Maximum concurrent TCP connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,
}

fn main() {
    let args = Args::parse();

    // Initialize tracing/logging
    let default_filter = if args.verbose {
        "info,msgboard=debug"
    } else {
        "info,msgboard=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    if !is_valid_port(&args.port) {
        tracing::error!("Invalid port: {}", args.port);
        std::process::exit(1);
    }

    let listen = format!("0.0.0.0:{}", args.port);
    tracing::info!("msgboard server v{}", msgboard::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", listen);

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(listen)
        .max_connections(args.max_connections)
        .verbose(args.verbose)
        .build();

    // Open engine
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    // Bind and serve until the process is stopped
    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
