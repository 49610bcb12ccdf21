//! respkv Server Binary
//!
//! Starts the TCP server for respkv.

use std::sync::Arc;
use std::thread;

use clap::Parser;
use respkv::{Config, Server, ShutdownOutcome};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};

/// respkv Server
#[derive(Parser, Debug)]
#[command(name = "respkv-server")]
#[command(about = "Minimal in-memory key-value server speaking RESP2")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6379")]
    listen: String,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(short, long, default_value = "1000")]
    max_clients: usize,

    /// Read timeout for client connections in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    read_timeout_ms: u64,

    /// Write timeout for client connections in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    write_timeout_ms: u64,

    /// Close connections idle for this many milliseconds (0 = never)
    #[arg(long, default_value = "300000")]
    idle_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,respkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("respkv Server v{}", respkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_clients)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .idle_timeout_ms(args.idle_timeout_ms)
        .build();

    let handle = match Server::bind(config).and_then(Server::start) {
        Ok(handle) => Arc::new(handle),
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up SIGINT/SIGTERM handler
    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(signals) => signals,
        Err(e) => {
            tracing::error!("Failed to install signal handlers: {}", e);
            std::process::exit(1);
        }
    };

    let signal_handle = Arc::clone(&handle);
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!("Received signal {}, initiating graceful shutdown...", signal);
            if signal_handle.shutdown() == ShutdownOutcome::TimedOut {
                tracing::warn!("Some connections did not close in time");
            }
        }
    });

    handle.wait();
    tracing::info!("Server stopped");
}
