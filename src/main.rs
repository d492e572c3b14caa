use std::fs::OpenOptions;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use quickbot_teleop::config::{Args, SessionConfig};

#[tokio::main]
async fn main() {
    // Wrong argument count exits here, before any socket is opened
    let args = Args::parse();

    // The console owns the terminal, so logs go to a file
    // (set RUST_LOG=debug to see every datagram)
    let log_file = match OpenOptions::new().create(true).append(true).open(&args.log_file) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", args.log_file.display(), e);
            std::process::exit(2);
        }
    };
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = match SessionConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = quickbot_teleop::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
