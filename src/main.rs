//! kensa binary.
//!
//! Reads configuration from the environment, starts the access-log sink on
//! stdout and serves until SIGTERM.
//!
//!   HEROKU_PASSWORD=… SSO_SALT=… PORT=5000 RUST_LOG=info cargo run

use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;

use kensa::middleware::logger::{LOG_QUEUE_CAPACITY, LogEvent, log_channel};
use kensa::{Config, Server, app};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), kensa::Error> {
    let config = Config::from_env()?;

    let (logger, sink) = log_channel(LOG_QUEUE_CAPACITY, config.log_overflow);
    let sink = tokio::spawn(sink.run(tokio::io::stdout()));

    logger.emit(LogEvent::ServerStart { port: config.port }).await;
    let router = app::router(&config, logger);

    let served = Server::bind(([0, 0, 0, 0], config.port)).serve(router).await;

    // Every logger clone is gone once the router is dropped; the sink drains
    // the queue and returns.
    match sink.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("access log write failed: {e}"),
        Err(e) => error!("access log task failed: {e}"),
    }
    served
}
