//! # kensa
//!
//! A Heroku add-on provider: the provisioning API Heroku calls when a user
//! adds, resizes or removes the add-on, and the single-sign-on endpoint the
//! Heroku dashboard posts to when a user opens it.
//!
//! ## The contract
//!
//! The Heroku router terminates TLS and enforces timeouts. kensa only caps
//! request bodies at [`MAX_BODY_BYTES`]. What is left is the part
//! that needs care:
//!
//! - **Access log**: one logfmt line per request with method, path, status
//!   and latency, written by a single background task ([`middleware::logger`])
//! - **Basic Auth**: the provisioning routes require the shared add-on
//!   password, compared in constant time ([`middleware::basic_auth`])
//! - **SSO**: a SHA-1 token over `id:salt:timestamp` with a freshness window,
//!   answered with a navigation cookie and a redirect ([`sso`])
//!
//! ## Wiring
//!
//! ```rust,no_run
//! use kensa::{app, Config, Server};
//! use kensa::middleware::logger::{log_channel, LogEvent, LOG_QUEUE_CAPACITY};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kensa::Error> {
//!     let config = Config::from_env()?;
//!     let (logger, sink) = log_channel(LOG_QUEUE_CAPACITY, config.log_overflow);
//!     let sink = tokio::spawn(sink.run(tokio::io::stdout()));
//!
//!     logger.emit(LogEvent::ServerStart { port: config.port }).await;
//!     let router = app::router(&config, logger);
//!     Server::bind(([0, 0, 0, 0], config.port)).serve(router).await?;
//!
//!     sink.await.ok();
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod app;
pub mod assets;
pub mod config;
pub mod middleware;
pub mod resources;
pub mod sso;

pub use config::Config;
pub use error::Error;
pub use handler::{BoxFuture, Handler};
pub use method::Method;
pub use request::{BodyError, Request};
pub use response::{ContentType, IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::{MAX_BODY_BYTES, Server};
pub use status::Status;
