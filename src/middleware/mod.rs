//! Middleware layer.
//!
//! Middleware intercepts a request on the way in and its response on the way
//! out. It is the home of the cross-cutting concerns in this service:
//!
//! - [`logger`]: per-request access log line with method, path, status, latency
//! - [`basic_auth`]: HTTP Basic credential check with a uniform `401` challenge
//!
//! A middleware either answers the request itself (short-circuit) or hands it
//! to [`Next::run`]. App-wide middleware is attached with
//! [`Router::layer`](crate::Router::layer); a single route is guarded with
//! [`layer`]:
//!
//! ```rust,no_run
//! use kensa::middleware::{self, basic_auth::{BasicAuth, SharedPassword}};
//! use kensa::{Method, Request, Response, Router};
//!
//! async fn destroy(_req: Request) -> Response { Response::text("gone") }
//!
//! let auth = BasicAuth::new(SharedPassword::new("secret"));
//! let app = Router::new()
//!     .on(Method::Delete, "/things/{id}", middleware::layer(auth, destroy));
//! ```

pub mod basic_auth;
pub mod logger;

use std::sync::Arc;

use crate::handler::{private, BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// A request interceptor.
///
/// `call` returns a `'static` future, so implementations clone whatever
/// shared state they need (an `Arc`, a channel sender) into it.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

/// The remainder of the chain after the current middleware.
pub struct Next {
    inner: BoxedHandler,
}

impl Next {
    pub(crate) fn new(inner: BoxedHandler) -> Self {
        Self { inner }
    }

    /// Runs the downstream middleware and handler.
    pub async fn run(self, req: Request) -> Response {
        self.inner.call(req).await
    }
}

/// A handler wrapped in one middleware. Itself a [`Handler`], so layers nest.
pub struct Layered {
    middleware: Arc<dyn Middleware>,
    inner: BoxedHandler,
}

impl Layered {
    pub(crate) fn from_boxed(middleware: Arc<dyn Middleware>, inner: BoxedHandler) -> Self {
        Self { middleware, inner }
    }
}

impl ErasedHandler for Layered {
    fn call(&self, req: Request) -> BoxFuture {
        self.middleware.call(req, Next::new(Arc::clone(&self.inner)))
    }
}

impl private::Sealed for Layered {}

impl Handler for Layered {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

/// Wraps `handler` so every call first passes through `middleware`.
pub fn layer(middleware: impl Middleware, handler: impl Handler) -> Layered {
    Layered::from_boxed(Arc::new(middleware), handler.into_boxed_handler())
}
