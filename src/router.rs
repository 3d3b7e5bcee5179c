//! Radix-tree request router.
//!
//! One tree per HTTP method, O(path-length) lookup. App-wide middleware wraps
//! the whole table, so it also sees `404` and `405` answers.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::method::Method;
use crate::middleware::{Layered, Middleware};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    fallback: Option<BoxedHandler>,
    layers: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), fallback: None, layers: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use kensa::{Method, Request, Response, Router};
    /// # async fn provision(_: Request) -> Response { Response::text("") }
    /// # async fn deprovision(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::Post,   "/heroku/resources",      provision)
    ///     .on(Method::Delete, "/heroku/resources/{id}", deprovision);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with an existing one.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Handler for requests no route matches. Defaults to a bare `404`.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = Some(handler.into_boxed_handler());
        self
    }

    /// Wraps every request, matched or not, in `middleware`.
    ///
    /// The first layer added is the outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(&method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Collapses the router and its layers into a single handler.
    pub fn into_handler(mut self) -> BoxedHandler {
        let layers = std::mem::take(&mut self.layers);
        let table: BoxedHandler = Arc::new(RouteTable(self));
        layers.into_iter().rev().fold(table, |inner, middleware| -> BoxedHandler {
            Arc::new(Layered::from_boxed(middleware, inner))
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// The innermost handler: method + path lookup.
struct RouteTable(Router);

impl ErasedHandler for RouteTable {
    fn call(&self, mut req: Request) -> BoxFuture {
        let Ok(method) = req.method().parse::<Method>() else {
            return Box::pin(async { Response::status(Status::MethodNotAllowed) });
        };
        match self.0.lookup(method, req.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req)
            }
            None => match &self.0.fallback {
                Some(fallback) => fallback.call(req),
                None => Box::pin(async { Response::status(Status::NotFound) }),
            },
        }
    }
}
