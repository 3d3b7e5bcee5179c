//! The add-on's route table.
//!
//! | Route | Guard | Handler |
//! |---|---|---|
//! | `GET /`, `GET /style.css` | none | [`Assets`] |
//! | `POST /heroku/resources` | Basic Auth | [`resources::provision`] |
//! | `PUT /heroku/resources/{id}` | Basic Auth | [`resources::change_plan`] |
//! | `DELETE /heroku/resources/{id}` | Basic Auth | [`resources::deprovision`] |
//! | `POST /sso/login` | token + timestamp | [`SsoValidator`] |
//! | anything else | none | 404 page |
//!
//! Every request, including 404s, passes through the access logger first.

use std::future;
use std::sync::Arc;

use crate::assets::Assets;
use crate::config::Config;
use crate::method::Method;
use crate::middleware::basic_auth::{BasicAuth, SharedPassword};
use crate::middleware::layer;
use crate::middleware::logger::RequestLogger;
use crate::request::Request;
use crate::resources;
use crate::router::Router;
use crate::sso::SsoValidator;

pub fn router(config: &Config, logger: RequestLogger) -> Router {
    let auth = BasicAuth::new(SharedPassword::new(config.password.clone()));
    let sso = Arc::new(SsoValidator::new(config.sso_salt.clone(), config.sso_max_skew));
    let assets = Assets::new(config.public_dir.clone());

    let index = {
        let assets = assets.clone();
        move |req: Request| {
            let assets = assets.clone();
            async move { assets.index(req).await }
        }
    };
    let stylesheet = {
        let assets = assets.clone();
        move |req: Request| {
            let assets = assets.clone();
            async move { assets.stylesheet(req).await }
        }
    };
    let not_found = move |req: Request| {
        let assets = assets.clone();
        async move { assets.not_found(req).await }
    };
    let login = move |req: Request| future::ready(sso.login(&req));

    Router::new()
        .on(Method::Get,    "/",                      index)
        .on(Method::Get,    "/style.css",             stylesheet)
        .on(Method::Post,   "/heroku/resources",      layer(auth.clone(), resources::provision))
        .on(Method::Put,    "/heroku/resources/{id}", layer(auth.clone(), resources::change_plan))
        .on(Method::Delete, "/heroku/resources/{id}", layer(auth, resources::deprovision))
        .on(Method::Post,   "/sso/login",             login)
        .fallback(not_found)
        .layer(logger)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    use super::*;
    use crate::handler::BoxedHandler;
    use crate::middleware::logger::{LogSink, OverflowPolicy, log_channel};
    use crate::response::Response;
    use crate::sso::signature;

    const PASSWORD: &str = "heroku-pw";
    const SALT: &str = "shared-salt";

    fn config() -> Config {
        Config {
            password: PASSWORD.to_owned(),
            sso_salt: SALT.to_owned(),
            port: 0,
            public_dir: PathBuf::from("/nonexistent/kensa-public"),
            log_overflow: OverflowPolicy::Block,
            sso_max_skew: Duration::from_secs(120),
        }
    }

    fn app() -> (BoxedHandler, LogSink) {
        let (logger, sink) = log_channel(64, OverflowPolicy::Block);
        (router(&config(), logger).into_handler(), sink)
    }

    async fn log_lines(app: BoxedHandler, sink: LogSink) -> Vec<String> {
        drop(app);
        let mut out = Vec::new();
        sink.run(&mut out).await.unwrap();
        String::from_utf8(out).unwrap().lines().map(str::to_owned).collect()
    }

    fn authed(method: &str, path: &str, password: &str, body: &str) -> Request {
        let header = format!("Basic {}", STANDARD.encode(format!("heroku:{password}")));
        Request::new(method, path, vec![("authorization".to_owned(), header)], body.to_owned())
    }

    fn sso_body(id: &str, ts: &str, token: &str, nav: &str) -> Request {
        let body = format!("id={id}&timestamp={ts}&token={token}&nav-data={nav}");
        Request::new(
            "POST",
            "/sso/login",
            vec![("content-type".to_owned(), "application/x-www-form-urlencoded".to_owned())],
            body,
        )
    }

    fn text(res: &Response) -> String {
        String::from_utf8_lossy(res.body()).into_owned()
    }

    #[tokio::test]
    async fn sso_login_sets_cookie_and_redirects() {
        let (app, sink) = app();
        let now = chrono::Utc::now().timestamp().to_string();
        let token = signature("42", SALT, &now);

        let res = app.call(sso_body("42", &now, &token, "abc")).await;
        assert_eq!(res.status_code(), 302);
        assert_eq!(res.header("location"), Some("/"));
        assert_eq!(res.header("set-cookie"), Some("heroku-nav-data=abc; Path=/"));

        let lines = log_lines(app, sink).await;
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("method=POST path=/sso/login status=302"));
        assert!(!lines[0].contains(&token));
    }

    #[tokio::test]
    async fn sso_login_with_altered_token_is_forbidden() {
        let (app, _sink) = app();
        let now = chrono::Utc::now().timestamp().to_string();
        let mut token = signature("42", SALT, &now);
        let flipped = if token.starts_with('a') { "b" } else { "a" };
        token.replace_range(0..1, flipped);

        let res = app.call(sso_body("42", &now, &token, "abc")).await;
        assert_eq!(res.status_code(), 403);
        assert!(text(&res).contains("Invalid token"));
        assert_eq!(res.header("set-cookie"), None);
    }

    #[tokio::test]
    async fn sso_login_with_stale_timestamp_is_forbidden() {
        let (app, _sink) = app();
        let stale = (chrono::Utc::now().timestamp() - 121).to_string();
        let token = signature("42", SALT, &stale);

        let res = app.call(sso_body("42", &stale, &token, "abc")).await;
        assert_eq!(res.status_code(), 403);
        assert!(text(&res).contains("Invalid timestamp"));
    }

    #[tokio::test]
    async fn provisioning_without_credentials_is_challenged() {
        let (app, sink) = app();
        let req = Request::new("POST", "/heroku/resources", Vec::new(), r#"{"heroku_id":"a","plan":"b"}"#);

        let res = app.call(req).await;
        assert_eq!(res.status_code(), 401);
        assert_eq!(res.header("www-authenticate"), Some(r#"Basic realm="private""#));
        assert!(text(&res).contains("Unauthorized"));
        assert!(!text(&res).contains("All set up"));

        let lines = log_lines(app, sink).await;
        assert!(lines[0].contains("path=/heroku/resources status=401"));
    }

    #[tokio::test]
    async fn provisioning_with_wrong_password_is_challenged() {
        let (app, _sink) = app();
        let res = app.call(authed("POST", "/heroku/resources", "guess", "{}")).await;
        assert_eq!(res.status_code(), 401);
    }

    #[tokio::test]
    async fn provisioning_lifecycle_with_credentials() {
        let (app, sink) = app();

        let res = app
            .call(authed("POST", "/heroku/resources", PASSWORD, r#"{"heroku_id":"app1","plan":"test"}"#))
            .await;
        assert_eq!(res.status_code(), 200);
        assert!(text(&res).contains("All set up!"));

        let res = app
            .call(authed("PUT", "/heroku/resources/1", PASSWORD, r#"{"heroku_id":"app1","plan":"big"}"#))
            .await;
        assert!(text(&res).contains("All updated!"));

        let res = app.call(authed("DELETE", "/heroku/resources/1", PASSWORD, "")).await;
        assert!(text(&res).contains("All torn down!"));

        let res = app.call(authed("POST", "/heroku/resources", PASSWORD, "not json")).await;
        assert_eq!(res.status_code(), 400);

        let lines = log_lines(app, sink).await;
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| !l.contains(PASSWORD)));
    }

    #[tokio::test]
    async fn unmatched_routes_are_logged_404s() {
        let (app, sink) = app();
        let res = app.call(Request::new("GET", "/nope", Vec::new(), "")).await;
        assert_eq!(res.status_code(), 404);

        let lines = log_lines(app, sink).await;
        assert!(lines[0].contains("method=GET path=/nope status=404"));
    }
}
