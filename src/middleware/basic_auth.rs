//! HTTP Basic authentication guard.
//!
//! The guard only parses the `Authorization` header; deciding whether the
//! decoded pair is acceptable belongs to a [`CredentialVerifier`]. Every
//! failure (missing header, wrong scheme, bad base64, no `:` separator,
//! rejected credentials) produces the same `401` challenge, so a client
//! cannot tell which stage refused it.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::handler::BoxFuture;
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Realm advertised in the `WWW-Authenticate` challenge.
pub const REALM: &str = "private";

/// A decoded `username:password` pair. Lives for one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Parses an `Authorization` header value of the form `Basic <base64>`.
    ///
    /// The scheme must be exactly `Basic`. The decoded payload must be UTF-8
    /// and is split on the first `:`; anything else yields `None`.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, payload) = value.split_once(' ')?;
        if scheme != "Basic" {
            return None;
        }
        let decoded = STANDARD.decode(payload).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self { username: username.to_owned(), password: password.to_owned() })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Decides whether a username/password pair is acceptable.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, username: &str, password: &str) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&str, &str) -> bool + Send + Sync + 'static,
{
    fn verify(&self, username: &str, password: &str) -> bool {
        self(username, password)
    }
}

/// Accepts any username with one shared password, compared in constant time.
pub struct SharedPassword {
    password: String,
}

impl SharedPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self { password: password.into() }
    }
}

impl CredentialVerifier for SharedPassword {
    fn verify(&self, _username: &str, password: &str) -> bool {
        password.as_bytes().ct_eq(self.password.as_bytes()).into()
    }
}

/// Returns whether `req` carries Basic credentials that `verifier` accepts.
pub fn verify(req: &Request, verifier: &dyn CredentialVerifier) -> bool {
    req.header("authorization")
        .and_then(Credentials::from_header)
        .is_some_and(|c| verifier.verify(&c.username, &c.password))
}

/// `Ok(())` if `req` is authorised, otherwise the `401` challenge to send.
pub fn ensure(req: &Request, verifier: &dyn CredentialVerifier) -> Result<(), Response> {
    if verify(req, verifier) {
        return Ok(());
    }
    debug!(method = req.method(), path = req.path(), "basic auth rejected");
    Err(challenge())
}

fn challenge() -> Response {
    let mut res = Response::message(Status::Unauthorized, "Unauthorized");
    res.headers.push(("www-authenticate".to_owned(), format!(r#"Basic realm="{REALM}""#)));
    res
}

/// Middleware form of [`ensure`].
#[derive(Clone)]
pub struct BasicAuth {
    verifier: Arc<dyn CredentialVerifier>,
}

impl BasicAuth {
    pub fn new(verifier: impl CredentialVerifier) -> Self {
        Self { verifier: Arc::new(verifier) }
    }
}

impl Middleware for BasicAuth {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        match ensure(&req, self.verifier.as_ref()) {
            Ok(()) => Box::pin(next.run(req)),
            Err(denied) => Box::pin(async move { denied }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::handler::Handler;
    use crate::middleware::layer;

    fn basic(raw: &str) -> String {
        format!("Basic {}", STANDARD.encode(raw))
    }

    fn with_auth(value: Option<&str>) -> Request {
        let headers = value
            .map(|v| vec![("Authorization".to_owned(), v.to_owned())])
            .unwrap_or_default();
        Request::new("POST", "/heroku/resources", headers, "")
    }

    #[test]
    fn parses_well_formed_header() {
        let creds = Credentials::from_header(&basic("heroku:s3cret:with:colons")).unwrap();
        assert_eq!(creds.username, "heroku");
        assert_eq!(creds.password, "s3cret:with:colons");
    }

    #[test]
    fn malformed_headers_fail_verification() {
        let verifier = SharedPassword::new("pw");
        let cases = [
            None,
            Some(String::new()),
            Some(format!("Bearer {}", STANDARD.encode("u:pw"))),
            Some(format!("basic {}", STANDARD.encode("u:pw"))),
            Some("Basic".to_owned()),
            Some("Basic !!!not-base64!!!".to_owned()),
            Some(basic("no-colon-here")),
        ];
        for case in cases {
            assert!(!verify(&with_auth(case.as_deref()), &verifier), "accepted {case:?}");
        }
    }

    #[test]
    fn shared_password_ignores_username() {
        let verifier = SharedPassword::new("pw");
        assert!(verify(&with_auth(Some(&basic("anyone:pw"))), &verifier));
        assert!(verify(&with_auth(Some(&basic(":pw"))), &verifier));
        assert!(!verify(&with_auth(Some(&basic("anyone:pw2"))), &verifier));
        assert!(!verify(&with_auth(Some(&basic("anyone:"))), &verifier));
    }

    #[test]
    fn closures_are_verifiers() {
        let only_alice = |u: &str, p: &str| u == "alice" && p == "pw";
        assert!(verify(&with_auth(Some(&basic("alice:pw"))), &only_alice));
        assert!(!verify(&with_auth(Some(&basic("bob:pw"))), &only_alice));
    }

    #[test]
    fn ensure_challenges_on_failure() {
        let denied = ensure(&with_auth(None), &SharedPassword::new("pw")).unwrap_err();
        assert_eq!(denied.status_code(), 401);
        assert_eq!(denied.header("www-authenticate"), Some(r#"Basic realm="private""#));
        assert!(String::from_utf8_lossy(denied.body()).contains("Unauthorized"));

        assert!(ensure(&with_auth(Some(&basic("x:pw"))), &SharedPassword::new("pw")).is_ok());
    }

    #[test]
    fn challenge_never_echoes_credentials() {
        let denied = ensure(&with_auth(Some(&basic("mallory:guess"))), &SharedPassword::new("pw"))
            .unwrap_err();
        let body = String::from_utf8_lossy(denied.body()).into_owned();
        assert!(!body.contains("mallory"));
        assert!(!body.contains("guess"));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials { username: "u".into(), password: "hunter2".into() };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn middleware_skips_handler_when_denied() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = layer(BasicAuth::new(SharedPassword::new("pw")), move |_req: Request| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Response::text("created")
            }
        })
        .into_boxed_handler();

        let res = handler.call(with_auth(None)).await;
        assert_eq!(res.status_code(), 401);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let res = handler.call(with_auth(Some(&basic("heroku:pw")))).await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
