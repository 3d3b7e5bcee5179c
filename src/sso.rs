//! Single sign-on from the Heroku dashboard.
//!
//! Heroku posts a form to `/sso/login` with the resource `id`, a unix
//! `timestamp`, a `token` and an opaque `nav-data` blob. The token is the
//! lowercase hex SHA-1 of `id:salt:timestamp`, where `salt` is shared out of
//! band. A login is accepted when the token matches and the timestamp lies
//! within the configured skew of the current time (both directions).
//!
//! On success the caller is redirected to `/` with `nav-data` stored
//! verbatim in the `heroku-nav-data` cookie, scoped to `Path=/` so the
//! redirect target receives it. No server-side session exists.
//!
//! Checks run in a fixed order, each terminal:
//!
//! | Step | Failure | Response |
//! |---|---|---|
//! | decode form | body not UTF-8 | `400 Invalid body` |
//! | compare token | mismatch (constant time) | `403 Invalid token` |
//! | check timestamp | not an integer, or outside the window | `403 Invalid timestamp` |
//! | set cookie | `nav-data` cannot be carried in a cookie | `400 Invalid body` |

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::status::Status;

/// Cookie carrying the dashboard navigation blob.
pub const NAV_DATA_COOKIE: &str = "heroku-nav-data";

/// Lowercase hex SHA-1 of `id:salt:timestamp`.
pub fn signature(id: &str, salt: &str, timestamp: &str) -> String {
    format!("{:x}", Sha1::digest(format!("{id}:{salt}:{timestamp}").as_bytes()))
}

/// The posted login form. Absent fields decode as empty strings and then
/// fail the token check; a repeated field keeps its first value.
#[derive(Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "nav-data")]
    pub nav_data: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp)
            .field("token", &"<redacted>")
            .field("nav_data", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SsoError {
    #[error("Invalid body")]
    InvalidBody,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Invalid timestamp")]
    InvalidTimestamp,
}

impl SsoError {
    pub fn status(self) -> Status {
        match self {
            Self::InvalidBody => Status::BadRequest,
            Self::InvalidToken | Self::InvalidTimestamp => Status::Forbidden,
        }
    }
}

impl IntoResponse for SsoError {
    fn into_response(self) -> Response {
        Response::message(self.status(), &self.to_string())
    }
}

/// Verifies SSO login forms against the shared salt.
pub struct SsoValidator {
    salt: String,
    max_skew: Duration,
}

impl SsoValidator {
    pub fn new(salt: impl Into<String>, max_skew: Duration) -> Self {
        Self { salt: salt.into(), max_skew }
    }

    /// Checks the token and timestamp of `form` as of unix time `now`.
    pub fn validate(&self, form: &LoginForm, now: i64) -> Result<(), SsoError> {
        let expected = signature(&form.id, &self.salt, &form.timestamp);
        if !bool::from(expected.as_bytes().ct_eq(form.token.as_bytes())) {
            return Err(SsoError::InvalidToken);
        }

        let timestamp: i64 = form.timestamp.parse().map_err(|_| SsoError::InvalidTimestamp)?;
        let skew = i64::try_from(self.max_skew.as_secs()).unwrap_or(i64::MAX);
        if timestamp < now.saturating_sub(skew) || timestamp > now.saturating_add(skew) {
            return Err(SsoError::InvalidTimestamp);
        }
        Ok(())
    }

    /// Handles one login request using the current wall clock.
    pub fn login(&self, req: &Request) -> Result<Response, SsoError> {
        self.login_at(req, chrono::Utc::now().timestamp())
    }

    /// Handles one login request as of unix time `now`.
    pub fn login_at(&self, req: &Request, now: i64) -> Result<Response, SsoError> {
        let result = self.accept(req, now);
        if let Err(e) = &result {
            debug!(reason = %e, "sso login rejected");
        }
        result
    }

    fn accept(&self, req: &Request, now: i64) -> Result<Response, SsoError> {
        let form: LoginForm = req.form().map_err(|_| SsoError::InvalidBody)?;
        self.validate(&form, now)?;

        let cookie = format!("{NAV_DATA_COOKIE}={}; Path=/", form.nav_data);
        if form.nav_data.contains(';') || http::HeaderValue::from_str(&cookie).is_err() {
            return Err(SsoError::InvalidBody);
        }

        let mut res = Response::redirect("/");
        res.headers.push(("set-cookie".to_owned(), cookie));
        Ok(res)
    }
}
