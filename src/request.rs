//! Incoming HTTP request type.

use std::collections::{HashMap, HashSet};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, MapDeserializer};

/// An incoming HTTP request with its body fully buffered.
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        headers: Vec<(String, String)>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers,
            body: body.into(),
            params: HashMap::new(),
        }
    }

    /// Builds a [`Request`] from hyper's request head and the collected body.
    ///
    /// Header values that are not visible ASCII are skipped; nothing in this
    /// service reads such values.
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let headers = parts
            .headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        Self::new(parts.method.as_str(), parts.uri.path(), headers, body)
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/heroku/resources/{id}`, `req.param("id")` on
    /// `/heroku/resources/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Decodes an `application/x-www-form-urlencoded` body.
    ///
    /// A body that is not UTF-8 is rejected. When a field repeats, the first
    /// value wins. Values reach `T` as strings.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let text = std::str::from_utf8(&self.body).map_err(|_| BodyError)?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text).map_err(|_| BodyError)?;

        let mut seen = HashSet::new();
        let first = pairs.into_iter().filter(|(k, _)| seen.insert(k.clone()));
        T::deserialize(MapDeserializer::<_, ValueError>::new(first)).map_err(|_| BodyError)
    }

    /// Decodes a JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        serde_json::from_slice(&self.body).map_err(|_| BodyError)
    }
}

/// The request body could not be decoded into the expected shape.
///
/// Carries no detail: callers answer with a generic `400 Invalid body`.
#[derive(Debug, thiserror::Error)]
#[error("invalid body")]
pub struct BodyError;
