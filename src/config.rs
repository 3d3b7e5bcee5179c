//! Process configuration, read once at startup.
//!
//! Every value comes from the environment. Required values that are absent
//! or empty are a startup error; the binary exits before binding a port.
//! The resulting [`Config`] is immutable and handed to the components that
//! need it, so nothing reads the environment after `main` starts serving.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::middleware::logger::OverflowPolicy;

/// Default freshness window for SSO login timestamps.
pub const DEFAULT_SSO_MAX_SKEW: Duration = Duration::from_secs(120);

/// Immutable service configuration.
#[derive(Clone)]
pub struct Config {
    /// Shared Basic Auth password for the provisioning API.
    pub password: String,
    /// Shared salt mixed into SSO token signatures.
    pub sso_salt: String,
    pub port: u16,
    /// Directory holding `index.html`, `style.css` and `404.html`.
    pub public_dir: PathBuf,
    pub log_overflow: OverflowPolicy,
    pub sso_max_skew: Duration,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `HEROKU_PASSWORD`, `SSO_SALT` and `PORT` are required. `PUBLIC_DIR`,
    /// `LOG_OVERFLOW` (`block` | `drop`) and `SSO_MAX_SKEW_SECS` are optional.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(Error::MissingEnv(key))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let password = required("HEROKU_PASSWORD")?;
        let sso_salt = required("SSO_SALT")?;
        let port = required("PORT")?
            .parse::<u16>()
            .map_err(|e| Error::InvalidEnv { name: "PORT", reason: e.to_string() })?;

        let public_dir = optional("PUBLIC_DIR").map_or_else(|| PathBuf::from("public"), PathBuf::from);

        let log_overflow = match optional("LOG_OVERFLOW").as_deref() {
            None | Some("block") => OverflowPolicy::Block,
            Some("drop") => OverflowPolicy::DropNewest,
            Some(other) => {
                return Err(Error::InvalidEnv {
                    name: "LOG_OVERFLOW",
                    reason: format!("expected `block` or `drop`, got `{other}`"),
                });
            }
        };

        let sso_max_skew = match optional("SSO_MAX_SKEW_SECS") {
            None => DEFAULT_SSO_MAX_SKEW,
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| Error::InvalidEnv { name: "SSO_MAX_SKEW_SECS", reason: e.to_string() })?,
        };

        Ok(Self { password, sso_salt, port, public_dir, log_overflow, sso_max_skew })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("password", &"<redacted>")
            .field("sso_salt", &"<redacted>")
            .field("port", &self.port)
            .field("public_dir", &self.public_dir)
            .field("log_overflow", &self.log_overflow)
            .field("sso_max_skew", &self.sso_max_skew)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 3] = [
        ("HEROKU_PASSWORD", "pw"),
        ("SSO_SALT", "salt"),
        ("PORT", "5000"),
    ];

    #[test]
    fn defaults_apply_when_optional_values_absent() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert_eq!(config.log_overflow, OverflowPolicy::Block);
        assert_eq!(config.sso_max_skew, Duration::from_secs(120));
    }

    #[test]
    fn missing_password_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SSO_SALT", "s"), ("PORT", "1")])).unwrap_err();
        assert!(matches!(err, Error::MissingEnv("HEROKU_PASSWORD")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let err = Config::from_lookup(lookup(&[
            ("HEROKU_PASSWORD", "pw"),
            ("SSO_SALT", ""),
            ("PORT", "1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::MissingEnv("SSO_SALT")));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("HEROKU_PASSWORD", "pw"),
            ("SSO_SALT", "s"),
            ("PORT", "http"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidEnv { name: "PORT", .. }));
    }

    #[test]
    fn drop_policy_is_selectable() {
        let mut pairs = BASE.to_vec();
        pairs.push(("LOG_OVERFLOW", "drop"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.log_overflow, OverflowPolicy::DropNewest);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_lookup(lookup(&BASE)).unwrap();
        let shown = format!("{config:?}");
        assert!(!shown.contains("\"pw\""));
        assert!(!shown.contains("\"salt\""));
        assert!(shown.contains("<redacted>"));
    }
}
