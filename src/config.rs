//! Process configuration, read once at startup from the environment.

use std::env;
use std::str::FromStr;

/// Upper bound for `JWT_EXPIRES_IN_DAYS`.
pub const MAX_TOKEN_TTL_DAYS: i64 = 3650;

/// Errors raised while building a [`Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings for the server, the auth layer and the realtime hub.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    /// Signing secret for session tokens.
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    /// Origin allowed by CORS with credentials.
    pub frontend_url: String,
    /// Enables `Secure` + `SameSite=None` on the session cookie.
    pub production: bool,
    /// Frames queued per realtime connection before new ones are dropped.
    pub realtime_buffer: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup, so tests don't have to touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", 10u32)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let token_ttl_days = parse_or(&lookup, "JWT_EXPIRES_IN_DAYS", 7i64)?;
        if !(1..=MAX_TOKEN_TTL_DAYS).contains(&token_ttl_days) {
            return Err(ConfigError::Invalid {
                name: "JWT_EXPIRES_IN_DAYS",
                value: token_ttl_days.to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3001)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            token_ttl_days,
            bcrypt_cost,
            frontend_url: lookup("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:5173".to_string()),
            production: lookup("APP_ENV").as_deref() == Some("production"),
            realtime_buffer: parse_or(&lookup, "REALTIME_BUFFER", 64)?,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", "secret")])).unwrap();

        assert!(config.database_url.is_none());
        assert_eq!(config.server_port, 3001);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.token_ttl_days, 7);
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.realtime_buffer, 64);
        assert!(!config.production);
        assert_eq!(config.server_url(), "http://127.0.0.1:3001");
    }

    #[test]
    fn test_config_custom_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("DATABASE_URL", "postgres://test"),
            ("SERVER_PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("BCRYPT_COST", "4"),
            ("APP_ENV", "production"),
        ]))
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://test"));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.bcrypt_cost, 4);
        assert!(config.production);
    }

    #[test]
    fn test_config_requires_secret() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let err = Config::from_lookup(lookup_from(&[("JWT_SECRET", "")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("SERVER_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SERVER_PORT", .. }));

        let err = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("BCRYPT_COST", "2"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BCRYPT_COST", .. }));
    }

    #[test]
    fn test_config_rejects_bad_ttl() {
        for value in ["-1", "0", "3651", "1000000000", "week"] {
            let err = Config::from_lookup(lookup_from(&[
                ("JWT_SECRET", "secret"),
                ("JWT_EXPIRES_IN_DAYS", value),
            ]))
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "JWT_EXPIRES_IN_DAYS", .. }),
                "accepted JWT_EXPIRES_IN_DAYS={}",
                value
            );
        }

        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", "secret"),
            ("JWT_EXPIRES_IN_DAYS", "3650"),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_days, MAX_TOKEN_TTL_DAYS);
    }
}
