//! API server configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use estate_core::auth::password::DEFAULT_BCRYPT_COST;
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::{info, warn};

/// Shortest `JWT_SECRET` accepted in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

/// Deployment mode. Production turns on `Secure` cookies and requires a
/// configured signing secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when APP_ENV=production")]
    MissingSecret,

    #[error("JWT_SECRET must be at least {0} characters when APP_ENV=production")]
    WeakSecret(usize),

    #[error("Invalid APP_ENV value: {0}")]
    InvalidEnvironment(String),

    #[error("Invalid {key} value: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub environment: Environment,
    /// Origins allowed to make credentialed cross-origin requests.
    pub cors_origins: Vec<String>,
    /// bcrypt cost for passwords and refresh-token records.
    pub bcrypt_cost: u32,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("jwt_secret", &"<redacted>")
            .field("environment", &self.environment)
            .field("cors_origins", &self.cors_origins)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable       | Default                                          |
    /// |----------------|--------------------------------------------------|
    /// | `BIND_ADDR`    | `127.0.0.1:3000`                                 |
    /// | `DATABASE_URL` | unset (in-memory store)                          |
    /// | `APP_ENV`      | `development`                                    |
    /// | `JWT_SECRET`   | required in production; generated & persisted in development |
    /// | `CORS_ORIGINS` | empty (comma-separated list)                     |
    /// | `BCRYPT_COST`  | `10`                                             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("APP_ENV")
            .map(|v| v.parse::<Environment>())
            .transpose()?
            .unwrap_or(Environment::Development);

        let bcrypt_cost = match lookup("BCRYPT_COST") {
            None => DEFAULT_BCRYPT_COST,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|cost| (4..=31).contains(cost))
                .ok_or(ConfigError::InvalidValue {
                    key: "BCRYPT_COST",
                    value: raw,
                })?,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let jwt_secret = resolve_jwt_secret(environment, lookup("JWT_SECRET"))?;

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            jwt_secret,
            environment,
            cors_origins,
            bcrypt_cost,
        })
    }

    /// Development configuration with an explicit secret and no database.
    pub fn development(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            database_url: None,
            jwt_secret: jwt_secret.into(),
            environment: Environment::Development,
            cors_origins: Vec::new(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

/// Production requires a strong configured secret. Development falls back to
/// a generated secret persisted under the user's data dir.
fn resolve_jwt_secret(
    environment: Environment,
    configured: Option<String>,
) -> Result<String, ConfigError> {
    let configured = configured.filter(|s| !s.is_empty());
    match (environment, configured) {
        (Environment::Production, None) => Err(ConfigError::MissingSecret),
        (Environment::Production, Some(secret)) if secret.len() < MIN_PRODUCTION_SECRET_LEN => {
            Err(ConfigError::WeakSecret(MIN_PRODUCTION_SECRET_LEN))
        }
        (_, Some(secret)) => Ok(secret),
        (Environment::Development, None) => {
            warn!("JWT_SECRET not set, using a generated development secret");
            Ok(persisted_dev_secret())
        }
    }
}

fn persisted_dev_secret() -> String {
    let secret_path = dev_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(&secret_path, &secret) {
        Ok(()) => info!(path = %secret_path.display(), "generated new development JWT secret"),
        Err(e) => warn!(path = %secret_path.display(), "could not persist JWT secret: {e}"),
    }
    secret
}

/// Path to the persisted development JWT secret.
fn dev_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("estate")
        .join("jwt-secret")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const STRONG: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn production_without_secret_is_fatal() {
        let err = ApiConfig::from_lookup(lookup(&[("APP_ENV", "production")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn production_with_empty_secret_is_fatal() {
        let err = ApiConfig::from_lookup(lookup(&[("APP_ENV", "production"), ("JWT_SECRET", "")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn production_with_weak_secret_is_fatal() {
        let err = ApiConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::WeakSecret(MIN_PRODUCTION_SECRET_LEN)));
    }

    #[test]
    fn production_with_strong_secret_loads() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", STRONG),
            ("CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("DATABASE_URL", "postgres://db/estate"),
        ]))
        .unwrap();
        assert!(config.is_production());
        assert_eq!(config.jwt_secret, STRONG);
        assert_eq!(config.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.database_url.as_deref(), Some("postgres://db/estate"));
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
    }

    #[test]
    fn development_accepts_any_configured_secret() {
        let config = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "dev")])).unwrap();
        assert!(!config.is_production());
        assert_eq!(config.jwt_secret, "dev");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[("APP_ENV", "staging")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(_)));
    }

    #[test]
    fn out_of_range_bcrypt_cost_is_rejected() {
        let err = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "dev"), ("BCRYPT_COST", "2")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "BCRYPT_COST", .. }));
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let config = ApiConfig::development("super-secret-value");
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }
}
