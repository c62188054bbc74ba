//! Environment-driven configuration

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Secrets shorter than this still work but are logged as weak
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else if app_env.eq_ignore_ascii_case("test") {
            Environment::Test
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Dotenv file for this environment
    pub fn dotenv_file(&self) -> &'static str {
        match self {
            Environment::Test => "test.env",
            Environment::Development | Environment::Production => ".env",
        }
    }
}

/// Load the environment's dotenv file, if present
///
/// Variables already set in the process environment win.
pub fn load_dotenv() {
    let file = Environment::from_env().dotenv_file();
    if dotenvy::from_filename(file).is_ok() {
        tracing::debug!(file, "loaded dotenv file");
    }
}

/// Helper to load environment variable with a default value
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Helper to load environment variable or return error
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: SecretString,
    pub host: String,
    pub port: u16,
    pub environment: Environment,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env_required("DATABASE_URL")?;

        let jwt_secret = env_required("JWT_SECRET")?;
        if jwt_secret.is_empty() {
            return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()));
        }
        let jwt_secret = SecretString::from(jwt_secret);
        if jwt_secret.expose_secret().len() < MIN_SECRET_LEN {
            tracing::warn!(min_len = MIN_SECRET_LEN, "JWT_SECRET is shorter than recommended");
        }

        let port = env_or_default("PORT", "4000")
            .parse::<u16>()
            .map_err(|e| ConfigError::ParseError {
                key: "PORT".to_string(),
                details: e.to_string(),
            })?;

        Ok(Self {
            database_url,
            jwt_secret,
            host: env_or_default("HOST", "0.0.0.0"),
            port,
            environment: Environment::from_env(),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::ParseError {
                key: "HOST".to_string(),
                details: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-with-enough-entropy-0123";

    #[test]
    fn test_environment_from_app_env() {
        temp_env::with_var_unset("APP_ENV", || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
        temp_env::with_var("APP_ENV", Some("PRODUCTION"), || {
            assert_eq!(Environment::from_env(), Environment::Production);
        });
        temp_env::with_var("APP_ENV", Some("test"), || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Test);
            assert_eq!(env.dotenv_file(), "test.env");
        });
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgres://localhost/users")),
                ("JWT_SECRET", Some(SECRET)),
                ("HOST", None),
                ("PORT", None),
                ("APP_ENV", None),
            ],
            || {
                let config = AppConfig::from_env().unwrap();
                assert_eq!(config.database_url, "postgres://localhost/users");
                assert_eq!(config.jwt_secret.expose_secret(), SECRET);
                assert_eq!(config.port, 4000);
                assert_eq!(config.environment, Environment::Development);
                assert_eq!(config.socket_addr().unwrap(), "0.0.0.0:4000".parse().unwrap());
            },
        );
    }

    #[test]
    fn test_config_requires_secret() {
        temp_env::with_vars(
            [("DATABASE_URL", Some("sqlite::memory:")), ("JWT_SECRET", None)],
            || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "JWT_SECRET"));
            },
        );

        temp_env::with_vars(
            [("DATABASE_URL", Some("sqlite::memory:")), ("JWT_SECRET", Some(""))],
            || {
                assert!(AppConfig::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_config_requires_database_url() {
        temp_env::with_vars([("DATABASE_URL", None), ("JWT_SECRET", Some(SECRET))], || {
            let err = AppConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
        });
    }

    #[test]
    fn test_config_invalid_port() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("JWT_SECRET", Some(SECRET)),
                ("PORT", Some("not-a-port")),
            ],
            || {
                let err = AppConfig::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::ParseError { ref key, .. } if key == "PORT"));
            },
        );
    }
}
