// Process configuration loaded from the environment

use std::env;
use std::path::PathBuf;

/// Errors raised while reading configuration at start-up
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration for the API server
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Signing key for identity tokens. There is no fallback value.
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// Directory that backs `/uploads`
    pub upload_dir: PathBuf,
    /// Base URL handed to dashboard clients
    pub public_api_url: String,
    pub db_max_connections: u32,
    /// Request body limit for multipart uploads, in bytes
    pub max_upload_bytes: usize,
    pub seed_admin: Option<SeedAdmin>,
}

/// Credentials for the administrator account upserted on start-up
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// `DATABASE_URL` and `JWT_SECRET` are required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parsed("PORT", 5000u16)?;
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));
        let public_api_url = env::var("PUBLIC_API_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));
        let db_max_connections = parsed("DB_MAX_CONNECTIONS", 5u32)?;
        let max_upload_bytes = parsed("MAX_UPLOAD_BYTES", 50 * 1024 * 1024usize)?;

        let seed_admin = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(SeedAdmin { email, password })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            host,
            port,
            upload_dir,
            public_api_url,
            db_max_connections,
            max_upload_bytes,
            seed_admin,
        })
    }

    /// Socket address string the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(name));
    }
    Ok(value)
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global, so everything touching it lives in one test.
    #[test]
    fn test_from_env_requires_secret_and_applies_defaults() {
        env::set_var("DATABASE_URL", "postgresql://localhost/brokerage");
        env::remove_var("JWT_SECRET");
        env::remove_var("PORT");
        env::remove_var("UPLOAD_DIR");
        env::remove_var("PUBLIC_API_URL");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        env::set_var("JWT_SECRET", "   ");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Empty("JWT_SECRET")));

        env::set_var("JWT_SECRET", "config_test_secret");
        let config = Config::from_env().expect("config should load");
        assert_eq!(config.port, 5000);
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.public_api_url, "http://localhost:5000");
        assert_eq!(config.bind_addr(), format!("{}:5000", config.host));

        env::set_var("PORT", "not-a-port");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
        env::remove_var("PORT");
    }
}
