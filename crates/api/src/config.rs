//! Configuration loading and validation for the API service.
//!
//! All values are read from environment variables at startup (a `.env` file in
//! the working directory is loaded first when present). The process exits with
//! a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use serde::Deserialize;

/// Validated API service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// HS256 secret used to verify Supabase access tokens. **Required.**
    pub supabase_jwt_secret: String,

    /// PostgreSQL connection string. **Required.**
    pub database_url: String,

    /// Supabase anonymous API key. Loaded for parity with the frontend
    /// deployment; no handler uses it.
    #[serde(default)]
    pub supabase_anon_key: Option<String>,

    /// Audience claim every access token must carry.
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Upper bound on pooled database connections.
    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    /// How long (seconds) a request waits for a pooled connection.
    #[serde(default = "default_database_acquire_timeout")]
    pub database_acquire_timeout_secs: u64,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_jwt_audience() -> String {
    "authenticated".into()
}
fn default_port() -> u16 {
    8000
}
fn default_allowed_origins() -> String {
    "http://localhost:3000,http://localhost:5173,https://solarsarthi.netlify.app".into()
}
fn default_database_max_connections() -> u32 {
    10
}
fn default_database_acquire_timeout() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is normal in production.
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parse [`Config::allowed_origins`] into header values for the CORS layer.
    ///
    /// # Errors
    ///
    /// Returns an error if any origin is not a valid header value.
    pub fn cors_origins(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| {
                HeaderValue::from_str(o)
                    .with_context(|| format!("ALLOWED_ORIGINS entry {o:?} is invalid"))
            })
            .collect()
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.supabase_jwt_secret, "SUPABASE_JWT_SECRET")?;
        ensure_non_empty(&self.database_url, "DATABASE_URL")?;
        ensure_non_empty(&self.jwt_audience, "JWT_AUDIENCE")?;

        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be > 0");
        }
        if self.database_acquire_timeout_secs == 0 {
            anyhow::bail!("DATABASE_ACQUIRE_TIMEOUT_SECS must be > 0");
        }
        self.cors_origins()?;
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets and the connection string (which embeds a password) stay out of logs.
        f.debug_struct("Config")
            .field("supabase_jwt_secret", &"[REDACTED]")
            .field("database_url", &"[REDACTED]")
            .field("supabase_anon_key", &self.supabase_anon_key.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_audience", &self.jwt_audience)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .field("database_max_connections", &self.database_max_connections)
            .field("database_acquire_timeout_secs", &self.database_acquire_timeout_secs)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            supabase_jwt_secret: "super-secret".into(),
            database_url: "postgres://app:pw@localhost/solar".into(),
            supabase_anon_key: None,
            jwt_audience: default_jwt_audience(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            database_max_connections: default_database_max_connections(),
            database_acquire_timeout_secs: default_database_acquire_timeout(),
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_jwt_audience(), "authenticated");
        assert_eq!(default_port(), 8000);
        assert_eq!(default_database_max_connections(), 10);
        assert_eq!(default_database_acquire_timeout(), 5);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn default_origins_parse() {
        let origins = valid().cors_origins().unwrap();
        assert_eq!(origins.len(), 3);
        assert_eq!(origins[2], "https://solarsarthi.netlify.app");
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret() {
        let cfg = Config {
            supabase_jwt_secret: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_database_url() {
        let cfg = Config {
            database_url: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_pool_size() {
        let cfg = Config {
            database_max_connections: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_origin() {
        let cfg = Config {
            allowed_origins: "http://ok.example,bad\norigin".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let out = format!("{:?}", valid());
        assert!(!out.contains("super-secret"));
        assert!(!out.contains("postgres://"));
        assert!(out.contains("REDACTED"));
    }
}
