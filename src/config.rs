//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default wall-clock budget for a single remote call.
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
/// Default number of refresh-and-retry rounds for auth-class failures.
pub const DEFAULT_CALL_RETRIES: u32 = 1;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend base URL (e.g. https://xxxx.supabase.co)
    pub backend_url: String,
    /// Public anon key sent as `apikey` on every backend request
    pub anon_key: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Timeout applied to wrapped remote calls
    pub call_timeout: Duration,
    /// Auth-failure retry budget for wrapped remote calls
    pub call_retries: u32,
    /// Where the current session is persisted between runs (optional)
    pub session_file: Option<PathBuf>,
    /// Idle period after which `auto_logout` profiles are signed out
    pub idle_logout: Duration,
    /// How often the idle monitor wakes up
    pub idle_check_interval: Duration,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:54321".to_string(),
            anon_key: "test_anon_key".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8080,
            call_timeout: Duration::from_millis(DEFAULT_CALL_TIMEOUT_MS),
            call_retries: DEFAULT_CALL_RETRIES,
            session_file: None,
            idle_logout: Duration::from_secs(30 * 60),
            idle_check_interval: Duration::from_secs(60),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let backend_url = env::var("SUPABASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?;
        if backend_url.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }

        Ok(Self {
            backend_url,
            anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: parse_var("PORT", 8080)?,
            call_timeout: Duration::from_millis(parse_var(
                "CALL_TIMEOUT_MS",
                DEFAULT_CALL_TIMEOUT_MS,
            )?),
            call_retries: parse_var("CALL_RETRIES", DEFAULT_CALL_RETRIES)?,
            session_file: env::var("SESSION_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            idle_logout: Duration::from_secs(parse_var::<u64>("IDLE_LOGOUT_MINUTES", 30)? * 60),
            idle_check_interval: Duration::from_secs(parse_var("IDLE_CHECK_SECS", 60)?),
        })
    }
}

/// Read an optional numeric variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("SUPABASE_URL", "https://example.supabase.co/");
        env::set_var("SUPABASE_ANON_KEY", " anon ");
        env::set_var("CALL_TIMEOUT_MS", "1500");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.backend_url, "https://example.supabase.co");
        assert_eq!(config.anon_key, "anon");
        assert_eq!(config.call_timeout, Duration::from_millis(1500));
        assert_eq!(config.call_retries, DEFAULT_CALL_RETRIES);

        env::remove_var("CALL_TIMEOUT_MS");
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("LEAD_CONSOLE_TEST_NUMBER", "soon");
        let result = parse_var::<u32>("LEAD_CONSOLE_TEST_NUMBER", 1);
        assert!(matches!(result, Err(ConfigError::Invalid(_, _))));
        env::remove_var("LEAD_CONSOLE_TEST_NUMBER");
    }
}
