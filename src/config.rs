use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub db_max_connections: u32,
    pub log_dir: String,
    pub log_level: Level,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or_default("API_PREFIX", "/api".to_string())?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,
            log_dir: or_default("LOG_DIR", "logs".to_string())?,
            log_level: or_default("LOG_LEVEL", Level::DEBUG)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys are unique to each test so parallel tests don't see each other.
    #[test]
    fn missing_optional_uses_default() {
        assert_eq!(or_default("HRM_TEST_UNSET_TTL", 900usize).unwrap(), 900);
    }

    #[test]
    fn unparsable_number_is_an_error() {
        unsafe { env::set_var("HRM_TEST_BAD_RATE", "lots") };
        let err = or_default("HRM_TEST_BAD_RATE", 60u32).unwrap_err();
        assert!(err.to_string().contains("HRM_TEST_BAD_RATE"));
    }

    #[test]
    fn log_level_parses_names() {
        unsafe { env::set_var("HRM_TEST_LOG_LEVEL", "warn") };
        assert_eq!(or_default("HRM_TEST_LOG_LEVEL", Level::DEBUG).unwrap(), Level::WARN);
    }

    #[test]
    fn missing_required_names_the_variable() {
        let err = required("HRM_TEST_UNSET_SECRET").unwrap_err();
        assert_eq!(err.to_string(), "HRM_TEST_UNSET_SECRET must be set");
    }
}
