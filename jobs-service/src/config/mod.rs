use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_parsed};
use service_core::error::AppError;
use service_core::middleware::body_limit::DEFAULT_BODY_LIMIT;
use service_core::middleware::rate_limit::DEFAULT_RATE_LIMIT_MESSAGE;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub store: StoreBackend,
    pub mongodb: MongoConfig,
    pub jwt: JwtConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Option<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window_ms: u64,
    pub max_requests: u32,
    pub message: String,
    /// Key clients by `x-forwarded-for` (only behind a trusted proxy).
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl JobsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let store: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let mongo_uri = env::var("MONGODB_URI").ok();
        if store == StoreBackend::Mongo && mongo_uri.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MONGODB_URI is required when STORE_BACKEND=mongo"
            )));
        }

        let jwt_secret = get_env("JWT_SECRET", None, is_prod)?;
        if jwt_secret.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must not be empty"
            )));
        }

        let config = JobsConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("jobs-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            store,
            mongodb: MongoConfig {
                uri: mongo_uri,
                database: get_env("MONGODB_DATABASE", Some("jobs_db"), false)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(jwt_secret),
                expiry_minutes: get_env_parsed("JWT_EXPIRY_MINUTES", Some("43200"), false)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                body_limit_bytes: get_env_parsed(
                    "BODY_LIMIT_BYTES",
                    Some(&DEFAULT_BODY_LIMIT.to_string()),
                    false,
                )?,
            },
            rate_limit: RateLimitConfig {
                window_ms: get_env_parsed("RATE_LIMIT_WINDOW_MS", Some("900000"), false)?,
                max_requests: get_env_parsed("RATE_LIMIT_MAX", Some("100"), false)?,
                message: get_env(
                    "RATE_LIMIT_MESSAGE",
                    Some(DEFAULT_RATE_LIMIT_MESSAGE),
                    false,
                )?,
                trust_proxy: get_env_parsed("TRUST_PROXY", Some("false"), false)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.jwt.expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_EXPIRY_MINUTES must be positive"
            )));
        }
        if self.rate_limit.window_ms == 0 || self.rate_limit.max_requests == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "RATE_LIMIT_WINDOW_MS and RATE_LIMIT_MAX must be positive"
            )));
        }
        if self.jwt.secret.expose_secret().len() < 16 && self.environment == Environment::Prod {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET must be at least 16 characters in production"
            )));
        }
        Ok(())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("mongodb".parse::<StoreBackend>(), Ok(StoreBackend::Mongo));
        assert_eq!("Memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn parses_environment() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Prod));
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn rate_limit_window_is_in_millis() {
        let cfg = RateLimitConfig {
            window_ms: 900_000,
            max_requests: 100,
            message: DEFAULT_RATE_LIMIT_MESSAGE.to_string(),
            trust_proxy: false,
        };
        assert_eq!(cfg.window(), Duration::from_secs(900));
    }
}
