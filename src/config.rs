use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_PAYMENT_SUCCESS_RATE: f64 = 0.9;
const DEFAULT_PAYMENT_MIN_DELAY_MS: u64 = 1000;
const DEFAULT_PAYMENT_MAX_DELAY_MS: u64 = 2000;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    pub jwt_expiration: usize,

    /// JWT issuer claim
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience claim
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Currency newly created carts and orders are denominated in
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Mock gateway: approval probability for non-test cards (0.0 - 1.0)
    #[serde(default = "default_payment_success_rate")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub payment_success_rate: f64,

    /// Mock gateway: simulated latency bounds (milliseconds)
    #[serde(default = "default_payment_min_delay_ms")]
    pub payment_min_delay_ms: u64,
    #[serde(default = "default_payment_max_delay_ms")]
    pub payment_max_delay_ms: u64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_auth_issuer() -> String {
    "nutriline-api".to_string()
}

fn default_auth_audience() -> String {
    "nutriline-storefront".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_payment_success_rate() -> f64 {
    DEFAULT_PAYMENT_SUCCESS_RATE
}

fn default_payment_min_delay_ms() -> u64 {
    DEFAULT_PAYMENT_MIN_DELAY_MS
}

fn default_payment_max_delay_ms() -> u64 {
    DEFAULT_PAYMENT_MAX_DELAY_MS
}

impl AppConfig {
    /// Programmatic constructor used by tests and tooling; everything not
    /// passed explicitly takes the serde default.
    pub fn new(
        database_url: impl Into<String>,
        jwt_secret: impl Into<String>,
        jwt_expiration: usize,
        host: impl Into<String>,
        port: u16,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            jwt_secret: jwt_secret.into(),
            jwt_expiration,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host: host.into(),
            port,
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            default_currency: default_currency(),
            payment_success_rate: default_payment_success_rate(),
            payment_min_delay_ms: default_payment_min_delay_ms(),
            payment_max_delay_ms: default_payment_max_delay_ms(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// Load configuration from `config/` files layered with `APP__`-prefixed
/// environment variables. The JWT secret has no default and must be
/// provided; everything else falls back to built-in defaults.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let builder = Config::builder()
        .set_default("database_url", "sqlite://nutriline.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET with a secure random string.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let cfg: AppConfig = config.try_deserialize()?;
    cfg.validate()?;

    if cfg.payment_min_delay_ms > cfg.payment_max_delay_ms {
        return Err(AppConfigError::Load(ConfigError::Message(
            "payment_min_delay_ms must not exceed payment_max_delay_ms".into(),
        )));
    }

    Ok(cfg)
}

/// Install the global tracing subscriber: env-filter driven, optionally
/// JSON-formatted for structured log shipping.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("nutriline_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::try_new(filter_directive).unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programmatic_config_has_mock_gateway_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            3600,
            "127.0.0.1",
            18_080,
            "test",
        );

        assert_eq!(cfg.payment_success_rate, 0.9);
        assert_eq!(cfg.payment_min_delay_ms, 1000);
        assert_eq!(cfg.payment_max_delay_ms, 2000);
        assert_eq!(cfg.default_currency, "USD");
        assert!(!cfg.auto_migrate);
    }

    #[test]
    fn development_environment_allows_permissive_cors() {
        let cfg = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            3600,
            "127.0.0.1",
            18_080,
            "development",
        );
        assert!(cfg.should_allow_permissive_cors());
    }
}
