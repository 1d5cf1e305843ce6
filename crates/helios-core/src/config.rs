//! Application configuration
//!
//! Centralized configuration using the `config` crate. Values are layered:
//! compiled-in defaults, then `config/default` and `config/{RUN_MODE}` files
//! if present, then `HELIOS__`-prefixed environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub ingest: IngestConfig,
    pub database: DatabaseConfig,
    pub classifier: ClassifierConfig,
    pub billing: BillingConfig,
}

/// CDR ingestion server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Listener host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Listener port
    #[serde(default = "default_ingest_port")]
    pub port: u16,

    /// Maximum bytes accepted for the single bounded read per connection
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Idle read window; connections sending nothing within it are dropped
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_ingest_port() -> u16 {
    8000
}

fn default_max_line_bytes() -> usize {
    4096
}

fn default_read_timeout() -> u64 {
    30
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

/// Country/number classifier configuration
///
/// The defaults describe the Saudi numbering plan the system originally
/// shipped for; other deployments override them.
#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    /// Home country calling code, stripped from internationally written
    /// domestic numbers
    #[serde(default = "default_home_country_code")]
    pub home_country_code: String,

    /// Leading digits of a domestically written mobile number
    #[serde(default = "default_mobile_prefix")]
    pub mobile_prefix: String,

    /// Accepted second digits of a domestic landline number
    #[serde(default = "default_landline_second_digits")]
    pub landline_second_digits: String,

    /// Exact digit count of an internal extension-to-extension call
    #[serde(default = "default_internal_length")]
    pub internal_length: usize,
}

fn default_home_country_code() -> String {
    "966".to_string()
}

fn default_mobile_prefix() -> String {
    "05".to_string()
}

fn default_landline_second_digits() -> String {
    "123467".to_string()
}

fn default_internal_length() -> usize {
    4
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            home_country_code: default_home_country_code(),
            mobile_prefix: default_mobile_prefix(),
            landline_second_digits: default_landline_second_digits(),
            internal_length: default_internal_length(),
        }
    }
}

/// Billing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Tenant that records without an explicit tenant fall back to
    pub default_tenant_id: i64,
}

impl AppConfig {
    /// Load configuration from environment and optional config files
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("ingest.host", "0.0.0.0")?
            .set_default("ingest.port", 8000)?
            .set_default("ingest.max_line_bytes", 4096)?
            .set_default("ingest.read_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("classifier.home_country_code", "966")?
            .set_default("classifier.mobile_prefix", "05")?
            .set_default("classifier.landline_second_digits", "123467")?
            .set_default("classifier.internal_length", 4)?
            .set_default("billing.default_tenant_id", 1)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(
                Environment::with_prefix("HELIOS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// The ingestion listener bind address
    pub fn ingest_addr(&self) -> String {
        format!("{}:{}", self.ingest.host, self.ingest.port)
    }
}
