use serde::Deserialize;
use skyhold_shared::Masked;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Without brokers, lifecycle events are only logged
    #[serde(default)]
    pub kafka: Option<KafkaConfig>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_max_seats")]
    pub max_seats_per_booking: u32,
    /// Pending bookings older than this are cancelled; unset disables expiry
    #[serde(default)]
    pub pending_booking_ttl_seconds: Option<u64>,
    #[serde(default = "default_sweep_interval")]
    pub expiry_sweep_interval_seconds: u64,
    #[serde(default = "default_lead_time")]
    pub min_lead_time_hours: i64,
}

fn default_max_seats() -> u32 { 10 }
fn default_sweep_interval() -> u64 { 60 }
fn default_lead_time() -> i64 { 24 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_seats_per_booking: default_max_seats(),
            pending_booking_ttl_seconds: None,
            expiry_sweep_interval_seconds: default_sweep_interval(),
            min_lead_time_hours: default_lead_time(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Masked<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Masked<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides are optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `SKYHOLD_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("SKYHOLD").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
