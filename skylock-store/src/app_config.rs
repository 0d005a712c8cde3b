use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Default lifetime of a seat hold when the caller does not supply one.
    #[serde(default = "default_hold_seconds")]
    pub seat_hold_seconds: u64,
    /// Caller-supplied TTLs are clamped into [min, max].
    #[serde(default = "default_min_hold_seconds")]
    pub min_hold_seconds: u64,
    #[serde(default = "default_max_hold_seconds")]
    pub max_hold_seconds: u64,
    /// Whether a blank holder identity may take seat holds. Off by default;
    /// the JWT `sub` is the holder in normal operation.
    #[serde(default)]
    pub allow_anonymous_holds: bool,
    /// Capacity of each per-flight broadcast channel.
    #[serde(default = "default_channel_capacity")]
    pub event_channel_capacity: usize,
}

fn default_hold_seconds() -> u64 {
    600
}

fn default_min_hold_seconds() -> u64 {
    30
}

fn default_max_hold_seconds() -> u64 {
    3600
}

fn default_channel_capacity() -> usize {
    100
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            seat_hold_seconds: default_hold_seconds(),
            min_hold_seconds: default_min_hold_seconds(),
            max_hold_seconds: default_max_hold_seconds(),
            allow_anonymous_holds: false,
            event_channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // SKYLOCK__SERVER__PORT=8080 etc.
            .add_source(config::Environment::with_prefix("SKYLOCK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rules_defaults() {
        let rules = BusinessRules::default();
        assert_eq!(rules.seat_hold_seconds, 600);
        assert!(!rules.allow_anonymous_holds);
        assert!(rules.min_hold_seconds < rules.max_hold_seconds);
    }
}
