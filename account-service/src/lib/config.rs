use std::env;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub email_verification: EmailVerificationConfig,
    pub password_reset: PasswordResetConfig,
    pub frontend: FrontendConfig,
    pub kafka: KafkaConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

/// Token signing. The secret is handed to the token codec at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailVerificationConfig {
    pub ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PasswordResetConfig {
    pub ticket_ttl_minutes: i64,
}

/// Base URL that verification and reset links point at.
#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    pub url: String,
    /// Contact address printed in password reset mails
    #[serde(default = "default_support_email")]
    pub support_email: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub notifications_topic: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProfileConfig {
    /// Reject unparseable flattened keys instead of dropping them
    #[serde(default)]
    pub strict_flattened_keys: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_support_email() -> String {
    "support@healthcare.local".to_string()
}

fn default_cookie_name() -> String {
    "sessionid".to_string()
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        configuration.try_deserialize()
    }
}
