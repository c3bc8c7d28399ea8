use std::env;
use config::{Config, File, ConfigError};
use dotenv::dotenv;
use secrecy::SecretString;

use crate::config::redis::RedisSettings;

#[derive(serde::Deserialize, Debug)]
pub struct Settings{
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    #[serde(default)]
    pub realtime: RealtimeSettings,
}

#[derive(serde::Deserialize, Debug)]
pub struct ApplicationSettings{
    pub port: u16,
    pub host: String,
    pub log_level: String
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct RealtimeSettings {
    /// How often protocol-level pings are sent to each websocket client
    pub heartbeat_interval_secs: u64,
    /// How long a client may stay silent before its session is dropped
    pub client_timeout_secs: u64,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            client_timeout_secs: 120,
        }
    }
}

pub fn get_config() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir()
        .expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    dotenv().ok();

    let environment: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let env_filename = format!("{}.yml", environment.as_str());
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yml")))
        .add_source(File::from(configuration_directory.join(env_filename)).required(false))
        .add_source(
            config::Environment::default()
                .prefix("APP")
                .prefix_separator("__")
                .separator("__")
        )
        .add_source(
            config::Environment::default()
                .prefix("REDIS")
                .prefix_separator("__")
                .separator("__")
        )
        .build()?;

    let mut settings = config.try_deserialize::<Settings>()?;

    // Hosted Redis add-ons expose the full URL directly
    if let Ok(redis_url) = env::var("REDIS_URL") {
        settings.redis.url = Some(SecretString::new(redis_url.into_boxed_str()));
    }

    Ok(settings)
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. \
                Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert!(matches!(Environment::try_from("LOCAL".to_string()), Ok(Environment::Local)));
        assert!(matches!(Environment::try_from("production".to_string()), Ok(Environment::Production)));
        assert!(Environment::try_from("staging".to_string()).is_err());
    }
}
