use serde::Deserialize;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: SecretString,
    /// Run against the process-local store instead of Redis
    #[serde(default)]
    pub in_memory: bool,
    /// Full connection URL, takes precedence over host/port/password
    #[serde(default)]
    pub url: Option<SecretString>,
}

impl RedisSettings {
    pub fn get_redis_url(&self) -> SecretString {
        if let Some(url) = &self.url {
            return SecretString::new(url.expose_secret().to_string().into_boxed_str());
        }
        let password = self.password.expose_secret();
        let url = if password.is_empty() {
            format!("redis://{}:{}", self.host, self.port)
        } else {
            format!("redis://:{}@{}:{}", password, self.host, self.port)
        };
        SecretString::new(url.into_boxed_str())
    }
}
