//! Application configuration.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Platform-level settings.
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Platform-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Address reported for a group with neither admins nor a creator.
    #[serde(default = "default_fallback_admin_email")]
    pub fallback_admin_email: String,
    /// Default size limit applied to new root groups.
    #[serde(default = "default_group_max_size")]
    pub default_group_max_size: i32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            fallback_admin_email: default_fallback_admin_email(),
            default_group_max_size: default_group_max_size(),
        }
    }
}

fn default_fallback_admin_email() -> String {
    "contact@agora.example".to_string()
}

const fn default_group_max_size() -> i32 {
    50
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `AGORA_ENV`)
    /// 3. Environment variables with `AGORA_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AGORA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_defaults() {
        let platform = PlatformConfig::default();
        assert_eq!(platform.fallback_admin_email, "contact@agora.example");
        assert_eq!(platform.default_group_max_size, 50);
    }
}
